// Copyright 2025 Muvon Un Limited
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Lazy fragment sequence produced by the completion client.
//!
//! A buffered response is turned into a fixed queue of fragments. A streamed
//! response is read as server-sent-event lines, reassembled across network
//! chunk boundaries, and each `data:` chunk is unwrapped through the delta
//! field paths. The sequence ends at `data: [DONE]`, at the end of the body
//! or at the first error, and it is never restarted afterwards.

use futures::{Stream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::pin::Pin;

use super::client::{provider_error_message, CompletionError};
use super::extract::{truncate_chars, FieldPath};

const DONE_MARKER: &str = "[DONE]";
const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

pub(crate) type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send>>;

/// A unit of assistant output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
	/// Part of the assistant message
	Content(String),
	/// Model "thinking" text; displayed but never part of the message
	Reasoning(String),
}

impl Fragment {
	pub fn text(&self) -> &str {
		match self {
			Fragment::Content(text) | Fragment::Reasoning(text) => text,
		}
	}

	pub fn is_content(&self) -> bool {
		matches!(self, Fragment::Content(_))
	}
}

/// Field paths used to unwrap responses, parsed once per client
#[derive(Debug, Clone)]
pub(crate) struct ResponsePaths {
	pub answer: FieldPath,
	pub delta_answer: FieldPath,
	pub reasoning: Option<FieldPath>,
	pub delta_reasoning: Option<FieldPath>,
}

/// Reassembles lines from arbitrary byte chunks
#[derive(Debug, Default)]
pub(crate) struct SseLineBuffer {
	pending: Vec<u8>,
}

impl SseLineBuffer {
	/// Append a chunk and drain every complete line
	pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
		self.pending.extend_from_slice(chunk);

		let mut lines = Vec::new();
		while let Some(newline) = self.pending.iter().position(|&b| b == b'\n') {
			let raw: Vec<u8> = self.pending.drain(..=newline).collect();
			let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
			lines.push(line.trim_end_matches('\r').to_string());
		}
		lines
	}

	/// Whatever is left once the body has ended
	pub fn finish(&mut self) -> Option<String> {
		if self.pending.is_empty() {
			return None;
		}
		let raw = std::mem::take(&mut self.pending);
		let line = String::from_utf8_lossy(&raw).trim_end_matches('\r').to_string();
		Some(line)
	}
}

#[derive(Debug, PartialEq)]
pub(crate) enum SseEvent {
	Chunk(Value),
	Done,
	Malformed(String),
}

/// Classify one SSE line; `None` for blank lines, comments and non-data fields
pub(crate) fn parse_sse_line(line: &str) -> Option<SseEvent> {
	let line = line.trim();
	if line.is_empty() || line.starts_with(':') {
		return None;
	}

	let data = match line.strip_prefix("data:") {
		Some(data) => data.trim(),
		// Some servers emit bare JSON lines instead of SSE frames
		None if line.starts_with('{') => line,
		None => return None,
	};

	if data == DONE_MARKER {
		return Some(SseEvent::Done);
	}

	match serde_json::from_str::<Value>(data) {
		Ok(value) => Some(SseEvent::Chunk(value)),
		Err(_) => Some(SseEvent::Malformed(data.to_string())),
	}
}

/// Splits inline `<think>...</think>` blocks out of content, across fragment boundaries
#[derive(Debug, Default)]
pub(crate) struct ThinkSplitter {
	in_think: bool,
	carry: String,
}

impl ThinkSplitter {
	pub fn feed(&mut self, text: &str) -> Vec<Fragment> {
		let mut buffer = std::mem::take(&mut self.carry);
		buffer.push_str(text);

		let mut out = Vec::new();
		loop {
			let tag = if self.in_think { THINK_CLOSE } else { THINK_OPEN };
			match buffer.find(tag) {
				Some(idx) => {
					self.emit(&buffer[..idx], &mut out);
					buffer = buffer[idx + tag.len()..].to_string();
					self.in_think = !self.in_think;
				}
				None => {
					// Hold back a suffix that may be the start of a split tag
					let keep = partial_tag_suffix(&buffer, tag);
					let split = buffer.len() - keep;
					self.emit(&buffer[..split], &mut out);
					self.carry = buffer[split..].to_string();
					break;
				}
			}
		}
		out
	}

	pub fn finish(&mut self) -> Vec<Fragment> {
		let rest = std::mem::take(&mut self.carry);
		let mut out = Vec::new();
		self.emit(&rest, &mut out);
		out
	}

	fn emit(&self, text: &str, out: &mut Vec<Fragment>) {
		if text.is_empty() {
			return;
		}
		if self.in_think {
			out.push(Fragment::Reasoning(text.to_string()));
		} else {
			out.push(Fragment::Content(text.to_string()));
		}
	}
}

fn partial_tag_suffix(buffer: &str, tag: &str) -> usize {
	(1..tag.len())
		.rev()
		.find(|&len| buffer.is_char_boundary(buffer.len().saturating_sub(len)) && buffer.ends_with(&tag[..len]))
		.unwrap_or(0)
}

/// Split a complete answer into its reasoning and content parts
pub(crate) fn split_think(text: &str) -> (String, String) {
	let mut splitter = ThinkSplitter::default();
	let mut fragments = splitter.feed(text);
	fragments.extend(splitter.finish());

	let mut reasoning = String::new();
	let mut content = String::new();
	for fragment in fragments {
		match fragment {
			Fragment::Reasoning(text) => reasoning.push_str(&text),
			Fragment::Content(text) => content.push_str(&text),
		}
	}
	(reasoning, content)
}

enum Source {
	Buffered,
	Streaming {
		body: ByteStream,
		lines: SseLineBuffer,
		think: ThinkSplitter,
		paths: ResponsePaths,
	},
}

/// Finite, non-restartable sequence of fragments for one exchange.
///
/// Dropping it aborts the underlying request.
pub struct FragmentStream {
	source: Source,
	queued: VecDeque<Fragment>,
	pending_error: Option<CompletionError>,
	saw_done: bool,
	body_ended: bool,
	yielded_content: bool,
	finished: bool,
}

impl FragmentStream {
	pub(crate) fn buffered(fragments: Vec<Fragment>) -> Self {
		Self {
			source: Source::Buffered,
			queued: fragments.into(),
			pending_error: None,
			saw_done: true,
			body_ended: true,
			yielded_content: false,
			finished: false,
		}
	}

	pub(crate) fn streaming(body: ByteStream, paths: ResponsePaths) -> Self {
		Self {
			source: Source::Streaming {
				body,
				lines: SseLineBuffer::default(),
				think: ThinkSplitter::default(),
				paths,
			},
			queued: VecDeque::new(),
			pending_error: None,
			saw_done: false,
			body_ended: false,
			yielded_content: false,
			finished: false,
		}
	}

	/// True once the terminal item has been returned
	fn is_finished(&self) -> bool {
		self.finished
	}

	/// Next fragment, an error, or `None` at the end of the sequence
	pub async fn next(&mut self) -> Option<Result<Fragment, CompletionError>> {
		loop {
			if self.is_finished() {
				return None;
			}

			if let Some(fragment) = self.queued.pop_front() {
				if fragment.is_content() {
					self.yielded_content = true;
				}
				return Some(Ok(fragment));
			}

			if let Some(err) = self.pending_error.take() {
				self.finished = true;
				return Some(Err(err));
			}

			if self.saw_done || self.body_ended {
				self.finished = true;
				return self.terminal_error().map(Err);
			}

			self.pull().await;
		}
	}

	/// Drain the sequence and concatenate the content fragments
	pub async fn collect_text(mut self) -> Result<String, CompletionError> {
		let mut text = String::new();
		while let Some(fragment) = self.next().await {
			if let Fragment::Content(chunk) = fragment? {
				text.push_str(&chunk);
			}
		}
		Ok(text)
	}

	fn terminal_error(&self) -> Option<CompletionError> {
		// A body that ends without the sentinel is only fatal when nothing usable arrived
		if !self.saw_done && !self.yielded_content {
			return Some(CompletionError::Stream(
				"response stream ended without producing any content".to_string(),
			));
		}
		None
	}

	async fn pull(&mut self) {
		let Source::Streaming { body, lines, .. } = &mut self.source else {
			self.body_ended = true;
			return;
		};

		match body.next().await {
			Some(Ok(chunk)) => {
				let complete = lines.push(&chunk);
				for line in complete {
					self.handle_line(&line);
				}
			}
			Some(Err(err)) => {
				self.pending_error = Some(CompletionError::from_transport(err));
			}
			None => {
				if let Some(line) = lines.finish() {
					self.handle_line(&line);
				}
				self.body_ended = true;
				self.flush_think();
			}
		}
	}

	fn handle_line(&mut self, line: &str) {
		if self.saw_done || self.pending_error.is_some() {
			return;
		}

		let Source::Streaming { think, paths, .. } = &mut self.source else {
			return;
		};

		match parse_sse_line(line) {
			None => {}
			Some(SseEvent::Done) => {
				self.saw_done = true;
				self.flush_think();
			}
			Some(SseEvent::Malformed(data)) => {
				crate::log_debug!("Skipping malformed stream line: {}", truncate_chars(&data, 200));
			}
			Some(SseEvent::Chunk(chunk)) => {
				if let Some(error) = chunk.get("error").filter(|e| !e.is_null()) {
					crate::log_debug!("Error object in stream chunk: {}", error);
					self.pending_error = Some(CompletionError::Request {
						status: 200,
						body: provider_error_message(&chunk.to_string()),
					});
					return;
				}

				if let Some(path) = &paths.delta_reasoning {
					match path.extract_optional(&chunk) {
						Ok(Some(text)) if !text.is_empty() => {
							self.queued.push_back(Fragment::Reasoning(text));
						}
						Ok(_) => {}
						Err(e) => crate::log_debug!("Skipping reasoning delta: {}", e),
					}
				}

				match paths.delta_answer.extract_optional(&chunk) {
					Ok(Some(text)) if !text.is_empty() => {
						self.queued.extend(think.feed(&text));
					}
					Ok(_) => {}
					Err(e) => crate::log_debug!("Skipping content delta: {}", e),
				}
			}
		}
	}

	fn flush_think(&mut self) {
		if let Source::Streaming { think, .. } = &mut self.source {
			self.queued.extend(think.finish());
		}
	}
}
