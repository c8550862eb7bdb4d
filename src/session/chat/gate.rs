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

//! Confirmation gate for generated shell commands.
//!
//! A command is only ever executed after an explicit `y`/`yes`. Anything else,
//! including an empty answer, Ctrl+C or Ctrl+D, discards it. An edited command
//! is shown again and needs its own confirmation.

use super::input::{InputEvent, InputSource};
use super::render::Renderer;
use crate::shell::{ExecOutcome, ShellExecutor};

const FENCE: &str = "```";

/// Command awaiting confirmation; consumed by [`confirm`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
	command: String,
}

impl PendingCommand {
	/// Build from raw assistant output; `None` when nothing runnable remains
	pub fn from_response(text: &str) -> Option<Self> {
		let command = filter_command(text);
		if command.is_empty() {
			None
		} else {
			Some(Self { command })
		}
	}

	pub fn command(&self) -> &str {
		&self.command
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
	Executed(ExecOutcome),
	Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
	Yes,
	Edit,
	No,
}

fn classify(answer: &str) -> Answer {
	match answer.trim().to_lowercase().as_str() {
		"y" | "yes" => Answer::Yes,
		"e" | "edit" => Answer::Edit,
		_ => Answer::No,
	}
}

/// Strip markdown code fences from a generated command.
///
/// Handles plain fences, fences with a language tag and single-line fenced
/// commands. Only the body of the first fenced block is kept.
pub fn filter_command(text: &str) -> String {
	let text = text.trim();
	if !text.contains(FENCE) {
		return text.to_string();
	}

	let lines: Vec<&str> = text.lines().collect();
	if lines.len() == 1 {
		return text.trim_matches('`').trim().to_string();
	}

	// Take the body of the first fenced block, wherever it starts
	let Some(open) = lines.iter().position(|l| l.trim_start().starts_with(FENCE)) else {
		return text.to_string();
	};
	let body = &lines[open + 1..];
	let close = body
		.iter()
		.position(|l| l.trim() == FENCE)
		.unwrap_or(body.len());

	body[..close]
		.iter()
		.map(|l| l.trim())
		.filter(|l| !l.is_empty())
		.collect::<Vec<_>>()
		.join("\n")
}

/// Run the generate → display → confirm → execute | discard cycle
pub fn confirm<I, R, S>(
	pending: PendingCommand,
	input: &mut I,
	renderer: &mut R,
	shell: &mut S,
) -> GateOutcome
where
	I: InputSource + ?Sized,
	R: Renderer + ?Sized,
	S: ShellExecutor + ?Sized,
{
	let mut pending = pending;

	loop {
		renderer.show_command(pending.command());

		let answer = match input.read_confirmation(pending.command()) {
			InputEvent::Line(answer) => answer,
			_ => {
				renderer.notice("Command discarded");
				return GateOutcome::Discarded;
			}
		};

		match classify(&answer) {
			Answer::Yes => {
				crate::log_info!("Executing: {}", pending.command());
				let outcome = match shell.execute(pending.command()) {
					Ok(outcome) => outcome,
					Err(e) => {
						renderer.error(&format!("{:#}", e));
						ExecOutcome {
							code: None,
							success: false,
						}
					}
				};
				renderer.exec_outcome(&outcome);
				return GateOutcome::Executed(outcome);
			}
			Answer::Edit => match input.edit_command(pending.command()) {
				InputEvent::Line(edited) => match PendingCommand::from_response(&edited) {
					Some(next) => pending = next,
					None => {
						renderer.notice("Empty command, nothing to execute");
						return GateOutcome::Discarded;
					}
				},
				_ => {
					renderer.notice("Command discarded");
					return GateOutcome::Discarded;
				}
			},
			Answer::No => {
				renderer.notice("Command discarded");
				return GateOutcome::Discarded;
			}
		}
	}
}
