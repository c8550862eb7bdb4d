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

//! Mode controller and REPL loop.
//!
//! One session owns the conversation, the client and its console
//! collaborators. Exchanges are strictly sequential: input is not read again
//! until the current response, its confirmation and any execution are done.

use anyhow::{Context, Result};
use colored::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::animation::Spinner;
use super::commands::{help_text, ChatCommand};
use super::gate::{self, GateOutcome, PendingCommand};
use super::input::{InputEvent, InputSource};
use super::render::Renderer;
use super::{Mode, SessionState};
use crate::session::environment::Environment;
use crate::session::{prompts, CompletionClient, CompletionError, Conversation, Fragment, Message};
use crate::shell::ShellExecutor;

const CANCEL_POLL_MS: u64 = 10;

// Resolves once the interrupt flag is raised
async fn wait_for_cancel(flag: &AtomicBool) {
	while !flag.load(Ordering::SeqCst) {
		tokio::time::sleep(tokio::time::Duration::from_millis(CANCEL_POLL_MS)).await;
	}
}

async fn stop_spinner(spinner: &mut Option<Spinner>) {
	if let Some(spinner) = spinner.take() {
		spinner.stop().await;
	}
}

pub struct ChatSession<I, R, S> {
	client: CompletionClient,
	environment: Environment,
	conversation: Conversation,
	mode: Mode,
	state: Arc<Mutex<SessionState>>,
	cancel: Arc<AtomicBool>,
	input: I,
	renderer: R,
	shell: S,
}

impl<I, R, S> ChatSession<I, R, S>
where
	I: InputSource,
	R: Renderer,
	S: ShellExecutor,
{
	pub fn new(
		client: CompletionClient,
		environment: Environment,
		mode: Mode,
		input: I,
		renderer: R,
		shell: S,
	) -> Self {
		Self {
			client,
			environment,
			conversation: Conversation::new(),
			mode,
			state: Arc::new(Mutex::new(SessionState::Idle)),
			cancel: Arc::new(AtomicBool::new(false)),
			input,
			renderer,
			shell,
		}
	}

	pub fn mode(&self) -> Mode {
		self.mode
	}

	pub fn state(&self) -> SessionState {
		*self.state.lock()
	}

	pub fn conversation(&self) -> &Conversation {
		&self.conversation
	}

	/// Flag that aborts the exchange in progress when raised
	pub fn cancel_flag(&self) -> Arc<AtomicBool> {
		self.cancel.clone()
	}

	fn set_state(&self, state: SessionState) {
		*self.state.lock() = state;
	}

	/// Route Ctrl+C to this session.
	///
	/// The first press cancels the request in flight; a second press before
	/// the session has recovered exits the process with code 130.
	pub fn install_interrupt_handler(&self) -> Result<()> {
		let cancel = self.cancel.clone();
		let state = self.state.clone();

		ctrlc::set_handler(move || {
			if cancel.swap(true, Ordering::SeqCst) {
				std::process::exit(130);
			}

			if *state.lock() == SessionState::StreamingResponse {
				eprintln!(
					"\n{}",
					"Cancelling request... press Ctrl+C again to force exit".bright_yellow()
				);
			}
		})
		.context("Failed to install Ctrl+C handler")
	}

	/// Interactive REPL; returns when the user exits
	pub async fn run_interactive(&mut self) -> Result<()> {
		self.set_state(SessionState::Idle);
		self.mode = self.mode.interactive();
		self.renderer.notice(&format!(
			"Press TAB or type /mode to switch between chat and exec mode, {} for commands",
			super::HELP_COMMAND
		));

		loop {
			self.cancel.store(false, Ordering::SeqCst);
			self.set_state(SessionState::AwaitingInput);

			let line = match self.input.read_line(self.mode) {
				InputEvent::Line(line) => line,
				InputEvent::ToggleMode => {
					self.toggle_mode();
					continue;
				}
				InputEvent::Interrupted => continue,
				InputEvent::Eof => break,
			};

			match ChatCommand::parse(&line) {
				ChatCommand::Exit => break,
				ChatCommand::Empty => {}
				ChatCommand::Help => self.renderer.notice(&help_text()),
				ChatCommand::Clear => {
					self.conversation.reset();
					self.renderer.notice("Chat history cleared");
				}
				ChatCommand::History => self.renderer.history(self.conversation.history()),
				ChatCommand::ToggleMode => self.toggle_mode(),
				ChatCommand::Prompt(prompt) => {
					// Failures are already reported; the loop always continues
					let _ = self.round_trip(&prompt).await;
				}
			}
		}

		self.set_state(SessionState::Exiting);
		crate::log_debug!("Session ended with {} messages", self.conversation.len());
		Ok(())
	}

	/// Single cycle on a fresh conversation (TEMP, or one-shot EXECUTE)
	pub async fn run_once(&mut self, prompt: &str) -> Result<Option<GateOutcome>, CompletionError> {
		self.conversation.reset();
		self.set_state(SessionState::Idle);

		let result = self.round_trip(prompt).await;

		if self.mode == Mode::Temp {
			self.conversation.reset();
		}
		self.set_state(SessionState::Exiting);
		result
	}

	fn toggle_mode(&mut self) {
		let next = self.mode.toggle();
		if next != self.mode {
			self.mode = next;
			self.renderer.mode_changed(next);
		}
	}

	/// User turn, exchange, assistant turn and, in EXECUTE mode, the confirmation gate
	async fn round_trip(&mut self, prompt: &str) -> Result<Option<GateOutcome>, CompletionError> {
		self.conversation.append(Message::user(prompt));

		let text = match self.exchange().await {
			Ok(text) => text,
			Err(err) => {
				self.report(&err);
				return Err(err);
			}
		};

		self.conversation.append(Message::assistant(text.as_str()));

		if self.mode != Mode::Execute {
			return Ok(None);
		}

		match PendingCommand::from_response(&text) {
			Some(pending) => {
				self.set_state(SessionState::AwaitingConfirm);
				let outcome = gate::confirm(
					pending,
					&mut self.input,
					&mut self.renderer,
					&mut self.shell,
				);
				Ok(Some(outcome))
			}
			None => {
				self.renderer.notice("No command generated");
				Ok(None)
			}
		}
	}

	/// Send the conversation and render fragments as they arrive.
	///
	/// Returns the assembled content; the conversation is not touched here.
	async fn exchange(&mut self) -> Result<String, CompletionError> {
		self.cancel.store(false, Ordering::SeqCst);
		self.set_state(SessionState::StreamingResponse);

		let system = prompts::system_message(self.mode, &self.environment);
		let payload = self.conversation.payload(Some(system));

		let mut spinner = self
			.renderer
			.show_spinner()
			.then(|| Spinner::start("Generating response..."));

		let sent = tokio::select! {
			result = self.client.send(&payload) => result,
			_ = wait_for_cancel(&self.cancel) => Err(CompletionError::Cancelled),
		};

		let mut stream = match sent {
			Ok(stream) => stream,
			Err(err) => {
				stop_spinner(&mut spinner).await;
				return Err(err);
			}
		};

		let mut text = String::new();
		let mut started = false;

		let result = loop {
			let item = tokio::select! {
				item = stream.next() => item,
				_ = wait_for_cancel(&self.cancel) => Some(Err(CompletionError::Cancelled)),
			};
			stop_spinner(&mut spinner).await;

			match item {
				None => break Ok(()),
				Some(Err(err)) => break Err(err),
				Some(Ok(fragment)) => {
					if !started {
						self.renderer.begin_response(self.mode);
						started = true;
					}
					if let Fragment::Content(chunk) = &fragment {
						text.push_str(chunk);
					}
					self.renderer.fragment(&fragment);
				}
			}
		};

		// Dropping the stream aborts the request if it is still open
		drop(stream);
		if started {
			self.renderer.end_response();
		}

		result.map(|_| text)
	}

	fn report(&mut self, err: &CompletionError) {
		match err {
			CompletionError::Cancelled => self.renderer.notice("Request cancelled"),
			other => self.renderer.error(&other.to_string()),
		}
	}
}

#[cfg(test)]
pub(crate) mod testing {
	use super::*;
	use crate::shell::ExecOutcome;
	use std::collections::VecDeque;

	/// Input that replays a fixed script, then reports end-of-input
	pub struct ScriptedInput {
		events: VecDeque<InputEvent>,
		pub modes_seen: Vec<Mode>,
		pub confirmations_asked: usize,
	}

	impl ScriptedInput {
		pub fn new(events: Vec<InputEvent>) -> Self {
			Self {
				events: events.into(),
				modes_seen: Vec::new(),
				confirmations_asked: 0,
			}
		}

		pub fn remaining(&self) -> usize {
			self.events.len()
		}

		fn pop(&mut self) -> InputEvent {
			self.events.pop_front().unwrap_or(InputEvent::Eof)
		}
	}

	impl InputSource for ScriptedInput {
		fn read_line(&mut self, mode: Mode) -> InputEvent {
			self.modes_seen.push(mode);
			self.pop()
		}

		fn read_confirmation(&mut self, _command: &str) -> InputEvent {
			self.confirmations_asked += 1;
			self.pop()
		}

		fn edit_command(&mut self, _command: &str) -> InputEvent {
			self.pop()
		}
	}

	#[derive(Default)]
	pub struct RecordingRenderer {
		pub fragments: Vec<Fragment>,
		pub responses: usize,
		pub commands_shown: Vec<String>,
		pub outcomes: Vec<ExecOutcome>,
		pub errors: Vec<String>,
		pub notices: Vec<String>,
		pub histories: Vec<Vec<Message>>,
		pub modes: Vec<Mode>,
	}

	impl Renderer for RecordingRenderer {
		fn begin_response(&mut self, _mode: Mode) {
			self.responses += 1;
		}

		fn fragment(&mut self, fragment: &Fragment) {
			self.fragments.push(fragment.clone());
		}

		fn end_response(&mut self) {}

		fn show_command(&mut self, command: &str) {
			self.commands_shown.push(command.to_string());
		}

		fn exec_outcome(&mut self, outcome: &ExecOutcome) {
			self.outcomes.push(*outcome);
		}

		fn error(&mut self, message: &str) {
			self.errors.push(message.to_string());
		}

		fn notice(&mut self, message: &str) {
			self.notices.push(message.to_string());
		}

		fn history(&mut self, messages: &[Message]) {
			self.histories.push(messages.to_vec());
		}

		fn mode_changed(&mut self, mode: Mode) {
			self.modes.push(mode);
		}
	}

	#[derive(Default)]
	pub struct RecordingShell {
		pub commands: Vec<String>,
		pub fail: bool,
	}

	impl ShellExecutor for RecordingShell {
		fn execute(&mut self, command: &str) -> Result<ExecOutcome> {
			if self.fail {
				anyhow::bail!("shell unavailable");
			}
			self.commands.push(command.to_string());
			Ok(ExecOutcome {
				code: Some(0),
				success: true,
			})
		}
	}
}
