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

// User input handling module

use anyhow::Result;
use colored::*;
use parking_lot::Mutex;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{
	Cmd, CompletionType, Config as RustylineConfig, ConditionalEventHandler, EditMode, Editor,
	Event, EventContext, EventHandler, KeyCode, KeyEvent, Modifiers, RepeatCount,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::chat_helper::CommandHelper;
use super::Mode;

/// One read from the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
	Line(String),
	/// The mode-toggle key was pressed; text typed so far is kept for the next read
	ToggleMode,
	/// Ctrl+C
	Interrupted,
	/// Ctrl+D
	Eof,
}

/// Console input used by the REPL and the confirmation gate
pub trait InputSource {
	/// Read a prompt in the given mode
	fn read_line(&mut self, mode: Mode) -> InputEvent;

	/// Ask whether `command` should run
	fn read_confirmation(&mut self, command: &str) -> InputEvent;

	/// Let the user edit `command` before it goes through the gate again
	fn edit_command(&mut self, command: &str) -> InputEvent;
}

#[derive(Default)]
struct ToggleState {
	armed: AtomicBool,
	requested: AtomicBool,
	line: Mutex<String>,
}

/// TAB handler: interrupts the current read and remembers the typed text.
/// Lines starting with `/` keep TAB for command completion.
struct ModeToggleHandler(Arc<ToggleState>);

impl ConditionalEventHandler for ModeToggleHandler {
	fn handle(
		&self,
		_evt: &Event,
		_n: RepeatCount,
		_positive: bool,
		ctx: &EventContext,
	) -> Option<Cmd> {
		if !self.0.armed.load(Ordering::SeqCst) || ctx.line().starts_with('/') {
			return None;
		}

		*self.0.line.lock() = ctx.line().to_string();
		self.0.requested.store(true, Ordering::SeqCst);
		Some(Cmd::Interrupt)
	}
}

/// Line editor shared by the whole session so in-memory history survives between turns
pub struct RustylineInput {
	editor: Editor<CommandHelper, DefaultHistory>,
	toggle: Arc<ToggleState>,
	carried: Option<String>,
}

impl RustylineInput {
	pub fn new() -> Result<Self> {
		let config = RustylineConfig::builder()
			.completion_type(CompletionType::List)
			.edit_mode(EditMode::Emacs)
			.auto_add_history(false)
			.bell_style(rustyline::config::BellStyle::None)
			.build();

		let mut editor = Editor::with_config(config)?;
		editor.set_helper(Some(CommandHelper::new()));

		let toggle = Arc::new(ToggleState::default());
		editor.bind_sequence(
			KeyEvent(KeyCode::Tab, Modifiers::NONE),
			EventHandler::Conditional(Box::new(ModeToggleHandler(toggle.clone()))),
		);

		Ok(Self {
			editor,
			toggle,
			carried: None,
		})
	}

	fn prompt_for(mode: Mode) -> String {
		let label = format!("{} {} > ", mode.prompt_label(), mode);
		match mode {
			Mode::Execute => label.bright_magenta().to_string(),
			_ => label.bright_blue().to_string(),
		}
	}

	fn read(&mut self, prompt: &str, initial: Option<&str>) -> std::result::Result<String, ReadlineError> {
		match initial {
			Some(text) if !text.is_empty() => self.editor.readline_with_initial(prompt, (text, "")),
			_ => self.editor.readline(prompt),
		}
	}

	fn map_error(err: ReadlineError) -> InputEvent {
		match err {
			ReadlineError::Interrupted => InputEvent::Interrupted,
			ReadlineError::Eof => InputEvent::Eof,
			other => {
				crate::log_error!("Input error: {}", other);
				InputEvent::Interrupted
			}
		}
	}
}

impl InputSource for RustylineInput {
	fn read_line(&mut self, mode: Mode) -> InputEvent {
		let prompt = Self::prompt_for(mode);
		let initial = self.carried.take();

		self.toggle.requested.store(false, Ordering::SeqCst);
		self.toggle.armed.store(true, Ordering::SeqCst);
		let result = self.read(&prompt, initial.as_deref());
		self.toggle.armed.store(false, Ordering::SeqCst);

		match result {
			Ok(line) => {
				if !line.trim().is_empty() {
					let _ = self.editor.add_history_entry(line.as_str());
				}
				InputEvent::Line(line)
			}
			Err(ReadlineError::Interrupted) if self.toggle.requested.swap(false, Ordering::SeqCst) => {
				self.carried = Some(std::mem::take(&mut *self.toggle.line.lock()));
				InputEvent::ToggleMode
			}
			Err(err) => Self::map_error(err),
		}
	}

	fn read_confirmation(&mut self, _command: &str) -> InputEvent {
		let prompt = format!(
			"{} ",
			"Execute command? [y]es, [e]dit, [N]o:".bright_yellow()
		);
		match self.read(&prompt, None) {
			Ok(answer) => InputEvent::Line(answer),
			Err(err) => Self::map_error(err),
		}
	}

	fn edit_command(&mut self, command: &str) -> InputEvent {
		let prompt = format!("{} ", "Edit command:".bright_yellow());
		match self.read(&prompt, Some(command)) {
			Ok(edited) => InputEvent::Line(edited),
			Err(err) => Self::map_error(err),
		}
	}
}
