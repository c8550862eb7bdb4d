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

// Chat commands module

pub const HELP_COMMAND: &str = "/help";
pub const EXIT_COMMAND: &str = "/exit";
pub const QUIT_COMMAND: &str = "/quit";
pub const CLEAR_COMMAND: &str = "/clear";
pub const HISTORY_COMMAND: &str = "/his";
pub const MODE_COMMAND: &str = "/mode";

// List of all available commands for autocomplete
pub const COMMANDS: [&str; 6] = [
	HELP_COMMAND,
	EXIT_COMMAND,
	QUIT_COMMAND,
	CLEAR_COMMAND,
	HISTORY_COMMAND,
	MODE_COMMAND,
];

/// Parsed REPL input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
	Exit,
	Help,
	Clear,
	History,
	ToggleMode,
	Prompt(String),
	Empty,
}

impl ChatCommand {
	pub fn parse(line: &str) -> Self {
		let trimmed = line.trim();
		if trimmed.is_empty() {
			return ChatCommand::Empty;
		}

		match trimmed.to_lowercase().as_str() {
			EXIT_COMMAND | QUIT_COMMAND | "exit" | "quit" => ChatCommand::Exit,
			HELP_COMMAND => ChatCommand::Help,
			CLEAR_COMMAND => ChatCommand::Clear,
			HISTORY_COMMAND => ChatCommand::History,
			MODE_COMMAND => ChatCommand::ToggleMode,
			_ => ChatCommand::Prompt(trimmed.to_string()),
		}
	}
}

pub fn help_text() -> String {
	format!(
		"Available commands:\n\
		 {}  - Show this help\n\
		 {}  - Switch between chat and exec mode (or press TAB)\n\
		 {} - Clear the conversation\n\
		 {}   - Show the conversation history\n\
		 {}  - Exit the session (also {}, exit, quit or Ctrl+D)\n\
		 Ctrl+C cancels a response in progress.",
		HELP_COMMAND, MODE_COMMAND, CLEAR_COMMAND, HISTORY_COMMAND, EXIT_COMMAND, QUIT_COMMAND
	)
}
