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

// Chat session module
mod animation;
mod chat_helper;
pub mod commands;
pub mod gate;
pub mod input;
mod markdown;
pub mod render;
pub mod runner;
mod syntax;

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export main structures and functions
pub use commands::{
	COMMANDS, CLEAR_COMMAND, EXIT_COMMAND, HELP_COMMAND, HISTORY_COMMAND, MODE_COMMAND,
	QUIT_COMMAND,
};
pub use gate::{filter_command, GateOutcome, PendingCommand};
pub use input::{InputEvent, InputSource, RustylineInput};
pub use render::{Renderer, TerminalRenderer};
pub use runner::ChatSession;

/// Interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
	/// Free-form conversation
	#[serde(rename = "chat")]
	#[default]
	Chat,
	/// Natural language to shell command, gated by confirmation
	#[serde(rename = "exec")]
	Execute,
	/// Single throwaway exchange
	#[serde(rename = "temp")]
	Temp,
}

impl Mode {
	/// Interactive toggle between chat and execute
	pub fn toggle(self) -> Self {
		match self {
			Mode::Chat => Mode::Execute,
			Mode::Execute => Mode::Chat,
			Mode::Temp => Mode::Temp,
		}
	}

	/// Mode an interactive session starts in; TEMP is never interactive
	pub fn interactive(self) -> Self {
		match self {
			Mode::Temp => Mode::Chat,
			other => other,
		}
	}

	pub fn prompt_label(self) -> &'static str {
		match self {
			Mode::Chat => "💬",
			Mode::Execute => "🚀",
			Mode::Temp => "⏳",
		}
	}
}

impl fmt::Display for Mode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Mode::Chat => write!(f, "chat"),
			Mode::Execute => write!(f, "exec"),
			Mode::Temp => write!(f, "temp"),
		}
	}
}

/// Position of the REPL in its state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	Idle,
	AwaitingInput,
	StreamingResponse,
	AwaitingConfirm,
	Exiting,
}
