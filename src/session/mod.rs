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

// Session module: conversation state, completion client and the interactive loop

pub mod chat; // Mode controller, REPL loop and confirmation gate
pub mod client; // HTTP completion client
pub mod environment; // OS and shell detection
pub mod extract; // Field-path extraction over JSON payloads
pub mod prompts; // Mode-specific system prompts
pub mod stream; // Fragment sequence and SSE parsing

pub use client::{CompletionClient, CompletionError, NetworkReason};
pub use extract::{ExtractionError, ExtractionReason, FieldPath};
pub use stream::{Fragment, FragmentStream};

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	System,
	User,
	Assistant,
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Role::System => write!(f, "system"),
			Role::User => write!(f, "user"),
			Role::Assistant => write!(f, "assistant"),
		}
	}
}

/// A single role-tagged message, serialized exactly as the chat completion API expects
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
	pub role: Role,
	pub content: String,
}

impl Message {
	pub fn new(role: Role, content: impl Into<String>) -> Self {
		Self {
			role,
			content: content.into(),
		}
	}

	pub fn system(content: impl Into<String>) -> Self {
		Self::new(Role::System, content)
	}

	pub fn user(content: impl Into<String>) -> Self {
		Self::new(Role::User, content)
	}

	pub fn assistant(content: impl Into<String>) -> Self {
		Self::new(Role::Assistant, content)
	}
}

/// Ordered, append-only log of the turns exchanged during one session.
///
/// The system message is not stored here: it depends on the current mode and
/// is supplied when the request payload is built.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
	messages: Vec<Message>,
}

impl Conversation {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn append(&mut self, message: Message) {
		self.messages.push(message);
	}

	pub fn history(&self) -> &[Message] {
		&self.messages
	}

	pub fn reset(&mut self) {
		self.messages.clear();
	}

	pub fn len(&self) -> usize {
		self.messages.len()
	}

	pub fn is_empty(&self) -> bool {
		self.messages.is_empty()
	}

	pub fn last(&self) -> Option<&Message> {
		self.messages.last()
	}

	/// Full request sequence: the optional system message followed by the history
	pub fn payload(&self, system: Option<Message>) -> Vec<Message> {
		let mut messages = Vec::with_capacity(self.messages.len() + 1);
		if let Some(system) = system {
			messages.push(system);
		}
		messages.extend(self.messages.iter().cloned());
		messages
	}
}
