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

// System prompts per interaction mode

use super::chat::Mode;
use super::environment::Environment;
use super::Message;

const SHELL_PROMPT: &str = "You translate requests into shell commands for %{OS} using the %{SHELL} shell.
Rules:
1. Use only syntax and operators that %{SHELL} understands (&&, ||, |, ...)
2. Reply with the command alone, as plain text on a single line
3. No markdown, no code fences, no explanations
4. When details are missing, pick the most sensible option";

const ASSISTANT_PROMPT: &str = "You are octoshell, a system administration and programming assistant working on %{OS} with the %{SHELL} shell. Keep answers concise and use Markdown unless the user asks for more detail.";

fn render(template: &str, environment: &Environment) -> String {
	template
		.replace("%{OS}", &environment.os_name)
		.replace("%{SHELL}", &environment.shell_name)
}

/// System message sent ahead of the conversation for the given mode
pub fn system_message(mode: Mode, environment: &Environment) -> Message {
	let template = match mode {
		Mode::Execute => SHELL_PROMPT,
		Mode::Chat | Mode::Temp => ASSISTANT_PROMPT,
	};
	Message::system(render(template, environment))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::session::Role;

	fn environment() -> Environment {
		Environment {
			os_name: "Linux/Arch Linux".to_string(),
			shell_name: "fish".to_string(),
		}
	}

	#[test]
	fn test_execute_prompt_mentions_environment() {
		let message = system_message(Mode::Execute, &environment());
		assert_eq!(message.role, Role::System);
		assert!(message.content.contains("Linux/Arch Linux"));
		assert!(message.content.contains("fish shell"));
		assert!(message.content.contains("No markdown"));
		assert!(!message.content.contains("%{"));
	}

	#[test]
	fn test_chat_and_temp_share_the_assistant_prompt() {
		let chat = system_message(Mode::Chat, &environment());
		let temp = system_message(Mode::Temp, &environment());
		assert_eq!(chat, temp);
		assert!(chat.content.contains("Markdown"));
	}
}
