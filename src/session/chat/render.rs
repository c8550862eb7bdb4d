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

// Terminal output for the chat session

use colored::*;
use std::io::{stdout, IsTerminal, Write};

use super::markdown::{is_markdown_content, MarkdownRenderer};
use super::Mode;
use crate::config::Config;
use crate::session::{Fragment, Message, Role};
use crate::shell::ExecOutcome;

/// Display side of the session. Fragments may be partial lines.
pub trait Renderer {
	/// A new response is about to be rendered
	fn begin_response(&mut self, mode: Mode);

	/// Display one fragment as soon as it arrives
	fn fragment(&mut self, fragment: &Fragment);

	/// The response is complete (or was cut short)
	fn end_response(&mut self);

	fn show_command(&mut self, command: &str);

	fn exec_outcome(&mut self, outcome: &ExecOutcome);

	fn error(&mut self, message: &str);

	fn notice(&mut self, message: &str);

	fn history(&mut self, messages: &[Message]);

	fn mode_changed(&mut self, mode: Mode);

	/// Whether a waiting spinner may be drawn
	fn show_spinner(&self) -> bool {
		false
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
	None,
	Reasoning,
	Content,
}

pub struct TerminalRenderer {
	show_reasoning: bool,
	streaming: bool,
	markdown: Option<MarkdownRenderer>,
	mode: Mode,
	section: Section,
	at_line_start: bool,
	is_terminal: bool,
}

impl TerminalRenderer {
	pub fn new(config: &Config) -> Self {
		let markdown = if config.enable_markdown_rendering {
			match MarkdownRenderer::new(&config.code_theme) {
				Ok(renderer) => Some(renderer),
				Err(e) => {
					crate::log_debug!("Markdown rendering disabled: {}", e);
					None
				}
			}
		} else {
			None
		};

		Self {
			show_reasoning: config.show_reasoning,
			streaming: config.stream,
			markdown,
			mode: Mode::default(),
			section: Section::None,
			at_line_start: true,
			is_terminal: stdout().is_terminal(),
		}
	}

	fn write(&mut self, text: &str) {
		if text.is_empty() {
			return;
		}
		print!("{}", text);
		let _ = stdout().flush();
		self.at_line_start = text.ends_with('\n');
	}

	fn enter(&mut self, section: Section) {
		if self.section == section {
			return;
		}
		match (self.section, section) {
			(Section::None, Section::Reasoning) => {
				self.write(&format!("{}\n", "Thinking:".bright_black().italic()));
			}
			(Section::Reasoning, Section::Content) => {
				let separator = if self.at_line_start { "\n" } else { "\n\n" };
				self.write(separator);
			}
			_ => {}
		}
		self.section = section;
	}

	fn write_reasoning(&mut self, text: &str) {
		let mut quoted = String::new();
		for (i, line) in text.split('\n').enumerate() {
			if i > 0 {
				quoted.push('\n');
			}
			let starts_line = if i == 0 { self.at_line_start } else { true };
			if starts_line && !line.is_empty() {
				quoted.push_str("> ");
			}
			quoted.push_str(line);
		}
		let styled = quoted.bright_black().to_string();
		self.write(&styled);
		// Styling codes can hide the trailing newline from `write`
		self.at_line_start = text.ends_with('\n');
	}

	fn write_content(&mut self, text: &str) {
		// Buffered answers arrive whole and can be rendered as markdown
		let render_markdown = !self.streaming && self.mode != Mode::Execute && is_markdown_content(text);
		let rendered = match &self.markdown {
			Some(markdown) if render_markdown => Some(markdown.render(text)),
			_ => None,
		};
		match rendered {
			Some(rendered) => self.write(&rendered),
			None => self.write(text),
		}
	}
}

impl Renderer for TerminalRenderer {
	fn begin_response(&mut self, mode: Mode) {
		self.mode = mode;
		self.section = Section::None;
		self.at_line_start = true;
		if mode != Mode::Execute {
			self.write(&format!("{}\n", "Assistant:".bright_green().bold()));
		}
	}

	fn fragment(&mut self, fragment: &Fragment) {
		match fragment {
			Fragment::Reasoning(text) => {
				if self.show_reasoning {
					self.enter(Section::Reasoning);
					self.write_reasoning(text);
				}
			}
			Fragment::Content(text) => {
				self.enter(Section::Content);
				self.write_content(text);
			}
		}
	}

	fn end_response(&mut self) {
		if !self.at_line_start {
			self.write("\n");
		}
		self.section = Section::None;
	}

	fn show_command(&mut self, command: &str) {
		let width = command.lines().map(|l| l.chars().count()).max().unwrap_or(0).max(8);
		let border = "─".repeat(width + 2);

		println!("{}", format!("╭─ Command {}╮", "─".repeat(width.saturating_sub(8))).bright_magenta());
		for line in command.lines() {
			let padding = " ".repeat(width - line.chars().count());
			println!(
				"{} {}{} {}",
				"│".bright_magenta(),
				line.bold(),
				padding,
				"│".bright_magenta()
			);
		}
		println!("{}", format!("╰{}╯", border).bright_magenta());
		self.at_line_start = true;
	}

	fn exec_outcome(&mut self, outcome: &ExecOutcome) {
		if outcome.success {
			return;
		}
		match outcome.code {
			Some(code) => println!(
				"{} {}",
				"Command failed with exit code:".red(),
				code.to_string().red().bold()
			),
			None => println!("{}", "Command did not complete".red()),
		}
	}

	fn error(&mut self, message: &str) {
		if !self.at_line_start {
			println!();
			self.at_line_start = true;
		}
		crate::log_error!("Error: {}", message);
	}

	fn notice(&mut self, message: &str) {
		println!("{}", message.yellow());
		self.at_line_start = true;
	}

	fn history(&mut self, messages: &[Message]) {
		if messages.is_empty() {
			println!("{}", "History is empty".bright_black());
			return;
		}
		for (i, message) in messages.iter().enumerate() {
			let role = match message.role {
				Role::User => "user".bright_blue().bold(),
				Role::Assistant => "assistant".bright_green().bold(),
				Role::System => "system".bright_black().bold(),
			};
			println!("{} {}: {}", format!("[{}]", i + 1).bright_black(), role, message.content);
		}
	}

	fn mode_changed(&mut self, mode: Mode) {
		let label = match mode {
			Mode::Execute => "Switched to exec mode: answers are shell commands".bright_magenta(),
			_ => format!("Switched to {} mode", mode).bright_blue(),
		};
		println!("{}", label);
	}

	fn show_spinner(&self) -> bool {
		self.is_terminal
	}
}
