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

// Markdown rendering for complete (buffered) answers

use anyhow::Result;
use colored::*;
use regex::Regex;
use termimad::MadSkin;

use super::syntax::SyntaxHighlighter;

pub struct MarkdownRenderer {
	skin: MadSkin,
	code_block: Regex,
	highlighter: SyntaxHighlighter,
}

impl MarkdownRenderer {
	pub fn new(code_theme: &str) -> Result<Self> {
		let mut skin = MadSkin::default();

		use termimad::crossterm::style::Attribute;
		use termimad::crossterm::style::Color;

		skin.headers[0].set_fg(Color::Yellow);
		skin.headers[0].add_attr(Attribute::Bold);
		skin.headers[1].set_fg(Color::Blue);
		skin.headers[1].add_attr(Attribute::Bold);
		skin.headers[2].set_fg(Color::Cyan);
		skin.headers[2].add_attr(Attribute::Bold);

		skin.inline_code.set_bg(Color::Rgb { r: 60, g: 60, b: 60 });
		skin.inline_code.set_fg(Color::Yellow);
		skin.italic.set_fg(Color::Cyan);
		skin.bold.add_attr(Attribute::Bold);
		skin.quote_mark.set_fg(Color::Blue);
		skin.bullet.set_fg(Color::Green);

		Ok(Self {
			skin,
			code_block: Regex::new(r"```([\w+-]*)[^\n]*\n([\s\S]*?)\n?```")?,
			highlighter: SyntaxHighlighter::new(code_theme)?,
		})
	}

	/// Render to a string: prose through termimad, code blocks highlighted and framed
	pub fn render(&self, markdown: &str) -> String {
		let mut out = String::new();
		let mut last_end = 0;

		for cap in self.code_block.captures_iter(markdown) {
			let (Some(whole), Some(code)) = (cap.get(0), cap.get(2)) else {
				continue;
			};
			let language = cap
				.get(1)
				.map(|m| m.as_str())
				.filter(|l| !l.is_empty())
				.unwrap_or("text");

			self.render_prose(&markdown[last_end..whole.start()], &mut out);
			out.push_str(&self.frame_code(language, code.as_str()));
			last_end = whole.end();
		}

		self.render_prose(&markdown[last_end..], &mut out);
		out
	}

	fn render_prose(&self, text: &str, out: &mut String) {
		if text.trim().is_empty() {
			return;
		}
		out.push_str(&self.skin.term_text(text).to_string());
	}

	fn frame_code(&self, language: &str, code: &str) -> String {
		let mut body = code.to_string();
		if !body.ends_with('\n') {
			body.push('\n');
		}

		let body = match self.highlighter.highlight_code(&body, language) {
			Ok(highlighted) => highlighted,
			Err(e) => {
				crate::log_debug!("Highlighting failed for {}: {}", language, e);
				body
			}
		};

		let mut framed = format!("{}\n", format!("┌─ {} ─", language).bright_black());
		framed.push_str(&body);
		if !framed.ends_with('\n') {
			framed.push('\n');
		}
		framed.push_str(&format!("{}\n", "└─────".bright_black()));
		framed
	}
}

// Helper function to check if content looks like markdown
pub fn is_markdown_content(content: &str) -> bool {
	content.contains("```")
		|| content.lines().any(|l| l.trim_start().starts_with('#'))
		|| content.contains("**")
		|| content.contains("](")
		|| content.contains("| ")
		|| content.lines().any(|l| {
			let l = l.trim_start();
			l.starts_with("> ") || l.starts_with("- ") || l.starts_with("* ")
		})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_markdown_detection() {
		assert!(is_markdown_content("# Heading"));
		assert!(is_markdown_content("```rust\ncode\n```"));
		assert!(is_markdown_content("**bold text**"));
		assert!(is_markdown_content("[link](url)"));
		assert!(is_markdown_content("Steps:\n- one\n- two"));
		assert!(!is_markdown_content("plain text"));
		assert!(!is_markdown_content("2 * 2 = 4"));
	}

	fn strip_ansi(text: &str) -> String {
		Regex::new(r"\x1b\[[0-9;]*m").unwrap().replace_all(text, "").into_owned()
	}

	#[test]
	fn test_code_blocks_are_highlighted() {
		let renderer = MarkdownRenderer::new("base16-ocean.dark").unwrap();
		let rendered = renderer.render("Use this:\n```bash\nls -la | grep foo\n```\nDone.");
		assert!(rendered.contains("\x1b[38;2;"));

		let plain = strip_ansi(&rendered);
		assert!(plain.contains("ls -la | grep foo"));
		assert!(plain.contains("bash"));
		assert!(plain.contains("Done."));
	}

	#[test]
	fn test_unknown_theme_fails_construction() {
		assert!(MarkdownRenderer::new("monokai").is_err());
	}

	#[test]
	fn test_plain_prose_survives() {
		let renderer = MarkdownRenderer::new("base16-ocean.dark").unwrap();
		assert!(strip_ansi(&renderer.render("The answer is 4")).contains("The answer is 4"));
		assert!(renderer.render("").is_empty());
	}
}
