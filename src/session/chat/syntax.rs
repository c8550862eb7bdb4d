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

// Syntax highlighting for code blocks

use anyhow::{anyhow, Result};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Style, Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};

const RESET: &str = "\x1b[0m";

pub struct SyntaxHighlighter {
	syntax_set: SyntaxSet,
	theme: Theme,
}

impl SyntaxHighlighter {
	pub fn new(theme_name: &str) -> Result<Self> {
		let mut theme_set = ThemeSet::load_defaults();
		let theme = theme_set
			.themes
			.remove(theme_name)
			.ok_or_else(|| anyhow!("Unknown code theme '{}'", theme_name))?;

		Ok(Self {
			syntax_set: SyntaxSet::load_defaults_newlines(),
			theme,
		})
	}

	/// Highlight `code` for the terminal; unknown languages fall back to plain text
	pub fn highlight_code(&self, code: &str, language: &str) -> Result<String> {
		let syntax = self
			.syntax_set
			.find_syntax_by_token(language)
			.or_else(|| self.syntax_set.find_syntax_by_extension(language))
			.unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

		let mut highlighter = HighlightLines::new(syntax, &self.theme);
		let mut highlighted = String::new();

		for line in LinesWithEndings::from(code) {
			let ranges: Vec<(Style, &str)> = highlighter.highlight_line(line, &self.syntax_set)?;
			highlighted.push_str(&as_24_bit_terminal_escaped(&ranges[..], false));
		}
		highlighted.push_str(RESET);

		Ok(highlighted)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_unknown_theme_is_rejected() {
		assert!(SyntaxHighlighter::new("base16-ocean.dark").is_ok());
		assert!(SyntaxHighlighter::new("no-such-theme").is_err());
	}

	#[test]
	fn test_shell_highlighting() {
		let highlighter = SyntaxHighlighter::new("base16-ocean.dark").unwrap();
		let result = highlighter.highlight_code("echo \"hi\"\n", "bash").unwrap();
		// 24-bit foreground escapes
		assert!(result.contains("\x1b[38;2;"));
		assert!(result.ends_with(RESET));
	}

	#[test]
	fn test_unknown_language_is_plain_text() {
		let highlighter = SyntaxHighlighter::new("InspiredGitHub").unwrap();
		let result = highlighter.highlight_code("just words\n", "not-a-language").unwrap();
		assert!(result.contains("just words"));
	}
}
