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

// Slash-command completion, hints and highlighting for rustyline

use colored::*;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::validate::Validator;
use rustyline::Helper;
use std::borrow::Cow::{self, Borrowed, Owned};

use super::commands::COMMANDS;

pub struct CommandHelper {
	commands: Vec<&'static str>,
	history_hinter: HistoryHinter,
}

impl CommandHelper {
	pub fn new() -> Self {
		Self {
			commands: COMMANDS.to_vec(),
			history_hinter: HistoryHinter {},
		}
	}

	/// Commands starting with `prefix`; empty unless the prefix is a slash command
	fn matching<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'static str> + 'a {
		self.commands
			.iter()
			.copied()
			.filter(move |cmd| prefix.starts_with('/') && cmd.starts_with(prefix))
	}

	fn is_known_prefix(&self, line: &str) -> bool {
		self.matching(line.trim_end()).next().is_some()
	}
}

impl Helper for CommandHelper {}

impl Completer for CommandHelper {
	type Candidate = Pair;

	fn complete(
		&self,
		line: &str,
		pos: usize,
		_ctx: &rustyline::Context<'_>,
	) -> Result<(usize, Vec<Self::Candidate>), ReadlineError> {
		let prefix = &line[..pos];
		let candidates = self
			.matching(prefix)
			.map(|cmd| Pair {
				display: cmd.to_string(),
				replacement: cmd.to_string(),
			})
			.collect();
		Ok((0, candidates))
	}
}

impl Hinter for CommandHelper {
	type Hint = String;

	fn hint(&self, line: &str, pos: usize, ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
		if line.starts_with('/') {
			self.matching(line)
				.next()
				.map(|cmd| cmd[line.len()..].to_string())
		} else {
			self.history_hinter.hint(line, pos, ctx)
		}
	}
}

impl Highlighter for CommandHelper {
	fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
		if line.starts_with('/') && self.is_known_prefix(line) {
			Owned(line.green().to_string())
		} else {
			Borrowed(line)
		}
	}

	fn highlight_char(&self, _line: &str, _pos: usize) -> bool {
		false
	}

	fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
		Owned(hint.bright_black().to_string())
	}
}

impl Validator for CommandHelper {}
