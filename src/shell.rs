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

// Execution of confirmed commands in the user's shell

use anyhow::{Context, Result};
use std::process::Command;

/// Exit status of an executed command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOutcome {
	/// `None` when the process was terminated by a signal
	pub code: Option<i32>,
	pub success: bool,
}

impl ExecOutcome {
	pub fn from_status(status: std::process::ExitStatus) -> Self {
		Self {
			code: status.code(),
			success: status.success(),
		}
	}
}

/// Runs a confirmed command. Output goes straight to the terminal.
pub trait ShellExecutor {
	fn execute(&mut self, command: &str) -> Result<ExecOutcome>;
}

/// Executor backed by the detected system shell
pub struct SystemShell {
	shell_name: String,
}

impl SystemShell {
	pub fn new(shell_name: impl Into<String>) -> Self {
		Self {
			shell_name: shell_name.into(),
		}
	}

	/// Program and arguments used to run `command`
	pub fn invocation(&self, command: &str) -> (String, Vec<String>) {
		let name = self.shell_name.to_lowercase();
		let base = name.trim_end_matches(".exe");

		match base {
			"powershell" | "pwsh" => (
				self.shell_name.clone(),
				vec![
					"-NoProfile".to_string(),
					"-Command".to_string(),
					command.to_string(),
				],
			),
			"cmd" => (
				self.shell_name.clone(),
				vec!["/C".to_string(), command.to_string()],
			),
			"" => ("sh".to_string(), vec!["-c".to_string(), command.to_string()]),
			_ => (
				self.shell_name.clone(),
				vec!["-c".to_string(), command.to_string()],
			),
		}
	}
}

impl ShellExecutor for SystemShell {
	fn execute(&mut self, command: &str) -> Result<ExecOutcome> {
		let (program, args) = self.invocation(command);
		crate::log_debug!("Running through {}: {}", program, command);

		let status = Command::new(&program)
			.args(&args)
			.status()
			.with_context(|| format!("Failed to start shell '{}'", program))?;

		Ok(ExecOutcome::from_status(status))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_invocation_per_shell() {
		let (program, args) = SystemShell::new("zsh").invocation("ls -la");
		assert_eq!(program, "zsh");
		assert_eq!(args, vec!["-c", "ls -la"]);

		let (program, args) = SystemShell::new("powershell.exe").invocation("Get-ChildItem");
		assert_eq!(program, "powershell.exe");
		assert_eq!(args, vec!["-NoProfile", "-Command", "Get-ChildItem"]);

		let (program, args) = SystemShell::new("cmd.exe").invocation("dir");
		assert_eq!(program, "cmd.exe");
		assert_eq!(args, vec!["/C", "dir"]);

		let (program, _) = SystemShell::new("").invocation("true");
		assert_eq!(program, "sh");
	}

	#[cfg(unix)]
	#[test]
	fn test_exit_status_is_reported() {
		let mut shell = SystemShell::new("sh");
		let outcome = shell.execute("exit 3").unwrap();
		assert_eq!(outcome.code, Some(3));
		assert!(!outcome.success);

		let outcome = shell.execute("true").unwrap();
		assert!(outcome.success);
	}

	#[test]
	fn test_missing_shell_is_an_error() {
		let mut shell = SystemShell::new("definitely-not-a-shell-binary");
		let err = shell.execute("true").unwrap_err();
		assert!(err.to_string().contains("definitely-not-a-shell-binary"));
	}
}
