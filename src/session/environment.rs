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

// Operating system and shell detection for system prompts and command execution

use std::path::Path;

use crate::config::{Config, ConfigDefaults};

/// Detected (or configured) runtime environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
	pub os_name: String,
	pub shell_name: String,
}

impl Environment {
	/// Resolve both names, honouring explicit values from the configuration
	pub fn detect(config: &Config) -> Self {
		let os_name = if ConfigDefaults::is_auto(&config.os_name) {
			detect_os()
		} else {
			config.os_name.clone()
		};

		let shell_name = if ConfigDefaults::is_auto(&config.shell_name) {
			detect_shell(std::env::consts::OS, |key| std::env::var(key).ok())
		} else {
			config.shell_name.clone()
		};

		crate::log_debug!("Environment: {} with {}", os_name, shell_name);

		Self {
			os_name,
			shell_name,
		}
	}
}

/// Human readable OS name, e.g. `Linux/Ubuntu 24.04 LTS` or `Darwin/MacOS`
pub fn detect_os() -> String {
	match std::env::consts::OS {
		"linux" => {
			let pretty = std::fs::read_to_string("/etc/os-release")
				.ok()
				.and_then(|contents| os_release_pretty_name(&contents));
			match pretty {
				Some(name) => format!("Linux/{}", name),
				None => "Linux".to_string(),
			}
		}
		"macos" => "Darwin/MacOS".to_string(),
		"windows" => "Windows".to_string(),
		other => other.to_string(),
	}
}

/// `PRETTY_NAME` from an os-release document
pub fn os_release_pretty_name(contents: &str) -> Option<String> {
	contents.lines().find_map(|line| {
		let value = line.trim().strip_prefix("PRETTY_NAME=")?;
		let value = value.trim().trim_matches('"').trim_matches('\'');
		if value.is_empty() {
			None
		} else {
			Some(value.to_string())
		}
	})
}

/// Shell name for the given platform and environment lookup
///
/// On Windows a `PSModulePath` with at least three entries means PowerShell.
/// Elsewhere the basename of `$SHELL` is used, falling back to `sh`.
pub fn detect_shell<F>(os: &str, env: F) -> String
where
	F: Fn(&str) -> Option<String>,
{
	if os == "windows" {
		let entries = env("PSModulePath")
			.map(|value| value.split(';').filter(|p| !p.is_empty()).count())
			.unwrap_or(0);
		return if entries >= 3 {
			"powershell.exe".to_string()
		} else {
			"cmd.exe".to_string()
		};
	}

	let shell = env("SHELL")
		.filter(|value| !value.trim().is_empty())
		.unwrap_or_else(|| "/bin/sh".to_string());

	Path::new(&shell)
		.file_name()
		.map(|name| name.to_string_lossy().to_string())
		.unwrap_or(shell)
}
