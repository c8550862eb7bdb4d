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

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::path::PathBuf;

use crate::session::chat::Mode;

pub mod defaults;
pub mod loading;
pub mod validation;

pub use defaults::{ConfigDefaults, DEFAULT_CONFIG_TEMPLATE};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
	#[serde(rename = "none")]
	#[default]
	None,
	#[serde(rename = "info")]
	Info,
	#[serde(rename = "debug")]
	Debug,
}

impl LogLevel {
	/// Check if info logging is enabled
	pub fn is_info_enabled(&self) -> bool {
		matches!(self, LogLevel::Info | LogLevel::Debug)
	}

	/// Check if debug logging is enabled
	pub fn is_debug_enabled(&self) -> bool {
		matches!(self, LogLevel::Debug)
	}
}

// Default functions
fn default_base_url() -> String {
	ConfigDefaults::DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
	ConfigDefaults::DEFAULT_MODEL.to_string()
}

fn default_completion_path() -> String {
	ConfigDefaults::DEFAULT_COMPLETION_PATH.to_string()
}

fn default_answer_path() -> String {
	ConfigDefaults::DEFAULT_ANSWER_PATH.to_string()
}

fn default_delta_answer_path() -> String {
	ConfigDefaults::DEFAULT_DELTA_ANSWER_PATH.to_string()
}

fn default_reasoning_path() -> String {
	ConfigDefaults::DEFAULT_REASONING_PATH.to_string()
}

fn default_delta_reasoning_path() -> String {
	ConfigDefaults::DEFAULT_DELTA_REASONING_PATH.to_string()
}

fn default_true() -> bool {
	true
}

fn default_temperature() -> f64 {
	ConfigDefaults::DEFAULT_TEMPERATURE
}

fn default_top_p() -> f64 {
	ConfigDefaults::DEFAULT_TOP_P
}

fn default_max_tokens() -> u32 {
	ConfigDefaults::DEFAULT_MAX_TOKENS
}

fn default_timeout_seconds() -> u64 {
	ConfigDefaults::DEFAULT_TIMEOUT_SECONDS
}

fn default_code_theme() -> String {
	ConfigDefaults::DEFAULT_CODE_THEME.to_string()
}

fn default_auto() -> String {
	ConfigDefaults::AUTO_DETECT.to_string()
}

/// Immutable configuration snapshot used by the session engine.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
	#[serde(default)]
	pub log_level: LogLevel,

	// Endpoint
	#[serde(default = "default_base_url")]
	pub base_url: String,
	#[serde(default)]
	pub api_key: String,
	#[serde(default = "default_model")]
	pub model: String,
	#[serde(default = "default_completion_path")]
	pub completion_path: String,

	// Response parsing
	#[serde(default = "default_answer_path")]
	pub answer_path: String,
	#[serde(default = "default_delta_answer_path")]
	pub delta_answer_path: String,
	#[serde(default = "default_reasoning_path")]
	pub reasoning_path: String,
	#[serde(default = "default_delta_reasoning_path")]
	pub delta_reasoning_path: String,

	// Request parameters
	#[serde(default = "default_true")]
	pub stream: bool,
	#[serde(default = "default_temperature")]
	pub temperature: f64,
	#[serde(default = "default_top_p")]
	pub top_p: f64,
	#[serde(default = "default_max_tokens")]
	pub max_tokens: u32,
	#[serde(default = "default_timeout_seconds")]
	pub timeout_seconds: u64,

	// Session behaviour
	#[serde(default)]
	pub default_mode: Mode,
	#[serde(default = "default_auto")]
	pub shell_name: String,
	#[serde(default = "default_auto")]
	pub os_name: String,

	// Rendering
	#[serde(default = "default_true")]
	pub show_reasoning: bool,
	#[serde(default = "default_true")]
	pub enable_markdown_rendering: bool,
	#[serde(default = "default_code_theme")]
	pub code_theme: String,

	#[serde(skip)]
	pub(crate) config_path: Option<PathBuf>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			log_level: ConfigDefaults::DEFAULT_LOG_LEVEL,
			base_url: default_base_url(),
			api_key: String::new(),
			model: default_model(),
			completion_path: default_completion_path(),
			answer_path: default_answer_path(),
			delta_answer_path: default_delta_answer_path(),
			reasoning_path: default_reasoning_path(),
			delta_reasoning_path: default_delta_reasoning_path(),
			stream: true,
			temperature: default_temperature(),
			top_p: default_top_p(),
			max_tokens: default_max_tokens(),
			timeout_seconds: default_timeout_seconds(),
			default_mode: Mode::default(),
			shell_name: default_auto(),
			os_name: default_auto(),
			show_reasoning: true,
			enable_markdown_rendering: true,
			code_theme: default_code_theme(),
			config_path: None,
		}
	}
}

impl Config {
	/// Get the global log level (system-wide setting)
	pub fn get_log_level(&self) -> LogLevel {
		self.log_level
	}

	/// Path the configuration was loaded from, if any
	pub fn config_path(&self) -> Option<&PathBuf> {
		self.config_path.as_ref()
	}

	/// Full completion endpoint: base url and completion path joined by exactly one slash
	pub fn completion_url(&self) -> String {
		format!(
			"{}/{}",
			self.base_url.trim_end_matches('/'),
			self.completion_path.trim_start_matches('/')
		)
	}

	/// API key with everything but the last four characters masked
	pub fn masked_api_key(&self) -> String {
		let visible = self.api_key.chars().count().saturating_sub(4);
		self.api_key
			.chars()
			.enumerate()
			.map(|(i, c)| if i < visible { '*' } else { c })
			.collect()
	}
}

// Logging macros for different log levels
// These macros automatically check the current log level and only print if appropriate

thread_local! {
	static CURRENT_CONFIG: RefCell<Option<Config>> = const { RefCell::new(None) };
}

/// Set the current config for the thread (to be used by logging macros)
pub fn set_thread_config(config: &Config) {
	CURRENT_CONFIG.with(|c| {
		*c.borrow_mut() = Some(config.clone());
	});
}

/// Get the current config for the thread
pub fn with_thread_config<F, R>(f: F) -> Option<R>
where
	F: FnOnce(&Config) -> R,
{
	CURRENT_CONFIG.with(|c| (*c.borrow()).as_ref().map(f))
}

/// Info logging macro with automatic cyan coloring
/// Shows info messages when log level is Info OR Debug
#[macro_export]
macro_rules! log_info {
	($fmt:expr) => {
		if let Some(should_log) = $crate::config::with_thread_config(|config| config.get_log_level().is_info_enabled()) {
			if should_log {
				use colored::Colorize;
				println!("{}", $fmt.cyan());
			}
		}
	};
	($fmt:expr, $($arg:expr),*) => {
		if let Some(should_log) = $crate::config::with_thread_config(|config| config.get_log_level().is_info_enabled()) {
			if should_log {
				use colored::Colorize;
				println!("{}", format!($fmt, $($arg),*).cyan());
			}
		}
	};
}

/// Debug logging macro with automatic bright blue coloring
#[macro_export]
macro_rules! log_debug {
	($fmt:expr) => {
		if let Some(should_log) = $crate::config::with_thread_config(|config| config.get_log_level().is_debug_enabled()) {
			if should_log {
				use colored::Colorize;
				println!("{}", $fmt.bright_blue());
			}
		}
	};
	($fmt:expr, $($arg:expr),*) => {
		if let Some(should_log) = $crate::config::with_thread_config(|config| config.get_log_level().is_debug_enabled()) {
			if should_log {
				use colored::Colorize;
				println!("{}", format!($fmt, $($arg),*).bright_blue());
			}
		}
	};
}

/// Error logging macro with automatic bright red coloring
/// Always visible regardless of log level (errors should always be shown)
#[macro_export]
macro_rules! log_error {
	($fmt:expr) => {{
		use colored::Colorize;
		eprintln!("{}", $fmt.bright_red());
	}};
	($fmt:expr, $($arg:expr),*) => {{
		use colored::Colorize;
		eprintln!("{}", format!($fmt, $($arg),*).bright_red());
	}};
}
