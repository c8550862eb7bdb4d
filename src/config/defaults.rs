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

//! Default configuration values and the commented template written on first run.

use super::*;

/// Centralized default values for all configuration options
pub struct ConfigDefaults;

impl ConfigDefaults {
	pub const DEFAULT_LOG_LEVEL: LogLevel = LogLevel::None;
	pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
	pub const DEFAULT_MODEL: &'static str = "gpt-4o";
	pub const DEFAULT_COMPLETION_PATH: &'static str = "chat/completions";
	pub const DEFAULT_ANSWER_PATH: &'static str = "choices[0].message.content";
	pub const DEFAULT_DELTA_ANSWER_PATH: &'static str = "choices[0].delta.content";
	pub const DEFAULT_REASONING_PATH: &'static str = "choices[0].message.reasoning_content";
	pub const DEFAULT_DELTA_REASONING_PATH: &'static str = "choices[0].delta.reasoning_content";
	pub const DEFAULT_TEMPERATURE: f64 = 0.7;
	pub const DEFAULT_TOP_P: f64 = 1.0;
	pub const DEFAULT_MAX_TOKENS: u32 = 1024;
	pub const DEFAULT_TIMEOUT_SECONDS: u64 = 120;
	pub const DEFAULT_CODE_THEME: &'static str = "base16-ocean.dark";

	/// Marker for shell/OS names that should be detected at startup
	pub const AUTO_DETECT: &'static str = "auto";

	/// Environment variable prefix for overrides (OCTOSHELL_API_KEY, OCTOSHELL_MODEL, ...)
	pub const ENV_PREFIX: &'static str = "OCTOSHELL_";

	/// Conventional key variable used when no octoshell-specific key is set
	pub const FALLBACK_API_KEY_ENV: &'static str = "OPENAI_API_KEY";

	/// Fields where an empty string in the file is a value, not "use the default"
	pub const CLEARABLE_FIELDS: [&'static str; 2] = ["reasoning_path", "delta_reasoning_path"];

	pub fn is_auto(value: &str) -> bool {
		value.trim().is_empty() || value.eq_ignore_ascii_case(Self::AUTO_DETECT)
	}
}

/// Commented configuration written to disk on first run and printed by `--template`
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# octoshell configuration
#
# Every value can be overridden with an environment variable named
# OCTOSHELL_<KEY IN UPPER CASE>, e.g. OCTOSHELL_API_KEY or OCTOSHELL_STREAM.

# none | info | debug
log_level = "none"

# OpenAI-compatible endpoint
base_url = "https://api.openai.com/v1"
# Leave empty to use OCTOSHELL_API_KEY or OPENAI_API_KEY
api_key = ""
model = "gpt-4o"
completion_path = "chat/completions"

# Where the answer lives in a buffered response and in each streamed chunk
answer_path = "choices[0].message.content"
delta_answer_path = "choices[0].delta.content"

# Optional reasoning ("thinking") fields; set to "" to disable extraction,
# or keep them and hide the output with show_reasoning = false
reasoning_path = "choices[0].message.reasoning_content"
delta_reasoning_path = "choices[0].delta.reasoning_content"

# true: streaming response, false: buffered response
stream = true
temperature = 0.7
top_p = 1.0
max_tokens = 1024
timeout_seconds = 120

# chat | exec | temp
default_mode = "chat"

# "auto" detects the shell and operating system at startup
shell_name = "auto"
os_name = "auto"

show_reasoning = true
enable_markdown_rendering = true
# Syntax theme for code blocks: base16-ocean.dark, base16-eighties.dark,
# base16-mocha.dark, base16-ocean.light, InspiredGitHub, Solarized (dark), Solarized (light)
code_theme = "base16-ocean.dark"
"#;
