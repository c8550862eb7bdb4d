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

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;

use super::{Config, ConfigDefaults, DEFAULT_CONFIG_TEMPLATE};

impl Config {
	/// Load configuration with priority:
	/// 1. Environment variables (highest)
	/// 2. Configuration file
	/// 3. Built-in defaults (lowest)
	///
	/// A commented default file is created when none exists yet.
	pub fn load() -> Result<Self> {
		let config_path = crate::directories::get_config_file_path()?;

		if !config_path.exists() {
			Self::write_template(&config_path)?;
			crate::log_info!(
				"Created default configuration file at {}",
				config_path.display()
			);
		}

		Self::load_from_path(&config_path)
	}

	/// Load configuration from a specific file path, applying process environment overrides
	pub fn load_from_path(path: &Path) -> Result<Self> {
		let config_str = fs::read_to_string(path)
			.context(format!("Failed to read config from {}", path.display()))?;

		let mut config = Self::from_sources(Some(&config_str), |key| std::env::var(key).ok())?;
		config.config_path = Some(path.to_path_buf());
		Ok(config)
	}

	/// Merge defaults, an optional TOML document and an environment lookup.
	///
	/// Empty strings in the file do not override a default, except for the
	/// reasoning paths where an empty string disables extraction. Environment values
	/// are parsed according to the type of the field they override.
	pub fn from_sources<F>(file_contents: Option<&str>, env: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut table = toml::Table::new();

		if let Some(contents) = file_contents {
			let file_table: toml::Table =
				toml::from_str(contents).context("Failed to parse TOML configuration")?;
			for (key, value) in file_table {
				let is_empty = matches!(&value, toml::Value::String(s) if s.trim().is_empty());
				if is_empty && !ConfigDefaults::CLEARABLE_FIELDS.contains(&key.as_str()) {
					continue;
				}
				table.insert(key, value);
			}
		}

		// Resolve the file layer first so every known key has a typed value to override
		let file_layer: Config = toml::Value::Table(table)
			.try_into()
			.context("Invalid value in configuration file")?;
		let mut merged = match toml::Value::try_from(&file_layer)
			.context("Failed to serialize configuration")?
		{
			toml::Value::Table(table) => table,
			_ => return Err(anyhow!("Configuration did not serialize to a table")),
		};

		for (key, value) in merged.iter_mut() {
			let env_key = format!("{}{}", ConfigDefaults::ENV_PREFIX, key.to_uppercase());
			if let Some(raw) = env(&env_key) {
				*value = parse_env_value(&env_key, &raw, value)?;
			}
		}

		let mut config: Config = toml::Value::Table(merged)
			.try_into()
			.context("Invalid value in environment override")?;

		if config.api_key.trim().is_empty() {
			if let Some(key) = env(ConfigDefaults::FALLBACK_API_KEY_ENV) {
				config.api_key = key;
			}
		}

		Ok(config)
	}

	fn write_template(path: &Path) -> Result<()> {
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).context(format!(
				"Failed to create config directory: {}",
				parent.display()
			))?;
		}

		fs::write(path, DEFAULT_CONFIG_TEMPLATE)
			.context(format!("Failed to write config to {}", path.display()))?;
		Ok(())
	}
}

/// Parse an environment override into the same TOML type as the value it replaces
fn parse_env_value(env_key: &str, raw: &str, current: &toml::Value) -> Result<toml::Value> {
	let raw = raw.trim();
	let parsed = match current {
		toml::Value::Boolean(_) => match raw.to_lowercase().as_str() {
			"true" | "1" | "yes" | "on" => toml::Value::Boolean(true),
			"false" | "0" | "no" | "off" => toml::Value::Boolean(false),
			_ => return Err(anyhow!("{} should be a boolean, got '{}'", env_key, raw)),
		},
		toml::Value::Integer(_) => toml::Value::Integer(
			raw.parse::<i64>()
				.map_err(|_| anyhow!("{} should be an integer, got '{}'", env_key, raw))?,
		),
		toml::Value::Float(_) => toml::Value::Float(
			raw.parse::<f64>()
				.map_err(|_| anyhow!("{} should be a number, got '{}'", env_key, raw))?,
		),
		_ => toml::Value::String(raw.to_string()),
	};
	Ok(parsed)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::LogLevel;
	use crate::session::chat::Mode;
	use std::collections::HashMap;

	fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> = pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |key| map.get(key).cloned()
	}

	#[test]
	fn test_defaults_without_file_or_env() {
		let config = Config::from_sources(None, env_from(&[])).unwrap();
		assert_eq!(config, Config::default());
	}

	#[test]
	fn test_file_overrides_defaults_but_not_with_empty_strings() {
		let file = r#"
			model = "deepseek-chat"
			base_url = ""
			stream = false
			max_tokens = 2048
			default_mode = "exec"
		"#;
		let config = Config::from_sources(Some(file), env_from(&[])).unwrap();
		assert_eq!(config.model, "deepseek-chat");
		assert_eq!(config.base_url, ConfigDefaults::DEFAULT_BASE_URL);
		assert!(!config.stream);
		assert_eq!(config.max_tokens, 2048);
		assert_eq!(config.default_mode, Mode::Execute);
	}

	#[test]
	fn test_empty_reasoning_paths_in_file_disable_extraction() {
		let file = r#"
			reasoning_path = ""
			delta_reasoning_path = ""
			answer_path = ""
		"#;
		let config = Config::from_sources(Some(file), env_from(&[])).unwrap();
		assert!(config.reasoning_path.is_empty());
		assert!(config.delta_reasoning_path.is_empty());
		assert_eq!(config.answer_path, ConfigDefaults::DEFAULT_ANSWER_PATH);
		config.validate_paths().unwrap();
	}

	#[test]
	fn test_parameters_keep_their_decimal_value() {
		let config = Config::from_sources(Some("temperature = 0.3
top_p = 0.9
"), env_from(&[])).unwrap();
		assert_eq!(config.temperature, 0.3);
		assert_eq!(config.top_p, 0.9);
	}

	#[test]
	fn test_environment_takes_precedence_over_file() {
		let file = r#"
			model = "from-file"
			stream = true
			temperature = 0.2
		"#;
		let env = env_from(&[
			("OCTOSHELL_MODEL", "from-env"),
			("OCTOSHELL_STREAM", "FALSE"),
			("OCTOSHELL_TEMPERATURE", "1.1"),
			("OCTOSHELL_LOG_LEVEL", "debug"),
			("OCTOSHELL_MAX_TOKENS", "99"),
		]);
		let config = Config::from_sources(Some(file), env).unwrap();
		assert_eq!(config.model, "from-env");
		assert!(!config.stream);
		assert_eq!(config.temperature, 1.1);
		assert_eq!(config.log_level, LogLevel::Debug);
		assert_eq!(config.max_tokens, 99);
	}

	#[test]
	fn test_invalid_environment_value_is_reported() {
		let env = env_from(&[("OCTOSHELL_MAX_TOKENS", "lots")]);
		let err = Config::from_sources(None, env).unwrap_err();
		assert!(err.to_string().contains("OCTOSHELL_MAX_TOKENS"));
	}

	#[test]
	fn test_fallback_api_key() {
		let env = env_from(&[("OPENAI_API_KEY", "sk-fallback")]);
		let config = Config::from_sources(None, env).unwrap();
		assert_eq!(config.api_key, "sk-fallback");

		let env = env_from(&[
			("OPENAI_API_KEY", "sk-fallback"),
			("OCTOSHELL_API_KEY", "sk-primary"),
		]);
		let config = Config::from_sources(None, env).unwrap();
		assert_eq!(config.api_key, "sk-primary");
	}

	#[test]
	fn test_load_from_path_records_location() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		fs::write(&path, "model = \"local-llama\"\napi_key = \"k\"\n").unwrap();

		let config = Config::load_from_path(&path).unwrap();
		assert_eq!(config.config_path(), Some(&path));
		assert!(!config.model.is_empty());
	}

	#[test]
	fn test_write_template_creates_parent_dirs() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("nested").join("config.toml");
		Config::write_template(&path).unwrap();

		let contents = fs::read_to_string(&path).unwrap();
		assert_eq!(contents, DEFAULT_CONFIG_TEMPLATE);
	}

	#[test]
	fn test_malformed_file_is_an_error() {
		let err = Config::from_sources(Some("model = "), env_from(&[])).unwrap_err();
		assert!(err.to_string().contains("Failed to parse TOML"));
	}
}
