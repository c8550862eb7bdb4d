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

use anyhow::{anyhow, Result};
use syntect::highlighting::ThemeSet;

use super::Config;
use crate::session::extract::FieldPath;

impl Config {
	/// Validate the configuration for common issues
	///
	/// Any error here is fatal: the session never starts with an invalid snapshot.
	pub fn validate(&self) -> Result<()> {
		self.validate_api_key()?;
		self.validate_endpoint()?;
		self.validate_parameters()?;
		self.validate_paths()?;
		self.validate_code_theme()?;
		Ok(())
	}

	pub fn validate_api_key(&self) -> Result<()> {
		if self.api_key.trim().is_empty() {
			return Err(anyhow!(
				"API key not set. Set api_key in {} or the OCTOSHELL_API_KEY environment variable",
				self.config_path()
					.map(|p| p.display().to_string())
					.unwrap_or_else(|| "the config file".to_string())
			));
		}
		Ok(())
	}

	pub fn validate_endpoint(&self) -> Result<()> {
		let base_url = self.base_url.trim();
		if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
			return Err(anyhow!(
				"Invalid base_url '{}'. It must start with http:// or https://",
				self.base_url
			));
		}

		if self.model.trim().is_empty() {
			return Err(anyhow!("Model name cannot be empty"));
		}

		Ok(())
	}

	pub fn validate_parameters(&self) -> Result<()> {
		if !(0.0..=2.0).contains(&self.temperature) {
			return Err(anyhow!(
				"Temperature out of range: {}. Allowed range: 0.0 - 2.0",
				self.temperature
			));
		}

		if !(0.0..=1.0).contains(&self.top_p) {
			return Err(anyhow!(
				"top_p out of range: {}. Allowed range: 0.0 - 1.0",
				self.top_p
			));
		}

		if self.max_tokens == 0 {
			return Err(anyhow!("max_tokens must be greater than 0"));
		}

		if self.timeout_seconds == 0 {
			return Err(anyhow!("timeout_seconds must be greater than 0"));
		}

		Ok(())
	}

	pub fn validate_paths(&self) -> Result<()> {
		let required = [
			("answer_path", &self.answer_path),
			("delta_answer_path", &self.delta_answer_path),
		];
		for (name, path) in required {
			FieldPath::parse(path).map_err(|e| anyhow!("Invalid {}: {}", name, e))?;
		}

		// Reasoning paths may be left empty to disable reasoning extraction
		let optional = [
			("reasoning_path", &self.reasoning_path),
			("delta_reasoning_path", &self.delta_reasoning_path),
		];
		for (name, path) in optional {
			if !path.trim().is_empty() {
				FieldPath::parse(path).map_err(|e| anyhow!("Invalid {}: {}", name, e))?;
			}
		}

		Ok(())
	}

	pub fn validate_code_theme(&self) -> Result<()> {
		if !self.enable_markdown_rendering {
			return Ok(());
		}

		let themes = ThemeSet::load_defaults();
		if !themes.themes.contains_key(&self.code_theme) {
			let mut known: Vec<&str> = themes.themes.keys().map(String::as_str).collect();
			known.sort_unstable();
			return Err(anyhow!(
				"Unknown code_theme '{}'. Available themes: {}",
				self.code_theme,
				known.join(", ")
			));
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn valid_config() -> Config {
		Config {
			api_key: "sk-test".to_string(),
			..Default::default()
		}
	}

	#[test]
	fn test_default_config_with_key_is_valid() {
		assert!(valid_config().validate().is_ok());
	}

	#[test]
	fn test_missing_api_key_is_fatal() {
		let config = Config::default();
		let err = config.validate().unwrap_err();
		assert!(err.to_string().contains("API key not set"));
	}

	#[test]
	fn test_endpoint_validation() {
		let config = Config {
			base_url: "api.openai.com/v1".to_string(),
			..valid_config()
		};
		assert!(config.validate().is_err());

		let config = Config {
			model: "  ".to_string(),
			..valid_config()
		};
		assert!(config.validate().is_err());
	}

	#[test]
	fn test_parameter_ranges() {
		let config = Config {
			temperature: 2.5,
			..valid_config()
		};
		assert!(config.validate_parameters().is_err());

		let config = Config {
			top_p: -0.1,
			..valid_config()
		};
		assert!(config.validate_parameters().is_err());

		let config = Config {
			max_tokens: 0,
			..valid_config()
		};
		assert!(config.validate_parameters().is_err());

		let config = Config {
			timeout_seconds: 0,
			..valid_config()
		};
		assert!(config.validate_parameters().is_err());
	}

	#[test]
	fn test_path_validation() {
		let config = Config {
			answer_path: "choices[0.message".to_string(),
			..valid_config()
		};
		let err = config.validate().unwrap_err();
		assert!(err.to_string().contains("answer_path"));

		// Empty reasoning paths disable reasoning instead of failing
		let config = Config {
			reasoning_path: String::new(),
			delta_reasoning_path: String::new(),
			..valid_config()
		};
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_code_theme_must_exist() {
		assert!(valid_config().validate_code_theme().is_ok());

		let config = Config {
			code_theme: "monokai".to_string(),
			..valid_config()
		};
		let err = config.validate().unwrap_err();
		assert!(err.to_string().contains("base16-ocean.dark"));

		// Unused when markdown rendering is off
		let config = Config {
			code_theme: "monokai".to_string(),
			enable_markdown_rendering: false,
			..valid_config()
		};
		assert!(config.validate_code_theme().is_ok());
	}
}
