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

//! Field-path expressions over JSON documents.
//!
//! A field path is a small JMESPath-like expression such as
//! `choices[0].message.content`. It is parsed once into a list of segments
//! and then evaluated against any number of `serde_json::Value` payloads.
//!
//! Grammar:
//!
//! ```text
//! path    := step ( "." field | "[" index "]" )*
//! step    := field | "[" index "]"
//! field   := identifier | '"' quoted '"'
//! index   := "-"? digits
//! ```

use serde_json::Value;
use std::fmt;

/// Maximum number of payload characters kept in an error for diagnosis
const PAYLOAD_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionReason {
	/// A segment does not exist in the document
	PathNotFound,
	/// The path resolved, but not to a string
	TypeMismatch,
	/// The expression itself could not be parsed
	InvalidPath,
}

impl fmt::Display for ExtractionReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ExtractionReason::PathNotFound => write!(f, "path not found"),
			ExtractionReason::TypeMismatch => write!(f, "value is not a string"),
			ExtractionReason::InvalidPath => write!(f, "invalid path expression"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason} at '{path}'{}", payload_suffix(.payload))]
pub struct ExtractionError {
	pub reason: ExtractionReason,
	pub path: String,
	/// Truncated raw payload (empty for parse errors)
	pub payload: String,
}

fn payload_suffix(payload: &str) -> String {
	if payload.is_empty() {
		String::new()
	} else {
		format!(" in payload: {}", payload)
	}
}

impl ExtractionError {
	fn new(reason: ExtractionReason, path: &str, payload: Option<&Value>) -> Self {
		Self {
			reason,
			path: path.to_string(),
			payload: payload.map(preview_payload).unwrap_or_default(),
		}
	}
}

/// Render a payload for an error message, truncated on a char boundary
pub fn preview_payload(payload: &Value) -> String {
	let raw = payload.to_string();
	truncate_chars(&raw, PAYLOAD_PREVIEW_CHARS)
}

pub(crate) fn truncate_chars(raw: &str, max: usize) -> String {
	match raw.char_indices().nth(max) {
		Some((idx, _)) => format!("{}...", &raw[..idx]),
		None => raw.to_string(),
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
	Field(String),
	Index(i64),
}

/// Parsed field-path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
	source: String,
	segments: Vec<Segment>,
}

impl fmt::Display for FieldPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.source)
	}
}

impl std::str::FromStr for FieldPath {
	type Err = ExtractionError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl FieldPath {
	pub fn parse(expression: &str) -> Result<Self, ExtractionError> {
		let source = expression.trim();
		let invalid = || ExtractionError::new(ExtractionReason::InvalidPath, source, None);

		if source.is_empty() {
			return Err(invalid());
		}

		let chars: Vec<char> = source.chars().collect();
		let mut segments = Vec::new();
		let mut pos = 0;
		// A field is allowed at the start and right after a dot
		let mut expect_field = true;

		while pos < chars.len() {
			match chars[pos] {
				'[' => {
					let close = chars[pos..]
						.iter()
						.position(|&c| c == ']')
						.map(|offset| pos + offset)
						.ok_or_else(invalid)?;
					let digits: String = chars[pos + 1..close].iter().collect();
					let index = digits.trim().parse::<i64>().map_err(|_| invalid())?;
					segments.push(Segment::Index(index));
					pos = close + 1;
					expect_field = false;
				}
				'.' => {
					if expect_field || pos + 1 >= chars.len() {
						return Err(invalid());
					}
					pos += 1;
					expect_field = true;
				}
				'"' if expect_field => {
					let close = chars[pos + 1..]
						.iter()
						.position(|&c| c == '"')
						.map(|offset| pos + 1 + offset)
						.ok_or_else(invalid)?;
					let name: String = chars[pos + 1..close].iter().collect();
					segments.push(Segment::Field(name));
					pos = close + 1;
					expect_field = false;
				}
				c if expect_field && is_identifier_char(c) => {
					let start = pos;
					while pos < chars.len() && is_identifier_char(chars[pos]) {
						pos += 1;
					}
					segments.push(Segment::Field(chars[start..pos].iter().collect()));
					expect_field = false;
				}
				_ => return Err(invalid()),
			}
		}

		if expect_field {
			return Err(invalid());
		}

		Ok(Self {
			source: source.to_string(),
			segments,
		})
	}

	pub fn segments(&self) -> &[Segment] {
		&self.segments
	}

	pub fn as_str(&self) -> &str {
		&self.source
	}

	/// Walk the document; `None` when any segment is missing
	pub fn resolve<'a>(&self, payload: &'a Value) -> Option<&'a Value> {
		let mut current = payload;
		for segment in &self.segments {
			current = match (segment, current) {
				(Segment::Field(name), Value::Object(map)) => map.get(name)?,
				(Segment::Index(index), Value::Array(items)) => {
					let len = items.len() as i64;
					let idx = if *index < 0 { len + index } else { *index };
					if idx < 0 || idx >= len {
						return None;
					}
					&items[idx as usize]
				}
				_ => return None,
			};
		}
		Some(current)
	}

	/// Extract a required string
	pub fn extract(&self, payload: &Value) -> Result<String, ExtractionError> {
		match self.resolve(payload) {
			Some(Value::String(text)) => Ok(text.clone()),
			Some(_) => Err(ExtractionError::new(
				ExtractionReason::TypeMismatch,
				&self.source,
				Some(payload),
			)),
			None => Err(ExtractionError::new(
				ExtractionReason::PathNotFound,
				&self.source,
				Some(payload),
			)),
		}
	}

	/// Extract an optional string: absent or `null` values are `Ok(None)`
	pub fn extract_optional(&self, payload: &Value) -> Result<Option<String>, ExtractionError> {
		match self.resolve(payload) {
			None | Some(Value::Null) => Ok(None),
			Some(Value::String(text)) => Ok(Some(text.clone())),
			Some(_) => Err(ExtractionError::new(
				ExtractionReason::TypeMismatch,
				&self.source,
				Some(payload),
			)),
		}
	}
}

fn is_identifier_char(c: char) -> bool {
	c.is_alphanumeric() || c == '_' || c == '-' || c == '$' || c == '@'
}

/// Parse `path` and extract the string it points to in one step
pub fn extract(payload: &Value, path: &str) -> Result<String, ExtractionError> {
	FieldPath::parse(path)?.extract(payload)
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn completion() -> Value {
		json!({
			"id": "chatcmpl-1",
			"choices": [
				{"index": 0, "message": {"role": "assistant", "content": "Hello there"}},
				{"index": 1, "message": {"role": "assistant", "content": "Second"}}
			],
			"usage": {"total_tokens": 12},
			"odd.key": {"value": "quoted"}
		})
	}

	#[test]
	fn test_default_answer_path() {
		let text = extract(&completion(), "choices[0].message.content").unwrap();
		assert_eq!(text, "Hello there");
	}

	#[test]
	fn test_negative_and_chained_indices() {
		let payload = json!({"grid": [["a", "b"], ["c", "d"]]});
		assert_eq!(extract(&payload, "grid[1][0]").unwrap(), "c");
		assert_eq!(extract(&payload, "grid[-1][-1]").unwrap(), "d");
		assert_eq!(extract(&json!(["x", "y"]), "[1]").unwrap(), "y");
	}

	#[test]
	fn test_quoted_field() {
		let text = extract(&completion(), "\"odd.key\".value").unwrap();
		assert_eq!(text, "quoted");
	}

	#[test]
	fn test_missing_segments_are_path_not_found() {
		let err = extract(&completion(), "choices[5].message.content").unwrap_err();
		assert_eq!(err.reason, ExtractionReason::PathNotFound);
		assert_eq!(err.path, "choices[5].message.content");
		assert!(err.payload.contains("chatcmpl-1"));

		let err = extract(&completion(), "choices[0].delta.content").unwrap_err();
		assert_eq!(err.reason, ExtractionReason::PathNotFound);

		// Indexing into an object is a miss, not a type error
		let err = extract(&completion(), "usage[0]").unwrap_err();
		assert_eq!(err.reason, ExtractionReason::PathNotFound);
	}

	#[test]
	fn test_non_string_is_type_mismatch() {
		let err = extract(&completion(), "usage.total_tokens").unwrap_err();
		assert_eq!(err.reason, ExtractionReason::TypeMismatch);

		let err = extract(&completion(), "choices[0].message").unwrap_err();
		assert_eq!(err.reason, ExtractionReason::TypeMismatch);
	}

	#[test]
	fn test_invalid_expressions() {
		for expression in ["", "choices[0", "choices[x]", "a..b", ".a", "a.", "a b", "a[0]b"] {
			let err = FieldPath::parse(expression).unwrap_err();
			assert_eq!(
				err.reason,
				ExtractionReason::InvalidPath,
				"expression {:?} should be invalid",
				expression
			);
		}
	}

	#[test]
	fn test_segments() {
		let path = FieldPath::parse("choices[0].delta.content").unwrap();
		assert_eq!(
			path.segments(),
			&[
				Segment::Field("choices".to_string()),
				Segment::Index(0),
				Segment::Field("delta".to_string()),
				Segment::Field("content".to_string()),
			]
		);
		assert_eq!(path.to_string(), "choices[0].delta.content");
	}

	#[test]
	fn test_extract_optional() {
		let path = FieldPath::parse("choices[0].delta.content").unwrap();

		let chunk = json!({"choices": [{"delta": {"content": "Hi"}}]});
		assert_eq!(path.extract_optional(&chunk).unwrap(), Some("Hi".to_string()));

		let role_only = json!({"choices": [{"delta": {"role": "assistant"}}]});
		assert_eq!(path.extract_optional(&role_only).unwrap(), None);

		let null_content = json!({"choices": [{"delta": {"content": null}}]});
		assert_eq!(path.extract_optional(&null_content).unwrap(), None);

		let usage_only = json!({"choices": [], "usage": {"total_tokens": 3}});
		assert_eq!(path.extract_optional(&usage_only).unwrap(), None);

		let wrong_type = json!({"choices": [{"delta": {"content": 42}}]});
		assert_eq!(
			path.extract_optional(&wrong_type).unwrap_err().reason,
			ExtractionReason::TypeMismatch
		);
	}

	#[test]
	fn test_payload_preview_is_truncated() {
		let long = json!({"text": "x".repeat(1000)});
		let err = extract(&long, "missing").unwrap_err();
		assert!(err.payload.ends_with("..."));
		assert_eq!(err.payload.chars().count(), PAYLOAD_PREVIEW_CHARS + 3);
	}
}
