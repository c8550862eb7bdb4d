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

// OpenAI-compatible chat completion client

use anyhow::{Context, Result};
use futures::StreamExt;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

use super::extract::{ExtractionError, FieldPath};
use super::stream::{split_think, Fragment, FragmentStream, ResponsePaths};
use super::Message;
use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkReason {
	Timeout,
	Connect,
	Other,
}

impl fmt::Display for NetworkReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			NetworkReason::Timeout => write!(f, "timed out"),
			NetworkReason::Connect => write!(f, "connection failed"),
			NetworkReason::Other => write!(f, "transport error"),
		}
	}
}

/// Failure of a single exchange. None of these are fatal to the session.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
	#[error("Network error ({reason}): {message}")]
	Network {
		reason: NetworkReason,
		message: String,
	},

	#[error("Request failed with HTTP {status}: {body}")]
	Request { status: u16, body: String },

	#[error("Failed to extract answer: {0}")]
	Extraction(#[from] ExtractionError),

	#[error("Stream error: {0}")]
	Stream(String),

	#[error("Request cancelled")]
	Cancelled,
}

impl CompletionError {
	pub fn from_transport(err: reqwest::Error) -> Self {
		let reason = if err.is_timeout() {
			NetworkReason::Timeout
		} else if err.is_connect() {
			NetworkReason::Connect
		} else {
			NetworkReason::Other
		};
		CompletionError::Network {
			reason,
			message: err.to_string(),
		}
	}
}

/// Provider message from an error body (`error.message`), or the raw body
pub(crate) fn provider_error_message(body: &str) -> String {
	let parsed = serde_json::from_str::<Value>(body).ok();
	let message = parsed.as_ref().and_then(|value| match value.get("error") {
		Some(Value::String(message)) => Some(message.clone()),
		Some(error) => error
			.get("message")
			.and_then(|m| m.as_str())
			.map(str::to_string),
		None => value
			.get("message")
			.and_then(|m| m.as_str())
			.map(str::to_string),
	});

	message.unwrap_or_else(|| body.trim().to_string())
}

fn optional_path(expression: &str) -> Result<Option<FieldPath>> {
	if expression.trim().is_empty() {
		return Ok(None);
	}
	Ok(Some(FieldPath::parse(expression)?))
}

pub struct CompletionClient {
	http: reqwest::Client,
	url: String,
	api_key: String,
	model: String,
	stream: bool,
	temperature: f64,
	top_p: f64,
	max_tokens: u32,
	paths: ResponsePaths,
}

impl CompletionClient {
	pub fn new(config: &Config) -> Result<Self> {
		let paths = ResponsePaths {
			answer: FieldPath::parse(&config.answer_path).context("Invalid answer_path")?,
			delta_answer: FieldPath::parse(&config.delta_answer_path)
				.context("Invalid delta_answer_path")?,
			reasoning: optional_path(&config.reasoning_path).context("Invalid reasoning_path")?,
			delta_reasoning: optional_path(&config.delta_reasoning_path)
				.context("Invalid delta_reasoning_path")?,
		};

		let http = reqwest::Client::builder()
			.timeout(Duration::from_secs(config.timeout_seconds))
			.build()
			.context("Failed to build HTTP client")?;

		Ok(Self {
			http,
			url: config.completion_url(),
			api_key: config.api_key.clone(),
			model: config.model.clone(),
			stream: config.stream,
			temperature: config.temperature,
			top_p: config.top_p,
			max_tokens: config.max_tokens,
			paths,
		})
	}

	pub fn is_streaming(&self) -> bool {
		self.stream
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	fn request_body(&self, messages: &[Message]) -> Value {
		json!({
			"model": self.model,
			"messages": messages,
			"stream": self.stream,
			"temperature": self.temperature,
			"top_p": self.top_p,
			"max_tokens": self.max_tokens,
		})
	}

	/// Send the full request sequence and return its fragments.
	///
	/// HTTP status and transport failures surface here; failures inside the
	/// body surface from the returned sequence.
	pub async fn send(&self, messages: &[Message]) -> Result<FragmentStream, CompletionError> {
		crate::log_debug!(
			"POST {} ({} messages, stream: {})",
			self.url,
			messages.len(),
			self.stream
		);

		let response = self
			.http
			.post(&self.url)
			.bearer_auth(&self.api_key)
			.json(&self.request_body(messages))
			.send()
			.await
			.map_err(CompletionError::from_transport)?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			crate::log_debug!("HTTP {} error body: {}", status, body);
			return Err(CompletionError::Request {
				status: status.as_u16(),
				body: provider_error_message(&body),
			});
		}

		if self.stream {
			let body = response
				.bytes_stream()
				.map(|chunk| chunk.map(|bytes| bytes.to_vec()));
			return Ok(FragmentStream::streaming(Box::pin(body), self.paths.clone()));
		}

		let text = response
			.text()
			.await
			.map_err(CompletionError::from_transport)?;
		let fragments = self.parse_buffered(&text)?;
		Ok(FragmentStream::buffered(fragments))
	}

	/// Unwrap a complete response body into reasoning and exactly one content fragment
	fn parse_buffered(&self, text: &str) -> Result<Vec<Fragment>, CompletionError> {
		// A non-JSON body is kept as a string so the path lookup reports it
		let payload: Value = serde_json::from_str(text).unwrap_or_else(|_| {
			crate::log_debug!("Response body is not JSON");
			Value::String(text.to_string())
		});

		if payload.get("error").is_some_and(|e| !e.is_null()) {
			return Err(CompletionError::Request {
				status: 200,
				body: provider_error_message(text),
			});
		}

		let answer = self.paths.answer.extract(&payload)?;
		let (inline_reasoning, content) = split_think(&answer);

		let mut reasoning = String::new();
		if let Some(path) = &self.paths.reasoning {
			match path.extract_optional(&payload) {
				Ok(Some(text)) => reasoning.push_str(&text),
				Ok(None) => {}
				Err(e) => crate::log_debug!("Ignoring reasoning field: {}", e),
			}
		}
		reasoning.push_str(&inline_reasoning);

		let mut fragments = Vec::with_capacity(2);
		if !reasoning.is_empty() {
			fragments.push(Fragment::Reasoning(reasoning));
		}
		fragments.push(Fragment::Content(content));
		Ok(fragments)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::session::extract::ExtractionReason;

	fn config_for(server: &mockito::ServerGuard, stream: bool) -> Config {
		Config {
			base_url: format!("{}/v1/", server.url()),
			api_key: "sk-test".to_string(),
			model: "test-model".to_string(),
			stream,
			..Default::default()
		}
	}

	fn sse_body(deltas: &[&str]) -> String {
		let mut body = String::new();
		for delta in deltas {
			body.push_str(&format!(
				"data: {}\n\n",
				json!({"choices": [{"index": 0, "delta": {"content": delta}}]})
			));
		}
		body.push_str("data: [DONE]\n\n");
		body
	}

	#[test]
	fn test_provider_error_message() {
		assert_eq!(
			provider_error_message(r#"{"error": {"message": "Invalid API key", "code": "401"}}"#),
			"Invalid API key"
		);
		assert_eq!(provider_error_message(r#"{"error": "quota"}"#), "quota");
		assert_eq!(provider_error_message(" Bad Gateway \n"), "Bad Gateway");
	}

	#[test]
	fn test_request_body_shape() {
		let client = CompletionClient::new(&Config {
			api_key: "k".to_string(),
			stream: false,
			..Default::default()
		})
		.unwrap();
		let body = client.request_body(&[Message::system("s"), Message::user("u")]);

		assert_eq!(body["model"], "gpt-4o");
		assert_eq!(body["stream"], false);
		assert_eq!(body["max_tokens"], 1024);
		assert_eq!(body["messages"][0], json!({"role": "system", "content": "s"}));
		assert_eq!(body["messages"][1], json!({"role": "user", "content": "u"}));
		assert_eq!(client.url(), "https://api.openai.com/v1/chat/completions");

		// Sampling parameters go out exactly as configured
		let serialized = body.to_string();
		assert!(serialized.contains(r#""temperature":0.7"#), "{}", serialized);
		assert!(serialized.contains(r#""top_p":1.0"#), "{}", serialized);
	}

	#[test]
	fn test_invalid_paths_fail_at_construction() {
		let config = Config {
			delta_answer_path: "choices[".to_string(),
			..Default::default()
		};
		assert!(CompletionClient::new(&config).is_err());

		let config = Config {
			reasoning_path: String::new(),
			delta_reasoning_path: String::new(),
			..Default::default()
		};
		assert!(CompletionClient::new(&config).is_ok());
	}

	#[tokio::test]
	async fn test_buffered_request() {
		let mut server = mockito::Server::new_async().await;
		let mock = server
			.mock("POST", "/v1/chat/completions")
			.match_header("authorization", "Bearer sk-test")
			.match_body(mockito::Matcher::PartialJson(json!({
				"model": "test-model",
				"stream": false,
				"messages": [{"role": "user", "content": "2+2"}]
			})))
			.with_status(200)
			.with_header("content-type", "application/json")
			.with_body(
				json!({"choices": [{"message": {"role": "assistant", "content": "4"}}]}).to_string(),
			)
			.create_async()
			.await;

		let client = CompletionClient::new(&config_for(&server, false)).unwrap();
		let mut stream = client.send(&[Message::user("2+2")]).await.unwrap();

		assert_eq!(
			stream.next().await.unwrap().unwrap(),
			Fragment::Content("4".to_string())
		);
		assert!(stream.next().await.is_none());
		mock.assert_async().await;
	}

	#[tokio::test]
	async fn test_streaming_matches_buffered_answer() {
		let answer_parts = ["The ", "answer", " is ", "4."];

		let mut server = mockito::Server::new_async().await;
		server
			.mock("POST", "/v1/chat/completions")
			.match_body(mockito::Matcher::PartialJson(json!({"stream": true})))
			.with_status(200)
			.with_header("content-type", "text/event-stream")
			.with_body(sse_body(&answer_parts))
			.create_async()
			.await;
		server
			.mock("POST", "/v1/chat/completions")
			.match_body(mockito::Matcher::PartialJson(json!({"stream": false})))
			.with_status(200)
			.with_body(
				json!({"choices": [{"message": {"content": answer_parts.concat()}}]}).to_string(),
			)
			.create_async()
			.await;

		let messages = [Message::user("what is 2+2?")];
		let streamed = CompletionClient::new(&config_for(&server, true))
			.unwrap()
			.send(&messages)
			.await
			.unwrap()
			.collect_text()
			.await
			.unwrap();
		let buffered = CompletionClient::new(&config_for(&server, false))
			.unwrap()
			.send(&messages)
			.await
			.unwrap()
			.collect_text()
			.await
			.unwrap();

		assert_eq!(streamed, "The answer is 4.");
		assert_eq!(streamed, buffered);
	}

	#[tokio::test]
	async fn test_unauthorized_is_request_error() {
		let mut server = mockito::Server::new_async().await;
		server
			.mock("POST", "/v1/chat/completions")
			.with_status(401)
			.with_body(r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#)
			.create_async()
			.await;

		let client = CompletionClient::new(&config_for(&server, true)).unwrap();
		match client.send(&[Message::user("hi")]).await {
			Err(CompletionError::Request { status, body }) => {
				assert_eq!(status, 401);
				assert_eq!(body, "Incorrect API key provided");
			}
			Err(other) => panic!("unexpected error: {}", other),
			Ok(_) => panic!("expected an error"),
		}
	}

	#[tokio::test]
	async fn test_buffered_extraction_error_carries_path() {
		let mut server = mockito::Server::new_async().await;
		server
			.mock("POST", "/v1/chat/completions")
			.with_status(200)
			.with_body(r#"{"output": "unexpected shape"}"#)
			.create_async()
			.await;

		let client = CompletionClient::new(&config_for(&server, false)).unwrap();
		match client.send(&[Message::user("hi")]).await {
			Err(CompletionError::Extraction(err)) => {
				assert_eq!(err.reason, ExtractionReason::PathNotFound);
				assert_eq!(err.path, "choices[0].message.content");
				assert!(err.payload.contains("unexpected shape"));
			}
			Err(other) => panic!("unexpected error: {}", other),
			Ok(_) => panic!("expected an error"),
		}
	}

	#[tokio::test]
	async fn test_buffered_in_band_error() {
		let mut server = mockito::Server::new_async().await;
		server
			.mock("POST", "/v1/chat/completions")
			.with_status(200)
			.with_body(r#"{"error": {"message": "model overloaded"}}"#)
			.create_async()
			.await;

		let client = CompletionClient::new(&config_for(&server, false)).unwrap();
		match client.send(&[Message::user("hi")]).await {
			Err(CompletionError::Request { status, body }) => {
				assert_eq!(status, 200);
				assert_eq!(body, "model overloaded");
			}
			Err(other) => panic!("unexpected error: {}", other),
			Ok(_) => panic!("expected an error"),
		}
	}

	#[tokio::test]
	async fn test_buffered_reasoning_is_split_out() {
		let mut server = mockito::Server::new_async().await;
		server
			.mock("POST", "/v1/chat/completions")
			.with_status(200)
			.with_body(
				json!({"choices": [{"message": {
					"content": "<think>add them</think>4",
					"reasoning_content": "first, "
				}}]})
				.to_string(),
			)
			.create_async()
			.await;

		let client = CompletionClient::new(&config_for(&server, false)).unwrap();
		let mut stream = client.send(&[Message::user("2+2")]).await.unwrap();

		assert_eq!(
			stream.next().await.unwrap().unwrap(),
			Fragment::Reasoning("first, add them".to_string())
		);
		assert_eq!(
			stream.next().await.unwrap().unwrap(),
			Fragment::Content("4".to_string())
		);
		assert!(stream.next().await.is_none());
	}

	#[tokio::test]
	async fn test_connection_refused_is_network_error() {
		// Bind and drop a listener to get a port nothing listens on
		let port = {
			let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
			listener.local_addr().unwrap().port()
		};
		let config = Config {
			base_url: format!("http://127.0.0.1:{}/v1", port),
			api_key: "k".to_string(),
			..Default::default()
		};

		let client = CompletionClient::new(&config).unwrap();
		match client.send(&[Message::user("hi")]).await {
			Err(CompletionError::Network { reason, .. }) => {
				assert_eq!(reason, NetworkReason::Connect);
			}
			Err(other) => panic!("unexpected error: {}", other),
			Ok(_) => panic!("expected an error"),
		}
	}

	#[tokio::test]
	async fn test_timeout_is_network_error() {
		// A server that accepts the connection but never answers
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		let holder = tokio::spawn(async move {
			let (_socket, _) = listener.accept().await.unwrap();
			tokio::time::sleep(Duration::from_secs(10)).await;
		});

		let config = Config {
			base_url: format!("http://{}/v1", addr),
			api_key: "k".to_string(),
			timeout_seconds: 1,
			..Default::default()
		};

		let client = CompletionClient::new(&config).unwrap();
		match client.send(&[Message::user("hi")]).await {
			Err(CompletionError::Network { reason, .. }) => {
				assert_eq!(reason, NetworkReason::Timeout);
			}
			Err(other) => panic!("unexpected error: {}", other),
			Ok(_) => panic!("expected an error"),
		}
		holder.abort();
	}
}
