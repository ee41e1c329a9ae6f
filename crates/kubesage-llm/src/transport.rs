//! Shared chat-completions transport
//!
//! Both backend variants speak the same wire contract: POST a
//! `{model, messages, max_tokens, temperature, stream}` document to a
//! chat-completions endpoint. Non-streaming responses are one JSON body;
//! streaming responses are server-sent-event framed `data: <json-delta>`
//! lines terminated by a `data: [DONE]` sentinel. The variants differ only
//! in how this transport is constructed (URL, auth headers).

use crate::error::{Error, Result};
use crate::message::ChatMessage;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Serialize)]
struct ChatPayload<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatDelta {
    choices: Vec<DeltaChoice>,
}

#[derive(Deserialize)]
struct DeltaChoice {
    #[serde(default)]
    delta: DeltaContent,
}

#[derive(Deserialize, Default)]
struct DeltaContent {
    #[serde(default)]
    content: Option<String>,
}

/// Outcome of decoding one server-sent-event line
#[derive(Debug, PartialEq, Eq)]
pub enum SseEvent {
    /// A content fragment
    Delta(String),
    /// The `[DONE]` terminator
    Done,
    /// Keep-alives, comments, and undecodable lines
    Ignored,
}

/// Decode a single SSE line from a streaming chat response.
///
/// Lines that are not `data:` framed, carry no content delta, or fail to
/// parse are ignored rather than failing the stream.
#[must_use]
pub fn decode_sse_line(line: &str) -> SseEvent {
    let Some(data) = line.trim().strip_prefix("data:") else {
        return SseEvent::Ignored;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseEvent::Done;
    }
    match serde_json::from_str::<ChatDelta>(data) {
        Ok(delta) => {
            let content = delta
                .choices
                .first()
                .and_then(|c| c.delta.content.as_deref())
                .unwrap_or_default();
            if content.is_empty() {
                SseEvent::Ignored
            } else {
                SseEvent::Delta(content.to_string())
            }
        }
        Err(_) => SseEvent::Ignored,
    }
}

/// Accumulate the content of a full SSE-framed response body.
pub fn collect_stream_content(body: &str) -> Result<String> {
    let mut content = String::new();
    for line in body.lines() {
        match decode_sse_line(line) {
            SseEvent::Delta(delta) => content.push_str(&delta),
            SseEvent::Done => break,
            SseEvent::Ignored => {}
        }
    }
    if content.is_empty() {
        return Err(Error::InvalidResponse(
            "stream contained no content deltas".to_string(),
        ));
    }
    Ok(content)
}

/// HTTP transport for one provider instance
pub struct ChatTransport {
    client: Client,
    api_url: String,
    model: String,
    bearer_token: Option<String>,
    headers: Vec<(String, String)>,
    stream: bool,
}

impl ChatTransport {
    /// Create a transport for the given endpoint and model
    pub fn new(api_url: impl Into<String>, model: impl Into<String>, stream: bool) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            model: model.into(),
            bearer_token: None,
            headers: Vec::new(),
            stream,
        })
    }

    /// Attach a bearer token (hosted backend)
    #[must_use]
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Attach an extra request header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// The configured endpoint URL
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Send one chat request and return the assistant content.
    ///
    /// The timeout applies per request; exceeding it is a typed
    /// [`Error::Timeout`], never an unbounded hang.
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
        timeout: Duration,
    ) -> Result<String> {
        let payload = ChatPayload {
            model: &self.model,
            messages,
            max_tokens,
            temperature,
            stream: self.stream,
        };

        debug!(url = %self.api_url, model = %self.model, stream = self.stream, "Sending chat request");

        let mut request = self
            .client
            .post(&self.api_url)
            .timeout(timeout)
            .header("content-type", "application/json")
            .json(&payload);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(timeout.as_millis() as u64)
            } else if e.is_connect() {
                Error::Network(format!(
                    "failed to connect to {}. Is the endpoint running?",
                    self.api_url
                ))
            } else {
                Error::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !status.is_success() {
            let snippet: String = body.chars().take(200).collect();
            return Err(Error::Api(format!("HTTP {}: {}", status, snippet)));
        }

        if self.stream {
            collect_stream_content(&body)
        } else {
            let completion: ChatCompletion = serde_json::from_str(&body)
                .map_err(|e| Error::InvalidResponse(e.to_string()))?;
            completion
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .ok_or_else(|| Error::InvalidResponse("response had no choices".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_delta_line() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        assert_eq!(decode_sse_line(line), SseEvent::Delta("Hel".to_string()));
    }

    #[test]
    fn test_decode_done_sentinel() {
        assert_eq!(decode_sse_line("data: [DONE]"), SseEvent::Done);
    }

    #[test]
    fn test_decode_ignores_noise() {
        assert_eq!(decode_sse_line(""), SseEvent::Ignored);
        assert_eq!(decode_sse_line(": keep-alive"), SseEvent::Ignored);
        assert_eq!(decode_sse_line("data: {not json"), SseEvent::Ignored);
        // role-only delta carries no content
        let line = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(decode_sse_line(line), SseEvent::Ignored);
    }

    #[test]
    fn test_collect_stream_content() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Pods \"}}]}\n",
            "\n",
            ": keep-alive\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"look healthy\"}}]}\n",
            "data: [DONE]\n",
        );
        assert_eq!(collect_stream_content(body).unwrap(), "Pods look healthy");
    }

    #[test]
    fn test_collect_stream_content_stops_at_done() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"before\"}}]}\n",
            "data: [DONE]\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"after\"}}]}\n",
        );
        assert_eq!(collect_stream_content(body).unwrap(), "before");
    }

    #[test]
    fn test_collect_empty_stream_is_error() {
        assert!(collect_stream_content("data: [DONE]\n").is_err());
    }
}
