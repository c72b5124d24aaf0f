use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{FragmentStream, StreamingGenerator, TextGenerator};
use glyph_types::{GlyphError, ProviderError};

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai";
const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

// ---------------------------------------------------------------------------
// ChatCompletionsAdapter
// ---------------------------------------------------------------------------

/// Client for an OpenAI-compatible `/v1/chat/completions` endpoint (Groq by default).
#[derive(Debug, Clone)]
pub struct ChatCompletionsAdapter {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
    temperature: f64,
    max_tokens: u32,
}

impl ChatCompletionsAdapter {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: build_client(DEFAULT_TIMEOUT_SECS),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            temperature: 0.6,
            max_tokens: 1024,
        }
    }

    pub fn from_env() -> Result<Self, GlyphError> {
        let key = std::env::var("GROQ_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GlyphError::MissingApiKey {
                var: "GROQ_API_KEY".into(),
            })?;
        Ok(Self::new(key))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// The single network-resilience knob: one client-wide request timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_secs = seconds;
        self.client = build_client(seconds);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request_body(&self, prompt: &str, system_prompt: &str, stream: bool) -> serde_json::Value {
        let mut messages = Vec::with_capacity(2);
        if !system_prompt.is_empty() {
            messages.push(json!({ "role": "system", "content": system_prompt }));
        }
        messages.push(json!({ "role": "user", "content": prompt }));

        json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_completion_tokens": self.max_tokens,
            "top_p": 1,
            "stream": stream,
        })
    }
}

fn build_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

fn parse_completion(body: &serde_json::Value) -> Result<String, ProviderError> {
    let Some(choice) = body["choices"].as_array().and_then(|c| c.first()) else {
        return Err(ProviderError::no_response());
    };

    if choice["finish_reason"].as_str() == Some("content_filter") {
        return Err(ProviderError::SafetyBlocked {
            message: "Response was blocked by the provider's safety filter".into(),
        });
    }

    match choice["message"]["content"].as_str() {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => Err(ProviderError::no_response()),
    }
}

/// One decoded server-sent-events line.
#[derive(Debug, PartialEq)]
enum SseEvent {
    Fragment(String),
    Blocked,
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> Result<SseEvent, ProviderError> {
    let line = line.trim();
    let Some(payload) = line.strip_prefix("data:") else {
        return Ok(SseEvent::Skip);
    };
    let payload = payload.trim();
    if payload == "[DONE]" {
        return Ok(SseEvent::Done);
    }

    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(|e| ProviderError::MalformedResponse {
            message: format!("Failed to parse stream event: {e}"),
        })?;

    let choice = &value["choices"][0];
    if choice["finish_reason"].as_str() == Some("content_filter") {
        return Ok(SseEvent::Blocked);
    }
    match choice["delta"]["content"].as_str() {
        Some(text) if !text.is_empty() => Ok(SseEvent::Fragment(text.to_string())),
        _ => Ok(SseEvent::Skip),
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn map_status_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
    let message = extract_error_message(body);
    let lowered = message.to_lowercase();
    match status.as_u16() {
        429 => ProviderError::QuotaExceeded {
            message: format!(
                "{message}\n\nTip: API quota exceeded. Wait a few minutes and try again."
            ),
        },
        401 | 403 => ProviderError::Auth { message },
        _ if lowered.contains("quota") || lowered.contains("rate limit") => {
            ProviderError::QuotaExceeded { message }
        }
        code => ProviderError::Http {
            status: code,
            message,
        },
    }
}

fn map_transport_error(err: reqwest::Error, timeout_secs: u64) -> ProviderError {
    if err.is_timeout() {
        ProviderError::timeout(timeout_secs)
    } else {
        ProviderError::Other {
            code: "UNKNOWN_ERROR".into(),
            message: err.to_string(),
        }
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_string())
}

// ---------------------------------------------------------------------------
// Generator implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl TextGenerator for ChatCompletionsAdapter {
    async fn generate(&self, prompt: &str, system_prompt: &str) -> Result<String, ProviderError> {
        let body = self.build_request_body(prompt, system_prompt, false);
        tracing::debug!(model = %self.model, "chat completion request");

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout_secs))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| map_transport_error(e, self.timeout_secs))?;

        if !status.is_success() {
            return Err(map_status_error(status, &text));
        }

        let json: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| ProviderError::MalformedResponse {
                message: format!("Failed to parse response JSON: {e}"),
            })?;

        parse_completion(&json)
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn name(&self) -> &str {
        "groq"
    }
}

impl StreamingGenerator for ChatCompletionsAdapter {
    fn generate_stream(&self, prompt: &str, system_prompt: &str) -> FragmentStream<'_> {
        let (tx, rx) = mpsc::channel(32);
        let request = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&self.build_request_body(prompt, system_prompt, true));
        let timeout_secs = self.timeout_secs;

        tokio::spawn(async move {
            if let Err(err) = pump_events(request, timeout_secs, &tx).await {
                let _ = tx.send(Err(err)).await;
            }
        });

        Box::pin(ReceiverStream::new(rx))
    }
}

/// Forward decoded fragments until `[DONE]`, EOF, or the consumer goes away.
async fn pump_events(
    request: reqwest::RequestBuilder,
    timeout_secs: u64,
    tx: &mpsc::Sender<Result<String, ProviderError>>,
) -> Result<(), ProviderError> {
    let mut resp = request
        .send()
        .await
        .map_err(|e| map_transport_error(e, timeout_secs))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(map_status_error(status, &body));
    }

    let mut buffer: Vec<u8> = Vec::new();
    let mut emitted = false;

    loop {
        let chunk = resp
            .chunk()
            .await
            .map_err(|e| map_transport_error(e, timeout_secs))?;
        let Some(chunk) = chunk else { break };
        buffer.extend_from_slice(&chunk);

        while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            match parse_sse_line(&line)? {
                SseEvent::Fragment(text) => {
                    emitted = true;
                    if tx.send(Ok(text)).await.is_err() {
                        return Ok(());
                    }
                }
                SseEvent::Blocked => {
                    return Err(ProviderError::SafetyBlocked {
                        message: "Response was blocked by the provider's safety filter".into(),
                    })
                }
                SseEvent::Done => return finish(emitted),
                SseEvent::Skip => {}
            }
        }
    }

    finish(emitted)
}

fn finish(emitted: bool) -> Result<(), ProviderError> {
    if emitted {
        Ok(())
    } else {
        Err(ProviderError::no_response())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_includes_system_and_user() {
        let adapter = ChatCompletionsAdapter::new("k".into()).with_model("m-1");
        let body = adapter.build_request_body("a cat", "draw ascii", false);
        assert_eq!(body["model"], "m-1");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "a cat");
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_completion_tokens"], 1024);
    }

    #[test]
    fn request_body_skips_empty_system_prompt() {
        let adapter = ChatCompletionsAdapter::new("k".into());
        let body = adapter.build_request_body("a cat", "", true);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let adapter = ChatCompletionsAdapter::new("k".into()).with_base_url("http://localhost:9/");
        assert_eq!(adapter.endpoint(), "http://localhost:9/v1/chat/completions");
    }

    #[test]
    fn parse_completion_ok() {
        let body = json!({
            "choices": [{ "message": { "content": " /\\_/\\" }, "finish_reason": "stop" }]
        });
        assert_eq!(parse_completion(&body).unwrap(), " /\\_/\\");
    }

    #[test]
    fn parse_completion_empty_is_no_response() {
        let body = json!({ "choices": [{ "message": { "content": "   " } }] });
        assert!(matches!(parse_completion(&body), Err(ProviderError::NoResponse { .. })));
        let body = json!({ "choices": [] });
        assert!(matches!(parse_completion(&body), Err(ProviderError::NoResponse { .. })));
    }

    #[test]
    fn parse_completion_content_filter_is_safety_block() {
        let body = json!({
            "choices": [{ "message": { "content": null }, "finish_reason": "content_filter" }]
        });
        assert!(matches!(parse_completion(&body), Err(ProviderError::SafetyBlocked { .. })));
    }

    #[test]
    fn sse_lines_decode() {
        let line = r#"data: {"choices":[{"delta":{"content":"( o.o )"}}]}"#;
        assert_eq!(parse_sse_line(line).unwrap(), SseEvent::Fragment("( o.o )".into()));
        assert_eq!(parse_sse_line("data: [DONE]\n").unwrap(), SseEvent::Done);
        assert_eq!(parse_sse_line(": keep-alive").unwrap(), SseEvent::Skip);
        assert_eq!(parse_sse_line("").unwrap(), SseEvent::Skip);
        let role_only = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_sse_line(role_only).unwrap(), SseEvent::Skip);
    }

    #[test]
    fn sse_content_filter_and_garbage() {
        let blocked = r#"data: {"choices":[{"delta":{},"finish_reason":"content_filter"}]}"#;
        assert_eq!(parse_sse_line(blocked).unwrap(), SseEvent::Blocked);
        assert!(matches!(
            parse_sse_line("data: {not json"),
            Err(ProviderError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn status_429_maps_to_quota() {
        let err = map_status_error(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"slow down"}}"#,
        );
        assert_eq!(err.code(), "QUOTA_EXCEEDED");
        assert!(err.message().starts_with("slow down"));
        assert!(err.message().contains("Tip:"));
    }

    #[test]
    fn quota_text_maps_to_quota() {
        let err = map_status_error(reqwest::StatusCode::BAD_REQUEST, "Rate limit reached for model");
        assert_eq!(err.code(), "QUOTA_EXCEEDED");
    }

    #[test]
    fn auth_and_http_errors() {
        let err = map_status_error(reqwest::StatusCode::UNAUTHORIZED, "bad key");
        assert!(matches!(err, ProviderError::Auth { .. }));
        let err = map_status_error(reqwest::StatusCode::BAD_GATEWAY, "upstream");
        assert_eq!(err, ProviderError::Http { status: 502, message: "upstream".into() });
    }

    #[test]
    fn availability_follows_api_key() {
        assert!(ChatCompletionsAdapter::new("key".into()).is_available());
        assert!(!ChatCompletionsAdapter::new(String::new()).is_available());
    }
}
