//! LLM provider implementations
//!
//! Each wire format is implemented in its own module. Both share the
//! transport helpers below so failures look the same regardless of vendor.

pub mod chat_completions;
pub mod dashscope;

// Re-export providers for easy access
pub use chat_completions::ChatCompletionsProvider;
pub use dashscope::DashScopeProvider;

use crate::error::{Result, SiteForgeError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Chat turn shared by both wire formats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// Build the HTTP client for an adapter; no timeout unless configured
pub fn build_client(provider: &str, timeout: Option<Duration>) -> Result<Client> {
    let mut builder =
        Client::builder().user_agent(concat!("site-forge/", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| SiteForgeError::upstream(provider, e.to_string(), None, None))
}

/// POST a JSON body with a bearer credential and decode the JSON reply.
///
/// Network failures and non-2xx statuses become `Upstream`; a 2xx body that
/// is not JSON becomes `MalformedResponse` carrying the raw text.
pub async fn post_json<B: Serialize + ?Sized>(
    client: &Client,
    provider: &str,
    url: &str,
    api_key: &str,
    body: &B,
) -> Result<Value> {
    let response = client
        .post(url)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| {
            SiteForgeError::upstream(
                provider,
                format!("Failed to connect to API: {}", e),
                None,
                None,
            )
        })?;

    let status = response.status();
    let text = response.text().await.map_err(|e| {
        SiteForgeError::upstream(
            provider,
            format!("Failed to read response body: {}", e),
            Some(status.as_u16()),
            None,
        )
    })?;

    if !status.is_success() {
        let (vendor_message, vendor_code) = vendor_error(&text);
        let detail = vendor_message.unwrap_or_else(|| text.clone());

        let error_msg = match status.as_u16() {
            401 => format!("Authentication failed (401): {}", detail),
            403 => format!("Access forbidden (403): {}", detail),
            429 => format!("Rate limit exceeded (429): {}", detail),
            500..=599 => format!("Server error ({}): {}", status, detail),
            _ => format!("API request failed ({}): {}", status, detail),
        };

        return Err(SiteForgeError::upstream(
            provider,
            error_msg,
            Some(status.as_u16()),
            vendor_code,
        ));
    }

    serde_json::from_str(&text).map_err(|e| {
        SiteForgeError::malformed_response(
            provider,
            format!("Response is not valid JSON: {}", e),
            Some(text),
        )
    })
}

/// Pull the completion text out of a decoded reply at a JSON pointer
pub fn extract_content(provider: &str, payload: &Value, pointer: &str) -> Result<String> {
    payload
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            SiteForgeError::malformed_response(
                provider,
                format!("No completion at {}", pointer),
                Some(payload.to_string()),
            )
        })
}

/// Vendor-reported message and code from an error body, if present.
///
/// DashScope answers `{code, message}`; chat-completions vendors answer
/// `{error: {message, code}}`.
fn vendor_error(body: &str) -> (Option<String>, Option<String>) {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return (None, None);
    };
    let scope = value.get("error").filter(|e| e.is_object()).unwrap_or(&value);

    let message = scope.get("message").and_then(Value::as_str).map(str::to_string);
    let code = scope.get("code").and_then(|c| match c {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    (message, code)
}
