//! Chat-completions provider implementation
//!
//! Supports the OpenAI-compatible chat-completions APIs offered by
//! ByteDance Doubao (Ark) and Zhipu AI.

use crate::error::{Result, SiteForgeError};
use crate::llm::LlmProvider;
use crate::types::{LlmConfig, Vendor};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{build_client, extract_content, post_json, ChatMessage};

const CONTENT_POINTER: &str = "/choices/0/message/content";

/// Chat-completions provider implementation
pub struct ChatCompletionsProvider {
    client: Client,
    id: String,
    api_key: String,
    model: String,
    base_url: String,
    temperature: Option<f32>,
}

impl ChatCompletionsProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        if config.api_key.is_empty() && !config.vendor.credential_optional() {
            return Err(SiteForgeError::missing_credential(
                &config.provider,
                config.vendor.credential_env(),
            ));
        }

        let client = build_client(&config.provider, config.timeout)?;

        Ok(Self {
            client,
            id: config.provider.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| default_base_url(config.vendor).to_string()),
            temperature: config.temperature,
        })
    }

    fn build_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Public endpoint per vendor, including its API version prefix
fn default_base_url(vendor: Vendor) -> &'static str {
    match vendor {
        Vendor::Doubao => "https://ark.cn-beijing.volces.com/api/v3",
        Vendor::Zhipu => "https://open.bigmodel.cn/api/paas/v4",
        Vendor::Qwen => "https://dashscope.aliyuncs.com/compatible-mode/v1",
    }
}

#[async_trait]
impl LlmProvider for ChatCompletionsProvider {
    async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatCompletionsRequest {
            model: &self.model,
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: self.temperature,
            stream: false,
        };

        let url = self.build_url();
        tracing::debug!(
            provider = %self.id,
            model = %self.model,
            url = %url,
            "Calling chat completions"
        );

        let payload = post_json(&self.client, &self.id, &url, &self.api_key, &request).await?;
        extract_content(&self.id, &payload, CONTENT_POINTER)
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_ready(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// Chat-completions API structures
#[derive(Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::test_server::serve_once;

    fn config(vendor: Vendor, base_url: Option<String>) -> LlmConfig {
        LlmConfig {
            provider: vendor.to_string(),
            vendor,
            model: "glm-4".to_string(),
            api_key: "zp-test".to_string(),
            base_url,
            temperature: Some(0.7),
            timeout: None,
        }
    }

    #[test]
    fn test_vendor_default_endpoints() {
        let doubao = ChatCompletionsProvider::new(&config(Vendor::Doubao, None)).unwrap();
        assert_eq!(
            doubao.build_url(),
            "https://ark.cn-beijing.volces.com/api/v3/chat/completions"
        );

        let zhipu = ChatCompletionsProvider::new(&config(Vendor::Zhipu, None)).unwrap();
        assert_eq!(
            zhipu.build_url(),
            "https://open.bigmodel.cn/api/paas/v4/chat/completions"
        );
    }

    #[tokio::test]
    async fn test_chat_sends_messages_and_extracts_choice() {
        let (base, rx) = serve_once(
            200,
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"```html\n<html></html>\n```"}}]}"#,
        )
        .await;
        let base_url = format!("{}/api/paas/v4/", base);
        let provider =
            ChatCompletionsProvider::new(&config(Vendor::Zhipu, Some(base_url))).unwrap();

        let text = provider.chat("sys", "make a page").await.unwrap();
        assert!(text.contains("<html></html>"));

        let request = rx.await.unwrap();
        assert!(request.head.starts_with("POST /api/paas/v4/chat/completions"));
        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["model"], "glm-4");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["content"], "sys");
        assert_eq!(body["messages"][1]["role"], "user");
    }

    #[tokio::test]
    async fn test_vendor_error_code_is_kept() {
        let (base, _rx) = serve_once(
            429,
            r#"{"error":{"code":"1113","message":"insufficient balance"}}"#,
        )
        .await;
        let provider = ChatCompletionsProvider::new(&config(Vendor::Zhipu, Some(base))).unwrap();

        match provider.chat("sys", "x").await.unwrap_err() {
            SiteForgeError::Upstream { status_code, code, .. } => {
                assert_eq!(status_code, Some(429));
                assert_eq!(code.as_deref(), Some("1113"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
