//! Alibaba DashScope provider implementation
//!
//! Speaks DashScope's native text-generation format used by the Qwen models.

use crate::error::{Result, SiteForgeError};
use crate::llm::LlmProvider;
use crate::types::LlmConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{build_client, extract_content, post_json, ChatMessage};

const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com";
const GENERATION_ENDPOINT: &str = "/api/v1/services/aigc/text-generation/generation";
const CONTENT_POINTER: &str = "/output/choices/0/message/content";

/// DashScope provider implementation
pub struct DashScopeProvider {
    client: Client,
    id: String,
    api_key: String,
    model: String,
    base_url: String,
    temperature: Option<f32>,
    credential_env: &'static str,
}

impl DashScopeProvider {
    /// Construct the adapter.
    ///
    /// DashScope credentials are optional at construction; calls made
    /// without one fail with `MissingCredential`.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = build_client(&config.provider, config.timeout)?;

        Ok(Self {
            client,
            id: config.provider.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            temperature: config.temperature,
            credential_env: config.vendor.credential_env(),
        })
    }

    fn build_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), GENERATION_ENDPOINT)
    }
}

#[async_trait]
impl LlmProvider for DashScopeProvider {
    async fn chat(&self, system: &str, user: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(SiteForgeError::missing_credential(&self.id, self.credential_env));
        }

        let request = DashScopeRequest {
            model: &self.model,
            input: DashScopeInput {
                messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            },
            parameters: DashScopeParameters {
                result_format: "message",
                temperature: self.temperature,
            },
        };

        let url = self.build_url();
        tracing::debug!(provider = %self.id, model = %self.model, url = %url, "Calling DashScope");

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

// DashScope API structures
#[derive(Serialize)]
struct DashScopeRequest<'a> {
    model: &'a str,
    input: DashScopeInput,
    parameters: DashScopeParameters,
}

#[derive(Serialize)]
struct DashScopeInput {
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct DashScopeParameters {
    result_format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}
