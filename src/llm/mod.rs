//! LLM (Large Language Model) integration module
//!
//! Provider adapters behind one capability trait, the registry that selects
//! between them, and the two-stage site generation pipeline.

pub mod generator;
pub mod prompts;
pub mod providers;
pub mod registry;

// Re-export main functionality
pub use generator::SiteGenerator;
pub use registry::ProviderRegistry;

use crate::error::Result;
use crate::types::{LlmConfig, ProviderDescriptor, Vendor};
use async_trait::async_trait;

/// Core trait for all LLM providers
///
/// Adapters implement [`LlmProvider::chat`]; the three generation
/// capabilities are expressed on top of it with fixed system roles.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one system + user exchange and return the first completion's text
    async fn chat(&self, system: &str, user: &str) -> Result<String>;

    /// Generate free-form text for a prompt
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        self.chat(prompts::WEB_DEVELOPER_ROLE, prompt).await
    }

    /// Stage 1: expand a prompt into a requirement document
    async fn generate_requirement_doc(&self, prompt: &str) -> Result<String> {
        self.chat(prompts::PRODUCT_MANAGER_ROLE, &prompts::requirement_prompt(prompt))
            .await
    }

    /// Stage 2: synthesize HTML from a requirement document
    async fn generate_html_from_requirement(&self, requirement_doc: &str) -> Result<String> {
        self.chat(&prompts::html_developer_role(), &prompts::html_prompt(requirement_doc))
            .await
    }

    /// Registry id of this provider
    fn name(&self) -> &str;

    /// Get model name being used
    fn model(&self) -> &str;

    /// Check if provider has a credential to call with
    fn is_ready(&self) -> bool;
}

/// Static description of a built-in provider
#[derive(Debug, Clone, Copy)]
pub struct BuiltinProvider {
    pub id: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub vendor: Vendor,
    pub model: &'static str,
}

/// Capabilities every built-in provider offers
pub const CAPABILITIES: &[&str] = &["code-generation", "requirement-analysis", "html-generation"];

/// Built-in providers in registration order
pub const BUILTIN_PROVIDERS: &[BuiltinProvider] = &[
    BuiltinProvider {
        id: "qwen",
        display_name: "Tongyi Qwen",
        description: "Alibaba Tongyi Qwen large language model",
        vendor: Vendor::Qwen,
        model: "qwen-max",
    },
    BuiltinProvider {
        id: "qwen3",
        display_name: "Tongyi Qwen3 Coder",
        description: "Alibaba Tongyi Qwen3 coder-plus model",
        vendor: Vendor::Qwen,
        model: "qwen3-coder-plus",
    },
    BuiltinProvider {
        id: "doubao",
        display_name: "Doubao",
        description: "ByteDance Doubao large language model",
        vendor: Vendor::Doubao,
        model: "doubao-pro",
    },
    BuiltinProvider {
        id: "zhipu",
        display_name: "Zhipu GLM",
        description: "Zhipu AI GLM large language model",
        vendor: Vendor::Zhipu,
        model: "glm-4",
    },
];

impl BuiltinProvider {
    /// Descriptor as registered; `has_credential` is recomputed on query
    pub fn descriptor(&self) -> ProviderDescriptor {
        ProviderDescriptor {
            id: self.id.to_string(),
            display_name: self.display_name.to_string(),
            vendor_name: self.vendor.display_name().to_string(),
            description: self.description.to_string(),
            capabilities: CAPABILITIES.iter().map(|c| c.to_string()).collect(),
            has_credential: false,
            enabled: true,
        }
    }
}

/// Create an LLM provider from configuration
pub fn create_provider(config: &LlmConfig) -> Result<Box<dyn LlmProvider>> {
    match config.vendor {
        Vendor::Qwen => Ok(Box::new(providers::DashScopeProvider::new(config)?)),
        Vendor::Doubao | Vendor::Zhipu => {
            Ok(Box::new(providers::ChatCompletionsProvider::new(config)?))
        }
    }
}
