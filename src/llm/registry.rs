//! Provider registry
//!
//! Holds the configured adapters in registration order, tracks the current
//! provider and resolves the adapter a generation request should use.

use crate::config::{non_empty_var, AppConfig};
use crate::error::{Result, SiteForgeError};
use crate::llm::{create_provider, LlmProvider, BUILTIN_PROVIDERS};
use crate::types::{GenerationContext, LlmConfig, ProviderDescriptor, SwitchOutcome};
use parking_lot::RwLock;
use std::sync::Arc;

/// How a provider's `has_credential` flag is recomputed on query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialCheck {
    /// Present when the environment variable is set and non-empty
    Env(String),
    /// Delegate to [`LlmProvider::is_ready`]
    Adapter,
}

struct RegistryEntry {
    descriptor: ProviderDescriptor,
    adapter: Option<Arc<dyn LlmProvider>>,
    credential: CredentialCheck,
    /// Why the adapter could not be constructed
    unavailable: Option<String>,
}

impl RegistryEntry {
    fn has_credential(&self) -> bool {
        match &self.credential {
            CredentialCheck::Env(var) => non_empty_var(var).is_some(),
            CredentialCheck::Adapter => self.adapter.as_ref().is_some_and(|a| a.is_ready()),
        }
    }

    fn live_descriptor(&self) -> ProviderDescriptor {
        ProviderDescriptor {
            has_credential: self.has_credential(),
            ..self.descriptor.clone()
        }
    }
}

#[derive(Default)]
struct RegistryState {
    entries: Vec<RegistryEntry>,
    current: Option<String>,
}

/// A resolved provider: its descriptor plus the adapter to call
#[derive(Clone)]
pub struct ActiveProvider {
    pub descriptor: ProviderDescriptor,
    adapter: Arc<dyn LlmProvider>,
}

impl ActiveProvider {
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn adapter(&self) -> Arc<dyn LlmProvider> {
        Arc::clone(&self.adapter)
    }

    pub async fn generate_text(&self, prompt: &str) -> Result<String> {
        self.adapter.generate_text(prompt).await
    }

    pub async fn generate_requirement_doc(&self, prompt: &str) -> Result<String> {
        self.adapter.generate_requirement_doc(prompt).await
    }

    pub async fn generate_html_from_requirement(&self, requirement_doc: &str) -> Result<String> {
        self.adapter.generate_html_from_requirement(requirement_doc).await
    }
}

/// Registry of LLM providers (thread-safe)
#[derive(Default)]
pub struct ProviderRegistry {
    state: RwLock<RegistryState>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry of built-in providers from configuration.
    ///
    /// Providers whose adapter fails to construct are recorded as disabled.
    /// The configured default becomes current when its adapter exists,
    /// otherwise the first constructed adapter does.
    pub fn from_config(config: &AppConfig) -> Self {
        let registry = Self::new();

        for builtin in BUILTIN_PROVIDERS {
            let llm_config = LlmConfig {
                provider: builtin.id.to_string(),
                vendor: builtin.vendor,
                model: builtin.model.to_string(),
                api_key: config
                    .credentials
                    .for_vendor(builtin.vendor)
                    .unwrap_or_default()
                    .to_string(),
                base_url: config.base_urls.for_vendor(builtin.vendor).map(str::to_string),
                temperature: None,
                timeout: config.llm_timeout,
            };
            let credential = CredentialCheck::Env(builtin.vendor.credential_env().to_string());

            match create_provider(&llm_config) {
                Ok(adapter) => {
                    if !adapter.is_ready() {
                        tracing::warn!(
                            provider = %builtin.id,
                            env_var = %builtin.vendor.credential_env(),
                            "Provider registered without credential"
                        );
                    }
                    registry.register_with(builtin.descriptor(), Arc::from(adapter), credential);
                }
                Err(e) => {
                    tracing::info!(provider = %builtin.id, error = %e, "Provider not initialized");
                    registry.register_unavailable(builtin.descriptor(), credential, e.to_string());
                }
            }
        }

        registry.select_initial(&config.default_provider);
        registry
    }

    /// Register an adapter; re-registering an id replaces it in place
    pub fn register(&self, descriptor: ProviderDescriptor, adapter: Arc<dyn LlmProvider>) {
        self.register_with(descriptor, adapter, CredentialCheck::Adapter);
    }

    /// Register an adapter with an explicit credential check
    pub fn register_with(
        &self,
        descriptor: ProviderDescriptor,
        adapter: Arc<dyn LlmProvider>,
        credential: CredentialCheck,
    ) {
        self.upsert(RegistryEntry {
            descriptor,
            adapter: Some(adapter),
            credential,
            unavailable: None,
        });
    }

    /// Record a provider whose adapter could not be constructed
    pub fn register_unavailable(
        &self,
        descriptor: ProviderDescriptor,
        credential: CredentialCheck,
        reason: impl Into<String>,
    ) {
        self.upsert(RegistryEntry {
            descriptor: ProviderDescriptor {
                enabled: false,
                ..descriptor
            },
            adapter: None,
            credential,
            unavailable: Some(reason.into()),
        });
    }

    fn upsert(&self, entry: RegistryEntry) {
        let mut state = self.state.write();
        match state
            .entries
            .iter_mut()
            .find(|e| e.descriptor.id == entry.descriptor.id)
        {
            Some(existing) => *existing = entry,
            None => state.entries.push(entry),
        }
    }

    /// Make `default_id` current, or the first usable adapter if it has none
    pub fn select_initial(&self, default_id: &str) {
        let mut state = self.state.write();
        let chosen = state
            .entries
            .iter()
            .find(|e| e.descriptor.id == default_id && e.adapter.is_some())
            .or_else(|| state.entries.iter().find(|e| e.adapter.is_some()))
            .map(|e| e.descriptor.id.clone());

        if chosen.as_deref() != Some(default_id) {
            tracing::warn!(
                default = %default_id,
                selected = ?chosen,
                "Default provider unavailable, falling back"
            );
        }
        state.current = chosen;
    }

    /// Enabled providers in registration order, credentials checked live
    pub fn list_available(&self) -> Vec<ProviderDescriptor> {
        let state = self.state.read();
        state
            .entries
            .iter()
            .filter(|e| e.descriptor.enabled)
            .map(RegistryEntry::live_descriptor)
            .collect()
    }

    /// Describe a registered provider
    pub fn describe(&self, id: &str) -> Option<ProviderDescriptor> {
        let state = self.state.read();
        state
            .entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(RegistryEntry::live_descriptor)
    }

    /// Switch the current provider.
    ///
    /// Switching to a provider without a credential succeeds in moving the
    /// pointer but reports `ok: false` so the caller can warn the user.
    pub fn switch_current(&self, id: &str) -> SwitchOutcome {
        let mut state = self.state.write();

        let Some(entry) = state.entries.iter().find(|e| e.descriptor.id == id) else {
            return SwitchOutcome {
                ok: false,
                message: format!("Unsupported provider: {}", id),
            };
        };

        if entry.adapter.is_none() {
            let reason = entry.unavailable.clone().unwrap_or_default();
            return SwitchOutcome {
                ok: false,
                message: format!("{} is not available: {}", entry.descriptor.display_name, reason),
            };
        }

        let display_name = entry.descriptor.display_name.clone();
        let has_credential = entry.has_credential();
        state.current = Some(id.to_string());

        if has_credential {
            tracing::info!(provider = %id, "Switched provider");
            SwitchOutcome {
                ok: true,
                message: format!("Switched to {}", display_name),
            }
        } else {
            tracing::warn!(provider = %id, "Switched to provider without credential");
            SwitchOutcome {
                ok: false,
                message: format!("{} API key is not set", display_name),
            }
        }
    }

    /// Id of the current provider
    pub fn current_id(&self) -> Option<String> {
        self.state.read().current.clone()
    }

    /// The current provider
    pub fn current(&self) -> Option<ActiveProvider> {
        let id = self.current_id()?;
        self.get(&id)
    }

    /// A registered, constructed provider by id
    pub fn get(&self, id: &str) -> Option<ActiveProvider> {
        let state = self.state.read();
        state
            .entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .and_then(|e| {
                e.adapter.as_ref().map(|adapter| ActiveProvider {
                    descriptor: e.live_descriptor(),
                    adapter: Arc::clone(adapter),
                })
            })
    }

    /// Resolve the provider a request runs against.
    ///
    /// The adapter is cloned out of the registry so the request keeps it
    /// for every stage even if the current provider changes meanwhile.
    pub fn resolve(&self, ctx: &GenerationContext) -> Result<ActiveProvider> {
        match &ctx.provider_id {
            Some(id) => self
                .get(id)
                .ok_or_else(|| SiteForgeError::config(format!("Provider not configured: {}", id))),
            None => self
                .current()
                .ok_or_else(|| SiteForgeError::config("No LLM provider is available")),
        }
    }

    /// Generate text with the current provider
    pub async fn generate_text(&self, prompt: &str) -> Result<String> {
        self.resolve(&GenerationContext::default())?
            .generate_text(prompt)
            .await
    }

    /// Stage 1 with the current provider
    pub async fn generate_requirement_doc(&self, prompt: &str) -> Result<String> {
        self.resolve(&GenerationContext::default())?
            .generate_requirement_doc(prompt)
            .await
    }

    /// Stage 2 with the current provider
    pub async fn generate_html_from_requirement(&self, requirement_doc: &str) -> Result<String> {
        self.resolve(&GenerationContext::default())?
            .generate_html_from_requirement(requirement_doc)
            .await
    }

    /// Check if any provider can serve requests (thread-safe)
    pub fn is_ready(&self) -> bool {
        self.state.read().entries.iter().any(|e| e.adapter.is_some())
    }
}
