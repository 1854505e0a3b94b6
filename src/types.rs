//! Core types and structures for site-forge

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::SiteForgeError;

/// Upstream LLM vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Qwen,
    Doubao,
    Zhipu,
}

impl Vendor {
    /// Vendor display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Vendor::Qwen => "Alibaba",
            Vendor::Doubao => "ByteDance",
            Vendor::Zhipu => "Zhipu AI",
        }
    }

    /// Environment variable holding the vendor credential
    pub fn credential_env(&self) -> &'static str {
        match self {
            Vendor::Qwen => "QWEN_API_KEY",
            Vendor::Doubao => "DOUBAO_API_KEY",
            Vendor::Zhipu => "ZHIPU_API_KEY",
        }
    }

    /// Whether an adapter may be constructed without a credential
    pub fn credential_optional(&self) -> bool {
        matches!(self, Vendor::Qwen)
    }
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Vendor::Qwen => write!(f, "qwen"),
            Vendor::Doubao => write!(f, "doubao"),
            Vendor::Zhipu => write!(f, "zhipu"),
        }
    }
}

/// Public description of a registered provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    pub id: String,
    pub display_name: String,
    pub vendor_name: String,
    pub description: String,
    pub capabilities: Vec<String>,
    pub has_credential: bool,
    pub enabled: bool,
}

/// Result of switching the current provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchOutcome {
    pub ok: bool,
    pub message: String,
}

/// Per-adapter LLM configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Registry id the adapter is registered under
    pub provider: String,
    pub vendor: Vendor,
    pub model: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    /// Transport timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "qwen3".to_string(),
            vendor: Vendor::Qwen,
            model: "qwen3-coder-plus".to_string(),
            api_key: String::new(),
            base_url: None,
            temperature: None,
            timeout: None,
        }
    }
}

/// A single generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
}

/// Request-scoped generation context.
///
/// Carries the provider selection for one request so a concurrent switch of
/// the registry's current provider cannot affect a generation in flight.
#[derive(Debug, Clone, Default)]
pub struct GenerationContext {
    /// Provider to use; `None` means the registry's current provider
    pub provider_id: Option<String>,
}

impl GenerationContext {
    /// Context pinned to a specific provider
    pub fn with_provider(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: Some(provider_id.into()),
        }
    }
}

/// Output of the generation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSite {
    pub html: String,
    /// True when the HTML is the local fallback template
    pub degraded: bool,
    /// Provider that served (or failed) the request
    pub provider_id: Option<String>,
}

/// Persisted site listing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRecord {
    pub id: String,
    pub path: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "generator")]
    pub generator_id: String,
    #[serde(rename = "fileSize")]
    pub file_size_bytes: u64,
}

/// Deploy input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployRequest {
    pub html: String,
    pub path: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Generator id recorded in the sidecar; the store default when absent
    pub generator: Option<String>,
}

impl DeployRequest {
    /// Deploy request for the given HTML with every optional field unset
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            ..Default::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_generator(mut self, generator: impl Into<String>) -> Self {
        self.generator = Some(generator.into());
        self
    }
}

/// Successful deploy result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployOutcome {
    pub path: String,
    pub url: String,
    pub message: String,
}

/// Partial metadata update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Kind of a container child entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Directory,
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileKind::File => write!(f, "file"),
            FileKind::Directory => write!(f, "directory"),
        }
    }
}

/// Direct child of a site container
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Stream event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Info,
    Progress,
    Success,
    Error,
}

impl EventKind {
    /// Success and error close a generation; at most one is ever emitted
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::Success | EventKind::Error)
    }
}

/// Orchestration milestone a stream event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreamStep {
    Start,
    Requirement,
    RequirementComplete,
    Html,
    Complete,
    Error,
    Finished,
}

impl std::fmt::Display for StreamStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamStep::Start => write!(f, "start"),
            StreamStep::Requirement => write!(f, "requirement"),
            StreamStep::RequirementComplete => write!(f, "requirement-complete"),
            StreamStep::Html => write!(f, "html"),
            StreamStep::Complete => write!(f, "complete"),
            StreamStep::Error => write!(f, "error"),
            StreamStep::Finished => write!(f, "finished"),
        }
    }
}

/// One progress event of a streaming generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub kind: EventKind,
    pub step: StreamStep,
    /// Content for info/progress/success, message for error
    pub body: String,
}

impl StreamEvent {
    pub fn info(step: StreamStep, content: impl Into<String>) -> Self {
        Self { kind: EventKind::Info, step, body: content.into() }
    }

    pub fn progress(step: StreamStep, content: impl Into<String>) -> Self {
        Self { kind: EventKind::Progress, step, body: content.into() }
    }

    pub fn success(step: StreamStep, content: impl Into<String>) -> Self {
        Self { kind: EventKind::Success, step, body: content.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: EventKind::Error, step: StreamStep::Error, body: message.into() }
    }
}

/// Buffered generation response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub html: String,
    pub degraded: bool,
    pub provider: Option<String>,
}

impl From<GeneratedSite> for GenerateResponse {
    fn from(site: GeneratedSite) -> Self {
        Self {
            success: true,
            html: site.html,
            degraded: site.degraded,
            provider: site.provider_id,
        }
    }
}

/// Deploy response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployResponse {
    pub success: bool,
    pub path: String,
    pub url: String,
    pub message: String,
}

impl From<DeployOutcome> for DeployResponse {
    fn from(outcome: DeployOutcome) -> Self {
        Self {
            success: true,
            path: outcome.path,
            url: outcome.url,
            message: outcome.message,
        }
    }
}

/// Site listing response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteListResponse {
    pub success: bool,
    pub websites: Vec<SiteRecord>,
}

/// Provider listing response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderListResponse {
    pub success: bool,
    pub models: Vec<ProviderDescriptor>,
}

/// Provider switch response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchResponse {
    pub success: bool,
    pub message: String,
}

impl From<SwitchOutcome> for SwitchResponse {
    fn from(outcome: SwitchOutcome) -> Self {
        Self {
            success: outcome.ok,
            message: outcome.message,
        }
    }
}

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    /// Boundary status code and body for an error
    pub fn from_error(err: &SiteForgeError) -> (u16, Self) {
        (err.http_status(), Self { error: err.to_string() })
    }
}

/// Generation counters shared across requests
#[derive(Debug, Default)]
pub struct GenerationMetrics {
    requests: AtomicU64,
    completed: AtomicU64,
    degraded: AtomicU64,
    upstream_failures: AtomicU64,
}

impl GenerationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_requests(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_degraded(&self) {
        self.degraded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_upstream_failures(&self) {
        self.upstream_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn get_stats(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`GenerationMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub completed: u64,
    pub degraded: u64,
    pub upstream_failures: u64,
}

impl MetricsSnapshot {
    /// Share of requests answered with the fallback template
    pub fn degraded_ratio(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.degraded as f64 / self.requests as f64
        }
    }
}
