//! Site Forge - two-stage LLM website generation and deployment
//!
//! Turns a natural-language prompt into a single-file HTML site through a
//! requirement-document stage and an HTML stage, and stores the result in a
//! path-addressed site directory.

pub mod config;
pub mod error;
pub mod llm;
pub mod store;
pub mod stream;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Result, SiteForgeError};
pub use types::{
    DeployOutcome, DeployRequest, FileEntry, GeneratedSite, GenerationContext, LlmConfig,
    MetadataPatch, MetricsSnapshot, ProviderDescriptor, SiteRecord, StreamEvent, Vendor,
};

// Re-export main functionality
pub use llm::{LlmProvider, ProviderRegistry, SiteGenerator};
pub use store::SiteStore;
pub use stream::{EventSink, FrameWriter, StreamEncoder};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
pub fn init() -> Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();
    Ok(())
}
