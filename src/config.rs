//! Environment-driven configuration

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, SiteForgeError};
use crate::types::Vendor;

/// Default provider id selected at startup
pub const DEFAULT_PROVIDER: &str = "qwen3";

/// Default site root, relative to the working directory
pub const DEFAULT_SITES_DIR: &str = "public/websites";

/// Default public URL prefix for deployed sites
pub const DEFAULT_URL_PREFIX: &str = "/websites";

/// Default upper bound for a site's HTML payload
pub const DEFAULT_MAX_HTML_BYTES: u64 = 10 * 1024 * 1024;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub default_provider: String,
    pub sites_dir: PathBuf,
    pub url_prefix: String,
    pub max_html_bytes: u64,
    pub llm_timeout: Option<Duration>,
    pub credentials: Credentials,
    pub base_urls: BaseUrls,
}

/// API keys per vendor, as found in the environment
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub qwen: Option<String>,
    pub doubao: Option<String>,
    pub zhipu: Option<String>,
}

impl Credentials {
    /// Credential for a vendor, if configured
    pub fn for_vendor(&self, vendor: Vendor) -> Option<&str> {
        match vendor {
            Vendor::Qwen => self.qwen.as_deref(),
            Vendor::Doubao => self.doubao.as_deref(),
            Vendor::Zhipu => self.zhipu.as_deref(),
        }
    }
}

/// Transport overrides per vendor
#[derive(Debug, Clone, Default)]
pub struct BaseUrls {
    pub qwen: Option<String>,
    pub doubao: Option<String>,
    pub zhipu: Option<String>,
}

impl BaseUrls {
    pub fn for_vendor(&self, vendor: Vendor) -> Option<&str> {
        match vendor {
            Vendor::Qwen => self.qwen.as_deref(),
            Vendor::Doubao => self.doubao.as_deref(),
            Vendor::Zhipu => self.zhipu.as_deref(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_provider: DEFAULT_PROVIDER.to_string(),
            sites_dir: PathBuf::from(DEFAULT_SITES_DIR),
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
            max_html_bytes: DEFAULT_MAX_HTML_BYTES,
            llm_timeout: None,
            credentials: Credentials::default(),
            base_urls: BaseUrls::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let llm_timeout = match non_empty_var("SITE_FORGE_LLM_TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(parse_number(
                "SITE_FORGE_LLM_TIMEOUT_SECS",
                &raw,
            )?)),
            None => None,
        };

        let max_html_bytes = match non_empty_var("SITE_FORGE_MAX_HTML_BYTES") {
            Some(raw) => parse_number("SITE_FORGE_MAX_HTML_BYTES", &raw)?,
            None => defaults.max_html_bytes,
        };

        Ok(Self {
            default_provider: non_empty_var("SITE_FORGE_DEFAULT_PROVIDER")
                .unwrap_or(defaults.default_provider),
            sites_dir: non_empty_var("SITE_FORGE_SITES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.sites_dir),
            url_prefix: non_empty_var("SITE_FORGE_URL_PREFIX").unwrap_or(defaults.url_prefix),
            max_html_bytes,
            llm_timeout,
            credentials: Credentials {
                qwen: non_empty_var(Vendor::Qwen.credential_env()),
                doubao: non_empty_var(Vendor::Doubao.credential_env()),
                zhipu: non_empty_var(Vendor::Zhipu.credential_env()),
            },
            base_urls: BaseUrls {
                qwen: non_empty_var("QWEN_BASE_URL"),
                doubao: non_empty_var("DOUBAO_BASE_URL"),
                zhipu: non_empty_var("ZHIPU_BASE_URL"),
            },
        })
    }
}

/// Read an environment variable, treating empty values as unset
pub fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_number(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| {
            SiteForgeError::config(format!(
                "{} must be a positive integer, got '{}'",
                name, raw
            ))
        })
}
