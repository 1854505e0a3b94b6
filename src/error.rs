//! Error handling for site-forge


use thiserror::Error;

/// Main error type for site-forge
#[derive(Error, Debug, Clone)]
pub enum SiteForgeError {
    #[error("Missing credential for provider '{provider}': set {env_var}")]
    MissingCredential { provider: String, env_var: String },

    #[error("Upstream error ({provider}): {message}")]
    Upstream {
        provider: String,
        message: String,
        status_code: Option<u16>,
        code: Option<String>,
    },

    #[error("Malformed response from {provider}: {message}")]
    MalformedResponse {
        provider: String,
        message: String,
        raw: Option<String>,
    },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Path already exists: {path}")]
    PathAlreadyExists { path: String },

    #[error("Site not found: {path}")]
    NotFound { path: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("CLI error: {message}")]
    Cli { message: String },
}

impl SiteForgeError {
    /// Create a missing credential error
    pub fn missing_credential(provider: impl Into<String>, env_var: impl Into<String>) -> Self {
        Self::MissingCredential {
            provider: provider.into(),
            env_var: env_var.into(),
        }
    }

    /// Create an upstream (network, non-2xx, vendor-reported) error
    pub fn upstream(
        provider: impl Into<String>,
        message: impl Into<String>,
        status_code: Option<u16>,
        code: Option<String>,
    ) -> Self {
        Self::Upstream {
            provider: provider.into(),
            message: message.into(),
            status_code,
            code,
        }
    }

    /// Create a malformed response error carrying the raw payload
    pub fn malformed_response(
        provider: impl Into<String>,
        message: impl Into<String>,
        raw: Option<String>,
    ) -> Self {
        Self::MalformedResponse {
            provider: provider.into(),
            message: message.into(),
            raw,
        }
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a path collision error
    pub fn path_already_exists(path: impl Into<String>) -> Self {
        Self::PathAlreadyExists { path: path.into() }
    }

    /// Create a not-found error
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an IO error
    pub fn io(message: impl Into<String>, path: Option<String>) -> Self {
        Self::Io {
            message: message.into(),
            path,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a CLI error
    pub fn cli(message: impl Into<String>) -> Self {
        Self::Cli {
            message: message.into(),
        }
    }

    /// Failures raised by a provider adapter.
    ///
    /// These are the errors the generation pipeline absorbs into fallback
    /// content or a terminal stream event instead of propagating.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Upstream { .. } | Self::MalformedResponse { .. } | Self::MissingCredential { .. }
        )
    }

    /// HTTP status a boundary layer should answer with for this error
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidPath { .. }
            | Self::PathAlreadyExists { .. }
            | Self::Validation { .. }
            | Self::Cli { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::Upstream { .. } | Self::MalformedResponse { .. } => 502,
            Self::MissingCredential { .. }
            | Self::Config { .. }
            | Self::Io { .. }
            | Self::Internal { .. } => 500,
        }
    }

    /// Get user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingCredential { provider, env_var } => {
                format!(
                    "❌ Provider '{}' has no API key\n💡 Set {} in your environment or .env file",
                    provider, env_var
                )
            }
            Self::Upstream { provider, message, status_code, .. } => {
                let status = status_code.map_or(String::new(), |c| format!(" ({})", c));
                format!(
                    "❌ {} request failed{}: {}\n💡 Check your API key, quota and network",
                    provider, status, message
                )
            }
            Self::MalformedResponse { provider, message, .. } => {
                format!(
                    "❌ Unexpected response from {}: {}\n💡 This might be a temporary issue, try again",
                    provider, message
                )
            }
            Self::InvalidPath { path, reason } => {
                format!(
                    "❌ Invalid site path '{}': {}\n💡 Use 1-100 letters, digits, '_' or '-'",
                    path, reason
                )
            }
            Self::PathAlreadyExists { path } => {
                format!(
                    "❌ A site already lives at '{}'\n💡 Choose another path or update the existing site",
                    path
                )
            }
            Self::NotFound { path } => {
                format!(
                    "❌ No site found at '{}'\n💡 Run `site-forge list` to see deployed sites",
                    path
                )
            }
            Self::Validation { message } => {
                format!("❌ Validation error: {}\n💡 Check your input", message)
            }
            Self::Config { message } => {
                format!(
                    "❌ Configuration problem: {}\n💡 Check your .env file or configuration",
                    message
                )
            }
            Self::Io { message, path } => {
                let path_info = path.as_ref().map_or(String::new(), |p| format!(" ({})", p));
                format!(
                    "❌ File error{}: {}\n💡 Check file permissions and paths",
                    path_info, message
                )
            }
            Self::Internal { message } => {
                format!("❌ Internal error: {}\n💡 This is a bug, please report it", message)
            }
            Self::Cli { message } => {
                format!("❌ Command error: {}\n💡 Use --help for usage information", message)
            }
        }
    }
}

/// Convert from common error types
impl From<reqwest::Error> for SiteForgeError {
    fn from(err: reqwest::Error) -> Self {
        let status_code = err.status().map(|s| s.as_u16());

        if err.is_timeout() {
            Self::upstream("http", "Request timed out", status_code, None)
        } else if err.is_connect() {
            Self::upstream("http", "Connection failed", status_code, None)
        } else {
            Self::upstream("http", err.to_string(), status_code, None)
        }
    }
}

impl From<serde_json::Error> for SiteForgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for SiteForgeError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string(), None)
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SiteForgeError>;
