//! Site metadata sidecar (`config.json`) persistence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SiteForgeError};
use crate::types::MetadataPatch;

/// Sidecar file name inside a site container
pub const SIDECAR_FILE: &str = "config.json";

/// Persistent site metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub generator: String,
}

impl SiteMetadata {
    /// Metadata for a fresh site
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        generator: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            created_at: now,
            updated_at: now,
            generator: generator.into(),
        }
    }

    /// Defaults used when a container has no sidecar
    pub fn defaults(id: &str, created_at: DateTime<Utc>, generator: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            created_at,
            updated_at: created_at,
            generator: generator.to_string(),
        }
    }

    /// Load the sidecar; `None` when the file is absent or unreadable as JSON
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SiteForgeError::io(
                    e.to_string(),
                    Some(path.to_string_lossy().to_string()),
                ))
            }
        };

        match serde_json::from_str(&content) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable sidecar");
                Ok(None)
            }
        }
    }

    /// Save the sidecar
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            SiteForgeError::internal(format!("Failed to serialize metadata: {}", e))
        })?;

        tokio::fs::write(path, content).await.map_err(|e| {
            SiteForgeError::io(e.to_string(), Some(path.to_string_lossy().to_string()))
        })
    }

    /// Apply a partial update and refresh `updated_at`
    pub fn apply(&mut self, patch: &MetadataPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        self.touch();
    }

    /// Record a mutation
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.created_at);
    }
}
