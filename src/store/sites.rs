//! Path-addressed site store
//!
//! One directory per site under the store root, holding `index.html` and
//! an optional `config.json` sidecar. Content and sidecar are independent
//! writes; a container without a sidecar lists with default metadata.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::config::AppConfig;
use crate::error::{Result, SiteForgeError};
use crate::store::sidecar::{SiteMetadata, SIDECAR_FILE};
use crate::store::validator::{generate_site_id, PathValidator};
use crate::types::{
    DeployOutcome, DeployRequest, FileEntry, FileKind, MetadataPatch, SiteRecord,
};

/// Content file name inside a site container
pub const CONTENT_FILE: &str = "index.html";

/// Generator id recorded when a deploy does not name one
pub const DEFAULT_GENERATOR: &str = "qwen3-coder-plus";

/// Attempts at drawing an unused random path
const MAX_ID_ATTEMPTS: usize = 8;

/// Site store rooted at a directory
#[derive(Clone)]
pub struct SiteStore {
    root: PathBuf,
    url_prefix: String,
    max_html_bytes: u64,
    default_generator: String,
}

impl SiteStore {
    /// Create a store rooted at `root`; the directory is created on first deploy
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let defaults = AppConfig::default();
        Self {
            root: root.into(),
            url_prefix: defaults.url_prefix,
            max_html_bytes: defaults.max_html_bytes,
            default_generator: DEFAULT_GENERATOR.to_string(),
        }
    }

    /// Create a store from application configuration
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.sites_dir.clone())
            .with_url_prefix(config.url_prefix.clone())
            .with_max_html_bytes(config.max_html_bytes)
    }

    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into();
        self
    }

    pub fn with_max_html_bytes(mut self, max: u64) -> Self {
        self.max_html_bytes = max;
        self
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Public URL of a deployed site
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}/", self.url_prefix.trim_end_matches('/'), path)
    }

    /// Deploy a new site.
    ///
    /// A supplied path is validated and claimed with an exclusive directory
    /// creation, so two deploys racing for the same path cannot both win.
    pub async fn deploy(&self, request: DeployRequest) -> Result<DeployOutcome> {
        self.validate_html(&request.html)?;
        let validator = PathValidator::new();
        if let Some(path) = &request.path {
            validator.validate(path)?;
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| self.io_error(e, &self.root))?;

        let path = match &request.path {
            Some(path) => {
                self.claim(path).await?;
                path.clone()
            }
            None => self.claim_generated().await?,
        };
        let dir = self.container_dir(&path);

        if let Err(e) = tokio::fs::write(dir.join(CONTENT_FILE), &request.html).await {
            tracing::warn!(path = %path, error = %e, "Content write failed, removing container");
            let _ = tokio::fs::remove_dir_all(&dir).await;
            return Err(self.io_error(e, &dir));
        }

        let mut metadata = SiteMetadata::new(
            &path,
            request.name.clone().unwrap_or_else(|| path.clone()),
            request
                .generator
                .clone()
                .unwrap_or_else(|| self.default_generator.clone()),
        );
        if let Some(description) = &request.description {
            metadata.description = description.clone();
        }
        metadata.save(&dir.join(SIDECAR_FILE)).await?;

        tracing::info!(
            path = %path,
            html_bytes = %request.html.len(),
            generated_path = request.path.is_none(),
            "Site deployed"
        );

        Ok(DeployOutcome {
            url: self.url_for(&path),
            path,
            message: "Website deployed successfully".to_string(),
        })
    }

    /// Overwrite a site's content
    pub async fn update_content(&self, path: &str, html: &str) -> Result<SiteRecord> {
        let dir = self.existing_container(path).await?;
        self.validate_html(html)?;

        tokio::fs::write(dir.join(CONTENT_FILE), html)
            .await
            .map_err(|e| self.io_error(e, &dir))?;

        let sidecar = dir.join(SIDECAR_FILE);
        if let Some(mut metadata) = SiteMetadata::load(&sidecar).await? {
            metadata.touch();
            metadata.save(&sidecar).await?;
        }

        tracing::info!(path = %path, html_bytes = %html.len(), "Site content updated");
        self.require(path).await
    }

    /// Partially update a site's metadata, creating the sidecar if needed
    pub async fn update_metadata(&self, path: &str, patch: &MetadataPatch) -> Result<SiteRecord> {
        let dir = self.existing_container(path).await?;
        let sidecar = dir.join(SIDECAR_FILE);

        let mut metadata = match SiteMetadata::load(&sidecar).await? {
            Some(metadata) => metadata,
            None => {
                let created_at = dir_created_at(&dir).await;
                SiteMetadata::defaults(path, created_at, &self.default_generator)
            }
        };
        metadata.apply(patch);
        metadata.save(&sidecar).await?;

        tracing::info!(path = %path, "Site metadata updated");
        self.require(path).await
    }

    /// Reconstruct a site record; `None` when no such site exists
    pub async fn get(&self, path: &str) -> Result<Option<SiteRecord>> {
        if !PathValidator::new().is_valid(path) {
            return Ok(None);
        }
        let dir = self.container_dir(path);
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e, &dir)),
        }

        let (file_size_bytes, content_modified) =
            match tokio::fs::metadata(dir.join(CONTENT_FILE)).await {
                Ok(meta) => (meta.len(), meta.modified().ok().map(to_utc)),
                Err(_) => (0, None),
            };

        let metadata = match SiteMetadata::load(&dir.join(SIDECAR_FILE)).await? {
            Some(metadata) => metadata,
            None => {
                let created_at = dir_created_at(&dir).await;
                let mut defaults =
                    SiteMetadata::defaults(path, created_at, &self.default_generator);
                if let Some(modified) = content_modified {
                    defaults.updated_at = modified.max(created_at);
                }
                defaults
            }
        };

        Ok(Some(SiteRecord {
            id: path.to_string(),
            path: path.to_string(),
            name: metadata.name,
            description: metadata.description,
            created_at: metadata.created_at,
            updated_at: metadata.updated_at,
            generator_id: metadata.generator,
            file_size_bytes,
        }))
    }

    /// All sites, newest first
    pub async fn list(&self) -> Result<Vec<SiteRecord>> {
        let mut read_dir = match tokio::fs::read_dir(&self.root).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e, &self.root)),
        };

        let mut names = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| self.io_error(e, &self.root))?
        {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }

        let lookups = names.iter().map(|name| self.get(name));
        let mut records: Vec<SiteRecord> = join_all(lookups)
            .await
            .into_iter()
            .zip(&names)
            .filter_map(|(result, name)| match result {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(path = %name, error = %e, "Skipping unreadable site");
                    None
                }
            })
            .collect();

        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.path.cmp(&b.path))
        });
        Ok(records)
    }

    /// Remove a site and everything in it
    pub async fn delete(&self, path: &str) -> Result<()> {
        let dir = self.existing_container(path).await?;
        tokio::fs::remove_dir_all(&dir).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                SiteForgeError::not_found(path)
            } else {
                self.io_error(e, &dir)
            }
        })?;

        tracing::info!(path = %path, "Site deleted");
        Ok(())
    }

    /// Direct children of a site container, sorted by name
    pub async fn list_files(&self, path: &str) -> Result<Vec<FileEntry>> {
        let dir = self.existing_container(path).await?;
        let mut read_dir = tokio::fs::read_dir(&dir).await.map_err(|e| self.io_error(e, &dir))?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await.map_err(|e| self.io_error(e, &dir))? {
            let meta = entry.metadata().await.map_err(|e| self.io_error(e, &entry.path()))?;
            let kind = if meta.is_dir() {
                FileKind::Directory
            } else {
                FileKind::File
            };
            entries.push(FileEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                kind,
                size: meta.len(),
                modified_at: meta.modified().ok().map(to_utc),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn container_dir(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    /// Validate the path and require its container to exist
    async fn existing_container(&self, path: &str) -> Result<PathBuf> {
        PathValidator::new().validate(path)?;
        let dir = self.container_dir(path);
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(dir),
            Ok(_) => Err(SiteForgeError::not_found(path)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(SiteForgeError::not_found(path)),
            Err(e) => Err(self.io_error(e, &dir)),
        }
    }

    async fn require(&self, path: &str) -> Result<SiteRecord> {
        self.get(path)
            .await?
            .ok_or_else(|| SiteForgeError::not_found(path))
    }

    /// Create a container, failing if anything already occupies the path
    async fn claim(&self, path: &str) -> Result<()> {
        let dir = self.container_dir(path);
        tokio::fs::create_dir(&dir).await.map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                SiteForgeError::path_already_exists(path)
            } else {
                self.io_error(e, &dir)
            }
        })
    }

    async fn claim_generated(&self) -> Result<String> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = generate_site_id();
            match self.claim(&candidate).await {
                Ok(()) => return Ok(candidate),
                Err(SiteForgeError::PathAlreadyExists { .. }) => {
                    tracing::debug!(path = %candidate, "Generated path collided, retrying");
                }
                Err(e) => return Err(e),
            }
        }
        Err(SiteForgeError::internal("Could not allocate a unique site path"))
    }

    fn validate_html(&self, html: &str) -> Result<()> {
        if html.trim().is_empty() {
            return Err(SiteForgeError::validation("HTML content is required"));
        }
        if html.len() as u64 > self.max_html_bytes {
            return Err(SiteForgeError::validation(format!(
                "HTML content is too large ({} bytes, limit {})",
                html.len(),
                self.max_html_bytes
            )));
        }
        Ok(())
    }

    fn io_error(&self, err: std::io::Error, path: &Path) -> SiteForgeError {
        SiteForgeError::io(err.to_string(), Some(path.to_string_lossy().to_string()))
    }
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// Container creation time, falling back to modification time, then now
async fn dir_created_at(dir: &Path) -> DateTime<Utc> {
    match tokio::fs::metadata(dir).await {
        Ok(meta) => meta
            .created()
            .or_else(|_| meta.modified())
            .map(to_utc)
            .unwrap_or_else(|_| Utc::now()),
        Err(_) => Utc::now(),
    }
}
