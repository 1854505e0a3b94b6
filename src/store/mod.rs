//! Site deployment store
//!
//! Persists generated sites as path-addressed directories with a small
//! JSON metadata overlay.

pub mod sidecar;
pub mod sites;
pub mod validator;

pub use sidecar::{SiteMetadata, SIDECAR_FILE};
pub use sites::{SiteStore, CONTENT_FILE, DEFAULT_GENERATOR};
pub use validator::{generate_site_id, PathValidator};
