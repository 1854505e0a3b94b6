//! Site path validation utilities

use crate::error::{Result, SiteForgeError};
use rand::Rng;
use regex::Regex;

/// Maximum path length in characters
pub const MAX_PATH_LEN: usize = 100;

/// Characters that are never allowed in a site path
pub const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Site path validator
pub struct PathValidator {
    max_len: usize,
}

impl PathValidator {
    /// Create a new path validator
    pub fn new() -> Self {
        Self {
            max_len: MAX_PATH_LEN,
        }
    }

    /// Validate a caller-supplied site path
    pub fn validate<'a>(&self, path: &'a str) -> Result<&'a str> {
        // Length validation
        self.validate_length(path)?;

        // Forbidden character validation
        self.validate_forbidden(path)?;

        // Grammar validation
        self.validate_grammar(path)?;

        Ok(path)
    }

    /// Check without building an error
    pub fn is_valid(&self, path: &str) -> bool {
        self.validate(path).is_ok()
    }

    /// Validate path length
    fn validate_length(&self, path: &str) -> Result<()> {
        if path.is_empty() {
            return Err(SiteForgeError::invalid_path(path, "path cannot be empty"));
        }

        if path.chars().count() > self.max_len {
            return Err(SiteForgeError::invalid_path(
                path,
                format!("path too long (max {} characters)", self.max_len),
            ));
        }

        Ok(())
    }

    /// Reject the characters file systems and URLs choke on
    fn validate_forbidden(&self, path: &str) -> Result<()> {
        if let Some(ch) = path.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(SiteForgeError::invalid_path(
                path,
                format!("contains illegal character '{}'", ch),
            ));
        }

        Ok(())
    }

    /// Only letters, digits, underscores and hyphens
    fn validate_grammar(&self, path: &str) -> Result<()> {
        let allowed = Regex::new(r"^[A-Za-z0-9_-]+$")
            .map_err(|e| SiteForgeError::internal(e.to_string()))?;

        if !allowed.is_match(path) {
            return Err(SiteForgeError::invalid_path(
                path,
                "only letters, digits, '_' and '-' are allowed",
            ));
        }

        Ok(())
    }
}

impl Default for PathValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Random site identifier: 32 lowercase hex characters
pub fn generate_site_id() -> String {
    let value: u128 = rand::thread_rng().gen();
    format!("{:032x}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        let validator = PathValidator::new();
        let longest = "x".repeat(100);
        for path in ["blog", "my-site_2", "A", longest.as_str()] {
            assert!(validator.is_valid(path), "{} should be valid", path);
        }
    }

    #[test]
    fn test_length_bounds() {
        let validator = PathValidator::new();
        assert!(validator.validate("").is_err());
        assert!(validator.validate(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_forbidden_characters() {
        let validator = PathValidator::new();
        for path in ["a<b", "a>b", "c:d", "e\"f", "g|h", "i?j", "k*l"] {
            match validator.validate(path) {
                Err(SiteForgeError::InvalidPath { reason, .. }) => {
                    assert!(reason.contains("illegal character"), "{}: {}", path, reason)
                }
                other => panic!("{} should be rejected, got {:?}", path, other),
            }
        }
    }

    #[test]
    fn test_grammar_rejects_traversal_and_separators() {
        let validator = PathValidator::new();
        for path in ["..", "a/b", "a\\b", "has space", "点", "a.b"] {
            assert!(!validator.is_valid(path), "{} should be rejected", path);
        }
    }

    #[test]
    fn test_generated_ids_are_valid_and_distinct() {
        let validator = PathValidator::new();
        let a = generate_site_id();
        let b = generate_site_id();
        assert_eq!(a.len(), 32);
        assert!(validator.is_valid(&a));
        assert_ne!(a, b);
    }
}
