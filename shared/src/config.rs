//! # Configuration for the Identity Connector
//!
//! This module handles configuration loading and validation,
//! supporting both in-code construction and environment variables.

use crate::constants::*;
use crate::error::{IdentityError, IdentityResult};
use serde::{Deserialize, Serialize};
use std::env;

/// Configuration for the identity connector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConnectorConfig {
    /// DID method used for documents created by this connector
    pub did_method: String,

    /// Size in bits of the revocation bitmap installed on new documents
    pub revocation_bitmap_size: u32,

    /// Context URI attached to issued credentials
    pub credential_context: String,
}

impl Default for IdentityConnectorConfig {
    fn default() -> Self {
        Self {
            did_method: DID_METHOD_DEFAULT.into(),
            revocation_bitmap_size: REVOCATION_BITMAP_SIZE_BITS,
            credential_context: CREDENTIAL_CONTEXT_VC.into(),
        }
    }
}

impl IdentityConnectorConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset
    pub fn from_env() -> IdentityResult<Self> {
        let mut config = Self::default();

        if let Ok(method) = env::var(ENV_DID_METHOD) {
            config.did_method = method;
        }

        if let Ok(size) = env::var(ENV_REVOCATION_BITMAP_SIZE) {
            config.revocation_bitmap_size = size.parse().map_err(|_| {
                IdentityError::invalid_input(
                    ENV_REVOCATION_BITMAP_SIZE,
                    format!("'{}' is not a bit count", size),
                )
            })?;
        }

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> IdentityResult<()> {
        if self.did_method.is_empty()
            || !self
                .did_method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(IdentityError::invalid_input(
                "did_method",
                "must be non-empty lowercase alphanumeric",
            ));
        }

        if self.revocation_bitmap_size == 0 || self.revocation_bitmap_size % 8 != 0 {
            return Err(IdentityError::invalid_input(
                "revocation_bitmap_size",
                "must be a positive multiple of 8",
            ));
        }

        if self.credential_context.is_empty() {
            return Err(IdentityError::invalid_input(
                "credential_context",
                "must not be empty",
            ));
        }

        Ok(())
    }

    /// The `did:<method>:` prefix every document id created under this
    /// configuration starts with
    pub fn did_prefix(&self) -> String {
        format!("{}:{}:", DID_SCHEME, self.did_method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = IdentityConnectorConfig::default();
        assert_eq!(config.did_method, DID_METHOD_DEFAULT);
        assert_eq!(config.revocation_bitmap_size, REVOCATION_BITMAP_SIZE_BITS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_did_prefix() {
        let config = IdentityConnectorConfig::default();
        assert_eq!(config.did_prefix(), "did:mem:");
    }

    #[test]
    fn test_invalid_method_rejected() {
        let config = IdentityConnectorConfig {
            did_method: "Not A Method".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unaligned_bitmap_size_rejected() {
        let config = IdentityConnectorConfig {
            revocation_bitmap_size: 13,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
