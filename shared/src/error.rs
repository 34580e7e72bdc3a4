//! # Error Types for the Identity Connector
//!
//! This module defines all error types used throughout the system.
//! Every failure falls into one of three kinds: validation errors
//! (rejected before any side effect), not-found errors (carrying the
//! offending identifier) and general operation failures (carrying the
//! failing operation's name and the original cause).
//!
//! Revocation is never an error: a revoked credential or presentation
//! is reported through the normal return value of the check operations.

use thiserror::Error;

/// The three failure kinds every [`IdentityError`] maps onto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input, detected before any side effect
    Validation,
    /// A referenced document, method, service, key or profile is missing
    NotFound,
    /// An unexpected lower-layer failure wrapped with its operation name
    General,
}

/// Main error type for the entire system
#[derive(Error, Debug)]
pub enum IdentityError {
    // =========================================================================
    // VALIDATION ERRORS
    // =========================================================================

    /// Malformed or missing required input
    #[error("invalid input for '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    /// Verification method purpose is not one of the six recognized values
    #[error("unknown verification method purpose: {0}")]
    UnknownPurpose(String),

    /// Revocation index does not fit the bitmap
    #[error("revocation index {index} out of range (bitmap holds {size} bits)")]
    RevocationIndexOutOfRange { index: u32, size: u32 },

    // =========================================================================
    // NOT FOUND ERRORS
    // =========================================================================

    /// DID document not found in the document store
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// Verification method not found on the resolved document
    #[error("verification method not found: {0}")]
    MethodNotFound(String),

    /// Service not found on the resolved document
    #[error("service not found: {0}")]
    ServiceNotFound(String),

    /// Identity profile not found
    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    /// Key not found in the vault
    #[error("key not found in vault: {0}")]
    KeyNotFound(String),

    /// Secret not found in the vault
    #[error("secret not found in vault: {0}")]
    SecretNotFound(String),

    // =========================================================================
    // CREDENTIAL / JWT ERRORS
    // =========================================================================

    /// Verification method exists but carries no usable public key
    #[error("verification method '{0}' has no public key JWK")]
    PublicKeyJwkMissing(String),

    /// Token is structurally not a JWT (segment count, encoding, JSON)
    #[error("malformed JWT: {0}")]
    MalformedJwt(String),

    /// Signature did not verify against the resolved public key
    #[error("invalid signature")]
    InvalidSignature,

    /// Presentation carried an `exp` claim in the past
    #[error("presentation expired at {0}")]
    PresentationExpired(String),

    // =========================================================================
    // CRYPTOGRAPHY ERRORS
    // =========================================================================

    /// Invalid public key format or value
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Invalid private key
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Key generation failed
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Signature creation failed
    #[error("failed to create signature: {0}")]
    Signature(String),

    // =========================================================================
    // REVOCATION ERRORS
    // =========================================================================

    /// Compress/decompress or data-URL handling of the bitmap failed
    #[error("revocation bitmap error: {0}")]
    RevocationBitmap(String),

    // =========================================================================
    // GENERIC ERRORS
    // =========================================================================

    /// Storage backend failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Wraps an unexpected lower-layer error with the failing operation
    #[error("{operation} failed: {reason}")]
    Operation { operation: String, reason: String },
}

/// Result type alias using IdentityError
pub type IdentityResult<T> = Result<T, IdentityError>;

impl IdentityError {
    /// Build a validation error for a named input field
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        IdentityError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a lower-layer failure with the name of the failing operation
    pub fn operation(operation: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        IdentityError::Operation {
            operation: operation.into(),
            reason: cause.to_string(),
        }
    }

    /// Which of the three failure kinds this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            IdentityError::InvalidInput { .. }
            | IdentityError::UnknownPurpose(_)
            | IdentityError::RevocationIndexOutOfRange { .. }
            | IdentityError::PresentationExpired(_) => ErrorKind::Validation,

            IdentityError::DocumentNotFound(_)
            | IdentityError::MethodNotFound(_)
            | IdentityError::ServiceNotFound(_)
            | IdentityError::ProfileNotFound(_)
            | IdentityError::KeyNotFound(_)
            | IdentityError::SecretNotFound(_) => ErrorKind::NotFound,

            _ => ErrorKind::General,
        }
    }

    /// Get the error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            IdentityError::InvalidInput { .. }
            | IdentityError::UnknownPurpose(_) => "validation",

            IdentityError::DocumentNotFound(_)
            | IdentityError::MethodNotFound(_)
            | IdentityError::ServiceNotFound(_) => "document",

            IdentityError::ProfileNotFound(_) => "profile",

            IdentityError::KeyNotFound(_)
            | IdentityError::SecretNotFound(_) => "vault",

            IdentityError::PublicKeyJwkMissing(_)
            | IdentityError::MalformedJwt(_)
            | IdentityError::InvalidSignature
            | IdentityError::PresentationExpired(_) => "credential",

            IdentityError::InvalidPublicKey(_)
            | IdentityError::InvalidPrivateKey(_)
            | IdentityError::KeyGeneration(_)
            | IdentityError::Signature(_) => "crypto",

            IdentityError::RevocationIndexOutOfRange { .. }
            | IdentityError::RevocationBitmap(_) => "revocation",

            IdentityError::Storage(_) => "storage",

            IdentityError::Serialization(_)
            | IdentityError::Operation { .. } => "internal",
        }
    }
}

// =============================================================================
// ERROR CONVERSIONS
// =============================================================================

impl From<serde_json::Error> for IdentityError {
    fn from(err: serde_json::Error) -> Self {
        IdentityError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for IdentityError {
    fn from(err: std::io::Error) -> Self {
        IdentityError::Storage(err.to_string())
    }
}

impl From<base64::DecodeError> for IdentityError {
    fn from(err: base64::DecodeError) -> Self {
        IdentityError::Serialization(err.to_string())
    }
}

impl From<ed25519_dalek::SignatureError> for IdentityError {
    fn from(err: ed25519_dalek::SignatureError) -> Self {
        IdentityError::Signature(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        let err = IdentityError::invalid_input("purpose", "empty");
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = IdentityError::DocumentNotFound("did:mem:0x1".into());
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = IdentityError::InvalidSignature;
        assert_eq!(err.kind(), ErrorKind::General);
    }

    #[test]
    fn test_error_category() {
        let err = IdentityError::MethodNotFound("did:mem:0x1#key-1".into());
        assert_eq!(err.category(), "document");

        let err = IdentityError::InvalidSignature;
        assert_eq!(err.category(), "credential");

        let err = IdentityError::RevocationIndexOutOfRange { index: 9, size: 8 };
        assert_eq!(err.category(), "revocation");
    }

    #[test]
    fn test_operation_wrapping_preserves_context() {
        let err = IdentityError::operation("createVerifiableCredential", "vault unavailable");
        assert_eq!(
            err.to_string(),
            "createVerifiableCredential failed: vault unavailable"
        );
        assert_eq!(err.kind(), ErrorKind::General);
    }
}
