//! # Constants for the Identity Connector
//!
//! This module contains all constants used throughout the system:
//! DID method defaults, W3C context and type strings, revocation
//! bitmap parameters and JWT algorithm tags.

// =============================================================================
// DID METHOD
// =============================================================================

/// Default DID method for documents created by the in-memory connector
pub const DID_METHOD_DEFAULT: &str = "mem";

/// Prefix shared by every DID regardless of method
pub const DID_SCHEME: &str = "did";

// =============================================================================
// W3C CONTEXTS AND TYPES
// =============================================================================

/// DID Document context (W3C DID Core)
pub const DOCUMENT_CONTEXT: &str = "https://www.w3.org/ns/did/v1";

/// Credential context (W3C Verifiable Credentials)
pub const CREDENTIAL_CONTEXT_VC: &str = "https://www.w3.org/2018/credentials/v1";

/// Base type carried by every verifiable credential
pub const CREDENTIAL_TYPE_BASE: &str = "VerifiableCredential";

/// Base type carried by every verifiable presentation
pub const PRESENTATION_TYPE_BASE: &str = "VerifiablePresentation";

/// Verification method type for JWK-backed keys (W3C standard)
pub const VERIFICATION_METHOD_TYPE_JWK: &str = "JsonWebKey2020";

// =============================================================================
// REVOCATION (RevocationBitmap2022)
// =============================================================================

/// Service type constant for RevocationBitmap2022
pub const REVOCATION_SERVICE_TYPE: &str = "RevocationBitmap2022";

/// Fragment for the revocation service in a DID Document
pub const REVOCATION_SERVICE_FRAGMENT: &str = "revocation";

/// Size of the revocation bitmap in bits (16 KiB uncompressed)
pub const REVOCATION_BITMAP_SIZE_BITS: u32 = 131_072;

/// Data-URL prefix used when embedding the compressed bitmap in a
/// service endpoint
pub const REVOCATION_DATA_URL_PREFIX: &str = "data:application/octet-stream;base64,";

// =============================================================================
// JWT / JWK
// =============================================================================

/// Signature algorithm tag carried in JWT headers
pub const JWT_ALG_EDDSA: &str = "EdDSA";

/// Token type carried in JWT headers
pub const JWT_TYP: &str = "JWT";

/// JWK key type for octet key pairs
pub const JWK_KTY_OKP: &str = "OKP";

/// JWK curve name for Ed25519
pub const JWK_CRV_ED25519: &str = "Ed25519";

/// Proof type accepted by raw-data proof creation and verification
pub const PROOF_TYPE_ED25519: &str = "Ed25519";

// =============================================================================
// ENVIRONMENT VARIABLE NAMES
// =============================================================================

/// Environment variable for the DID method name
pub const ENV_DID_METHOD: &str = "IDENTITY_DID_METHOD";

/// Environment variable for the revocation bitmap size in bits
pub const ENV_REVOCATION_BITMAP_SIZE: &str = "IDENTITY_REVOCATION_BITMAP_SIZE";

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Join a DID and a fragment into a fully qualified id (`did#fragment`).
///
/// A fragment that already carries a leading `#` is not doubled.
pub fn qualify_fragment(did: &str, fragment: &str) -> String {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
    format!("{}#{}", did, fragment)
}

/// Split a fully qualified id into its DID and fragment parts, if any.
pub fn split_fragment(id: &str) -> Option<(&str, &str)> {
    id.split_once('#').filter(|(did, frag)| !did.is_empty() && !frag.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualify_fragment() {
        assert_eq!(qualify_fragment("did:mem:0x1", "key-1"), "did:mem:0x1#key-1");
        assert_eq!(qualify_fragment("did:mem:0x1", "#key-1"), "did:mem:0x1#key-1");
    }

    #[test]
    fn test_split_fragment() {
        assert_eq!(
            split_fragment("did:mem:0x1#revocation"),
            Some(("did:mem:0x1", "revocation"))
        );
        assert_eq!(split_fragment("did:mem:0x1"), None);
        assert_eq!(split_fragment("#revocation"), None);
    }

    #[test]
    fn test_bitmap_size_is_byte_aligned() {
        assert_eq!(REVOCATION_BITMAP_SIZE_BITS % 8, 0);
    }
}
