//! # Shared Data Types for the Identity Connector
//!
//! This module defines the credential-side data structures exchanged
//! across the connector boundary: JWKs, verifiable credentials and
//! presentations, credential status, proofs and the result shapes
//! returned by the check operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::*;
use crate::document::DidDocument;
use crate::error::{IdentityError, IdentityResult};

// =============================================================================
// JSON WEB KEY
// =============================================================================

/// Public key material carried by a verification method
///
/// Only octet key pairs on the Ed25519 curve are produced by this
/// system; `x` is the base64url-encoded public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type (always `OKP` here)
    pub kty: String,

    /// Curve name (always `Ed25519` here)
    pub crv: String,

    /// Signature algorithm the key is intended for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Base64url-encoded public key bytes
    pub x: String,

    /// Key identifier (content-derived thumbprint by default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl Jwk {
    /// Build an Ed25519 JWK from already-encoded public key bytes
    pub fn ed25519(x: impl Into<String>) -> Self {
        Self {
            kty: JWK_KTY_OKP.into(),
            crv: JWK_CRV_ED25519.into(),
            alg: Some(JWT_ALG_EDDSA.into()),
            x: x.into(),
            kid: None,
        }
    }

    /// Decode the raw public key bytes out of `x`
    pub fn decode_x(&self) -> IdentityResult<Vec<u8>> {
        base64::Engine::decode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, &self.x)
            .map_err(|e| IdentityError::InvalidPublicKey(e.to_string()))
    }
}

// =============================================================================
// VERIFIABLE CREDENTIAL
// =============================================================================

/// Status entry linking a credential to its issuer's revocation bitmap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialStatus {
    /// Fully qualified id of the issuer's revocation service
    pub id: String,

    /// Status type (always `RevocationBitmap2022`)
    #[serde(rename = "type")]
    pub status_type: String,

    /// Index of this credential's bit, stringified per the bitmap spec
    #[serde(rename = "revocationBitmapIndex")]
    pub revocation_bitmap_index: String,
}

impl CredentialStatus {
    /// Build a status entry pointing at `service_id` with the given index
    pub fn new(service_id: impl Into<String>, index: u32) -> Self {
        Self {
            id: service_id.into(),
            status_type: REVOCATION_SERVICE_TYPE.into(),
            revocation_bitmap_index: index.to_string(),
        }
    }

    /// Parse the stringified bitmap index back into a number
    pub fn index(&self) -> IdentityResult<u32> {
        self.revocation_bitmap_index.parse().map_err(|_| {
            IdentityError::invalid_input(
                "revocationBitmapIndex",
                format!("'{}' is not an index", self.revocation_bitmap_index),
            )
        })
    }
}

/// Subject of a credential: a single claims object or a sequence of them
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CredentialSubject {
    /// One subject object
    One(Map<String, Value>),
    /// Several subject objects attested by the same credential
    Many(Vec<Map<String, Value>>),
}

impl CredentialSubject {
    /// The `id` of the first subject object, if present
    ///
    /// This becomes the JWT `sub` claim on issuance.
    pub fn first_id(&self) -> Option<&str> {
        let first = match self {
            CredentialSubject::One(map) => Some(map),
            CredentialSubject::Many(maps) => maps.first(),
        };
        first.and_then(|map| map.get("id")).and_then(Value::as_str)
    }

    /// Schema types declared by the first subject object (`@type` or
    /// `type`, a single string or an array of strings)
    pub fn schema_types(&self) -> Vec<String> {
        let first = match self {
            CredentialSubject::One(map) => Some(map),
            CredentialSubject::Many(maps) => maps.first(),
        };
        let declared = first.and_then(|map| map.get("@type").or_else(|| map.get("type")));
        match declared {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Whether the subject carries no claims objects at all
    pub fn is_empty(&self) -> bool {
        match self {
            CredentialSubject::One(_) => false,
            CredentialSubject::Many(maps) => maps.is_empty(),
        }
    }
}

/// A W3C Verifiable Credential as returned to callers
///
/// The transport form is a compact JWT; this object is the expanded
/// body, reconstructed from JWT claims on verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiableCredential {
    /// W3C VC context
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    /// Credential identifier (JWT `jti`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Credential types
    #[serde(rename = "type")]
    pub types: Vec<String>,

    /// The subject(s) being attested
    #[serde(rename = "credentialSubject")]
    pub credential_subject: CredentialSubject,

    /// Revocation status entry, present when issuance requested one
    #[serde(rename = "credentialStatus", skip_serializing_if = "Option::is_none")]
    pub credential_status: Option<CredentialStatus>,

    /// Issuer DID (JWT `iss`)
    pub issuer: String,

    /// Issuance date (JWT `nbf`)
    #[serde(rename = "issuanceDate")]
    pub issuance_date: DateTime<Utc>,
}

/// The stripped-down credential body embedded as the JWT `vc` claim
///
/// `id`, `issuer` and `issuanceDate` are intentionally absent: they are
/// reconstructed from the registered claims `jti`, `iss` and `nbf`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialClaim {
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    #[serde(rename = "type")]
    pub types: Vec<String>,

    #[serde(rename = "credentialSubject")]
    pub credential_subject: CredentialSubject,

    #[serde(rename = "credentialStatus", default, skip_serializing_if = "Option::is_none")]
    pub credential_status: Option<CredentialStatus>,
}

// =============================================================================
// VERIFIABLE PRESENTATION
// =============================================================================

/// A W3C Verifiable Presentation as returned to callers
///
/// Embedded credentials stay in their compact JWT form; they are
/// resolved and checked individually during presentation verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiablePresentation {
    /// W3C VC context
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    /// Presentation types
    #[serde(rename = "type")]
    pub types: Vec<String>,

    /// Embedded credential JWTs
    #[serde(rename = "verifiableCredential")]
    pub verifiable_credential: Vec<String>,

    /// Holder DID (JWT `iss`)
    pub holder: String,
}

/// The stripped-down presentation body embedded as the JWT `vp` claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationClaim {
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    #[serde(rename = "type")]
    pub types: Vec<String>,

    #[serde(rename = "verifiableCredential")]
    pub verifiable_credential: Vec<String>,
}

// =============================================================================
// PROOFS
// =============================================================================

/// A raw signature over caller-supplied bytes, independent of the
/// credential/presentation JWT flows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Signature type (currently only `Ed25519`)
    #[serde(rename = "type")]
    pub proof_type: String,

    /// Base64-encoded signature bytes
    pub value: String,
}

// =============================================================================
// OPERATION RESULTS
// =============================================================================

/// Result of credential issuance: the expanded body plus its JWT form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialIssuance {
    #[serde(rename = "verifiableCredential")]
    pub verifiable_credential: VerifiableCredential,

    /// Compact JWT carrying the credential
    pub jwt: String,
}

/// Result of checking a credential
///
/// Revocation is a distinguished outcome, not an error: a revoked
/// credential yields `revoked: true` with the body omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialVerification {
    /// Whether the issuer's live bitmap marks this credential revoked
    pub revoked: bool,

    /// The reconstructed credential, absent when revoked
    #[serde(rename = "verifiableCredential", skip_serializing_if = "Option::is_none")]
    pub verifiable_credential: Option<VerifiableCredential>,
}

/// Result of presentation issuance: the expanded body plus its JWT form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationIssuance {
    #[serde(rename = "verifiablePresentation")]
    pub verifiable_presentation: VerifiablePresentation,

    /// Compact JWT carrying the presentation
    pub jwt: String,
}

/// Result of checking a presentation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationVerification {
    /// Logical OR of every embedded credential's revoked status
    pub revoked: bool,

    /// The reconstructed presentation, absent when any credential is revoked
    #[serde(rename = "verifiablePresentation", skip_serializing_if = "Option::is_none")]
    pub verifiable_presentation: Option<VerifiablePresentation>,

    /// Resolved issuer documents of the embedded credentials
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuers: Option<Vec<DidDocument>>,
}

// =============================================================================
// IDENTITY PROFILES
// =============================================================================

/// Profile metadata keyed by identity, independent of DID documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityProfile {
    /// The identity this profile belongs to
    pub identity: String,

    /// Properties visible to anyone
    #[serde(rename = "publicProfile")]
    pub public_profile: Map<String, Value>,

    /// Properties visible only to the identity owner
    #[serde(rename = "privateProfile")]
    pub private_profile: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn subject_map(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_subject_first_id() {
        let one = CredentialSubject::One(subject_map(json!({"id": "did:mem:0xa", "name": "Alice"})));
        assert_eq!(one.first_id(), Some("did:mem:0xa"));

        let many = CredentialSubject::Many(vec![
            subject_map(json!({"id": "did:mem:0xb"})),
            subject_map(json!({"id": "did:mem:0xc"})),
        ]);
        assert_eq!(many.first_id(), Some("did:mem:0xb"));

        let anonymous = CredentialSubject::One(subject_map(json!({"name": "Alice"})));
        assert_eq!(anonymous.first_id(), None);
    }

    #[test]
    fn test_subject_schema_types() {
        let typed = CredentialSubject::One(subject_map(json!({"@type": "Person"})));
        assert_eq!(typed.schema_types(), vec!["Person".to_string()]);

        let multi = CredentialSubject::One(subject_map(json!({"type": ["Person", "Employee"]})));
        assert_eq!(
            multi.schema_types(),
            vec!["Person".to_string(), "Employee".to_string()]
        );

        let untyped = CredentialSubject::One(subject_map(json!({"name": "Alice"})));
        assert!(untyped.schema_types().is_empty());
    }

    #[test]
    fn test_credential_status_index_roundtrip() {
        let status = CredentialStatus::new("did:mem:0x1#revocation", 5);
        assert_eq!(status.status_type, REVOCATION_SERVICE_TYPE);
        assert_eq!(status.revocation_bitmap_index, "5");
        assert_eq!(status.index().unwrap(), 5);

        let bad = CredentialStatus {
            revocation_bitmap_index: "not-a-number".into(),
            ..status
        };
        assert!(bad.index().is_err());
    }

    #[test]
    fn test_credential_serializes_with_w3c_keys() {
        let credential = VerifiableCredential {
            context: vec![CREDENTIAL_CONTEXT_VC.into()],
            id: Some("urn:uuid:1234".into()),
            types: vec![CREDENTIAL_TYPE_BASE.into()],
            credential_subject: CredentialSubject::One(subject_map(json!({"name": "Alice"}))),
            credential_status: None,
            issuer: "did:mem:0x1".into(),
            issuance_date: Utc::now(),
        };

        let value = serde_json::to_value(&credential).unwrap();
        assert!(value.get("@context").is_some());
        assert!(value.get("credentialSubject").is_some());
        assert!(value.get("issuanceDate").is_some());
        assert!(value.get("credentialStatus").is_none());
    }

    #[test]
    fn test_jwk_decode_x() {
        let jwk = Jwk::ed25519(base64::Engine::encode(
            &base64::engine::general_purpose::URL_SAFE_NO_PAD,
            [7u8; 32],
        ));
        assert_eq!(jwk.decode_x().unwrap(), vec![7u8; 32]);

        let bad = Jwk::ed25519("!!not-base64url!!");
        assert!(bad.decode_x().is_err());
    }
}
