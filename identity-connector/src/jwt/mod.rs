//! # JWT Codec
//!
//! Compact JWTs carry verifiable credentials and presentations between
//! parties. Headers are fixed to `{kid, typ: "JWT", alg: "EdDSA"}`;
//! payloads hold the registered claims plus an embedded `vc` or `vp`
//! domain claim.
//!
//! Structural problems (wrong segment count, broken base64url, invalid
//! JSON) are reported as [`JwtError`] so callers can tell "not a JWT"
//! apart from "valid JWT whose signature does not verify"; the latter
//! is only ever discovered through [`verify_signature`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared::constants::*;
use shared::error::{IdentityError, IdentityResult};
use shared::types::{CredentialClaim, PresentationClaim};

use crate::crypto::{self, KeyPair};

/// Structural decoding failures; never signature failures
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("expected 3 segments, found {0}")]
    SegmentCount(usize),

    #[error("segment is not base64url: {0}")]
    Encoding(String),

    #[error("segment is not valid JSON: {0}")]
    Json(String),

    #[error("unsupported algorithm: {0}")]
    Algorithm(String),
}

impl From<JwtError> for IdentityError {
    fn from(err: JwtError) -> Self {
        IdentityError::MalformedJwt(err.to_string())
    }
}

/// JOSE header for every token this system produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtHeader {
    /// Fully qualified id of the verification method that signed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Token type, always `JWT`
    pub typ: String,

    /// Signature algorithm, always `EdDSA`
    pub alg: String,
}

impl JwtHeader {
    /// Header naming the signing method
    pub fn new(kid: impl Into<String>) -> Self {
        Self {
            kid: Some(kid.into()),
            typ: JWT_TYP.into(),
            alg: JWT_ALG_EDDSA.into(),
        }
    }
}

/// Registered claims plus the embedded domain claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Issuer: credential issuer DID, or presentation holder DID
    pub iss: String,

    /// Not-before, seconds since the epoch; doubles as issuance date
    pub nbf: i64,

    /// Expiry, seconds since the epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Token id (the credential id)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Subject (the first credential subject's id)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Stripped credential body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vc: Option<CredentialClaim>,

    /// Stripped presentation body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vp: Option<PresentationClaim>,
}

impl JwtClaims {
    /// Claims with only issuer and not-before set
    pub fn new(iss: impl Into<String>, nbf: DateTime<Utc>) -> Self {
        Self {
            iss: iss.into(),
            nbf: nbf.timestamp(),
            exp: None,
            jti: None,
            sub: None,
            vc: None,
            vp: None,
        }
    }

    /// The not-before instant as a timestamp type
    pub fn nbf_datetime(&self) -> IdentityResult<DateTime<Utc>> {
        DateTime::from_timestamp(self.nbf, 0).ok_or_else(|| {
            IdentityError::invalid_input("nbf", format!("'{}' is not a unix timestamp", self.nbf))
        })
    }
}

/// A decoded token, retaining everything needed for verification
#[derive(Debug, Clone)]
pub struct DecodedJwt {
    pub header: JwtHeader,
    pub claims: JwtClaims,

    /// Raw signature bytes from the third segment
    pub signature: Vec<u8>,

    /// The bytes the signature covers (`<header>.<payload>`)
    pub signing_input: Vec<u8>,
}

fn encode_segment(bytes: &[u8]) -> String {
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, JwtError> {
    base64::Engine::decode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, segment)
        .map_err(|e| JwtError::Encoding(e.to_string()))
}

/// Serialize, join and sign into compact form
pub fn encode(header: &JwtHeader, claims: &JwtClaims, keypair: &KeyPair) -> IdentityResult<String> {
    let header_segment = encode_segment(&serde_json::to_vec(header)?);
    let payload_segment = encode_segment(&serde_json::to_vec(claims)?);

    let signing_input = format!("{}.{}", header_segment, payload_segment);
    let signature = keypair.sign(signing_input.as_bytes())?;

    Ok(format!("{}.{}", signing_input, encode_segment(&signature)))
}

/// Split and parse a compact token without verifying its signature
pub fn decode(token: &str) -> Result<DecodedJwt, JwtError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(JwtError::SegmentCount(segments.len()));
    }

    let header: JwtHeader = serde_json::from_slice(&decode_segment(segments[0])?)
        .map_err(|e| JwtError::Json(e.to_string()))?;
    let claims: JwtClaims = serde_json::from_slice(&decode_segment(segments[1])?)
        .map_err(|e| JwtError::Json(e.to_string()))?;
    let signature = decode_segment(segments[2])?;

    if header.alg != JWT_ALG_EDDSA {
        return Err(JwtError::Algorithm(header.alg));
    }

    let signing_input = format!("{}.{}", segments[0], segments[1]).into_bytes();

    Ok(DecodedJwt {
        header,
        claims,
        signature,
        signing_input,
    })
}

/// Verify a decoded token's signature against a public key
pub fn verify_signature(decoded: &DecodedJwt, public_key: &[u8]) -> IdentityResult<bool> {
    crypto::verify(public_key, &decoded.signing_input, &decoded.signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_token(keypair: &KeyPair) -> String {
        let header = JwtHeader::new("did:mem:0x1#key-1");
        let mut claims = JwtClaims::new("did:mem:0x1", Utc::now());
        claims.jti = Some("urn:uuid:1234".into());
        claims.sub = Some("did:mem:0x2".into());
        encode(&header, &claims, keypair).unwrap()
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let keypair = KeyPair::generate();
        let token = sample_token(&keypair);

        let decoded = decode(&token).unwrap();
        assert_eq!(decoded.header.kid.as_deref(), Some("did:mem:0x1#key-1"));
        assert_eq!(decoded.header.alg, JWT_ALG_EDDSA);
        assert_eq!(decoded.claims.iss, "did:mem:0x1");
        assert_eq!(decoded.claims.jti.as_deref(), Some("urn:uuid:1234"));
        assert!(verify_signature(&decoded, keypair.public_key()).unwrap());
    }

    #[test]
    fn test_wrong_segment_count_is_malformed() {
        assert!(matches!(decode("only.two"), Err(JwtError::SegmentCount(2))));
        assert!(matches!(
            decode("a.b.c.d"),
            Err(JwtError::SegmentCount(4))
        ));
    }

    #[test]
    fn test_bad_encoding_is_malformed() {
        assert!(matches!(
            decode("!!!.###.$$$"),
            Err(JwtError::Encoding(_))
        ));
    }

    #[test]
    fn test_bad_json_is_malformed() {
        let garbage = encode_segment(b"not json");
        let token = format!("{0}.{0}.{0}", garbage);
        assert!(matches!(decode(&token), Err(JwtError::Json(_))));
    }

    #[test]
    fn test_foreign_algorithm_rejected() {
        let keypair = KeyPair::generate();
        let header = JwtHeader {
            kid: None,
            typ: JWT_TYP.into(),
            alg: "HS256".into(),
        };
        let claims = JwtClaims::new("did:mem:0x1", Utc::now());
        let token = encode(&header, &claims, &keypair).unwrap();
        assert!(matches!(decode(&token), Err(JwtError::Algorithm(_))));
    }

    #[test]
    fn test_tampered_payload_fails_verification() {
        let keypair = KeyPair::generate();
        let token = sample_token(&keypair);

        let mut segments: Vec<&str> = token.split('.').collect();
        let mut claims = JwtClaims::new("did:mem:0xevil", Utc::now());
        claims.jti = Some("urn:uuid:1234".into());
        let forged = encode_segment(&serde_json::to_vec(&claims).unwrap());
        segments[1] = &forged;
        let tampered = segments.join(".");

        let decoded = decode(&tampered).unwrap();
        assert!(!verify_signature(&decoded, keypair.public_key()).unwrap());
    }

    #[test]
    fn test_tampered_signature_fails_verification() {
        let keypair = KeyPair::generate();
        let token = sample_token(&keypair);

        let decoded = decode(&token).unwrap();
        let mut broken = decoded.clone();
        broken.signature[0] ^= 0x01;

        assert!(verify_signature(&decoded, keypair.public_key()).unwrap());
        assert!(!verify_signature(&broken, keypair.public_key()).unwrap());
    }

    #[test]
    fn test_optional_claims_stay_absent() {
        let keypair = KeyPair::generate();
        let header = JwtHeader::new("did:mem:0x1#key-1");
        let claims = JwtClaims::new("did:mem:0x1", Utc::now());
        let token = encode(&header, &claims, &keypair).unwrap();

        let decoded = decode(&token).unwrap();
        assert!(decoded.claims.exp.is_none());
        assert!(decoded.claims.vc.is_none());
        assert!(decoded.claims.vp.is_none());

        // Absent options must not appear as JSON nulls either
        let payload = decode_segment(token.split('.').nth(1).unwrap()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert!(value.get("exp").is_none());
        assert!(value.get("vc").is_none());
    }
}
