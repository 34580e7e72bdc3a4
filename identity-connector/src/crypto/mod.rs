//! # Ed25519 Key Material
//!
//! This module names the key conventions the rest of the system relies
//! on:
//! - A keypair is an explicit `{seed, public}` pair. Signing requires
//!   the 64-byte expanded form (seed followed by public key); the seed
//!   alone is not accepted by the signing path, so reconstruction from
//!   vault-held private bytes plus the document's recorded public key
//!   is an explicit, validated conversion.
//! - Default verification method ids are the RFC 7638 JWK thumbprint:
//!   base64url(SHA-256(canonical `{crv,kty,x}` JSON)).

use ed25519_dalek::{
    Signature, Signer, SigningKey, VerifyingKey, KEYPAIR_LENGTH, PUBLIC_KEY_LENGTH,
    SECRET_KEY_LENGTH,
};
use serde::Serialize;
use sha2::{Digest, Sha256};

use shared::error::{IdentityError, IdentityResult};
use shared::types::Jwk;

/// An Ed25519 keypair held as its two 32-byte halves
#[derive(Clone)]
pub struct KeyPair {
    seed: [u8; SECRET_KEY_LENGTH],
    public: [u8; PUBLIC_KEY_LENGTH],
}

impl KeyPair {
    /// Generate a fresh keypair from the system RNG
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self {
            seed: signing_key.to_bytes(),
            public: signing_key.verifying_key().to_bytes(),
        }
    }

    /// Build a keypair from a 32-byte seed, deriving the public half
    pub fn from_seed(seed: [u8; SECRET_KEY_LENGTH]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        Self {
            seed,
            public: signing_key.verifying_key().to_bytes(),
        }
    }

    /// Reassemble a keypair from separately stored halves
    ///
    /// The halves are not checked against each other here; the check
    /// happens in [`KeyPair::to_signing_key`], so a mismatch surfaces
    /// at the first signing attempt rather than silently producing
    /// signatures under the wrong public key.
    pub fn from_parts(seed: &[u8], public: &[u8]) -> IdentityResult<Self> {
        let seed: [u8; SECRET_KEY_LENGTH] = seed.try_into().map_err(|_| {
            IdentityError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                SECRET_KEY_LENGTH,
                seed.len()
            ))
        })?;
        let public: [u8; PUBLIC_KEY_LENGTH] = public.try_into().map_err(|_| {
            IdentityError::InvalidPublicKey(format!(
                "expected {} bytes, got {}",
                PUBLIC_KEY_LENGTH,
                public.len()
            ))
        })?;
        Ok(Self { seed, public })
    }

    /// The public key bytes
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.public
    }

    /// The private seed bytes
    pub fn seed(&self) -> &[u8; SECRET_KEY_LENGTH] {
        &self.seed
    }

    /// Convert into a signing key via the 64-byte expanded form
    ///
    /// Fails with an invalid-key error when the public half does not
    /// belong to the seed.
    pub fn to_signing_key(&self) -> IdentityResult<SigningKey> {
        let mut expanded = [0u8; KEYPAIR_LENGTH];
        expanded[..SECRET_KEY_LENGTH].copy_from_slice(&self.seed);
        expanded[SECRET_KEY_LENGTH..].copy_from_slice(&self.public);
        SigningKey::from_keypair_bytes(&expanded).map_err(|_| {
            IdentityError::InvalidPrivateKey(
                "public key half does not match the seed".into(),
            )
        })
    }

    /// Sign arbitrary bytes, returning the 64-byte signature
    pub fn sign(&self, message: &[u8]) -> IdentityResult<Vec<u8>> {
        let signing_key = self.to_signing_key()?;
        Ok(signing_key.sign(message).to_bytes().to_vec())
    }

    /// The public half as an Ed25519 JWK
    pub fn to_jwk(&self) -> Jwk {
        Jwk::ed25519(base64::Engine::encode(
            &base64::engine::general_purpose::URL_SAFE_NO_PAD,
            self.public,
        ))
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Seed bytes stay out of logs
        f.debug_struct("KeyPair")
            .field("public", &hex::encode(self.public))
            .finish_non_exhaustive()
    }
}

/// Verify an Ed25519 signature over `message`
///
/// A signature that fails to verify (or cannot be parsed) yields
/// `Ok(false)`; only a malformed public key is an error.
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> IdentityResult<bool> {
    let public_key: [u8; PUBLIC_KEY_LENGTH] = public_key.try_into().map_err(|_| {
        IdentityError::InvalidPublicKey(format!(
            "expected {} bytes, got {}",
            PUBLIC_KEY_LENGTH,
            public_key.len()
        ))
    })?;
    let verifying_key = VerifyingKey::from_bytes(&public_key)
        .map_err(|e| IdentityError::InvalidPublicKey(e.to_string()))?;

    let Ok(signature) = Signature::from_slice(signature) else {
        return Ok(false);
    };

    Ok(verifying_key.verify_strict(message, &signature).is_ok())
}

/// RFC 7638 thumbprint field order: lexicographic over the required
/// OKP members
#[derive(Serialize)]
struct ThumbprintInput<'a> {
    crv: &'a str,
    kty: &'a str,
    x: &'a str,
}

/// Content-derived key id: base64url(SHA-256(canonical JWK))
///
/// Used as the default verification method fragment when the caller
/// supplies no explicit id.
pub fn jwk_thumbprint(jwk: &Jwk) -> IdentityResult<String> {
    let canonical = serde_json::to_vec(&ThumbprintInput {
        crv: &jwk.crv,
        kty: &jwk.kty,
        x: &jwk.x,
    })?;
    let digest = Sha256::digest(&canonical);
    Ok(base64::Engine::encode(
        &base64::engine::general_purpose::URL_SAFE_NO_PAD,
        digest,
    ))
}
