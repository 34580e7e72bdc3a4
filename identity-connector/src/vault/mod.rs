//! # Vault Boundary
//!
//! The vault owns every piece of private key material in the system;
//! the connector addresses keys purely by id and never persists private
//! bytes itself. Keys are created under a temporary id and renamed to
//! their final `did#fragment` address only once the document mutation
//! referencing them has been prepared.
//!
//! [`MemoryVault`] is the in-process implementation used by the memory
//! connector and by tests; production deployments substitute their own
//! implementation of the [`Vault`] trait.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use shared::error::{IdentityError, IdentityResult};

use crate::crypto::KeyPair;

/// Key algorithms the vault can generate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    /// Ed25519 signing keys (the only algorithm used by this connector)
    Ed25519,
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAlgorithm::Ed25519 => write!(f, "Ed25519"),
        }
    }
}

/// Key material handed out by the vault
///
/// `public_key` is optional because some vault backends store only the
/// private half; callers needing the public half then take it from the
/// document's recorded JWK.
#[derive(Clone)]
pub struct VaultKey {
    /// Raw private key bytes (Ed25519 seed)
    pub private_key: Vec<u8>,

    /// Raw public key bytes, when the backend tracks them
    pub public_key: Option<Vec<u8>>,
}

/// Operations the connector consumes from the external vault
#[async_trait]
pub trait Vault: Send + Sync {
    /// Create a key under `key_id` and return its public key bytes
    async fn create_key(&self, key_id: &str, algorithm: KeyAlgorithm) -> IdentityResult<Vec<u8>>;

    /// Fetch the key material stored under `key_id`
    async fn get_key(&self, key_id: &str) -> IdentityResult<VaultKey>;

    /// Move a key to a new id, overwriting any key already there
    async fn rename_key(&self, old_id: &str, new_id: &str) -> IdentityResult<()>;

    /// Sign `message` with the key stored under `key_id`
    async fn sign(&self, key_id: &str, message: &[u8]) -> IdentityResult<Vec<u8>>;

    /// Store an opaque secret under `secret_id`
    async fn set_secret(&self, secret_id: &str, value: &[u8]) -> IdentityResult<()>;

    /// Fetch the secret stored under `secret_id`
    async fn get_secret(&self, secret_id: &str) -> IdentityResult<Vec<u8>>;
}

/// In-memory vault holding raw Ed25519 key material
#[derive(Default)]
pub struct MemoryVault {
    keys: RwLock<HashMap<String, KeyPair>>,
    secrets: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryVault {
    /// Create an empty vault
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held (for diagnostics)
    pub fn key_count(&self) -> usize {
        self.keys.read().len()
    }
}

#[async_trait]
impl Vault for MemoryVault {
    async fn create_key(&self, key_id: &str, algorithm: KeyAlgorithm) -> IdentityResult<Vec<u8>> {
        let KeyAlgorithm::Ed25519 = algorithm;

        let mut keys = self.keys.write();
        if keys.contains_key(key_id) {
            return Err(IdentityError::invalid_input(
                "keyId",
                format!("key '{}' already exists", key_id),
            ));
        }

        let keypair = KeyPair::generate();
        let public_key = keypair.public_key().to_vec();
        keys.insert(key_id.to_string(), keypair);

        debug!(key_id = %key_id, algorithm = %algorithm, "Key created in vault");

        Ok(public_key)
    }

    async fn get_key(&self, key_id: &str) -> IdentityResult<VaultKey> {
        let keys = self.keys.read();
        let keypair = keys
            .get(key_id)
            .ok_or_else(|| IdentityError::KeyNotFound(key_id.to_string()))?;

        Ok(VaultKey {
            private_key: keypair.seed().to_vec(),
            public_key: Some(keypair.public_key().to_vec()),
        })
    }

    async fn rename_key(&self, old_id: &str, new_id: &str) -> IdentityResult<()> {
        let mut keys = self.keys.write();
        let keypair = keys
            .remove(old_id)
            .ok_or_else(|| IdentityError::KeyNotFound(old_id.to_string()))?;

        // Replace semantics: re-adding a method under an existing
        // fragment overwrites the key at the final address too.
        keys.insert(new_id.to_string(), keypair);

        debug!(old_id = %old_id, new_id = %new_id, "Key renamed in vault");

        Ok(())
    }

    async fn sign(&self, key_id: &str, message: &[u8]) -> IdentityResult<Vec<u8>> {
        let keypair = {
            let keys = self.keys.read();
            keys.get(key_id)
                .ok_or_else(|| IdentityError::KeyNotFound(key_id.to_string()))?
                .clone()
        };
        keypair.sign(message)
    }

    async fn set_secret(&self, secret_id: &str, value: &[u8]) -> IdentityResult<()> {
        self.secrets
            .write()
            .insert(secret_id.to_string(), value.to_vec());
        Ok(())
    }

    async fn get_secret(&self, secret_id: &str) -> IdentityResult<Vec<u8>> {
        self.secrets
            .read()
            .get(secret_id)
            .cloned()
            .ok_or_else(|| IdentityError::SecretNotFound(secret_id.to_string()))
    }
}
