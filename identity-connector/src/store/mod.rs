//! # Storage Boundaries
//!
//! Injected storage abstractions for DID documents and identity
//! profiles. The connector never touches a process-wide static map;
//! every instance is handed its stores, so several connectors can
//! coexist in one process without colliding.
//!
//! Writes are whole-record and last-writer-wins: there is no version
//! token or compare-and-swap, so two concurrent read-modify-write
//! sequences against the same document id can race. Callers needing
//! stronger guarantees must serialize access per document themselves.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use shared::document::DidDocument;
use shared::error::IdentityResult;
use shared::types::IdentityProfile;

// =============================================================================
// DID DOCUMENTS
// =============================================================================

/// Persistence boundary for DID documents, addressed by document id
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, or `None` when the id was never stored
    async fn get(&self, document_id: &str) -> IdentityResult<Option<DidDocument>>;

    /// Store a document, replacing any previous record under its id
    async fn set(&self, document: DidDocument) -> IdentityResult<()>;
}

/// In-memory document store for the memory connector and tests
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<String, DidDocument>>,
}

impl MemoryDocumentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Whether the store holds no documents
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, document_id: &str) -> IdentityResult<Option<DidDocument>> {
        Ok(self.documents.read().get(document_id).cloned())
    }

    async fn set(&self, document: DidDocument) -> IdentityResult<()> {
        self.documents
            .write()
            .insert(document.id().to_string(), document);
        Ok(())
    }
}

// =============================================================================
// IDENTITY PROFILES
// =============================================================================

/// Persistence boundary for identity profiles, one record per identity
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch a profile, or `None` when the identity has none
    async fn get(&self, identity: &str) -> IdentityResult<Option<IdentityProfile>>;

    /// Store a profile, replacing any previous record for its identity
    async fn set(&self, profile: IdentityProfile) -> IdentityResult<()>;

    /// Remove a profile; returns whether a record existed
    async fn remove(&self, identity: &str) -> IdentityResult<bool>;

    /// All stored profiles
    async fn all(&self) -> IdentityResult<Vec<IdentityProfile>>;
}

/// In-memory profile store
#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<String, IdentityProfile>>,
}

impl MemoryProfileStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, identity: &str) -> IdentityResult<Option<IdentityProfile>> {
        Ok(self.profiles.read().get(identity).cloned())
    }

    async fn set(&self, profile: IdentityProfile) -> IdentityResult<()> {
        self.profiles
            .write()
            .insert(profile.identity.clone(), profile);
        Ok(())
    }

    async fn remove(&self, identity: &str) -> IdentityResult<bool> {
        Ok(self.profiles.write().remove(identity).is_some())
    }

    async fn all(&self) -> IdentityResult<Vec<IdentityProfile>> {
        let mut profiles: Vec<_> = self.profiles.read().values().cloned().collect();
        profiles.sort_by(|a, b| a.identity.cmp(&b.identity));
        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[tokio::test]
    async fn test_document_store_roundtrip() {
        let store = MemoryDocumentStore::new();
        assert!(store.get("did:mem:0x1").await.unwrap().is_none());

        store.set(DidDocument::new("did:mem:0x1")).await.unwrap();
        let loaded = store.get("did:mem:0x1").await.unwrap().unwrap();
        assert_eq!(loaded.id(), "did:mem:0x1");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_document_store_last_writer_wins() {
        let store = MemoryDocumentStore::new();

        let mut first = DidDocument::new("did:mem:0x1");
        first
            .insert_service(shared::document::Service {
                id: "did:mem:0x1#a".into(),
                service_type: "LinkedDomains".into(),
                service_endpoint: "https://first.example.com".into(),
            })
            .unwrap();
        store.set(first).await.unwrap();

        store.set(DidDocument::new("did:mem:0x1")).await.unwrap();

        let loaded = store.get("did:mem:0x1").await.unwrap().unwrap();
        assert!(loaded.services().is_empty());
    }

    #[tokio::test]
    async fn test_profile_store_roundtrip() {
        let store = MemoryProfileStore::new();

        let profile = IdentityProfile {
            identity: "did:mem:0x1".into(),
            public_profile: Map::new(),
            private_profile: Map::new(),
        };
        store.set(profile).await.unwrap();

        assert!(store.get("did:mem:0x1").await.unwrap().is_some());
        assert!(store.remove("did:mem:0x1").await.unwrap());
        assert!(!store.remove("did:mem:0x1").await.unwrap());
    }

    #[tokio::test]
    async fn test_profile_store_all_is_sorted() {
        let store = MemoryProfileStore::new();
        for identity in ["did:mem:0xc", "did:mem:0xa", "did:mem:0xb"] {
            store
                .set(IdentityProfile {
                    identity: identity.into(),
                    public_profile: Map::new(),
                    private_profile: Map::new(),
                })
                .await
                .unwrap();
        }

        let all = store.all().await.unwrap();
        let ids: Vec<_> = all.iter().map(|p| p.identity.as_str()).collect();
        assert_eq!(ids, vec!["did:mem:0xa", "did:mem:0xb", "did:mem:0xc"]);
    }
}
