//! # In-Memory Identity Connector
//!
//! This crate provides:
//! - DID document lifecycle over an injected document store
//! - Verification method and service management backed by a vault
//! - W3C Verifiable Credential / Presentation issuance and checking,
//!   transported as EdDSA-signed compact JWTs
//! - RevocationBitmap2022 revocation embedded in document services
//! - Raw Ed25519 proof creation and verification
//! - Identity profile CRUD, independent of DID documents
//!
//! ## Boundaries
//!
//! Private keys never leave the [`vault::Vault`]; documents persist
//! through the [`store::DocumentStore`]. Both are traits, so the
//! in-memory implementations here can be swapped for hardened backends
//! without touching the connector logic.

pub mod connector;
pub mod crypto;
pub mod jwt;
pub mod profile;
pub mod revocation;
pub mod store;
pub mod vault;

pub use connector::IdentityConnector;
pub use profile::IdentityProfileConnector;
pub use revocation::RevocationBitmap;
pub use store::{DocumentStore, MemoryDocumentStore, MemoryProfileStore, ProfileStore};
pub use vault::{MemoryVault, Vault};
