//! # Shared Module for the Identity Connector
//!
//! This crate provides the common data model, errors and configuration
//! used across the identity connector crates.
//!
//! ## Architecture
//!
//! The connector composes four self-contained pieces over this model:
//! - **DID Documents** describing verification methods and services
//! - A **revocation bitmap** embedded in a reserved document service
//! - **Verifiable credentials and presentations** transported as JWTs
//! - A **vault boundary** owning all private key material
//!
//! Nothing in this crate performs I/O; it is the vocabulary the
//! connector crates speak.

pub mod config;
pub mod constants;
pub mod document;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use config::*;
pub use constants::*;
pub use document::*;
pub use error::*;
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
