//! # Identity Profile Connector
//!
//! CRUD over `{identity, publicProfile, privateProfile}` records keyed
//! by identity string, independent of DID documents. One record per
//! identity; `create` is an idempotent upsert, `update` and `remove`
//! on a missing identity fail NotFound. Listing filters on public
//! profile properties and supports projecting a named subset of
//! fields.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::info;

use shared::error::{IdentityError, IdentityResult};
use shared::types::IdentityProfile;

use crate::store::ProfileStore;

/// Keep only the named properties of a profile map
fn project(map: &Map<String, Value>, property_names: &[&str]) -> Map<String, Value> {
    property_names
        .iter()
        .filter_map(|name| map.get(*name).map(|value| (name.to_string(), value.clone())))
        .collect()
}

/// Connector managing profile metadata behind a [`ProfileStore`]
pub struct IdentityProfileConnector {
    store: Arc<dyn ProfileStore>,
}

impl IdentityProfileConnector {
    /// Create a connector over the given store
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Create (or overwrite) the profile for an identity
    pub async fn create(
        &self,
        identity: &str,
        public_profile: Map<String, Value>,
        private_profile: Map<String, Value>,
    ) -> IdentityResult<IdentityProfile> {
        if identity.is_empty() {
            return Err(IdentityError::invalid_input("identity", "must not be empty"));
        }

        let profile = IdentityProfile {
            identity: identity.to_string(),
            public_profile,
            private_profile,
        };
        self.store.set(profile.clone()).await?;

        info!(identity = %identity, "Identity profile stored");

        Ok(profile)
    }

    /// Fetch a profile, optionally projecting each part down to a named
    /// subset of properties
    pub async fn get(
        &self,
        identity: &str,
        public_property_names: Option<&[&str]>,
        private_property_names: Option<&[&str]>,
    ) -> IdentityResult<IdentityProfile> {
        let mut profile = self
            .store
            .get(identity)
            .await?
            .ok_or_else(|| IdentityError::ProfileNotFound(identity.to_string()))?;

        if let Some(names) = public_property_names {
            profile.public_profile = project(&profile.public_profile, names);
        }
        if let Some(names) = private_property_names {
            profile.private_profile = project(&profile.private_profile, names);
        }

        Ok(profile)
    }

    /// Replace the provided parts of an existing profile
    pub async fn update(
        &self,
        identity: &str,
        public_profile: Option<Map<String, Value>>,
        private_profile: Option<Map<String, Value>>,
    ) -> IdentityResult<IdentityProfile> {
        let mut profile = self
            .store
            .get(identity)
            .await?
            .ok_or_else(|| IdentityError::ProfileNotFound(identity.to_string()))?;

        if let Some(public_profile) = public_profile {
            profile.public_profile = public_profile;
        }
        if let Some(private_profile) = private_profile {
            profile.private_profile = private_profile;
        }

        self.store.set(profile.clone()).await?;

        info!(identity = %identity, "Identity profile updated");

        Ok(profile)
    }

    /// Remove an existing profile
    pub async fn remove(&self, identity: &str) -> IdentityResult<()> {
        if !self.store.remove(identity).await? {
            return Err(IdentityError::ProfileNotFound(identity.to_string()));
        }

        info!(identity = %identity, "Identity profile removed");

        Ok(())
    }

    /// List profiles whose public properties match every given
    /// name/value pair, optionally projecting the returned parts
    pub async fn list(
        &self,
        filters: &[(&str, Value)],
        property_names: Option<&[&str]>,
    ) -> IdentityResult<Vec<IdentityProfile>> {
        let mut profiles: Vec<IdentityProfile> = self
            .store
            .all()
            .await?
            .into_iter()
            .filter(|profile| {
                filters
                    .iter()
                    .all(|(name, value)| profile.public_profile.get(*name) == Some(value))
            })
            .collect();

        if let Some(names) = property_names {
            for profile in &mut profiles {
                profile.public_profile = project(&profile.public_profile, names);
                profile.private_profile = project(&profile.private_profile, names);
            }
        }

        Ok(profiles)
    }
}
