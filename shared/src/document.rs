//! # DID Document Model
//!
//! In-memory representation of a DID document: identifier, verification
//! methods grouped by purpose, and services.
//!
//! Verification methods live in a single insertion-ordered map from
//! method id to a tagged `(purpose, method)` entry; the six W3C purpose
//! arrays are materialized only at the serialization boundary. This
//! keeps membership changes a plain map operation instead of a scan
//! over six parallel arrays.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{IdentityError, IdentityResult};
use crate::types::Jwk;

// =============================================================================
// VERIFICATION METHOD PURPOSES
// =============================================================================

/// The six W3C verification relationships a method can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MethodPurpose {
    /// General-purpose method, not bound to a specific relationship
    VerificationMethod,
    /// Authentication of the DID subject
    Authentication,
    /// Assertions such as issued credentials
    AssertionMethod,
    /// Key agreement (encryption)
    KeyAgreement,
    /// Capability invocation
    CapabilityInvocation,
    /// Capability delegation
    CapabilityDelegation,
}

impl MethodPurpose {
    /// All recognized purposes, in document order
    pub const ALL: [MethodPurpose; 6] = [
        MethodPurpose::VerificationMethod,
        MethodPurpose::Authentication,
        MethodPurpose::AssertionMethod,
        MethodPurpose::KeyAgreement,
        MethodPurpose::CapabilityInvocation,
        MethodPurpose::CapabilityDelegation,
    ];

    /// The camelCase name used in document JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodPurpose::VerificationMethod => "verificationMethod",
            MethodPurpose::Authentication => "authentication",
            MethodPurpose::AssertionMethod => "assertionMethod",
            MethodPurpose::KeyAgreement => "keyAgreement",
            MethodPurpose::CapabilityInvocation => "capabilityInvocation",
            MethodPurpose::CapabilityDelegation => "capabilityDelegation",
        }
    }

    /// Parse a purpose from its camelCase JSON name
    pub fn parse(value: &str) -> IdentityResult<Self> {
        Self::ALL
            .into_iter()
            .find(|purpose| purpose.as_str() == value)
            .ok_or_else(|| IdentityError::UnknownPurpose(value.to_string()))
    }
}

impl fmt::Display for MethodPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// VERIFICATION METHODS AND SERVICES
// =============================================================================

/// A public key bound to a document, usable for one purpose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationMethod {
    /// Fully qualified method id (`did#fragment`)
    pub id: String,

    /// Controller DID (the owning document, or an external controller)
    pub controller: String,

    /// Method type (always `JsonWebKey2020` here)
    #[serde(rename = "type")]
    pub method_type: String,

    /// Public key material
    #[serde(rename = "publicKeyJwk", skip_serializing_if = "Option::is_none")]
    pub public_key_jwk: Option<Jwk>,
}

impl VerificationMethod {
    /// The fragment part of the method id, if well-formed
    pub fn fragment(&self) -> Option<&str> {
        split_fragment(&self.id).map(|(_, fragment)| fragment)
    }
}

/// Service endpoint entry in a DID document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Fully qualified service id (`did#fragment`)
    pub id: String,

    /// Service type
    #[serde(rename = "type")]
    pub service_type: String,

    /// Service endpoint (URL or data URI)
    #[serde(rename = "serviceEndpoint")]
    pub service_endpoint: String,
}

// =============================================================================
// DID DOCUMENT
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
struct MethodEntry {
    purpose: MethodPurpose,
    method: VerificationMethod,
}

/// The resolvable record describing a DID's verification methods and
/// services
///
/// Mutations follow replace-on-insert semantics: adding a method or
/// service whose id already exists removes the previous entry first,
/// wherever it lived. Removing a missing sub-element fails NotFound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DocumentRepr", into = "DocumentRepr")]
pub struct DidDocument {
    id: String,
    methods: IndexMap<String, MethodEntry>,
    services: Vec<Service>,
}

impl DidDocument {
    /// Create an empty document for the given DID
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            methods: IndexMap::new(),
            services: Vec::new(),
        }
    }

    /// The document's DID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Qualify a bare fragment (`#key-1` or `key-1`) against this
    /// document's id; fully qualified ids pass through unchanged.
    pub fn qualify(&self, id: &str) -> String {
        if id.contains('#') && !id.starts_with('#') {
            id.to_string()
        } else {
            qualify_fragment(&self.id, id)
        }
    }

    fn check_owned(&self, id: &str, field: &str) -> IdentityResult<()> {
        if split_fragment(id).map(|(did, _)| did) != Some(self.id.as_str()) {
            return Err(IdentityError::invalid_input(
                field,
                format!("'{}' is not a fragment of '{}'", id, self.id),
            ));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // VERIFICATION METHODS
    // -------------------------------------------------------------------------

    /// Insert a method under the given purpose, replacing any existing
    /// method with the same id regardless of the purpose it held
    ///
    /// Re-adding an id under a different purpose therefore re-types the
    /// method rather than duplicating it.
    pub fn insert_method(
        &mut self,
        purpose: MethodPurpose,
        method: VerificationMethod,
    ) -> IdentityResult<()> {
        self.check_owned(&method.id, "verificationMethod.id")?;
        self.methods.shift_remove(&method.id);
        self.methods
            .insert(method.id.clone(), MethodEntry { purpose, method });
        Ok(())
    }

    /// Remove a method by id (fragment or fully qualified)
    pub fn remove_method(&mut self, id: &str) -> IdentityResult<VerificationMethod> {
        let id = self.qualify(id);
        self.methods
            .shift_remove(&id)
            .map(|entry| entry.method)
            .ok_or(IdentityError::MethodNotFound(id))
    }

    /// Look up a method and the purpose array it lives in
    pub fn find_method(&self, id: &str) -> Option<(MethodPurpose, &VerificationMethod)> {
        let id = self.qualify(id);
        self.methods
            .get(&id)
            .map(|entry| (entry.purpose, &entry.method))
    }

    /// All methods across every purpose array, each with its owning
    /// purpose
    pub fn methods(&self) -> impl Iterator<Item = (MethodPurpose, &VerificationMethod)> {
        self.methods
            .values()
            .map(|entry| (entry.purpose, &entry.method))
    }

    // -------------------------------------------------------------------------
    // SERVICES
    // -------------------------------------------------------------------------

    /// Insert a service, replacing any existing service with the same id
    /// in place
    pub fn insert_service(&mut self, mut service: Service) -> IdentityResult<()> {
        service.id = self.qualify(&service.id);
        self.check_owned(&service.id, "service.id")?;
        match self.services.iter_mut().find(|s| s.id == service.id) {
            Some(existing) => *existing = service,
            None => self.services.push(service),
        }
        Ok(())
    }

    /// Remove a service by id (fragment or fully qualified)
    pub fn remove_service(&mut self, id: &str) -> IdentityResult<Service> {
        let id = self.qualify(id);
        let position = self
            .services
            .iter()
            .position(|s| s.id == id)
            .ok_or(IdentityError::ServiceNotFound(id))?;
        Ok(self.services.remove(position))
    }

    /// Look up a service by id (fragment or fully qualified)
    pub fn find_service(&self, id: &str) -> Option<&Service> {
        let id = self.qualify(id);
        self.services.iter().find(|s| s.id == id)
    }

    /// All services, in insertion order
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// The reserved revocation service, if installed
    pub fn revocation_service(&self) -> Option<&Service> {
        self.find_service(REVOCATION_SERVICE_FRAGMENT)
    }
}

// =============================================================================
// SERIALIZATION (W3C JSON SHAPE)
// =============================================================================

fn default_document_context() -> String {
    DOCUMENT_CONTEXT.into()
}

/// The W3C wire shape: six purpose arrays plus services
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentRepr {
    #[serde(rename = "@context", default = "default_document_context")]
    context: String,

    id: String,

    #[serde(rename = "verificationMethod", default, skip_serializing_if = "Vec::is_empty")]
    verification_method: Vec<VerificationMethod>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    authentication: Vec<VerificationMethod>,

    #[serde(rename = "assertionMethod", default, skip_serializing_if = "Vec::is_empty")]
    assertion_method: Vec<VerificationMethod>,

    #[serde(rename = "keyAgreement", default, skip_serializing_if = "Vec::is_empty")]
    key_agreement: Vec<VerificationMethod>,

    #[serde(rename = "capabilityInvocation", default, skip_serializing_if = "Vec::is_empty")]
    capability_invocation: Vec<VerificationMethod>,

    #[serde(rename = "capabilityDelegation", default, skip_serializing_if = "Vec::is_empty")]
    capability_delegation: Vec<VerificationMethod>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    service: Vec<Service>,
}

impl DocumentRepr {
    fn array_mut(&mut self, purpose: MethodPurpose) -> &mut Vec<VerificationMethod> {
        match purpose {
            MethodPurpose::VerificationMethod => &mut self.verification_method,
            MethodPurpose::Authentication => &mut self.authentication,
            MethodPurpose::AssertionMethod => &mut self.assertion_method,
            MethodPurpose::KeyAgreement => &mut self.key_agreement,
            MethodPurpose::CapabilityInvocation => &mut self.capability_invocation,
            MethodPurpose::CapabilityDelegation => &mut self.capability_delegation,
        }
    }

    fn take_array(&mut self, purpose: MethodPurpose) -> Vec<VerificationMethod> {
        std::mem::take(self.array_mut(purpose))
    }
}

impl From<DidDocument> for DocumentRepr {
    fn from(document: DidDocument) -> Self {
        let mut repr = DocumentRepr {
            context: default_document_context(),
            id: document.id,
            verification_method: Vec::new(),
            authentication: Vec::new(),
            assertion_method: Vec::new(),
            key_agreement: Vec::new(),
            capability_invocation: Vec::new(),
            capability_delegation: Vec::new(),
            service: document.services,
        };
        for entry in document.methods.into_values() {
            repr.array_mut(entry.purpose).push(entry.method);
        }
        repr
    }
}

impl From<DocumentRepr> for DidDocument {
    fn from(mut repr: DocumentRepr) -> Self {
        let mut methods = IndexMap::new();
        for purpose in MethodPurpose::ALL {
            for method in repr.take_array(purpose) {
                methods.insert(method.id.clone(), MethodEntry { purpose, method });
            }
        }
        DidDocument {
            id: repr.id,
            methods,
            services: repr.service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DID: &str = "did:mem:0xabc";

    fn method(fragment: &str) -> VerificationMethod {
        VerificationMethod {
            id: qualify_fragment(DID, fragment),
            controller: DID.into(),
            method_type: VERIFICATION_METHOD_TYPE_JWK.into(),
            public_key_jwk: Some(Jwk::ed25519("dGVzdA")),
        }
    }

    fn service(fragment: &str) -> Service {
        Service {
            id: qualify_fragment(DID, fragment),
            service_type: "LinkedDomains".into(),
            service_endpoint: "https://example.com".into(),
        }
    }

    #[test]
    fn test_purpose_parse() {
        assert_eq!(
            MethodPurpose::parse("assertionMethod").unwrap(),
            MethodPurpose::AssertionMethod
        );
        assert!(matches!(
            MethodPurpose::parse("assertion-method"),
            Err(IdentityError::UnknownPurpose(_))
        ));
    }

    #[test]
    fn test_insert_method_replaces_same_id() {
        let mut document = DidDocument::new(DID);
        document
            .insert_method(MethodPurpose::Authentication, method("key-1"))
            .unwrap();
        document
            .insert_method(MethodPurpose::AssertionMethod, method("key-1"))
            .unwrap();

        let all: Vec<_> = document.methods().collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].0, MethodPurpose::AssertionMethod);
    }

    #[test]
    fn test_method_id_must_be_owned() {
        let mut document = DidDocument::new(DID);
        let foreign = VerificationMethod {
            id: "did:mem:0xother#key-1".into(),
            ..method("key-1")
        };
        assert!(document
            .insert_method(MethodPurpose::Authentication, foreign)
            .is_err());
    }

    #[test]
    fn test_remove_missing_method_fails() {
        let mut document = DidDocument::new(DID);
        assert!(matches!(
            document.remove_method("#key-1"),
            Err(IdentityError::MethodNotFound(_))
        ));
    }

    #[test]
    fn test_find_method_accepts_fragment_and_full_id() {
        let mut document = DidDocument::new(DID);
        document
            .insert_method(MethodPurpose::Authentication, method("key-1"))
            .unwrap();

        assert!(document.find_method("#key-1").is_some());
        assert!(document.find_method("key-1").is_some());
        assert!(document
            .find_method(&qualify_fragment(DID, "key-1"))
            .is_some());
    }

    #[test]
    fn test_insert_service_replaces_in_place() {
        let mut document = DidDocument::new(DID);
        document.insert_service(service("a")).unwrap();
        document.insert_service(service("b")).unwrap();

        let replacement = Service {
            service_endpoint: "https://replaced.example.com".into(),
            ..service("a")
        };
        document.insert_service(replacement).unwrap();

        assert_eq!(document.services().len(), 2);
        assert_eq!(document.services()[0].service_endpoint, "https://replaced.example.com");
    }

    #[test]
    fn test_remove_missing_service_fails() {
        let mut document = DidDocument::new(DID);
        assert!(matches!(
            document.remove_service("#nope"),
            Err(IdentityError::ServiceNotFound(_))
        ));
    }

    #[test]
    fn test_serde_materializes_purpose_arrays() {
        let mut document = DidDocument::new(DID);
        document
            .insert_method(MethodPurpose::Authentication, method("auth-1"))
            .unwrap();
        document
            .insert_method(MethodPurpose::AssertionMethod, method("sign-1"))
            .unwrap();
        document.insert_service(service("svc")).unwrap();

        let value = serde_json::to_value(&document).unwrap();
        assert_eq!(value["id"], DID);
        assert_eq!(value["authentication"][0]["id"], qualify_fragment(DID, "auth-1"));
        assert_eq!(value["assertionMethod"][0]["id"], qualify_fragment(DID, "sign-1"));
        assert_eq!(value["service"][0]["type"], "LinkedDomains");
        assert!(value.get("keyAgreement").is_none());

        let roundtrip: DidDocument = serde_json::from_value(value).unwrap();
        assert_eq!(roundtrip, document);
    }
}
