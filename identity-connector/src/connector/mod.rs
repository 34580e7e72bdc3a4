//! # Identity Connector
//!
//! Orchestrates the document model, vault, JWT codec and revocation
//! bitmap into the public identity operations:
//! - DID document lifecycle (create, resolve, mutate sub-elements)
//! - Verification method and service management
//! - Credential and presentation issuance and checking
//! - Revocation toggling against the issuer's bitmap
//! - Raw-data proof creation and verification
//!
//! Every operation resolves before it mutates: a NotFound detected
//! mid-operation stops it with nothing persisted. Document writes are
//! whole-record and carry no version token, so concurrent writers to
//! the same document race with last-writer-wins semantics (see the
//! store module).

use std::sync::Arc;

use chrono::Utc;
use rand::RngCore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared::config::IdentityConnectorConfig;
use shared::constants::*;
use shared::document::{DidDocument, MethodPurpose, Service, VerificationMethod};
use shared::error::{IdentityError, IdentityResult};
use shared::types::{
    CredentialClaim, CredentialIssuance, CredentialStatus, CredentialSubject,
    CredentialVerification, Jwk, PresentationClaim, PresentationIssuance,
    PresentationVerification, Proof, VerifiableCredential, VerifiablePresentation,
};

use crate::crypto::{self, KeyPair};
use crate::jwt::{self, JwtClaims, JwtHeader};
use crate::revocation;
use crate::store::DocumentStore;
use crate::vault::{KeyAlgorithm, Vault};

/// The in-memory identity connector
///
/// Holds no document state of its own; everything lives behind the
/// injected [`DocumentStore`] and [`Vault`] boundaries, so several
/// connector instances can share (or isolate) state as the caller
/// chooses.
pub struct IdentityConnector {
    config: IdentityConnectorConfig,
    vault: Arc<dyn Vault>,
    store: Arc<dyn DocumentStore>,
}

impl IdentityConnector {
    /// Create a connector over the given collaborators
    pub fn new(
        config: IdentityConnectorConfig,
        vault: Arc<dyn Vault>,
        store: Arc<dyn DocumentStore>,
    ) -> IdentityResult<Self> {
        config.validate()?;

        info!(
            did_method = %config.did_method,
            bitmap_bits = config.revocation_bitmap_size,
            "Initializing identity connector"
        );

        Ok(Self {
            config,
            vault,
            store,
        })
    }

    fn generate_document_id(&self) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        format!("{}0x{}", self.config.did_prefix(), hex::encode(bytes))
    }

    /// Find a method on a resolved document or fail NotFound with the
    /// qualified id attached
    fn method_on<'a>(
        document: &'a DidDocument,
        method_id: &str,
    ) -> IdentityResult<&'a VerificationMethod> {
        document
            .find_method(method_id)
            .map(|(_, method)| method)
            .ok_or_else(|| IdentityError::MethodNotFound(document.qualify(method_id)))
    }

    /// Reassemble the full signing keypair for a method: private bytes
    /// from the vault, public half from the document's recorded JWK
    async fn signing_keypair(&self, method: &VerificationMethod) -> IdentityResult<KeyPair> {
        let jwk = method
            .public_key_jwk
            .as_ref()
            .ok_or_else(|| IdentityError::PublicKeyJwkMissing(method.id.clone()))?;
        let public_key = jwk.decode_x()?;
        let vault_key = self.vault.get_key(&method.id).await?;
        KeyPair::from_parts(&vault_key.private_key, &public_key)
    }

    fn method_public_key(method: &VerificationMethod) -> IdentityResult<Vec<u8>> {
        method
            .public_key_jwk
            .as_ref()
            .ok_or_else(|| IdentityError::PublicKeyJwkMissing(method.id.clone()))?
            .decode_x()
    }

    // =========================================================================
    // DOCUMENTS
    // =========================================================================

    /// Create a fresh DID document with an empty revocation bitmap
    /// pre-installed, persist it and return it
    pub async fn create_document(&self, controller: &str) -> IdentityResult<DidDocument> {
        if controller.is_empty() {
            return Err(IdentityError::invalid_input("controller", "must not be empty"));
        }

        let document_id = self.generate_document_id();
        let mut document = DidDocument::new(&document_id);
        document.insert_service(revocation::empty_revocation_service(
            &document_id,
            self.config.revocation_bitmap_size,
        )?)?;

        self.store.set(document.clone()).await?;

        info!(
            controller = %controller,
            document_id = %document_id,
            "DID document created"
        );

        Ok(document)
    }

    /// Fetch a document or fail NotFound with the offending id
    pub async fn resolve_document(&self, document_id: &str) -> IdentityResult<DidDocument> {
        if document_id.is_empty() {
            return Err(IdentityError::invalid_input("documentId", "must not be empty"));
        }

        self.store
            .get(document_id)
            .await?
            .ok_or_else(|| IdentityError::DocumentNotFound(document_id.to_string()))
    }

    // =========================================================================
    // VERIFICATION METHODS
    // =========================================================================

    /// Create a key in the vault and attach it to the document under
    /// the requested purpose
    ///
    /// The key is generated under a temporary id and renamed to its
    /// final `did#fragment` address only once the document mutation is
    /// prepared; a failure before that point leaves no key under the
    /// final address. Without an explicit fragment the method id is the
    /// JWK thumbprint of the new key.
    pub async fn add_verification_method(
        &self,
        document_id: &str,
        purpose: &str,
        fragment: Option<&str>,
    ) -> IdentityResult<VerificationMethod> {
        // Validation comes first: a bad purpose must not create keys
        let purpose = MethodPurpose::parse(purpose)?;
        if let Some(fragment) = fragment {
            if fragment.trim_start_matches('#').is_empty() {
                return Err(IdentityError::invalid_input("fragment", "must not be empty"));
            }
        }

        let mut document = self.resolve_document(document_id).await?;

        let temporary_id = format!("tmp-{}", Uuid::new_v4());
        let public_key = self
            .vault
            .create_key(&temporary_id, KeyAlgorithm::Ed25519)
            .await?;

        let mut jwk = Jwk::ed25519(base64::Engine::encode(
            &base64::engine::general_purpose::URL_SAFE_NO_PAD,
            &public_key,
        ));
        let fragment = match fragment {
            Some(fragment) => fragment.trim_start_matches('#').to_string(),
            None => crypto::jwk_thumbprint(&jwk)?,
        };
        jwk.kid = Some(fragment.clone());

        let method_id = qualify_fragment(document_id, &fragment);
        self.vault.rename_key(&temporary_id, &method_id).await?;

        let method = VerificationMethod {
            id: method_id.clone(),
            controller: document_id.to_string(),
            method_type: VERIFICATION_METHOD_TYPE_JWK.into(),
            public_key_jwk: Some(jwk),
        };

        document.insert_method(purpose, method.clone())?;
        self.store.set(document).await?;

        info!(
            document_id = %document_id,
            method_id = %method_id,
            purpose = %purpose,
            "Verification method added"
        );

        Ok(method)
    }

    /// Remove a method from its owning purpose array
    ///
    /// The underlying vault key is left in place; only the document
    /// loses the reference.
    pub async fn remove_verification_method(
        &self,
        document_id: &str,
        verification_method_id: &str,
    ) -> IdentityResult<()> {
        let mut document = self.resolve_document(document_id).await?;
        let removed = document.remove_method(verification_method_id)?;
        self.store.set(document).await?;

        info!(
            document_id = %document_id,
            method_id = %removed.id,
            "Verification method removed"
        );

        Ok(())
    }

    // =========================================================================
    // SERVICES
    // =========================================================================

    /// Add a service to the document, replacing any same-id entry
    pub async fn add_service(
        &self,
        document_id: &str,
        service: Service,
    ) -> IdentityResult<Service> {
        if service.id.is_empty() {
            return Err(IdentityError::invalid_input("service.id", "must not be empty"));
        }
        if service.service_type.is_empty() || service.service_endpoint.is_empty() {
            return Err(IdentityError::invalid_input(
                "service",
                "type and serviceEndpoint must not be empty",
            ));
        }

        let mut document = self.resolve_document(document_id).await?;
        let mut service = service;
        service.id = document.qualify(&service.id);
        document.insert_service(service.clone())?;
        self.store.set(document).await?;

        info!(document_id = %document_id, service_id = %service.id, "Service added");

        Ok(service)
    }

    /// Remove a service from the document
    pub async fn remove_service(&self, document_id: &str, service_id: &str) -> IdentityResult<()> {
        let mut document = self.resolve_document(document_id).await?;
        let removed = document.remove_service(service_id)?;
        self.store.set(document).await?;

        info!(
            document_id = %document_id,
            service_id = %removed.id,
            "Service removed"
        );

        Ok(())
    }

    // =========================================================================
    // VERIFIABLE CREDENTIALS
    // =========================================================================

    /// Issue a credential signed by the given verification method
    ///
    /// The issuer document is the DID part of the method id. When
    /// `revocation_index` is given, the credential carries a status
    /// entry pointing at the issuer's `#revocation` service; revocation
    /// state itself always lives on the issuer document, never in the
    /// credential.
    pub async fn create_verifiable_credential(
        &self,
        verification_method_id: &str,
        credential_id: Option<&str>,
        subject: CredentialSubject,
        revocation_index: Option<u32>,
    ) -> IdentityResult<CredentialIssuance> {
        let (issuer_id, _) = split_fragment(verification_method_id).ok_or_else(|| {
            IdentityError::invalid_input(
                "verificationMethodId",
                "must be a fully qualified did#fragment id",
            )
        })?;
        if subject.is_empty() {
            return Err(IdentityError::invalid_input(
                "subject",
                "must contain at least one claims object",
            ));
        }
        if let Some(index) = revocation_index {
            if index >= self.config.revocation_bitmap_size {
                return Err(IdentityError::RevocationIndexOutOfRange {
                    index,
                    size: self.config.revocation_bitmap_size,
                });
            }
        }

        let document = self.resolve_document(issuer_id).await?;
        let method = Self::method_on(&document, verification_method_id)?;
        let keypair = self.signing_keypair(method).await?;

        let credential_id = credential_id
            .map(str::to_string)
            .unwrap_or_else(|| format!("urn:uuid:{}", Uuid::new_v4()));

        let mut types = vec![CREDENTIAL_TYPE_BASE.to_string()];
        types.extend(subject.schema_types());

        let credential_status = revocation_index.map(|index| {
            CredentialStatus::new(
                qualify_fragment(issuer_id, REVOCATION_SERVICE_FRAGMENT),
                index,
            )
        });

        let mut claims = JwtClaims::new(issuer_id, Utc::now());
        claims.jti = Some(credential_id.clone());
        claims.sub = subject.first_id().map(str::to_string);
        claims.vc = Some(CredentialClaim {
            context: vec![self.config.credential_context.clone()],
            types: types.clone(),
            credential_subject: subject.clone(),
            credential_status: credential_status.clone(),
        });

        let credential = VerifiableCredential {
            context: vec![self.config.credential_context.clone()],
            id: Some(credential_id.clone()),
            types,
            credential_subject: subject,
            credential_status,
            issuer: issuer_id.to_string(),
            issuance_date: claims.nbf_datetime()?,
        };

        let token = jwt::encode(&JwtHeader::new(&method.id), &claims, &keypair)?;

        info!(
            issuer = %issuer_id,
            credential_id = %credential_id,
            revocation_index = ?revocation_index,
            "Verifiable credential issued"
        );

        Ok(CredentialIssuance {
            verifiable_credential: credential,
            jwt: token,
        })
    }

    /// Check a credential JWT against its issuer's current document
    ///
    /// Revocation is looked up live in the issuer's bitmap; a revoked
    /// credential is a normal `revoked: true` outcome with the body
    /// omitted. A signature that fails to verify is a hard error, never
    /// a revocation result.
    pub async fn check_verifiable_credential(
        &self,
        credential_jwt: &str,
    ) -> IdentityResult<CredentialVerification> {
        let decoded = jwt::decode(credential_jwt)?;
        let vc_claim = decoded
            .claims
            .vc
            .clone()
            .ok_or_else(|| IdentityError::MalformedJwt("missing vc claim".into()))?;
        let kid = decoded
            .header
            .kid
            .as_deref()
            .ok_or_else(|| IdentityError::MalformedJwt("missing kid header".into()))?;

        let issuer_document = self.resolve_document(&decoded.claims.iss).await?;
        let method = Self::method_on(&issuer_document, kid)?;
        let public_key = Self::method_public_key(method)?;

        if !jwt::verify_signature(&decoded, &public_key)? {
            return Err(IdentityError::InvalidSignature);
        }

        let credential = VerifiableCredential {
            context: vc_claim.context,
            id: decoded.claims.jti.clone(),
            types: vc_claim.types,
            credential_subject: vc_claim.credential_subject,
            credential_status: vc_claim.credential_status,
            issuer: decoded.claims.iss.clone(),
            issuance_date: decoded.claims.nbf_datetime()?,
        };

        if let Some(status) = &credential.credential_status {
            let index = status.index()?;
            if revocation::is_revoked(
                &issuer_document,
                index,
                self.config.revocation_bitmap_size,
            )? {
                debug!(
                    issuer = %credential.issuer,
                    index = index,
                    "Credential is revoked"
                );
                return Ok(CredentialVerification {
                    revoked: true,
                    verifiable_credential: None,
                });
            }
        }

        Ok(CredentialVerification {
            revoked: false,
            verifiable_credential: Some(credential),
        })
    }

    // =========================================================================
    // REVOCATION
    // =========================================================================

    async fn set_revocation_flags(
        &self,
        issuer_document_id: &str,
        credential_indices: &[u32],
        revoked: bool,
    ) -> IdentityResult<()> {
        if credential_indices.is_empty() {
            return Err(IdentityError::invalid_input(
                "credentialIndices",
                "must not be empty",
            ));
        }
        for &index in credential_indices {
            if index >= self.config.revocation_bitmap_size {
                return Err(IdentityError::RevocationIndexOutOfRange {
                    index,
                    size: self.config.revocation_bitmap_size,
                });
            }
        }

        let mut document = self.resolve_document(issuer_document_id).await?;
        let service = document.revocation_service().ok_or_else(|| {
            IdentityError::ServiceNotFound(qualify_fragment(
                issuer_document_id,
                REVOCATION_SERVICE_FRAGMENT,
            ))
        })?;

        let mut bitmap = revocation::decode_service_endpoint(
            &service.service_endpoint,
            self.config.revocation_bitmap_size,
        )?;
        for &index in credential_indices {
            if bitmap.get(index)? == revoked {
                warn!(
                    document_id = %issuer_document_id,
                    index = index,
                    revoked = revoked,
                    "Revocation bit already in requested state"
                );
            }
            bitmap.set(index, revoked)?;
        }

        document.insert_service(Service {
            id: qualify_fragment(issuer_document_id, REVOCATION_SERVICE_FRAGMENT),
            service_type: REVOCATION_SERVICE_TYPE.into(),
            service_endpoint: revocation::encode_service_endpoint(&bitmap)?,
        })?;
        self.store.set(document).await?;

        info!(
            document_id = %issuer_document_id,
            indices = ?credential_indices,
            revoked = revoked,
            "Revocation bitmap updated"
        );

        Ok(())
    }

    /// Mark the given credential indices revoked on the issuer document
    pub async fn revoke_verifiable_credentials(
        &self,
        issuer_document_id: &str,
        credential_indices: &[u32],
    ) -> IdentityResult<()> {
        self.set_revocation_flags(issuer_document_id, credential_indices, true)
            .await
    }

    /// Clear the given credential indices on the issuer document
    pub async fn unrevoke_verifiable_credentials(
        &self,
        issuer_document_id: &str,
        credential_indices: &[u32],
    ) -> IdentityResult<()> {
        self.set_revocation_flags(issuer_document_id, credential_indices, false)
            .await
    }

    // =========================================================================
    // VERIFIABLE PRESENTATIONS
    // =========================================================================

    /// Bundle credential JWTs into a presentation signed by the holder
    ///
    /// The embedded credentials are carried verbatim and not verified
    /// at this stage; that happens when the presentation is checked.
    pub async fn create_verifiable_presentation(
        &self,
        holder_document_id: &str,
        presentation_method_id: &str,
        types: Vec<String>,
        credential_jwts: Vec<String>,
        expires_in_minutes: Option<i64>,
    ) -> IdentityResult<PresentationIssuance> {
        if let Some(minutes) = expires_in_minutes {
            if minutes < 0 {
                return Err(IdentityError::invalid_input(
                    "expiresInMinutes",
                    "must be a non-negative integer",
                ));
            }
        }
        if credential_jwts.iter().any(String::is_empty) {
            return Err(IdentityError::invalid_input(
                "credentialJwts",
                "must not contain empty tokens",
            ));
        }

        let document = self.resolve_document(holder_document_id).await?;
        let method = Self::method_on(&document, presentation_method_id)?;
        let keypair = self.signing_keypair(method).await?;

        let mut presentation_types = vec![PRESENTATION_TYPE_BASE.to_string()];
        presentation_types.extend(types);

        let presentation = VerifiablePresentation {
            context: vec![self.config.credential_context.clone()],
            types: presentation_types,
            verifiable_credential: credential_jwts,
            holder: holder_document_id.to_string(),
        };

        let mut claims = JwtClaims::new(holder_document_id, Utc::now());
        claims.exp = expires_in_minutes.map(|minutes| claims.nbf + minutes * 60);
        claims.vp = Some(PresentationClaim {
            context: presentation.context.clone(),
            types: presentation.types.clone(),
            verifiable_credential: presentation.verifiable_credential.clone(),
        });

        let token = jwt::encode(&JwtHeader::new(&method.id), &claims, &keypair)?;

        info!(
            holder = %holder_document_id,
            credentials = presentation.verifiable_credential.len(),
            expires_in_minutes = ?expires_in_minutes,
            "Verifiable presentation created"
        );

        Ok(PresentationIssuance {
            verifiable_presentation: presentation,
            jwt: token,
        })
    }

    /// Check a presentation JWT and every credential embedded in it
    ///
    /// `revoked` is the logical OR over all embedded credentials;
    /// `issuers` collects each credential issuer's resolved document.
    /// Any signature failure anywhere is a hard error.
    pub async fn check_verifiable_presentation(
        &self,
        presentation_jwt: &str,
    ) -> IdentityResult<PresentationVerification> {
        let decoded = jwt::decode(presentation_jwt)?;
        let vp_claim = decoded
            .claims
            .vp
            .clone()
            .ok_or_else(|| IdentityError::MalformedJwt("missing vp claim".into()))?;
        let kid = decoded
            .header
            .kid
            .as_deref()
            .ok_or_else(|| IdentityError::MalformedJwt("missing kid header".into()))?;

        if let Some(exp) = decoded.claims.exp {
            if exp < Utc::now().timestamp() {
                let expired_at = chrono::DateTime::from_timestamp(exp, 0)
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_else(|| exp.to_string());
                return Err(IdentityError::PresentationExpired(expired_at));
            }
        }

        let holder_document = self.resolve_document(&decoded.claims.iss).await?;
        let holder_method = Self::method_on(&holder_document, kid)?;
        if !jwt::verify_signature(&decoded, &Self::method_public_key(holder_method)?)? {
            return Err(IdentityError::InvalidSignature);
        }

        let mut revoked = false;
        let mut issuers: Vec<DidDocument> = Vec::new();

        for credential_jwt in &vp_claim.verifiable_credential {
            let credential = jwt::decode(credential_jwt)?;
            let vc_claim = credential
                .claims
                .vc
                .as_ref()
                .ok_or_else(|| IdentityError::MalformedJwt("missing vc claim".into()))?;
            let credential_kid = credential
                .header
                .kid
                .as_deref()
                .ok_or_else(|| IdentityError::MalformedJwt("missing kid header".into()))?;

            let issuer_document = self.resolve_document(&credential.claims.iss).await?;
            let issuer_method = Self::method_on(&issuer_document, credential_kid)?;
            if !jwt::verify_signature(&credential, &Self::method_public_key(issuer_method)?)? {
                return Err(IdentityError::InvalidSignature);
            }

            if let Some(status) = &vc_claim.credential_status {
                revoked |= revocation::is_revoked(
                    &issuer_document,
                    status.index()?,
                    self.config.revocation_bitmap_size,
                )?;
            }

            if !issuers.iter().any(|known| known.id() == issuer_document.id()) {
                issuers.push(issuer_document);
            }
        }

        let presentation = VerifiablePresentation {
            context: vp_claim.context,
            types: vp_claim.types,
            verifiable_credential: vp_claim.verifiable_credential,
            holder: decoded.claims.iss.clone(),
        };

        Ok(PresentationVerification {
            revoked,
            verifiable_presentation: (!revoked).then_some(presentation),
            issuers: Some(issuers),
        })
    }

    // =========================================================================
    // RAW PROOFS
    // =========================================================================

    /// Sign caller-supplied bytes with a document's registered method
    pub async fn create_proof(
        &self,
        document_id: &str,
        verification_method_id: &str,
        bytes: &[u8],
    ) -> IdentityResult<Proof> {
        let document = self.resolve_document(document_id).await?;
        let method = Self::method_on(&document, verification_method_id)?;
        let keypair = self.signing_keypair(method).await?;

        let signature = keypair.sign(bytes)?;

        Ok(Proof {
            proof_type: PROOF_TYPE_ED25519.into(),
            value: base64::Engine::encode(
                &base64::engine::general_purpose::STANDARD,
                signature,
            ),
        })
    }

    /// Verify a raw signature against a document's registered method
    pub async fn verify_proof(
        &self,
        document_id: &str,
        verification_method_id: &str,
        bytes: &[u8],
        signature_type: &str,
        signature_value: &str,
    ) -> IdentityResult<bool> {
        if signature_type != PROOF_TYPE_ED25519 {
            return Err(IdentityError::invalid_input(
                "signatureType",
                format!("unsupported type '{}'", signature_type),
            ));
        }

        let document = self.resolve_document(document_id).await?;
        let method = Self::method_on(&document, verification_method_id)?;
        let public_key = Self::method_public_key(method)?;

        let signature = base64::Engine::decode(
            &base64::engine::general_purpose::STANDARD,
            signature_value,
        )
        .map_err(|e| IdentityError::invalid_input("signatureValue", e.to_string()))?;

        crypto::verify(&public_key, bytes, &signature)
    }
}
