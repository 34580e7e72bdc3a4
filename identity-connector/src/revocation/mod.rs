//! # Revocation Service Embedding
//!
//! The compressed revocation bitmap travels inside the issuer's DID
//! document, as a base64 data URL in the endpoint of the reserved
//! `#revocation` service. This module owns that embedding: building
//! the service for fresh documents, and extracting the live bitmap
//! from a resolved document during credential verification.

pub mod bitmap;

pub use bitmap::{BitmapError, RevocationBitmap};

use shared::constants::*;
use shared::document::{DidDocument, Service};
use shared::error::{IdentityError, IdentityResult};

/// Encode a bitmap as a data URL for a service endpoint
///
/// Format: `data:application/octet-stream;base64,<zlib bytes>`
pub fn encode_service_endpoint(bitmap: &RevocationBitmap) -> IdentityResult<String> {
    let compressed = bitmap.to_compressed_bytes()?;
    let encoded = base64::Engine::encode(
        &base64::engine::general_purpose::STANDARD,
        compressed,
    );
    Ok(format!("{}{}", REVOCATION_DATA_URL_PREFIX, encoded))
}

/// Decode a service-endpoint data URL back into a bitmap
pub fn decode_service_endpoint(endpoint: &str, size_bits: u32) -> IdentityResult<RevocationBitmap> {
    let encoded = endpoint.strip_prefix(REVOCATION_DATA_URL_PREFIX).ok_or_else(|| {
        IdentityError::RevocationBitmap("service endpoint is not a bitmap data URL".into())
    })?;

    let compressed = base64::Engine::decode(
        &base64::engine::general_purpose::STANDARD,
        encoded,
    )
    .map_err(|e| IdentityError::RevocationBitmap(e.to_string()))?;

    Ok(RevocationBitmap::from_compressed_bytes(&compressed, size_bits)?)
}

/// Build the reserved `#revocation` service with an all-zero bitmap
pub fn empty_revocation_service(document_id: &str, size_bits: u32) -> IdentityResult<Service> {
    let bitmap = RevocationBitmap::new(size_bits);
    Ok(Service {
        id: qualify_fragment(document_id, REVOCATION_SERVICE_FRAGMENT),
        service_type: REVOCATION_SERVICE_TYPE.into(),
        service_endpoint: encode_service_endpoint(&bitmap)?,
    })
}

/// Check a credential index against a resolved document's live bitmap
pub fn is_revoked(document: &DidDocument, index: u32, size_bits: u32) -> IdentityResult<bool> {
    let service = document.revocation_service().ok_or_else(|| {
        IdentityError::ServiceNotFound(qualify_fragment(
            document.id(),
            REVOCATION_SERVICE_FRAGMENT,
        ))
    })?;

    let bitmap = decode_service_endpoint(&service.service_endpoint, size_bits)?;
    Ok(bitmap.get(index)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: u32 = 1024;
    const DID: &str = "did:mem:0xissuer";

    #[test]
    fn test_endpoint_roundtrip() {
        let mut bitmap = RevocationBitmap::new(SIZE);
        bitmap.set(5, true).unwrap();
        bitmap.set(900, true).unwrap();

        let endpoint = encode_service_endpoint(&bitmap).unwrap();
        assert!(endpoint.starts_with(REVOCATION_DATA_URL_PREFIX));

        let decoded = decode_service_endpoint(&endpoint, SIZE).unwrap();
        assert_eq!(decoded, bitmap);
    }

    #[test]
    fn test_non_data_url_rejected() {
        assert!(decode_service_endpoint("https://example.com/status", SIZE).is_err());
    }

    #[test]
    fn test_garbage_base64_rejected() {
        let endpoint = format!("{}%%%", REVOCATION_DATA_URL_PREFIX);
        assert!(decode_service_endpoint(&endpoint, SIZE).is_err());
    }

    #[test]
    fn test_empty_revocation_service_shape() {
        let service = empty_revocation_service(DID, SIZE).unwrap();
        assert_eq!(service.id, format!("{}#{}", DID, REVOCATION_SERVICE_FRAGMENT));
        assert_eq!(service.service_type, REVOCATION_SERVICE_TYPE);

        let bitmap = decode_service_endpoint(&service.service_endpoint, SIZE).unwrap();
        assert_eq!(bitmap.revoked_count(), 0);
    }

    #[test]
    fn test_is_revoked_reads_document_service() {
        let mut document = DidDocument::new(DID);
        document
            .insert_service(empty_revocation_service(DID, SIZE).unwrap())
            .unwrap();
        assert!(!is_revoked(&document, 5, SIZE).unwrap());

        let mut bitmap = RevocationBitmap::new(SIZE);
        bitmap.set(5, true).unwrap();
        document
            .insert_service(Service {
                id: qualify_fragment(DID, REVOCATION_SERVICE_FRAGMENT),
                service_type: REVOCATION_SERVICE_TYPE.into(),
                service_endpoint: encode_service_endpoint(&bitmap).unwrap(),
            })
            .unwrap();

        assert!(is_revoked(&document, 5, SIZE).unwrap());
        assert!(!is_revoked(&document, 6, SIZE).unwrap());
    }

    #[test]
    fn test_is_revoked_without_service_fails() {
        let document = DidDocument::new(DID);
        assert!(matches!(
            is_revoked(&document, 0, SIZE),
            Err(IdentityError::ServiceNotFound(_))
        ));
    }
}
