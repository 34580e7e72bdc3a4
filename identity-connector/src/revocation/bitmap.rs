//! # Revocation Bitmap
//!
//! A dense, fixed-size bit index over credential revocation status.
//! Each bit position represents one credential: 1 means revoked,
//! 0 means active.
//!
//! ## How it works
//!
//! 1. The issuer's DID Document carries a service of type
//!    `RevocationBitmap2022` whose endpoint embeds this bitmap
//! 2. Each revocable credential records its bit position in
//!    `credentialStatus.revocationBitmapIndex`
//! 3. To revoke: set the bit and republish the document
//! 4. To verify: check the bit at the credential's index in the
//!    issuer's current bitmap
//!
//! The bitmap stays uncompressed in memory for O(1) bit access and is
//! zlib-compressed only when embedded into a document.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use thiserror::Error;

use shared::error::IdentityError;

/// Errors for bitmap codec and addressing operations
#[derive(Debug, Error)]
pub enum BitmapError {
    #[error("index {index} out of range (bitmap holds {size} bits)")]
    IndexOutOfRange { index: u32, size: u32 },

    #[error("compression failed: {0}")]
    Compression(String),

    #[error("decompression failed: {0}")]
    Decompression(String),

    #[error("decompressed to {actual} bytes, expected a {expected_bits}-bit bitmap")]
    LengthMismatch { actual: usize, expected_bits: u32 },
}

impl From<BitmapError> for IdentityError {
    fn from(err: BitmapError) -> Self {
        match err {
            BitmapError::IndexOutOfRange { index, size } => {
                IdentityError::RevocationIndexOutOfRange { index, size }
            }
            other => IdentityError::RevocationBitmap(other.to_string()),
        }
    }
}

/// Fixed-size bit array addressed by credential index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationBitmap {
    bits: Vec<u8>,
    size_bits: u32,
}

impl RevocationBitmap {
    /// Create an all-zero bitmap holding `size_bits` bits
    pub fn new(size_bits: u32) -> Self {
        Self {
            bits: vec![0u8; size_bits.div_ceil(8) as usize],
            size_bits,
        }
    }

    /// Number of addressable bits
    pub fn size_bits(&self) -> u32 {
        self.size_bits
    }

    fn check_index(&self, index: u32) -> Result<(usize, u8), BitmapError> {
        if index >= self.size_bits {
            return Err(BitmapError::IndexOutOfRange {
                index,
                size: self.size_bits,
            });
        }
        Ok(((index / 8) as usize, 1u8 << (index % 8)))
    }

    /// Set or clear the bit at `index`
    pub fn set(&mut self, index: u32, value: bool) -> Result<(), BitmapError> {
        let (byte, mask) = self.check_index(index)?;
        if value {
            self.bits[byte] |= mask;
        } else {
            self.bits[byte] &= !mask;
        }
        Ok(())
    }

    /// Read the bit at `index`
    pub fn get(&self, index: u32) -> Result<bool, BitmapError> {
        let (byte, mask) = self.check_index(index)?;
        Ok(self.bits[byte] & mask != 0)
    }

    /// Number of set (revoked) bits
    pub fn revoked_count(&self) -> u32 {
        self.bits.iter().map(|byte| byte.count_ones()).sum()
    }

    /// Compress the raw bit array with zlib
    pub fn to_compressed_bytes(&self) -> Result<Vec<u8>, BitmapError> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&self.bits)
            .map_err(|e| BitmapError::Compression(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| BitmapError::Compression(e.to_string()))
    }

    /// Rebuild a bitmap from zlib-compressed bytes
    ///
    /// Malformed input is a decode error, never a silently zeroed
    /// bitmap, and the decompressed length must match `size_bits`
    /// exactly.
    pub fn from_compressed_bytes(bytes: &[u8], size_bits: u32) -> Result<Self, BitmapError> {
        let mut decoder = ZlibDecoder::new(bytes);
        let mut bits = Vec::new();
        decoder
            .read_to_end(&mut bits)
            .map_err(|e| BitmapError::Decompression(e.to_string()))?;

        if bits.len() != size_bits.div_ceil(8) as usize {
            return Err(BitmapError::LengthMismatch {
                actual: bits.len(),
                expected_bits: size_bits,
            });
        }

        Ok(Self { bits, size_bits })
    }
}
