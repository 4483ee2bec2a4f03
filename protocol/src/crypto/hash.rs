//! # Hashing Utilities
//!
//! The vault protocol uses exactly one hash function: SHA-256. It backs the
//! predicate address derivation, the transaction identity that signers sign,
//! and predicate code identifiers. The chain verifies the same digests
//! on-chain, so swapping the function here is a consensus-breaking change,
//! not a refactor.
//!
//! [`Sha256Writer`] is the streaming form used by the canonical encoders:
//! integers go in as 8-byte big-endian words and identifiers as raw 32
//! bytes, which is the layout the predicate reconstructs when it checks
//! a signature.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data.
///
/// # Example
///
/// ```
/// use quorum_vault::crypto::sha256_array;
///
/// let hash = sha256_array(b"vault");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256_array(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Incremental SHA-256 over a canonical word encoding.
///
/// Mirrors the encoder the on-chain predicate uses: every integer is a
/// big-endian `u64`, every identifier is its raw 32 bytes, and nothing is
/// length-prefixed. Callers are responsible for writing fields in a fixed
/// order.
#[derive(Default)]
pub struct Sha256Writer {
    hasher: Sha256,
    written: usize,
}

impl Sha256Writer {
    /// Starts an empty digest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a big-endian `u64` word.
    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Appends raw bytes verbatim.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.hasher.update(bytes);
        self.written += bytes.len();
        self
    }

    /// Number of bytes fed into the digest so far.
    pub fn len(&self) -> usize {
        self.written
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    /// Consumes the writer and returns the digest.
    pub fn finish(self) -> [u8; 32] {
        let result = self.hasher.finalize();
        let mut output = [0u8; 32];
        output.copy_from_slice(&result);
        output
    }
}
