//! # Cryptographic Primitives
//!
//! Hashing only. Signature verification belongs to the predicate running
//! on-chain; this crate never holds signer key material, it only produces
//! the digest signers sign and carries their signatures to the chain.

pub mod hash;

pub use hash::{sha256_array, Sha256Writer};
