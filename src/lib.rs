//! merkle-core — deterministic Merkle tree construction, streaming builds,
//! and membership proof generation/verification over arbitrarily large leaf
//! sets.
//!
//! - [`hash`] — the `HashAlgorithm` trait plus SHA-256, SHA-512, and BLAKE3.
//! - [`pairing`] — level sizing, height, and sibling/orientation lookups.
//! - [`tree`] — the in-memory builder (`MerkleTree`).
//! - [`streaming`] — the O(1)-memory builder backed by scratch files.
//! - [`proof`] — membership proofs and their binary wire format.
//! - [`cache`] — the partial-tree cache and its binary wire format.
//!
//! Enable the `rayon` feature to parallelize leaf hashing in the in-memory
//! builder, and the `async` feature for a suspendable, cooperatively
//! cancellable streaming builder ([`streaming_async`]).

pub mod cache;
pub mod error;
pub mod hash;
pub mod pairing;
pub mod proof;
pub mod streaming;
pub mod tree;

#[cfg(feature = "async")]
pub mod streaming_async;

pub use cache::{CacheConfig, CacheStats, PartialCache};
pub use error::{MerkleError, MerkleResult};
pub use hash::{Blake3Algorithm, HashAlgorithm, Sha256Algorithm, Sha512Algorithm};
pub use proof::Proof;
pub use streaming::{BuildState, LeafSource, StreamingBuilder};
pub use tree::{MerkleTree, TreeMetadata};
