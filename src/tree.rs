//! In-memory Merkle tree: builds every level up front and keeps it resident,
//! trading memory for O(1) proof generation against any leaf.
//!
//! Levels are stored as a flat-per-level arena (`Vec<Vec<Vec<u8>>>`, outer
//! index is the level, inner `Vec<u8>` is a digest) rather than a
//! pointer-linked node graph: it is cheaper to allocate, trivially sliceable
//! into a [`PartialCache`], and every level is already the exact shape the
//! cache and streaming builder both want.

use crate::cache::{CacheConfig, PartialCache};
use crate::error::{MerkleError, MerkleResult};
use crate::hash::HashAlgorithm;
use crate::pairing;
use crate::proof::Proof;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Root digest, height, and leaf count of a built tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeMetadata {
    pub root: Vec<u8>,
    pub height: u32,
    pub leaf_count: u64,
}

/// A fully materialized Merkle tree over a fixed leaf set.
pub struct MerkleTree<H: HashAlgorithm> {
    hash: H,
    /// `levels[0]` is the leaf digests; `levels[levels.len() - 1]` is `[root]`.
    levels: Vec<Vec<Vec<u8>>>,
    leaf_count: u64,
    cache: Option<PartialCache>,
}

impl<H: HashAlgorithm> MerkleTree<H> {
    /// Build a tree over `leaves` using `hash`, with no cache retained.
    pub fn build<L: AsRef<[u8]>>(leaves: &[L], hash: H) -> MerkleResult<Self> {
        Self::build_with_cache(leaves, hash, None)
    }

    /// Build a tree and optionally retain a [`PartialCache`] over the levels
    /// named by `cache_config`.
    pub fn build_with_cache<L: AsRef<[u8]>>(
        leaves: &[L],
        hash: H,
        cache_config: Option<CacheConfig>,
    ) -> MerkleResult<Self> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyInput);
        }

        let leaf_digests = hash_leaves(&hash, leaves);
        let levels = build_levels(&hash, leaf_digests);
        let leaf_count = leaves.len() as u64;
        let height = pairing::tree_height(leaf_count);

        let cache = match cache_config {
            Some(cfg) => Some(build_cache(&hash, &levels, leaf_count, height, cfg)?),
            None => None,
        };

        Ok(Self { hash, levels, leaf_count, cache })
    }

    pub fn hash_algorithm(&self) -> &H {
        &self.hash
    }

    pub fn root_hash(&self) -> &[u8] {
        &self.levels.last().expect("a built tree always has a root level")[0]
    }

    pub fn metadata(&self) -> TreeMetadata {
        TreeMetadata {
            root: self.root_hash().to_vec(),
            height: (self.levels.len() - 1) as u32,
            leaf_count: self.leaf_count,
        }
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    pub fn cache(&self) -> Option<&PartialCache> {
        self.cache.as_ref()
    }

    pub fn cache_mut(&mut self) -> Option<&mut PartialCache> {
        self.cache.as_mut()
    }

    pub fn save_cache(&self, path: impl AsRef<std::path::Path>) -> MerkleResult<()> {
        let cache = self
            .cache
            .as_ref()
            .ok_or_else(|| MerkleError::InconsistentState("tree has no cache to save".into()))?;
        cache.save(path)
    }

    /// Build the membership proof for `leaf_index`.
    pub fn generate_proof(&self, leaf_index: u64) -> MerkleResult<Proof> {
        pairing::check_leaf_index(leaf_index, self.leaf_count)?;

        let height = (self.levels.len() - 1) as u32;
        let leaf = self.levels[0][leaf_index as usize].clone();

        let mut siblings = Vec::with_capacity(height as usize);
        let mut sibling_is_right = Vec::with_capacity(height as usize);
        let mut index = leaf_index;

        for level in 0..height {
            let level_len = self.levels[level as usize].len() as u64;
            let (sib_index, _is_duplicate, is_right) = pairing::sibling(level_len, index);
            siblings.push(self.levels[level as usize][sib_index as usize].clone());
            sibling_is_right.push(is_right);
            index = pairing::parent_index(index);
        }

        Ok(Proof {
            leaf,
            leaf_index,
            tree_height: height,
            siblings,
            sibling_is_right,
        })
    }
}

fn hash_leaves<H: HashAlgorithm, L: AsRef<[u8]>>(hash: &H, leaves: &[L]) -> Vec<Vec<u8>> {
    #[cfg(feature = "rayon")]
    {
        leaves.par_iter().map(|leaf| hash.hash(leaf.as_ref())).collect()
    }

    #[cfg(not(feature = "rayon"))]
    {
        leaves.iter().map(|leaf| hash.hash(leaf.as_ref())).collect()
    }
}

/// Note: the leaf digests passed in here are already `H(leaf_bytes)` — this
/// function only ever combines digests, which is why the leaf level (level
/// 0) is produced by [`hash_leaves`] before this is called.
fn build_levels<H: HashAlgorithm>(hash: &H, leaf_digests: Vec<Vec<u8>>) -> Vec<Vec<Vec<u8>>> {
    let mut levels = vec![leaf_digests];

    while levels.last().unwrap().len() > 1 {
        let current = levels.last().unwrap();
        let next = next_layer(hash, current);
        levels.push(next);
    }

    levels
}

fn next_layer<H: HashAlgorithm>(hash: &H, level: &[Vec<u8>]) -> Vec<Vec<u8>> {
    let parent_count = (level.len() + 1) / 2;
    let mut parents = Vec::with_capacity(parent_count);

    let mut i = 0;
    while i < level.len() {
        let left = &level[i];
        let right = if i + 1 < level.len() { &level[i + 1] } else { left };
        parents.push(parent_digest(hash, left, right));
        i += 2;
    }

    parents
}

fn parent_digest<H: HashAlgorithm>(hash: &H, left: &[u8], right: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(left.len() + right.len());
    buf.extend_from_slice(left);
    buf.extend_from_slice(right);
    hash.hash(&buf)
}

fn build_cache<H: HashAlgorithm>(
    hash: &H,
    levels: &[Vec<Vec<u8>>],
    leaf_count: u64,
    height: u32,
    cfg: CacheConfig,
) -> MerkleResult<PartialCache> {
    if cfg.end_level as usize >= levels.len() {
        return Err(MerkleError::InvalidArgument(
            "cache end_level exceeds tree height".into(),
        ));
    }
    let slice = levels[cfg.start_level as usize..=cfg.end_level as usize].to_vec();
    PartialCache::new(
        hash.name().to_string(),
        hash.digest_size(),
        height,
        leaf_count,
        cfg.start_level,
        cfg.end_level,
        slice,
    )
}
