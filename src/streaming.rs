//! Streaming builder: construct a Merkle tree over a leaf source too large
//! to hold in memory, at O(1) peak memory, by spilling each level to a
//! scratch file and folding it down into the next.
//!
//! Scratch files are framed as repeated `u32 LE length + digest bytes`
//! records, one per node on that level. The builder only ever keeps the
//! current level's reader and the next level's writer open at once.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tempfile::TempDir;

use crate::cache::{CacheConfig, PartialCache};
use crate::error::{MerkleError, MerkleResult};
use crate::hash::HashAlgorithm;
use crate::pairing;
use crate::proof::Proof;
use crate::tree::TreeMetadata;

/// A restartable, blocking source of leaf bytes.
///
/// `next` returns `Ok(None)` once the source is exhausted. Implementors are
/// free to read from a file, a channel, a generator — anything that can
/// hand back owned bytes one leaf at a time.
pub trait LeafSource {
    fn next(&mut self) -> MerkleResult<Option<Vec<u8>>>;
}

/// Adapt an in-memory slice of leaves into a [`LeafSource`], for parity with
/// the in-memory builder and for tests.
pub struct SliceLeafSource<'a, L> {
    leaves: &'a [L],
    pos: usize,
}

impl<'a, L> SliceLeafSource<'a, L> {
    pub fn new(leaves: &'a [L]) -> Self {
        Self { leaves, pos: 0 }
    }
}

impl<'a, L: AsRef<[u8]>> LeafSource for SliceLeafSource<'a, L> {
    fn next(&mut self) -> MerkleResult<Option<Vec<u8>>> {
        if self.pos >= self.leaves.len() {
            return Ok(None);
        }
        let leaf = self.leaves[self.pos].as_ref().to_vec();
        self.pos += 1;
        Ok(Some(leaf))
    }
}

/// Where a [`StreamingBuilder`] currently sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    AcceptingLeaves,
    BuildingLevels(u32),
    Done,
}

/// Cooperative cancellation flag shared between a caller and a builder in
/// progress. Checked at each of the three suspension points: pulling the
/// next leaf, writing a frame, and reading a frame back.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Owns the scratch directory for a streaming build and guarantees its
/// removal on every exit path, success or error, via `Drop`.
struct ScratchDir(TempDir);

impl ScratchDir {
    fn new() -> MerkleResult<Self> {
        Ok(Self(tempfile::tempdir()?))
    }

    fn level_path(&self, level: u32) -> PathBuf {
        self.0.path().join(format!("level_{level}.bin"))
    }
}

// `TempDir::drop` already removes the directory tree; this impl exists so
// the intent (every exit path cleans up scratch storage) is explicit rather
// than relying on a reader noticing `TempDir`'s own documentation.
impl Drop for ScratchDir {
    fn drop(&mut self) {
        // Best-effort: a failure here must never shadow the caller's real
        // error, so it is discarded rather than propagated or logged.
        let _ = fs::remove_dir_all(self.0.path());
    }
}

/// Builds a tree level by level from a [`LeafSource`], spilling to disk.
pub struct StreamingBuilder<H: HashAlgorithm> {
    hash: H,
    scratch: ScratchDir,
    state: BuildState,
    leaf_count: u64,
    leaf_writer: Option<BufWriter<File>>,
    cancel: Option<CancelToken>,
}

impl<H: HashAlgorithm> StreamingBuilder<H> {
    pub fn new(hash: H) -> MerkleResult<Self> {
        Self::with_cancellation(hash, None)
    }

    pub fn with_cancellation(hash: H, cancel: Option<CancelToken>) -> MerkleResult<Self> {
        let scratch = ScratchDir::new()?;
        let leaf_writer = Some(BufWriter::new(File::create(scratch.level_path(0))?));
        Ok(Self {
            hash,
            scratch,
            state: BuildState::AcceptingLeaves,
            leaf_count: 0,
            leaf_writer,
            cancel,
        })
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    fn check_cancelled(&self) -> MerkleResult<()> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(MerkleError::Cancelled);
        }
        Ok(())
    }

    /// Hash and spill one leaf. Valid only while in [`BuildState::AcceptingLeaves`].
    pub fn push_leaf(&mut self, leaf: &[u8]) -> MerkleResult<()> {
        self.check_cancelled()?; // suspension point: pull next leaf

        if self.state != BuildState::AcceptingLeaves {
            return Err(MerkleError::InconsistentState(
                "cannot push a leaf after the build has moved past AcceptingLeaves".into(),
            ));
        }

        let digest = self.hash.hash(leaf);
        let writer = self.leaf_writer.as_mut().expect("leaf writer open while accepting leaves");
        write_frame(writer, &digest)?; // suspension point: write frame
        self.leaf_count += 1;
        Ok(())
    }

    /// Drain an entire [`LeafSource`] via repeated [`StreamingBuilder::push_leaf`] calls.
    pub fn push_all(&mut self, source: &mut dyn LeafSource) -> MerkleResult<()> {
        while let Some(leaf) = source.next()? {
            self.push_leaf(&leaf)?;
        }
        Ok(())
    }

    /// Fold every spilled level down to the root, optionally retaining a
    /// [`PartialCache`] over the levels named by `cache_config`.
    pub fn finish(
        mut self,
        cache_config: Option<CacheConfig>,
    ) -> MerkleResult<(Vec<u8>, TreeMetadata, Option<PartialCache>)> {
        if self.leaf_count == 0 {
            return Err(MerkleError::EmptyInput);
        }

        self.leaf_writer.take().expect("leaf writer present").flush()?;
        self.state = BuildState::BuildingLevels(0);

        let height = pairing::tree_height(self.leaf_count);
        let mut cache_levels: Vec<(u32, Vec<Vec<u8>>)> = Vec::new();

        if let Some(cfg) = cache_config {
            if cfg.end_level > height {
                return Err(MerkleError::InvalidArgument(
                    "cache end_level exceeds tree height".into(),
                ));
            }
        }

        let mut level = 0u32;
        loop {
            self.check_cancelled()?;
            self.state = BuildState::BuildingLevels(level);

            let level_len = pairing::level_size(self.leaf_count, level);
            maybe_capture_level(&mut cache_levels, cache_config, level, self.scratch.level_path(level))?;

            if level_len <= 1 {
                break;
            }

            fold_level(&self.hash, &self.scratch, level, level_len, self.cancel.as_ref())?;
            let _ = fs::remove_file(self.scratch.level_path(level));
            level += 1;
        }

        let root = read_single_digest(&self.scratch.level_path(level))?;
        self.state = BuildState::Done;

        let cache = match cache_config {
            Some(cfg) => {
                let levels: Vec<Vec<Vec<u8>>> = cache_levels.into_iter().map(|(_, v)| v).collect();
                Some(PartialCache::new(
                    self.hash.name().to_string(),
                    self.hash.digest_size(),
                    height,
                    self.leaf_count,
                    cfg.start_level,
                    cfg.end_level,
                    levels,
                )?)
            }
            None => None,
        };

        let metadata = TreeMetadata { root: root.clone(), height, leaf_count: self.leaf_count };
        Ok((root, metadata, cache))
    }
}

fn maybe_capture_level(
    cache_levels: &mut Vec<(u32, Vec<Vec<u8>>)>,
    cache_config: Option<CacheConfig>,
    level: u32,
    path: PathBuf,
) -> MerkleResult<()> {
    let Some(cfg) = cache_config else { return Ok(()) };
    if level < cfg.start_level || level > cfg.end_level {
        return Ok(());
    }
    let mut reader = BufReader::new(File::open(&path)?);
    let mut nodes = Vec::new();
    while let Some(digest) = read_frame(&mut reader)? {
        nodes.push(digest);
    }
    cache_levels.push((level, nodes));
    Ok(())
}

fn fold_level<H: HashAlgorithm>(
    hash: &H,
    scratch: &ScratchDir,
    level: u32,
    level_len: u64,
    cancel: Option<&CancelToken>,
) -> MerkleResult<()> {
    let mut reader = BufReader::new(File::open(scratch.level_path(level))?);
    let mut writer = BufWriter::new(File::create(scratch.level_path(level + 1))?);

    let mut remaining = level_len;
    while remaining > 0 {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(MerkleError::Cancelled);
        }

        let left = read_frame(&mut reader)? // suspension point: read frame
            .ok_or_else(|| MerkleError::InconsistentState("scratch file ended early".into()))?;
        let right = if remaining >= 2 {
            read_frame(&mut reader)?.ok_or_else(|| {
                MerkleError::InconsistentState("scratch file ended early".into())
            })?
        } else {
            left.clone()
        };

        let mut buf = Vec::with_capacity(left.len() + right.len());
        buf.extend_from_slice(&left);
        buf.extend_from_slice(&right);
        let parent = hash.hash(&buf);
        write_frame(&mut writer, &parent)?;

        remaining = remaining.saturating_sub(2);
        if remaining == 0 {
            break;
        }
    }

    writer.flush()?;
    Ok(())
}

fn read_single_digest(path: &Path) -> MerkleResult<Vec<u8>> {
    let mut reader = BufReader::new(File::open(path)?);
    read_frame(&mut reader)?.ok_or_else(|| {
        MerkleError::InconsistentState("expected exactly one digest at the root level".into())
    })
}

fn write_frame(w: &mut impl Write, digest: &[u8]) -> io::Result<()> {
    w.write_all(&(digest.len() as u32).to_le_bytes())?;
    w.write_all(digest)?;
    Ok(())
}

fn read_frame(r: &mut impl Read) -> io::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match r.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = u32::from_le_bytes(len_buf) as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(Some(buf))
}

/// Generate a membership proof from a leaf source, re-scanning it rather
/// than retaining the level-0 scratch file after a streaming build
/// completes. Consults `cache` for upper-level siblings when available,
/// falling back to folding the remaining levels from the rescanned leaves.
pub fn open_proof<H: HashAlgorithm>(
    hash: &H,
    source: &mut dyn LeafSource,
    leaf_index: u64,
    cache: Option<&mut PartialCache>,
) -> MerkleResult<Proof> {
    let mut leaves = Vec::new();
    while let Some(leaf) = source.next()? {
        leaves.push(leaf);
    }
    pairing::check_leaf_index(leaf_index, leaves.len() as u64)?;

    let mut level: Vec<Vec<u8>> = leaves.iter().map(|leaf| hash.hash(leaf)).collect();
    let leaf = level[leaf_index as usize].clone();
    let leaf_count = level.len() as u64;
    let height = pairing::tree_height(leaf_count);

    let mut siblings = Vec::with_capacity(height as usize);
    let mut sibling_is_right = Vec::with_capacity(height as usize);
    let mut index = leaf_index;
    let mut current_level = 0u32;
    let mut cache = cache;

    while level.len() > 1 {
        let level_len = level.len() as u64;
        let cached = match cache.as_mut() {
            Some(c) => c.get(current_level, index).map(|d| d.to_vec()),
            None => None,
        };

        let (sib_index, _is_duplicate, is_right) = pairing::sibling(level_len, index);
        let sibling = match cached {
            Some(d) => d,
            None => level[sib_index as usize].clone(),
        };
        siblings.push(sibling);
        sibling_is_right.push(is_right);

        level = fold_level_in_memory(hash, &level);
        index = pairing::parent_index(index);
        current_level += 1;
    }

    Ok(Proof { leaf, leaf_index, tree_height: height, siblings, sibling_is_right })
}

fn fold_level_in_memory<H: HashAlgorithm>(hash: &H, level: &[Vec<u8>]) -> Vec<Vec<u8>> {
    let mut parents = Vec::with_capacity((level.len() + 1) / 2);
    let mut i = 0;
    while i < level.len() {
        let left = &level[i];
        let right = if i + 1 < level.len() { &level[i + 1] } else { left };
        let mut buf = Vec::with_capacity(left.len() + right.len());
        buf.extend_from_slice(left);
        buf.extend_from_slice(right);
        parents.push(hash.hash(&buf));
        i += 2;
    }
    parents
}
