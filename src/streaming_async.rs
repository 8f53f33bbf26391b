//! Async counterpart to [`crate::streaming`]: a leaf producer whose `next()`
//! may suspend (e.g. waiting on network or another task), with cooperative
//! cancellation via [`tokio_util::sync::CancellationToken`] checked at the
//! same three suspension points as the synchronous builder: pulling the
//! next leaf, writing a frame, and reading a frame back.
//!
//! The on-disk scratch format is identical to [`crate::streaming`]'s; only
//! the I/O driving it is async.

use std::path::PathBuf;

use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheConfig, PartialCache};
use crate::error::{MerkleError, MerkleResult};
use crate::hash::HashAlgorithm;
use crate::pairing;
use crate::streaming::BuildState;
use crate::tree::TreeMetadata;

/// An async, suspendable source of leaf bytes.
#[async_trait::async_trait]
pub trait AsyncLeafSource: Send {
    async fn next(&mut self) -> MerkleResult<Option<Vec<u8>>>;
}

struct AsyncScratchDir(PathBuf);

impl AsyncScratchDir {
    async fn new() -> MerkleResult<Self> {
        let dir = std::env::temp_dir().join(format!("merkle-core-{}", unique_suffix()));
        fs::create_dir_all(&dir).await?;
        Ok(Self(dir))
    }

    fn level_path(&self, level: u32) -> PathBuf {
        self.0.join(format!("level_{level}.bin"))
    }

    async fn remove(&self) {
        let _ = fs::remove_dir_all(&self.0).await;
    }
}

// Async drop doesn't exist, so this falls back to a blocking removal to
// guarantee cleanup on every exit path — including cancellation observed
// inside `push_all`, which never reaches `finish`'s explicit async
// `remove().await`. Best-effort: a failure here must never shadow the
// caller's real error, so it is discarded rather than propagated or logged.
impl Drop for AsyncScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn unique_suffix() -> u64 {
    // Per-process uniqueness is all that's needed here, so the allocator
    // address of a fresh box is a cheap, good-enough nonce.
    let boxed = Box::new(0u8);
    Box::into_raw(boxed) as u64
}

/// Async builder mirroring [`crate::streaming::StreamingBuilder`].
pub struct AsyncStreamingBuilder<H: HashAlgorithm> {
    hash: H,
    scratch: AsyncScratchDir,
    state: BuildState,
    leaf_count: u64,
    cancel: Option<CancellationToken>,
}

impl<H: HashAlgorithm> AsyncStreamingBuilder<H> {
    pub async fn new(hash: H, cancel: Option<CancellationToken>) -> MerkleResult<Self> {
        let scratch = AsyncScratchDir::new().await?;
        fs::File::create(scratch.level_path(0)).await?;
        Ok(Self { hash, scratch, state: BuildState::AcceptingLeaves, leaf_count: 0, cancel })
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    fn check_cancelled(&self) -> MerkleResult<()> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(MerkleError::Cancelled);
        }
        Ok(())
    }

    /// Drain `source` fully, hashing and spilling each leaf as it arrives.
    pub async fn push_all(&mut self, source: &mut dyn AsyncLeafSource) -> MerkleResult<()> {
        let mut writer = fs::OpenOptions::new()
            .append(true)
            .open(self.scratch.level_path(0))
            .await?;

        loop {
            self.check_cancelled()?; // suspension point: pull next leaf
            if self.state != BuildState::AcceptingLeaves {
                return Err(MerkleError::InconsistentState(
                    "cannot push a leaf after the build has moved past AcceptingLeaves".into(),
                ));
            }

            let Some(leaf) = source.next().await? else { break };

            let digest = self.hash.hash(&leaf);
            self.check_cancelled()?; // suspension point: write frame
            write_frame(&mut writer, &digest).await?;
            self.leaf_count += 1;
        }
        writer.flush().await?;
        Ok(())
    }

    /// Fold every spilled level down to the root, cleaning up scratch
    /// storage on every exit path.
    pub async fn finish(
        mut self,
        cache_config: Option<CacheConfig>,
    ) -> MerkleResult<(Vec<u8>, TreeMetadata, Option<PartialCache>)> {
        let result = self.finish_inner(cache_config).await;
        self.scratch.remove().await;
        result
    }

    async fn finish_inner(
        &mut self,
        cache_config: Option<CacheConfig>,
    ) -> MerkleResult<(Vec<u8>, TreeMetadata, Option<PartialCache>)> {
        if self.leaf_count == 0 {
            return Err(MerkleError::EmptyInput);
        }

        self.state = BuildState::BuildingLevels(0);
        let height = pairing::tree_height(self.leaf_count);

        if let Some(cfg) = cache_config {
            if cfg.end_level > height {
                return Err(MerkleError::InvalidArgument(
                    "cache end_level exceeds tree height".into(),
                ));
            }
        }

        let mut cache_levels: Vec<Vec<Vec<u8>>> = Vec::new();
        let mut level = 0u32;
        loop {
            self.check_cancelled()?;
            self.state = BuildState::BuildingLevels(level);

            let level_len = pairing::level_size(self.leaf_count, level);
            if let Some(cfg) = cache_config {
                if level >= cfg.start_level && level <= cfg.end_level {
                    cache_levels.push(read_level(self.scratch.level_path(level)).await?);
                }
            }

            if level_len <= 1 {
                break;
            }

            self.fold_level(level, level_len).await?;
            let _ = fs::remove_file(self.scratch.level_path(level)).await;
            level += 1;
        }

        let root = read_level(self.scratch.level_path(level))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MerkleError::InconsistentState("expected a root digest".into()))?;
        self.state = BuildState::Done;

        let cache = match cache_config {
            Some(cfg) => Some(PartialCache::new(
                self.hash.name().to_string(),
                self.hash.digest_size(),
                height,
                self.leaf_count,
                cfg.start_level,
                cfg.end_level,
                cache_levels,
            )?),
            None => None,
        };

        let metadata = TreeMetadata { root: root.clone(), height, leaf_count: self.leaf_count };
        Ok((root, metadata, cache))
    }

    async fn fold_level(&self, level: u32, level_len: u64) -> MerkleResult<()> {
        let nodes = read_level(self.scratch.level_path(level)).await?;
        let mut writer = fs::File::create(self.scratch.level_path(level + 1)).await?;

        let mut i = 0usize;
        while (i as u64) < level_len {
            self.check_cancelled()?; // suspension point: read frame (already materialized above)
            let left = &nodes[i];
            let right = if i + 1 < nodes.len() { &nodes[i + 1] } else { left };
            let mut buf = Vec::with_capacity(left.len() + right.len());
            buf.extend_from_slice(left);
            buf.extend_from_slice(right);
            let parent = self.hash.hash(&buf);
            write_frame(&mut writer, &parent).await?;
            i += 2;
        }
        writer.flush().await?;
        Ok(())
    }
}

async fn read_level(path: PathBuf) -> MerkleResult<Vec<Vec<u8>>> {
    let mut file = fs::File::open(path).await?;
    let mut nodes = Vec::new();
    loop {
        let mut len_buf = [0u8; 4];
        match file.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(MerkleError::Io(e)),
        }
        let len = u32::from_le_bytes(len_buf) as usize;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf).await?;
        nodes.push(buf);
    }
    Ok(nodes)
}

async fn write_frame(w: &mut fs::File, digest: &[u8]) -> MerkleResult<()> {
    w.write_all(&(digest.len() as u32).to_le_bytes()).await?;
    w.write_all(digest).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Sha256Algorithm;
    use crate::tree::MerkleTree;

    struct VecLeafSource {
        leaves: Vec<Vec<u8>>,
        pos: usize,
    }

    #[async_trait::async_trait]
    impl AsyncLeafSource for VecLeafSource {
        async fn next(&mut self) -> MerkleResult<Option<Vec<u8>>> {
            if self.pos >= self.leaves.len() {
                return Ok(None);
            }
            let leaf = self.leaves[self.pos].clone();
            self.pos += 1;
            Ok(Some(leaf))
        }
    }

    #[tokio::test]
    async fn matches_in_memory_build() {
        let leaves: Vec<Vec<u8>> = (0..13u8).map(|i| vec![i; 3]).collect();
        let in_memory = MerkleTree::build(&leaves, Sha256Algorithm).unwrap();

        let mut builder = AsyncStreamingBuilder::new(Sha256Algorithm, None).await.unwrap();
        let mut source = VecLeafSource { leaves: leaves.clone(), pos: 0 };
        builder.push_all(&mut source).await.unwrap();
        let (root, metadata, _) = builder.finish(None).await.unwrap();

        assert_eq!(root, in_memory.root_hash());
        assert_eq!(metadata.leaf_count, leaves.len() as u64);
    }

    #[tokio::test]
    async fn cancellation_is_observed() {
        let token = CancellationToken::new();
        token.cancel();
        let mut builder = AsyncStreamingBuilder::new(Sha256Algorithm, Some(token)).await.unwrap();
        let mut source = VecLeafSource { leaves: vec![b"x".to_vec()], pos: 0 };
        assert!(matches!(builder.push_all(&mut source).await, Err(MerkleError::Cancelled)));
    }

    #[tokio::test]
    async fn cancellation_still_removes_the_scratch_directory() {
        // Cancellation observed inside `push_all` never reaches `finish`'s
        // explicit `remove().await`; cleanup must happen anyway, via Drop.
        let token = CancellationToken::new();
        token.cancel();
        let builder = AsyncStreamingBuilder::new(Sha256Algorithm, Some(token)).await.unwrap();
        let scratch_path = builder.scratch.0.clone();
        assert!(scratch_path.exists());

        drop(builder);

        assert!(!scratch_path.exists());
    }
}
