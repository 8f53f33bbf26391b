//! Membership proofs: the sibling path from a leaf to the root, plus the
//! bit-exact binary encoding used to persist or transmit one.
//!
//! Wire format (`MPRF`), all integers little-endian:
//!
//! ```text
//! magic           4 bytes   "MPRF"
//! version         1 byte    1
//! leaf_index      8 bytes   u64
//! tree_height     4 bytes   u32
//! leaf_length     4 bytes   u32
//! leaf            N bytes
//! sibling_count   4 bytes   u32
//! siblings        repeated: length u32, digest bytes, orientation u8 (0=left, 1=right)
//! ```

use std::convert::TryInto;

use crate::error::{MerkleError, MerkleResult};
use crate::hash::HashAlgorithm;

const MAGIC: &[u8; 4] = b"MPRF";
const VERSION: u8 = 1;

/// A membership proof for a single leaf: the leaf bytes, its position, the
/// tree's height, and the sibling digest at every level from the leaf up to
/// the root, paired with which side each sibling sits on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    pub leaf: Vec<u8>,
    pub leaf_index: u64,
    pub tree_height: u32,
    pub siblings: Vec<Vec<u8>>,
    pub sibling_is_right: Vec<bool>,
}

impl Proof {
    /// Recompute the root implied by this proof and compare against `root`.
    pub fn verify(&self, root: &[u8], hash: &dyn HashAlgorithm) -> bool {
        if self.siblings.len() != self.tree_height as usize
            || self.sibling_is_right.len() != self.tree_height as usize
        {
            return false;
        }

        let mut current = hash.hash(&self.leaf);
        for (sibling, is_right) in self.siblings.iter().zip(self.sibling_is_right.iter()) {
            if sibling.len() != hash.digest_size() {
                return false;
            }
            let mut buf = Vec::with_capacity(current.len() + sibling.len());
            if *is_right {
                buf.extend_from_slice(&current);
                buf.extend_from_slice(sibling);
            } else {
                buf.extend_from_slice(sibling);
                buf.extend_from_slice(&current);
            }
            current = hash.hash(&buf);
        }

        current == root
    }

    /// Encode this proof using the `MPRF` wire format.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.push(VERSION);
        out.extend_from_slice(&self.leaf_index.to_le_bytes());
        out.extend_from_slice(&self.tree_height.to_le_bytes());
        out.extend_from_slice(&(self.leaf.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.leaf);
        out.extend_from_slice(&(self.siblings.len() as u32).to_le_bytes());
        for (sibling, is_right) in self.siblings.iter().zip(self.sibling_is_right.iter()) {
            out.extend_from_slice(&(sibling.len() as u32).to_le_bytes());
            out.extend_from_slice(sibling);
            out.push(if *is_right { 1 } else { 0 });
        }
        out
    }

    /// Decode a proof previously written by [`Proof::serialize`].
    ///
    /// `expected_digest_size`, when given, rejects any sibling whose encoded
    /// length does not match the hash algorithm the caller intends to verify
    /// against, instead of silently accepting a malformed-but-parseable proof.
    pub fn deserialize(bytes: &[u8], expected_digest_size: Option<usize>) -> MerkleResult<Self> {
        let mut r = Reader::new(bytes);

        let magic = r.take(4)?;
        if magic != MAGIC {
            return Err(MerkleError::FormatMismatch("bad proof magic".into()));
        }
        let version = r.u8()?;
        if version != VERSION {
            return Err(MerkleError::FormatMismatch(format!(
                "unsupported proof version: {version}"
            )));
        }

        let leaf_index = r.u64()?;
        let tree_height = r.u32()?;
        let leaf_len = r.u32()? as usize;
        let leaf = r.take(leaf_len)?.to_vec();

        let sibling_count = r.u32()?;
        let mut siblings = Vec::with_capacity(sibling_count as usize);
        let mut sibling_is_right = Vec::with_capacity(sibling_count as usize);
        for _ in 0..sibling_count {
            let len = r.u32()? as usize;
            if let Some(expected) = expected_digest_size {
                if len != expected {
                    return Err(MerkleError::FormatMismatch(format!(
                        "sibling length {len} does not match digest size {expected}"
                    )));
                }
            }
            let digest = r.take(len)?.to_vec();
            let orientation = r.u8()?;
            let is_right = match orientation {
                0 => false,
                1 => true,
                other => {
                    return Err(MerkleError::FormatMismatch(format!(
                        "invalid orientation byte: {other}"
                    )))
                }
            };
            siblings.push(digest);
            sibling_is_right.push(is_right);
        }

        if sibling_count != tree_height {
            return Err(MerkleError::FormatMismatch(
                "sibling_count does not match tree_height".into(),
            ));
        }

        r.expect_exhausted()?;

        Ok(Proof {
            leaf,
            leaf_index,
            tree_height,
            siblings,
            sibling_is_right,
        })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> MerkleResult<&'a [u8]> {
        if self.pos + n > self.bytes.len() {
            return Err(MerkleError::FormatMismatch("unexpected end of proof bytes".into()));
        }
        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u8(&mut self) -> MerkleResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> MerkleResult<u32> {
        let b: [u8; 4] = self.take(4)?.try_into().unwrap();
        Ok(u32::from_le_bytes(b))
    }

    fn u64(&mut self) -> MerkleResult<u64> {
        let b: [u8; 8] = self.take(8)?.try_into().unwrap();
        Ok(u64::from_le_bytes(b))
    }

    fn expect_exhausted(&self) -> MerkleResult<()> {
        if self.pos != self.bytes.len() {
            return Err(MerkleError::FormatMismatch("trailing bytes after proof".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Sha256Algorithm;

    fn sample_proof() -> Proof {
        let h = Sha256Algorithm;
        Proof {
            leaf: b"leaf-data".to_vec(),
            leaf_index: 2,
            tree_height: 2,
            siblings: vec![h.hash(b"sib0"), h.hash(b"sib1")],
            sibling_is_right: vec![true, false],
        }
    }

    #[test]
    fn round_trips_through_wire_format() {
        let proof = sample_proof();
        let bytes = proof.serialize();
        let decoded = Proof::deserialize(&bytes, Some(32)).unwrap();
        assert_eq!(proof, decoded);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = sample_proof().serialize();
        bytes[0] = b'X';
        assert!(Proof::deserialize(&bytes, None).is_err());
    }

    #[test]
    fn rejects_mismatched_digest_size() {
        let bytes = sample_proof().serialize();
        assert!(Proof::deserialize(&bytes, Some(64)).is_err());
    }

    #[test]
    fn rejects_trailing_garbage() {
        let mut bytes = sample_proof().serialize();
        bytes.push(0xFF);
        assert!(Proof::deserialize(&bytes, None).is_err());
    }

    #[test]
    fn verify_accepts_correct_root_and_rejects_tampering() {
        let h = Sha256Algorithm;
        let leaf = b"only-leaf".to_vec();
        let root = h.hash(&leaf);
        let proof = Proof {
            leaf: leaf.clone(),
            leaf_index: 0,
            tree_height: 0,
            siblings: vec![],
            sibling_is_right: vec![],
        };
        assert!(proof.verify(&root, &h));

        let mut bad_root = root.clone();
        bad_root[0] ^= 0xFF;
        assert!(!proof.verify(&bad_root, &h));
    }
}
