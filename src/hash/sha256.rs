//! SHA-256 hash algorithm, backed by the [`sha2`] crate.

use sha2::{Digest, Sha256};

use super::HashAlgorithm;

/// SHA-256, 32-byte digests.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Algorithm;

impl HashAlgorithm for Sha256Algorithm {
    #[inline]
    fn name(&self) -> &'static str {
        "SHA-256"
    }

    #[inline]
    fn digest_size(&self) -> usize {
        32
    }

    #[inline]
    fn hash(&self, bytes: &[u8]) -> Vec<u8> {
        let mut h = Sha256::new();
        h.update(bytes);
        h.finalize().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_matches_known_vector() {
        let got = Sha256Algorithm.hash(b"");
        let expect = hex_literal::hex!(
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(got.as_slice(), &expect[..]);
    }

    #[test]
    fn abc_matches_known_vector() {
        let got = Sha256Algorithm.hash(b"abc");
        let expect = hex_literal::hex!(
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(got.as_slice(), &expect[..]);
    }

    #[test]
    fn digest_size_matches_output_length() {
        assert_eq!(Sha256Algorithm.hash(b"x").len(), Sha256Algorithm.digest_size());
    }
}
