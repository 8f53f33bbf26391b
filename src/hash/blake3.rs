//! BLAKE3 hash algorithm, backed by the [`blake3`] crate.

use super::HashAlgorithm;

/// BLAKE3, 32-byte digests.
#[derive(Debug, Default, Clone, Copy)]
pub struct Blake3Algorithm;

impl HashAlgorithm for Blake3Algorithm {
    #[inline]
    fn name(&self) -> &'static str {
        "BLAKE3"
    }

    #[inline]
    fn digest_size(&self) -> usize {
        32
    }

    #[inline]
    fn hash(&self, bytes: &[u8]) -> Vec<u8> {
        ::blake3::hash(bytes).as_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_matches_known_vector() {
        let got = Blake3Algorithm.hash(b"");
        let expect = hex_literal::hex!(
            "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
        );
        assert_eq!(got.as_slice(), &expect[..]);
    }

    #[test]
    fn digest_size_matches_output_length() {
        assert_eq!(Blake3Algorithm.hash(b"x").len(), Blake3Algorithm.digest_size());
    }

    #[test]
    fn distinct_inputs_produce_distinct_digests() {
        assert_ne!(Blake3Algorithm.hash(b"left"), Blake3Algorithm.hash(b"right"));
    }
}
