//! SHA-512 hash algorithm, backed by the [`sha2`] crate.

use sha2::{Digest, Sha512};

use super::HashAlgorithm;

/// SHA-512, 64-byte digests.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha512Algorithm;

impl HashAlgorithm for Sha512Algorithm {
    #[inline]
    fn name(&self) -> &'static str {
        "SHA-512"
    }

    #[inline]
    fn digest_size(&self) -> usize {
        64
    }

    #[inline]
    fn hash(&self, bytes: &[u8]) -> Vec<u8> {
        let mut h = Sha512::new();
        h.update(bytes);
        h.finalize().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_matches_known_vector() {
        let got = Sha512Algorithm.hash(b"");
        let expect = hex_literal::hex!(
            "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e"
        );
        assert_eq!(got.as_slice(), &expect[..]);
    }

    #[test]
    fn abc_matches_known_vector() {
        let got = Sha512Algorithm.hash(b"abc");
        let expect = hex_literal::hex!(
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
        );
        assert_eq!(got.as_slice(), &expect[..]);
    }

    #[test]
    fn digest_size_matches_output_length() {
        assert_eq!(Sha512Algorithm.hash(b"x").len(), Sha512Algorithm.digest_size());
    }
}
