use merkle_core::{Blake3Algorithm, MerkleTree, Sha256Algorithm, Sha512Algorithm};

#[test]
fn different_hash_algorithms_produce_different_roots_and_digest_sizes() {
    let leaves = [b"one".to_vec(), b"two".to_vec(), b"three".to_vec(), b"four".to_vec()];

    let sha256_tree = MerkleTree::build(&leaves, Sha256Algorithm).unwrap();
    let sha512_tree = MerkleTree::build(&leaves, Sha512Algorithm).unwrap();
    let blake3_tree = MerkleTree::build(&leaves, Blake3Algorithm).unwrap();

    assert_eq!(sha256_tree.root_hash().len(), 32);
    assert_eq!(sha512_tree.root_hash().len(), 64);
    assert_eq!(blake3_tree.root_hash().len(), 32);

    assert_ne!(sha256_tree.root_hash(), blake3_tree.root_hash());

    let proof = sha256_tree.generate_proof(2).unwrap();
    assert!(proof.verify(sha256_tree.root_hash(), &Sha256Algorithm));
    // A proof built under one algorithm must not verify against a tree root
    // built from the same leaves under a different algorithm.
    assert!(!proof.verify(sha512_tree.root_hash(), &Sha256Algorithm));
}

#[test]
fn proof_serialization_round_trip_preserves_verification() {
    let leaves: Vec<Vec<u8>> = (0..6u8).map(|i| vec![i; 2]).collect();
    let tree = MerkleTree::build(&leaves, Sha512Algorithm).unwrap();
    let root = tree.root_hash().to_vec();

    let proof = tree.generate_proof(4).unwrap();
    let bytes = proof.serialize();
    let decoded = merkle_core::Proof::deserialize(&bytes, Some(64)).unwrap();

    assert_eq!(proof, decoded);
    assert!(decoded.verify(&root, &Sha512Algorithm));
}
