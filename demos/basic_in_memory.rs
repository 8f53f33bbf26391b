//! Build a small tree in memory, print its root, and verify a proof.

use merkle_core::{MerkleTree, Sha256Algorithm};

fn main() {
    let leaves: Vec<Vec<u8>> = vec![
        b"invoice-1001".to_vec(),
        b"invoice-1002".to_vec(),
        b"invoice-1003".to_vec(),
        b"invoice-1004".to_vec(),
        b"invoice-1005".to_vec(),
    ];

    let tree = MerkleTree::build(&leaves, Sha256Algorithm).expect("non-empty leaf set");
    let metadata = tree.metadata();

    println!("root:  {}", hex(&metadata.root));
    println!("height: {}", metadata.height);
    println!("leaves: {}", metadata.leaf_count);

    let proof = tree.generate_proof(3).unwrap();
    let ok = proof.verify(&metadata.root, &Sha256Algorithm);
    println!("proof for leaf 3 verifies: {ok}");
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
