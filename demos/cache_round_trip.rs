//! Build a tree with a partial cache over its top levels, save it to disk,
//! reload it, and use it to accelerate a streaming proof lookup.

use merkle_core::cache::{CacheConfig, PartialCache};
use merkle_core::streaming::{open_proof, SliceLeafSource};
use merkle_core::{pairing, MerkleTree, Sha256Algorithm};

fn main() {
    let leaves: Vec<Vec<u8>> = (0..30u32).map(|i| i.to_le_bytes().to_vec()).collect();
    let height = pairing::tree_height(leaves.len() as u64);
    let cache_config = CacheConfig::top_levels(height, 3);

    let tree = MerkleTree::build_with_cache(&leaves, Sha256Algorithm, Some(cache_config)).unwrap();
    let root = tree.root_hash().to_vec();

    let cache_path = std::env::temp_dir().join("merkle-core-demo-cache.bin");
    tree.save_cache(&cache_path).unwrap();

    let mut reloaded = PartialCache::load(&cache_path).unwrap();
    std::fs::remove_file(&cache_path).ok();

    let mut source = SliceLeafSource::new(&leaves);
    let proof = open_proof(&Sha256Algorithm, &mut source, 17, Some(&mut reloaded)).unwrap();

    println!("proof verifies: {}", proof.verify(&root, &Sha256Algorithm));
    println!("cache hit rate: {:.2}%", reloaded.stats().hit_rate());
}
