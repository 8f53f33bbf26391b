use merkle_core::cache::CacheConfig;
use merkle_core::streaming::{SliceLeafSource, StreamingBuilder};
use merkle_core::{Blake3Algorithm, MerkleTree, Sha256Algorithm};

#[test]
fn streaming_build_matches_in_memory_build_for_75_leaves() {
    let leaves: Vec<Vec<u8>> = (0..75u32).map(|i| i.to_le_bytes().to_vec()).collect();

    let in_memory = MerkleTree::build(&leaves, Sha256Algorithm).unwrap();

    let mut builder = StreamingBuilder::new(Sha256Algorithm).unwrap();
    let mut source = SliceLeafSource::new(&leaves);
    builder.push_all(&mut source).unwrap();
    let (root, metadata, _) = builder.finish(None).unwrap();

    assert_eq!(root, in_memory.root_hash());
    assert_eq!(metadata, in_memory.metadata());
}

#[test]
fn non_power_of_two_leaf_counts_agree_exhaustively() {
    for n in [3usize, 5, 7, 9, 11, 13, 15, 17, 19, 21] {
        let leaves: Vec<Vec<u8>> = (0..n).map(|i| vec![i as u8; 7]).collect();
        let in_memory = MerkleTree::build(&leaves, Blake3Algorithm).unwrap();

        let mut builder = StreamingBuilder::new(Blake3Algorithm).unwrap();
        let mut source = SliceLeafSource::new(&leaves);
        builder.push_all(&mut source).unwrap();
        let (root, _, _) = builder.finish(None).unwrap();

        assert_eq!(root, in_memory.root_hash(), "mismatch at n={n}");
    }
}

#[test]
fn streaming_cache_accelerates_proof_generation_and_tracks_hit_rate() {
    let leaves: Vec<Vec<u8>> = (0..40u32).map(|i| i.to_le_bytes().to_vec()).collect();
    let height = merkle_core::pairing::tree_height(leaves.len() as u64);
    let cache_config = CacheConfig::top_levels(height, 3);

    let mut builder = StreamingBuilder::new(Sha256Algorithm).unwrap();
    let mut source = SliceLeafSource::new(&leaves);
    builder.push_all(&mut source).unwrap();
    let (root, _metadata, cache) = builder.finish(Some(cache_config)).unwrap();
    let mut cache = cache.expect("cache was requested");

    for i in 0..leaves.len() as u64 {
        let mut source = SliceLeafSource::new(&leaves);
        let proof =
            merkle_core::streaming::open_proof(&Sha256Algorithm, &mut source, i, Some(&mut cache))
                .unwrap();
        assert!(proof.verify(&root, &Sha256Algorithm));
    }

    let stats = cache.stats();
    assert!(stats.total_lookups() > 0);
    assert!(stats.hits > 0, "cache should have been consulted for upper-level siblings");
}
