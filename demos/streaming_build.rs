//! Build a tree from a leaf source too large to want resident in memory,
//! using the streaming builder's scratch-file backed construction.

use merkle_core::streaming::{LeafSource, StreamingBuilder};
use merkle_core::{Blake3Algorithm, MerkleResult};

/// Produces `count` leaves on demand instead of holding them all at once.
struct CounterLeafSource {
    next: u64,
    count: u64,
}

impl LeafSource for CounterLeafSource {
    fn next(&mut self) -> MerkleResult<Option<Vec<u8>>> {
        if self.next >= self.count {
            return Ok(None);
        }
        let leaf = self.next.to_le_bytes().to_vec();
        self.next += 1;
        Ok(Some(leaf))
    }
}

fn main() -> MerkleResult<()> {
    let mut builder = StreamingBuilder::new(Blake3Algorithm)?;
    let mut source = CounterLeafSource { next: 0, count: 250_000 };
    builder.push_all(&mut source)?;

    let (root, metadata, _cache) = builder.finish(None)?;
    println!("streamed {} leaves, height {}", metadata.leaf_count, metadata.height);
    println!("root: {}", root.iter().map(|b| format!("{b:02x}")).collect::<String>());

    Ok(())
}
