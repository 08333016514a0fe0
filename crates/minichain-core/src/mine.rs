use crate::{pow::meets_difficulty, Block};
use rayon::prelude::*;
use tracing::info;

/// Alternate mining entry point: search the nonce space in parallel with
/// rayon instead of the sequential loop in [`Block::mine`]. Same difficulty
/// predicate, same blocking contract from the caller's point of view; only
/// the nonce that wins may differ between runs.
pub fn mine_block_parallel(mut block: Block, difficulty: u32) -> Block {
    let prefix = block.preimage_prefix();

    let found = (0u64..u64::MAX)
        .into_par_iter()
        .find_any(|nonce| meets_difficulty(&Block::hash_with_nonce(&prefix, *nonce), difficulty))
        .expect("nonce space exhausted (practically impossible)");

    block.apply_nonce(found);
    info!(
        nonce = found,
        hash = %block.hash_hex(),
        "sealed block via parallel nonce search"
    );
    block
}
