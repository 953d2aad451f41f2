//! Seeded xxh3 digests: one independent hash per seed, plus the block router.

use rand::Rng;
use std::collections::HashSet;

#[inline]
pub fn seeded_h64(key: &[u8], seed: u64) -> u64 {
    xxhash_rust::xxh3::xxh3_64_with_seed(key, seed)
}

/// Bit positions of `key` in an `m`-bit array, one per seed, in seed order.
#[inline]
pub fn khashes<'a>(key: &'a [u8], seeds: &'a [u64], m: u64) -> impl Iterator<Item = u64> + 'a {
    seeds.iter().map(move |&seed| seeded_h64(key, seed) % m)
}

/// Block index for `key` among `b` blocks.
#[inline]
pub fn route(key: &[u8], routing_seed: u64, b: usize) -> usize {
    (seeded_h64(key, routing_seed) % b as u64) as usize
}

/// Draws `count` seeds not already present in `taken`, recording each one.
pub fn draw_seeds<R: Rng + ?Sized>(rng: &mut R, count: usize, taken: &mut HashSet<u64>) -> Vec<u64> {
    let mut out = Vec::with_capacity(count);
    while out.len() < count {
        let seed: u64 = rng.random();
        if taken.insert(seed) {
            out.push(seed);
        }
    }
    out
}
