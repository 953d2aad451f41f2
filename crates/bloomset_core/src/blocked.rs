//! Cache-line blocked Bloom filter.
//!
//! A routing hash picks one 512-bit block per key; the key's k bits all land
//! in that block, so an insert or query touches a single 64-byte line.
use crate::consts::MAX_FILTER_BITS;
use crate::errors::{malformed, BloomError, Result};
use crate::filter::BasicFilter;
use crate::hash::{draw_seeds, route};
use crate::params::{compute_blocked_params, BlockedParams, FilterParams};
use rand::Rng;
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockedFilter {
    k: u32,
    blocks: Vec<BasicFilter>,
    routing_seed: u64,
}

impl BlockedFilter {
    pub fn new<R: Rng + ?Sized>(n: u64, p: f64, rng: &mut R) -> Result<Self> {
        Self::with_params(compute_blocked_params(n, p)?, rng)
    }

    pub fn with_params<R: Rng + ?Sized>(params: BlockedParams, rng: &mut R) -> Result<Self> {
        if params.blocks == 0 {
            return Err(BloomError::InvalidParameter("blocked filter needs at least one block".into()));
        }
        if params.block_bits.checked_mul(params.blocks).map_or(true, |t| t > MAX_FILTER_BITS) {
            return Err(BloomError::InvalidParameter(format!(
                "{} blocks of {} bits exceed {MAX_FILTER_BITS} bits",
                params.blocks, params.block_bits
            )));
        }
        let per_block = FilterParams { m_bits: params.block_bits, k: params.k };
        let mut taken = HashSet::new();
        let routing_seed = draw_seeds(rng, 1, &mut taken)[0];
        let blocks = (0..params.blocks)
            .map(|_| BasicFilter::with_taken_seeds(per_block, rng, &mut taken))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { k: per_block.k, blocks, routing_seed })
    }

    pub fn from_parts(routing_seed: u64, blocks: Vec<BasicFilter>) -> Result<Self> {
        let first = blocks.first().ok_or_else(|| malformed("blocked filter has no blocks"))?;
        let (m_bits, k) = (first.m_bits(), first.k());
        if blocks.iter().any(|b| b.m_bits() != m_bits || b.k() != k) {
            return Err(malformed("blocks disagree on (m, k)"));
        }
        if blocks.iter().any(|b| b.seeds().contains(&routing_seed)) {
            return Err(malformed("routing seed collides with a block seed"));
        }
        Ok(Self { k, blocks, routing_seed })
    }

    pub fn k(&self) -> u32 { self.k }
    pub fn routing_seed(&self) -> u64 { self.routing_seed }
    pub fn blocks(&self) -> &[BasicFilter] { &self.blocks }
    pub fn num_blocks(&self) -> usize { self.blocks.len() }
    pub fn block_bits(&self) -> u64 { self.blocks[0].m_bits() }
    pub fn total_bits(&self) -> u64 { self.block_bits() * self.blocks.len() as u64 }

    #[inline]
    fn block_for(&self, key: &[u8]) -> usize {
        route(key, self.routing_seed, self.blocks.len())
    }

    pub fn insert(&mut self, key: &[u8]) {
        let h = self.block_for(key);
        self.blocks[h].insert(key);
    }

    pub fn query(&self, key: &[u8]) -> bool {
        self.blocks[self.block_for(key)].query(key)
    }
}
