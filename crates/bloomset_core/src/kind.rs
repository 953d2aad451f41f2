use crate::blocked::BlockedFilter;
use crate::consts::FilterKind;
use crate::errors::Result;
use crate::filter::BasicFilter;
use rand::Rng;

/// Insert/query capability shared by every filter shape.
pub trait Membership {
    fn insert(&mut self, key: &[u8]);
    /// `false` means definitely absent; `true` means possibly present.
    fn query(&self, key: &[u8]) -> bool;
}

impl Membership for BasicFilter {
    fn insert(&mut self, key: &[u8]) { BasicFilter::insert(self, key) }
    fn query(&self, key: &[u8]) -> bool { BasicFilter::query(self, key) }
}

impl Membership for BlockedFilter {
    fn insert(&mut self, key: &[u8]) { BlockedFilter::insert(self, key) }
    fn query(&self, key: &[u8]) -> bool { BlockedFilter::query(self, key) }
}

/// A filter of either kind, as built by the CLI and stored in snapshots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Filter {
    Basic(BasicFilter),
    Blocked(BlockedFilter),
}

impl Filter {
    pub fn build<R: Rng + ?Sized>(kind: FilterKind, n: u64, p: f64, rng: &mut R) -> Result<Self> {
        Ok(match kind {
            FilterKind::Basic => Filter::Basic(BasicFilter::new(n, p, rng)?),
            FilterKind::Blocked => Filter::Blocked(BlockedFilter::new(n, p, rng)?),
        })
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            Filter::Basic(_) => FilterKind::Basic,
            Filter::Blocked(_) => FilterKind::Blocked,
        }
    }

    pub fn k(&self) -> u32 {
        match self {
            Filter::Basic(f) => f.k(),
            Filter::Blocked(f) => f.k(),
        }
    }

    pub fn total_bits(&self) -> u64 {
        match self {
            Filter::Basic(f) => f.m_bits(),
            Filter::Blocked(f) => f.total_bits(),
        }
    }

    pub fn info(&self) -> FilterInfo {
        let (blocks, block_bits, routing_seed) = match self {
            Filter::Basic(f) => (1, f.m_bits(), None),
            Filter::Blocked(f) => (f.num_blocks() as u64, f.block_bits(), Some(f.routing_seed())),
        };
        FilterInfo {
            kind: self.kind(),
            k: self.k(),
            blocks,
            block_bits,
            total_bits: self.total_bits(),
            routing_seed,
        }
    }
}

impl Membership for Filter {
    fn insert(&mut self, key: &[u8]) {
        match self {
            Filter::Basic(f) => f.insert(key),
            Filter::Blocked(f) => f.insert(key),
        }
    }

    fn query(&self, key: &[u8]) -> bool {
        match self {
            Filter::Basic(f) => f.query(key),
            Filter::Blocked(f) => f.query(key),
        }
    }
}

impl From<BasicFilter> for Filter {
    fn from(f: BasicFilter) -> Self { Filter::Basic(f) }
}

impl From<BlockedFilter> for Filter {
    fn from(f: BlockedFilter) -> Self { Filter::Blocked(f) }
}

/// Shape summary printed by `bf info`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FilterInfo {
    pub kind: FilterKind,
    pub k: u32,
    pub blocks: u64,
    pub block_bits: u64,
    pub total_bits: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_seed: Option<u64>,
}
