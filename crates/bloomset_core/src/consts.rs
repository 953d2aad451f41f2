// crates/bloomset_core/src/consts.rs

pub const MAGIC_SNAP: &[u8; 4] = b"BLMS";
pub const VERSION: u16 = 1;

/// One cache line worth of bits; every block of a blocked filter is this wide.
pub const BLOCK_BITS: u64 = 512;

/// Upper bound on a filter's total bit budget (128 GiB of bit array).
pub const MAX_FILTER_BITS: u64 = 1 << 40;

pub const HDR_SIZE: usize = 32;
pub const CRC_SIZE: usize = 4;

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Basic = 1,   // single bit array
    Blocked = 2, // b cache-line blocks + routing seed
}

impl FilterKind {
    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            1 => Some(FilterKind::Basic),
            2 => Some(FilterKind::Blocked),
            _ => None,
        }
    }
}

impl std::fmt::Display for FilterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterKind::Basic => f.write_str("basic"),
            FilterKind::Blocked => f.write_str("blocked"),
        }
    }
}

const _: () = { assert!(BLOCK_BITS % 8 == 0); };
