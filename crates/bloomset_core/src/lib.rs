pub mod consts;
pub mod errors;
pub mod utils;
pub mod params;
pub mod hash;
pub mod filter;
pub mod blocked;
pub mod kind;
pub mod snapshot;

pub use blocked::BlockedFilter;
pub use consts::FilterKind;
pub use errors::{BloomError, Result};
pub use filter::BasicFilter;
pub use kind::{Filter, FilterInfo, Membership};
pub use params::{compute_blocked_params, compute_params, false_positive_rate, BlockedParams, FilterParams};
pub use snapshot::{read_snapshot, write_snapshot};
