//! Bit-array size and hash-count derivation from (n, p).
//!
//!   m* = -n ln(p) / (ln 2)^2
//!   k  = argmin over { floor(m/n ln 2), ceil(m/n ln 2) } of (1 - e^{-kn/m})^k
//!
//! Basic filters round m* up to a whole byte, blocked filters to a whole
//! number of 512-bit blocks.

use crate::consts::{BLOCK_BITS, MAX_FILTER_BITS};
use crate::errors::{BloomError, Result};
use std::f64::consts::LN_2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterParams {
    pub m_bits: u64,
    pub k: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockedParams {
    pub block_bits: u64,
    pub blocks: u64,
    pub k: u32,
}

impl FilterParams {
    /// Theoretical false-positive rate once `n` keys are inserted.
    pub fn predicted_fpr(&self, n: u64) -> f64 {
        false_positive_rate(self.k, n as f64, self.m_bits as f64)
    }
}

impl BlockedParams {
    pub fn total_bits(&self) -> u64 {
        self.block_bits * self.blocks
    }

    /// Per-block formula at the mean load n/b. Block loads vary, so the
    /// observed rate of a blocked filter sits somewhat above this.
    pub fn predicted_fpr(&self, n: u64) -> f64 {
        false_positive_rate(self.k, n as f64 / self.blocks as f64, self.block_bits as f64)
    }
}

/// `(1 - e^{-k n / m})^k`
pub fn false_positive_rate(k: u32, n: f64, m: f64) -> f64 {
    (1.0 - (-(k as f64) * n / m).exp()).powi(k as i32)
}

fn validate(n: u64, p: f64) -> Result<()> {
    if n == 0 {
        return Err(BloomError::InvalidParameter("n must be positive".into()));
    }
    if !p.is_finite() || p <= 0.0 || p >= 1.0 {
        return Err(BloomError::InvalidParameter(format!(
            "false-positive rate {p} is outside (0, 1)"
        )));
    }
    Ok(())
}

/// Information-theoretic bit budget rounded up to a multiple of `granule`.
fn rounded_bits(n: u64, p: f64, granule: u64) -> Result<u64> {
    let ideal = -(n as f64) * p.ln() / (LN_2 * LN_2);
    let units = (ideal / granule as f64).ceil().max(1.0);
    if !units.is_finite() || units * granule as f64 > MAX_FILTER_BITS as f64 {
        return Err(BloomError::InvalidParameter(format!(
            "n={n}, p={p} needs more than {MAX_FILTER_BITS} bits"
        )));
    }
    Ok(units as u64 * granule)
}

/// Picks the better of the floor/ceil candidates for `m` bits holding `n` keys.
pub fn select_hash_count(m: f64, n: f64) -> u32 {
    let ideal = m / n * LN_2;
    let k1 = (ideal.floor() as u32).max(1);
    let k2 = (ideal.ceil() as u32).max(1);
    better_candidate(k1, k2, n, m)
}

/// Ties go to `k2`.
pub(crate) fn better_candidate(k1: u32, k2: u32, n: f64, m: f64) -> u32 {
    if false_positive_rate(k1, n, m) < false_positive_rate(k2, n, m) {
        k1
    } else {
        k2
    }
}

pub fn compute_params(n: u64, p: f64) -> Result<FilterParams> {
    validate(n, p)?;
    let m_bits = rounded_bits(n, p, 8)?;
    let k = select_hash_count(m_bits as f64, n as f64);
    tracing::debug!(n, p, m_bits, k, "derived basic filter parameters");
    Ok(FilterParams { m_bits, k })
}

pub fn compute_blocked_params(n: u64, p: f64) -> Result<BlockedParams> {
    validate(n, p)?;
    let total = rounded_bits(n, p, BLOCK_BITS)?;
    let blocks = total / BLOCK_BITS;
    let k = select_hash_count(BLOCK_BITS as f64, n as f64 / blocks as f64);
    tracing::debug!(n, p, blocks, k, "derived blocked filter parameters");
    Ok(BlockedParams { block_bits: BLOCK_BITS, blocks, k })
}
