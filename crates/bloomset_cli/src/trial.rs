//! Randomized basic-vs-blocked comparison.
//!
//! Each trial draws n and a target rate, builds both filter kinds over the
//! same keys and probes three query mixes: unseen keys only, half inserted /
//! half unseen, and inserted keys only. Rates are reported as false-positive
//! (unseen, half-seen) or false-negative (seen) fractions, next to the mean
//! nanoseconds per query and the rate each variant's parameters predict.

use anyhow::{bail, Result};
use bloomset_core::{compute_blocked_params, compute_params, BasicFilter, BlockedFilter, Membership};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::hint::black_box;
use std::io::Write;
use std::time::Instant;

const KEY_LEN: usize = 5;

pub struct TrialConfig {
    pub trials: usize,
    pub min_n: usize,
    pub max_n: usize,
    pub min_fpr: f64,
    pub max_fpr: f64,
    pub queries: usize,
}

impl TrialConfig {
    fn validate(&self) -> Result<()> {
        if self.min_n == 0 || self.min_n > self.max_n {
            bail!("need 0 < min-n <= max-n, got {}..{}", self.min_n, self.max_n);
        }
        let in_range = |p: f64| p.is_finite() && p > 0.0 && p < 1.0;
        if !in_range(self.min_fpr) || !in_range(self.max_fpr) || self.min_fpr > self.max_fpr {
            bail!("need 0 < min-fpr <= max-fpr < 1, got {}..{}", self.min_fpr, self.max_fpr);
        }
        if self.queries == 0 {
            bail!("queries must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Probe {
    ns_per_query: f64,
    rate: f64,
}

fn probe<M: Membership>(filter: &M, keys: &[[u8; KEY_LEN]]) -> Probe {
    let start = Instant::now();
    let hits = keys.iter().filter(|k| filter.query(black_box(&k[..]))).count();
    let elapsed = start.elapsed();
    Probe {
        ns_per_query: elapsed.as_nanos() as f64 / keys.len() as f64,
        rate: hits as f64 / keys.len() as f64,
    }
}

/// Unseen, half-seen and seen probes, each rate turned into an error rate.
fn probe_all<M: Membership>(
    filter: &M,
    unseen: &[[u8; KEY_LEN]],
    half: &[[u8; KEY_LEN]],
    seen: &[[u8; KEY_LEN]],
) -> [Probe; 3] {
    let u = probe(filter, unseen);
    let h = probe(filter, half);
    let s = probe(filter, seen);
    [
        u,
        Probe { rate: (h.rate - 0.5) * 2.0, ..h },
        Probe { rate: 1.0 - s.rate, ..s },
    ]
}

/// Distinct printable-ASCII keys.
fn key_pool<R: Rng + ?Sized>(rng: &mut R, size: usize) -> Vec<[u8; KEY_LEN]> {
    let mut set = HashSet::with_capacity(size);
    while set.len() < size {
        let mut key = [0u8; KEY_LEN];
        for b in key.iter_mut() {
            *b = rng.random_range(b' '..=b'~');
        }
        set.insert(key);
    }
    set.into_iter().collect()
}

pub const CSV_HEADER: &str = "N,FPR,\
Basic predicted FPR,Blocked predicted FPR,\
Basic unseen time,Basic unseen FPR,\
Basic half-seen time,Basic half-seen FPR,\
Basic seen time,Basic seen FPR,\
Blocked unseen time,Blocked unseen FPR,\
Blocked half-seen time,Blocked half-seen FPR,\
Blocked seen time,Blocked seen FPR";

pub fn run<R: Rng + ?Sized, W: Write>(cfg: &TrialConfig, rng: &mut R, out: &mut W) -> Result<()> {
    cfg.validate()?;
    writeln!(out, "{CSV_HEADER}")?;

    // big enough for n inserted, n half-seen partners and the unseen probe set
    let mut pool = key_pool(rng, 2 * cfg.max_n + cfg.queries);
    for trial in 0..cfg.trials {
        let n = rng.random_range(cfg.min_n..=cfg.max_n);
        let fpr = rng.random_range(cfg.min_fpr..=cfg.max_fpr);
        pool.shuffle(rng);
        let (inserted, rest) = pool.split_at(n);

        let basic_params = compute_params(n as u64, fpr)?;
        let blocked_params = compute_blocked_params(n as u64, fpr)?;
        let mut basic = BasicFilter::with_params(basic_params, rng)?;
        let mut blocked = BlockedFilter::with_params(blocked_params, rng)?;
        for key in inserted {
            basic.insert(key);
            blocked.insert(key);
        }

        let unseen = &rest[..cfg.queries.min(rest.len())];
        let mut half: Vec<[u8; KEY_LEN]> = inserted.to_vec();
        half.extend_from_slice(&rest[..n]);

        let b = probe_all(&basic, unseen, &half, inserted);
        let bb = probe_all(&blocked, unseen, &half, inserted);
        tracing::info!(trial, n, fpr, basic = b[0].rate, blocked = bb[0].rate, "trial done");

        write!(
            out,
            "{n},{fpr},{},{}",
            basic_params.predicted_fpr(n as u64),
            blocked_params.predicted_fpr(n as u64)
        )?;
        for p in b.iter().chain(bb.iter()) {
            write!(out, ",{},{}", p.ns_per_query, p.rate)?;
        }
        writeln!(out)?;
    }
    Ok(())
}
