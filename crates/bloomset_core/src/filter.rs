//! Single-array Bloom filter with k independently seeded hashes.
use crate::consts::MAX_FILTER_BITS;
use crate::errors::{malformed, BloomError, Result};
use crate::hash::{draw_seeds, khashes};
use crate::params::{compute_params, FilterParams};
use rand::Rng;
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicFilter {
    m_bits: u64,
    seeds: Vec<u64>,
    bits: Vec<u8>,
}

impl BasicFilter {
    /// Sized for `n` keys at false-positive rate `p`.
    pub fn new<R: Rng + ?Sized>(n: u64, p: f64, rng: &mut R) -> Result<Self> {
        Self::with_params(compute_params(n, p)?, rng)
    }

    /// Hand-picked parameters; `m_bits` must be a positive multiple of 8 and `k >= 1`.
    pub fn with_params<R: Rng + ?Sized>(params: FilterParams, rng: &mut R) -> Result<Self> {
        Self::with_taken_seeds(params, rng, &mut HashSet::new())
    }

    /// Used by the blocked filter so seeds stay distinct across its blocks and router.
    pub(crate) fn with_taken_seeds<R: Rng + ?Sized>(
        params: FilterParams,
        rng: &mut R,
        taken: &mut HashSet<u64>,
    ) -> Result<Self> {
        let FilterParams { m_bits, k } = params;
        if m_bits == 0 || m_bits % 8 != 0 || m_bits > MAX_FILTER_BITS {
            return Err(BloomError::InvalidParameter(format!(
                "m={m_bits} is not a positive multiple of 8 within {MAX_FILTER_BITS} bits"
            )));
        }
        if k == 0 {
            return Err(BloomError::InvalidParameter("k must be at least 1".into()));
        }
        let seeds = draw_seeds(rng, k as usize, taken);
        Ok(Self { m_bits, seeds, bits: vec![0u8; (m_bits / 8) as usize] })
    }

    /// Rebuilds a filter from persisted state without re-deriving anything.
    pub fn from_parts(m_bits: u64, seeds: Vec<u64>, bits: Vec<u8>) -> Result<Self> {
        if m_bits == 0 || m_bits % 8 != 0 {
            return Err(malformed(format!("m={m_bits} is not a positive multiple of 8")));
        }
        if seeds.is_empty() {
            return Err(malformed("filter has no seeds"));
        }
        if bits.len() as u64 != m_bits / 8 {
            return Err(malformed(format!(
                "bit array holds {} bytes, m={m_bits} needs {}",
                bits.len(),
                m_bits / 8
            )));
        }
        let distinct: HashSet<u64> = seeds.iter().copied().collect();
        if distinct.len() != seeds.len() {
            return Err(malformed("duplicate hash seeds"));
        }
        Ok(Self { m_bits, seeds, bits })
    }

    pub fn m_bits(&self) -> u64 { self.m_bits }
    pub fn k(&self) -> u32 { self.seeds.len() as u32 }
    pub fn seeds(&self) -> &[u64] { &self.seeds }
    pub fn bits(&self) -> &[u8] { &self.bits }

    pub fn insert(&mut self, key: &[u8]) {
        for bit in khashes(key, &self.seeds, self.m_bits) {
            let idx = (bit / 8) as usize; let off = (bit & 7) as u8;
            self.bits[idx] |= 1u8 << off;
        }
    }

    pub fn query(&self, key: &[u8]) -> bool {
        khashes(key, &self.seeds, self.m_bits).all(|bit| {
            let idx = (bit / 8) as usize; let off = (bit & 7) as u8;
            (self.bits[idx] & (1u8 << off)) != 0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn filter(n: u64, p: f64, seed: u64) -> BasicFilter {
        BasicFilter::new(n, p, &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn shape_follows_params() {
        let f = filter(1000, 0.01, 1);
        assert_eq!(f.m_bits(), 9592);
        assert_eq!(f.k(), 7);
        assert_eq!(f.seeds().len(), 7);
        assert_eq!(f.bits().len(), 9592 / 8);
        assert!(f.bits().iter().all(|&b| b == 0));
    }

    #[test]
    fn empty_filter_rejects_everything() {
        let f = filter(100, 0.05, 2);
        assert!(!f.query(b""));
        assert!(!f.query(b"x"));
    }

    #[test]
    fn no_false_negatives_including_edge_keys() {
        let mut f = filter(500, 0.01, 3);
        let long = vec![0xabu8; 64 * 1024];
        f.insert(b"");
        f.insert(&long);
        for i in 0..500u32 {
            f.insert(format!("key-{i}").as_bytes());
        }
        assert!(f.query(b""));
        assert!(f.query(&long));
        for i in 0..500u32 {
            assert!(f.query(format!("key-{i}").as_bytes()));
        }
    }

    #[test]
    fn insert_sets_at_most_k_bits() {
        let mut f = filter(100, 0.05, 4);
        f.insert(b"solo");
        let ones: u32 = f.bits().iter().map(|b| b.count_ones()).sum();
        assert!(ones >= 1 && ones <= f.k());
    }

    #[test]
    fn insert_is_idempotent() {
        let mut once = filter(200, 0.02, 5);
        let mut twice = once.clone();
        once.insert(b"dup");
        twice.insert(b"dup");
        twice.insert(b"dup");
        assert_eq!(once.bits(), twice.bits());
    }

    #[test]
    fn same_seed_same_bits() {
        let mut a = filter(300, 0.01, 42);
        let mut b = filter(300, 0.01, 42);
        assert_eq!(a.seeds(), b.seeds());
        for i in 0..300u32 {
            a.insert(&i.to_be_bytes());
            b.insert(&i.to_be_bytes());
        }
        assert_eq!(a, b);

        let c = filter(300, 0.01, 43);
        assert_ne!(a.seeds(), c.seeds());
    }

    #[test]
    fn with_params_rejects_bad_shapes() {
        let mut rng = StdRng::seed_from_u64(8);
        for params in [
            FilterParams { m_bits: 12, k: 8 },
            FilterParams { m_bits: 0, k: 3 },
            FilterParams { m_bits: 64, k: 0 },
            FilterParams { m_bits: MAX_FILTER_BITS + 8, k: 3 },
        ] {
            assert!(matches!(
                BasicFilter::with_params(params, &mut rng),
                Err(BloomError::InvalidParameter(_))
            ));
        }
        let ok = BasicFilter::with_params(FilterParams { m_bits: 16, k: 2 }, &mut rng).unwrap();
        assert_eq!(ok.bits().len(), 2);
        assert_eq!(ok.k(), 2);
    }

    #[test]
    fn from_parts_roundtrip_and_rejects() {
        let mut f = filter(50, 0.1, 6);
        f.insert(b"kept");
        let g = BasicFilter::from_parts(f.m_bits(), f.seeds().to_vec(), f.bits().to_vec()).unwrap();
        assert!(g.query(b"kept"));
        assert_eq!(f, g);

        let bad = [
            BasicFilter::from_parts(12, vec![1], vec![0; 1]),
            BasicFilter::from_parts(0, vec![1], vec![]),
            BasicFilter::from_parts(16, vec![], vec![0; 2]),
            BasicFilter::from_parts(16, vec![1, 2], vec![0; 3]),
            BasicFilter::from_parts(16, vec![9, 9], vec![0; 2]),
        ];
        for r in bad {
            assert!(matches!(r, Err(BloomError::MalformedSnapshot(_))));
        }
    }
}
