//! Thompson sampling over Beta-Bernoulli click posteriors.
//!
//! Every call to [`sample`] builds its own generator, seeded from the wall
//! clock and a process-wide call sequence, so concurrent callers never share
//! RNG state and never reuse a seed.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Beta, Distribution};
use serde::{Deserialize, Serialize};

use crate::ctr::Ctr;

static SAMPLE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Outcome of sampling several keys at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleResult {
    pub sampled_key: String,
    pub sampled_score: f64,
    pub sampled_values: BTreeMap<String, f64>,
}

fn fresh_rng() -> StdRng {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let seq = SAMPLE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    StdRng::seed_from_u64(nanos ^ seq.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Draw one score in `[0, 1]` from the key's posterior.
pub fn sample(ctr: &Ctr) -> f64 {
    sample_with(ctr, &mut fresh_rng())
}

/// Same as [`sample`] with a caller-supplied generator.
pub fn sample_with<R: Rng + ?Sized>(ctr: &Ctr, rng: &mut R) -> f64 {
    let params = ctr.posterior();
    match Beta::new(params.alpha, params.beta) {
        Ok(dist) => dist.sample(rng).clamp(0.0, 1.0),
        Err(_) => params.mean(),
    }
}

/// Pick the winner among `scores`, walking `keys` in request order.
///
/// The running maximum starts at 0.0 and only a strictly greater score
/// replaces it, so ties keep the earlier key and an all-zero draw leaves
/// the winner empty.
pub fn select_winner(keys: &[String], scores: &[f64]) -> SampleResult {
    let mut result = SampleResult {
        sampled_key: String::new(),
        sampled_score: 0.0,
        sampled_values: BTreeMap::new(),
    };
    for (key, &score) in keys.iter().zip(scores) {
        result.sampled_values.insert(key.clone(), score);
        if score > result.sampled_score {
            result.sampled_score = score;
            result.sampled_key = key.clone();
        }
    }
    result
}
