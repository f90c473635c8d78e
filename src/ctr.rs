//! Counters and the click-through-rate estimate built from them.
//!
//! Views and clicks are read from two independently incremented rows, so a
//! read can observe `clicks > views`. Every ratio and posterior computed here
//! clamps clicks to views first.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One physical counter row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub key: String,
    pub value: i64,
}

impl Counter {
    pub fn new(key: impl Into<String>, value: i64) -> Self {
        Counter {
            key: key.into(),
            value,
        }
    }
}

/// Parameters of the Beta posterior over a key's click probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaParams {
    pub alpha: f64,
    pub beta: f64,
}

impl BetaParams {
    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }
}

impl fmt::Display for BetaParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Beta({}, {})", self.alpha, self.beta)
    }
}

/// Views and clicks for one logical key. Computed per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ctr {
    pub key: String,
    pub views: i64,
    pub clicks: i64,
}

impl Ctr {
    pub fn new(key: impl Into<String>, views: i64, clicks: i64) -> Self {
        Ctr {
            key: key.into(),
            views,
            clicks,
        }
    }

    fn observed(&self) -> (i64, i64) {
        let views = self.views.max(0);
        let clicks = self.clicks.clamp(0, views);
        (views, clicks)
    }

    /// Clicks clamped into `[0, views]`.
    pub fn clamped_clicks(&self) -> i64 {
        self.observed().1
    }

    /// Point estimate `clicks / views`, exactly 0.0 when there are no views.
    pub fn mean(&self) -> f64 {
        let (views, clicks) = self.observed();
        if views == 0 {
            return 0.0;
        }
        clicks as f64 / views as f64
    }

    /// Posterior under a uniform Beta(1, 1) prior:
    /// `Beta(clicks + 1, views - clicks + 1)`. Both parameters are >= 1.
    pub fn posterior(&self) -> BetaParams {
        let (views, clicks) = self.observed();
        BetaParams {
            alpha: clicks as f64 + 1.0,
            beta: (views - clicks) as f64 + 1.0,
        }
    }

    /// Mean of the posterior, `(clicks + 1) / (views + 2)`.
    pub fn posterior_mean(&self) -> f64 {
        self.posterior().mean()
    }
}

impl fmt::Display for Ctr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} clicks / {} views ({:.2}%)",
            self.key,
            self.clicks,
            self.views,
            self.mean() * 100.0
        )
    }
}
