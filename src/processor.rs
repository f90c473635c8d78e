//! Counter operations for logical keys and the parallel multi-key paths.
//!
//! Multi-key requests fan out one rayon task per key. Every task runs to
//! completion before any error is looked at; the first failing key in
//! request order decides the error.

use log::debug;
use rayon::prelude::*;

use crate::counter_store::CounterStore;
use crate::ctr::{BetaParams, Counter, Ctr};
use crate::error::CtrResult;
use crate::keys::{clicks_key, views_key};
use crate::thompson::{self, SampleResult};

pub struct CountersProcessor {
    store: CounterStore,
}

impl CountersProcessor {
    pub fn new(store: CounterStore) -> Self {
        CountersProcessor { store }
    }

    pub fn add_view(&self, key: &str) -> CtrResult<Counter> {
        self.increment(&views_key(key))
    }

    pub fn add_click(&self, key: &str) -> CtrResult<Counter> {
        self.increment(&clicks_key(key))
    }

    fn increment(&self, physical_key: &str) -> CtrResult<Counter> {
        // Best effort: the increment upserts on its own if this fails.
        if let Err(err) = self.store.get_or_create(physical_key) {
            debug!("pre-increment init of {:?} failed: {}", physical_key, err);
        }
        self.store.increment_and_get(physical_key)
    }

    pub fn set_views(&self, key: &str, views: i64) -> CtrResult<Counter> {
        self.store.set(&views_key(key), views)
    }

    pub fn set_clicks(&self, key: &str, clicks: i64) -> CtrResult<Counter> {
        self.store.set(&clicks_key(key), clicks)
    }

    pub fn ctr(&self, key: &str) -> CtrResult<Ctr> {
        let (views, _) = self.store.get_or_create(&views_key(key))?;
        let (clicks, _) = self.store.get_or_create(&clicks_key(key))?;
        Ok(Ctr::new(key, views.value, clicks.value))
    }

    pub fn sample(&self, key: &str) -> CtrResult<f64> {
        Ok(thompson::sample(&self.ctr(key)?))
    }

    pub fn distribution_params(&self, key: &str) -> CtrResult<BetaParams> {
        Ok(self.ctr(key)?.posterior())
    }

    /// Fetch every key's `Ctr` in parallel and map it through `f`.
    ///
    /// Results land in request order. All fetches finish before the first
    /// error (lowest index) is returned.
    fn fan_out<T, F>(&self, keys: &[String], f: F) -> CtrResult<Vec<T>>
    where
        T: Send,
        F: Fn(&Ctr) -> T + Sync,
    {
        let slots: Vec<CtrResult<T>> = keys
            .par_iter()
            .map(|key| self.ctr(key).map(|ctr| f(&ctr)))
            .collect();
        slots.into_iter().collect()
    }

    /// One Thompson draw per key; the highest draw wins.
    pub fn sample_many(&self, keys: &[String]) -> CtrResult<SampleResult> {
        let scores = self.fan_out(keys, thompson::sample)?;
        Ok(thompson::select_winner(keys, &scores))
    }

    /// Posterior parameters per key, in request order.
    pub fn distribution_params_many(&self, keys: &[String]) -> CtrResult<Vec<BetaParams>> {
        self.fan_out(keys, Ctr::posterior)
    }
}
