use std::sync::Arc;

use ctr_sampler::counter_store::CounterStore;
use ctr_sampler::ctr::{BetaParams, Ctr};
use ctr_sampler::error::{CtrError, CtrResult};
use ctr_sampler::processor::CountersProcessor;
use ctr_sampler::table::{CounterTable, MemoryTable};

fn processor() -> (Arc<MemoryTable>, CountersProcessor) {
    let table = Arc::new(MemoryTable::new("counters"));
    let store = CounterStore::new(table.clone());
    (table, CountersProcessor::new(store))
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Single-key operations
// ---------------------------------------------------------------------------

#[test]
fn test_add_view_creates_then_increments() {
    let (table, p) = processor();
    let counter = p.add_view("missing_key").unwrap();
    assert_eq!(counter.key, "missing_key_views");
    assert_eq!(counter.value, 1);
    assert_eq!(table.get_item("missing_key_views").unwrap(), Some(1));
}

#[test]
fn test_add_click_touches_clicks_row_only() {
    let (table, p) = processor();
    p.add_click("k").unwrap();
    p.add_click("k").unwrap();
    assert_eq!(table.get_item("k_clicks").unwrap(), Some(2));
    assert_eq!(table.get_item("k_views").unwrap(), None);
}

#[test]
fn test_set_then_read_ctr() {
    let (_table, p) = processor();
    p.set_views("k", 5).unwrap();
    p.set_clicks("k", 2).unwrap();
    assert_eq!(p.ctr("k").unwrap(), Ctr::new("k", 5, 2));
}

#[test]
fn test_ctr_of_unknown_key_is_zero_and_initialises_rows() {
    let (table, p) = processor();
    assert_eq!(p.ctr("new").unwrap(), Ctr::new("new", 0, 0));
    assert_eq!(table.len(), 2);
}

#[test]
fn test_distribution_params_for_one_key() {
    let (_table, p) = processor();
    p.set_views("k", 10).unwrap();
    p.set_clicks("k", 4).unwrap();
    assert_eq!(
        p.distribution_params("k").unwrap(),
        BetaParams { alpha: 5.0, beta: 7.0 }
    );
    let x = p.sample("k").unwrap();
    assert!((0.0..=1.0).contains(&x));
}

#[test]
fn test_add_view_at_max_value_errors_instead_of_wrapping() {
    let (table, p) = processor();
    p.set_views("k", i64::MAX).unwrap();
    assert!(matches!(p.add_view("k"), Err(CtrError::CounterOverflow { .. })));
    assert_eq!(table.get_item("k_views").unwrap(), Some(i64::MAX));
    assert_eq!(p.ctr("k").unwrap().views, i64::MAX);
}

#[test]
fn test_store_outage_surfaces_on_ctr() {
    let (table, p) = processor();
    table.set_available(false);
    assert!(matches!(p.ctr("k"), Err(CtrError::StoreUnavailable(_))));
    assert!(matches!(p.add_view("k"), Err(CtrError::StoreUnavailable(_))));
}

// ---------------------------------------------------------------------------
// Multi-key fan-out
// ---------------------------------------------------------------------------

#[test]
fn test_distribution_params_keep_request_order() {
    let (_table, p) = processor();
    p.set_views("a", 100).unwrap();
    p.set_clicks("a", 90).unwrap();
    p.set_views("b", 10).unwrap();
    p.set_clicks("b", 1).unwrap();
    let params = p.distribution_params_many(&keys(&["b", "a", "c"])).unwrap();
    assert_eq!(
        params,
        vec![
            BetaParams { alpha: 2.0, beta: 10.0 },
            BetaParams { alpha: 91.0, beta: 11.0 },
            BetaParams { alpha: 1.0, beta: 1.0 },
        ]
    );
}

#[test]
fn test_sample_many_reports_every_key() {
    let (_table, p) = processor();
    let result = p.sample_many(&keys(&["x", "y", "z"])).unwrap();
    assert_eq!(result.sampled_values.len(), 3);
    let best = result
        .sampled_values
        .values()
        .cloned()
        .fold(0.0f64, f64::max);
    assert_eq!(result.sampled_score, best);
}

#[test]
fn test_sample_many_prefers_high_ctr_key() {
    let (_table, p) = processor();
    p.set_views("a", 100).unwrap();
    p.set_clicks("a", 90).unwrap();
    p.set_views("b", 10).unwrap();
    p.set_clicks("b", 1).unwrap();
    let ks = keys(&["a", "b"]);
    let wins = (0..200)
        .filter(|_| p.sample_many(&ks).unwrap().sampled_key == "a")
        .count();
    assert!(wins > 100, "a won only {} of 200", wins);
}

#[test]
fn test_empty_key_list_yields_empty_result() {
    let (_table, p) = processor();
    let result = p.sample_many(&[]).unwrap();
    assert_eq!(result.sampled_key, "");
    assert!(result.sampled_values.is_empty());
    assert!(p.distribution_params_many(&[]).unwrap().is_empty());
}

/// Fails reads for keys with a given prefix and counts every read it sees.
struct Flaky {
    inner: MemoryTable,
    reads: std::sync::atomic::AtomicUsize,
}

impl CounterTable for Flaky {
    fn name(&self) -> &str {
        self.inner.name()
    }
    fn get_item(&self, key: &str) -> CtrResult<Option<i64>> {
        self.reads.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if key.starts_with("bad") {
            return Err(CtrError::StoreUnavailable(format!("read of {} failed", key)));
        }
        self.inner.get_item(key)
    }
    fn put_item(&self, key: &str, value: i64) -> CtrResult<()> {
        self.inner.put_item(key, value)
    }
    fn put_if_absent(&self, key: &str, value: i64) -> CtrResult<bool> {
        self.inner.put_if_absent(key, value)
    }
    fn add_and_fetch(&self, key: &str, delta: i64) -> CtrResult<i64> {
        self.inner.add_and_fetch(key, delta)
    }
}

#[test]
fn test_fan_out_fails_with_lowest_index_error_after_all_keys_finish() {
    let table = Arc::new(Flaky {
        inner: MemoryTable::new("counters"),
        reads: Default::default(),
    });
    let p = CountersProcessor::new(CounterStore::new(table.clone()));
    let err = p
        .distribution_params_many(&keys(&["ok1", "bad_first", "ok2", "bad_second"]))
        .unwrap_err();
    assert!(
        err.to_string().contains("bad_first_views"),
        "unexpected error: {}",
        err
    );
    // ok1 and ok2 read views and clicks; each bad key fails on its first read.
    assert_eq!(table.reads.load(std::sync::atomic::Ordering::SeqCst), 6);
}
