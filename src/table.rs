//! Driver boundary for the key-value table that holds counter rows.
//!
//! Each row has a string partition key (`k`) and an integer value (`v`).
//! Implementations must make `add_and_fetch` atomic per key; the rest of
//! the crate does no locking of its own.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;

use crate::error::{CtrError, CtrResult};

pub trait CounterTable: Send + Sync {
    /// Table name, used in log lines.
    fn name(&self) -> &str;

    /// Read the value of row `key`, `None` when the row does not exist.
    fn get_item(&self, key: &str) -> CtrResult<Option<i64>>;

    /// Unconditionally write row `key`.
    fn put_item(&self, key: &str, value: i64) -> CtrResult<()>;

    /// Write row `key` only if it does not exist yet. Returns whether the
    /// write happened.
    fn put_if_absent(&self, key: &str, value: i64) -> CtrResult<bool>;

    /// Atomically add `delta` to row `key` and return the new value. An absent
    /// row counts as 0.
    fn add_and_fetch(&self, key: &str, delta: i64) -> CtrResult<i64>;
}

/// In-process table. Per-key atomicity comes from the shard lock held by
/// `DashMap::entry`.
#[derive(Debug)]
pub struct MemoryTable {
    name: String,
    rows: DashMap<String, i64>,
    available: AtomicBool,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>) -> Self {
        MemoryTable {
            name: name.into(),
            rows: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    /// Toggle simulated transport failure. While unavailable every call
    /// fails with `StoreUnavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn check_available(&self) -> CtrResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CtrError::StoreUnavailable(format!(
                "table {:?} is not reachable",
                self.name
            )))
        }
    }
}

impl CounterTable for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_item(&self, key: &str) -> CtrResult<Option<i64>> {
        self.check_available()?;
        Ok(self.rows.get(key).map(|v| *v))
    }

    fn put_item(&self, key: &str, value: i64) -> CtrResult<()> {
        self.check_available()?;
        self.rows.insert(key.to_string(), value);
        Ok(())
    }

    fn put_if_absent(&self, key: &str, value: i64) -> CtrResult<bool> {
        self.check_available()?;
        let mut inserted = false;
        self.rows.entry(key.to_string()).or_insert_with(|| {
            inserted = true;
            value
        });
        Ok(inserted)
    }

    fn add_and_fetch(&self, key: &str, delta: i64) -> CtrResult<i64> {
        self.check_available()?;
        let mut row = self.rows.entry(key.to_string()).or_insert(0);
        let next = row.checked_add(delta).ok_or_else(|| CtrError::CounterOverflow {
            key: key.to_string(),
            value: *row,
        })?;
        *row = next;
        Ok(next)
    }
}
