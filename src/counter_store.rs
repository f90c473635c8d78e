use std::sync::Arc;

use log::debug;

use crate::ctr::Counter;
use crate::error::{CtrError, CtrResult};
use crate::table::CounterTable;

/// Get / set / increment on counter rows of one table.
#[derive(Clone)]
pub struct CounterStore {
    table: Arc<dyn CounterTable>,
}

impl CounterStore {
    pub fn new(table: Arc<dyn CounterTable>) -> Self {
        CounterStore { table }
    }

    pub fn table_name(&self) -> &str {
        self.table.name()
    }

    /// Read a counter, creating it at 0 if the row does not exist.
    ///
    /// The flag is true when this call performed the initialisation write.
    /// If another writer creates the row first, its value is returned
    /// instead and the flag is false.
    pub fn get_or_create(&self, key: &str) -> CtrResult<(Counter, bool)> {
        if let Some(value) = self.table.get_item(key)? {
            return Ok((Counter::new(key, value), false));
        }

        let init_failed = |source: CtrError| CtrError::SetAfterMissingRead {
            key: key.to_string(),
            source: Box::new(source),
        };
        if self.table.put_if_absent(key, 0).map_err(init_failed)? {
            debug!("initialised counter {:?} in {}", key, self.table.name());
            return Ok((Counter::new(key, 0), true));
        }
        let value = self.table.get_item(key).map_err(init_failed)?.unwrap_or(0);
        Ok((Counter::new(key, value), false))
    }

    /// Overwrite (or create) a counter. Last writer wins.
    pub fn set(&self, key: &str, value: i64) -> CtrResult<Counter> {
        self.table.put_item(key, value)?;
        Ok(Counter::new(key, value))
    }

    /// Atomically add 1 and return the new value. An absent row starts at 0.
    pub fn increment_and_get(&self, key: &str) -> CtrResult<Counter> {
        let value = self.table.add_and_fetch(key, 1)?;
        Ok(Counter::new(key, value))
    }
}
