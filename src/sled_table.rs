//! Persistent counter table on an embedded sled tree.
//!
//! One tree per table name. Each row is stored as `{"k": .., "v": ..}`.
//! sled has no native increment, so upsert-increment is emulated with a
//! conditional put (compare-and-swap against the previously read bytes).

use std::path::Path;

use serde::{Deserialize, Serialize};
use sled::{Db, Tree};

use crate::error::{CtrError, CtrResult};
use crate::table::CounterTable;

#[derive(Serialize, Deserialize)]
struct Row {
    k: String,
    v: i64,
}

pub struct SledTable {
    name: String,
    tree: Tree,
}

fn unavailable(err: sled::Error) -> CtrError {
    CtrError::StoreUnavailable(err.to_string())
}

impl SledTable {
    pub fn open(path: impl AsRef<Path>, name: &str) -> CtrResult<Self> {
        let db = sled::open(path).map_err(unavailable)?;
        SledTable::from_db(&db, name)
    }

    pub fn from_db(db: &Db, name: &str) -> CtrResult<Self> {
        let tree = db.open_tree(name).map_err(unavailable)?;
        Ok(SledTable {
            name: name.to_string(),
            tree,
        })
    }

    fn encode(key: &str, value: i64) -> CtrResult<Vec<u8>> {
        let row = Row {
            k: key.to_string(),
            v: value,
        };
        Ok(serde_json::to_vec(&row)?)
    }

    fn decode(key: &str, raw: &[u8]) -> CtrResult<i64> {
        serde_json::from_slice::<Row>(raw)
            .map(|row| row.v)
            .map_err(|_| CtrError::MalformedStoredValue {
                key: key.to_string(),
                raw: String::from_utf8_lossy(raw).into_owned(),
            })
    }
}

impl CounterTable for SledTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_item(&self, key: &str) -> CtrResult<Option<i64>> {
        match self.tree.get(key).map_err(unavailable)? {
            Some(raw) => Ok(Some(SledTable::decode(key, &raw)?)),
            None => Ok(None),
        }
    }

    fn put_item(&self, key: &str, value: i64) -> CtrResult<()> {
        let bytes = SledTable::encode(key, value)?;
        self.tree.insert(key, bytes).map_err(unavailable)?;
        Ok(())
    }

    fn put_if_absent(&self, key: &str, value: i64) -> CtrResult<bool> {
        let bytes = SledTable::encode(key, value)?;
        let swapped = self
            .tree
            .compare_and_swap(key, None as Option<&[u8]>, Some(bytes))
            .map_err(unavailable)?;
        Ok(swapped.is_ok())
    }

    fn add_and_fetch(&self, key: &str, delta: i64) -> CtrResult<i64> {
        loop {
            let current = self.tree.get(key).map_err(unavailable)?;
            let previous = match &current {
                Some(raw) => SledTable::decode(key, raw)?,
                None => 0,
            };
            let value = previous
                .checked_add(delta)
                .ok_or_else(|| CtrError::CounterOverflow {
                    key: key.to_string(),
                    value: previous,
                })?;
            let next = SledTable::encode(key, value)?;
            // Lost the race to another writer: re-read and try again.
            if self
                .tree
                .compare_and_swap(key, current, Some(next))
                .map_err(unavailable)?
                .is_ok()
            {
                return Ok(value);
            }
        }
    }
}
