//! Scoped write transactions.
//!
//! A [`WriteTxn`] holds the store's write lock for its whole lifetime and
//! stages every mutation in a `WriteBatch`. Nothing reaches the database
//! until [`WriteTxn::commit`]; dropping the transaction without committing
//! discards the staged batch, so an early `?` return rolls back cleanly.

use parking_lot::MutexGuard;
use rocksdb::{BoundColumnFamily, Direction, IteratorMode, WriteBatch};
use std::sync::Arc;

use crate::error::{Result, StoreError};
use crate::rocks::{Db, RocksStore};

/// An open write transaction against a [`RocksStore`].
pub struct WriteTxn<'a> {
    db: &'a Db,
    _guard: MutexGuard<'a, ()>,
    batch: WriteBatch,
    committed: bool,
}

impl<'a> WriteTxn<'a> {
    pub(crate) fn begin(db: &'a Db, guard: MutexGuard<'a, ()>) -> Self {
        Self {
            db,
            _guard: guard,
            batch: WriteBatch::default(),
            committed: false,
        }
    }

    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'a>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Read the committed value of a key.
    ///
    /// Staged writes of this transaction are not visible.
    pub fn get<T: serde::de::DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        let handle = self.cf(cf)?;
        self.db
            .get_cf(&handle, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| RocksStore::deserialize(&data))
            .transpose()
    }

    /// Stage a serialized value.
    pub fn put<T: serde::Serialize>(&mut self, cf: &str, key: &[u8], value: &T) -> Result<()> {
        let handle = self.cf(cf)?;
        let bytes = RocksStore::serialize(value)?;
        self.batch.put_cf(&handle, key, bytes);
        Ok(())
    }

    /// Stage an empty marker value, as used by index entries.
    pub fn put_marker(&mut self, cf: &str, key: &[u8]) -> Result<()> {
        let handle = self.cf(cf)?;
        self.batch.put_cf(&handle, key, []);
        Ok(())
    }

    /// Stage the deletion of a key.
    pub fn delete(&mut self, cf: &str, key: &[u8]) -> Result<()> {
        let handle = self.cf(cf)?;
        self.batch.delete_cf(&handle, key);
        Ok(())
    }

    /// Stage the deletion of every committed key starting with `prefix`.
    ///
    /// Returns the number of keys staged for deletion.
    pub fn delete_prefix(&mut self, cf: &str, prefix: &[u8]) -> Result<usize> {
        let handle = self.cf(cf)?;
        let mut doomed = Vec::new();
        for item in self
            .db
            .iterator_cf(&handle, IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            doomed.push(key);
        }
        for key in &doomed {
            self.batch.delete_cf(&handle, key);
        }
        Ok(doomed.len())
    }

    /// Apply every staged write atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the database rejects the batch, in which case
    /// none of it was applied.
    pub fn commit(mut self) -> Result<()> {
        let batch = std::mem::take(&mut self.batch);
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for WriteTxn<'_> {
    fn drop(&mut self) {
        if !self.committed && !self.batch.is_empty() {
            tracing::debug!(
                staged = self.batch.len(),
                "Discarding uncommitted write transaction"
            );
        }
    }
}
