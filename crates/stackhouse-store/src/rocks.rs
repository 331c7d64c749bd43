//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, SnapshotWithThreadMode,
};
use stackhouse_core::{ServiceId, StackId};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::txn::WriteTxn;
use crate::types::{Service, ServiceDefinition, Stack, StackDefinition, StackRecord, StackSummary};
use crate::Store;

pub(crate) type Db = DBWithThreadMode<MultiThreaded>;
type Snapshot<'a> = SnapshotWithThreadMode<'a, Db>;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<Db>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Begin a write transaction, blocking until no other is open.
    pub(crate) fn begin_write(&self) -> WriteTxn<'_> {
        WriteTxn::begin(&self.db, self.write_lock.lock())
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    pub(crate) fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    pub(crate) fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn read_record(&self, snap: &Snapshot<'_>, stack_id: &StackId) -> Result<Option<StackRecord>> {
        let cf = self.cf(cf::STACKS)?;
        snap.get_cf(&cf, keys::stack_key(stack_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn read_services(&self, snap: &Snapshot<'_>, stack_id: &StackId) -> Result<Vec<Service>> {
        let cf = self.cf(cf::SERVICES)?;
        let prefix = keys::service_prefix(stack_id);

        let mut services = Vec::new();
        let iter = snap.iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));
        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            services.push(Self::deserialize(&value)?);
        }
        Ok(services)
    }

    /// Stage every service of a definition in declaration order.
    fn stage_services(
        txn: &mut WriteTxn<'_>,
        stack_id: &StackId,
        defs: &[ServiceDefinition],
    ) -> Result<Vec<Service>> {
        let mut services = Vec::with_capacity(defs.len());
        for (position, def) in defs.iter().enumerate() {
            let position = u32::try_from(position).map_err(|_| {
                StoreError::InvalidDefinition("too many services in one stack".to_string())
            })?;
            let service = Service::from_definition(stack_id, def);
            txn.put(cf::SERVICES, &keys::service_key(stack_id, position), &service)?;
            services.push(service);
        }
        Ok(services)
    }
}

impl Store for RocksStore {
    fn create_stack(&self, def: &StackDefinition) -> Result<Stack> {
        def.check(&def.id)?;

        let stack_key = keys::stack_key(&def.id);
        let mut txn = self.begin_write();
        if txn.get::<StackRecord>(cf::STACKS, &stack_key)?.is_some() {
            return Err(StoreError::AlreadyExists);
        }

        let now = Utc::now();
        let record = StackRecord {
            id: def.id.clone(),
            name: def.name.clone(),
            created_at: now,
            updated_at: now,
        };
        txn.put(cf::STACKS, &stack_key, &record)?;
        txn.put_marker(cf::STACKS_BY_CREATED, &keys::created_key(&now, &def.id))?;
        let services = Self::stage_services(&mut txn, &def.id, &def.services)?;
        txn.commit()?;

        tracing::info!(stack_id = %def.id, services = services.len(), "Stack created");

        Ok(Stack {
            id: record.id,
            name: record.name,
            services,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    fn get_stack(&self, stack_id: &StackId) -> Result<Option<Stack>> {
        let snap = self.db.snapshot();
        let Some(record) = self.read_record(&snap, stack_id)? else {
            return Ok(None);
        };
        let services = self.read_services(&snap, stack_id)?;

        Ok(Some(Stack {
            id: record.id,
            name: record.name,
            services,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }))
    }

    fn list_stacks(&self) -> Result<Vec<StackSummary>> {
        let snap = self.db.snapshot();
        let cf_by_created = self.cf(cf::STACKS_BY_CREATED)?;

        let mut stacks = Vec::new();
        for item in snap.iterator_cf(&cf_by_created, IteratorMode::End) {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let Some(stack_id) = keys::extract_stack_id_from_created_key(&key) else {
                tracing::warn!("Skipping malformed creation index entry");
                continue;
            };
            if let Some(record) = self.read_record(&snap, &stack_id)? {
                stacks.push(StackSummary {
                    id: record.id,
                    name: record.name,
                    created_at: record.created_at,
                    updated_at: record.updated_at,
                });
            }
        }

        Ok(stacks)
    }

    fn update_stack(&self, stack_id: &StackId, def: &StackDefinition) -> Result<Stack> {
        def.check(stack_id)?;

        let stack_key = keys::stack_key(stack_id);
        let mut txn = self.begin_write();
        let Some(existing) = txn.get::<StackRecord>(cf::STACKS, &stack_key)? else {
            return Err(StoreError::NotFound);
        };

        let record = StackRecord {
            id: existing.id,
            name: def.name.clone(),
            created_at: existing.created_at,
            updated_at: Utc::now().max(existing.created_at),
        };
        txn.put(cf::STACKS, &stack_key, &record)?;
        let removed = txn.delete_prefix(cf::SERVICES, &keys::service_prefix(stack_id))?;
        let services = Self::stage_services(&mut txn, stack_id, &def.services)?;
        txn.commit()?;

        tracing::info!(
            stack_id = %stack_id,
            removed,
            services = services.len(),
            "Stack definition replaced"
        );

        Ok(Stack {
            id: record.id,
            name: record.name,
            services,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    fn delete_stack(&self, stack_id: &StackId) -> Result<bool> {
        let stack_key = keys::stack_key(stack_id);
        let mut txn = self.begin_write();
        let Some(record) = txn.get::<StackRecord>(cf::STACKS, &stack_key)? else {
            return Ok(false);
        };

        txn.delete(cf::STACKS, &stack_key)?;
        txn.delete(
            cf::STACKS_BY_CREATED,
            &keys::created_key(&record.created_at, stack_id),
        )?;
        let removed = txn.delete_prefix(cf::SERVICES, &keys::service_prefix(stack_id))?;
        txn.commit()?;

        tracing::info!(stack_id = %stack_id, services = removed, "Stack deleted");
        Ok(true)
    }

    fn get_service(&self, stack_id: &StackId, service_id: &ServiceId) -> Result<Option<Service>> {
        let snap = self.db.snapshot();
        Ok(self
            .read_services(&snap, stack_id)?
            .into_iter()
            .find(|s| &s.id == service_id))
    }
}
