//! `RocksDB` definition store for stackhouse.
//!
//! This crate persists stack and service definitions, the desired state that
//! the control plane reconciles against the container runtime. It never talks
//! to the runtime itself.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `stacks`: Stack rows (name and timestamps), keyed by `stack_id`
//! - `services`: Service rows, keyed by `stack_id || 0x00 || position`
//! - `stacks_by_created`: Index for listing stacks newest first
//!
//! Every mutation goes through a [`WriteTxn`]: the store's write lock is held
//! while the change is staged in a single `WriteBatch`, and the batch is
//! applied all-or-nothing on commit. Reads run against a `RocksDB` snapshot so
//! a concurrent replace of a service set is never observed half-applied.
//!
//! # Example
//!
//! ```no_run
//! use stackhouse_store::{RocksStore, Store};
//!
//! let store = RocksStore::open("/tmp/stackhouse-db").unwrap();
//!
//! for stack in store.list_stacks().unwrap() {
//!     println!("{} ({})", stack.id, stack.name);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;
pub mod txn;
pub mod types;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;
pub use txn::WriteTxn;
pub use types::{Service, ServiceDefinition, Stack, StackDefinition, StackSummary};

use stackhouse_core::{ServiceId, StackId};

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (e.g., `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Stack Operations
    // =========================================================================

    /// Persist a new stack and all of its services atomically.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if a stack with the same ID exists,
    /// and `StoreError::InvalidDefinition` or `StoreError::Naming` if the
    /// definition breaks a write-time integrity rule.
    fn create_stack(&self, def: &StackDefinition) -> Result<Stack>;

    /// Get a stack with its services in declaration order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_stack(&self, stack_id: &StackId) -> Result<Option<Stack>>;

    /// List all stacks, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_stacks(&self) -> Result<Vec<StackSummary>>;

    /// Replace a stack's name and entire service set atomically.
    ///
    /// The stack is stored under `stack_id`; `def.id` is ignored. The
    /// creation timestamp is preserved.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the stack doesn't exist.
    fn update_stack(&self, stack_id: &StackId, def: &StackDefinition) -> Result<Stack>;

    /// Delete a stack and all of its services atomically.
    ///
    /// Returns `false` if there was nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete_stack(&self, stack_id: &StackId) -> Result<bool>;

    // =========================================================================
    // Service Operations
    // =========================================================================

    /// Get a single service of a stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_service(&self, stack_id: &StackId, service_id: &ServiceId) -> Result<Option<Service>>;
}
