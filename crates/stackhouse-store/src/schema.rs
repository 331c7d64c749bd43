//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary stack records, keyed by `stack_id`.
    pub const STACKS: &str = "stacks";

    /// Service records, keyed by `stack_id || 0x00 || position`.
    pub const SERVICES: &str = "services";

    /// Index: stacks by creation time, keyed by `created_micros || stack_id`.
    pub const STACKS_BY_CREATED: &str = "stacks_by_created";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::STACKS, cf::SERVICES, cf::STACKS_BY_CREATED]
}
