//! Key encoding utilities for `RocksDB`.
//!
//! Service keys embed the service's position in its stack so that a prefix
//! scan returns services in the order they were declared. Identifiers never
//! contain a NUL byte, which makes it a safe terminator between the stack id
//! and the position.

use chrono::{DateTime, Utc};
use stackhouse_core::StackId;

const TERMINATOR: u8 = 0x00;

/// Encode a stack key (just the stack ID bytes).
#[must_use]
pub fn stack_key(stack_id: &StackId) -> Vec<u8> {
    stack_id.as_str().as_bytes().to_vec()
}

/// Encode a service key: `stack_id || 0x00 || position (u32 BE)`.
#[must_use]
pub fn service_key(stack_id: &StackId, position: u32) -> Vec<u8> {
    let mut key = service_prefix(stack_id);
    key.extend_from_slice(&position.to_be_bytes());
    key
}

/// Encode the prefix shared by every service of a stack.
#[must_use]
pub fn service_prefix(stack_id: &StackId) -> Vec<u8> {
    let mut key = Vec::with_capacity(stack_id.len() + 5);
    key.extend_from_slice(stack_id.as_str().as_bytes());
    key.push(TERMINATOR);
    key
}

/// Encode a creation-index key: `created_micros (u64 BE) || stack_id`.
///
/// Timestamps before the Unix epoch sort as zero.
#[must_use]
pub fn created_key(created_at: &DateTime<Utc>, stack_id: &StackId) -> Vec<u8> {
    let micros = u64::try_from(created_at.timestamp_micros()).unwrap_or(0);
    let mut key = Vec::with_capacity(8 + stack_id.len());
    key.extend_from_slice(&micros.to_be_bytes());
    key.extend_from_slice(stack_id.as_str().as_bytes());
    key
}

/// Extract the stack ID from a creation-index key.
///
/// Returns `None` if the key is malformed.
#[must_use]
pub fn extract_stack_id_from_created_key(key: &[u8]) -> Option<StackId> {
    let raw = key.get(8..)?;
    let s = std::str::from_utf8(raw).ok()?;
    StackId::parse(s).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> StackId {
        StackId::parse(s).unwrap()
    }

    #[test]
    fn service_prefixes_do_not_collide() {
        // "a" must not prefix-match services of "a-b".
        let key = service_key(&id("a-b"), 0);
        assert!(!key.starts_with(&service_prefix(&id("a"))));
        assert!(key.starts_with(&service_prefix(&id("a-b"))));
    }

    #[test]
    fn service_keys_sort_by_position() {
        let stack = id("shop");
        assert!(service_key(&stack, 1) < service_key(&stack, 2));
        assert!(service_key(&stack, 255) < service_key(&stack, 256));
    }

    #[test]
    fn created_key_roundtrip_and_order() {
        let early = DateTime::from_timestamp(1_000, 0).unwrap();
        let late = DateTime::from_timestamp(2_000, 0).unwrap();
        let a = created_key(&early, &id("zeta"));
        let b = created_key(&late, &id("alpha"));
        assert!(a < b);
        assert_eq!(extract_stack_id_from_created_key(&b), Some(id("alpha")));
    }
}
