//! Runtime container naming.
//!
//! A service's container is never recorded anywhere. Its name is derived on
//! demand from the owning stack and the service identifier, so every layer
//! that needs it computes the same value.

use crate::error::{CoreError, Result};
use crate::ids::{ServiceId, StackId};

/// Separator placed between the stack and service identifiers.
pub const SEPARATOR: char = '-';

/// Maximum container name length accepted by the runtime.
pub const MAX_CONTAINER_NAME_LEN: usize = 63;

/// Derive the runtime container name for a service.
///
/// # Errors
///
/// Returns [`CoreError::NameTooLong`] if the name would exceed
/// [`MAX_CONTAINER_NAME_LEN`] characters.
pub fn container_name(stack_id: &StackId, service_id: &ServiceId) -> Result<String> {
    let name = format!("{stack_id}{SEPARATOR}{service_id}");
    check_len(name)
}

/// Check the derived name for a raw service segment before it has been parsed.
///
/// Used when validating input where the service value is not yet an identifier.
///
/// # Errors
///
/// Returns [`CoreError::NameTooLong`] if the name would exceed the limit.
pub fn check_fits(stack_id: &str, service: &str) -> Result<()> {
    check_len(format!("{stack_id}{SEPARATOR}{service}")).map(|_| ())
}

fn check_len(name: String) -> Result<String> {
    let len = name.chars().count();
    if len > MAX_CONTAINER_NAME_LEN {
        return Err(CoreError::NameTooLong {
            name,
            len,
            limit: MAX_CONTAINER_NAME_LEN,
        });
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_with_hyphen() {
        let stack = StackId::parse("shop").unwrap();
        let service = ServiceId::parse("db").unwrap();
        assert_eq!(container_name(&stack, &service).unwrap(), "shop-db");
    }

    #[test]
    fn exactly_at_limit() {
        let stack = StackId::parse(&"s".repeat(31)).unwrap();
        let service = ServiceId::parse(&"v".repeat(31)).unwrap();
        let name = container_name(&stack, &service).unwrap();
        assert_eq!(name.len(), 63);
    }

    #[test]
    fn one_over_limit() {
        assert!(check_fits(&"s".repeat(32), &"v".repeat(31)).is_err());
        let err = check_fits(&"s".repeat(40), &"v".repeat(30)).unwrap_err();
        assert!(matches!(err, CoreError::NameTooLong { len: 71, limit: 63, .. }));
    }
}
