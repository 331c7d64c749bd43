//! Core identifier types for stackhouse.
//!
//! Stack and service identifiers are user-chosen. They become part of runtime
//! container names, so both share one syntax: lowercase ASCII alphanumeric
//! segments joined by single hyphens, at most [`MAX_ID_LEN`] characters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a stack or service identifier.
pub const MAX_ID_LEN: usize = 31;

/// Check a string against the identifier syntax.
///
/// Accepts `[a-z0-9]+(-[a-z0-9]+)*` with a length of 1 to [`MAX_ID_LEN`].
/// Display names follow the same rule, which is why this is exposed on its own.
///
/// # Errors
///
/// Returns an error describing the first rule the string violates.
pub fn check_identifier(s: &str) -> Result<(), IdError> {
    if s.is_empty() {
        return Err(IdError::Empty);
    }
    if s.len() > MAX_ID_LEN {
        return Err(IdError::TooLong {
            max: MAX_ID_LEN,
            got: s.len(),
        });
    }
    let well_formed = s.split('-').all(|segment| {
        !segment.is_empty()
            && segment
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
    });
    if well_formed {
        Ok(())
    } else {
        Err(IdError::InvalidSyntax(s.to_string()))
    }
}

/// Identifier of a stack, immutable once the stack is created.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StackId(String);

/// Identifier of a service, unique within its stack.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceId(String);

macro_rules! impl_identifier {
    ($ty:ident) => {
        impl $ty {
            /// Parse and validate an identifier.
            ///
            /// # Errors
            ///
            /// Returns an error if the string violates the identifier syntax.
            pub fn parse(s: &str) -> Result<Self, IdError> {
                check_identifier(s)?;
                Ok(Self(s.to_string()))
            }

            /// Return the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Length of the identifier in characters.
            #[must_use]
            pub fn len(&self) -> usize {
                self.0.len()
            }

            /// Identifiers are never empty; provided for API symmetry with `len`.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($ty), self.0)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $ty {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                check_identifier(&value)?;
                Ok(Self(value))
            }
        }

        impl From<$ty> for String {
            fn from(id: $ty) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

impl_identifier!(StackId);
impl_identifier!(ServiceId);

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The identifier is empty.
    #[error("identifier must not be empty")]
    Empty,

    /// The identifier exceeds the maximum length.
    #[error("identifier too long: at most {max} characters, got {got}")]
    TooLong {
        /// Maximum permitted length.
        max: usize,
        /// Actual length.
        got: usize,
    },

    /// The identifier contains characters or hyphen placement outside the allowed syntax.
    #[error("invalid identifier '{0}': use lowercase letters, digits and single hyphens")]
    InvalidSyntax(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_hyphenated_lowercase() {
        assert!(StackId::parse("web-shop-2").is_ok());
        assert!(ServiceId::parse("a").is_ok());
        assert!(StackId::parse(&"x".repeat(MAX_ID_LEN)).is_ok());
    }

    #[test]
    fn rejects_bad_syntax() {
        for bad in ["Web", "web_shop", "-web", "web-", "web--shop", "web shop"] {
            assert!(
                matches!(StackId::parse(bad), Err(IdError::InvalidSyntax(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_empty_and_long() {
        assert_eq!(ServiceId::parse(""), Err(IdError::Empty));
        assert!(matches!(
            ServiceId::parse(&"x".repeat(MAX_ID_LEN + 1)),
            Err(IdError::TooLong { max: 31, got: 32 })
        ));
    }

    #[test]
    fn serde_validates() {
        let id: StackId = serde_json::from_str("\"shop\"").unwrap();
        assert_eq!(id.as_str(), "shop");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"shop\"");

        let bad: Result<StackId, _> = serde_json::from_str("\"Shop\"");
        assert!(bad.is_err());
    }
}
