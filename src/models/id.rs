use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error(
    "Invalid id {value:?}: ids must be a single path segment (no '/', '\\\\', NUL, '.' or '..')"
)]
pub struct IdError {
    value: String,
}

/// Opaque identifier for users and customers.
///
/// File-backed storage uses ids as directory names, so anything that reaches
/// the filesystem must pass [`Id::is_path_safe`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(String);

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl Id {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Like [`Id::from_string`], but rejects values that are not a safe path segment.
    pub fn from_string_checked(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        if Self::is_path_safe(&value) {
            Ok(Self(value))
        } else {
            Err(IdError { value })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_path_safe(value: &str) -> bool {
        !matches!(value, "" | "." | "..") && !value.contains(['/', '\\', '\0'])
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_safe() {
        let a = Id::new();
        let b = Id::new();
        assert_ne!(a, b);
        assert!(Id::is_path_safe(a.as_str()));
    }

    #[test]
    fn checked_constructor_rejects_traversal() {
        assert!(Id::from_string_checked("user-1").is_ok());
        for bad in ["", ".", "..", "../etc", "a/b", "a\\b", "nul\0byte"] {
            assert!(Id::from_string_checked(bad).is_err(), "{bad:?} accepted");
        }
    }

    #[test]
    fn error_names_the_rejected_value() {
        let err = Id::from_string_checked("a/b").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid id \"a/b\": ids must be a single path segment (no '/', '\\\\', NUL, '.' or '..')"
        );
    }
}
