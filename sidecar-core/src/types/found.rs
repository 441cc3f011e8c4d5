//! Point-lookup results.

use serde::{Deserialize, Serialize};

/// Result of a point lookup.
///
/// Absence is a normal outcome of a query, not an error, so every read path
/// returns this instead of `Option` wrapped in a not-found error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoundOrNot<T> {
    /// The record exists.
    Found(T),
    /// No such record.
    NotFound,
}

impl<T> FoundOrNot<T> {
    /// Whether the record was found.
    pub fn is_found(&self) -> bool {
        matches!(self, FoundOrNot::Found(_))
    }

    /// Convert into an `Option`.
    pub fn into_option(self) -> Option<T> {
        match self {
            FoundOrNot::Found(value) => Some(value),
            FoundOrNot::NotFound => None,
        }
    }

    /// Borrow the contents.
    pub fn as_ref(&self) -> FoundOrNot<&T> {
        match self {
            FoundOrNot::Found(value) => FoundOrNot::Found(value),
            FoundOrNot::NotFound => FoundOrNot::NotFound,
        }
    }

    /// Map the found value.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> FoundOrNot<U> {
        match self {
            FoundOrNot::Found(value) => FoundOrNot::Found(f(value)),
            FoundOrNot::NotFound => FoundOrNot::NotFound,
        }
    }
}

impl<T> From<Option<T>> for FoundOrNot<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => FoundOrNot::Found(v),
            None => FoundOrNot::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_option() {
        assert_eq!(FoundOrNot::from(Some(3)), FoundOrNot::Found(3));
        assert_eq!(FoundOrNot::<u8>::from(None), FoundOrNot::NotFound);
    }

    #[test]
    fn test_map_and_into_option() {
        let found = FoundOrNot::Found(2).map(|v| v * 10);
        assert!(found.is_found());
        assert_eq!(found.into_option(), Some(20));
        assert_eq!(FoundOrNot::<u8>::NotFound.map(|v| v + 1).into_option(), None);
    }
}
