//! Per-operation result of a registry call, before it is logged and
//! collapsed into the public never-failing API.

use crate::error::{RegistryError, Result};
use std::path::PathBuf;

/// A recovery step taken while servicing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    /// A timed-out lock file was deleted before retrying.
    ClearedStaleLock { path: PathBuf },
    /// The store failed to open and its files were deleted before retrying.
    WipedStore { removed: usize },
}

/// How a registry operation ended.
#[derive(Debug)]
pub enum Outcome<T> {
    /// Completed on the first try.
    Success(T),
    /// Completed after one or more recovery steps.
    Recovered { value: T, recoveries: Vec<Recovery> },
    /// Failed. The public API reports this as a no-op or not-found.
    Degraded {
        error: RegistryError,
        recoveries: Vec<Recovery>,
    },
}

impl<T> Outcome<T> {
    pub(crate) fn from_parts(result: Result<T>, recoveries: Vec<Recovery>) -> Self {
        match result {
            Ok(value) if recoveries.is_empty() => Outcome::Success(value),
            Ok(value) => Outcome::Recovered { value, recoveries },
            Err(error) => Outcome::Degraded { error, recoveries },
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Success(value) | Outcome::Recovered { value, .. } => Some(value),
            Outcome::Degraded { .. } => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Success(value) | Outcome::Recovered { value, .. } => Some(value),
            Outcome::Degraded { .. } => None,
        }
    }

    pub fn recoveries(&self) -> &[Recovery] {
        match self {
            Outcome::Success(_) => &[],
            Outcome::Recovered { recoveries, .. } | Outcome::Degraded { recoveries, .. } => {
                recoveries
            }
        }
    }

    pub fn error(&self) -> Option<&RegistryError> {
        match self {
            Outcome::Degraded { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_classifies() {
        let ok: Outcome<u8> = Outcome::from_parts(Ok(1), Vec::new());
        assert!(ok.is_success());
        assert_eq!(ok.value(), Some(&1));

        let recovered: Outcome<u8> =
            Outcome::from_parts(Ok(2), vec![Recovery::WipedStore { removed: 1 }]);
        assert!(!recovered.is_success());
        assert!(!recovered.is_degraded());
        assert_eq!(recovered.recoveries().len(), 1);
        assert_eq!(recovered.into_value(), Some(2));

        let degraded: Outcome<u8> =
            Outcome::from_parts(Err(RegistryError::Other("x".into())), Vec::new());
        assert!(degraded.is_degraded());
        assert!(degraded.error().is_some());
        assert_eq!(degraded.into_value(), None);
    }
}
