//! Ordered lock attempts with their timeout reactions.

use crate::config::RegistrySettings;
use std::time::Duration;

/// What to do when an attempt times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnTimeout {
    /// Delete the lock file and move on to the next attempt.
    ClearStaleLock,
    /// Fail the operation.
    GiveUp,
}

/// One lock acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockAttempt {
    pub timeout: Duration,
    pub on_timeout: OnTimeout,
}

/// The attempts made for every registry operation: the configured timeout,
/// then a single retry with the shorter timeout after clearing the lock.
pub fn lock_plan(settings: &RegistrySettings) -> [LockAttempt; 2] {
    [
        LockAttempt {
            timeout: settings.lock_timeout,
            on_timeout: OnTimeout::ClearStaleLock,
        },
        LockAttempt {
            timeout: settings.retry_lock_timeout,
            on_timeout: OnTimeout::GiveUp,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_retries_once_with_shorter_timeout() {
        let plan = lock_plan(&RegistrySettings::new("/tmp/uuid_cache"));

        assert_eq!(plan[0].timeout, Duration::from_millis(500));
        assert_eq!(plan[0].on_timeout, OnTimeout::ClearStaleLock);
        assert_eq!(plan[1].timeout, Duration::from_millis(300));
        assert_eq!(plan[1].on_timeout, OnTimeout::GiveUp);
    }

    #[test]
    fn test_plan_follows_settings() {
        let settings = RegistrySettings::new("/tmp/uuid_cache")
            .with_lock_timeouts(Duration::from_millis(50), Duration::from_millis(30));
        let plan = lock_plan(&settings);

        assert_eq!(plan[0].timeout, Duration::from_millis(50));
        assert_eq!(plan[1].timeout, Duration::from_millis(30));
    }
}
