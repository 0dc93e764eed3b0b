//! One run per kind at a time.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::error::AppError;
use crate::store::RunKind;

/// Shared set of run kinds currently executing. Clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct RunLock {
    active: Arc<Mutex<HashSet<RunKind>>>,
}

impl RunLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn active(&self) -> MutexGuard<'_, HashSet<RunKind>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claims `kind` until the returned guard is dropped.
    ///
    /// # Errors
    /// * `RunInProgress` - another run of the same kind holds the lock
    pub fn acquire(&self, kind: RunKind) -> Result<RunGuard, AppError> {
        if !self.active().insert(kind) {
            return Err(AppError::RunInProgress { kind });
        }
        debug!("Acquired run lock for {kind}");
        Ok(RunGuard {
            lock: self.clone(),
            kind,
        })
    }

    pub fn is_running(&self, kind: RunKind) -> bool {
        self.active().contains(&kind)
    }
}

/// Releases its run kind on drop.
#[derive(Debug)]
pub struct RunGuard {
    lock: RunLock,
    kind: RunKind,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.lock.active().remove(&self.kind);
        debug!("Released run lock for {}", self.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_kind_is_exclusive() {
        let lock = RunLock::new();
        let guard = lock.acquire(RunKind::Players).unwrap();

        let err = lock.acquire(RunKind::Players).unwrap_err();
        assert!(matches!(
            err,
            AppError::RunInProgress {
                kind: RunKind::Players
            }
        ));
        assert!(lock.is_running(RunKind::Players));

        drop(guard);
        assert!(!lock.is_running(RunKind::Players));
        assert!(lock.acquire(RunKind::Players).is_ok());
    }

    #[test]
    fn test_different_kinds_run_together() {
        let lock = RunLock::new();
        let _all = lock.acquire(RunKind::All).unwrap();
        let _teams = lock.acquire(RunKind::Teams).unwrap();
        assert!(lock.is_running(RunKind::All));
        assert!(lock.is_running(RunKind::Teams));
    }

    #[test]
    fn test_clones_share_state() {
        let lock = RunLock::new();
        let other = lock.clone();
        let _guard = lock.acquire(RunKind::Events).unwrap();
        assert!(other.acquire(RunKind::Events).is_err());
    }
}
