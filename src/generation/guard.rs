//! Per-user in-flight generation tracking
//!
//! At most one generation may run per account. The registry hands out an
//! RAII guard; the slot is released when the guard drops, whichever way the
//! generation ends.

use crate::error::{ForgeError, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Thread-safe set of accounts with a generation in progress
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    active: Arc<Mutex<HashSet<String>>>,
}

/// Slot held for the duration of one generation
#[derive(Debug)]
pub struct InFlightGuard {
    active: Arc<Mutex<HashSet<String>>>,
    user_id: String,
}

impl InFlightRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the generation slot for `user_id`
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::GenerationInProgress` if the account already
    /// holds a slot
    ///
    /// # Examples
    ///
    /// ```
    /// use lesson_forge::generation::InFlightRegistry;
    ///
    /// let registry = InFlightRegistry::new();
    /// let guard = registry.try_acquire("u1").unwrap();
    /// assert!(registry.try_acquire("u1").is_err());
    /// drop(guard);
    /// assert!(registry.try_acquire("u1").is_ok());
    /// ```
    pub fn try_acquire(&self, user_id: &str) -> Result<InFlightGuard> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(user_id.to_string()) {
            tracing::debug!(user_id, "Rejected concurrent generation");
            return Err(ForgeError::GenerationInProgress.into());
        }
        Ok(InFlightGuard {
            active: Arc::clone(&self.active),
            user_id: user_id.to_string(),
        })
    }

    /// Whether `user_id` currently holds a slot
    pub fn is_active(&self, user_id: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(user_id)
    }

    /// Number of generations currently running
    pub fn active_count(&self) -> usize {
        self.active.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl InFlightGuard {
    /// Account holding this slot
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_for_same_user_fails() {
        let registry = InFlightRegistry::new();
        let _guard = registry.try_acquire("u1").unwrap();
        let err = registry.try_acquire("u1").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ForgeError>(),
            Some(ForgeError::GenerationInProgress)
        ));
    }

    #[test]
    fn test_different_users_do_not_block_each_other() {
        let registry = InFlightRegistry::new();
        let _a = registry.try_acquire("a").unwrap();
        let _b = registry.try_acquire("b").unwrap();
        assert_eq!(registry.active_count(), 2);
    }

    #[test]
    fn test_drop_releases_slot() {
        let registry = InFlightRegistry::new();
        {
            let guard = registry.try_acquire("u1").unwrap();
            assert_eq!(guard.user_id(), "u1");
            assert!(registry.is_active("u1"));
        }
        assert!(!registry.is_active("u1"));
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn test_clones_share_state() {
        let registry = InFlightRegistry::new();
        let clone = registry.clone();
        let _guard = registry.try_acquire("u1").unwrap();
        assert!(clone.is_active("u1"));
    }
}
