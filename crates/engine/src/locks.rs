//! In-process exclusive access to users, groups and shared events.
//!
//! Operations take every lock they need up front, in the total order of
//! [`LockKey`], before opening their database transaction.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex, PoisonError},
    time::Duration,
};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{EngineError, ResultEngine};

const PRUNE_THRESHOLD: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum LockKey {
    Group(i64),
    Event(i64),
    User(i64),
}

/// Guards held until the operation ends.
#[derive(Debug)]
pub(crate) struct LockSet {
    _guards: Vec<OwnedMutexGuard<()>>,
}

#[derive(Debug)]
pub(crate) struct LockTable {
    slots: StdMutex<HashMap<LockKey, Arc<Mutex<()>>>>,
    timeout: Duration,
}

impl LockTable {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            slots: StdMutex::new(HashMap::new()),
            timeout,
        }
    }

    fn slot(&self, key: LockKey) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.len() >= PRUNE_THRESHOLD {
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        }
        slots
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Acquires all `keys` in order. Fails with `Unavailable` when one of
    /// them is not free within the configured timeout.
    pub(crate) async fn acquire(
        &self,
        keys: impl IntoIterator<Item = LockKey>,
    ) -> ResultEngine<LockSet> {
        let mut keys: Vec<LockKey> = keys.into_iter().collect();
        keys.sort_unstable();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            let slot = self.slot(key);
            let guard = tokio::time::timeout(self.timeout, slot.lock_owned())
                .await
                .map_err(|_| EngineError::Unavailable(format!("{key:?} is busy")))?;
            guards.push(guard);
        }
        Ok(LockSet { _guards: guards })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_order_groups_before_events_before_users() {
        let mut keys = vec![
            LockKey::User(1),
            LockKey::Event(7),
            LockKey::Group(9),
            LockKey::User(0),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                LockKey::Group(9),
                LockKey::Event(7),
                LockKey::User(0),
                LockKey::User(1)
            ]
        );
    }

    #[tokio::test]
    async fn busy_key_times_out_as_unavailable() {
        let table = LockTable::new(Duration::from_millis(20));
        let _held = table.acquire([LockKey::User(1)]).await.unwrap();

        let err = table.acquire([LockKey::User(1)]).await.unwrap_err();
        assert!(matches!(err, EngineError::Unavailable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn duplicated_keys_do_not_self_deadlock() {
        let table = LockTable::new(Duration::from_millis(20));
        let set = table
            .acquire([LockKey::User(2), LockKey::User(2), LockKey::User(1)])
            .await;
        assert!(set.is_ok());
    }

    #[tokio::test]
    async fn released_keys_can_be_taken_again() {
        let table = LockTable::new(Duration::from_millis(20));
        drop(table.acquire([LockKey::Group(3)]).await.unwrap());
        assert!(table.acquire([LockKey::Group(3)]).await.is_ok());
    }
}
