//! Per-organization update serialization.
//!
//! Webhook deliveries for the same organization may arrive concurrently.
//! Each read-modify-write of a subscription record runs while holding the
//! organization's guard, so writes for one organization never interleave.
//! Entries are removed once no task holds or awaits them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;

use crate::domain::foundation::OrganizationId;

type LockTable = HashMap<OrganizationId, Arc<tokio::sync::Mutex<()>>>;

/// Table of per-organization async mutexes.
#[derive(Debug, Default)]
pub struct OrganizationLocks {
    table: Arc<Mutex<LockTable>>,
}

impl OrganizationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `id`.
    pub async fn acquire(&self, id: &OrganizationId) -> OrganizationGuard {
        let lock = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(table.entry(id.clone()).or_default())
        };

        let guard = Arc::clone(&lock).lock_owned().await;

        OrganizationGuard {
            id: id.clone(),
            lock,
            guard: Some(guard),
            table: Arc::clone(&self.table),
        }
    }

    /// Number of organizations with a live entry.
    pub fn tracked(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Exclusive access to one organization's record until dropped.
pub struct OrganizationGuard {
    id: OrganizationId,
    lock: Arc<tokio::sync::Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
    table: Arc<Mutex<LockTable>>,
}

impl OrganizationGuard {
    pub fn organization_id(&self) -> &OrganizationId {
        &self.id
    }
}

impl Drop for OrganizationGuard {
    fn drop(&mut self) {
        // Release before pruning so the owned guard's Arc is gone from the count.
        drop(self.guard.take());

        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // Remaining references: the table entry and `self.lock`.
        if Arc::strong_count(&self.lock) <= 2 {
            table.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn org(id: &str) -> OrganizationId {
        OrganizationId::new(id).unwrap()
    }

    #[tokio::test]
    async fn entry_is_pruned_after_release() {
        let locks = OrganizationLocks::new();

        {
            let guard = locks.acquire(&org("org_1")).await;
            assert_eq!(guard.organization_id().as_str(), "org_1");
            assert_eq!(locks.tracked(), 1);
        }

        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn different_organizations_do_not_block_each_other() {
        let locks = OrganizationLocks::new();

        let _a = locks.acquire(&org("org_a")).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(&org("org_b"))).await;

        assert!(b.is_ok());
        assert_eq!(locks.tracked(), 2);
    }

    #[tokio::test]
    async fn same_organization_is_serialized() {
        let locks = Arc::new(OrganizationLocks::new());
        let in_critical = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let in_critical = Arc::clone(&in_critical);
            let max_seen = Arc::clone(&max_seen);
            tasks.push(tokio::spawn(async move {
                let _guard = locks.acquire(&org("org_1")).await;
                let now = in_critical.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_critical.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn entry_survives_while_a_waiter_is_queued() {
        let locks = Arc::new(OrganizationLocks::new());
        let first = locks.acquire(&org("org_1")).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(&org("org_1")).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(first);
        assert_eq!(locks.tracked(), 1);

        waiter.await.unwrap();
        assert_eq!(locks.tracked(), 0);
    }
}
