//! In-process collaborators for tests and small hosts

use super::traits::{AccountStore, AuxiliarySync, MaxCountProvider};
use crate::types::TrackedAccount;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Account store backed by a vector in memory
///
/// Accounts are returned least-recently-synced first; accounts that were never
/// synchronized come before all others, and ties are broken by id.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<Vec<TrackedAccount>>,
}

impl InMemoryAccountStore {
    /// Create a store holding `accounts`
    pub fn new(accounts: Vec<TrackedAccount>) -> Self {
        Self {
            accounts: RwLock::new(accounts),
        }
    }

    /// Replace every tracked account
    pub async fn replace(&self, accounts: Vec<TrackedAccount>) {
        *self.accounts.write().await = accounts;
    }

    /// Insert an account, or overwrite the one with the same id
    pub async fn upsert(&self, account: TrackedAccount) {
        let mut accounts = self.accounts.write().await;
        match accounts.iter_mut().find(|a| a.id == account.id) {
            Some(existing) => *existing = account,
            None => accounts.push(account),
        }
    }

    /// Number of tracked accounts
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    /// Returns true if no accounts are tracked
    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn tracked_accounts(&self, limit: usize) -> crate::Result<Vec<TrackedAccount>> {
        let mut accounts = self.accounts.read().await.clone();
        accounts.sort_by_key(|a| (a.last_sync, a.id));
        accounts.truncate(limit);
        Ok(accounts)
    }
}

/// Count-limit provider returning the same ceiling every cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedMaxCount(usize);

impl FixedMaxCount {
    /// Create a provider with a constant ceiling
    pub fn new(max: usize) -> Self {
        Self(max)
    }
}

#[async_trait]
impl MaxCountProvider for FixedMaxCount {
    async fn max_count(&self) -> crate::Result<usize> {
        Ok(self.0)
    }
}

/// Count-limit provider that ramps up after startup
///
/// The first `warm_up_cycles` queries return `warm_up_capacity` (never more
/// than `capacity`); every later query returns `capacity`. This keeps the
/// first cycles after a restart light while the downstream stage catches up.
#[derive(Debug)]
pub struct WarmUpMaxCount {
    capacity: usize,
    warm_up_capacity: usize,
    warm_up_cycles: u64,
    served: AtomicU64,
}

impl WarmUpMaxCount {
    /// Create a provider with a warm-up phase
    pub fn new(capacity: usize, warm_up_capacity: usize, warm_up_cycles: u64) -> Self {
        Self {
            capacity,
            warm_up_capacity: warm_up_capacity.min(capacity),
            warm_up_cycles,
            served: AtomicU64::new(0),
        }
    }

    /// Returns true once the warm-up phase is over
    pub fn is_warmed_up(&self) -> bool {
        self.served.load(Ordering::Relaxed) >= self.warm_up_cycles
    }
}

#[async_trait]
impl MaxCountProvider for WarmUpMaxCount {
    async fn max_count(&self) -> crate::Result<usize> {
        let served = self.served.fetch_add(1, Ordering::Relaxed);
        if served < self.warm_up_cycles {
            tracing::debug!(
                cycle = served + 1,
                warm_up_cycles = self.warm_up_cycles,
                max_count = self.warm_up_capacity,
                "Serving warm-up count limit"
            );
            Ok(self.warm_up_capacity)
        } else {
            Ok(self.capacity)
        }
    }
}

/// Auxiliary sync task that does nothing
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpAuxiliarySync;

#[async_trait]
impl AuxiliarySync for NoOpAuxiliarySync {
    async fn run(&self) -> crate::Result<()> {
        Ok(())
    }
}
