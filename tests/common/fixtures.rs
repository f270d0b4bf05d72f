//! Scripted collaborators for driving the scheduler end to end

use account_retriever::collaborators::{
    AccountStore, AuxiliarySync, FailureObserver, InMemoryAccountStore, MaxCountProvider,
};
use account_retriever::{Error, Result, TrackedAccount};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;
use tokio::time::Instant;

/// `n` never-synced accounts with ids `0..n`
pub fn accounts(n: i64) -> Vec<TrackedAccount> {
    (0..n)
        .map(|i| TrackedAccount::new(i, format!("user{i}")))
        .collect()
}

/// Count-limit provider that plays back scripted results, then a fallback
pub struct ScriptedMaxCount {
    script: Mutex<VecDeque<Result<usize>>>,
    fallback: usize,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedMaxCount {
    pub fn new(script: Vec<Result<usize>>, fallback: usize) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Clock readings at which the provider was queried
    pub fn calls(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MaxCountProvider for ScriptedMaxCount {
    async fn max_count(&self) -> Result<usize> {
        self.calls.lock().unwrap().push(Instant::now());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(self.fallback))
    }
}

/// Store that fails its first `failures` calls, then serves an in-memory set
pub struct FlakyStore {
    inner: InMemoryAccountStore,
    failures: AtomicUsize,
    calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new(accounts: Vec<TrackedAccount>, failures: usize) -> Self {
        Self {
            inner: InMemoryAccountStore::new(accounts),
            failures: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountStore for FlakyStore {
    async fn tracked_accounts(&self, limit: usize) -> Result<Vec<TrackedAccount>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::Store("connection reset by peer".into()));
        }
        self.inner.tracked_accounts(limit).await
    }
}

/// Store whose first call panics, then serves an in-memory set
pub struct PanicOnceStore {
    inner: InMemoryAccountStore,
    calls: AtomicUsize,
}

impl PanicOnceStore {
    pub fn new(accounts: Vec<TrackedAccount>) -> Self {
        Self {
            inner: InMemoryAccountStore::new(accounts),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountStore for PanicOnceStore {
    async fn tracked_accounts(&self, limit: usize) -> Result<Vec<TrackedAccount>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("row decoder hit an unexpected column type");
        }
        self.inner.tracked_accounts(limit).await
    }
}

/// Store whose fetch never completes; counts how often it was entered
#[derive(Default)]
pub struct StalledStore {
    calls: AtomicUsize,
}

impl StalledStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountStore for StalledStore {
    async fn tracked_accounts(&self, _limit: usize) -> Result<Vec<TrackedAccount>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

/// Auxiliary task that counts its runs
#[derive(Default)]
pub struct CountingAuxiliary {
    runs: AtomicUsize,
}

impl CountingAuxiliary {
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuxiliarySync for CountingAuxiliary {
    async fn run(&self) -> Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Observer that keeps every report and wakes waiters
#[derive(Default)]
pub struct RecordingObserver {
    reports: Mutex<Vec<(String, String)>>,
    notify: Notify,
}

impl RecordingObserver {
    /// `(error, context)` pairs in report order
    pub fn reports(&self) -> Vec<(String, String)> {
        self.reports.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }

    /// Wait until at least `n` failures were reported
    pub async fn wait_for_reports(&self, n: usize) {
        loop {
            let notified = self.notify.notified();
            if self.count() >= n {
                return;
            }
            notified.await;
        }
    }
}

impl FailureObserver for RecordingObserver {
    fn report(&self, error: &Error, context: &str) {
        self.reports
            .lock()
            .unwrap()
            .push((error.to_string(), context.to_string()));
        self.notify.notify_waiters();
    }
}
