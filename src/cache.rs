//! Time-bounded snapshot cache with replace-on-write refresh.
//!
//! Holds at most one immutable snapshot. Readers clone the `Arc` under a
//! short read lock; a refresh builds the replacement without holding that
//! lock and swaps it in afterwards, so readers of a fresh snapshot are never
//! blocked by a download in progress. Concurrent misses are funnelled through
//! a refresh gate so only one of them reaches the upstream.

use std::future::Future;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::error::ConnectorError;

/// One cached value and the time its fetch started.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub value: T,
    pub fetched_at: DateTime<Utc>,
}

pub struct TtlCache<T> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    current: RwLock<Option<Arc<Snapshot<T>>>>,
    refresh_gate: Mutex<()>,
}

impl<T> TtlCache<T> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            current: RwLock::new(None),
            refresh_gate: Mutex::new(()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the current snapshot if it is still inside the TTL window.
    pub fn get(&self) -> Option<Arc<Snapshot<T>>> {
        let now = self.clock.now();
        let current = self.current.read().unwrap_or_else(|e| e.into_inner());
        current
            .as_ref()
            .filter(|snap| now - snap.fetched_at < self.ttl)
            .cloned()
    }

    /// Returns the fresh snapshot, loading a new one when it is missing or
    /// expired.
    ///
    /// # Errors
    ///
    /// Propagates the loader's error; the previous snapshot (if any) stays in
    /// place.
    pub async fn get_or_refresh<F, Fut>(&self, load: F) -> Result<Arc<Snapshot<T>>, ConnectorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ConnectorError>>,
    {
        if let Some(snap) = self.get() {
            return Ok(snap);
        }
        let _gate = self.refresh_gate.lock().await;
        // Another caller may have refreshed while we waited on the gate.
        if let Some(snap) = self.get() {
            return Ok(snap);
        }
        self.rebuild(load).await
    }

    /// Unconditionally loads and installs a new snapshot.
    ///
    /// # Errors
    ///
    /// Propagates the loader's error without touching the current snapshot.
    pub async fn refresh<F, Fut>(&self, load: F) -> Result<Arc<Snapshot<T>>, ConnectorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ConnectorError>>,
    {
        let _gate = self.refresh_gate.lock().await;
        self.rebuild(load).await
    }

    /// Drops the current snapshot so the next read refetches.
    pub fn invalidate(&self) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = None;
    }

    async fn rebuild<F, Fut>(&self, load: F) -> Result<Arc<Snapshot<T>>, ConnectorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ConnectorError>>,
    {
        let started = self.clock.now();
        let value = load().await?;
        let snap = Arc::new(Snapshot {
            value,
            fetched_at: started,
        });
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = Some(Arc::clone(&snap));
        Ok(snap)
    }
}
