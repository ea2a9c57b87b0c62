//! Serialization of cart mutations.
//!
//! At most one mutation is in flight at a time. Waiters are admitted in
//! arrival order (tokio's mutex is fair). Mutations that carry a coalescing
//! key form a depth-1 queue per key: when a newer request with the same key
//! queues up behind an older one that has not started yet, the older one is
//! dropped with [`CommerceError::Superseded`] as soon as it reaches the front.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use solemate_core::CartLineId;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use tracing::debug;

use crate::error::CommerceError;

/// Lock a std mutex, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fair mutation gate with per-line coalescing.
#[derive(Debug, Default)]
pub struct MutationGate {
    serial: AsyncMutex<()>,
    latest: Mutex<HashMap<CartLineId, u64>>,
    tickets: AtomicU64,
}

/// Held while a mutation is in flight.
#[derive(Debug)]
pub struct GatePass<'a> {
    gate: &'a MutationGate,
    key: Option<(CartLineId, u64)>,
    _serial: AsyncMutexGuard<'a, ()>,
}

impl MutationGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::Superseded`] if a newer request for the same
    /// key was queued while this one waited.
    pub async fn enter(&self, key: Option<CartLineId>) -> Result<GatePass<'_>, CommerceError> {
        let ticket = key.map(|line| {
            let ticket = self.tickets.fetch_add(1, Ordering::Relaxed);
            lock(&self.latest).insert(line, ticket);
            (line, ticket)
        });

        let serial = self.serial.lock().await;

        if let Some((line, ticket)) = ticket {
            let current = lock(&self.latest).get(&line).copied();
            if current != Some(ticket) {
                debug!(cart_line_id = %line, "Dropping superseded cart mutation");
                return Err(CommerceError::Superseded);
            }
        }

        Ok(GatePass {
            gate: self,
            key: ticket,
            _serial: serial,
        })
    }

    /// Whether a mutation currently holds the gate.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.serial.try_lock().is_err()
    }
}

impl Drop for GatePass<'_> {
    fn drop(&mut self) {
        if let Some((line, ticket)) = self.key {
            let mut latest = lock(&self.gate.latest);
            if latest.get(&line) == Some(&ticket) {
                latest.remove(&line);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_single_pass() {
        let gate = MutationGate::new();
        let pass = gate.enter(Some(CartLineId::new(1))).await.unwrap();
        assert!(gate.is_busy());
        drop(pass);
        assert!(!gate.is_busy());
        assert!(lock(&gate.latest).is_empty());
    }

    #[tokio::test]
    async fn test_unkeyed_requests_never_coalesce() {
        let gate = Arc::new(MutationGate::new());
        let first = gate.enter(None).await.unwrap();

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.enter(None).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(first);
        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_queued_change_superseded_by_newer_one() {
        let gate = Arc::new(MutationGate::new());
        let line = CartLineId::new(7);
        let in_flight = gate.enter(Some(line)).await.unwrap();

        let older = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.enter(Some(line)).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let newer = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.enter(Some(line)).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(in_flight);
        assert!(matches!(
            older.await.unwrap(),
            Err(CommerceError::Superseded)
        ));
        assert!(newer.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_other_lines_do_not_supersede() {
        let gate = Arc::new(MutationGate::new());
        let in_flight = gate.enter(None).await.unwrap();

        let first = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.enter(Some(CartLineId::new(1))).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.enter(Some(CartLineId::new(2))).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(in_flight);
        assert!(first.await.unwrap().is_ok());
        assert!(second.await.unwrap().is_ok());
    }
}
