//! In-memory match store: keeps the most recent calls

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::info;

use crate::game::EndReason;

use super::{MatchStore, StoreError};

/// A recorded persistence call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreCall {
    Start { match_id: i64 },
    Score { match_id: i64, p1: u32, p2: u32 },
    End { match_id: i64, reason: EndReason },
}

/// Calls kept before the oldest are evicted
pub const DEFAULT_CAPACITY: usize = 4096;

/// Store used when no persistence service is configured. Holds at most
/// `capacity` calls; older ones are dropped first.
pub struct InMemoryMatchStore {
    calls: Mutex<VecDeque<StoreCall>>,
    capacity: usize,
}

impl Default for InMemoryMatchStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl InMemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            calls: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY))),
            capacity,
        }
    }

    /// Number of calls currently held
    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    /// Calls recorded for one match
    pub fn calls_for(&self, match_id: i64) -> Vec<StoreCall> {
        self.calls
            .lock()
            .iter()
            .copied()
            .filter(|call| match *call {
                StoreCall::Start { match_id: id }
                | StoreCall::Score { match_id: id, .. }
                | StoreCall::End { match_id: id, .. } => id == match_id,
            })
            .collect()
    }

    fn record(&self, call: StoreCall) -> BoxFuture<'_, Result<(), StoreError>> {
        info!(?call, "Match history");
        let mut calls = self.calls.lock();
        if calls.len() == self.capacity {
            calls.pop_front();
        }
        calls.push_back(call);
        drop(calls);
        future::ready(Ok(())).boxed()
    }
}

impl MatchStore for InMemoryMatchStore {
    fn start_match(&self, match_id: i64) -> BoxFuture<'_, Result<(), StoreError>> {
        self.record(StoreCall::Start { match_id })
    }

    fn update_score(
        &self,
        match_id: i64,
        p1: u32,
        p2: u32,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        self.record(StoreCall::Score { match_id, p1, p2 })
    }

    fn end_match(&self, match_id: i64, reason: EndReason) -> BoxFuture<'_, Result<(), StoreError>> {
        self.record(StoreCall::End { match_id, reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn oldest_calls_are_evicted_at_capacity() {
        let store = InMemoryMatchStore::with_capacity(3);
        for match_id in 1..=5 {
            store.start_match(match_id).await.unwrap();
        }
        store.end_match(5, EndReason::ScoreLimit).await.unwrap();

        assert_eq!(store.len(), 3);
        assert!(store.calls_for(1).is_empty());
        assert!(store.calls_for(3).is_empty());
        assert_eq!(store.calls_for(4), vec![StoreCall::Start { match_id: 4 }]);
        assert_eq!(
            store.calls_for(5),
            vec![
                StoreCall::Start { match_id: 5 },
                StoreCall::End {
                    match_id: 5,
                    reason: EndReason::ScoreLimit
                },
            ]
        );
    }

    #[tokio::test]
    async fn default_store_stays_within_capacity() {
        let store = InMemoryMatchStore::new();
        for i in 0..(DEFAULT_CAPACITY as u32 + 10) {
            store.update_score(-1, i, 0).await.unwrap();
        }
        assert_eq!(store.len(), DEFAULT_CAPACITY);
        assert_eq!(
            store.calls_for(-1).last(),
            Some(&StoreCall::Score {
                match_id: -1,
                p1: DEFAULT_CAPACITY as u32 + 9,
                p2: 0
            })
        );
    }
}
