//! Persistence collaborator for match history

pub mod memory;
pub mod rest;

pub use memory::{InMemoryMatchStore, StoreCall};
pub use rest::RestMatchStore;

use futures::future::BoxFuture;
use std::future::Future;
use tracing::warn;

use crate::game::EndReason;

/// Match history persistence. Calls are made fire-and-forget from the
/// match loop; their results are only logged.
pub trait MatchStore: Send + Sync + 'static {
    fn start_match(&self, match_id: i64) -> BoxFuture<'_, Result<(), StoreError>>;

    fn update_score(&self, match_id: i64, p1: u32, p2: u32)
        -> BoxFuture<'_, Result<(), StoreError>>;

    fn end_match(&self, match_id: i64, reason: EndReason) -> BoxFuture<'_, Result<(), StoreError>>;
}

/// Run a store call in the background, logging failure.
/// Outside a tokio runtime the call is dropped with a warning.
pub fn dispatch<F>(match_id: i64, operation: &'static str, call: F)
where
    F: Future<Output = Result<(), StoreError>> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn(async move {
                if let Err(e) = call.await {
                    warn!(match_id, operation, error = %e, "Persistence call failed");
                }
            });
        }
        Err(_) => {
            warn!(match_id, operation, "No runtime, persistence call dropped");
        }
    }
}

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },
}
