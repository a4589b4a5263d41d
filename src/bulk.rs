//! Fail-independent bulk operations.
//!
//! A bulk operation applies the same mutation to many identified entities.
//! Every identifier is processed in order, one at a time, and a failure on one
//! item never aborts or rolls back the others. The caller receives a
//! [`BulkOperationResult`] whose `results[i]` describes `ids[i]`.

use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde::{Deserialize, Serialize};

/// Recorded when an item fails without a usable message.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Aggregate outcome of a bulk operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkOperationResult<T> {
    pub success: usize,
    pub failed: usize,
    pub results: Vec<ItemOutcome<T>>,
}

/// Per-item outcome. Serializes as the entity itself on success, or as
/// `{ "id": ..., "error": ... }` on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemOutcome<T> {
    Failed(ItemFailure),
    Updated(T),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub id: String,
    pub error: String,
}

impl<T> BulkOperationResult<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            success: 0,
            failed: 0,
            results: Vec::with_capacity(capacity),
        }
    }

    pub fn record_success(&mut self, entity: T) {
        self.success += 1;
        self.results.push(ItemOutcome::Updated(entity));
    }

    pub fn record_failure(&mut self, id: impl Into<String>, error: impl Into<String>) {
        self.failed += 1;
        self.results.push(ItemOutcome::Failed(ItemFailure {
            id: id.into(),
            error: error.into(),
        }));
    }

    pub fn total(&self) -> usize {
        self.success + self.failed
    }

    /// Failures in input order
    pub fn failures(&self) -> impl Iterator<Item = &ItemFailure> {
        self.results.iter().filter_map(|outcome| match outcome {
            ItemOutcome::Failed(failure) => Some(failure),
            ItemOutcome::Updated(_) => None,
        })
    }
}

impl<T> Default for BulkOperationResult<T> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<T> ItemOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Updated(_))
    }

    pub fn entity(&self) -> Option<&T> {
        match self {
            ItemOutcome::Updated(entity) => Some(entity),
            ItemOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ItemFailure> {
        match self {
            ItemOutcome::Failed(failure) => Some(failure),
            ItemOutcome::Updated(_) => None,
        }
    }
}

/// Run `op` once per identifier, sequentially, collecting every outcome.
///
/// An `Err` is recorded with its display message. An error with an empty
/// message, or an executor that panics, is recorded as [`UNKNOWN_ERROR`];
/// the panic payload is logged so it is not lost entirely.
pub async fn run_bulk<T, E, F, Fut>(ids: &[String], mut op: F) -> BulkOperationResult<T>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut report = BulkOperationResult::with_capacity(ids.len());

    for id in ids {
        let attempt = AssertUnwindSafe(async { op(id.clone()).await })
            .catch_unwind()
            .await;

        match attempt {
            Ok(Ok(entity)) => report.record_success(entity),
            Ok(Err(err)) => {
                let message = err.to_string();
                if message.trim().is_empty() {
                    tracing::warn!("Bulk item {} failed with an empty error message", id);
                    report.record_failure(id.as_str(), UNKNOWN_ERROR);
                } else {
                    tracing::debug!("Bulk item {} failed: {}", id, message);
                    report.record_failure(id.as_str(), message);
                }
            }
            Err(payload) => {
                tracing::warn!(
                    "Bulk item {} panicked: {}",
                    id,
                    describe_panic(payload.as_ref())
                );
                report.record_failure(id.as_str(), UNKNOWN_ERROR);
            }
        }
    }

    tracing::info!(
        "Bulk operation finished: {} succeeded, {} failed",
        report.success,
        report.failed
    );
    report
}

fn describe_panic(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Entity {
        id: String,
        status: String,
    }

    #[derive(Debug, thiserror::Error)]
    enum FakeError {
        #[error("User not found")]
        NotFound,
        #[error("")]
        Silent,
    }

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn entity(id: &str) -> Entity {
        Entity {
            id: id.to_string(),
            status: "inactive".to_string(),
        }
    }

    #[tokio::test]
    async fn empty_input_never_invokes_executor() {
        let calls = AtomicUsize::new(0);
        let report = run_bulk(&[], |id| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, FakeError>(entity(&id)) }
        })
        .await;

        assert_eq!(report, BulkOperationResult::default());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn mixed_outcomes_preserve_input_order() {
        let input = ids(&["user-1", "user-2", "user-3"]);
        let report = run_bulk(&input, |id| async move {
            if id == "user-2" {
                Err(FakeError::NotFound)
            } else {
                Ok(entity(&id))
            }
        })
        .await;

        assert_eq!(report.success, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "success": 2,
                "failed": 1,
                "results": [
                    {"id": "user-1", "status": "inactive"},
                    {"id": "user-2", "error": "User not found"},
                    {"id": "user-3", "status": "inactive"}
                ]
            })
        );
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(7)]
    #[tokio::test]
    async fn counts_always_cover_every_input(#[case] n: usize) {
        let input: Vec<String> = (0..n).map(|i| format!("id-{}", i)).collect();
        let report = run_bulk(&input, |id| async move {
            let index: usize = id.trim_start_matches("id-").parse().unwrap();
            if index % 2 == 0 {
                Ok(entity(&id))
            } else {
                Err(FakeError::NotFound)
            }
        })
        .await;

        assert_eq!(report.results.len(), n);
        assert_eq!(report.total(), n);
        for (i, outcome) in report.results.iter().enumerate() {
            match outcome {
                ItemOutcome::Updated(e) => assert_eq!(e.id, input[i]),
                ItemOutcome::Failed(f) => assert_eq!(f.id, input[i]),
            }
        }
    }

    #[tokio::test]
    async fn all_success() {
        let input = ids(&["a", "b"]);
        let report = run_bulk(&input, |id| async move { Ok::<_, FakeError>(entity(&id)) }).await;

        assert_eq!(report.failed, 0);
        assert!(report.results.iter().all(ItemOutcome::is_success));
        assert_eq!(report.results[1].entity(), Some(&entity("b")));
    }

    #[tokio::test]
    async fn all_failure() {
        let input = ids(&["a", "b", "c"]);
        let report = run_bulk(&input, |_id| async move { Err::<Entity, _>(FakeError::NotFound) }).await;

        assert_eq!(report.success, 0);
        assert_eq!(report.failed, 3);
        assert_eq!(report.failures().count(), 3);
        assert!(report.failures().all(|f| f.error == "User not found"));
    }

    #[tokio::test]
    async fn panicking_executor_is_recorded_as_unknown_error() {
        let input = ids(&["ok-1", "boom", "ok-2"]);
        let report = run_bulk(&input, |id| async move {
            if id == "boom" {
                panic!("a bare string, not an error");
            }
            Ok::<_, FakeError>(entity(&id))
        })
        .await;

        assert_eq!(report.success, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(
            report.results[1].failure(),
            Some(&ItemFailure {
                id: "boom".to_string(),
                error: UNKNOWN_ERROR.to_string(),
            })
        );
    }

    #[tokio::test]
    async fn empty_error_message_falls_back_to_unknown_error() {
        let input = ids(&["x"]);
        let report = run_bulk(&input, |_id| async move { Err::<Entity, _>(FakeError::Silent) }).await;

        assert_eq!(report.results[0].failure().unwrap().error, UNKNOWN_ERROR);
    }

    #[tokio::test]
    async fn processes_items_sequentially() {
        let in_flight = AtomicUsize::new(0);
        let max_seen = AtomicUsize::new(0);
        let input = ids(&["a", "b", "c", "d"]);

        let report = run_bulk(&input, |id| {
            let in_flight = &in_flight;
            let max_seen = &max_seen;
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, FakeError>(entity(&id))
            }
        })
        .await;

        assert_eq!(report.success, 4);
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
