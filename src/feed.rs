//! Feed lifecycle state.
//!
//! [`FeedStore`] owns the loading/error/data state of the earthquake feed
//! and publishes every transition on a `watch` channel. Fetches are only
//! issued on mount and on explicit refetch; there is no polling.
//!
//! Every request takes a generation number. Only the most recently issued
//! request may commit, so a slow response can never overwrite a newer one.
//! Issuing and committing both happen under the channel's write lock.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::client::FeedSource;
use crate::errors::QuakelensError;
use crate::models::FeedSnapshot;

/// User-facing message for every fetch failure.
pub const FETCH_ERROR_MESSAGE: &str =
    "Failed to fetch earthquake data. Please check your internet connection and try again.";

/// Where the feed is in its fetch lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Observable feed state.
#[derive(Debug, Clone, Default)]
pub struct FeedState {
    pub phase: FeedPhase,
    /// Latest committed snapshot; kept across failed refetches
    pub snapshot: Option<Arc<FeedSnapshot>>,
    pub error: Option<String>,
    /// Generation of the most recently issued request; 0 before the first
    pub request: u64,
}

impl FeedState {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase == FeedPhase::Loading
    }
}

/// Token identifying one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(u64);

struct Inner<S> {
    source: S,
    state: watch::Sender<FeedState>,
}

/// Cloneable handle to the feed state machine.
pub struct FeedStore<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for FeedStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: FeedSource> FeedStore<S> {
    /// Create an idle store. Nothing is fetched until [`refetch`](Self::refetch).
    #[must_use]
    pub fn new(source: S) -> Self {
        let (state, _) = watch::channel(FeedState::default());
        Self {
            inner: Arc::new(Inner { source, state }),
        }
    }

    /// Create a store that is already loading and spawn its first fetch.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn mount(source: S) -> Self {
        let store = Self::new(source);
        let token = store.begin();
        let task = store.clone();
        tokio::spawn(async move {
            let result = task.inner.source.fetch_snapshot().await;
            task.complete(token, result);
        });
        store
    }

    /// Issue one request and commit its outcome if it is still the latest.
    pub async fn refetch(&self) {
        let token = self.begin();
        let result = self.inner.source.fetch_snapshot().await;
        self.complete(token, result);
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> FeedState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.inner.state.subscribe()
    }

    /// Enter `Loading` and clear any previous error.
    pub(crate) fn begin(&self) -> RequestToken {
        let mut issued = 0;
        self.inner.state.send_modify(|state| {
            state.request += 1;
            issued = state.request;
            state.phase = FeedPhase::Loading;
            state.error = None;
        });
        debug!(request = issued, "feed request issued");
        RequestToken(issued)
    }

    /// Commit a request outcome. Outcomes of superseded requests are dropped.
    pub(crate) fn complete(&self, token: RequestToken, result: Result<FeedSnapshot, QuakelensError>) {
        let result = result.map(Arc::new);
        let committed = self.inner.state.send_if_modified(|state| {
            if state.request != token.0 {
                return false;
            }
            match &result {
                Ok(snapshot) => {
                    state.phase = FeedPhase::Ready;
                    state.snapshot = Some(Arc::clone(snapshot));
                    state.error = None;
                }
                Err(_) => {
                    state.phase = FeedPhase::Failed;
                    state.error = Some(FETCH_ERROR_MESSAGE.to_string());
                }
            }
            true
        });

        match (committed, &result) {
            (false, _) => debug!(request = token.0, "dropping superseded feed response"),
            (true, Ok(snapshot)) => {
                info!(request = token.0, events = snapshot.len(), "feed snapshot loaded");
            }
            (true, Err(e)) => error!(request = token.0, "error fetching earthquake data: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use tokio::sync::oneshot;

    use super::*;
    use crate::models::tests::{event, snapshot};

    /// Source that answers from a scripted queue.
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<FeedSnapshot, QuakelensError>>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<FeedSnapshot, QuakelensError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    impl FeedSource for ScriptedSource {
        async fn fetch_snapshot(&self) -> Result<FeedSnapshot, QuakelensError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(QuakelensError::Api { status: 503 }))
        }
    }

    /// Source whose single response is released by the test.
    struct GatedSource {
        gate: Mutex<Option<oneshot::Receiver<FeedSnapshot>>>,
    }

    impl FeedSource for GatedSource {
        async fn fetch_snapshot(&self) -> Result<FeedSnapshot, QuakelensError> {
            let gate = self.gate.lock().unwrap().take();
            match gate {
                Some(rx) => rx.await.map_err(|_| QuakelensError::Api { status: 499 }),
                None => Err(QuakelensError::Api { status: 500 }),
            }
        }
    }

    fn one_event(id: &str) -> FeedSnapshot {
        snapshot(vec![event(id, Some(3.0), 1.0, 1.0)])
    }

    #[tokio::test]
    async fn test_mount_starts_loading() {
        let (tx, rx) = oneshot::channel();
        let store = FeedStore::mount(GatedSource {
            gate: Mutex::new(Some(rx)),
        });

        let state = store.state();
        assert!(state.is_loading());
        assert!(state.snapshot.is_none());
        assert!(state.error.is_none());

        let mut changes = store.subscribe();
        tx.send(one_event("x")).unwrap();
        changes
            .wait_for(|s| s.phase == FeedPhase::Ready)
            .await
            .unwrap();

        let state = store.state();
        assert!(!state.is_loading());
        assert_eq!(state.snapshot.unwrap().events[0].id, "x");
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_success_then_failure_keeps_snapshot() {
        let store = FeedStore::new(ScriptedSource::new(vec![
            Ok(one_event("first")),
            Err(QuakelensError::Api { status: 500 }),
        ]));
        assert_eq!(store.state().phase, FeedPhase::Idle);

        store.refetch().await;
        let state = store.state();
        assert_eq!(state.phase, FeedPhase::Ready);
        assert_eq!(state.error, None);

        store.refetch().await;
        let state = store.state();
        assert_eq!(state.phase, FeedPhase::Failed);
        assert!(!state.is_loading());
        assert_eq!(state.error.as_deref(), Some(FETCH_ERROR_MESSAGE));
        assert_eq!(state.snapshot.unwrap().events[0].id, "first");
    }

    #[tokio::test]
    async fn test_failure_without_prior_snapshot() {
        let store = FeedStore::new(ScriptedSource::new(vec![Err(QuakelensError::InvalidResponse(
            "bad".into(),
        ))]));
        store.refetch().await;
        let state = store.state();
        assert_eq!(state.phase, FeedPhase::Failed);
        assert!(state.snapshot.is_none());
    }

    #[tokio::test]
    async fn test_refetch_replaces_snapshot_and_clears_error() {
        let store = FeedStore::new(ScriptedSource::new(vec![
            Err(QuakelensError::Api { status: 502 }),
            Ok(one_event("second")),
        ]));
        store.refetch().await;
        assert!(store.state().error.is_some());

        let token = store.begin();
        assert!(store.state().error.is_none());
        assert!(store.state().is_loading());
        store.complete(token, Ok(one_event("second")));

        let state = store.state();
        assert_eq!(state.phase, FeedPhase::Ready);
        assert_eq!(state.snapshot.unwrap().events[0].id, "second");
    }

    #[tokio::test]
    async fn test_only_latest_request_commits() {
        let store = FeedStore::new(ScriptedSource::new(vec![]));

        let first = store.begin();
        let second = store.begin();

        store.complete(second, Ok(one_event("new")));
        assert_eq!(store.state().phase, FeedPhase::Ready);

        // The older request resolves last and must not win.
        store.complete(first, Ok(one_event("old")));
        let state = store.state();
        assert_eq!(state.snapshot.unwrap().events[0].id, "new");

        let third = store.begin();
        store.complete(first, Err(QuakelensError::Api { status: 500 }));
        assert!(store.state().is_loading());
        store.complete(third, Ok(one_event("newest")));
        assert_eq!(store.state().snapshot.unwrap().events[0].id, "newest");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_never_commit_stale_data() {
        let store = FeedStore::new(ScriptedSource::new(vec![]));

        let tasks: Vec<_> = (0..64)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    let token = store.begin();
                    tokio::task::yield_now().await;
                    store.complete(token, Ok(one_event(&token.0.to_string())));

                    // A committed snapshot always belongs to the latest request.
                    let state = store.state();
                    if state.phase == FeedPhase::Ready {
                        let snapshot = state.snapshot.unwrap();
                        assert_eq!(snapshot.events[0].id, state.request.to_string());
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let state = store.state();
        assert_eq!(state.request, 64);
        assert_eq!(state.phase, FeedPhase::Ready);
        assert_eq!(state.snapshot.unwrap().events[0].id, "64");
    }
}
