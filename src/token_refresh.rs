use crate::error::ApiError;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::{debug, warn};
use zeroize::Zeroize;

/// Outcome shared by every caller waiting on one refresh: the new access token.
pub type RefreshOutcome = Result<String, ApiError>;

enum RefreshState {
    Idle,
    Refreshing {
        waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
    },
}

/// Single-flight guard around the token refresh call.
///
/// The first caller runs the refresh; callers arriving while it is in
/// flight queue up and receive the same outcome, released in arrival order.
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RefreshState::Idle),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock(), RefreshState::Refreshing { .. })
    }

    /// Number of callers queued behind the in-flight refresh.
    pub fn pending(&self) -> usize {
        match &*self.lock() {
            RefreshState::Idle => 0,
            RefreshState::Refreshing { waiters } => waiters.len(),
        }
    }

    /// Run `refresh` unless one is already in flight, in which case wait for
    /// that one instead. `refresh` is only invoked by the leading caller.
    pub async fn run<F, Fut>(&self, refresh: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome>,
    {
        self.run_or_reuse(|| None, refresh).await
    }

    /// Like [`RefreshCoordinator::run`], but when no refresh is in flight
    /// `rotated` is consulted first, under the same lock. If it yields a
    /// token (a refresh settled since the caller's token went stale) that
    /// token is returned and no refresh starts.
    pub async fn run_or_reuse<R, F, Fut>(&self, rotated: R, refresh: F) -> RefreshOutcome
    where
        R: FnOnce() -> Option<String>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome>,
    {
        // Check-and-set happens under the lock, never across an await.
        let follower = {
            let mut state = self.lock();
            match &mut *state {
                RefreshState::Refreshing { waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push_back(tx);
                    debug!(queued = waiters.len(), "Waiting on in-flight token refresh");
                    Some(rx)
                }
                RefreshState::Idle => {
                    if let Some(current) = rotated() {
                        debug!("Access token already rotated; skipping refresh");
                        return Ok(current);
                    }
                    *state = RefreshState::Refreshing {
                        waiters: VecDeque::new(),
                    };
                    None
                }
            }
        };

        if let Some(rx) = follower {
            return rx
                .await
                .unwrap_or_else(|_| Err(ApiError::unknown("Token refresh was abandoned")));
        }

        let guard = SettleGuard {
            coordinator: self,
            settled: false,
        };
        let outcome = refresh().await;
        guard.settle(&outcome);
        outcome
    }

    fn release(&self, outcome: &RefreshOutcome) {
        let waiters = {
            let mut state = self.lock();
            match std::mem::replace(&mut *state, RefreshState::Idle) {
                RefreshState::Refreshing { waiters } => waiters,
                RefreshState::Idle => VecDeque::new(),
            }
        };

        if !waiters.is_empty() {
            debug!(count = waiters.len(), "Releasing queued requests");
        }
        for waiter in waiters {
            // A waiter whose request was dropped no longer cares.
            if let Err(Ok(mut token)) = waiter.send(outcome.clone()) {
                token.zeroize();
            }
        }
    }
}

/// Returns the coordinator to `Idle` however the leading refresh ends,
/// including the leader's future being dropped mid-flight.
struct SettleGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl SettleGuard<'_> {
    fn settle(mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        self.coordinator.release(outcome);
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Token refresh dropped before completion");
            self.coordinator
                .release(&Err(ApiError::unknown("Token refresh was abandoned")));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn wait_for_pending(coordinator: &RefreshCoordinator, n: usize) {
        while coordinator.pending() < n {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn single_caller_runs_refresh() {
        let coordinator = RefreshCoordinator::new();
        let outcome = coordinator.run(|| async { Ok("t2".to_string()) }).await;
        assert_eq!(outcome, Ok("t2".to_string()));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh_in_fifo_order() {
        let coordinator = Arc::new(RefreshCoordinator::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let order = Arc::new(Mutex::new(Vec::new()));
        let (gate_tx, gate_rx) = oneshot::channel::<()>();

        let leader = {
            let coordinator = coordinator.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                coordinator
                    .run(|| async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        let _ = gate_rx.await;
                        Ok("t2".to_string())
                    })
                    .await
            })
        };
        while !coordinator.is_refreshing() {
            tokio::task::yield_now().await;
        }

        let mut followers = Vec::new();
        for i in 0..4 {
            let follower = coordinator.clone();
            let calls = calls.clone();
            let order = order.clone();
            followers.push(tokio::spawn(async move {
                let outcome = follower
                    .run(|| async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok("unexpected".to_string())
                    })
                    .await;
                order.lock().unwrap().push(i);
                outcome
            }));
            wait_for_pending(&coordinator, i + 1).await;
        }

        gate_tx.send(()).unwrap();
        assert_eq!(leader.await.unwrap(), Ok("t2".to_string()));
        for f in followers {
            assert_eq!(f.await.unwrap(), Ok("t2".to_string()));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.pending(), 0);
    }

    #[tokio::test]
    async fn rotated_token_is_reused_without_refreshing() {
        let coordinator = RefreshCoordinator::new();
        let calls = AtomicUsize::new(0);

        let outcome = coordinator
            .run_or_reuse(
                || Some("t2".to_string()),
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("t3".to_string())
                },
            )
            .await;

        assert_eq!(outcome, Ok("t2".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn in_flight_refresh_wins_over_rotation_check() {
        let coordinator = Arc::new(RefreshCoordinator::new());
        let (gate_tx, gate_rx) = oneshot::channel::<()>();

        let leader = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .run(|| async move {
                        let _ = gate_rx.await;
                        Ok("t2".to_string())
                    })
                    .await
            })
        };
        while !coordinator.is_refreshing() {
            tokio::task::yield_now().await;
        }

        // A queued caller waits for the shared outcome; the rotation check
        // only applies once the coordinator is idle.
        let follower = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .run_or_reuse(|| Some("old".to_string()), || async { Ok("x".into()) })
                    .await
            })
        };
        wait_for_pending(&coordinator, 1).await;
        gate_tx.send(()).unwrap();

        assert_eq!(leader.await.unwrap(), Ok("t2".to_string()));
        assert_eq!(follower.await.unwrap(), Ok("t2".to_string()));
    }

    #[tokio::test]
    async fn failure_reaches_every_waiter_and_resets() {
        let coordinator = Arc::new(RefreshCoordinator::new());
        let (gate_tx, gate_rx) = oneshot::channel::<()>();

        let leader = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .run(|| async move {
                        let _ = gate_rx.await;
                        Err(ApiError::auth("refresh rejected"))
                    })
                    .await
            })
        };
        while !coordinator.is_refreshing() {
            tokio::task::yield_now().await;
        }
        let follower = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.run(|| async { Ok("x".into()) }).await })
        };
        wait_for_pending(&coordinator, 1).await;
        gate_tx.send(()).unwrap();

        let leader_err = leader.await.unwrap().unwrap_err();
        let follower_err = follower.await.unwrap().unwrap_err();
        assert_eq!(leader_err.kind(), ErrorKind::Auth);
        assert_eq!(follower_err, leader_err);
        assert!(!coordinator.is_refreshing());

        // A later refresh starts fresh.
        let again = coordinator.run(|| async { Ok("t3".into()) }).await;
        assert_eq!(again, Ok("t3".to_string()));
    }

    #[tokio::test]
    async fn dropped_leader_releases_waiters() {
        let coordinator = Arc::new(RefreshCoordinator::new());

        let leader = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .run(|| std::future::pending::<RefreshOutcome>())
                    .await
            })
        };
        while !coordinator.is_refreshing() {
            tokio::task::yield_now().await;
        }
        let follower = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.run(|| async { Ok("x".into()) }).await })
        };
        wait_for_pending(&coordinator, 1).await;

        leader.abort();
        let err = follower.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert!(!coordinator.is_refreshing());
    }
}
