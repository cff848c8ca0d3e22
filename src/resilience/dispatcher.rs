//! Per-request dispatch and failover.
//!
//! # State Machine
//! ```text
//! DISPATCHING
//!   → forward OK                        → SUCCESS
//!   → transport error, retries < max    → wait, retry same backend
//!   → transport error, retries == max   → mark backend dead, attempts += 1, reselect
//!   → attempts > max_attempts           → FAIL (attempts exhausted)
//!   → no alive backend                  → FAIL (no live peer)
//! ```
//!
//! The backend is marked dead only after its retry budget is spent and before
//! the next selection, so a request never reselects a backend it is still
//! retrying. Health-check writes can still race with selection.

use axum::body::Body;
use axum::http::Response;
use std::sync::Arc;
use thiserror::Error;

use crate::http::request::ProxyRequest;
use crate::load_balancer::backend::Backend;
use crate::load_balancer::forwarder::ForwardError;
use crate::load_balancer::pool::ServerPool;
use crate::observability::metrics;
use crate::resilience::retries::{AttemptState, RetryPolicy};

/// Terminal dispatch failures. Both are answered with 503.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("service not available: no live backend")]
    NoLivePeer,

    #[error("service not available: gave up after {tried} backends")]
    AttemptsExhausted { tried: u32 },
}

/// Wraps forwarding with same-backend retries and cross-backend failover.
#[derive(Debug, Clone)]
pub struct RetryDispatcher {
    pool: Arc<ServerPool>,
    policy: RetryPolicy,
}

impl RetryDispatcher {
    pub fn new(pool: Arc<ServerPool>, policy: RetryPolicy) -> Self {
        Self { pool, policy }
    }

    /// Dispatch a request, starting from the given attempt state.
    pub async fn dispatch(
        &self,
        request: &ProxyRequest,
        mut state: AttemptState,
    ) -> Result<Response<Body>, DispatchError> {
        loop {
            if state.attempts > self.policy.max_attempts {
                tracing::warn!(
                    request_id = %request.request_id(),
                    remote = %request.remote(),
                    path = %request.path(),
                    "Max attempts reached, terminating"
                );
                metrics::record_outcome("attempts_exhausted");
                return Err(DispatchError::AttemptsExhausted {
                    tried: state.attempts - 1,
                });
            }

            let Some(peer) = self.pool.get_next_peer() else {
                tracing::warn!(
                    request_id = %request.request_id(),
                    path = %request.path(),
                    "No live backend available"
                );
                metrics::record_outcome("no_live_peer");
                return Err(DispatchError::NoLivePeer);
            };

            match self.forward_with_retries(&peer, request, &mut state).await {
                Ok(response) => {
                    metrics::record_outcome("success");
                    return Ok(response);
                }
                Err(e) => {
                    self.pool.mark_backend_status(peer.url(), false);
                    metrics::record_marked_dead(peer.url().as_str());
                    tracing::warn!(
                        request_id = %request.request_id(),
                        backend = %peer.url(),
                        retries = state.retries,
                        error = %e,
                        "Backend exhausted, marked dead"
                    );

                    state = state.next_backend();
                    tracing::info!(
                        request_id = %request.request_id(),
                        remote = %request.remote(),
                        path = %request.path(),
                        attempt = state.attempts,
                        "Attempting retry"
                    );
                }
            }
        }
    }

    /// Forward to one backend, retrying transport failures until the retry budget is spent.
    async fn forward_with_retries(
        &self,
        backend: &Backend,
        request: &ProxyRequest,
        state: &mut AttemptState,
    ) -> Result<Response<Body>, ForwardError> {
        loop {
            let error = match backend.forward(request).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            metrics::record_forward_failure(backend.url().as_str());
            tracing::warn!(
                request_id = %request.request_id(),
                backend = %backend.url(),
                retry = state.retries,
                error = %error,
                "Forwarding failed"
            );

            if state.retries >= self.policy.max_retries {
                return Err(error);
            }
            tokio::time::sleep(self.policy.retry_delay).await;
            *state = state.next_retry();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::forwarder::Forward;
    use axum::http::{Method, StatusCode, Uri};
    use futures_util::future::BoxFuture;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::{Duration, Instant};
    use url::Url;

    /// Fails the first `failures` calls with a timeout, then answers with `status`.
    struct Scripted {
        calls: Arc<AtomicU32>,
        failures: u32,
        status: StatusCode,
    }

    impl Forward for Scripted {
        fn forward<'a>(
            &'a self,
            _request: &'a ProxyRequest,
        ) -> BoxFuture<'a, Result<Response<Body>, ForwardError>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let status = self.status;
            let fail = call < self.failures;
            Box::pin(async move {
                if fail {
                    Err(ForwardError::Timeout(Duration::from_millis(1)))
                } else {
                    let mut response = Response::new(Body::empty());
                    *response.status_mut() = status;
                    Ok(response)
                }
            })
        }
    }

    /// Builds a pool where backend `i` fails `failures[i]` times before answering 200.
    fn setup(failures: &[u32]) -> (Arc<ServerPool>, Vec<Arc<AtomicU32>>) {
        let mut pool = ServerPool::new();
        let mut counters = Vec::new();
        for (i, &f) in failures.iter().enumerate() {
            let calls = Arc::new(AtomicU32::new(0));
            counters.push(calls.clone());
            let url = Url::parse(&format!("http://127.0.0.1:{}", 6000 + i)).unwrap();
            pool.add_backend(Backend::new(
                url,
                Box::new(Scripted {
                    calls,
                    failures: f,
                    status: StatusCode::OK,
                }),
            ));
        }
        (Arc::new(pool), counters)
    }

    fn policy(delay_ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            retry_delay: Duration::from_millis(delay_ms),
            max_attempts: 3,
        }
    }

    fn request() -> ProxyRequest {
        ProxyRequest {
            method: Method::GET,
            uri: Uri::from_static("/"),
            headers: Default::default(),
            body: Default::default(),
            client_addr: None,
        }
    }

    fn calls(counters: &[Arc<AtomicU32>]) -> Vec<u32> {
        counters.iter().map(|c| c.load(Ordering::SeqCst)).collect()
    }

    #[tokio::test]
    async fn success_on_first_try() {
        let (pool, counters) = setup(&[0, 0]);
        let dispatcher = RetryDispatcher::new(pool.clone(), policy(1));

        let response = dispatcher.dispatch(&request(), AttemptState::default()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls(&counters).iter().sum::<u32>(), 1);
        assert!(pool.backends().iter().all(|b| b.is_alive()));
    }

    #[tokio::test]
    async fn transient_failures_retry_same_backend() {
        // Cursor starts so that backend 1 is picked first.
        let (pool, counters) = setup(&[0, 2]);
        let dispatcher = RetryDispatcher::new(pool.clone(), policy(1));

        let response = dispatcher.dispatch(&request(), AttemptState::default()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls(&counters), vec![0, 3]);
        assert!(pool.backends()[1].is_alive());
    }

    #[tokio::test]
    async fn retry_budget_exhaustion_marks_dead_and_fails_over() {
        let (pool, counters) = setup(&[0, u32::MAX]);
        let dispatcher = RetryDispatcher::new(pool.clone(), policy(5));

        let started = Instant::now();
        let response = dispatcher.dispatch(&request(), AttemptState::default()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // One initial forward plus exactly three retries, each after the delay.
        assert_eq!(calls(&counters), vec![1, 4]);
        assert!(started.elapsed() >= Duration::from_millis(15));
        assert!(!pool.backends()[1].is_alive());
        assert!(pool.backends()[0].is_alive());
    }

    #[tokio::test]
    async fn application_errors_are_not_retried() {
        let mut pool = ServerPool::new();
        let calls = Arc::new(AtomicU32::new(0));
        pool.add_backend(Backend::new(
            Url::parse("http://127.0.0.1:6100").unwrap(),
            Box::new(Scripted {
                calls: calls.clone(),
                failures: 0,
                status: StatusCode::INTERNAL_SERVER_ERROR,
            }),
        ));
        let dispatcher = RetryDispatcher::new(Arc::new(pool), policy(1));

        let response = dispatcher.dispatch(&request(), AttemptState::default()).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn attempts_ceiling_bounds_distinct_backends() {
        let (pool, counters) = setup(&[u32::MAX; 5]);
        let dispatcher = RetryDispatcher::new(pool.clone(), policy(1));

        let err = dispatcher.dispatch(&request(), AttemptState::default()).await.unwrap_err();
        assert_eq!(err, DispatchError::AttemptsExhausted { tried: 3 });

        let per_backend = calls(&counters);
        assert_eq!(per_backend.iter().filter(|&&c| c == 4).count(), 3);
        assert_eq!(per_backend.iter().filter(|&&c| c == 0).count(), 2);
        assert_eq!(pool.backends().iter().filter(|b| !b.is_alive()).count(), 3);
    }

    #[tokio::test]
    async fn exhausting_every_backend_reports_no_live_peer() {
        let (pool, counters) = setup(&[u32::MAX; 2]);
        let dispatcher = RetryDispatcher::new(pool.clone(), policy(1));

        let err = dispatcher.dispatch(&request(), AttemptState::default()).await.unwrap_err();
        assert_eq!(err, DispatchError::NoLivePeer);
        assert_eq!(calls(&counters), vec![4, 4]);
        assert!(pool.backends().iter().all(|b| !b.is_alive()));
    }

    #[tokio::test]
    async fn all_dead_pool_fails_without_forwarding() {
        let (pool, counters) = setup(&[0, 0]);
        for b in pool.backends() {
            b.set_alive(false);
        }
        let dispatcher = RetryDispatcher::new(pool, policy(1));

        let err = dispatcher.dispatch(&request(), AttemptState::default()).await.unwrap_err();
        assert_eq!(err, DispatchError::NoLivePeer);
        assert_eq!(calls(&counters), vec![0, 0]);
    }

    #[tokio::test]
    async fn state_past_ceiling_fails_immediately() {
        let (pool, counters) = setup(&[0]);
        let dispatcher = RetryDispatcher::new(pool, policy(1));

        let state = AttemptState { attempts: 4, retries: 0 };
        let err = dispatcher.dispatch(&request(), state).await.unwrap_err();
        assert_eq!(err, DispatchError::AttemptsExhausted { tried: 3 });
        assert_eq!(calls(&counters), vec![0]);
    }
}
