//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Track liveness (readable and writable from any task)
//! - Own the forwarder used to deliver requests to it

use axum::body::Body;
use axum::http::Response;
use std::sync::atomic::{AtomicBool, Ordering};
use url::Url;

use crate::http::request::ProxyRequest;
use crate::load_balancer::forwarder::{Forward, ForwardError};

/// A single backend server.
pub struct Backend {
    /// Base URL of the backend, immutable after creation.
    url: Url,
    /// `host:port` used for reachability probes.
    authority: String,
    /// Current liveness belief.
    alive: AtomicBool,
    forwarder: Box<dyn Forward>,
}

impl Backend {
    /// Create a new backend, initially alive.
    pub fn new(url: Url, forwarder: Box<dyn Forward>) -> Self {
        let host = url.host_str().unwrap_or_default();
        let authority = match url.port_or_known_default() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        Self {
            url,
            authority,
            alive: AtomicBool::new(true),
            forwarder,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Set liveness, returning the previous value.
    pub fn set_alive(&self, alive: bool) -> bool {
        self.alive.swap(alive, Ordering::AcqRel)
    }

    /// Forward a request through this backend's forwarder.
    pub async fn forward(&self, request: &ProxyRequest) -> Result<Response<Body>, ForwardError> {
        self.forwarder.forward(request).await
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("url", &self.url.as_str())
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use futures_util::future::BoxFuture;

    /// Forwarder that always answers 200 with an empty body.
    pub(crate) struct AlwaysOk;

    impl Forward for AlwaysOk {
        fn forward<'a>(
            &'a self,
            _request: &'a ProxyRequest,
        ) -> BoxFuture<'a, Result<Response<Body>, ForwardError>> {
            Box::pin(async { Ok(Response::new(Body::empty())) })
        }
    }

    pub(crate) fn backend(url: &str) -> Backend {
        Backend::new(Url::parse(url).unwrap(), Box::new(AlwaysOk))
    }

    #[test]
    fn starts_alive_and_flips() {
        let b = backend("http://127.0.0.1:3031");
        assert!(b.is_alive());

        assert!(b.set_alive(false));
        assert!(!b.is_alive());

        assert!(!b.set_alive(true));
        assert!(b.is_alive());
    }

    #[test]
    fn authority_uses_default_port() {
        assert_eq!(backend("http://example.com").authority(), "example.com:80");
        assert_eq!(backend("http://127.0.0.1:3031/api").authority(), "127.0.0.1:3031");
    }
}
