//! Backend pool management.
//!
//! # Responsibilities
//! - Own the ordered, fixed set of backends
//! - Lock-free round-robin selection that skips dead backends
//! - Liveness updates by address (failover) and by probing (health checks)

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::{parse_backend_url, ProxyConfig, ValidationError};
use crate::health::probe::Probe;
use crate::load_balancer::backend::Backend;
use crate::load_balancer::forwarder::HttpForwarder;
use crate::observability::metrics;

/// Ordered collection of backends with a shared round-robin cursor.
#[derive(Debug, Default)]
pub struct ServerPool {
    backends: Vec<Arc<Backend>>,
    current: AtomicUsize,
}

impl ServerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool of HTTP backends in configuration order.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ValidationError> {
        let upstream_timeout = Duration::from_secs(config.timeouts.upstream_secs);
        let mut pool = Self::new();
        for raw in &config.backends {
            let url = parse_backend_url(raw)?;
            let forwarder = HttpForwarder::new(url.clone(), upstream_timeout);
            pool.add_backend(Backend::new(url, Box::new(forwarder)));
        }
        Ok(pool)
    }

    /// Append a backend. Only called while building the pool.
    pub fn add_backend(&mut self, backend: Backend) {
        tracing::info!(backend = %backend.url(), "Configured server");
        metrics::record_backend_alive(backend.url().as_str(), backend.is_alive());
        self.backends.push(Arc::new(backend));
    }

    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Advance the cursor and map it onto a backend index.
    pub fn next_index(&self) -> usize {
        let len = self.backends.len();
        if len == 0 {
            return 0;
        }
        self.current.fetch_add(1, Ordering::Relaxed).wrapping_add(1) % len
    }

    /// Select the next alive backend, scanning at most one full lap.
    pub fn get_next_peer(&self) -> Option<Arc<Backend>> {
        let len = self.backends.len();
        if len == 0 {
            return None;
        }

        let next = self.next_index();
        for i in next..next + len {
            let idx = i % len;
            let backend = &self.backends[idx];
            if backend.is_alive() {
                if i != next {
                    // Start the next scan from the backend we just found.
                    self.current.store(idx, Ordering::Relaxed);
                }
                return Some(backend.clone());
            }
        }
        None
    }

    /// Set the liveness of the backend with the given URL. Returns false if no backend matches.
    pub fn mark_backend_status(&self, url: &Url, alive: bool) -> bool {
        match self.backends.iter().find(|b| b.url() == url) {
            Some(backend) => {
                backend.set_alive(alive);
                metrics::record_backend_alive(url.as_str(), alive);
                true
            }
            None => {
                tracing::warn!(backend = %url, "Cannot mark status of unknown backend");
                false
            }
        }
    }

    /// Probe every backend in order and record the result.
    pub async fn health_check<P: Probe + ?Sized>(&self, probe: &P) {
        for backend in &self.backends {
            let alive = probe.probe(backend.authority()).await;
            let was_alive = backend.set_alive(alive);
            let status = if alive { "up" } else { "down" };

            if was_alive != alive {
                tracing::info!(backend = %backend.url(), status, transition = true, "Backend status changed");
            } else {
                tracing::info!(backend = %backend.url(), status, "Backend status");
            }
            metrics::record_backend_alive(backend.url().as_str(), alive);
        }
    }
}
