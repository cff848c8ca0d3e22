//! Request forwarding to a single backend.
//!
//! # Responsibilities
//! - Define the capability a Backend uses to deliver a request
//! - Rewrite the request URI onto the backend's base URL
//! - Bound each attempt with the upstream timeout
//! - Classify failures as transport errors (retryable) vs. responses (final)

use axum::body::Body;
use axum::http::uri::{PathAndQuery, Scheme};
use axum::http::{Request, Response, Uri};
use futures_util::future::BoxFuture;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::http::request::{remove_hop_headers, ProxyRequest};

/// A failed forwarding attempt. Any HTTP status from the backend, including 5xx,
/// is a successful forward and never surfaces here.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("transport error: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),
}

/// Delivers a buffered request to one fixed upstream.
pub trait Forward: Send + Sync {
    fn forward<'a>(
        &'a self,
        request: &'a ProxyRequest,
    ) -> BoxFuture<'a, Result<Response<Body>, ForwardError>>;
}

/// Forwarder speaking HTTP/1.1 to a single backend.
pub struct HttpForwarder {
    target: Url,
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl HttpForwarder {
    /// Create a forwarder with its own connection pool.
    pub fn new(target: Url, timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self {
            target,
            client,
            timeout,
        }
    }

    /// Build the URI the backend sees: backend scheme/authority, joined path, request query.
    fn upstream_uri(&self, uri: &Uri) -> Result<Uri, axum::http::Error> {
        let path = join_paths(self.target.path(), uri.path());
        let path_and_query = match uri.query() {
            Some(query) => format!("{}?{}", path, query),
            None => path,
        };

        let authority = match self.target.port() {
            Some(port) => format!("{}:{}", self.target.host_str().unwrap_or_default(), port),
            None => self.target.host_str().unwrap_or_default().to_string(),
        };

        Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(authority)
            .path_and_query(PathAndQuery::try_from(path_and_query)?)
            .build()
    }

    async fn send(&self, request: &ProxyRequest) -> Result<Response<Body>, ForwardError> {
        let mut builder = Request::builder()
            .method(request.method.clone())
            .uri(self.upstream_uri(&request.uri)?);
        if let Some(headers) = builder.headers_mut() {
            *headers = request.upstream_headers();
        }
        let upstream = builder.body(Body::from(request.body.clone()))?;

        match tokio::time::timeout(self.timeout, self.client.request(upstream)).await {
            Ok(Ok(response)) => Ok(into_downstream(response)),
            Ok(Err(e)) => Err(ForwardError::Transport(e)),
            Err(_) => Err(ForwardError::Timeout(self.timeout)),
        }
    }
}

impl Forward for HttpForwarder {
    fn forward<'a>(
        &'a self,
        request: &'a ProxyRequest,
    ) -> BoxFuture<'a, Result<Response<Body>, ForwardError>> {
        Box::pin(self.send(request))
    }
}

impl std::fmt::Debug for HttpForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpForwarder")
            .field("target", &self.target.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn into_downstream(response: Response<Incoming>) -> Response<Body> {
    let (mut parts, body) = response.into_parts();
    remove_hop_headers(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}

/// Join a backend base path and a request path with exactly one slash between them.
fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}
