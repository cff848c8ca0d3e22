//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the backend pool and dispatcher from configuration
//! - Create the Axum Router with the single catch-all ingress handler
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Start the health monitor and serve until shutdown

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ensure_valid, ConfigError, ProxyConfig};
use crate::health::active::HealthMonitor;
use crate::http::request::{MakeRequestUuid, ProxyRequest, X_REQUEST_ID};
use crate::http::response;
use crate::lifecycle::ShutdownSignal;
use crate::load_balancer::pool::ServerPool;
use crate::resilience::dispatcher::RetryDispatcher;
use crate::resilience::retries::{AttemptState, RetryPolicy};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<RetryDispatcher>,
}

/// HTTP ingress for the load balancer.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    pool: Arc<ServerPool>,
}

impl HttpServer {
    /// Validate the configuration and build the pool, dispatcher and router.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigError> {
        ensure_valid(&config)?;
        let pool = ServerPool::from_config(&config)
            .map_err(|e| ConfigError::Validation(vec![e]))?;
        let pool = Arc::new(pool);

        let dispatcher = RetryDispatcher::new(pool.clone(), RetryPolicy::from(&config.retries));
        let state = AppState {
            dispatcher: Arc::new(dispatcher),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            pool,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(RequestBodyLimitLayer::new(config.limits.max_body_size))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server on the given listener until the shutdown signal fires.
    pub async fn run(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Load Balancer started");

        if self.config.health_check.enabled {
            let monitor = HealthMonitor::new(self.pool.clone(), &self.config.health_check);
            tokio::spawn(monitor.run(shutdown.clone()));
        } else {
            tracing::info!("Active health checks disabled");
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        let mut signal = shutdown;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { signal.recv().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }
}

/// Ingress handler: buffer the request and hand it to the dispatcher.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let request = match ProxyRequest::from_request(request, Some(client)).await {
        Ok(request) => request,
        Err(e) => return response::unreadable_body(e),
    };

    tracing::debug!(
        request_id = %request.request_id(),
        method = %request.method,
        path = %request.path(),
        "Proxying request"
    );

    match state.dispatcher.dispatch(&request, AttemptState::default()).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}
