//! HTTP stack: request ids, tracing spans, timeouts and graceful serving.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{HeaderName, Request};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::field::Empty;

pub fn request_id_header() -> HeaderName {
    HeaderName::from_static(apikit::REQUEST_ID_HEADER)
}

#[derive(Clone, Default)]
pub struct MakeReqId;

impl MakeRequestId for MakeReqId {
    fn make_request_id<B>(&mut self, _req: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        Some(RequestId::new(id.parse().ok()?))
    }
}

fn request_span(req: &Request<Body>) -> tracing::Span {
    let rid = req
        .headers()
        .get(request_id_header())
        .and_then(|v| v.to_str().ok())
        .unwrap_or("n/a");
    tracing::info_span!(
        "http_request",
        method = %req.method(),
        endpoint = %req.uri().path(),
        request_id = %rid,
        status = Empty,
        latency_ms = Empty
    )
}

/// Wrap module routes with the shared middleware stack.
///
/// Outermost first: propagate id, set id, trace, request-id scope for problem
/// documents, timeout.
pub fn with_middleware(mut router: Router, request_timeout: Option<Duration>) -> Router {
    if let Some(t) = request_timeout {
        router = router.layer(TimeoutLayer::new(t));
    }
    router
        .layer(axum::middleware::from_fn(apikit::request_id_scope))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(SetRequestIdLayer::new(request_id_header(), MakeReqId))
        .layer(PropagateRequestIdLayer::new(request_id_header()))
}

/// Serve until `shutdown` fires. In-flight requests then get `grace` to
/// finish before `queries` is cancelled, which aborts their database work.
pub async fn serve(
    router: Router,
    addr: SocketAddr,
    shutdown: CancellationToken,
    queries: CancellationToken,
    grace: Duration,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("HTTP server bound on {}", addr);

    let graceful = {
        let shutdown = shutdown.clone();
        async move {
            shutdown.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully");
        }
    };
    let server = axum::serve(listener, router)
        .with_graceful_shutdown(graceful)
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        res = &mut server => res?,
        _ = async {
            shutdown.cancelled().await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(grace_sec = grace.as_secs(), "grace period elapsed, cancelling outstanding queries");
            queries.cancel();
            server.await?;
        }
    }
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM, then cancel `token`.
pub async fn wait_for_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
    token.cancel();
}
