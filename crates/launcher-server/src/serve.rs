//! Shared listener and serve loop for both servers.

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Router;
use crew_launcher::config::ServerConfig;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tower::limit::ConcurrencyLimitLayer;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Bind a listener on `host:port` (port 0 = OS-assigned).
pub async fn bind(host: &str, port: u16) -> anyhow::Result<TcpListener> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Serve `router` until `shutdown` resolves.
///
/// Requests are handled one at a time and every connection carries a single
/// request. Once `shutdown` resolves the listener is closed, connections with
/// a request in flight get up to `ServerConfig::SHUTDOWN_FLUSH_TIMEOUT` to
/// write their response, and every other connection is dropped unanswered.
pub(crate) async fn serve_until<F>(
    listener: TcpListener,
    router: Router,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = ServiceBuilder::new()
        .layer(ConcurrencyLimitLayer::new(ServerConfig::MAX_IN_FLIGHT_REQUESTS))
        .service(router.layer(TraceLayer::new_for_http()));

    let stopping = Arc::new(AtomicBool::new(false));
    let busy = Arc::new(AtomicUsize::new(0));
    let mut connections = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            _ = &mut shutdown => break,
            Some(_) = connections.join_next(), if !connections.is_empty() => continue,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            },
        };

        let app = app.clone();
        let stopping = stopping.clone();
        let busy = busy.clone();
        connections.spawn(async move {
            let received = Arc::new(AtomicBool::new(false));
            let service = {
                let received = received.clone();
                let busy = busy.clone();
                service_fn(move |request: hyper::Request<Incoming>| {
                    if !received.swap(true, Ordering::SeqCst) {
                        busy.fetch_add(1, Ordering::SeqCst);
                    }
                    let app = app.clone();
                    let stopping = stopping.clone();
                    async move {
                        if stopping.load(Ordering::SeqCst) {
                            return Ok::<_, Infallible>(
                                StatusCode::SERVICE_UNAVAILABLE.into_response(),
                            );
                        }
                        let request: Request = request.map(Body::new);
                        app.oneshot(request).await
                    }
                })
            };

            let mut builder = http1::Builder::new();
            builder.keep_alive(false);
            if let Err(e) = builder.serve_connection(TokioIo::new(stream), service).await {
                debug!("Connection from {} closed: {}", peer, e);
            }

            if received.load(Ordering::SeqCst) {
                busy.fetch_sub(1, Ordering::SeqCst);
            }
        });
    }

    stopping.store(true, Ordering::SeqCst);
    drop(listener);

    let deadline = Instant::now() + ServerConfig::SHUTDOWN_FLUSH_TIMEOUT;
    while busy.load(Ordering::SeqCst) > 0 {
        match tokio::time::timeout_at(deadline, connections.join_next()).await {
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(_) => {
                warn!("Response still in flight at shutdown, dropping it");
                break;
            }
        }
    }

    if !connections.is_empty() {
        debug!("Dropping {} open connection(s)", connections.len());
    }
    connections.shutdown().await;
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C received"),
        _ = terminate => info!("SIGTERM received"),
    }
}
