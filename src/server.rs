//! HTTP host and graceful shutdown.
//!
//! A small hyper server that drives any [`Handler`], most usefully one
//! wrapped in [`TimestampHeaders`](crate::TimestampHeaders). Each request
//! body is buffered, the handler writes into a fresh [`BufferedResponse`],
//! and the result goes back to hyper.
//!
//! # Graceful shutdown
//!
//! On SIGTERM or Ctrl-C the server:
//! 1. Immediately stops `listener.accept()` — no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from [`Server::serve`], which lets `main` exit cleanly.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::handler::Handler;
use crate::request::Request;
use crate::response::{BufferedResponse, ResponseSink};

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr }
    }

    /// Starts accepting connections and dispatching them to `handler`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, handler: impl Handler) -> Result<(), Error> {
        self.serve_with_shutdown(handler, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but stops when `signal` resolves.
    pub async fn serve_with_shutdown(
        self,
        handler: impl Handler,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        run(listener, Arc::new(handler), signal).await
    }

    /// Serves on an already-bound listener, e.g. one bound to port 0.
    pub async fn serve_listener(
        listener: TcpListener,
        handler: impl Handler,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        run(listener, Arc::new(handler), signal).await
    }
}

async fn run<H: Handler>(
    listener: TcpListener,
    handler: Arc<H>,
    signal: impl Future<Output = ()>,
) -> Result<(), Error> {
    let addr = listener.local_addr()?;
    info!(%addr, "listening");

    // JoinSet tracks every spawned connection task so we can wait for
    // them all to finish during graceful shutdown.
    let mut tasks = tokio::task::JoinSet::new();

    tokio::pin!(signal);

    loop {
        tokio::select! {
            // Check shutdown first so a signal immediately stops accepting
            // new connections, even if more are queued.
            biased;

            () = &mut signal => {
                info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, remote_addr) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let handler = Arc::clone(&handler);
                let io = TokioIo::new(stream);

                tasks.spawn(async move {
                    // Called once per request on the connection.
                    let svc = service_fn(move |req| {
                        let handler = Arc::clone(&handler);
                        async move { dispatch(handler, req, remote_addr).await }
                    });

                    // `auto::Builder` handles both HTTP/1.1 and HTTP/2.
                    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                        .serve_connection(io, svc)
                        .await
                    {
                        error!(peer = %remote_addr, "connection error: {e}");
                    }
                });
            }

            // Reap finished connection tasks so the JoinSet does not grow
            // without bound on long-running servers.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    while tasks.join_next().await.is_some() {}

    info!("stopped");
    Ok(())
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Runs one exchange through the handler.
///
/// The error type is [`Infallible`]: a body that cannot be read becomes
/// `400`, a handler error becomes `500`, so hyper never sees an error.
async fn dispatch<H: Handler>(
    handler: Arc<H>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(status_only(StatusCode::BAD_REQUEST));
        }
    };

    let mut sink = BufferedResponse::new();
    if let Err(e) = handler.serve(Request::from_parts(parts, body), &mut sink).await {
        error!(peer = %remote_addr, "handler error: {e}");
        return Ok(status_only(StatusCode::INTERNAL_SERVER_ERROR));
    }

    Ok(sink.into_response())
}

fn status_only(status: StatusCode) -> http::Response<Full<Bytes>> {
    let mut sink = BufferedResponse::new();
    sink.write_head(status);
    sink.into_response()
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// On Windows only Ctrl-C is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
