//! Async TCP host pipeline using Tokio.
//!
//! Accepts TCP connections, parses HTTP/1.1 requests, and pushes each one
//! through the registered middleware chain, ending at a terminal handler.
//! Supports HTTP/1.1 persistent connections (keep-alive) out of the box.
//!
//! The server is the collaborator the cache middleware delegates to: it
//! seeds the per-request [`Context`], and whatever the chain does not
//! handle lands in the terminal handler (typically a 404 or a disk-backed
//! fallback).

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::context::Context;
use crate::http::{
    Method, StatusCode,
    request::{Request, RequestError},
    response::Response,
};
use crate::middleware::{MiddlewareHandler, Next};

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Maximum size of a complete HTTP request we will buffer before rejecting it (8 MiB).
const MAX_REQUEST_SIZE: usize = 8 * 1024 * 1024;

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// The statik HTTP host.
///
/// Binds to a TCP address and dispatches incoming HTTP/1.1 requests through
/// the registered middleware chain to a terminal handler.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use statik::cache::CacheBuilder;
/// use statik::http::{Response, StatusCode};
/// use statik::middleware::{StaticCacheMiddleware, from_middleware};
/// use statik::server::Server;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let cache = Arc::new(CacheBuilder::new("public").build_concurrent().await?);
///     let assets = StaticCacheMiddleware::new(cache);
///
///     let server = Server::bind("127.0.0.1:8080")
///         .await?
///         .middleware(from_middleware(Arc::new(assets)));
///
///     server
///         .run(|_ctx| async { Response::new(StatusCode::NotFound).body("Not Found") })
///         .await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    middlewares: Vec<MiddlewareHandler>,
}

impl Server {
    /// Binds the server to the given TCP address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            middlewares: Vec::new(),
        })
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Appends a middleware to the chain. Middleware runs in registration
    /// order, ahead of the terminal handler passed to [`run`](Self::run).
    #[must_use]
    pub fn middleware(mut self, handler: MiddlewareHandler) -> Self {
        self.middlewares.push(handler);
        self
    }

    /// Starts accepting connections and dispatching requests through the
    /// middleware chain to `handler`.
    ///
    /// The terminal handler receives the [`Context`] as it emerged from the
    /// chain and must return a [`Future`] resolving to a [`Response`]. It is
    /// shared across all spawned Tokio tasks, so it must be
    /// `Send + Sync + 'static`.
    ///
    /// This method runs until the process is terminated or an unrecoverable
    /// listener error occurs.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the TCP listener itself fails.
    pub async fn run<H, F>(self, handler: H) -> Result<(), ServerError>
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        let terminal = Arc::new(handler);
        let mut chain = self.middlewares;
        chain.push(Arc::new(move |ctx: Context, _next: Next| {
            let terminal = Arc::clone(&terminal);
            Box::pin(async move { terminal(ctx).await })
        }));
        let chain = Arc::new(chain);

        info!(address = %self.local_addr, "statik listening");

        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer_addr, "connection accepted");
            let chain = Arc::clone(&chain);

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, chain).await {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
            });
        }
    }
}

/// Handles a single TCP connection over its lifetime.
///
/// HTTP/1.1 connections are persistent by default: we loop, reading one
/// request per iteration, until the peer closes the connection or signals
/// `Connection: close`.
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    chain: Arc<Vec<MiddlewareHandler>>,
) -> Result<(), std::io::Error> {
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

    loop {
        let bytes_read = stream.read_buf(&mut buf).await?;

        if bytes_read == 0 {
            debug!(peer = %peer_addr, "connection closed by peer");
            break;
        }

        // Guard against excessively large requests.
        if buf.len() > MAX_REQUEST_SIZE {
            warn!(peer = %peer_addr, "request too large — sending 413");
            let response = Response::new(StatusCode::PayloadTooLarge)
                .body("Request entity too large")
                .keep_alive(false);
            stream.write_all(&response.into_bytes()).await?;
            break;
        }

        // Attempt to parse the buffered data as an HTTP request.
        let (request, body_offset) = match Request::parse(&buf) {
            Ok(pair) => pair,
            Err(RequestError::Incomplete) => {
                // Headers not yet fully received — read more data.
                continue;
            }
            Err(e) => {
                warn!(peer = %peer_addr, error = %e, "bad request — sending 400");
                let response = Response::new(StatusCode::BadRequest)
                    .body(format!("Bad Request: {e}"))
                    .keep_alive(false);
                stream.write_all(&response.into_bytes()).await?;
                break;
            }
        };

        // Wait for the full body to arrive if Content-Length is set.
        let content_length = request.content_length().unwrap_or(0);
        let total_needed = body_offset + content_length;
        if buf.len() < total_needed {
            continue;
        }

        let keep_alive = request.is_keep_alive();
        let is_head = request.method() == &Method::Head;

        debug!(
            peer = %peer_addr,
            method = %request.method(),
            path = %request.path(),
            "dispatching request"
        );

        let ctx = Context::new(request);
        let response = Next::new(chain.as_ref().clone()).run(ctx).await;
        let response = response.keep_alive(keep_alive);
        // HEAD gets the same headers as GET with the body suppressed on the wire.
        let wire = if is_head {
            response.into_bytes_without_body()
        } else {
            response.into_bytes()
        };
        stream.write_all(&wire).await?;
        stream.flush().await?;

        // Drop the consumed request bytes from the buffer.
        let _ = buf.split_to(total_needed);

        if !keep_alive {
            debug!(peer = %peer_addr, "Connection: close — shutting down");
            break;
        }
    }

    Ok(())
}
