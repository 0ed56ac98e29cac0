//! # statik
//!
//! In-memory static asset cache middleware for async HTTP/1.1 pipelines.
//!
//! A fixed set of text assets (scripts, stylesheets, markup) is read from
//! disk exactly once, before the server accepts traffic, and served from
//! memory thereafter — with HTTP conditional-request semantics so unchanged
//! content collapses to `304 Not Modified`. Anything the cache does not own
//! (other methods, unknown paths, pruned directories) is delegated to the
//! next stage of the pipeline untouched.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use statik::cache::CacheBuilder;
//! use statik::http::{Response, StatusCode};
//! use statik::middleware::{StaticCacheMiddleware, from_middleware};
//! use statik::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = Arc::new(CacheBuilder::new("public").build_concurrent().await?);
//!     let assets = StaticCacheMiddleware::new(cache);
//!
//!     let server = Server::bind("127.0.0.1:8080")
//!         .await?
//!         .middleware(from_middleware(Arc::new(assets)));
//!
//!     server
//!         .run(|_ctx| async { Response::new(StatusCode::NotFound).body("Not Found") })
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod context;
pub mod http;
pub mod middleware;
pub mod server;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use cache::{AssetCache, CacheBuilder, CacheError, ScanRules};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use middleware::StaticCacheMiddleware;
pub use server::{Server, ServerError};
