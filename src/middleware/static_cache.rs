//! Static asset dispatch from the in-memory cache.
//!
//! [`StaticCacheMiddleware`] owns no I/O: every request it answers is served
//! from the [`AssetCache`] built before the server started accepting traffic.
//! Requests it does not own — disallowed methods, paths outside its mount,
//! cache misses — are delegated unchanged to the next pipeline stage, which
//! decides whether that means disk streaming, a 404, or something else.

use std::pin::Pin;
use std::sync::Arc;

use crate::{
    Response, StatusCode,
    cache::{AssetCache, CacheError, CacheEvent, DiagnosticSink, Diagnostics},
    context::Context,
    http::conditional,
    middleware::{Middleware, Next},
};

/// Middleware serving allow-listed static assets directly from memory.
///
/// Per request, in order:
///
/// 1. **Method gate** — anything but GET/HEAD is delegated.
/// 2. **Freshness gate** — a matching conditional request downgrades the
///    response to `304 Not Modified`.
/// 3. **Empty-body gate** — a 204/304 response goes out with `Content-Type`,
///    `Content-Length`, and `Transfer-Encoding` stripped and no body.
/// 4. **Lookup** — the request path, resolved against the cache's base
///    directory, either hits an entry (served with
///    `Cache-Control: no-cache, no-store, must-revalidate`) or is delegated.
///
/// A miss is not retried against disk here; that belongs to whatever stage
/// follows in the pipeline.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use statik::cache::CacheBuilder;
/// use statik::middleware::StaticCacheMiddleware;
///
/// # fn main() -> Result<(), statik::cache::CacheError> {
/// let cache = Arc::new(CacheBuilder::new("public").build()?);
/// let assets = StaticCacheMiddleware::new(cache).mount("/public");
/// # Ok(())
/// # }
/// ```
pub struct StaticCacheMiddleware {
    cache: Arc<AssetCache>,
    // Always has a leading '/'; no trailing '/' except for the root mount.
    mount: String,
    diagnostics: Diagnostics,
}

impl StaticCacheMiddleware {
    /// Wraps an already-built cache. Diagnostics are inherited from the
    /// cache so build-time and request-time events reach the same sink.
    pub fn new(cache: Arc<AssetCache>) -> Self {
        let diagnostics = cache.diagnostics().clone();
        Self {
            cache,
            mount: "/".to_owned(),
            diagnostics,
        }
    }

    /// Builds a cache from `base` with default rules and wraps it.
    ///
    /// # Errors
    ///
    /// Propagates [`CacheError`] when `base` is missing or not a directory.
    pub fn from_dir(base: impl Into<std::path::PathBuf>) -> Result<Self, CacheError> {
        let cache = crate::cache::CacheBuilder::new(base).build()?;
        Ok(Self::new(Arc::new(cache)))
    }

    /// Sets the mount prefix (default `/`). Only requests under the mount
    /// are considered; everything else is delegated untouched.
    #[must_use]
    pub fn mount(mut self, mount: impl Into<String>) -> Self {
        let mut mount = mount.into();
        if !mount.starts_with('/') {
            mount.insert(0, '/');
        }
        while mount.len() > 1 && mount.ends_with('/') {
            mount.pop();
        }
        self.mount = mount;
        self
    }

    /// Enables or disables per-request debug notices. Without a sink these
    /// go to [`tracing`] as JSON lines; with one, the sink sees everything
    /// regardless of this flag.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.diagnostics = self.diagnostics.with_debug(debug);
        self
    }

    /// Routes this middleware's request-time events to `sink`, replacing
    /// whatever was inherited from the cache.
    #[must_use]
    pub fn diagnostics(mut self, sink: DiagnosticSink) -> Self {
        self.diagnostics = self.diagnostics.with_sink(sink);
        self
    }

    /// The cache backing this middleware.
    pub fn cache(&self) -> &Arc<AssetCache> {
        &self.cache
    }
}

impl Middleware for StaticCacheMiddleware {
    fn handle(&self, mut ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        let cache = Arc::clone(&self.cache);
        let diagnostics = self.diagnostics.clone();
        let mount = self.mount.clone();

        Box::pin(async move {
            let method = ctx.request().method().clone();
            if !method.is_cacheable() {
                return next.run(ctx).await;
            }

            if conditional::is_fresh(
                &method,
                ctx.request().headers(),
                ctx.response().status(),
                ctx.response().headers(),
            ) {
                ctx.response_mut().set_status(StatusCode::NotModified);
            }

            let status = ctx.response().status();
            if matches!(status, StatusCode::NoContent | StatusCode::NotModified) {
                diagnostics.emit(CacheEvent::EmptyBody {
                    path: ctx.request().path().to_owned(),
                    status: status.as_u16(),
                });
                let mut response = ctx.into_response();
                response.strip_entity_headers();
                response.clear_body();
                return response;
            }

            let raw_path = ctx.request().path().to_owned();
            let Some(logical) = logical_path(&raw_path, &mount) else {
                return next.run(ctx).await;
            };
            let resolved = cache.resolve(&logical);

            match cache.get(&resolved) {
                Some(contents) => {
                    diagnostics.emit(CacheEvent::CacheHit {
                        path: resolved.display().to_string(),
                    });
                    let mut response = ctx.into_response();
                    response
                        .set_header("Cache-Control", "no-cache, no-store, must-revalidate");
                    response.set_body(contents);
                    response
                }
                None => {
                    diagnostics.emit(CacheEvent::CacheMiss {
                        path: resolved.display().to_string(),
                    });
                    next.run(ctx).await
                }
            }
        })
    }
}

/// Derives the path to resolve against the cache base, or `None` when the
/// request falls outside the mount.
///
/// A request for the bare mount root without a trailing slash yields the
/// empty path: it resolves to the base directory, which is never a cache
/// key, so the downstream router keeps ownership of the
/// redirect-to-trailing-slash case.
fn logical_path(raw_path: &str, mount: &str) -> Option<String> {
    let logical = if mount == "/" {
        raw_path.to_owned()
    } else {
        let rest = raw_path.strip_prefix(mount)?;
        if !rest.is_empty() && !rest.starts_with('/') {
            // `/publicity` is not under `/public`
            return None;
        }
        if rest.is_empty() {
            "/".to_owned()
        } else {
            rest.to_owned()
        }
    };

    if logical == "/" && !raw_path.ends_with('/') {
        return Some(String::new());
    }
    Some(logical)
}
