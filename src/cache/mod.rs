//! In-memory static asset cache — built once, read-only thereafter.
//!
//! [`CacheBuilder`] walks a base directory, filters files by an extension
//! allow-list and a path-fragment deny-list, and reads everything that
//! qualifies fully into memory. The resulting [`AssetCache`] maps absolute
//! file paths to their contents and never changes for the lifetime of the
//! process, so it can be shared across request tasks without locking.
//!
//! The walk is an explicit worklist rather than recursion; symlinked
//! directories are not followed, so cyclic links cannot wedge the build.
//! File reads may run sequentially ([`CacheBuilder::build`]) or through a
//! bounded pool of concurrent reads ([`CacheBuilder::build_concurrent`]);
//! both produce the same cache for a given tree and rule set.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Maximum number of file reads in flight during a concurrent build.
const MAX_CONCURRENT_READS: usize = 5;

/// Errors produced while constructing an [`AssetCache`].
///
/// Only the base path itself can fail construction; individual unreadable
/// files are skipped with a warning.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("base path does not exist: {path}")]
    BaseNotFound { path: PathBuf },

    #[error("base path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Which files the builder admits and which subtrees it prunes.
///
/// Both lists are fixed once the build starts. The defaults mirror a typical
/// web-asset tree: text assets in, tooling metadata out.
///
/// # Examples
///
/// ```
/// use statik::cache::ScanRules;
///
/// let rules = ScanRules::new()
///     .allow_extension(".svg")
///     .deny_fragment("/dist/");
/// ```
#[derive(Debug, Clone)]
pub struct ScanRules {
    extensions: Vec<String>,
    deny_fragments: Vec<String>,
}

impl Default for ScanRules {
    fn default() -> Self {
        Self {
            extensions: vec![".js".into(), ".css".into(), ".html".into()],
            deny_fragments: vec!["/.git/".into(), "/node_modules/".into(), "/.idea/".into()],
        }
    }
}

impl ScanRules {
    /// Creates the default rule set: `.js`/`.css`/`.html` allowed,
    /// `/.git/`, `/node_modules/`, and `/.idea/` subtrees pruned.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filename suffix to the allow-list (include the leading dot).
    #[must_use]
    pub fn allow_extension(mut self, ext: impl Into<String>) -> Self {
        self.extensions.push(ext.into());
        self
    }

    /// Adds a path fragment to the deny-list. A directory whose path ends
    /// with the fragment is pruned along with its entire subtree.
    #[must_use]
    pub fn deny_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.deny_fragments.push(fragment.into());
        self
    }

    /// Returns `true` if the file name matches the extension allow-list.
    pub fn matches_extension(&self, path: &Path) -> bool {
        let s = path.to_string_lossy();
        self.extensions.iter().any(|ext| s.ends_with(ext.as_str()))
    }

    /// Returns `true` if the path matches the deny-list.
    ///
    /// The fragment is tested against both the bare path and the path with a
    /// trailing separator appended, so `/.git/` excludes the `.git` directory
    /// itself as well as anything under it.
    pub fn is_denied(&self, path: &Path) -> bool {
        let bare = path.to_string_lossy();
        let with_sep = format!("{bare}/");
        self.deny_fragments
            .iter()
            .any(|f| bare.ends_with(f.as_str()) || with_sep.ends_with(f.as_str()))
    }
}

/// Aggregate counters accumulated during the build. Diagnostic only — the
/// entry map is the authority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of files resident in the cache.
    pub files: usize,
    /// Sum of all cached file sizes in bytes.
    pub bytes: u64,
}

/// Informational events emitted during the build and per dispatch.
///
/// Events carry no control-flow significance; they exist so hosts can
/// observe what the cache is doing. Serialized as JSON lines by the
/// fallback log sink.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum CacheEvent {
    /// A file was read into the cache.
    FileLoaded { path: String, bytes: usize },
    /// A file was left out of the cache (extension mismatch or read failure).
    FileSkipped { path: String, reason: String },
    /// A directory matched the deny-list; its subtree was not walked.
    SubtreePruned { path: String },
    /// The build finished; summary counters.
    BuildComplete { files: usize, bytes: u64 },
    /// A request was answered from memory.
    CacheHit { path: String },
    /// A request path had no cache entry and was delegated onward.
    CacheMiss { path: String },
    /// A 204/304 response was sent with entity headers stripped.
    EmptyBody { path: String, status: u16 },
}

/// A callback receiving every [`CacheEvent`].
pub type DiagnosticSink = Arc<dyn Fn(&CacheEvent) + Send + Sync>;

/// Diagnostic emission capability, injected at construction time.
///
/// With a sink attached, every event goes to the sink. Without one, events
/// are logged through [`tracing`] as JSON lines — but only in debug mode,
/// so the default `Diagnostics` is a no-op.
#[derive(Clone, Default)]
pub struct Diagnostics {
    debug: bool,
    sink: Option<DiagnosticSink>,
}

impl Diagnostics {
    /// Creates diagnostics with no sink; debug mode falls back to `tracing`.
    pub fn new(debug: bool) -> Self {
        Self { debug, sink: None }
    }

    /// Attaches a sink that receives every event regardless of debug mode.
    #[must_use]
    pub fn with_sink(mut self, sink: DiagnosticSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Returns a copy with the debug flag replaced, keeping any attached sink.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Returns `true` when per-file and per-request notices are enabled.
    pub fn debug(&self) -> bool {
        self.debug
    }

    pub(crate) fn emit(&self, event: CacheEvent) {
        if let Some(sink) = &self.sink {
            sink(&event);
        } else if self.debug {
            match serde_json::to_string(&event) {
                Ok(line) => info!(target: "statik::diagnostics", "{line}"),
                Err(_) => info!(target: "statik::diagnostics", ?event),
            }
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("debug", &self.debug)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

/// Builder for an [`AssetCache`].
///
/// # Examples
///
/// ```rust,no_run
/// use statik::cache::{CacheBuilder, ScanRules};
///
/// # fn main() -> Result<(), statik::cache::CacheError> {
/// let cache = CacheBuilder::new("public")
///     .rules(ScanRules::new().allow_extension(".svg"))
///     .debug(true)
///     .build()?;
/// println!("cached {} files, {} bytes", cache.stats().files, cache.stats().bytes);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CacheBuilder {
    base: PathBuf,
    rules: ScanRules,
    diagnostics: Diagnostics,
}

impl CacheBuilder {
    /// Starts a build rooted at `base`. The path may be relative; it is
    /// made absolute against the working directory before the walk.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            rules: ScanRules::default(),
            diagnostics: Diagnostics::default(),
        }
    }

    /// Replaces the default [`ScanRules`].
    #[must_use]
    pub fn rules(mut self, rules: ScanRules) -> Self {
        self.rules = rules;
        self
    }

    /// Enables per-file and per-request diagnostic notices.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.diagnostics.debug = debug;
        self
    }

    /// Injects a diagnostic sink receiving every [`CacheEvent`].
    #[must_use]
    pub fn diagnostics(mut self, sink: DiagnosticSink) -> Self {
        self.diagnostics.sink = Some(sink);
        self
    }

    /// Builds the cache with sequential file reads.
    ///
    /// # Errors
    ///
    /// Fails only when the base path is missing, is not a directory, or
    /// cannot be resolved to an absolute path. Unreadable files under the
    /// base are skipped with a warning.
    pub fn build(self) -> Result<AssetCache, CacheError> {
        let base = resolve_base(&self.base)?;
        let candidates = scan(&base, &self.rules, &self.diagnostics);

        let mut entries = HashMap::with_capacity(candidates.len());
        let mut stats = CacheStats::default();
        for path in candidates {
            match std::fs::read(&path) {
                Ok(data) => insert_entry(&mut entries, &mut stats, &self.diagnostics, path, data),
                Err(err) => skip_unreadable(&self.diagnostics, &path, &err),
            }
        }

        Ok(finish(base, entries, stats, self.diagnostics))
    }

    /// Builds the cache reading up to [`MAX_CONCURRENT_READS`] files at a
    /// time through `tokio::fs`. The returned future resolves only once
    /// every read has completed; the cache is never observable half-built.
    ///
    /// Produces the same entries as [`build`](Self::build) for the same
    /// tree and rules.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`build`](Self::build).
    pub async fn build_concurrent(self) -> Result<AssetCache, CacheError> {
        let base = resolve_base(&self.base)?;
        let candidates = scan(&base, &self.rules, &self.diagnostics);

        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_READS));
        let mut reads = Vec::with_capacity(candidates.len());
        for path in candidates {
            let semaphore = Arc::clone(&semaphore);
            let read_path = path.clone();
            let task = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return Err(io::Error::other("read pool closed")),
                };
                tokio::fs::read(&read_path).await
            });
            // The path stays with the handle so every failure arm can name it.
            reads.push((path, task));
        }

        let mut entries = HashMap::with_capacity(reads.len());
        let mut stats = CacheStats::default();
        for (path, task) in reads {
            match task.await {
                Ok(Ok(data)) => {
                    insert_entry(&mut entries, &mut stats, &self.diagnostics, path, data);
                }
                Ok(Err(err)) => skip_unreadable(&self.diagnostics, &path, &err),
                Err(err) => skip_unreadable(&self.diagnostics, &path, &io::Error::other(err)),
            }
        }

        Ok(finish(base, entries, stats, self.diagnostics))
    }
}

/// The immutable asset store: absolute file path → contents.
///
/// Built once by [`CacheBuilder`], then shared read-only (typically behind an
/// [`Arc`]) across every request task. Entry values never change after the
/// build completes.
pub struct AssetCache {
    base: PathBuf,
    entries: HashMap<PathBuf, Bytes>,
    stats: CacheStats,
    diagnostics: Diagnostics,
}

impl AssetCache {
    /// The absolute, normalized base directory the cache was built from.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Build-time counters.
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Number of cached files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the cached contents for an absolute path, if present.
    /// Cloning [`Bytes`] is a reference-count bump, not a copy.
    pub fn get(&self, path: &Path) -> Option<Bytes> {
        self.entries.get(path).cloned()
    }

    /// Returns `true` if the absolute path has a cache entry.
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Iterates over the cached absolute paths, in no particular order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys().map(PathBuf::as_path)
    }

    /// Resolves a request's logical path against the base directory into the
    /// absolute, lexically normalized form used as a cache key. Purely
    /// lexical — no filesystem access.
    pub fn resolve(&self, logical_path: &str) -> PathBuf {
        normalize(&self.base.join(logical_path.trim_start_matches('/')))
    }

    /// The diagnostics capability this cache was built with. The dispatcher
    /// inherits it so build-time and request-time events reach the same sink.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

impl fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetCache")
            .field("base", &self.base)
            .field("files", &self.stats.files)
            .field("bytes", &self.stats.bytes)
            .finish()
    }
}

/// Validates the base path (fatal on absence or non-directory) and turns it
/// into the absolute, normalized root every cache key hangs off.
fn resolve_base(base: &Path) -> Result<PathBuf, CacheError> {
    let metadata = std::fs::metadata(base).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => CacheError::BaseNotFound {
            path: base.to_path_buf(),
        },
        _ => CacheError::Io {
            path: base.to_path_buf(),
            source,
        },
    })?;

    if !metadata.is_dir() {
        return Err(CacheError::NotADirectory {
            path: base.to_path_buf(),
        });
    }

    let absolute = std::path::absolute(base).map_err(|source| CacheError::Io {
        path: base.to_path_buf(),
        source,
    })?;
    Ok(normalize(&absolute))
}

/// Worklist walk over the base tree, returning the allow-listed files.
///
/// Deny-listed directories are pruned before their contents are touched.
/// Symlinks (to files or directories) and other non-regular entries are
/// skipped. A subdirectory that cannot be listed is skipped with a warning;
/// only the base path itself is load-bearing.
fn scan(base: &Path, rules: &ScanRules, diagnostics: &Diagnostics) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![base.to_path_buf()];

    while let Some(dir) = pending.pop() {
        if rules.is_denied(&dir) {
            warn!(path = %dir.display(), "skipping deny-listed directory");
            diagnostics.emit(CacheEvent::SubtreePruned {
                path: dir.display().to_string(),
            });
            continue;
        }

        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path = %dir.display(), error = %err, "cannot list directory — skipping");
                continue;
            }
        };

        for entry in entries {
            let Ok(entry) = entry else { continue };
            let path = dir.join(entry.file_name());
            let Ok(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                if rules.matches_extension(&path) {
                    files.push(path);
                } else {
                    diagnostics.emit(CacheEvent::FileSkipped {
                        path: path.display().to_string(),
                        reason: "extension not allow-listed".into(),
                    });
                }
            }
            // Symlinks are not followed: a cyclic link must not wedge the walk.
        }
    }

    files
}

fn insert_entry(
    entries: &mut HashMap<PathBuf, Bytes>,
    stats: &mut CacheStats,
    diagnostics: &Diagnostics,
    path: PathBuf,
    data: Vec<u8>,
) {
    stats.files += 1;
    stats.bytes += data.len() as u64;
    diagnostics.emit(CacheEvent::FileLoaded {
        path: path.display().to_string(),
        bytes: data.len(),
    });
    entries.insert(path, Bytes::from(data));
}

fn skip_unreadable(diagnostics: &Diagnostics, path: &Path, err: &io::Error) {
    warn!(path = %path.display(), error = %err, "cannot read file — omitting from cache");
    diagnostics.emit(CacheEvent::FileSkipped {
        path: path.display().to_string(),
        reason: err.to_string(),
    });
}

fn finish(
    base: PathBuf,
    entries: HashMap<PathBuf, Bytes>,
    stats: CacheStats,
    diagnostics: Diagnostics,
) -> AssetCache {
    info!(
        base = %base.display(),
        files = stats.files,
        bytes = stats.bytes,
        "static asset cache built"
    );
    diagnostics.emit(CacheEvent::BuildComplete {
        files: stats.files,
        bytes: stats.bytes,
    });
    AssetCache {
        base,
        entries,
        stats,
        diagnostics,
    }
}

/// Lexical path normalization: collapses `.` and `..` components without
/// touching the filesystem. `..` at the root stays at the root, matching
/// `path.resolve` semantics.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// public/
    ///   app.js  style.css  index.html  notes.txt
    ///   vendor/lib.js
    ///   .git/config  .git/hooks/pre-commit.js
    ///   node_modules/pkg/index.js
    fn asset_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let base = dir.path();
        fs::write(base.join("app.js"), "console.log('app');").unwrap();
        fs::write(base.join("style.css"), "body { margin: 0 }").unwrap();
        fs::write(base.join("index.html"), "<html></html>").unwrap();
        fs::write(base.join("notes.txt"), "not an asset").unwrap();
        fs::create_dir(base.join("vendor")).unwrap();
        fs::write(base.join("vendor/lib.js"), "export {};").unwrap();
        fs::create_dir_all(base.join(".git/hooks")).unwrap();
        fs::write(base.join(".git/config"), "[core]").unwrap();
        fs::write(base.join(".git/hooks/pre-commit.js"), "hook").unwrap();
        fs::create_dir_all(base.join("node_modules/pkg")).unwrap();
        fs::write(base.join("node_modules/pkg/index.js"), "module").unwrap();
        dir
    }

    fn sorted_keys(cache: &AssetCache) -> Vec<PathBuf> {
        let mut keys: Vec<_> = cache.paths().map(Path::to_path_buf).collect();
        keys.sort();
        keys
    }

    #[test]
    fn caches_exactly_the_allowed_set() {
        let dir = asset_tree();
        let cache = CacheBuilder::new(dir.path()).build().unwrap();

        let base = cache.base().to_path_buf();
        let mut expected = vec![
            base.join("app.js"),
            base.join("style.css"),
            base.join("index.html"),
            base.join("vendor/lib.js"),
        ];
        expected.sort();

        assert_eq!(sorted_keys(&cache), expected);
        assert_eq!(cache.stats().files, 4);
    }

    #[test]
    fn contents_match_disk_at_build_time() {
        let dir = asset_tree();
        let cache = CacheBuilder::new(dir.path()).build().unwrap();
        let key = cache.base().join("app.js");
        assert_eq!(
            cache.get(&key).unwrap().as_ref(),
            b"console.log('app');" as &[u8]
        );
    }

    #[test]
    fn deny_list_prunes_even_matching_extensions() {
        let dir = asset_tree();
        let cache = CacheBuilder::new(dir.path()).build().unwrap();
        // .js files under pruned subtrees must not leak in
        assert!(!cache.contains(&cache.base().join(".git/hooks/pre-commit.js")));
        assert!(!cache.contains(&cache.base().join(".git/config")));
        assert!(!cache.contains(&cache.base().join("node_modules/pkg/index.js")));
    }

    #[test]
    fn stats_sum_cached_bytes() {
        let dir = asset_tree();
        let cache = CacheBuilder::new(dir.path()).build().unwrap();
        let total: u64 = cache
            .paths()
            .map(|p| fs::metadata(p).unwrap().len())
            .sum();
        assert_eq!(cache.stats().bytes, total);
    }

    #[test]
    fn missing_base_is_fatal() {
        let err = CacheBuilder::new("/definitely/not/here").build().unwrap_err();
        assert!(matches!(err, CacheError::BaseNotFound { .. }));
    }

    #[test]
    fn file_base_is_fatal() {
        let dir = asset_tree();
        let err = CacheBuilder::new(dir.path().join("app.js"))
            .build()
            .unwrap_err();
        assert!(matches!(err, CacheError::NotADirectory { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_followed() {
        let dir = asset_tree();
        std::os::unix::fs::symlink(dir.path().join("vendor"), dir.path().join("loop")).unwrap();
        let cache = CacheBuilder::new(dir.path()).build().unwrap();
        assert!(!cache.contains(&cache.base().join("loop/lib.js")));
        assert!(cache.contains(&cache.base().join("vendor/lib.js")));
    }

    #[cfg(unix)]
    fn deny_read(path: &Path) -> bool {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o000)).unwrap();
        // Permission bits are advisory for privileged users; nothing to
        // observe if the read still succeeds.
        fs::read(path).is_err()
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_is_omitted_not_fatal() {
        let dir = asset_tree();
        let locked = dir.path().join("app.js");
        if !deny_read(&locked) {
            return;
        }

        let seen: Arc<Mutex<Vec<CacheEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let cache = CacheBuilder::new(dir.path())
            .diagnostics(Arc::new(move |event| {
                sink_seen.lock().unwrap().push(event.clone());
            }))
            .build()
            .unwrap();

        assert!(!cache.contains(&cache.base().join("app.js")));
        assert!(cache.contains(&cache.base().join("style.css")));
        assert_eq!(cache.stats().files, 3);

        let seen = seen.lock().unwrap();
        assert!(seen.iter().any(|e| matches!(
            e,
            CacheEvent::FileSkipped { path, .. } if path.ends_with("app.js")
        )));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn concurrent_build_skips_unreadable_file() {
        let dir = asset_tree();
        let locked = dir.path().join("app.js");
        if !deny_read(&locked) {
            return;
        }

        let seen: Arc<Mutex<Vec<CacheEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let cache = CacheBuilder::new(dir.path())
            .diagnostics(Arc::new(move |event| {
                sink_seen.lock().unwrap().push(event.clone());
            }))
            .build_concurrent()
            .await
            .unwrap();

        assert!(!cache.contains(&cache.base().join("app.js")));
        assert_eq!(cache.stats().files, 3);
        assert!(seen.lock().unwrap().iter().any(|e| matches!(
            e,
            CacheEvent::FileSkipped { path, .. } if path.ends_with("app.js")
        )));
    }

    #[test]
    fn custom_rules() {
        let dir = asset_tree();
        let rules = ScanRules::new()
            .allow_extension(".txt")
            .deny_fragment("/vendor/");
        let cache = CacheBuilder::new(dir.path()).rules(rules).build().unwrap();
        assert!(cache.contains(&cache.base().join("notes.txt")));
        assert!(!cache.contains(&cache.base().join("vendor/lib.js")));
    }

    #[test]
    fn resolve_normalizes_traversal() {
        let dir = asset_tree();
        let cache = CacheBuilder::new(dir.path()).build().unwrap();
        let resolved = cache.resolve("/vendor/../app.js");
        assert_eq!(resolved, cache.base().join("app.js"));
        assert!(cache.contains(&resolved));
    }

    #[test]
    fn sink_receives_build_events() {
        let dir = asset_tree();
        let seen: Arc<Mutex<Vec<CacheEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let cache = CacheBuilder::new(dir.path())
            .diagnostics(Arc::new(move |event| {
                sink_seen.lock().unwrap().push(event.clone());
            }))
            .build()
            .unwrap();

        let seen = seen.lock().unwrap();
        let loaded = seen
            .iter()
            .filter(|e| matches!(e, CacheEvent::FileLoaded { .. }))
            .count();
        assert_eq!(loaded, cache.stats().files);
        assert!(seen.iter().any(|e| matches!(
            e,
            CacheEvent::BuildComplete { files: 4, .. }
        )));
        assert!(seen
            .iter()
            .any(|e| matches!(e, CacheEvent::SubtreePruned { .. })));
    }

    #[tokio::test]
    async fn concurrent_build_matches_sequential() {
        let dir = asset_tree();
        let sequential = CacheBuilder::new(dir.path()).build().unwrap();
        let concurrent = CacheBuilder::new(dir.path())
            .build_concurrent()
            .await
            .unwrap();

        assert_eq!(sorted_keys(&sequential), sorted_keys(&concurrent));
        assert_eq!(sequential.stats(), concurrent.stats());
        for path in sequential.paths() {
            assert_eq!(sequential.get(path), concurrent.get(path));
        }
    }

    #[test]
    fn normalize_clamps_at_root() {
        assert_eq!(
            normalize(Path::new("/base/../../etc")),
            PathBuf::from("/etc")
        );
        assert_eq!(
            normalize(Path::new("/base/./a/../b.js")),
            PathBuf::from("/base/b.js")
        );
    }
}
