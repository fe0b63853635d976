use super::store::{CacheService, FileDependency};
use crate::spec::{Definition, DefinitionParser, ParseError};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Failure to obtain a [`Definition`] for a specification directory.
#[derive(Debug)]
pub enum LoadError {
    /// The index document does not exist
    NotFound { path: PathBuf },
    /// The index document exists but could not be read
    Io { path: PathBuf, source: io::Error },
    /// The parser rejected the document
    Parse { path: PathBuf, source: ParseError },
}

impl LoadError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, LoadError::NotFound { .. })
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::NotFound { path } => {
                write!(f, "specification not found: {}", path.display())
            }
            LoadError::Io { path, source } => {
                write!(f, "failed to read specification {}: {source}", path.display())
            }
            LoadError::Parse { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::NotFound { .. } => None,
            LoadError::Io { source, .. } => Some(source),
            LoadError::Parse { source, .. } => Some(source),
        }
    }
}

/// Every regular file under `dir`, sorted. These are the files whose
/// modification invalidates a cached definition.
#[must_use]
pub fn dependency_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .collect();
    files.sort();
    files
}

/// Load-or-populate wrapper around a [`DefinitionParser`].
///
/// With a [`CacheService`] attached, a definition is parsed once per
/// specification directory and reused until one of its files changes.
/// Concurrent misses for the same key are coalesced: only one caller parses,
/// the others wait and then read the freshly cached value.
///
/// Without a cache service every call parses.
pub struct DefinitionCache {
    parser: Arc<dyn DefinitionParser>,
    cache: Option<Arc<dyn CacheService>>,
    index_document: String,
    in_flight: DashMap<PathBuf, Arc<Mutex<()>>>,
    parses: AtomicU64,
}

impl DefinitionCache {
    pub fn new(
        parser: Arc<dyn DefinitionParser>,
        cache: Option<Arc<dyn CacheService>>,
        index_document: impl Into<String>,
    ) -> Self {
        Self {
            parser,
            cache,
            index_document: index_document.into(),
            in_flight: DashMap::new(),
            parses: AtomicU64::new(0),
        }
    }

    /// Path of the index document inside `spec_dir`; also the cache key.
    #[must_use]
    pub fn index_path(&self, spec_dir: &Path) -> PathBuf {
        spec_dir.join(&self.index_document)
    }

    /// Number of parser invocations so far.
    #[must_use]
    pub fn parse_count(&self) -> u64 {
        self.parses.load(Ordering::Relaxed)
    }

    /// The definition for `spec_dir` (a `{spec_root}/{api}/{version}` directory).
    pub fn get_definition(&self, spec_dir: &Path) -> Result<Arc<Definition>, LoadError> {
        let key = self.index_path(spec_dir);
        let Some(cache) = &self.cache else {
            return self.parse(&key, spec_dir).map(Arc::new);
        };

        if let Some(def) = cache.load(&key) {
            return Ok(def);
        }

        let gate = Arc::clone(
            &self
                .in_flight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        );
        let result = {
            let _guard = gate.lock();
            self.populate(&**cache, &key, spec_dir)
        };
        drop(gate);
        // Only the map holds the gate once no caller is waiting on it.
        self.in_flight
            .remove_if(&key, |_, gate| Arc::strong_count(gate) == 1);
        result
    }

    /// Miss path, run while holding the per-key gate.
    fn populate(
        &self,
        cache: &dyn CacheService,
        key: &Path,
        spec_dir: &Path,
    ) -> Result<Arc<Definition>, LoadError> {
        // Another caller may have populated the entry while we waited.
        if let Some(def) = cache.load(key) {
            debug!(key = %key.display(), "Definition built by concurrent request");
            return Ok(def);
        }

        // Stamped before the index is read: a write racing the parse leaves
        // a stamp mismatch behind and forces the next lookup to re-parse.
        let dependencies: Vec<FileDependency> = dependency_files(spec_dir)
            .into_iter()
            .map(FileDependency::snapshot)
            .collect();
        let def = Arc::new(self.parse(key, spec_dir)?);
        info!(
            key = %key.display(),
            routes = def.routes().len(),
            dependencies = dependencies.len(),
            "Definition parsed and cached"
        );
        cache.save(key, Arc::clone(&def), dependencies);
        Ok(def)
    }

    /// Keys with a miss currently being resolved.
    #[must_use]
    pub fn pending_builds(&self) -> usize {
        self.in_flight.len()
    }

    /// Drop the cached definition for `spec_dir`, if any.
    pub fn invalidate(&self, spec_dir: &Path) -> bool {
        let key = self.index_path(spec_dir);
        self.cache
            .as_ref()
            .is_some_and(|cache| cache.invalidate(&key))
    }

    fn parse(&self, key: &Path, spec_dir: &Path) -> Result<Definition, LoadError> {
        let source = std::fs::read_to_string(key).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                LoadError::NotFound {
                    path: key.to_path_buf(),
                }
            } else {
                LoadError::Io {
                    path: key.to_path_buf(),
                    source,
                }
            }
        })?;
        self.parses.fetch_add(1, Ordering::Relaxed);
        self.parser.parse(&source, spec_dir).map_err(|source| {
            warn!(key = %key.display(), error = %source, "Specification failed to parse");
            LoadError::Parse {
                path: key.to_path_buf(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::spec::ResourceTreeParser;

    fn write_spec(dir: &Path) {
        std::fs::write(dir.join("index.raml"), "version: v1\n/a:\n  get:\n").unwrap();
        std::fs::create_dir_all(dir.join("schemas")).unwrap();
        std::fs::write(dir.join("schemas/user.json"), "{}").unwrap();
    }

    #[test]
    fn test_dependency_files_are_recursive_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write_spec(dir.path());
        let files = dependency_files(dir.path());
        assert_eq!(
            files,
            vec![dir.path().join("index.raml"), dir.path().join("schemas/user.json")]
        );
    }

    #[test]
    fn test_without_cache_parses_every_time() {
        let dir = tempfile::tempdir().unwrap();
        write_spec(dir.path());
        let defs = DefinitionCache::new(Arc::new(ResourceTreeParser), None, "index.raml");
        defs.get_definition(dir.path()).unwrap();
        defs.get_definition(dir.path()).unwrap();
        assert_eq!(defs.parse_count(), 2);
    }

    #[test]
    fn test_with_cache_parses_once() {
        let dir = tempfile::tempdir().unwrap();
        write_spec(dir.path());
        let cache: Arc<dyn CacheService> = Arc::new(MemoryCache::new(4));
        let defs = DefinitionCache::new(Arc::new(ResourceTreeParser), Some(cache), "index.raml");
        let a = defs.get_definition(dir.path()).unwrap();
        let b = defs.get_definition(dir.path()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(defs.parse_count(), 1);
        assert!(defs.invalidate(dir.path()));
        defs.get_definition(dir.path()).unwrap();
        assert_eq!(defs.parse_count(), 2);
    }

    #[test]
    fn test_misses_leave_no_gates_behind() {
        let dir = tempfile::tempdir().unwrap();
        let cache: Arc<dyn CacheService> = Arc::new(MemoryCache::new(4));
        let defs = DefinitionCache::new(Arc::new(ResourceTreeParser), Some(cache), "index.raml");
        for i in 0..500 {
            let err = defs
                .get_definition(&dir.path().join(format!("nope{i}")).join("v1"))
                .unwrap_err();
            assert!(err.is_not_found());
        }
        write_spec(dir.path());
        defs.get_definition(dir.path()).unwrap();
        assert_eq!(defs.pending_builds(), 0);
        assert!(defs.in_flight.is_empty());
    }

    /// Rewrites a sibling file while the index is being parsed.
    struct RewritingParser {
        sibling: PathBuf,
        rewritten: std::sync::atomic::AtomicBool,
    }

    impl DefinitionParser for RewritingParser {
        fn parse(&self, source: &str, base_dir: &Path) -> Result<Definition, ParseError> {
            if !self.rewritten.swap(true, Ordering::SeqCst) {
                std::fs::write(&self.sibling, r#"{"type":"object","changed":true}"#).unwrap();
            }
            ResourceTreeParser.parse(source, base_dir)
        }
    }

    #[test]
    fn test_write_during_parse_forces_reparse() {
        let dir = tempfile::tempdir().unwrap();
        write_spec(dir.path());
        let parser = Arc::new(RewritingParser {
            sibling: dir.path().join("schemas/user.json"),
            rewritten: std::sync::atomic::AtomicBool::new(false),
        });
        let cache: Arc<dyn CacheService> = Arc::new(MemoryCache::new(4));
        let defs = DefinitionCache::new(parser, Some(cache), "index.raml");

        defs.get_definition(dir.path()).unwrap();
        defs.get_definition(dir.path()).unwrap();
        assert_eq!(defs.parse_count(), 2);
        defs.get_definition(dir.path()).unwrap();
        assert_eq!(defs.parse_count(), 2);
    }

    #[test]
    fn test_missing_index_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let defs = DefinitionCache::new(Arc::new(ResourceTreeParser), None, "index.raml");
        let err = defs.get_definition(dir.path()).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(defs.parse_count(), 0);
    }
}
