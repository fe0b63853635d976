use crate::spec::Definition;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};

/// Modification state of one dependency file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

impl FileStamp {
    /// Stat `path`; `None` when the file no longer exists.
    #[must_use]
    pub fn of(path: &Path) -> Option<Self> {
        let meta = std::fs::metadata(path).ok()?;
        Some(Self {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

/// A file a definition was built from, stamped before it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDependency {
    pub path: PathBuf,
    /// `None` when the file did not exist at snapshot time
    pub stamp: Option<FileStamp>,
}

impl FileDependency {
    /// Stamp `path` now.
    #[must_use]
    pub fn snapshot(path: PathBuf) -> Self {
        let stamp = FileStamp::of(&path);
        Self { path, stamp }
    }

    /// Whether the file differs from its snapshot.
    #[must_use]
    pub fn changed(&self) -> bool {
        FileStamp::of(&self.path) != self.stamp
    }
}

/// Key/value store for parsed definitions.
///
/// The store owns invalidation: `save` receives the files a definition was
/// built from, stamped before parsing started, and `load` must not return a
/// definition whose files differ from those stamps.
pub trait CacheService: Send + Sync {
    fn load(&self, key: &Path) -> Option<Arc<Definition>>;
    fn save(&self, key: &Path, value: Arc<Definition>, dependencies: Vec<FileDependency>);
    /// Drop one entry. Returns whether it was present.
    fn invalidate(&self, key: &Path) -> bool;
    fn clear(&self);
}

struct CacheEntry {
    definition: Arc<Definition>,
    dependencies: Vec<FileDependency>,
}

impl CacheEntry {
    fn changed_dependency(&self) -> Option<&Path> {
        self.dependencies
            .iter()
            .find(|dep| dep.changed())
            .map(|dep| dep.path.as_path())
    }
}

/// In-process LRU store validating dependency stamps on every load.
pub struct MemoryCache {
    entries: Mutex<LruCache<PathBuf, CacheEntry>>,
}

impl MemoryCache {
    /// Create a store holding at most `capacity` definitions (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        info!(capacity = capacity.get(), "Initializing definition cache");
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheService for MemoryCache {
    fn load(&self, key: &Path) -> Option<Arc<Definition>> {
        let mut entries = self.entries.lock();
        let stale = {
            let entry = entries.get(key)?;
            match entry.changed_dependency() {
                None => {
                    debug!(key = %key.display(), "Definition cache hit");
                    return Some(Arc::clone(&entry.definition));
                }
                Some(path) => path.to_path_buf(),
            }
        };
        entries.pop(key);
        info!(
            key = %key.display(),
            changed = %stale.display(),
            "Definition cache entry invalidated by dependency change"
        );
        None
    }

    fn save(&self, key: &Path, value: Arc<Definition>, dependencies: Vec<FileDependency>) {
        let mut entries = self.entries.lock();
        debug!(
            key = %key.display(),
            dependencies = dependencies.len(),
            cache_size = entries.len() + 1,
            "Definition cached"
        );
        entries.put(
            key.to_path_buf(),
            CacheEntry {
                definition: value,
                dependencies,
            },
        );
    }

    fn invalidate(&self, key: &Path) -> bool {
        self.entries.lock().pop(key).is_some()
    }

    fn clear(&self) {
        let mut entries = self.entries.lock();
        let dropped = entries.len();
        entries.clear();
        info!(dropped, "Definition cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    fn snapshot(files: &[&Path]) -> Vec<FileDependency> {
        files
            .iter()
            .map(|f| FileDependency::snapshot(f.to_path_buf()))
            .collect()
    }

    fn def(version: &str) -> Arc<Definition> {
        Arc::new(Definition {
            version: Some(version.to_string()),
            ..Default::default()
        })
    }

    #[test]
    fn test_hit_while_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("index.raml");
        std::fs::write(&file, "version: v1\n").unwrap();

        let cache = MemoryCache::new(4);
        cache.save(&file, def("v1"), snapshot(&[file.as_path()]));
        let loaded = cache.load(&file).unwrap();
        assert_eq!(loaded.version.as_deref(), Some("v1"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_miss_after_touch() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("index.raml");
        std::fs::write(&file, "version: v1\n").unwrap();

        let cache = MemoryCache::new(4);
        cache.save(&file, def("v1"), snapshot(&[file.as_path()]));

        let later = SystemTime::now() + Duration::from_secs(10);
        File::options()
            .write(true)
            .open(&file)
            .unwrap()
            .set_modified(later)
            .unwrap();

        assert!(cache.load(&file).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_miss_after_delete() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("extra.raml");
        std::fs::write(&file, "x").unwrap();
        let key = dir.path().join("index.raml");

        let cache = MemoryCache::new(4);
        cache.save(&key, def("v1"), snapshot(&[file.as_path()]));
        std::fs::remove_file(&file).unwrap();
        assert!(cache.load(&key).is_none());
    }

    #[test]
    fn test_lru_eviction_and_invalidate() {
        let cache = MemoryCache::new(1);
        cache.save(Path::new("/a"), def("a"), vec![]);
        cache.save(Path::new("/b"), def("b"), vec![]);
        assert!(cache.load(Path::new("/a")).is_none());
        assert!(cache.load(Path::new("/b")).is_some());
        assert!(cache.invalidate(Path::new("/b")));
        assert!(!cache.invalidate(Path::new("/b")));
    }

    #[test]
    fn test_stamps_are_those_taken_at_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("index.raml");
        std::fs::write(&file, "version: v1\n").unwrap();
        let deps = snapshot(&[file.as_path()]);

        // Written after the snapshot but before the save.
        std::fs::write(&file, "version: v2 with more bytes\n").unwrap();
        let cache = MemoryCache::new(4);
        cache.save(&file, def("v1"), deps);
        assert!(cache.load(&file).is_none());
    }

    #[test]
    fn test_file_missing_at_snapshot_counts_as_change_once_created() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("later.raml");
        let dep = FileDependency::snapshot(file.clone());
        assert_eq!(dep.stamp, None);
        assert!(!dep.changed());
        std::fs::write(&file, "x").unwrap();
        assert!(dep.changed());
    }
}
