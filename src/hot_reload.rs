//! # Hot Reload Module
//!
//! Watches the specification root and invalidates an API version as soon as
//! one of the files under `{spec_root}/{api}/{version}/` is created, modified
//! or removed. The next request for that version re-parses the definition and
//! rebuilds its route table.
//!
//! The definition cache already compares file stamps on every lookup, so the
//! watcher is not needed for correctness; it releases stale definitions and
//! tables early instead of on the next request.
//!
//! ```rust,ignore
//! use specroute::hot_reload::watch_spec_root;
//!
//! let watcher = watch_spec_root(dispatcher.spec_root().to_path_buf(), Arc::clone(&dispatcher))?;
//! // Keep `watcher` alive for as long as reloads should happen.
//! ```
//!
//! If a changed definition fails to parse, the error surfaces on the next
//! request for that version; other versions keep serving.

use crate::dispatcher::Dispatcher;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// `(api, version)` owning `path`, when `path` lies at least two levels below `root`.
#[must_use]
pub fn api_version_of(root: &Path, path: &Path) -> Option<(String, String)> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = relative.components().filter_map(|c| match c {
        Component::Normal(s) => s.to_str(),
        _ => None,
    });
    Some((parts.next()?.to_string(), parts.next()?.to_string()))
}

/// Watch `spec_root` recursively and invalidate API versions on change.
pub fn watch_spec_root(
    spec_root: PathBuf,
    dispatcher: Arc<Dispatcher>,
) -> notify::Result<RecommendedWatcher> {
    // Events carry canonical paths on some platforms.
    let root = spec_root.canonicalize().unwrap_or_else(|_| spec_root.clone());
    let watch_root = root.clone();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if !matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    return;
                }
                for path in &event.paths {
                    let owner = api_version_of(&watch_root, path)
                        .or_else(|| api_version_of(&spec_root, path));
                    let Some((api_name, version)) = owner else {
                        debug!(path = %path.display(), "Change outside any API version");
                        continue;
                    };
                    if dispatcher.invalidate(&api_name, &version) {
                        info!(api_name, version, path = %path.display(), "hot-reload: specification changed");
                    }
                }
            }
            Err(e) => warn!(error = %e, "hot-reload: watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!(spec_root = %root.display(), "hot-reload: watching specification root");
    Ok(watcher)
}
