//! Filesystem watcher bridge.
//!
//! Uses the `notify` crate with debouncing (100ms) to translate raw
//! filesystem events into the engine's `on_file_changed` /
//! `on_file_deleted` / `on_directory_changed` handlers. Events inside
//! ignored directories or on unsupported extensions are dropped before they
//! reach the engine; the handlers' hash gate makes replayed or coalesced
//! events harmless.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use strata_analyzers::walker::path_is_skipped;
use strata_core::cancel::CancelToken;

use crate::IndexEngine;

const DEBOUNCE: Duration = Duration::from_millis(100);

/// Keeps the watcher and its dispatch thread alive; dropping it stops both.
pub struct WatchGuard {
    watcher: Option<RecommendedWatcher>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        // Dropping the watcher closes the event channel; only then can the
        // dispatch thread observe the disconnect and exit.
        self.watcher.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Start watching `root` and feeding changes into `engine`.
///
/// The engine must have been indexed for `root` already; events for other
/// roots are meaningless and the caller is responsible for stopping the
/// watch before switching projects.
pub fn start_watching(
    root: &Path,
    engine: Arc<IndexEngine>,
) -> Result<WatchGuard, notify::Error> {
    let (tx, rx) = mpsc::channel::<PathBuf>();
    let root = root.to_path_buf();

    let filter_root = root.clone();
    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        let Ok(event) = res else { return };
        if !matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        ) {
            return;
        }
        for path in event.paths {
            if should_forward(&filter_root, &path) {
                let _ = tx.send(path);
            }
        }
    })?;
    watcher.watch(&root, RecursiveMode::Recursive)?;

    let handle = std::thread::spawn(move || dispatch_loop(rx, root, engine));

    Ok(WatchGuard {
        watcher: Some(watcher),
        handle: Some(handle),
    })
}

/// Collect events for the debounce window, then apply the batch.
fn dispatch_loop(rx: mpsc::Receiver<PathBuf>, root: PathBuf, engine: Arc<IndexEngine>) {
    let mut batch: Vec<PathBuf> = Vec::new();
    loop {
        match rx.recv_timeout(DEBOUNCE) {
            Ok(path) => {
                if !batch.contains(&path) {
                    batch.push(path);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if !batch.is_empty() {
                    apply_batch(&engine, &root, std::mem::take(&mut batch));
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                if !batch.is_empty() {
                    apply_batch(&engine, &root, std::mem::take(&mut batch));
                }
                break;
            }
        }
    }
}

fn apply_batch(engine: &IndexEngine, root: &Path, batch: Vec<PathBuf>) {
    let cancel = CancelToken::new();
    for path in batch {
        let result = if path.is_dir() {
            engine.on_directory_changed(&path, root, &cancel)
        } else {
            engine.on_file_changed(&path, root)
        };
        if let Err(err) = result {
            tracing::warn!(path = %path.display(), error = %err, "watch event failed");
        }
    }
}

/// Pre-filter: only analyzable files (or directories) outside the skip set
/// reach the dispatch thread.
fn should_forward(root: &Path, path: &Path) -> bool {
    let rel = match path.strip_prefix(root) {
        Ok(rel) => rel,
        Err(_) => return false,
    };
    if path_is_skipped(rel) {
        return false;
    }
    // Directory events are forwarded whole; file events need a known
    // extension. A removed path cannot be stat'ed, so extension absence only
    // drops paths that never were analyzable.
    path.extension().is_none() || has_supported_extension(path)
}

fn has_supported_extension(path: &Path) -> bool {
    const WATCHED: &[&str] = &[
        "go", "ts", "tsx", "js", "jsx", "mjs", "java", "kt", "kts", "vue", "dart", "py", "pyw",
        "pyi", "rs", "cs",
    ];
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| WATCHED.iter().any(|w| e.eq_ignore_ascii_case(w)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_forward_source_files() {
        let root = PathBuf::from("/project");
        assert!(should_forward(&root, &PathBuf::from("/project/src/a.ts")));
        assert!(should_forward(&root, &PathBuf::from("/project/lib/b.py")));
        assert!(should_forward(&root, &PathBuf::from("/project/App.Vue")));
    }

    #[test]
    fn test_should_drop_foreign_and_unsupported() {
        let root = PathBuf::from("/project");
        assert!(!should_forward(&root, &PathBuf::from("/elsewhere/a.ts")));
        assert!(!should_forward(&root, &PathBuf::from("/project/readme.md")));
        assert!(!should_forward(&root, &PathBuf::from("/project/image.png")));
    }

    #[test]
    fn test_should_drop_ignored_dirs() {
        let root = PathBuf::from("/project");
        assert!(!should_forward(
            &root,
            &PathBuf::from("/project/node_modules/x.ts")
        ));
        assert!(!should_forward(&root, &PathBuf::from("/project/.git/a.py")));
        assert!(!should_forward(&root, &PathBuf::from("/project/dist/out.js")));
        assert!(!should_forward(
            &root,
            &PathBuf::from("/project/.strata/catalog.db")
        ));
    }

    #[test]
    fn test_directories_are_forwarded() {
        let root = PathBuf::from("/project");
        assert!(should_forward(&root, &PathBuf::from("/project/src")));
    }

    #[test]
    fn test_end_to_end_watch_updates_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.rs"), "pub fn before(){}\n").unwrap();

        let engine = Arc::new(IndexEngine::new());
        engine
            .ensure_indexed(dir.path(), &CancelToken::new())
            .unwrap();
        assert!(engine.find_definition("before", None).is_some());

        let guard = start_watching(dir.path(), Arc::clone(&engine)).unwrap();
        std::fs::write(dir.path().join("x.rs"), "pub fn after(){}\n").unwrap();

        // Debounce plus platform watch latency.
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while engine.find_definition("after", None).is_none()
            && std::time::Instant::now() < deadline
        {
            std::thread::sleep(Duration::from_millis(50));
        }
        drop(guard);

        assert!(engine.find_definition("after", None).is_some());
        assert!(engine.find_definition("before", None).is_none());
    }
}
