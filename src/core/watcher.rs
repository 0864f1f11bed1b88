//! Rebuilding output whenever a tutorial repository's refs move.

use crate::utils::error::Result;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Editor auto-saves and Git's own lock files.
pub fn is_ignored_file_name(name: &str) -> bool {
    name.ends_with(".lock")
        || name.starts_with(".#")
        || name.ends_with('~')
        || (name.len() > 1 && name.starts_with('#') && name.ends_with('#'))
}

/// Whether a change at `path` can move the tip of a tutorial: `HEAD`,
/// `packed-refs`, or anything under `refs/`.
pub fn is_relevant_change(git_dirs: &[PathBuf], path: &Path) -> bool {
    let Some(relative) = git_dirs.iter().find_map(|dir| path.strip_prefix(dir).ok()) else {
        return false;
    };

    match relative.file_name().and_then(|name| name.to_str()) {
        Some(name) if !is_ignored_file_name(name) => {}
        _ => return false,
    }

    relative == Path::new("HEAD")
        || relative == Path::new("packed-refs")
        || relative.starts_with("refs")
}

fn event_is_relevant(git_dirs: &[PathBuf], event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|p| is_relevant_change(git_dirs, p))
}

/// Run `rebuild` once, then again after each quiet period following a
/// relevant change under `git_dir`, until Ctrl-C.
pub async fn watch_repository<F, Fut>(git_dir: PathBuf, debounce: Duration, mut rebuild: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    // notify may report canonical paths, so match against both forms.
    let mut git_dirs = vec![git_dir.clone()];
    if let Ok(canonical) = std::fs::canonicalize(&git_dir) {
        if canonical != git_dir {
            git_dirs.push(canonical);
        }
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher: RecommendedWatcher =
        notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if tx.send(event).is_err() {
                    debug!("Dropping file system event after shutdown");
                }
            }
            Err(e) => error!("File system watcher error: {}", e),
        })?;
    watcher.watch(&git_dir, RecursiveMode::Recursive)?;

    info!("Watching {} for changes (Ctrl-C to stop)", git_dir.display());
    rebuild().await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Stopping watcher");
                break;
            }
            event = rx.recv() => {
                let Some(event) = event else {
                    warn!("Watcher channel disconnected");
                    break;
                };
                if !event_is_relevant(&git_dirs, &event) {
                    continue;
                }
                debug!("Change detected: {:?}", event.paths);

                // Wait for the burst of events from one git operation to settle.
                while let Ok(Some(_)) = tokio::time::timeout(debounce, rx.recv()).await {}

                info!("Rebuilding");
                rebuild().await;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind};

    fn git_dirs() -> Vec<PathBuf> {
        vec![PathBuf::from("/work/tutorials/.git")]
    }

    #[test]
    fn test_ignored_file_names() {
        assert!(is_ignored_file_name("main.lock"));
        assert!(is_ignored_file_name(".#tutorial.md"));
        assert!(is_ignored_file_name("tutorial.md~"));
        assert!(is_ignored_file_name("#tutorial.md#"));
        assert!(!is_ignored_file_name("main"));
        assert!(!is_ignored_file_name("#"));
    }

    #[test]
    fn test_relevant_changes() {
        let dirs = git_dirs();
        assert!(is_relevant_change(&dirs, Path::new("/work/tutorials/.git/HEAD")));
        assert!(is_relevant_change(&dirs, Path::new("/work/tutorials/.git/packed-refs")));
        assert!(is_relevant_change(
            &dirs,
            Path::new("/work/tutorials/.git/refs/heads/bunner")
        ));

        assert!(!is_relevant_change(
            &dirs,
            Path::new("/work/tutorials/.git/refs/heads/bunner.lock")
        ));
        assert!(!is_relevant_change(&dirs, Path::new("/work/tutorials/.git/index")));
        assert!(!is_relevant_change(
            &dirs,
            Path::new("/work/tutorials/.git/objects/ab/cdef")
        ));
        assert!(!is_relevant_change(&dirs, Path::new("/work/tutorials/bunner/code.py")));
    }

    #[test]
    fn test_event_relevance_by_kind() {
        let dirs = git_dirs();
        let path = PathBuf::from("/work/tutorials/.git/refs/heads/bunner");

        let created = Event::new(EventKind::Create(CreateKind::File)).add_path(path.clone());
        assert!(event_is_relevant(&dirs, &created));

        let modified = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(path.clone());
        assert!(event_is_relevant(&dirs, &modified));

        let accessed = Event::new(EventKind::Access(notify::event::AccessKind::Any)).add_path(path);
        assert!(!event_is_relevant(&dirs, &accessed));
    }
}
