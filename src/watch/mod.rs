//! External change detection for the save file.
//!
//! The save's directory is watched non-recursively through the OS file
//! notification API. Events for the save are forwarded into the session
//! inbox; all decisions are taken by [`WatchCoordinator`] on the session's
//! own turn.

mod coordinator;

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use notify::event::EventKind;
use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Error, Result};

pub use coordinator::{ChangeDecision, SuspendReason, WatchCoordinator, WatchState};

/// What a change is judged by: identical stamps are the same file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

impl FileStamp {
    pub fn read(path: &Path) -> io::Result<Self> {
        let meta = fs::metadata(path)?;
        Ok(Self {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

/// Messages from the watcher callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Changed { path: PathBuf },
    Failed { path: PathBuf, reason: String },
}

/// A registered watch. Dropping it stops the notifications.
pub struct SaveWatcher {
    path: PathBuf,
    _watcher: RecommendedWatcher,
}

impl SaveWatcher {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for SaveWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveWatcher").field("path", &self.path).finish()
    }
}

/// Watch the directory holding `path` and report writes to `path`.
///
/// The callback runs on the notifier's own thread and only holds a weak
/// sender, so a live watch never keeps the inbox open.
pub fn watch_save<E>(path: &Path, events: mpsc::WeakSender<E>) -> Result<SaveWatcher>
where
    E: From<WatchEvent> + Send + 'static,
{
    let save = path.to_path_buf();
    let dir = watched_dir(path).to_path_buf();
    let file_name = path.file_name().map(OsStr::to_os_string);

    let handler = move |result: notify::Result<Event>| {
        let event = match result {
            Ok(event) if touches_save(&event, file_name.as_deref()) => WatchEvent::Changed {
                path: save.clone(),
            },
            Ok(_) => return,
            Err(e) => {
                warn!(path = %save.display(), error = %e, "watch_failed");
                WatchEvent::Failed {
                    path: save.clone(),
                    reason: e.to_string(),
                }
            }
        };
        let Some(sender) = events.upgrade() else {
            return;
        };
        if let Err(e) = sender.try_send(E::from(event)) {
            debug!(error = %e, "watch_event_dropped");
        }
    };

    let watch_error = |e: notify::Error| Error::Watch {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    let mut watcher =
        RecommendedWatcher::new(handler, NotifyConfig::default()).map_err(watch_error)?;
    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(watch_error)?;
    debug!(path = %path.display(), dir = %dir.display(), "watch_started");

    Ok(SaveWatcher {
        path: path.to_path_buf(),
        _watcher: watcher,
    })
}

fn watched_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Whether `event` is a write-side event on the save file. Reads show up as
/// access events and are not changes.
fn touches_save(event: &Event, file_name: Option<&OsStr>) -> bool {
    let relevant = matches!(
        event.kind,
        EventKind::Any | EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    relevant
        && file_name.is_some()
        && event.paths.iter().any(|p| p.file_name() == file_name)
}
