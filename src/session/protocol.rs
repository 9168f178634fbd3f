use std::path::PathBuf;

use tokio::sync::oneshot;

use crate::error::Error;
use crate::index::{IslandCandidate, ItemTally};
use crate::watch::{WatchEvent, WatchState};

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Open { path: PathBuf, remember: bool },
    Scan,
    List,
    Items(usize),
    Rename { index: usize, alias: String },
    Relocate(usize),
    /// Answer to a pending rescan question.
    Answer(bool),
    Status,
    Quit,
}

#[derive(Debug)]
pub enum Response {
    Candidates(Vec<IslandCandidate>),
    Items { label: String, items: ItemTally },
    /// `alias` is the stored value, `NO_ALIAS` when cleared.
    Renamed {
        index: usize,
        label: String,
        alias: String,
    },
    Relocated { island: String, backup: PathBuf },
    /// Result of an answered rescan question; `None` when nothing was scanned.
    Answered(Option<Vec<IslandCandidate>>),
    Status {
        save_path: Option<PathBuf>,
        watch: WatchState,
        candidates: usize,
    },
    Closed,
    Failed(Error),
}

impl Response {
    pub fn is_failure(&self) -> bool {
        matches!(self, Response::Failed(_))
    }
}

/// Messages the session pushes without being asked.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// The save changed on disk; answer with [`Request::Answer`].
    RescanRequested { path: PathBuf },
    /// The watcher stopped; rescans must be requested by hand from now on.
    WatchDisabled { reason: String },
}

/// Everything that reaches the session owner goes through its inbox.
#[derive(Debug)]
pub enum SessionEvent {
    Request(Request, oneshot::Sender<Response>),
    Watch(WatchEvent),
}

impl From<WatchEvent> for SessionEvent {
    fn from(event: WatchEvent) -> Self {
        SessionEvent::Watch(event)
    }
}
