//! Single owner of the save path, the island list and the watch state.
//!
//! Scans, relocations and alias updates all go through one `Session`, one
//! call at a time; [`spawn_session`] puts it behind an inbox so watcher
//! notifications and user requests are serialized.

mod event_loop;
mod protocol;

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::alias::{self, AliasStore, NO_ALIAS};
use crate::document::{self, SaveDocument, SAVE_FILE_NAME};
use crate::error::{Error, Result};
use crate::index::{self, IndexOptions, IslandCandidate};
use crate::mutation::{self, Relocation};
use crate::watch::{ChangeDecision, FileStamp, WatchCoordinator, WatchState};

pub use event_loop::{spawn_session, SessionHandle};
pub use protocol::{Notice, Request, Response, SessionEvent};

pub struct Session {
    options: IndexOptions,
    aliases: Box<dyn AliasStore + Send>,
    save_path: Option<PathBuf>,
    candidates: Vec<IslandCandidate>,
    watch: WatchCoordinator,
    /// Set after a failed write: the list no longer matches the file.
    stale: bool,
}

impl Session {
    pub fn new(options: IndexOptions, aliases: Box<dyn AliasStore + Send>) -> Self {
        Self {
            options,
            aliases,
            save_path: None,
            candidates: Vec::new(),
            watch: WatchCoordinator::new(),
            stale: false,
        }
    }

    pub fn save_path(&self) -> Option<&Path> {
        self.save_path.as_deref()
    }

    pub fn candidates(&self) -> &[IslandCandidate] {
        &self.candidates
    }

    pub fn watch_state(&self) -> &WatchState {
        self.watch.state()
    }

    /// The save path remembered from an earlier run, if any.
    pub fn remembered_path(&self) -> Option<PathBuf> {
        alias::last_save_path(&*self.aliases)
    }

    /// Make `path` the current save, arm the watch and scan it.
    pub fn open(&mut self, path: &Path, remember: bool) -> Result<&[IslandCandidate]> {
        if !document::is_save_file(path) {
            return Err(Error::NotASaveFile {
                path: path.to_path_buf(),
                expected: SAVE_FILE_NAME,
            });
        }
        if self.watch.is_mutating() {
            return Err(Error::Busy("a relocation is in progress"));
        }

        self.save_path = Some(path.to_path_buf());
        self.watch.arm();
        if remember {
            if let Err(e) = alias::remember_save_path(&mut *self.aliases, path) {
                warn!(error = %e, "save_path_not_remembered");
            }
        }
        info!(save = %path.display(), "save_opened");
        Ok(self.scan())
    }

    /// Rebuild the island list from disk.
    ///
    /// Failures are logged and leave an empty list behind.
    pub fn scan(&mut self) -> &[IslandCandidate] {
        if self.watch.is_mutating() {
            warn!("scan_refused_during_relocation");
            return &self.candidates;
        }
        let Some(path) = self.save_path.clone() else {
            warn!("scan_without_save_path");
            self.candidates.clear();
            return &self.candidates;
        };

        let stamp = FileStamp::read(&path).ok();
        match self.load_candidates(&path) {
            Ok(found) => {
                self.watch.record(stamp);
                info!(save = %path.display(), candidates = found.len(), "scan_complete");
                self.candidates = found;
                self.stale = false;
            }
            Err(e) => {
                warn!(save = %path.display(), error = %e, "scan_failed");
                self.candidates.clear();
            }
        }
        &self.candidates
    }

    fn load_candidates(&self, path: &Path) -> Result<Vec<IslandCandidate>> {
        let doc = SaveDocument::load(path)?;
        index::index(&doc, &self.options, &*self.aliases).map_err(|e| Error::DocumentMalformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn candidate(&self, index: usize) -> Result<&IslandCandidate> {
        self.candidates.get(index).ok_or(Error::UnknownCandidate(index))
    }

    /// Store a display alias for an island. A blank alias removes it.
    pub fn rename(&mut self, index: usize, alias: &str) -> Result<&IslandCandidate> {
        let alias = match alias.trim() {
            "" => NO_ALIAS,
            trimmed => trimmed,
        };
        let key = self.candidate(index)?.name.clone();
        self.aliases.set(&key, alias)?;

        let candidate = &mut self.candidates[index];
        candidate.alias = alias.to_string();
        Ok(candidate)
    }

    /// Back up the save and move the player to the island at `index`.
    pub fn relocate(&mut self, index: usize) -> Result<Relocation> {
        self.relocate_with(index, mutation::relocate)
    }

    fn relocate_with<F>(&mut self, index: usize, rewrite: F) -> Result<Relocation>
    where
        F: FnOnce(&Path, &IslandCandidate) -> Result<Relocation>,
    {
        let path = self.save_path.clone().ok_or(Error::NoSavePath)?;
        if self.stale {
            return Err(Error::StaleIndex);
        }
        let target = self.candidate(index)?.clone();
        if !self.watch.begin_mutation() {
            return Err(Error::Busy(
                "the save is already being rewritten or a rescan question is open",
            ));
        }

        let outcome = rewrite(&path, &target);
        let written = match &outcome {
            Ok(_) => FileStamp::read(&path).ok(),
            Err(_) => None,
        };
        self.watch.finish_mutation(written);

        if let Err(Error::WriteFailed { .. }) = &outcome {
            self.stale = true;
            self.candidates.clear();
        }
        outcome
    }

    /// A change notification reached the owner.
    ///
    /// The file is inspected here, on the owner's turn, so notifications
    /// raised by our own write or by a read compare equal to the known stamp.
    /// A save that is momentarily gone is not a change; its re-creation is.
    pub fn on_file_changed(&mut self, path: &Path) -> ChangeDecision {
        if self.save_path.as_deref() != Some(path) {
            return ChangeDecision::Ignore;
        }
        match FileStamp::read(path) {
            Ok(current) => self.watch.on_change(current),
            Err(e) => {
                debug!(save = %path.display(), error = %e, "changed_save_unreadable");
                ChangeDecision::Ignore
            }
        }
    }

    /// Answer a pending rescan question. Returns the new list if it rescanned.
    pub fn on_confirmation(&mut self, rescan: bool) -> Option<&[IslandCandidate]> {
        if self.watch.on_confirmation(rescan) {
            Some(self.scan())
        } else {
            None
        }
    }

    pub fn on_watch_failed(&mut self, path: &Path, reason: &str) -> Option<Error> {
        if self.save_path.as_deref() != Some(path) {
            return None;
        }
        self.watch.disable(reason);
        Some(Error::Watch {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        })
    }

    /// Serve one request.
    pub fn handle(&mut self, request: Request) -> Response {
        if self.watch.awaiting_confirmation() && !matches!(request, Request::Answer(_)) {
            self.on_confirmation(false);
        }

        match request {
            Request::Open { path, remember } => match self.open(&path, remember) {
                Ok(found) => Response::Candidates(found.to_vec()),
                Err(e) => Response::Failed(e),
            },
            Request::Scan => Response::Candidates(self.scan().to_vec()),
            Request::List => Response::Candidates(self.candidates.clone()),
            Request::Items(index) => match self.candidate(index) {
                Ok(c) => Response::Items {
                    label: c.label().to_string(),
                    items: c.items.clone(),
                },
                Err(e) => Response::Failed(e),
            },
            Request::Rename { index, alias } => match self.rename(index, &alias) {
                Ok(c) => Response::Renamed {
                    index,
                    label: c.label().to_string(),
                    alias: c.alias.clone(),
                },
                Err(e) => Response::Failed(e),
            },
            Request::Relocate(index) => match self.relocate(index) {
                Ok(relocation) => Response::Relocated {
                    island: self
                        .candidates
                        .get(index)
                        .map(|c| c.label().to_string())
                        .unwrap_or_default(),
                    backup: relocation.backup_path,
                },
                Err(e) => Response::Failed(e),
            },
            Request::Answer(rescan) => {
                Response::Answered(self.on_confirmation(rescan).map(<[IslandCandidate]>::to_vec))
            }
            Request::Status => Response::Status {
                save_path: self.save_path.clone(),
                watch: self.watch.state().clone(),
                candidates: self.candidates.len(),
            },
            Request::Quit => Response::Closed,
        }
    }
}
