//! Deeply Lost
//!
//! Finds the home islands in a Stranded Deep save file and moves the
//! player onto one of them, keeping a backup of the save it rewrites.

pub mod alias;
pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod mutation;
pub mod session;
pub mod watch;

pub use error::{Error, Result};
pub use alias::{AliasStore, JsonFileStore, MemoryAliasStore};
pub use config::{QueryMode, StartupConfig};
pub use document::{SaveDocument, SAVE_FILE_NAME};
pub use index::{index, HomePolicy, IndexOptions, IslandCandidate, Origin, Position};
pub use mutation::{relocate, Relocation};
pub use session::{spawn_session, Session, SessionHandle};
pub use watch::{WatchCoordinator, WatchState};
