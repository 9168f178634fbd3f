use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("save file not found: {}", .path.display())]
    DocumentNotFound { path: PathBuf },

    #[error("malformed save file {}: {reason}", .path.display())]
    DocumentMalformed { path: PathBuf, reason: String },

    #[error("invalid game float {raw:?}: {reason}")]
    Encoding { raw: String, reason: String },

    #[error("failed to create backup {} of {}: {reason}", .backup.display(), .path.display())]
    BackupFailed {
        path: PathBuf,
        backup: PathBuf,
        reason: String,
    },

    #[error("failed to write {}: {reason}{}", .path.display(), restore_hint(.backup))]
    WriteFailed {
        path: PathBuf,
        backup: Option<PathBuf>,
        reason: String,
    },

    #[error("watching {} failed: {reason}", .path.display())]
    Watch { path: PathBuf, reason: String },

    #[error("not a save game: {} (expected a file named {expected})", .path.display())]
    NotASaveFile {
        path: PathBuf,
        expected: &'static str,
    },

    #[error("preferences at {}: {reason}", .path.display())]
    Preferences { path: PathBuf, reason: String },

    #[error("no save game selected")]
    NoSavePath,

    #[error("no island with index {0}")]
    UnknownCandidate(usize),

    #[error("the island list is out of date after a failed write; rescan first")]
    StaleIndex,

    #[error("busy: {0}")]
    Busy(&'static str),

    #[error("io error: {0}")]
    Io(String),
}

impl Error {
    /// Backup path a user can restore from, for failures that happen after
    /// the backup was written.
    pub fn backup_path(&self) -> Option<&std::path::Path> {
        match self {
            Error::WriteFailed { backup, .. } => backup.as_deref(),
            _ => None,
        }
    }
}

fn restore_hint(backup: &Option<PathBuf>) -> String {
    match backup {
        Some(backup) => format!(" (restore it from the backup at {})", backup.display()),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
