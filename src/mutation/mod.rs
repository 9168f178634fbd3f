//! Moving the player to a home island by rewriting the save.
//!
//! The protocol is strictly ordered: byte copy of the current save to a
//! timestamped backup, then the position fields are rewritten in the parsed
//! tree, then the tree is written over the save. A crash between the backup
//! and the rewrite leaves the original save in place next to an unused
//! backup; nothing tries to make the two steps atomic.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tracing::{info, warn};

use crate::codec;
use crate::document::{PathError, SaveDocument};
use crate::error::{Error, Result};
use crate::index::IslandCandidate;

pub const WORLD_ORIGIN_PATH: [&str; 3] = ["Persistent", "TerrainGeneration", "WorldOriginPoint"];
pub const PLAYER_POSITION_PATH: [&str; 3] = ["Persistent", "TerrainGeneration", "playerPosition"];
pub const PLAYER_TRANSFORM_PATH: [&str; 4] =
    ["Persistent", "PlayerMovement", "Transform", "localPosition"];

/// Outcome of a successful relocation.
#[derive(Debug, Clone)]
pub struct Relocation {
    pub backup_path: PathBuf,
    /// The tree that was written.
    pub document: SaveDocument,
}

/// `<save>.bak_<unix seconds>`
pub fn backup_path(save_path: &Path, unix_secs: u64) -> PathBuf {
    let mut name = save_path.as_os_str().to_owned();
    name.push(format!(".bak_{unix_secs}"));
    PathBuf::from(name)
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub fn relocate(save_path: &Path, target: &IslandCandidate) -> Result<Relocation> {
    relocate_at(save_path, target, unix_now())
}

/// [`relocate`] with an explicit backup timestamp.
pub fn relocate_at(
    save_path: &Path,
    target: &IslandCandidate,
    unix_secs: u64,
) -> Result<Relocation> {
    let backup = backup_path(save_path, unix_secs);
    create_backup(save_path, &backup).map_err(|e| Error::BackupFailed {
        path: save_path.to_path_buf(),
        backup: backup.clone(),
        reason: e.to_string(),
    })?;

    let mut document = SaveDocument::load(save_path)?;
    apply_relocation(&mut document, target).map_err(|e| Error::DocumentMalformed {
        path: save_path.to_path_buf(),
        reason: e.to_string(),
    })?;

    write_relocated(&document, save_path, &backup)?;

    info!(
        island = %target.name,
        save = %save_path.display(),
        backup = %backup.display(),
        "relocated"
    );
    Ok(Relocation {
        backup_path: backup,
        document,
    })
}

/// Point the world origin at the island and put the player on its reference
/// position. Nothing else in the tree changes.
pub fn apply_relocation(
    doc: &mut SaveDocument,
    target: &IslandCandidate,
) -> std::result::Result<(), PathError> {
    let origin = target.origin;
    let reference = target.reference;

    set_float(doc, &WORLD_ORIGIN_PATH, "x", origin.x)?;
    set_float(doc, &WORLD_ORIGIN_PATH, "z", origin.z)?;

    for group in [&PLAYER_POSITION_PATH[..], &PLAYER_TRANSFORM_PATH[..]] {
        set_float(doc, group, "x", reference.x)?;
        set_float(doc, group, "y", reference.y)?;
        set_float(doc, group, "z", reference.z)?;
    }
    Ok(())
}

fn set_float(
    doc: &mut SaveDocument,
    group: &[&str],
    axis: &str,
    value: f32,
) -> std::result::Result<(), PathError> {
    let mut path = group.to_vec();
    path.push(axis);
    doc.set_at(&path, Value::String(codec::encode(value)))
}

/// Write-once byte copy. An existing file at `backup` is never replaced.
fn create_backup(save_path: &Path, backup: &Path) -> io::Result<u64> {
    let mut source = File::open(save_path)?;
    let mut target = OpenOptions::new().write(true).create_new(true).open(backup)?;
    let copied = io::copy(&mut source, &mut target).and_then(|n| target.sync_all().map(|_| n));
    if copied.is_err() {
        drop(target);
        let _ = fs::remove_file(backup);
    }
    copied
}

fn write_relocated(document: &SaveDocument, save_path: &Path, backup: &Path) -> Result<()> {
    document.write(save_path).map_err(|e| {
        warn!(
            save = %save_path.display(),
            backup = %backup.display(),
            error = %e,
            "relocation_write_failed"
        );
        match e {
            Error::WriteFailed { path, reason, .. } => Error::WriteFailed {
                path,
                backup: Some(backup.to_path_buf()),
                reason,
            },
            other => other,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SAVE_FILE_NAME;
    use crate::index::{ItemTally, Origin, Position};
    use serde_json::json;
    use tempfile::TempDir;

    fn target() -> IslandCandidate {
        IslandCandidate {
            name: "ISLAND_2".into(),
            raw_id: "NODE_2_ISLAND_2".into(),
            alias: "none".into(),
            is_home: true,
            origin: Origin { x: 750.0, z: -250.0 },
            reference: Position::new(1.5, 2.25, -3.0),
            items: ItemTally::new(),
        }
    }

    fn save_value() -> Value {
        json!({
            "Version": "0.1",
            "Persistent": {
                "TerrainGeneration": {
                    "WorldOriginPoint": { "x": "~f0", "y": "~f0", "z": "~f0" },
                    "playerPosition": { "x": "~f9", "y": "~f9", "z": "~f9" },
                    "Nodes": { "NODE_2_ISLAND_2": { "biome": "ISLAND", "seed": 1234 } }
                },
                "PlayerMovement": {
                    "Transform": {
                        "localPosition": { "x": "~f9", "y": "~f9", "z": "~f9" },
                        "localRotation": { "w": "~f1" }
                    },
                    "stamina": 0.75
                }
            }
        })
    }

    fn write_save(dir: &TempDir) -> PathBuf {
        let path = dir.path().join(SAVE_FILE_NAME);
        fs::write(&path, serde_json::to_vec(&save_value()).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_backup_path_format() {
        assert_eq!(
            backup_path(Path::new("/data/Save.json"), 1445000000),
            PathBuf::from("/data/Save.json.bak_1445000000")
        );
    }

    #[test]
    fn test_relocate_rewrites_only_position_groups() {
        let temp = TempDir::new().unwrap();
        let save = write_save(&temp);
        let original = fs::read(&save).unwrap();

        let relocation = relocate_at(&save, &target(), 42).unwrap();
        assert_eq!(relocation.backup_path, backup_path(&save, 42));
        assert_eq!(fs::read(&relocation.backup_path).unwrap(), original);

        let mut expected = save_value();
        let tg = &mut expected["Persistent"]["TerrainGeneration"];
        tg["WorldOriginPoint"]["x"] = json!("~f750");
        tg["WorldOriginPoint"]["z"] = json!("~f-250");
        for axis in [("x", "~f1.5"), ("y", "~f2.25"), ("z", "~f-3")] {
            tg["playerPosition"][axis.0] = json!(axis.1);
        }
        let lp = &mut expected["Persistent"]["PlayerMovement"]["Transform"]["localPosition"];
        for axis in [("x", "~f1.5"), ("y", "~f2.25"), ("z", "~f-3")] {
            lp[axis.0] = json!(axis.1);
        }

        let written = SaveDocument::load(&save).unwrap();
        assert_eq!(written.value(), &expected);
        assert_eq!(written, relocation.document);
    }

    #[test]
    fn test_existing_backup_aborts_without_touching_save() {
        let temp = TempDir::new().unwrap();
        let save = write_save(&temp);
        let original = fs::read(&save).unwrap();
        fs::write(backup_path(&save, 7), b"older backup").unwrap();

        let err = relocate_at(&save, &target(), 7).unwrap_err();
        assert!(matches!(err, Error::BackupFailed { .. }));
        assert_eq!(fs::read(&save).unwrap(), original);
        assert_eq!(fs::read(backup_path(&save, 7)).unwrap(), b"older backup");
    }

    #[test]
    fn test_missing_save_fails_backup() {
        let temp = TempDir::new().unwrap();
        let save = temp.path().join(SAVE_FILE_NAME);
        assert!(matches!(
            relocate_at(&save, &target(), 1),
            Err(Error::BackupFailed { .. })
        ));
        assert!(!backup_path(&save, 1).exists());
    }

    #[test]
    fn test_missing_groups_leave_save_untouched() {
        let temp = TempDir::new().unwrap();
        let save = temp.path().join(SAVE_FILE_NAME);
        fs::write(&save, br#"{"Persistent":{}}"#).unwrap();

        let err = relocate_at(&save, &target(), 3).unwrap_err();
        assert!(matches!(err, Error::DocumentMalformed { .. }));
        assert_eq!(fs::read(&save).unwrap(), br#"{"Persistent":{}}"#);
        assert!(backup_path(&save, 3).exists());
    }

    #[test]
    fn test_write_failure_names_backup() {
        let temp = TempDir::new().unwrap();
        let unreachable = temp.path().join("missing").join(SAVE_FILE_NAME);
        let backup = temp.path().join("Save.json.bak_5");
        let doc = SaveDocument::from_value(save_value());

        let err = write_relocated(&doc, &unreachable, &backup).unwrap_err();
        assert_eq!(err.backup_path(), Some(backup.as_path()));
        assert!(err.to_string().contains("Save.json.bak_5"));
    }
}
