// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relocation of the config record from its legacy path.
//!
//! Older installs kept the record at `~/.config/keyhold.json`. It now lives
//! in its own directory, `~/.config/keyhold/keyhold.json`.

use std::path::Path;

use keyhold_core::KeyholdError;
use tracing::info;

use crate::record::create_private_dir;

/// What a migration run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyMigration {
    /// No legacy record, or the new record already exists.
    NothingToDo,
    /// The legacy record was renamed into place.
    Moved,
    /// Only the new parent directory was created; the move happens on the
    /// next run.
    ParentCreated,
}

/// Move `legacy` to `current` if the former exists and the latter does not.
///
/// When the parent of `current` is missing this only creates it (mode 0700)
/// and reports [`LegacyMigration::ParentCreated`]; the caller runs the
/// migration again to finish.
pub fn migrate_legacy_record(legacy: &Path, current: &Path) -> Result<LegacyMigration, KeyholdError> {
    if !legacy.is_file() || current.exists() {
        return Ok(LegacyMigration::NothingToDo);
    }

    if let Some(parent) = current.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        create_private_dir(parent)?;
        info!(dir = %parent.display(), "created config directory for legacy record");
        return Ok(LegacyMigration::ParentCreated);
    }

    std::fs::rename(legacy, current).map_err(KeyholdError::storage)?;
    info!(
        from = %legacy.display(),
        to = %current.display(),
        "moved legacy config record"
    );
    Ok(LegacyMigration::Moved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_to_do_without_legacy_file() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = migrate_legacy_record(
            &dir.path().join("keyhold.json"),
            &dir.path().join("keyhold").join("keyhold.json"),
        )
        .unwrap();
        assert_eq!(outcome, LegacyMigration::NothingToDo);
    }

    #[test]
    fn missing_parent_is_created_first() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("keyhold.json");
        let current = dir.path().join("keyhold").join("keyhold.json");
        std::fs::write(&legacy, b"{}").unwrap();

        assert_eq!(
            migrate_legacy_record(&legacy, &current).unwrap(),
            LegacyMigration::ParentCreated
        );
        assert!(legacy.exists());
        assert!(!current.exists());

        assert_eq!(
            migrate_legacy_record(&legacy, &current).unwrap(),
            LegacyMigration::Moved
        );
        assert!(!legacy.exists());
        assert_eq!(std::fs::read(&current).unwrap(), b"{}");
    }

    #[test]
    fn existing_record_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("keyhold.json");
        let parent = dir.path().join("keyhold");
        let current = parent.join("keyhold.json");
        std::fs::create_dir(&parent).unwrap();
        std::fs::write(&legacy, b"old").unwrap();
        std::fs::write(&current, b"new").unwrap();

        assert_eq!(
            migrate_legacy_record(&legacy, &current).unwrap(),
            LegacyMigration::NothingToDo
        );
        assert_eq!(std::fs::read(&current).unwrap(), b"new");
        assert!(legacy.exists());
    }
}
