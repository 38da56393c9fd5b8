/*
 * Created on Thu Jul 31 2026
 *
 * This file is a part of Skytable
 * Skytable (formerly known as TerrabaseDB or Skybase) is a free and open-source
 * NoSQL database written by Sayan Nandan ("the Author") with the
 * vision to provide flexibility in data modelling without compromising
 * on performance, queryability or scalability.
 *
 * Copyright (c) 2026, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

use std::io;
use std::path::{Path, PathBuf};

/// Creates `<app_path>/<kind>` if missing. Already-exists is success, matching the original
/// feature's treatment of `TRI_ERROR_FILE_EXISTS` as a non-error.
pub fn ensure_base_app_dir(app_path: &Path, kind: &str) -> io::Result<PathBuf> {
    let dir = app_path.join(kind);
    match std::fs::create_dir_all(&dir) {
        Ok(()) => {
            log::info!("created application directory '{}'", dir.display());
            Ok(dir)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(dir),
        Err(e) => Err(e),
    }
}

/// Creates `<app_path>/db/<name>`, recursively. Logs at trace level while the WAL is in
/// recovery (mirroring the original's rationale: routine directory creation during replay
/// shouldn't spam the info log), at info level otherwise.
pub fn ensure_database_app_dir(
    name: &str,
    app_path: &Path,
    wal_in_recovery: bool,
) -> io::Result<PathBuf> {
    let dir = app_path.join("db").join(name);
    match std::fs::create_dir_all(&dir) {
        Ok(()) => {
            if wal_in_recovery {
                log::trace!("created database application directory '{}'", dir.display());
            } else {
                log::info!("created database application directory '{}'", dir.display());
            }
            Ok(dir)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(dir),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn base_dir_creation_is_idempotent() {
        let tmp = tempdir().unwrap();
        let first = ensure_base_app_dir(tmp.path(), "_db").unwrap();
        assert!(first.is_dir());
        let second = ensure_base_app_dir(tmp.path(), "_db").unwrap();
        assert_eq!(first, second);
        assert!(second.is_dir());
    }

    #[test]
    fn database_dir_creation_is_idempotent() {
        let tmp = tempdir().unwrap();
        let first = ensure_database_app_dir("_system", tmp.path(), false).unwrap();
        assert!(first.is_dir());
        let second = ensure_database_app_dir("_system", tmp.path(), true).unwrap();
        assert_eq!(first, second);
    }
}
