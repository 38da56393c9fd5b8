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

use crate::collaborators::{CursorRepository, ReplicationApplier};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

pub type DatabaseId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    Normal,
    Coordinator,
}

/// `live -> stopping-compactor -> stopped -> destroyed`. Only the Lifecycle Controller drives
/// the first two transitions (`shutdown_compactor`); `destroyed` is terminal and observed only
/// by whoever physically freed the record, never stored back into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DatabaseState {
    Live = 0,
    StoppingCompactor = 1,
    Stopped = 2,
}

impl DatabaseState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Live,
            1 => Self::StoppingCompactor,
            2 => Self::Stopped,
            _ => unreachable!("invalid database state"),
        }
    }
}

/// One entry of a [`crate::lists::DatabasesLists`] snapshot.
///
/// Records are never mutated through a shared snapshot except via the `state` flag and the
/// compactor/cleanup handles, both of which are only touched by the controller while holding
/// the registry's writer lock or after the record has already been removed from every published
/// snapshot.
pub struct DatabaseRecord {
    pub id: DatabaseId,
    pub name: Box<str>,
    pub ty: DatabaseType,
    pub path: PathBuf,
    pub owns_apps_directory: bool,
    pub cursor_repository: Option<Arc<dyn CursorRepository>>,
    pub applier: Option<Arc<dyn ReplicationApplier>>,
    state: AtomicU8,
    compactor: Mutex<Option<std::thread::JoinHandle<()>>>,
    cleanup: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl std::fmt::Debug for DatabaseRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("path", &self.path)
            .field("state", &self.state())
            .finish()
    }
}

impl DatabaseRecord {
    pub fn new_normal(id: DatabaseId, name: impl Into<Box<str>>, path: PathBuf) -> Self {
        Self {
            id,
            name: name.into(),
            ty: DatabaseType::Normal,
            path,
            owns_apps_directory: true,
            cursor_repository: None,
            applier: None,
            state: AtomicU8::new(DatabaseState::Live as u8),
            compactor: Mutex::new(None),
            cleanup: Mutex::new(None),
        }
    }

    pub fn new_coordinator(id: DatabaseId, name: impl Into<Box<str>>) -> Self {
        Self {
            id,
            name: name.into(),
            ty: DatabaseType::Coordinator,
            path: PathBuf::new(),
            owns_apps_directory: false,
            cursor_repository: None,
            applier: None,
            state: AtomicU8::new(DatabaseState::Live as u8),
            compactor: Mutex::new(None),
            cleanup: Mutex::new(None),
        }
    }

    /// Attaches the replication applier consulted by `unprepare`'s `closeDatabases` step.
    pub fn with_applier(mut self, applier: Arc<dyn ReplicationApplier>) -> Self {
        self.applier = Some(applier);
        self
    }

    pub fn state(&self) -> DatabaseState {
        DatabaseState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, s: DatabaseState) {
        self.state.store(s as u8, Ordering::Release);
    }

    pub fn set_compactor(&self, handle: std::thread::JoinHandle<()>) {
        *self.compactor.lock() = Some(handle);
    }

    pub fn set_cleanup(&self, handle: std::thread::JoinHandle<()>) {
        *self.cleanup.lock() = Some(handle);
    }

    /// Runs the `live -> stopping-compactor -> stopped` transition for one record, as driven by
    /// `shutdown_compactor` and by [`crate::registry::Registry::drop_database`]. Idempotent: if
    /// another caller already won the `Live -> StoppingCompactor` race, this returns immediately
    /// without re-running `request_stop` or re-joining already-joined threads — the two call
    /// sites can race on the same record (a drop request arriving during shutdown) without
    /// double-stopping it.
    pub fn stop_compactor(&self, request_stop: impl FnOnce()) {
        if self
            .state
            .compare_exchange(
                DatabaseState::Live as u8,
                DatabaseState::StoppingCompactor as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }
        request_stop();
        if let Some(h) = self.compactor.lock().take() {
            let _ = h.join();
        }
        self.set_state(DatabaseState::Stopped);
        if let Some(h) = self.cleanup.lock().take() {
            let _ = h.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_transitions_in_order() {
        let rec = DatabaseRecord::new_normal(1, "_system", PathBuf::from("/tmp/x"));
        assert_eq!(rec.state(), DatabaseState::Live);
        let mut stopped_called = false;
        rec.stop_compactor(|| stopped_called = true);
        assert!(stopped_called);
        assert_eq!(rec.state(), DatabaseState::Stopped);
    }

    #[test]
    fn coordinator_records_own_nothing_on_disk() {
        let rec = DatabaseRecord::new_coordinator(2, "c1");
        assert!(!rec.owns_apps_directory);
        assert_eq!(rec.ty, DatabaseType::Coordinator);
    }

    #[test]
    fn stop_compactor_is_idempotent_under_a_race() {
        let rec = Arc::new(DatabaseRecord::new_normal(3, "x", PathBuf::from("/tmp/x")));
        let calls = Arc::new(AtomicU8::new(0));
        let mut handles = vec![];
        for _ in 0..8 {
            let rec = rec.clone();
            let calls = calls.clone();
            handles.push(std::thread::spawn(move || {
                rec.stop_compactor(|| {
                    calls.fetch_add(1, Ordering::Relaxed);
                });
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert_eq!(rec.state(), DatabaseState::Stopped);
    }
}
