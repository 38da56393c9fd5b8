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

//! The hazard-protected registry: wait-free lookup, bounded-wait writer.
//!
//! Readers `pin()` an epoch guard and load the current [`DatabasesLists`] through it; a record
//! reached that way stays valid for at least the lifetime of the guard. Writers take
//! `writer_mutex`, build an edited successor snapshot, publish it with a single release store,
//! and hand the old snapshot to the epoch collector via `guard.defer_destroy` — it is reclaimed
//! once every guard that could have observed it has dropped. This is the crate's load-bearing
//! concurrency primitive; see the module-level docs in [`crate::sync::atm`] for the atomic
//! wrapper it is built on.

use crate::lists::DatabasesLists;
use crate::record::DatabaseRecord;
use crate::sync::atm::{cpin, Atomic, Guard, Owned};
use parking_lot::Mutex;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub struct Registry {
    current: Atomic<DatabasesLists>,
    writer_mutex: Mutex<()>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            current: Atomic::new_alloc(DatabasesLists::new()),
            writer_mutex: Mutex::new(()),
        }
    }

    /// Pins the current thread's epoch. The returned guard must outlive every dereference of a
    /// record obtained through [`Registry::snapshot`].
    pub fn pin(&self) -> Guard {
        cpin()
    }

    /// Returns the currently-published snapshot, valid for the lifetime of `guard`.
    pub fn snapshot<'g>(&self, guard: &'g Guard) -> &'g DatabasesLists {
        let shared = self.current.ld_acq(guard);
        // SAFETY: `current` is never null after construction, and the pointee is kept alive by
        // `guard` until the next epoch advances past it.
        unsafe { shared.deref() }
    }

    /// Wait-free (uncontended) lookup of a normal-or-coordinator database by name.
    pub fn lookup<'g>(
        &self,
        guard: &'g Guard,
        name: &str,
    ) -> Option<&'g std::sync::Arc<crate::record::DatabaseRecord>> {
        let snap = self.snapshot(guard);
        snap.databases
            .get(name)
            .or_else(|| snap.coordinator_databases.get(name))
    }

    /// Implements the snapshot-replace protocol of the registry: take the writer lock, clone and
    /// edit the current snapshot, publish it, and defer destruction of the old one until no
    /// pre-existing reader can still observe it.
    pub fn replace(&self, edit: impl FnOnce(&mut DatabasesLists)) {
        let _held = self.writer_mutex.lock();
        let guard = cpin();
        let old = self.current.ld_acq(&guard);
        // SAFETY: held under `writer_mutex`, `old` is never concurrently mutated by another
        // writer; readers only ever read through it.
        let old_ref = unsafe { old.deref() };
        let next = old_ref.edit(edit);
        let new = Owned::new(next);
        match self.current.cx_rel(old, new, &guard) {
            Ok(_) => unsafe {
                guard.defer_destroy(old);
            },
            Err(e) => {
                // lost the race against ourselves — impossible while holding writer_mutex, but
                // keep the allocation from leaking if it ever happens.
                drop(e.new);
            }
        }
    }

    /// Runs `f` over the currently-published snapshot while holding the writer lock, so no
    /// concurrent `replace`/`drop_database` can race with it. Used by steps that must observe a
    /// consistent view of every live database without themselves installing a new snapshot (for
    /// example, stopping replication appliers during `unprepare`).
    pub fn with_writer_lock<R>(&self, f: impl FnOnce(&DatabasesLists) -> R) -> R {
        let _held = self.writer_mutex.lock();
        let guard = cpin();
        let cur = self.current.ld_acq(&guard);
        // SAFETY: held under `writer_mutex`, same reasoning as `replace`.
        let cur_ref = unsafe { cur.deref() };
        f(cur_ref)
    }

    pub fn writer_mutex_is_locked(&self) -> bool {
        self.writer_mutex.is_locked()
    }

    /// Drops a live database by name: runs it through `stop_compactor`'s `live ->
    /// stopping-compactor -> stopped` transition, then moves it from `databases` into
    /// `dropped_databases` in a single snapshot replacement — satisfying the invariant that a
    /// record enters `dropped_databases` only once its state is at least `stopping-compactor`
    /// (by completion of `stop_compactor` it is exactly `stopped`).
    ///
    /// Returns `None` if `name` is not currently published, or if a concurrent caller already
    /// won the race to drop it (the `stop_compactor` transition and the snapshot move both serve
    /// as single-winner points, so two concurrent `drop_database` calls for the same name never
    /// both succeed).
    pub fn drop_database(
        &self,
        name: &str,
        request_stop: impl FnOnce(),
    ) -> Option<Arc<DatabaseRecord>> {
        let record = {
            let guard = self.pin();
            self.snapshot(&guard).databases.get(name).cloned()
        }?;
        record.stop_compactor(request_stop);
        let mut moved = false;
        self.replace(|l| {
            if let Some(rec) = l.databases.remove(name) {
                l.dropped_databases.push(rec);
                moved = true;
            }
        });
        moved.then_some(record)
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        // SAFETY: no other thread can be accessing the registry once it is being dropped.
        unsafe {
            let guard = crate::sync::atm::upin();
            let cur = self.current.load(Ordering::Acquire, guard);
            if !cur.is_null() {
                drop(cur.into_owned());
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
