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

//! Narrow interfaces to the subsystems this crate does not own: the storage engine, the WAL,
//! the scripting engine dealer, the query registry, and cluster membership. Production code
//! binds these to the real subsystems; tests bind them to in-memory fakes.

use crate::record::{DatabaseId, DatabaseRecord};
use std::path::PathBuf;

/// One entry of the persisted catalog, as handed back by [`StorageEngine::get_databases`].
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub id: DatabaseId,
    pub name: String,
}

pub trait StorageEngine: Send + Sync {
    fn initialize(&self) -> Result<(), String>;
    fn shutdown(&self) -> Result<(), String>;
    fn get_databases(&self) -> Result<Vec<CatalogEntry>, String>;
    fn open_database(&self, entry: &CatalogEntry, upgrade: bool) -> Result<DatabaseRecord, String>;
    fn drop_database(&self, _id: DatabaseId) {}
    fn can_remove_vocbase(&self, record: &DatabaseRecord) -> bool;
    fn destroy_vocbase(&self, record: &DatabaseRecord);
    /// True when the on-disk data directory contained nothing on open.
    fn datadir_was_empty(&self) -> bool {
        false
    }
}

pub trait Wal: Send + Sync {
    fn has_found_last_tick(&self) -> bool;
    fn is_in_recovery(&self) -> bool;
}

pub trait ScriptEngineDealer: Send + Sync {
    fn app_path(&self) -> PathBuf;
    /// Registers a callback invoked for every scripting context bound to `record`.
    fn define_context_update(&self, record: &DatabaseRecord);
}

pub trait QueryRegistry: Send + Sync {
    fn expire_queries(&self);
}

pub trait ClusterState: Send + Sync {
    fn is_running_in_cluster(&self) -> bool;
    fn is_coordinator(&self) -> bool;
}

/// A handle to a cursor repository, owned by a [`DatabaseRecord`].
pub trait CursorRepository: Send + Sync {
    fn garbage_collect(&self, expire_immediate: bool);
}

/// A per-database replication applier, stopped during `unprepare`'s `closeDatabases` step so
/// pending replication transactions can end before the database itself is torn down.
pub trait ReplicationApplier: Send + Sync {
    fn stop(&self, wait: bool);
}
