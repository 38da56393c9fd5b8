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

//! The Database Manager: a single background thread reclaiming dropped databases and running
//! coordinator housekeeping. Cooperative shutdown via a stop flag checked each iteration, no
//! signals — cancellation just means "stop looking for more work", pending filesystem removals
//! always finish.

use crate::collaborators::{ClusterState, QueryRegistry, StorageEngine};
use crate::record::{DatabaseRecord, DatabaseType};
use crate::registry::Registry;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const IDLE_SLEEP: Duration = Duration::from_millis(500);
const COORDINATOR_GC_EVERY_N_CYCLES: u32 = 10;

pub struct DatabaseManager {
    stop: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

/// Counters a test can assert on instead of threading a channel through the reclaim loop.
#[derive(Default)]
pub struct ManagerStats {
    pub reclaimed: std::sync::atomic::AtomicU64,
    pub reclaim_errors: std::sync::atomic::AtomicU64,
}

impl DatabaseManager {
    /// Starts the reclaim loop on a dedicated OS thread. Returns
    /// [`crate::error::BootstrapError::ManagerThreadFailed`] only if the OS refuses to spawn the
    /// thread at all.
    pub fn start(
        registry: Arc<Registry>,
        engine: Arc<dyn StorageEngine>,
        query_registry: Arc<dyn QueryRegistry>,
        cluster: Arc<dyn ClusterState>,
        app_path: Option<PathBuf>,
        stats: Arc<ManagerStats>,
    ) -> Result<Self, crate::error::BootstrapError> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_inner = stop.clone();
        let handle = std::thread::Builder::new()
            .name("vocd-db-manager".into())
            .spawn(move || run(registry, engine, query_registry, cluster, app_path, stop_inner, stats))
            .map_err(|e| crate::error::BootstrapError::ManagerThreadFailed(e.to_string()))?;
        Ok(Self {
            stop,
            thread: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Requests the loop stop and blocks until it has exited, polling every millisecond — the
    /// same cadence the Lifecycle Controller's `unprepare` uses against this manager.
    pub fn begin_shutdown_and_join(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(h) = self.thread.take() {
            while !h.is_finished() {
                std::thread::sleep(Duration::from_millis(1));
            }
            let _ = h.join();
        }
    }
}

impl Drop for DatabaseManager {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(h) = self.thread.take() {
            let _ = h.join();
        }
    }
}

fn run(
    registry: Arc<Registry>,
    engine: Arc<dyn StorageEngine>,
    query_registry: Arc<dyn QueryRegistry>,
    cluster: Arc<dyn ClusterState>,
    app_path: Option<PathBuf>,
    stop: Arc<AtomicBool>,
    stats: Arc<ManagerStats>,
) {
    let mut idle_cycles: u32 = 0;
    while !stop.load(Ordering::Acquire) {
        let candidate = {
            let guard = registry.pin();
            let snap = registry.snapshot(&guard);
            snap.dropped_databases
                .iter()
                .find(|r| engine.can_remove_vocbase(r))
                .cloned()
        };

        let Some(record) = candidate else {
            std::thread::sleep(IDLE_SLEEP);
            query_registry.expire_queries();
            idle_cycles = idle_cycles.wrapping_add(1);
            if idle_cycles.is_multiple_of(COORDINATOR_GC_EVERY_N_CYCLES) && cluster.is_coordinator() {
                let guard = registry.pin();
                for rec in registry.snapshot(&guard).coordinator_databases.values() {
                    if let Some(repo) = &rec.cursor_repository {
                        repo.garbage_collect(false);
                    }
                }
            }
            continue;
        };

        registry.replace(|l| {
            l.dropped_databases.retain(|r| r.id != record.id);
        });

        if record.ty == DatabaseType::Normal {
            reclaim_normal(&record, &engine, app_path.as_deref(), &stats);
        }
        stats.reclaimed.fetch_add(1, Ordering::Relaxed);
        // `record` is the last strong reference once it drops off the stack: no published
        // snapshot holds it anymore, and every reader that might have still held a guard from
        // before the replace above has released it by the time that replace() returned.
    }
}

fn reclaim_normal(
    record: &Arc<DatabaseRecord>,
    engine: &Arc<dyn StorageEngine>,
    app_path: Option<&std::path::Path>,
    stats: &ManagerStats,
) {
    engine.drop_database(record.id);

    if record.owns_apps_directory {
        if let Some(app_path) = app_path {
            let dir = app_path.join("_db").join(&*record.name);
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::error!("failed to remove application directory '{}': {e}", dir.display());
                    stats.reclaim_errors.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    engine.destroy_vocbase(record);

    if let Err(e) = std::fs::remove_dir_all(&record.path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::error!(
                "failed to remove database directory '{}': {e}",
                record.path.display()
            );
            stats.reclaim_errors.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::CatalogEntry;
    use std::sync::atomic::AtomicBool as StdAtomicBool;
    use tempfile::tempdir;

    struct FakeEngine {
        removable: StdAtomicBool,
    }
    impl StorageEngine for FakeEngine {
        fn initialize(&self) -> Result<(), String> {
            Ok(())
        }
        fn shutdown(&self) -> Result<(), String> {
            Ok(())
        }
        fn get_databases(&self) -> Result<Vec<CatalogEntry>, String> {
            Ok(vec![])
        }
        fn open_database(&self, _: &CatalogEntry, _: bool) -> Result<DatabaseRecord, String> {
            unreachable!()
        }
        fn can_remove_vocbase(&self, _: &DatabaseRecord) -> bool {
            self.removable.load(Ordering::Acquire)
        }
        fn destroy_vocbase(&self, _: &DatabaseRecord) {}
    }
    struct FakeQueryRegistry;
    impl QueryRegistry for FakeQueryRegistry {
        fn expire_queries(&self) {}
    }
    struct FakeCluster;
    impl ClusterState for FakeCluster {
        fn is_running_in_cluster(&self) -> bool {
            false
        }
        fn is_coordinator(&self) -> bool {
            false
        }
    }

    #[test]
    fn reclaims_dropped_database_once_removable() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("databases").join("1");
        std::fs::create_dir_all(&db_path).unwrap();

        let registry = Arc::new(Registry::new());
        let rec = Arc::new(DatabaseRecord::new_normal(1, "gone", db_path.clone()));
        registry.replace(|l| { l.databases.insert(rec.name.clone(), rec.clone()); });
        registry.drop_database("gone", || {}).unwrap();

        let engine: Arc<dyn StorageEngine> = Arc::new(FakeEngine {
            removable: StdAtomicBool::new(true),
        });
        let stats = Arc::new(ManagerStats::default());
        let mut mgr = DatabaseManager::start(
            registry.clone(),
            engine,
            Arc::new(FakeQueryRegistry),
            Arc::new(FakeCluster),
            None,
            stats.clone(),
        )
        .unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while stats.reclaimed.load(Ordering::Relaxed) == 0 && std::time::Instant::now() < deadline
        {
            std::thread::sleep(Duration::from_millis(10));
        }
        mgr.begin_shutdown_and_join();

        assert_eq!(stats.reclaimed.load(Ordering::Relaxed), 1);
        assert!(!db_path.exists());
        let guard = registry.pin();
        assert!(registry.snapshot(&guard).dropped_databases.is_empty());
    }

    #[test]
    fn shutdown_stops_promptly_when_idle() {
        let registry = Arc::new(Registry::new());
        let engine: Arc<dyn StorageEngine> = Arc::new(FakeEngine {
            removable: StdAtomicBool::new(false),
        });
        let stats = Arc::new(ManagerStats::default());
        let mut mgr = DatabaseManager::start(
            registry,
            engine,
            Arc::new(FakeQueryRegistry),
            Arc::new(FakeCluster),
            None,
            stats,
        )
        .unwrap();
        assert!(mgr.is_running());
        mgr.begin_shutdown_and_join();
        assert!(!mgr.is_running());
    }
}
