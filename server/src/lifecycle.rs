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

//! Bootstrap and shutdown sequencing: `collect_options -> validate_options -> prepare -> start
//! -> shutdown_compactor -> unprepare`, invoked by the embedding application feature runner in
//! that order.

use crate::collaborators::{ClusterState, QueryRegistry, ScriptEngineDealer, StorageEngine, Wal};
use crate::config::DatabaseOptions;
use crate::dirs::{ensure_base_app_dir, ensure_database_app_dir};
use crate::error::BootstrapError;
use crate::manager::{DatabaseManager, ManagerStats};
use crate::record::DatabaseRecord;
use crate::registry::Registry;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct LifecycleController {
    options: DatabaseOptions,
    registry: Arc<Registry>,
    engine: Arc<dyn StorageEngine>,
    wal: Arc<dyn Wal>,
    script_dealer: Arc<dyn ScriptEngineDealer>,
    query_registry: Arc<dyn QueryRegistry>,
    cluster: Arc<dyn ClusterState>,
    deadlock_detection_enabled: AtomicBool,
    manager: Option<DatabaseManager>,
    manager_stats: Arc<ManagerStats>,
    app_path: Option<PathBuf>,
}

impl LifecycleController {
    pub fn new(
        options: DatabaseOptions,
        engine: Arc<dyn StorageEngine>,
        wal: Arc<dyn Wal>,
        script_dealer: Arc<dyn ScriptEngineDealer>,
        query_registry: Arc<dyn QueryRegistry>,
        cluster: Arc<dyn ClusterState>,
    ) -> Self {
        Self {
            options,
            registry: Arc::new(Registry::new()),
            engine,
            wal,
            script_dealer,
            query_registry,
            cluster,
            deadlock_detection_enabled: AtomicBool::new(false),
            manager: None,
            manager_stats: Arc::new(ManagerStats::default()),
            app_path: None,
        }
    }

    /// `collectOptions`: registering the recognized keys is a matter of exposing
    /// [`crate::config::DatabaseOptions`]'s fields; there is no separate registration step to
    /// perform once parsing itself is out of scope.
    pub fn collect_options(&self) -> &DatabaseOptions {
        &self.options
    }

    pub fn validate_options(&self) -> Result<(), BootstrapError> {
        self.options.validate().map_err(Into::into)
    }

    /// Constructs/publishes the server-wide catalog object. In this crate that is simply the
    /// registry becoming reachable; process-wide singleton plumbing is the embedder's call.
    pub fn prepare(&self) {
        log::info!("lifecycle controller prepared");
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn manager_stats(&self) -> &Arc<ManagerStats> {
        &self.manager_stats
    }

    pub fn is_deadlock_detection_enabled(&self) -> bool {
        self.deadlock_detection_enabled.load(Ordering::Acquire)
    }

    /// Runs the bootstrap sequence described by the lifecycle spec, in strict order.
    pub fn start(&mut self) -> Result<(), BootstrapError> {
        // 2. global policy from options — enforced lazily at call sites that consult
        //    `self.options.throw_collection_not_loaded_error`; nothing to do eagerly here.
        // 3. key-generator subsystem init is the storage engine's concern; folded into step 4.
        // 4. initialize storage engine
        self.engine
            .initialize()
            .map_err(BootstrapError::EngineInit)?;

        // 5. WAL tick state
        let _iterate_markers_on_open = !self.wal.has_found_last_tick();

        // 6. application directory root
        let app_path = self.script_dealer.app_path();
        if !app_path.as_os_str().is_empty() {
            std::fs::create_dir_all(&app_path)?;
        }
        self.app_path = Some(app_path.clone());

        // 7. `<appPath>/_db`
        if !app_path.as_os_str().is_empty() {
            ensure_base_app_dir(&app_path, "_db")?;
        }

        // 8. persisted catalog
        let catalog = self
            .engine
            .get_databases()
            .map_err(BootstrapError::CatalogIteration)?;

        if catalog.is_empty() && self.engine.datadir_was_empty() {
            if self.options.check_version {
                return Ok(());
            }
            return Err(BootstrapError::EmptyDataDirWithoutCheckVersion);
        }

        // 9. iterate catalog, one snapshot install per entry so a mid-iteration failure never
        //    publishes a partially-built snapshot (resolves the ambiguity noted in the design
        //    notes: failure discards the would-be snapshot entirely).
        let wal_in_recovery = self.wal.is_in_recovery();
        for entry in &catalog {
            if !app_path.as_os_str().is_empty() {
                ensure_database_app_dir(&entry.name, &app_path, wal_in_recovery)?;
            }
            let opened = self
                .engine
                .open_database(entry, self.options.auto_upgrade)
                .map_err(BootstrapError::CatalogIteration)?;
            let opened = Arc::new(opened);
            self.registry.replace(|l| {
                l.databases.insert(opened.name.clone(), opened.clone());
            });
            self.script_dealer.define_context_update(&opened);
        }

        // 10. start the Database Manager
        let mgr = DatabaseManager::start(
            self.registry.clone(),
            self.engine.clone(),
            self.query_registry.clone(),
            self.cluster.clone(),
            self.app_path.clone(),
            self.manager_stats.clone(),
        )?;
        self.manager = Some(mgr);

        // 12. deadlock detection only if the catalog was non-empty and we're not in cluster mode
        if !catalog.is_empty() && !self.cluster.is_running_in_cluster() {
            self.deadlock_detection_enabled.store(true, Ordering::Release);
        }

        Ok(())
    }

    /// `shutdownCompactor`: for every normal database currently published, stop its compactor
    /// and join its cleanup thread. Best-effort — errors are logged, never fatal.
    pub fn shutdown_compactor(&self) {
        let guard = self.registry.pin();
        let records: Vec<Arc<DatabaseRecord>> = self
            .registry
            .snapshot(&guard)
            .databases
            .values()
            .cloned()
            .collect();
        drop(guard);
        for rec in records {
            rec.stop_compactor(|| {
                log::debug!("requested compactor stop for '{}'", rec.name);
            });
        }
    }

    /// Drops a live database by name, transitioning it through `stop_compactor` and moving it
    /// into `dropped_databases` for the Database Manager to reclaim.
    pub fn drop_database(&self, name: &str) -> Option<Arc<DatabaseRecord>> {
        self.registry.drop_database(name, || {
            log::debug!("requested compactor stop for '{name}' during drop");
        })
    }

    /// `unprepare`: stop replication appliers, close live databases, stop the manager, close
    /// dropped databases, shut down the engine.
    pub fn unprepare(&mut self) -> Result<(), BootstrapError> {
        // 1. stop the replication appliers so pending replication transactions can end, under
        //    the writer lock — mirrors `closeDatabases()`'s single-mutex-holder iteration.
        if self.options.replication_applier {
            self.registry.with_writer_lock(|snap| {
                for rec in snap.databases.values() {
                    if let Some(applier) = &rec.applier {
                        applier.stop(false);
                    }
                }
            });
        }

        // 2. closeOpenDatabases
        self.registry.replace(|l| {
            l.databases.clear();
            l.coordinator_databases.clear();
        });

        // 3. stop the database manager
        if let Some(mut mgr) = self.manager.take() {
            mgr.begin_shutdown_and_join();
        }

        // 4. closeDroppedDatabases — destroy whatever is left regardless of `can_remove`
        let leftover = {
            let guard = self.registry.pin();
            self.registry.snapshot(&guard).dropped_databases.clone()
        };
        self.registry.replace(|l| l.dropped_databases.clear());
        for rec in leftover {
            self.engine.destroy_vocbase(&rec);
        }

        // 5. shut down storage engine
        self.engine.shutdown().map_err(BootstrapError::EngineInit)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::CatalogEntry;
    use crate::record::DatabaseState;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct FakeEngine {
        catalog: Vec<CatalogEntry>,
        empty_datadir: bool,
        destroyed: Mutex<Vec<u64>>,
    }
    impl StorageEngine for FakeEngine {
        fn initialize(&self) -> Result<(), String> {
            Ok(())
        }
        fn shutdown(&self) -> Result<(), String> {
            Ok(())
        }
        fn get_databases(&self) -> Result<Vec<CatalogEntry>, String> {
            Ok(self.catalog.clone())
        }
        fn open_database(&self, entry: &CatalogEntry, _upgrade: bool) -> Result<DatabaseRecord, String> {
            Ok(DatabaseRecord::new_normal(
                entry.id,
                entry.name.as_str(),
                PathBuf::from(format!("/tmp/{}", entry.name)),
            ))
        }
        fn can_remove_vocbase(&self, _: &DatabaseRecord) -> bool {
            true
        }
        fn destroy_vocbase(&self, record: &DatabaseRecord) {
            self.destroyed.lock().unwrap().push(record.id);
        }
        fn datadir_was_empty(&self) -> bool {
            self.empty_datadir
        }
    }
    struct FakeWal {
        in_recovery: bool,
    }
    impl Wal for FakeWal {
        fn has_found_last_tick(&self) -> bool {
            true
        }
        fn is_in_recovery(&self) -> bool {
            self.in_recovery
        }
    }
    struct FakeDealer {
        app_path: PathBuf,
    }
    impl ScriptEngineDealer for FakeDealer {
        fn app_path(&self) -> PathBuf {
            self.app_path.clone()
        }
        fn define_context_update(&self, _record: &DatabaseRecord) {}
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

    fn controller(catalog: Vec<CatalogEntry>, app_path: PathBuf) -> LifecycleController {
        LifecycleController::new(
            DatabaseOptions::default(),
            Arc::new(FakeEngine {
                catalog,
                empty_datadir: false,
                destroyed: Mutex::new(vec![]),
            }),
            Arc::new(FakeWal { in_recovery: false }),
            Arc::new(FakeDealer { app_path }),
            Arc::new(FakeQueryRegistry),
            Arc::new(FakeCluster),
        )
    }

    #[test]
    fn cold_start_single_database() {
        let tmp = tempdir().unwrap();
        let mut ctl = controller(
            vec![CatalogEntry {
                id: 1,
                name: "_system".into(),
            }],
            tmp.path().to_path_buf(),
        );
        ctl.validate_options().unwrap();
        ctl.prepare();
        ctl.start().unwrap();

        assert!(tmp.path().join("_db").is_dir());
        assert!(tmp.path().join("db").join("_system").is_dir());
        let guard = ctl.registry().pin();
        assert!(ctl.registry().snapshot(&guard).databases.contains_key("_system"));
        drop(guard);

        ctl.shutdown_compactor();
        ctl.unprepare().unwrap();
        let guard = ctl.registry().pin();
        assert!(ctl.registry().snapshot(&guard).databases.is_empty());
    }

    #[test]
    fn empty_catalog_without_check_version_is_fatal() {
        let tmp = tempdir().unwrap();
        let mut ctl = controller(vec![], tmp.path().to_path_buf());
        ctl.start().unwrap();
        // a second controller whose engine reports an empty datadir
        let mut ctl2 = LifecycleController::new(
            DatabaseOptions::default(),
            Arc::new(FakeEngine {
                catalog: vec![],
                empty_datadir: true,
                destroyed: Mutex::new(vec![]),
            }),
            Arc::new(FakeWal { in_recovery: false }),
            Arc::new(FakeDealer {
                app_path: tmp.path().to_path_buf(),
            }),
            Arc::new(FakeQueryRegistry),
            Arc::new(FakeCluster),
        );
        let err = ctl2.start().unwrap_err();
        assert!(matches!(err, BootstrapError::EmptyDataDirWithoutCheckVersion));
        assert!(!err.is_fatal());
    }

    #[test]
    fn empty_catalog_with_check_version_exits_clean() {
        let tmp = tempdir().unwrap();
        let opts = DatabaseOptions {
            check_version: true,
            ..Default::default()
        };
        let mut ctl = LifecycleController::new(
            opts,
            Arc::new(FakeEngine {
                catalog: vec![],
                empty_datadir: true,
                destroyed: Mutex::new(vec![]),
            }),
            Arc::new(FakeWal { in_recovery: false }),
            Arc::new(FakeDealer {
                app_path: tmp.path().to_path_buf(),
            }),
            Arc::new(FakeQueryRegistry),
            Arc::new(FakeCluster),
        );
        assert!(ctl.start().is_ok());
    }

    #[test]
    fn shutdown_destroys_pending_drops_regardless_of_can_remove() {
        let tmp = tempdir().unwrap();
        let mut ctl = controller(vec![], tmp.path().to_path_buf());
        let rec = Arc::new(DatabaseRecord::new_normal(99, "zzz", tmp.path().to_path_buf()));
        ctl.registry()
            .replace(|l| { l.databases.insert(rec.name.clone(), rec.clone()); });
        assert!(ctl.drop_database("zzz").is_some());
        assert_eq!(rec.state(), DatabaseState::Stopped);
        ctl.unprepare().unwrap();
        let guard = ctl.registry().pin();
        assert!(ctl.registry().snapshot(&guard).dropped_databases.is_empty());
    }

    struct RecordingApplier {
        stopped: Arc<std::sync::atomic::AtomicBool>,
    }
    impl crate::collaborators::ReplicationApplier for RecordingApplier {
        fn stop(&self, wait: bool) {
            assert!(!wait, "closeDatabases stops appliers without waiting");
            self.stopped.store(true, Ordering::Release);
        }
    }

    #[test]
    fn unprepare_stops_appliers_when_enabled() {
        let tmp = tempdir().unwrap();
        let mut ctl = controller(vec![], tmp.path().to_path_buf());
        let stopped = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let rec = Arc::new(
            DatabaseRecord::new_normal(1, "a", tmp.path().to_path_buf()).with_applier(Arc::new(
                RecordingApplier {
                    stopped: stopped.clone(),
                },
            )),
        );
        ctl.registry()
            .replace(|l| { l.databases.insert(rec.name.clone(), rec.clone()); });
        ctl.unprepare().unwrap();
        assert!(stopped.load(Ordering::Acquire));
    }

    #[test]
    fn unprepare_skips_appliers_when_disabled() {
        let tmp = tempdir().unwrap();
        let options = DatabaseOptions {
            replication_applier: false,
            ..Default::default()
        };
        let mut ctl = LifecycleController::new(
            options,
            Arc::new(FakeEngine {
                catalog: vec![],
                empty_datadir: false,
                destroyed: Mutex::new(vec![]),
            }),
            Arc::new(FakeWal { in_recovery: false }),
            Arc::new(FakeDealer {
                app_path: tmp.path().to_path_buf(),
            }),
            Arc::new(FakeQueryRegistry),
            Arc::new(FakeCluster),
        );
        let stopped = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let rec = Arc::new(
            DatabaseRecord::new_normal(1, "a", tmp.path().to_path_buf()).with_applier(Arc::new(
                RecordingApplier {
                    stopped: stopped.clone(),
                },
            )),
        );
        ctl.registry()
            .replace(|l| { l.databases.insert(rec.name.clone(), rec.clone()); });
        ctl.unprepare().unwrap();
        assert!(!stopped.load(Ordering::Acquire));
    }

    #[test]
    fn drop_database_is_reachable_through_the_controller() {
        let tmp = tempdir().unwrap();
        let ctl = controller(vec![], tmp.path().to_path_buf());
        let rec = Arc::new(DatabaseRecord::new_normal(1, "a", tmp.path().to_path_buf()));
        ctl.registry()
            .replace(|l| { l.databases.insert(rec.name.clone(), rec.clone()); });
        let dropped = ctl.drop_database("a").unwrap();
        assert_eq!(dropped.state(), DatabaseState::Stopped);
        assert!(ctl.drop_database("a").is_none());
    }
}
