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

//! The recognized `database.*` options. Parsing these out of argv, a config file, or the
//! environment is an application concern; this module only owns the struct and its validation.

use crate::error::ConfigError;

/// The smallest journal size the engine will accept for a collection.
pub const MIN_JOURNAL_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseOptions {
    pub maximal_journal_size: u64,
    pub wait_for_sync: bool,
    pub force_sync_properties: bool,
    pub ignore_datafile_errors: bool,
    pub throw_collection_not_loaded_error: bool,
    pub replication_applier: bool,
    pub check_version: bool,
    pub auto_upgrade: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            maximal_journal_size: 32 * 1024 * 1024,
            wait_for_sync: false,
            force_sync_properties: true,
            ignore_datafile_errors: false,
            throw_collection_not_loaded_error: false,
            replication_applier: true,
            check_version: false,
            auto_upgrade: false,
        }
    }
}

impl DatabaseOptions {
    /// Applies the legacy `server.disable-replication-applier` alias (inverted).
    pub fn apply_legacy_disable_replication_applier(&mut self, disabled: bool) {
        self.replication_applier = !disabled;
    }

    /// Implements the Lifecycle Controller's `validateOptions` step.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.maximal_journal_size < MIN_JOURNAL_SIZE {
            return Err(ConfigError::JournalSizeTooSmall);
        }
        if self.check_version && self.auto_upgrade {
            return Err(ConfigError::CheckVersionAndUpgradeConflict);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_size_at_minimum_is_accepted() {
        let opts = DatabaseOptions {
            maximal_journal_size: MIN_JOURNAL_SIZE,
            ..Default::default()
        };
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn journal_size_one_below_minimum_is_fatal() {
        let opts = DatabaseOptions {
            maximal_journal_size: MIN_JOURNAL_SIZE - 1,
            ..Default::default()
        };
        assert_eq!(opts.validate(), Err(ConfigError::JournalSizeTooSmall));
    }

    #[test]
    fn check_version_and_upgrade_conflict() {
        let opts = DatabaseOptions {
            check_version: true,
            auto_upgrade: true,
            ..Default::default()
        };
        assert_eq!(
            opts.validate(),
            Err(ConfigError::CheckVersionAndUpgradeConflict)
        );
    }

    #[test]
    fn legacy_alias_inverts() {
        let mut opts = DatabaseOptions::default();
        opts.apply_legacy_disable_replication_applier(true);
        assert!(!opts.replication_applier);
    }
}
