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

use core::fmt;

/// Errors raised by [`crate::config::DatabaseOptions::validate`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ConfigError {
    JournalSizeTooSmall,
    CheckVersionAndUpgradeConflict,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JournalSizeTooSmall => {
                write!(f, "'database.maximal-journal-size' is below the minimum")
            }
            Self::CheckVersionAndUpgradeConflict => write!(
                f,
                "'database.check-version' and 'database.auto-upgrade' are mutually exclusive"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors raised while bringing the lifecycle core up or down.
///
/// Every variant except [`BootstrapError::EmptyDataDirWithoutCheckVersion`] is fatal: the
/// embedder should abort the boot sequence. `is_fatal` exists because this crate never calls
/// `process::exit` itself.
#[derive(Debug)]
pub enum BootstrapError {
    Io(std::io::Error),
    Config(ConfigError),
    EngineInit(String),
    CatalogIteration(String),
    ManagerThreadFailed(String),
    EmptyDataDirWithoutCheckVersion,
}

impl BootstrapError {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::EmptyDataDirWithoutCheckVersion)
    }
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "i/o error during bootstrap: {e}"),
            Self::Config(e) => write!(f, "{e}"),
            Self::EngineInit(msg) => write!(f, "storage engine failed to initialize: {msg}"),
            Self::CatalogIteration(msg) => write!(f, "failed to iterate persisted catalog: {msg}"),
            Self::ManagerThreadFailed(msg) => write!(f, "database manager thread failed to start: {msg}"),
            Self::EmptyDataDirWithoutCheckVersion => {
                write!(f, "cannot start server: empty data directory")
            }
        }
    }
}

impl std::error::Error for BootstrapError {}

impl From<std::io::Error> for BootstrapError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ConfigError> for BootstrapError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
