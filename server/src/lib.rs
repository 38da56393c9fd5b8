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

//! # `vocd` — database lifecycle core
//!
//! The hazard-protected registry, the background Database Manager, and the bootstrap/shutdown
//! sequencing for a multi-tenant document database server. The server's HTTP surface, request
//! dispatcher, scripting contexts, cluster membership protocol, and concrete storage engine are
//! deliberately not here — see [`collaborators`] for the narrow interfaces this crate expects
//! from them.

pub mod collaborators;
pub mod config;
pub mod dirs;
pub mod error;
pub mod lifecycle;
pub mod lists;
pub mod manager;
pub mod record;
pub mod registry;
pub mod sync;


pub use config::DatabaseOptions;
pub use error::{BootstrapError, ConfigError};
pub use lifecycle::LifecycleController;
pub use lists::DatabasesLists;
pub use record::{DatabaseRecord, DatabaseState, DatabaseType};
pub use registry::Registry;
