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

use crate::record::DatabaseRecord;
use std::collections::HashMap;
use std::sync::Arc;

/// An immutable snapshot published by the [`crate::registry::Registry`].
///
/// Invariant: a given record lives in at most one of `databases`, `coordinator_databases`,
/// `dropped_databases` at a time — enforced by construction, since [`DatabasesLists`] is always
/// built fresh from its predecessor by [`DatabasesLists::edit`].
#[derive(Default)]
pub struct DatabasesLists {
    pub databases: HashMap<Box<str>, Arc<DatabaseRecord>>,
    pub coordinator_databases: HashMap<Box<str>, Arc<DatabaseRecord>>,
    pub dropped_databases: Vec<Arc<DatabaseRecord>>,
}

impl DatabasesLists {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deep-copies the maps (pointers, not records) so the caller can produce an edited
    /// successor without disturbing whoever still holds a reference to `self`.
    pub fn clone_shallow(&self) -> Self {
        Self {
            databases: self.databases.clone(),
            coordinator_databases: self.coordinator_databases.clone(),
            dropped_databases: self.dropped_databases.clone(),
        }
    }

    /// Builds the successor snapshot by cloning `self` and running `f` over the clone. This is
    /// the only sanctioned way to produce a new [`DatabasesLists`] — callers never construct one
    /// from scratch except at startup.
    pub fn edit(&self, f: impl FnOnce(&mut Self)) -> Self {
        let mut next = self.clone_shallow();
        f(&mut next);
        next
    }

    pub fn disjoint_invariant_holds(&self) -> bool {
        let dropped_ids: std::collections::HashSet<_> =
            self.dropped_databases.iter().map(|r| r.id).collect();
        let live_ids = self
            .databases
            .values()
            .chain(self.coordinator_databases.values())
            .map(|r| r.id);
        for id in live_ids {
            if dropped_ids.contains(&id) {
                return false;
            }
        }
        self.databases
            .keys()
            .all(|k| !self.coordinator_databases.contains_key(k))
    }
}
