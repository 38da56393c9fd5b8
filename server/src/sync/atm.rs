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

use core::{fmt, ops::Deref, sync::atomic::Ordering};
use crossbeam_epoch::{Atomic as CBAtomic, CompareExchangeError, Pointable, Pointer};
// re-exported so the rest of the crate never names `crossbeam_epoch` directly
pub use crossbeam_epoch::{pin as cpin, unprotected as upin, Guard, Owned, Shared};

pub(super) const ORD_RLX: Ordering = Ordering::Relaxed;
pub(super) const ORD_ACQ: Ordering = Ordering::Acquire;
pub(super) const ORD_REL: Ordering = Ordering::Release;

type CxResult<'g, T, P> = Result<Shared<'g, T>, CompareExchangeError<'g, T, P>>;

/// A thin wrapper over [`crossbeam_epoch::Atomic`] restricted to the load/compare-exchange
/// operations the registry actually needs, with the orderings spelled out at the call site.
pub struct Atomic<T> {
    a: CBAtomic<T>,
}

impl<T> fmt::Debug for Atomic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.a)
    }
}

impl<T: Pointable> Atomic<T> {
    /// Instantiates a new atomic. **This will allocate.**
    pub fn new_alloc(t: T) -> Self {
        Self {
            a: CBAtomic::new(t),
        }
    }
    #[inline(always)]
    pub(crate) fn cx_rel<'g, P>(&self, o: Shared<'g, T>, n: P, g: &'g Guard) -> CxResult<'g, T, P>
    where
        P: Pointer<T>,
    {
        self.a.compare_exchange(o, n, ORD_REL, ORD_RLX, g)
    }
    #[inline(always)]
    pub(crate) fn ld_acq<'g>(&self, g: &'g Guard) -> Shared<'g, T> {
        self.a.load(ORD_ACQ, g)
    }
}

impl<T> Deref for Atomic<T> {
    type Target = CBAtomic<T>;
    fn deref(&self) -> &Self::Target {
        &self.a
    }
}
