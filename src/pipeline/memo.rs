//! Dependency-tracked memo cells.
//!
//! Each derived value in a pass lives in a [`Memo`]. A memo holds the
//! dependencies it was computed from and recomputes only when the new
//! dependencies differ. Dependencies holding shared data compare by address
//! through [`SharedRef`], so an O(n) collection costs an O(1) check.
//!
//! Every recomputation advances the memo's [`VersionToken`]; downstream
//! memos list upstream tokens among their own dependencies.

use std::fmt;
use std::sync::Arc;

/// Monotonically advancing marker of a derived value's generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VersionToken(u64);

impl VersionToken {
    /// The token of a value that was never computed.
    pub const INITIAL: Self = Self(0);

    /// Raw generation number.
    pub fn get(&self) -> u64 {
        self.0
    }

    /// The following token.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// An `Arc` compared by address instead of by value.
pub struct SharedRef<T: ?Sized>(pub Arc<T>);

impl<T: ?Sized> SharedRef<T> {
    /// Share `value` without copying it.
    pub fn new(value: &Arc<T>) -> Self {
        Self(Arc::clone(value))
    }
}

impl<T: ?Sized> Clone for SharedRef<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: ?Sized> PartialEq for SharedRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: ?Sized> Eq for SharedRef<T> {}

impl<T: ?Sized> fmt::Debug for SharedRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedRef({:p})", Arc::as_ptr(&self.0))
    }
}

/// A derived value together with the dependencies it was computed from.
#[derive(Debug)]
pub struct Memo<D, T> {
    deps: Option<D>,
    value: Option<T>,
    version: VersionToken,
}

impl<D, T> Default for Memo<D, T> {
    fn default() -> Self {
        Self {
            deps: None,
            value: None,
            version: VersionToken::INITIAL,
        }
    }
}

impl<D: PartialEq, T> Memo<D, T> {
    /// An empty memo; the first lookup always computes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the memoized value, recomputing it when `deps` changed.
    ///
    /// The second element is `true` when `compute` ran.
    pub fn get_or_compute<F>(&mut self, deps: D, compute: F) -> (&T, bool)
    where
        F: FnOnce(&D) -> T,
    {
        let stale = self.deps.as_ref() != Some(&deps) || self.value.is_none();
        if stale {
            let value = compute(&deps);
            self.deps = Some(deps);
            self.version = self.version.next();
            (&*self.value.insert(value), true)
        } else {
            (&*self.value.get_or_insert_with(|| compute(&deps)), false)
        }
    }

    /// Last computed value, if any.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Generation of the current value.
    pub fn version(&self) -> VersionToken {
        self.version
    }

    /// Forget the dependencies so the next call recomputes.
    pub fn invalidate(&mut self) {
        self.deps = None;
    }
}
