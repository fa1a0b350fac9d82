//! # Identity Tracking
//!
//! Records carry no identifier field, so a collection remembers where each
//! record lives by the record's *identity*, not its value. Two records with
//! identical fields loaded at different times are two different records and
//! may live in two different files.
//!
//! ## Entries
//!
//! Callers hold records through [`Entry`], a cheap shared handle. Cloning an
//! entry clones the handle: both clones are the same record, and
//! [`Entry::new`] always creates a new one.
//!
//! ## Non-owning association
//!
//! [`IdentityTracker`] keeps only [`Weak`] references. It never keeps a record
//! alive, and once every handle to a record is dropped its association reads as
//! absent and is purged. The key is the allocation address; a `Weak` keeps
//! the allocation itself reserved (though not the record), so an address
//! cannot be handed to a new record while its entry is still in the table.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

/// Shared handle to a record held by a [`Collection`](crate::Collection).
pub struct Entry<T> {
    inner: Rc<RefCell<T>>,
}

impl<T> Entry<T> {
    /// Wrap a record. The new entry has its own identity.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(value)),
        }
    }

    /// Borrow the record.
    ///
    /// # Panics
    ///
    /// Panics if the record is currently mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.inner.borrow()
    }

    /// Mutably borrow the record. Changes reach disk on the next
    /// `update`/`upsert`.
    ///
    /// # Panics
    ///
    /// Panics if the record is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.inner.borrow_mut()
    }

    /// Replace the record's value, keeping its identity.
    pub fn replace(&self, value: T) -> T {
        self.inner.replace(value)
    }

    /// Whether two handles refer to the same record.
    pub fn same_record(&self, other: &Entry<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn key(&self) -> usize {
        Rc::as_ptr(&self.inner) as *const () as usize
    }

    fn downgrade(&self) -> Weak<RefCell<T>> {
        Rc::downgrade(&self.inner)
    }
}

impl<T: Clone> Entry<T> {
    /// Copy the record's current value out of the handle.
    pub fn get(&self) -> T {
        self.inner.borrow().clone()
    }
}

impl<T> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Entry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(value) => f.debug_tuple("Entry").field(&*value).finish(),
            Err(_) => f.write_str("Entry(<borrowed>)"),
        }
    }
}

/// Table size below which registration never sweeps.
const SWEEP_FLOOR: usize = 64;

/// Non-owning map from record identity to path.
///
/// Dead entries are purged on `lookup`, and registration sweeps the whole
/// table once it has doubled since the last sweep.
pub struct IdentityTracker<T> {
    entries: HashMap<usize, (Weak<RefCell<T>>, PathBuf)>,
    sweep_at: usize,
}

impl<T> Default for IdentityTracker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IdentityTracker<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            sweep_at: SWEEP_FLOOR,
        }
    }

    /// Associate a record with a path, replacing any earlier association.
    pub fn register(&mut self, entry: &Entry<T>, path: &Path) {
        if self.entries.len() >= self.sweep_at {
            self.prune();
        }
        self.entries
            .insert(entry.key(), (entry.downgrade(), path.to_path_buf()));
    }

    /// Path associated with a live record.
    pub fn lookup(&mut self, entry: &Entry<T>) -> Option<PathBuf> {
        let key = entry.key();
        let (weak, path) = self.entries.get(&key)?;
        if weak.strong_count() == 0 {
            self.entries.remove(&key);
            return None;
        }
        Some(path.clone())
    }

    /// Drop the association for a record, returning its path if there was one.
    pub fn forget(&mut self, entry: &Entry<T>) -> Option<PathBuf> {
        self.entries.remove(&entry.key()).map(|(_, path)| path)
    }

    /// Drop every association whose record is gone. Returns how many were
    /// removed.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, (weak, _)| weak.strong_count() > 0);
        self.sweep_at = (self.entries.len() * 2).max(SWEEP_FLOOR);
        before - self.entries.len()
    }

    /// Drop every association pointing at `path`. Returns how many were
    /// removed.
    pub fn forget_path(&mut self, path: &Path) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, (_, tracked)| tracked.as_path() != path);
        before - self.entries.len()
    }

    /// Number of associations, including any not yet pruned.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
