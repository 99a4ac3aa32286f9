//! Generational slot pool
//!
//! [`HandleVector`] owns the storage for one resource kind and hands out
//! [`Handle`]s into it. Freed slots go on a free list and are reused with a
//! bumped version, so handles to the previous occupant stop validating.
//!
//! | Operation | Time Complexity |
//! |-----------|-----------------|
//! | `create`  | O(1) amortized  |
//! | `destroy` | O(1)            |
//! | `valid`   | O(1)            |
//! | `get`     | O(1)            |
//! | `iter`    | O(n)            |

use std::fmt;
use std::ops::{Index, IndexMut};

use super::Handle;

// ============================================================================
// Slot
// ============================================================================

#[derive(Debug)]
struct Slot<T> {
    /// Version handed out for the current (or next) occupant
    version: u32,
    value: Option<T>,
}

impl<T> Slot<T> {
    fn bump_version(&mut self) {
        self.version = self.version.wrapping_add(1);
        if self.version == 0 {
            self.version = 1;
        }
    }
}

// ============================================================================
// HandleVector
// ============================================================================

/// Pool of `T` values addressed by `Handle<Tag>`.
///
/// Dereferencing comes in two flavours: [`get`](Self::get) /
/// [`get_mut`](Self::get_mut) return `None` for stale handles, while
/// indexing treats a valid handle as a precondition and panics otherwise.
pub struct HandleVector<T, Tag> {
    slots: Vec<Slot<T>>,
    /// Indices of vacant slots, reused LIFO
    free: Vec<u32>,
    len: usize,
    _marker: std::marker::PhantomData<fn() -> Tag>,
}

impl<T, Tag> HandleVector<T, Tag> {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a pool with room for `capacity` values.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
            _marker: std::marker::PhantomData,
        }
    }

    /// Store `value` and return a fresh handle to it.
    ///
    /// # Panics
    ///
    /// Panics if the pool would exceed `u32::MAX` slots.
    pub fn create(&mut self, value: T) -> Handle<Tag> {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Handle::new(index, slot.version);
        }

        let index = u32::try_from(self.slots.len()).unwrap_or_else(|_| {
            panic!("HandleVector exceeded {} slots", u32::MAX);
        });
        self.slots.push(Slot {
            version: 1,
            value: Some(value),
        });
        Handle::new(index, 1)
    }

    /// Free the slot behind `handle` and return its value.
    ///
    /// Returns `None` (and changes nothing) for stale or invalid handles.
    pub fn destroy(&mut self, handle: Handle<Tag>) -> Option<T> {
        if !self.valid(handle) {
            return None;
        }

        let slot = &mut self.slots[handle.index() as usize];
        let value = slot.value.take();
        slot.bump_version();
        self.free.push(handle.index());
        self.len -= 1;
        value
    }

    /// Check that `handle` refers to a live slot of this pool.
    #[must_use]
    #[inline]
    pub fn valid(&self, handle: Handle<Tag>) -> bool {
        handle.version() != 0
            && self
                .slots
                .get(handle.index() as usize)
                .is_some_and(|slot| slot.version == handle.version() && slot.value.is_some())
    }

    /// Get the value behind `handle`, if it is still live.
    #[must_use]
    #[inline]
    pub fn get(&self, handle: Handle<Tag>) -> Option<&T> {
        if !self.valid(handle) {
            return None;
        }
        self.slots[handle.index() as usize].value.as_ref()
    }

    /// Get the value behind `handle` mutably, if it is still live.
    #[inline]
    pub fn get_mut(&mut self, handle: Handle<Tag>) -> Option<&mut T> {
        if !self.valid(handle) {
            return None;
        }
        self.slots[handle.index() as usize].value.as_mut()
    }

    /// Number of live values.
    #[must_use]
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Check if the pool holds no live values.
    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over live values with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<Tag>, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (Handle::new(index as u32, slot.version), value))
        })
    }

    /// Iterate mutably over live values with their handles.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle<Tag>, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let version = slot.version;
            slot.value
                .as_mut()
                .map(|value| (Handle::new(index as u32, version), value))
        })
    }

    /// Handles of every live value.
    #[must_use]
    pub fn handles(&self) -> Vec<Handle<Tag>> {
        self.iter().map(|(handle, _)| handle).collect()
    }

    /// Destroy every live value.
    ///
    /// Versions keep counting, so handles issued before the clear stay stale.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() {
                slot.bump_version();
                self.free.push(index as u32);
            }
        }
        self.len = 0;
    }
}

impl<T, Tag> Default for HandleVector<T, Tag> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug, Tag> fmt::Debug for HandleVector<T, Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<T, Tag> Index<Handle<Tag>> for HandleVector<T, Tag> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if `handle` is stale or invalid.
    #[track_caller]
    fn index(&self, handle: Handle<Tag>) -> &T {
        match self.get(handle) {
            Some(value) => value,
            None => panic!("stale or invalid handle {handle:?}"),
        }
    }
}

impl<T, Tag> IndexMut<Handle<Tag>> for HandleVector<T, Tag> {
    #[track_caller]
    fn index_mut(&mut self, handle: Handle<Tag>) -> &mut T {
        match self.get_mut(handle) {
            Some(value) => value,
            None => panic!("stale or invalid handle {handle:?}"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
