//! Generational handles
//!
//! A [`Handle`] names a resource owned by some engine. It is a plain value:
//! copying it never keeps the resource alive, and a handle whose slot has been
//! destroyed simply stops validating against the owning [`HandleVector`].
//!
//! [`HandleVector`]: super::HandleVector

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 64-bit generational handle: low 32 bits index, high 32 bits version.
///
/// `T` is a marker naming the resource kind, so handles of different kinds
/// cannot be mixed up. The all-zero id is the invalid sentinel.
pub struct Handle<T> {
    id: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// The invalid sentinel.
    pub const INVALID: Self = Self::from_id(0);

    /// Create a handle from an index and a version.
    #[must_use]
    #[inline]
    pub const fn new(index: u32, version: u32) -> Self {
        Self::from_id(((version as u64) << 32) | index as u64)
    }

    /// Create a handle from its raw 64-bit id.
    #[must_use]
    #[inline]
    pub const fn from_id(id: u64) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// Raw 64-bit id.
    #[must_use]
    #[inline]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Slot index (low 32 bits).
    #[must_use]
    #[inline]
    pub const fn index(&self) -> u32 {
        self.id as u32
    }

    /// Slot version (high 32 bits).
    #[must_use]
    #[inline]
    pub const fn version(&self) -> u32 {
        (self.id >> 32) as u32
    }

    /// A handle is valid when its id and version are both non-zero.
    ///
    /// This is a local check only; whether the resource still exists is up to
    /// the owning pool.
    #[must_use]
    #[inline]
    pub const fn valid(&self) -> bool {
        self.id != 0 && self.version() != 0
    }

    /// Zero the version, keeping the index.
    #[inline]
    pub fn invalidate(&mut self) {
        self.id &= u64::from(u32::MAX);
    }

    /// Take the handle out, leaving an invalidated one behind.
    #[must_use]
    pub fn take(&mut self) -> Self {
        let taken = *self;
        self.invalidate();
        taken
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::INVALID
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index(), self.version())
    }
}

impl<T> Serialize for Handle<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.id)
    }
}

impl<'de, T> Deserialize<'de> for Handle<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u64::deserialize(deserializer).map(Self::from_id)
    }
}

/// Declare a marker type and a [`Handle`] alias for each resource kind.
#[macro_export]
macro_rules! handle_types {
    ($($(#[$meta:meta])* $alias:ident => $tag:ident;)*) => {
        $(
            #[doc = concat!("Marker for [`", stringify!($alias), "`].")]
            #[derive(Debug)]
            pub enum $tag {}

            $(#[$meta])*
            pub type $alias = $crate::handles::Handle<$tag>;
        )*
    };
}
