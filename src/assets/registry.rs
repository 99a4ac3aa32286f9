//! Named resource registry
//!
//! Assets are loaded by the engines that own them; the registry records the
//! name each handle was loaded under. Saved scenes carry those names, and a
//! load maps them back to whatever handles the current run assigned.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::animation::{AnimationClip, AnimationHandle, AnimationTag, Skeleton, SkeletonHandle, SkeletonTag};
use crate::engines::graphics::{MeshTag, TerrainTag, TextureTag};
use crate::engines::pathfinding::NavigationMeshTag;
use crate::engines::physics::CollisionShapeTag;
use crate::handles::{Handle, HandleVector};

/// Asset kinds whose handles are persisted by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    CollisionShape,
    Mesh,
    Texture,
    Skeleton,
    Animation,
    Terrain,
    NavigationMesh,
}

impl ResourceKind {
    pub const ALL: [Self; 7] = [
        Self::CollisionShape,
        Self::Mesh,
        Self::Texture,
        Self::Skeleton,
        Self::Animation,
        Self::Terrain,
        Self::NavigationMesh,
    ];

    const fn slot(self) -> usize {
        self as usize
    }
}

/// Handle markers that name a [`ResourceKind`].
pub trait ResourceTag {
    const KIND: ResourceKind;
}

macro_rules! resource_tags {
    ($($tag:ty => $kind:ident),* $(,)?) => {
        $(impl ResourceTag for $tag {
            const KIND: ResourceKind = ResourceKind::$kind;
        })*
    };
}

resource_tags! {
    CollisionShapeTag => CollisionShape,
    MeshTag => Mesh,
    TextureTag => Texture,
    SkeletonTag => Skeleton,
    AnimationTag => Animation,
    TerrainTag => Terrain,
    NavigationMeshTag => NavigationMesh,
}

#[derive(Debug, Default)]
struct NameTable {
    by_name: FxHashMap<String, u64>,
    by_id: FxHashMap<u64, String>,
}

impl NameTable {
    fn insert(&mut self, name: String, id: u64) {
        if let Some(old_id) = self.by_name.insert(name.clone(), id) {
            self.by_id.remove(&old_id);
        }
        if let Some(old_name) = self.by_id.insert(id, name) {
            self.by_name.remove(&old_name);
        }
    }

    fn remove_id(&mut self, id: u64) -> Option<String> {
        let name = self.by_id.remove(&id)?;
        self.by_name.remove(&name);
        Some(name)
    }
}

/// Name tables for every [`ResourceKind`], plus storage for the skeletons
/// and clips the animation pipeline samples.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    names: [NameTable; ResourceKind::ALL.len()],
    skeletons: HandleVector<Arc<Skeleton>, SkeletonTag>,
    animations: HandleVector<Arc<AnimationClip>, AnimationTag>,
}

impl ResourceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `handle` was loaded under `name`.
    ///
    /// A name maps to one handle and a handle to one name; registering again
    /// replaces the previous pairing.
    pub fn register<T: ResourceTag>(&mut self, name: impl Into<String>, handle: Handle<T>) {
        self.register_id(T::KIND, name.into(), handle.id());
    }

    /// Untyped form of [`register`](Self::register).
    pub fn register_id(&mut self, kind: ResourceKind, name: String, id: u64) {
        log::debug!("registered {kind:?} '{name}' as {id:#x}");
        self.names[kind.slot()].insert(name, id);
    }

    /// Forget the name of `handle`.
    pub fn unregister<T: ResourceTag>(&mut self, handle: Handle<T>) -> Option<String> {
        self.names[T::KIND.slot()].remove_id(handle.id())
    }

    /// Handle registered under `name`.
    #[must_use]
    pub fn handle<T: ResourceTag>(&self, name: &str) -> Option<Handle<T>> {
        self.id(T::KIND, name).map(Handle::from_id)
    }

    /// Name `handle` was registered under.
    #[must_use]
    pub fn name<T: ResourceTag>(&self, handle: Handle<T>) -> Option<&str> {
        self.name_of(T::KIND, handle.id())
    }

    #[must_use]
    pub fn id(&self, kind: ResourceKind, name: &str) -> Option<u64> {
        self.names[kind.slot()].by_name.get(name).copied()
    }

    #[must_use]
    pub fn name_of(&self, kind: ResourceKind, id: u64) -> Option<&str> {
        self.names[kind.slot()].by_id.get(&id).map(String::as_str)
    }

    // ========================================================================
    // Animation data
    // ========================================================================

    /// Store a skeleton under `name`, or return the one already stored there.
    pub fn add_skeleton(&mut self, name: impl Into<String>, skeleton: Skeleton) -> SkeletonHandle {
        let name = name.into();
        if let Some(existing) = self.handle::<SkeletonTag>(&name)
            && self.skeletons.valid(existing)
        {
            return existing;
        }
        let handle = self.skeletons.create(Arc::new(skeleton));
        self.register(name, handle);
        handle
    }

    /// Store a clip under `name`, or return the one already stored there.
    pub fn add_animation(&mut self, name: impl Into<String>, clip: AnimationClip) -> AnimationHandle {
        let name = name.into();
        if let Some(existing) = self.handle::<AnimationTag>(&name)
            && self.animations.valid(existing)
        {
            return existing;
        }
        let handle = self.animations.create(Arc::new(clip));
        self.register(name, handle);
        handle
    }

    #[must_use]
    pub fn skeleton(&self, handle: SkeletonHandle) -> Option<Arc<Skeleton>> {
        self.skeletons.get(handle).cloned()
    }

    #[must_use]
    pub fn animation(&self, handle: AnimationHandle) -> Option<Arc<AnimationClip>> {
        self.animations.get(handle).cloned()
    }

    pub fn remove_skeleton(&mut self, handle: SkeletonHandle) {
        if self.skeletons.destroy(handle).is_some() {
            self.unregister(handle);
        }
    }

    pub fn remove_animation(&mut self, handle: AnimationHandle) {
        if self.animations.destroy(handle).is_some() {
            self.unregister(handle);
        }
    }
}
