//! Handle normalization for loaded scenes
//!
//! Handles in a saved scene were issued by engines of an earlier run. A
//! [`HandleRemap`] maps them to the handles the current run issued for the
//! same named assets. Resources the scene creates itself are not mapped but
//! invalidated, and get created again on the next reconciliation.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use super::{ResourceNames, SceneError};
use crate::assets::{ResourceKind, ResourceRegistry, ResourceTag};
use crate::ecs::{
    AnimationComponent, GhostObjectComponent, GraphicsComponent, GraphicsTerrainComponent,
    OrientationComponent, PathfindingAgentComponent, PathfindingCrowdComponent,
    PointLightComponent, PositionComponent, PropertiesComponent, RigidBodyObjectComponent,
    SkeletonComponent,
};
use crate::engines::pathfinding::{AgentState, CrowdHandle};
use crate::handles::Handle;

/// Old handle id to new handle id, per asset kind, plus crowds.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HandleRemap {
    tables: BTreeMap<ResourceKind, FxHashMap<u64, u64>>,
    crowds: FxHashMap<u64, u64>,
}

impl HandleRemap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve saved names against the current registry.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::MissingResource`] for the first name the
    /// registry does not know.
    pub fn from_names(names: &ResourceNames, registry: &ResourceRegistry) -> Result<Self, SceneError> {
        let mut remap = Self::new();
        for (&kind, table) in names {
            for (&old, name) in table {
                let new = registry
                    .id(kind, name)
                    .ok_or_else(|| SceneError::MissingResource {
                        kind,
                        name: name.clone(),
                    })?;
                remap.insert(kind, old, new);
            }
        }
        Ok(remap)
    }

    pub fn insert(&mut self, kind: ResourceKind, old: u64, new: u64) {
        self.tables.entry(kind).or_default().insert(old, new);
    }

    pub fn insert_crowd(&mut self, old: CrowdHandle, new: CrowdHandle) {
        self.crowds.insert(old.id(), new.id());
    }

    /// New handle for `handle`. Invalid handles stay invalid.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownHandle`] if a valid handle has no entry.
    pub fn remap<T: ResourceTag>(&self, handle: Handle<T>) -> Result<Handle<T>, SceneError> {
        if !handle.valid() {
            return Ok(handle);
        }
        self.tables
            .get(&T::KIND)
            .and_then(|table| table.get(&handle.id()))
            .map(|&id| Handle::from_id(id))
            .ok_or(SceneError::UnknownHandle {
                kind: T::KIND,
                id: handle.id(),
            })
    }

    /// New handle of a crowd recreated during the load.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownCrowd`] if no loaded entity owned it.
    pub fn remap_crowd(&self, handle: CrowdHandle) -> Result<CrowdHandle, SceneError> {
        if !handle.valid() {
            return Ok(handle);
        }
        self.crowds
            .get(&handle.id())
            .map(|&id| CrowdHandle::from_id(id))
            .ok_or(SceneError::UnknownCrowd(handle.id()))
    }
}

/// Rewrite a loaded component for the current run.
pub(super) trait Normalize {
    fn normalize(&mut self, remap: &HandleRemap) -> Result<(), SceneError>;
}

macro_rules! unchanged {
    ($($ty:ty),*) => {
        $(impl Normalize for $ty {
            fn normalize(&mut self, _remap: &HandleRemap) -> Result<(), SceneError> {
                Ok(())
            }
        })*
    };
}

unchanged!(PositionComponent, OrientationComponent, PropertiesComponent);

impl Normalize for GraphicsComponent {
    fn normalize(&mut self, remap: &HandleRemap) -> Result<(), SceneError> {
        self.mesh_handle = remap.remap(self.mesh_handle)?;
        self.texture_handle = remap.remap(self.texture_handle)?;
        self.renderable_handle.invalidate();
        Ok(())
    }
}

impl Normalize for PointLightComponent {
    fn normalize(&mut self, _remap: &HandleRemap) -> Result<(), SceneError> {
        self.point_light_handle.invalidate();
        Ok(())
    }
}

impl Normalize for GraphicsTerrainComponent {
    fn normalize(&mut self, remap: &HandleRemap) -> Result<(), SceneError> {
        self.terrain_handle = remap.remap(self.terrain_handle)?;
        self.terrain_renderable_handle.invalidate();
        Ok(())
    }
}

impl Normalize for RigidBodyObjectComponent {
    fn normalize(&mut self, remap: &HandleRemap) -> Result<(), SceneError> {
        self.collision_shape_handle = remap.remap(self.collision_shape_handle)?;
        self.rigid_body_object_handle.invalidate();
        Ok(())
    }
}

impl Normalize for GhostObjectComponent {
    fn normalize(&mut self, remap: &HandleRemap) -> Result<(), SceneError> {
        self.collision_shape_handle = remap.remap(self.collision_shape_handle)?;
        self.ghost_object_handle.invalidate();
        Ok(())
    }
}

impl Normalize for PathfindingCrowdComponent {
    fn normalize(&mut self, remap: &HandleRemap) -> Result<(), SceneError> {
        self.navigation_mesh_handle = remap.remap(self.navigation_mesh_handle)?;
        self.crowd_handle.invalidate();
        Ok(())
    }
}

impl Normalize for PathfindingAgentComponent {
    fn normalize(&mut self, remap: &HandleRemap) -> Result<(), SceneError> {
        self.crowd_handle = remap.remap_crowd(self.crowd_handle)?;
        self.agent_handle.invalidate();
        self.agent_state = AgentState::Invalid;
        Ok(())
    }
}

impl Normalize for AnimationComponent {
    fn normalize(&mut self, remap: &HandleRemap) -> Result<(), SceneError> {
        self.animation_handle = remap.remap(self.animation_handle)?;
        self.bones_handle.invalidate();
        self.transformations.clear();
        Ok(())
    }
}

impl Normalize for SkeletonComponent {
    fn normalize(&mut self, remap: &HandleRemap) -> Result<(), SceneError> {
        self.skeleton_handle = remap.remap(self.skeleton_handle)?;
        Ok(())
    }
}
