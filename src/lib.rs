//! Entity-component scenes kept in step with external engines
//!
//! This crate provides:
//! - Generational handles for engine-owned resources
//! - An entity component system built on hecs
//! - Scenes that mirror components into graphics, physics (rapier3d),
//!   pathfinding, audio and scripting engines, and feed engine changes back
//! - A two-stage skeletal animation pipeline
//! - Scene saving and loading with asset handles resolved by name

pub mod animation;
pub mod assets;
pub mod ecs;
pub mod engines;
pub mod handles;
pub mod scene;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use glam;
pub use hecs;
pub use rapier3d;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::animation::{AnimationClip, AnimationHandle, Bone, Skeleton, SkeletonHandle};
    pub use crate::assets::{ResourceKind, ResourceRegistry};
    pub use crate::ecs::{
        AnimationComponent, ChildrenComponent, DirtyFlags, Entity, GhostObjectComponent,
        GraphicsComponent, GraphicsTerrainComponent, OrientationComponent, ParentComponent,
        PathfindingAgentComponent, PathfindingCrowdComponent, PointLightComponent,
        PositionComponent, PropertiesComponent, RigidBodyObjectComponent, ScriptObjectComponent,
        SkeletonComponent,
    };
    pub use crate::engines::{Engines, Shared, shared};
    pub use crate::handles::{Handle, HandleVector};
    pub use crate::scene::{Scene, SceneConfig, SceneError, SerializedScene};
    pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
}
