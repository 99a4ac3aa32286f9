//! Entity Component System module
//!
//! Built on top of the hecs ECS library

mod components;
mod dirty;
mod events;
mod hierarchy;
mod world;

pub use components::{
    AnimationComponent, GhostObjectComponent, GraphicsComponent, GraphicsTerrainComponent,
    OrientationComponent, PathfindingAgentComponent, PathfindingCrowdComponent,
    PointLightComponent, PositionComponent, PropertiesComponent, RigidBodyObjectComponent,
    ScriptObjectComponent, SkeletonComponent,
};
pub use dirty::{DirtyComponent, DirtyFlags};
pub use events::{EcsEvent, EventBus};
pub use hecs::Entity;
pub use hierarchy::{ChildrenComponent, ParentComponent};
pub use world::{ComponentKind, EcsComponent, EcsError, EntityComponentSystem};
