//! Scene components
//!
//! Plain data. Fields named `*_handle` that the scene fills in itself
//! (renderables, bodies, agents, ...) hold [`Handle::INVALID`] until the
//! owning engine has created the resource.
//!
//! [`Handle::INVALID`]: crate::handles::Handle::INVALID

use std::collections::BTreeMap;

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::animation::{AnimationHandle, SkeletonHandle};
use crate::engines::graphics::{
    BonesHandle, MeshHandle, PointLightHandle, RenderableHandle, TerrainHandle,
    TerrainRenderableHandle, TextureHandle,
};
use crate::engines::pathfinding::{
    AgentHandle, AgentParams, AgentState, CrowdConfig, CrowdHandle, MovementRequestState,
    NavigationMeshHandle,
};
use crate::engines::physics::{
    CollisionShapeHandle, GhostObjectHandle, RigidBodyDesc, RigidBodyObjectHandle,
};
use crate::engines::scripting::ScriptObjectHandle;

/// World-space position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionComponent {
    pub position: Vec3,
}

impl PositionComponent {
    #[must_use]
    pub const fn new(position: Vec3) -> Self {
        Self { position }
    }
}

/// World-space orientation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationComponent {
    pub orientation: Quat,
}

impl OrientationComponent {
    #[must_use]
    pub const fn new(orientation: Quat) -> Self {
        Self { orientation }
    }
}

impl Default for OrientationComponent {
    fn default() -> Self {
        Self::new(Quat::IDENTITY)
    }
}

/// A textured mesh drawn at the entity's transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphicsComponent {
    pub mesh_handle: MeshHandle,
    pub texture_handle: TextureHandle,
    pub scale: Vec3,
    pub renderable_handle: RenderableHandle,
}

impl GraphicsComponent {
    #[must_use]
    pub const fn new(mesh_handle: MeshHandle, texture_handle: TextureHandle) -> Self {
        Self {
            mesh_handle,
            texture_handle,
            scale: Vec3::ONE,
            renderable_handle: RenderableHandle::INVALID,
        }
    }

    #[must_use]
    pub const fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointLightComponent {
    pub point_light_handle: PointLightHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphicsTerrainComponent {
    pub terrain_handle: TerrainHandle,
    pub terrain_renderable_handle: TerrainRenderableHandle,
}

impl GraphicsTerrainComponent {
    #[must_use]
    pub const fn new(terrain_handle: TerrainHandle) -> Self {
        Self {
            terrain_handle,
            terrain_renderable_handle: TerrainRenderableHandle::INVALID,
        }
    }
}

/// A simulated body driving the entity's transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidBodyObjectComponent {
    pub collision_shape_handle: CollisionShapeHandle,
    pub mass: f32,
    pub friction: f32,
    pub restitution: f32,
    pub rigid_body_object_handle: RigidBodyObjectHandle,
}

impl RigidBodyObjectComponent {
    #[must_use]
    pub fn new(collision_shape_handle: CollisionShapeHandle) -> Self {
        let desc = RigidBodyDesc::default();
        Self {
            collision_shape_handle,
            mass: desc.mass,
            friction: desc.friction,
            restitution: desc.restitution,
            rigid_body_object_handle: RigidBodyObjectHandle::INVALID,
        }
    }

    #[must_use]
    pub const fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    /// Body parameters for the physics engine.
    #[must_use]
    pub const fn desc(&self) -> RigidBodyDesc {
        RigidBodyDesc {
            mass: self.mass,
            friction: self.friction,
            restitution: self.restitution,
        }
    }
}

/// A collision volume that follows the entity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GhostObjectComponent {
    pub collision_shape_handle: CollisionShapeHandle,
    pub ghost_object_handle: GhostObjectHandle,
}

impl GhostObjectComponent {
    #[must_use]
    pub const fn new(collision_shape_handle: CollisionShapeHandle) -> Self {
        Self {
            collision_shape_handle,
            ghost_object_handle: GhostObjectHandle::INVALID,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PathfindingCrowdComponent {
    pub navigation_mesh_handle: NavigationMeshHandle,
    pub crowd_config: CrowdConfig,
    pub crowd_handle: CrowdHandle,
}

impl PathfindingCrowdComponent {
    #[must_use]
    pub fn new(navigation_mesh_handle: NavigationMeshHandle) -> Self {
        Self {
            navigation_mesh_handle,
            ..Self::default()
        }
    }
}

/// An agent walking inside a crowd.
///
/// Setting `target` together with [`MovementRequestState::Requesting`] asks
/// the scene to hand the target to the pathfinding engine on the next pass.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PathfindingAgentComponent {
    pub crowd_handle: CrowdHandle,
    pub agent_handle: AgentHandle,
    pub agent_params: AgentParams,
    pub agent_state: AgentState,
    pub movement_request_state: MovementRequestState,
    pub target: Vec3,
}

impl PathfindingAgentComponent {
    #[must_use]
    pub fn new(crowd_handle: CrowdHandle) -> Self {
        Self {
            crowd_handle,
            ..Self::default()
        }
    }

    /// Request a move to `target`.
    #[must_use]
    pub fn with_target(mut self, target: Vec3) -> Self {
        self.target = target;
        self.movement_request_state = MovementRequestState::Requesting;
        self
    }
}

/// Plays a clip on the entity's skeleton.
///
/// `start_frame`/`end_frame` select a window of the clip in frames; an
/// `end_frame` of zero means the end of the clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationComponent {
    pub animation_handle: AnimationHandle,
    pub bones_handle: BonesHandle,
    pub running_time: f32,
    pub speed: f32,
    pub start_frame: u32,
    pub end_frame: u32,
    /// Last computed pose; empty while a pose is in flight
    #[serde(skip)]
    pub transformations: Vec<Mat4>,
}

impl AnimationComponent {
    #[must_use]
    pub fn new(animation_handle: AnimationHandle) -> Self {
        Self {
            animation_handle,
            bones_handle: BonesHandle::INVALID,
            running_time: 0.0,
            speed: 1.0,
            start_frame: 0,
            end_frame: 0,
            transformations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    #[must_use]
    pub const fn with_frames(mut self, start_frame: u32, end_frame: u32) -> Self {
        self.start_frame = start_frame;
        self.end_frame = end_frame;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SkeletonComponent {
    pub skeleton_handle: SkeletonHandle,
}

/// A script object bound to the entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptObjectComponent {
    pub module: String,
    pub type_name: String,
    #[serde(skip)]
    pub script_object_handle: ScriptObjectHandle,
}

/// Free-form string properties.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PropertiesComponent {
    pub properties: BTreeMap<String, String>,
}

impl PropertiesComponent {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }
}
