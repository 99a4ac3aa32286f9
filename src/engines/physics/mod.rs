//! Physics collaborator
//!
//! Rigid bodies and ghost objects live inside a physics scene owned by a
//! [`PhysicsEngine`]. The scene learns about simulated motion through
//! [`MotionChangeListener`]s installed per object.

mod rapier;

use glam::{Quat, Vec3};

pub use rapier::{RapierPhysicsEngine, Shape};

crate::handle_types! {
    /// A simulation world owned by a physics engine.
    PhysicsSceneHandle => PhysicsSceneTag;
    /// Collision shape asset, shared between worlds.
    CollisionShapeHandle => CollisionShapeTag;
    /// A simulated rigid body.
    RigidBodyObjectHandle => RigidBodyObjectTag;
    /// A non-simulated collision volume that follows its entity.
    GhostObjectHandle => GhostObjectTag;
}

/// Either kind of collision object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicsObjectHandle {
    RigidBody(RigidBodyObjectHandle),
    Ghost(GhostObjectHandle),
}

impl From<RigidBodyObjectHandle> for PhysicsObjectHandle {
    fn from(handle: RigidBodyObjectHandle) -> Self {
        Self::RigidBody(handle)
    }
}

impl From<GhostObjectHandle> for PhysicsObjectHandle {
    fn from(handle: GhostObjectHandle) -> Self {
        Self::Ghost(handle)
    }
}

/// Receives the new transform of an object after the simulation moved it.
pub trait MotionChangeListener {
    fn update(&mut self, position: Vec3, orientation: Quat);
}

/// Physical properties of a new rigid body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBodyDesc {
    pub mass: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl Default for RigidBodyDesc {
    fn default() -> Self {
        Self {
            mass: 1.0,
            friction: 1.0,
            restitution: 1.0,
        }
    }
}

/// A ray in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub max_distance: f32,
}

impl Ray {
    #[must_use]
    pub const fn new(origin: Vec3, direction: Vec3, max_distance: f32) -> Self {
        Self {
            origin,
            direction,
            max_distance,
        }
    }
}

/// Result of a raycast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    /// The object that was hit
    pub object: PhysicsObjectHandle,
    /// The point of intersection
    pub point: Vec3,
    /// Distance from ray origin
    pub distance: f32,
}

/// Narrow interface to a physics backend.
pub trait PhysicsEngine {
    fn create_physics_scene(&mut self) -> PhysicsSceneHandle;
    fn destroy_physics_scene(&mut self, scene: PhysicsSceneHandle);

    /// Advance the simulation. Motion listeners fire from inside this call.
    fn tick(&mut self, scene: PhysicsSceneHandle, delta: f32);

    fn create_rigid_body_object(
        &mut self,
        scene: PhysicsSceneHandle,
        shape: CollisionShapeHandle,
        position: Vec3,
        orientation: Quat,
        desc: RigidBodyDesc,
    ) -> RigidBodyObjectHandle;
    fn destroy_rigid_body_object(&mut self, scene: PhysicsSceneHandle, object: RigidBodyObjectHandle);

    fn create_ghost_object(
        &mut self,
        scene: PhysicsSceneHandle,
        shape: CollisionShapeHandle,
        position: Vec3,
        orientation: Quat,
    ) -> GhostObjectHandle;
    fn destroy_ghost_object(&mut self, scene: PhysicsSceneHandle, object: GhostObjectHandle);

    /// Teleport an object.
    fn position(&mut self, scene: PhysicsSceneHandle, object: PhysicsObjectHandle, position: Vec3);
    fn rotation(&mut self, scene: PhysicsSceneHandle, object: PhysicsObjectHandle, orientation: Quat);

    /// Attach an opaque payload to an object (the scene stores entity bits).
    fn set_user_data(&mut self, scene: PhysicsSceneHandle, object: PhysicsObjectHandle, data: u64);
    fn user_data(&self, scene: PhysicsSceneHandle, object: PhysicsObjectHandle) -> Option<u64>;

    /// Replace the motion listener of an object.
    fn set_motion_change_listener(
        &mut self,
        scene: PhysicsSceneHandle,
        object: PhysicsObjectHandle,
        listener: Option<Box<dyn MotionChangeListener>>,
    );

    /// Closest hit along `ray`, if any.
    fn raycast(&self, scene: PhysicsSceneHandle, ray: Ray) -> Option<RaycastHit>;
}
