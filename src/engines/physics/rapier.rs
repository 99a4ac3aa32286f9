//! Physics simulation using rapier3d
//!
//! One rapier world per physics scene. Rigid bodies are dynamic bodies with a
//! single collider; ghost objects are kinematic bodies carrying a sensor.

use glam::{Quat, Vec3};
use rapier3d::na::{Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::*;

use super::{
    CollisionShapeHandle, CollisionShapeTag, GhostObjectHandle, GhostObjectTag,
    MotionChangeListener, PhysicsEngine, PhysicsObjectHandle, PhysicsSceneHandle,
    PhysicsSceneTag, Ray, RaycastHit, RigidBodyDesc, RigidBodyObjectHandle, RigidBodyObjectTag,
};
use crate::handles::{Handle, HandleVector};

/// Convert glam Quat to rapier3d UnitQuaternion
fn quat_to_rapier(q: Quat) -> UnitQuaternion<f32> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

/// Convert rapier3d UnitQuaternion to glam Quat
fn rapier_to_quat(uq: &UnitQuaternion<f32>) -> Quat {
    let q = uq.quaternion();
    Quat::from_xyzw(q.i, q.j, q.k, q.w)
}

fn isometry(position: Vec3, orientation: Quat) -> Isometry<Real> {
    Isometry::from_parts(
        Translation3::new(position.x, position.y, position.z),
        quat_to_rapier(orientation),
    )
}

// Collider user data: object kind in the high 64 bits, handle id in the low.
const RIGID_BODY_TAG: u128 = 1;
const GHOST_TAG: u128 = 2;

fn encode_object(object: PhysicsObjectHandle) -> u128 {
    match object {
        PhysicsObjectHandle::RigidBody(h) => (RIGID_BODY_TAG << 64) | u128::from(h.id()),
        PhysicsObjectHandle::Ghost(h) => (GHOST_TAG << 64) | u128::from(h.id()),
    }
}

fn decode_object(data: u128) -> Option<PhysicsObjectHandle> {
    let id = data as u64;
    match data >> 64 {
        RIGID_BODY_TAG => Some(PhysicsObjectHandle::RigidBody(Handle::from_id(id))),
        GHOST_TAG => Some(PhysicsObjectHandle::Ghost(Handle::from_id(id))),
        _ => None,
    }
}

/// Collision shape description.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    Capsule { half_height: f32, radius: f32 },
}

impl Shape {
    fn build(self) -> SharedShape {
        match self {
            Self::Box { half_extents } => {
                SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            Self::Sphere { radius } => SharedShape::ball(radius),
            Self::Capsule {
                half_height,
                radius,
            } => SharedShape::capsule_y(half_height, radius),
        }
    }
}

/// A body plus whatever the scene attached to it.
struct BodyObject {
    body: RigidBodyHandle,
    user_data: Option<u64>,
    listener: Option<Box<dyn MotionChangeListener>>,
}

impl BodyObject {
    fn new(body: RigidBodyHandle) -> Self {
        Self {
            body,
            user_data: None,
            listener: None,
        }
    }
}

/// One rapier simulation world.
struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    /// Query pipeline for raycasting
    query_pipeline: QueryPipeline,
    integration_parameters: IntegrationParameters,
    rigid_bodies: HandleVector<BodyObject, RigidBodyObjectTag>,
    ghosts: HandleVector<BodyObject, GhostObjectTag>,
}

impl PhysicsWorld {
    fn new() -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            integration_parameters: IntegrationParameters::default(),
            rigid_bodies: HandleVector::new(),
            ghosts: HandleVector::new(),
        }
    }

    fn step(&mut self, gravity: Vec3, dt: f32) {
        self.integration_parameters.dt = dt;

        self.pipeline.step(
            &vector![gravity.x, gravity.y, gravity.z],
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Report every awake dynamic body to its listener.
    fn notify_motion(&mut self) {
        for (_, object) in self.rigid_bodies.iter_mut() {
            let Some(listener) = object.listener.as_mut() else {
                continue;
            };
            let Some(rb) = self.rigid_body_set.get(object.body) else {
                continue;
            };
            if rb.is_dynamic() && !rb.is_sleeping() {
                let t = rb.translation();
                listener.update(Vec3::new(t.x, t.y, t.z), rapier_to_quat(rb.rotation()));
            }
        }
    }

    fn insert(
        &mut self,
        body: RigidBody,
        collider: Collider,
    ) -> (RigidBodyHandle, ColliderHandle) {
        let body = self.rigid_body_set.insert(body);
        let collider =
            self.collider_set
                .insert_with_parent(collider, body, &mut self.rigid_body_set);
        (body, collider)
    }

    fn tag_collider(&mut self, collider: ColliderHandle, object: PhysicsObjectHandle) {
        if let Some(c) = self.collider_set.get_mut(collider) {
            c.user_data = encode_object(object);
        }
    }

    /// Remove a rigid body and its colliders
    fn remove_body(&mut self, body: RigidBodyHandle) {
        self.rigid_body_set.remove(
            body,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    fn object(&self, object: PhysicsObjectHandle) -> Option<&BodyObject> {
        match object {
            PhysicsObjectHandle::RigidBody(h) => self.rigid_bodies.get(h),
            PhysicsObjectHandle::Ghost(h) => self.ghosts.get(h),
        }
    }

    fn object_mut(&mut self, object: PhysicsObjectHandle) -> Option<&mut BodyObject> {
        match object {
            PhysicsObjectHandle::RigidBody(h) => self.rigid_bodies.get_mut(h),
            PhysicsObjectHandle::Ghost(h) => self.ghosts.get_mut(h),
        }
    }

    fn body_mut(&mut self, object: PhysicsObjectHandle) -> Option<&mut RigidBody> {
        let body = self.object(object)?.body;
        self.rigid_body_set.get_mut(body)
    }
}

/// [`PhysicsEngine`] backed by rapier3d.
pub struct RapierPhysicsEngine {
    /// Gravity applied to every world
    pub gravity: Vec3,
    shapes: HandleVector<SharedShape, CollisionShapeTag>,
    worlds: HandleVector<PhysicsWorld, PhysicsSceneTag>,
}

impl RapierPhysicsEngine {
    /// Create an engine with default gravity
    #[must_use]
    pub fn new() -> Self {
        Self::with_gravity(Vec3::new(0.0, -9.81, 0.0))
    }

    /// Create an engine with custom gravity
    #[must_use]
    pub fn with_gravity(gravity: Vec3) -> Self {
        Self {
            gravity,
            shapes: HandleVector::new(),
            worlds: HandleVector::new(),
        }
    }

    /// Register a collision shape.
    pub fn create_collision_shape(&mut self, shape: Shape) -> CollisionShapeHandle {
        self.shapes.create(shape.build())
    }

    pub fn destroy_collision_shape(&mut self, shape: CollisionShapeHandle) {
        self.shapes.destroy(shape);
    }

    /// Current position of an object.
    #[must_use]
    pub fn object_position(
        &self,
        scene: PhysicsSceneHandle,
        object: PhysicsObjectHandle,
    ) -> Option<Vec3> {
        let world = self.worlds.get(scene)?;
        let rb = world.rigid_body_set.get(world.object(object)?.body)?;
        let t = rb.translation();
        Some(Vec3::new(t.x, t.y, t.z))
    }

    fn shape(&self, shape: CollisionShapeHandle) -> Option<SharedShape> {
        let found = self.shapes.get(shape).cloned();
        if found.is_none() {
            log::warn!("unknown collision shape {shape:?}");
        }
        found
    }
}

impl Default for RapierPhysicsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsEngine for RapierPhysicsEngine {
    fn create_physics_scene(&mut self) -> PhysicsSceneHandle {
        self.worlds.create(PhysicsWorld::new())
    }

    fn destroy_physics_scene(&mut self, scene: PhysicsSceneHandle) {
        self.worlds.destroy(scene);
    }

    fn tick(&mut self, scene: PhysicsSceneHandle, delta: f32) {
        let gravity = self.gravity;
        if let Some(world) = self.worlds.get_mut(scene) {
            world.step(gravity, delta);
            world.notify_motion();
        }
    }

    fn create_rigid_body_object(
        &mut self,
        scene: PhysicsSceneHandle,
        shape: CollisionShapeHandle,
        position: Vec3,
        orientation: Quat,
        desc: RigidBodyDesc,
    ) -> RigidBodyObjectHandle {
        let Some(shape) = self.shape(shape) else {
            return RigidBodyObjectHandle::INVALID;
        };
        let Some(world) = self.worlds.get_mut(scene) else {
            return RigidBodyObjectHandle::INVALID;
        };

        let body = RigidBodyBuilder::dynamic()
            .position(isometry(position, orientation))
            .build();
        let collider = ColliderBuilder::new(shape)
            .mass(desc.mass)
            .friction(desc.friction)
            .restitution(desc.restitution)
            .build();

        let (body, collider) = world.insert(body, collider);
        let handle = world.rigid_bodies.create(BodyObject::new(body));
        world.tag_collider(collider, handle.into());
        handle
    }

    fn destroy_rigid_body_object(&mut self, scene: PhysicsSceneHandle, object: RigidBodyObjectHandle) {
        if let Some(world) = self.worlds.get_mut(scene)
            && let Some(removed) = world.rigid_bodies.destroy(object)
        {
            world.remove_body(removed.body);
        }
    }

    fn create_ghost_object(
        &mut self,
        scene: PhysicsSceneHandle,
        shape: CollisionShapeHandle,
        position: Vec3,
        orientation: Quat,
    ) -> GhostObjectHandle {
        let Some(shape) = self.shape(shape) else {
            return GhostObjectHandle::INVALID;
        };
        let Some(world) = self.worlds.get_mut(scene) else {
            return GhostObjectHandle::INVALID;
        };

        let body = RigidBodyBuilder::kinematic_position_based()
            .position(isometry(position, orientation))
            .build();
        let collider = ColliderBuilder::new(shape).sensor(true).build();

        let (body, collider) = world.insert(body, collider);
        let handle = world.ghosts.create(BodyObject::new(body));
        world.tag_collider(collider, handle.into());
        handle
    }

    fn destroy_ghost_object(&mut self, scene: PhysicsSceneHandle, object: GhostObjectHandle) {
        if let Some(world) = self.worlds.get_mut(scene)
            && let Some(removed) = world.ghosts.destroy(object)
        {
            world.remove_body(removed.body);
        }
    }

    fn position(&mut self, scene: PhysicsSceneHandle, object: PhysicsObjectHandle, position: Vec3) {
        if let Some(rb) = self.worlds.get_mut(scene).and_then(|w| w.body_mut(object)) {
            rb.set_translation(vector![position.x, position.y, position.z], true);
        }
    }

    fn rotation(&mut self, scene: PhysicsSceneHandle, object: PhysicsObjectHandle, orientation: Quat) {
        if let Some(rb) = self.worlds.get_mut(scene).and_then(|w| w.body_mut(object)) {
            rb.set_rotation(quat_to_rapier(orientation), true);
        }
    }

    fn set_user_data(&mut self, scene: PhysicsSceneHandle, object: PhysicsObjectHandle, data: u64) {
        if let Some(o) = self.worlds.get_mut(scene).and_then(|w| w.object_mut(object)) {
            o.user_data = Some(data);
        }
    }

    fn user_data(&self, scene: PhysicsSceneHandle, object: PhysicsObjectHandle) -> Option<u64> {
        self.worlds.get(scene)?.object(object)?.user_data
    }

    fn set_motion_change_listener(
        &mut self,
        scene: PhysicsSceneHandle,
        object: PhysicsObjectHandle,
        listener: Option<Box<dyn MotionChangeListener>>,
    ) {
        if let Some(o) = self.worlds.get_mut(scene).and_then(|w| w.object_mut(object)) {
            o.listener = listener;
        }
    }

    fn raycast(&self, scene: PhysicsSceneHandle, ray: Ray) -> Option<RaycastHit> {
        let world = self.worlds.get(scene)?;
        let direction = ray.direction.normalize_or_zero();
        let rapier_ray = rapier3d::prelude::Ray::new(
            point![ray.origin.x, ray.origin.y, ray.origin.z],
            vector![direction.x, direction.y, direction.z],
        );

        let (collider, distance) = world.query_pipeline.cast_ray(
            &world.rigid_body_set,
            &world.collider_set,
            &rapier_ray,
            ray.max_distance,
            true,
            QueryFilter::default(),
        )?;
        let object = decode_object(world.collider_set.get(collider)?.user_data)?;
        let point = rapier_ray.point_at(distance);

        Some(RaycastHit {
            object,
            point: Vec3::new(point.x, point.y, point.z),
            distance,
        })
    }
}
