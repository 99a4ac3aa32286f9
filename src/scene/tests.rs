use glam::{Quat, Vec3};

use super::*;
use crate::animation::{AnimationClip, AnimationHandle, Bone, Skeleton};
use crate::ecs::{ChildrenComponent, ParentComponent, PropertiesComponent, SkeletonComponent};
use crate::engines::graphics::{MeshHandle, TextureHandle};
use crate::engines::pathfinding::{
    AgentState, MovementRequestState, NavigationMeshHandle, PathfindingEngine,
};
use crate::engines::physics::{
    CollisionShapeHandle, PhysicsEngine, PhysicsObjectHandle, Ray, RaycastHit, Shape,
};
use crate::engines::{Engines, RapierPhysicsEngine, shared};
use crate::engines::scripting::{DESERIALIZE, INITIALIZE, POST_TICK, PRE_TICK, TICK, UPDATE};
use crate::testing::{Call, Mocks};

const DT: f32 = 1.0 / 60.0;
const SHAPE: CollisionShapeHandle = CollisionShapeHandle::new(0, 1);
const MESH: MeshHandle = MeshHandle::new(0, 1);

fn placed(scene: &mut Scene, position: Vec3) -> Entity {
    let entity = scene.create_entity();
    scene
        .entity(entity)
        .assign(PositionComponent::new(position))
        .assign(OrientationComponent::default());
    entity
}

fn with_body(scene: &mut Scene, position: Vec3) -> Entity {
    let entity = placed(scene, position);
    scene.assign(entity, RigidBodyObjectComponent::new(SHAPE));
    entity
}

fn body_of(scene: &Scene, entity: Entity) -> PhysicsObjectHandle {
    scene
        .get::<RigidBodyObjectComponent>(entity)
        .unwrap()
        .rigid_body_object_handle
        .into()
}

fn ghost_of(scene: &Scene, entity: Entity) -> PhysicsObjectHandle {
    scene
        .get::<GhostObjectComponent>(entity)
        .unwrap()
        .ghost_object_handle
        .into()
}

// ============================================================================
// Assignment and resources
// ============================================================================

#[test]
fn test_renderable_created_at_entity_transform() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let rotation = Quat::from_rotation_y(1.0);

    let entity = scene.create_entity();
    scene
        .entity(entity)
        .assign(PositionComponent::new(Vec3::new(1.0, 2.0, 3.0)))
        .assign(OrientationComponent::new(rotation))
        .assign(GraphicsComponent::new(MESH, TextureHandle::INVALID));

    let graphics = scene.get::<GraphicsComponent>(entity).unwrap();
    assert!(graphics.renderable_handle.valid());
    assert!(mocks.calls().contains(&Call::CreateRenderable {
        renderable: graphics.renderable_handle,
        mesh: MESH,
        position: Vec3::new(1.0, 2.0, 3.0),
        orientation: rotation,
    }));
}

#[test]
#[should_panic(expected = "cannot assign Graphics")]
fn test_assign_without_dependency_panics() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let entity = scene.create_entity();
    scene.assign(entity, GraphicsComponent::new(MESH, TextureHandle::INVALID));
}

#[test]
fn test_reassign_replaces_rigid_body() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let entity = with_body(&mut scene, Vec3::ZERO);
    let first = body_of(&scene, entity);

    scene.assign(entity, RigidBodyObjectComponent::new(SHAPE).with_mass(4.0));

    assert_eq!(mocks.physics.borrow().body_count(), 1);
    let PhysicsObjectHandle::RigidBody(first) = first else {
        panic!("not a rigid body");
    };
    assert_eq!(mocks.count(|c| *c == Call::DestroyRigidBody(first)), 1);
    assert_ne!(body_of(&scene, entity), PhysicsObjectHandle::from(first));
}

#[test]
fn test_reassign_same_resource_keeps_it() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let entity = with_body(&mut scene, Vec3::ZERO);
    let before = body_of(&scene, entity);

    let mut body = scene.get::<RigidBodyObjectComponent>(entity).unwrap();
    body.friction = 0.2;
    scene.assign(entity, body);

    assert_eq!(body_of(&scene, entity), before);
    assert_eq!(mocks.count(|c| matches!(c, Call::DestroyRigidBody(_))), 0);
    assert_eq!(mocks.physics.borrow().body_count(), 1);
}

#[test]
fn test_remove_releases_resource() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let entity = with_body(&mut scene, Vec3::ZERO);

    let removed = scene.remove::<RigidBodyObjectComponent>(entity).unwrap();
    assert!(!removed.rigid_body_object_handle.valid());
    assert_eq!(mocks.physics.borrow().body_count(), 0);
    assert!(scene.remove::<RigidBodyObjectComponent>(entity).is_none());
}

#[test]
fn test_destroy_releases_everything() {
    let mocks = Mocks::new();
    mocks.scripting.borrow_mut().add_module("game", &["Crate"]);
    let mut scene = mocks.scene();

    let entity = with_body(&mut scene, Vec3::ZERO);
    scene.assign(entity, GraphicsComponent::new(MESH, TextureHandle::INVALID));
    scene.assign(entity, PointLightComponent::default());
    scene.attach_script(entity, "game", "Crate").unwrap();
    scene.tick(DT).unwrap();

    scene.destroy_entity(entity);

    assert!(!scene.valid(entity));
    assert_eq!(mocks.graphics.borrow().renderable_count(), 0);
    assert_eq!(mocks.physics.borrow().body_count(), 0);
    assert_eq!(mocks.scripting.borrow().object_count(), 0);
    assert_eq!(mocks.count(|c| matches!(c, Call::DestroyPointLight(_))), 1);
}

#[test]
fn test_dropping_scene_releases_everything() {
    let mocks = Mocks::new();
    {
        let mut scene = mocks.scene();
        with_body(&mut scene, Vec3::ZERO);
        let lit = placed(&mut scene, Vec3::ONE);
        scene.assign(lit, GraphicsComponent::new(MESH, TextureHandle::INVALID));
    }
    assert_eq!(mocks.graphics.borrow().renderable_count(), 0);
    assert_eq!(mocks.physics.borrow().body_count(), 0);
}

// ============================================================================
// Reconciliation
// ============================================================================

#[test]
fn test_user_data_resolves_to_entity_after_tick() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let entity = with_body(&mut scene, Vec3::ZERO);
    scene.tick(DT).unwrap();

    let object = body_of(&scene, entity);
    let data = mocks.physics.borrow().user_data(scene.physics_scene(), object);
    assert_eq!(data, Some(entity.to_bits().get()));
    assert_eq!(Entity::from_bits(data.unwrap()), Some(entity));
}

#[test]
fn test_second_reconcile_is_silent() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    scene.set_active(false);
    let entity = with_body(&mut scene, Vec3::ZERO);
    scene.assign(entity, GraphicsComponent::new(MESH, TextureHandle::INVALID));

    scene.tick(DT).unwrap();
    assert!(!mocks.calls().is_empty());

    mocks.clear();
    scene.tick(DT).unwrap();
    assert_eq!(mocks.calls(), Vec::new());
}

#[test]
fn test_script_position_pushed_to_engines() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let entity = with_body(&mut scene, Vec3::ZERO);
    scene.assign(entity, GraphicsComponent::new(MESH, TextureHandle::INVALID));
    scene.tick(DT).unwrap();
    mocks.clear();

    scene.entity(entity).set_position(Vec3::X);
    scene.tick(DT).unwrap();

    let renderable = scene.get::<GraphicsComponent>(entity).unwrap().renderable_handle;
    let object = body_of(&scene, entity);
    let calls = mocks.sync_calls();
    assert!(calls.contains(&Call::RenderablePosition(renderable, Vec3::X)));
    assert!(calls.contains(&Call::PhysicsPosition(object, Vec3::X)));
    assert!(!calls.iter().any(|c| matches!(c, Call::PhysicsRotation(..))));
}

#[test]
fn test_physics_motion_never_echoed_to_physics() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let entity = with_body(&mut scene, Vec3::ZERO);
    scene.assign(entity, GraphicsComponent::new(MESH, TextureHandle::INVALID));
    scene.tick(DT).unwrap();
    mocks.clear();

    let object = body_of(&scene, entity);
    let fallen = Vec3::new(0.0, -1.0, 0.0);
    let tilted = Quat::from_rotation_x(0.3);
    mocks.physics.borrow_mut().fire_motion(object, fallen, tilted);
    scene.tick(DT).unwrap();

    let renderable = scene.get::<GraphicsComponent>(entity).unwrap().renderable_handle;
    assert_eq!(scene.get::<PositionComponent>(entity).unwrap().position, fallen);
    assert_eq!(scene.get::<OrientationComponent>(entity).unwrap().orientation, tilted);
    assert_eq!(
        mocks.sync_calls(),
        vec![
            Call::RenderablePosition(renderable, fallen),
            Call::RenderableRotation(renderable, tilted),
        ]
    );
}

#[test]
fn test_physics_motion_not_echoed_alongside_script_changes() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let entity = with_body(&mut scene, Vec3::ZERO);
    scene.assign(entity, GraphicsComponent::new(MESH, TextureHandle::INVALID));
    scene.tick(DT).unwrap();
    mocks.clear();

    // Physics moves the body while a script adds a ghost in the same tick.
    let body = body_of(&scene, entity);
    let fallen = Vec3::new(0.0, -1.0, 0.0);
    mocks.physics.borrow_mut().fire_motion(body, fallen, Quat::IDENTITY);
    scene.assign(entity, GhostObjectComponent::new(SHAPE));
    scene.tick(DT).unwrap();

    let renderable = scene.get::<GraphicsComponent>(entity).unwrap().renderable_handle;
    let ghost = ghost_of(&scene, entity);
    let calls = mocks.sync_calls();
    assert!(calls.contains(&Call::RenderablePosition(renderable, fallen)));
    assert!(calls.contains(&Call::PhysicsUserData(ghost, entity.to_bits().get())));
    assert!(!calls
        .iter()
        .any(|c| matches!(c, Call::PhysicsPosition(..) | Call::PhysicsRotation(..))));
}

#[test]
fn test_ghost_registered_and_follows_script_position() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let entity = placed(&mut scene, Vec3::ZERO);
    scene.assign(entity, GhostObjectComponent::new(SHAPE));
    assert_eq!(mocks.physics.borrow().ghost_count(), 1);
    scene.tick(DT).unwrap();

    let ghost = ghost_of(&scene, entity);
    assert!(mocks.calls().contains(&Call::MotionListener(ghost)));
    let data = mocks.physics.borrow().user_data(scene.physics_scene(), ghost);
    assert_eq!(data.and_then(Entity::from_bits), Some(entity));

    mocks.clear();
    scene.entity(entity).set_position(Vec3::Z);
    scene.tick(DT).unwrap();
    assert_eq!(mocks.sync_calls(), vec![Call::PhysicsPosition(ghost, Vec3::Z)]);
}

#[test]
fn test_ghost_motion_reaches_graphics_only() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let entity = placed(&mut scene, Vec3::ZERO);
    scene
        .entity(entity)
        .assign(GraphicsComponent::new(MESH, TextureHandle::INVALID))
        .assign(GhostObjectComponent::new(SHAPE));
    scene.tick(DT).unwrap();
    mocks.clear();

    let ghost = ghost_of(&scene, entity);
    mocks.physics.borrow_mut().fire_motion(ghost, Vec3::Y, Quat::IDENTITY);
    scene.tick(DT).unwrap();

    let renderable = scene.get::<GraphicsComponent>(entity).unwrap().renderable_handle;
    assert_eq!(
        mocks.sync_calls(),
        vec![
            Call::RenderablePosition(renderable, Vec3::Y),
            Call::RenderableRotation(renderable, Quat::IDENTITY),
        ]
    );
}

#[test]
fn test_motion_for_destroyed_entity_is_dropped() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let entity = with_body(&mut scene, Vec3::ZERO);
    scene.tick(DT).unwrap();

    let object = body_of(&scene, entity);
    mocks.physics.borrow_mut().fire_motion(object, Vec3::Y, Quat::IDENTITY);
    scene.destroy_entity(entity);
    scene.tick(DT).unwrap();

    assert_eq!(scene.entity_count(), 0);
}

#[test]
fn test_raycast_resolves_entity() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let entity = with_body(&mut scene, Vec3::ZERO);
    let ray = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y, 10.0);
    assert_eq!(scene.raycast(ray), None);

    let hit = RaycastHit {
        object: body_of(&scene, entity),
        point: Vec3::new(0.0, 0.5, 0.0),
        distance: 4.5,
    };
    mocks.physics.borrow_mut().set_raycast_hit(Some(hit));
    // No user data before the first reconciliation.
    assert_eq!(scene.raycast(ray), None);

    scene.tick(DT).unwrap();
    assert_eq!(scene.raycast(ray), Some((entity, hit)));

    scene.destroy_entity(entity);
    assert_eq!(scene.raycast(ray), None);
}

#[test]
fn test_raycast_against_rapier() {
    let physics = shared(RapierPhysicsEngine::with_gravity(Vec3::ZERO));
    let shape = physics.borrow_mut().create_collision_shape(Shape::Box {
        half_extents: Vec3::splat(1.0),
    });
    let engines = Engines {
        physics,
        ..Engines::headless()
    };

    let mut scene = Scene::new(engines, SceneConfig::default());
    let target = placed(&mut scene, Vec3::new(0.0, 0.0, -5.0));
    scene.assign(target, GhostObjectComponent::new(shape));
    scene.tick(DT).unwrap();

    let (entity, hit) = scene
        .raycast(Ray::new(Vec3::ZERO, Vec3::NEG_Z, 100.0))
        .unwrap();
    assert_eq!(entity, target);
    assert!((hit.distance - 4.0).abs() < 0.01);
}

// ============================================================================
// Pathfinding
// ============================================================================

fn crowd(scene: &mut Scene) -> Entity {
    let entity = scene.create_entity();
    scene.assign(entity, PathfindingCrowdComponent::new(NavigationMeshHandle::new(0, 1)));
    entity
}

fn agent(scene: &mut Scene, crowd: Entity, target: Vec3) -> Entity {
    let crowd = scene.get::<PathfindingCrowdComponent>(crowd).unwrap().crowd_handle;
    let entity = placed(scene, Vec3::ZERO);
    scene.assign(entity, PathfindingAgentComponent::new(crowd).with_target(target));
    entity
}

#[test]
fn test_move_target_requested_once() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let crowd = crowd(&mut scene);
    let walker = agent(&mut scene, crowd, Vec3::new(5.0, 0.0, 5.0));

    scene.tick(DT).unwrap();
    scene.tick(DT).unwrap();

    let handle = scene.get::<PathfindingAgentComponent>(walker).unwrap().agent_handle;
    assert!(handle.valid());
    assert_eq!(
        mocks.count(|c| matches!(c, Call::RequestMoveTarget(..))),
        1
    );
    assert!(mocks.calls().contains(&Call::RequestMoveTarget(handle, Vec3::new(5.0, 0.0, 5.0))));

    let agent = scene.get::<PathfindingAgentComponent>(walker).unwrap();
    let data = mocks.pathfinding.borrow().user_data(
        scene.pathfinding_scene(),
        agent.crowd_handle,
        agent.agent_handle,
    );
    assert_eq!(data, Some(walker.to_bits().get()));
}

#[test]
fn test_agent_feedback_reaches_components_and_script() {
    let mocks = Mocks::new();
    mocks.scripting.borrow_mut().add_module("game", &["Walker"]);
    let mut scene = mocks.scene();
    let crowd = crowd(&mut scene);
    let walker = agent(&mut scene, crowd, Vec3::X);
    scene
        .entity(walker)
        .assign(GraphicsComponent::new(MESH, TextureHandle::INVALID))
        .assign(GhostObjectComponent::new(SHAPE));
    scene.attach_script(walker, "game", "Walker").unwrap();
    scene.tick(DT).unwrap();
    mocks.clear();

    let handle = scene.get::<PathfindingAgentComponent>(walker).unwrap().agent_handle;
    {
        let mut pathfinding = mocks.pathfinding.borrow_mut();
        pathfinding.fire_agent_motion(handle, Vec3::new(0.5, 0.0, 0.0));
        pathfinding.fire_agent_state(handle, AgentState::Walking);
        pathfinding.fire_movement_request(handle, MovementRequestState::Valid);
    }
    scene.tick(DT).unwrap();

    let agent = scene.get::<PathfindingAgentComponent>(walker).unwrap();
    assert_eq!(agent.agent_state, AgentState::Walking);
    assert_eq!(agent.movement_request_state, MovementRequestState::Valid);
    assert_eq!(
        scene.get::<PositionComponent>(walker).unwrap().position,
        Vec3::new(0.5, 0.0, 0.0)
    );
    assert_eq!(mocks.count(|c| matches!(c, Call::Execute(_, m) if m == UPDATE)), 1);
    assert_eq!(mocks.count(|c| matches!(c, Call::RequestMoveTarget(..))), 0);

    let renderable = scene.get::<GraphicsComponent>(walker).unwrap().renderable_handle;
    let ghost = ghost_of(&scene, walker);
    let calls = mocks.sync_calls();
    assert!(calls.contains(&Call::RenderablePosition(renderable, Vec3::new(0.5, 0.0, 0.0))));
    assert!(calls.contains(&Call::PhysicsPosition(ghost, Vec3::new(0.5, 0.0, 0.0))));
    assert!(!calls.iter().any(|c| matches!(c, Call::RenderableRotation(..))));
}

#[test]
fn test_agent_motion_skips_rigid_body() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let crowd = crowd(&mut scene);
    let walker = agent(&mut scene, crowd, Vec3::X);
    scene
        .entity(walker)
        .assign(RigidBodyObjectComponent::new(SHAPE))
        .assign(GhostObjectComponent::new(SHAPE));
    scene.tick(DT).unwrap();
    mocks.clear();

    let handle = scene.get::<PathfindingAgentComponent>(walker).unwrap().agent_handle;
    mocks.pathfinding.borrow_mut().fire_agent_motion(handle, Vec3::Z);
    scene.tick(DT).unwrap();

    let ghost = ghost_of(&scene, walker);
    assert_eq!(mocks.sync_calls(), vec![Call::PhysicsPosition(ghost, Vec3::Z)]);
}

#[test]
fn test_agent_without_crowd_stays_unplaced() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let entity = placed(&mut scene, Vec3::ZERO);
    scene.assign(entity, PathfindingAgentComponent::default());
    scene.tick(DT).unwrap();

    assert!(!scene.get::<PathfindingAgentComponent>(entity).unwrap().agent_handle.valid());
    assert_eq!(mocks.pathfinding.borrow().agent_count(), 0);
}

// ============================================================================
// Hierarchy
// ============================================================================

#[test]
fn test_parent_and_children_stay_reciprocal() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let parent = placed(&mut scene, Vec3::ZERO);
    let other = placed(&mut scene, Vec3::ZERO);
    let child = placed(&mut scene, Vec3::ZERO);

    scene.entity(child).set_parent(parent);
    assert_eq!(scene.parent(child), Some(parent));
    assert_eq!(scene.children(parent), vec![child]);

    scene.assign(child, ParentComponent::new(other));
    assert_eq!(scene.parent(child), Some(other));
    assert!(scene.children(parent).is_empty());
    assert_eq!(scene.children(other), vec![child]);

    scene.assign(other, ChildrenComponent::new());
    assert_eq!(scene.parent(child), None);

    scene.assign(parent, [child, other].into_iter().collect::<ChildrenComponent>());
    assert_eq!(scene.parent(child), Some(parent));
    assert_eq!(scene.parent(other), Some(parent));
}

#[test]
fn test_cycle_rejected() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let root = placed(&mut scene, Vec3::ZERO);
    let leaf = placed(&mut scene, Vec3::ZERO);
    scene.set_parent(leaf, root).unwrap();

    assert!(matches!(
        scene.set_parent(root, leaf),
        Err(SceneError::HierarchyCycle { .. })
    ));
    assert!(scene.set_parent(root, root).is_err());
    assert_eq!(scene.parent(root), None);
}

#[test]
fn test_destroy_cascades_to_children() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let root = placed(&mut scene, Vec3::ZERO);
    let child = with_body(&mut scene, Vec3::ZERO);
    let grandchild = placed(&mut scene, Vec3::ZERO);
    scene.set_parent(child, root).unwrap();
    scene.set_parent(grandchild, child).unwrap();

    let sibling = placed(&mut scene, Vec3::ZERO);
    scene.set_parent(sibling, root).unwrap();
    scene.clear_parent(sibling);

    scene.destroy_entity(root);

    assert!(!scene.valid(child));
    assert!(!scene.valid(grandchild));
    assert!(scene.valid(sibling));
    assert_eq!(mocks.physics.borrow().body_count(), 0);
}

#[test]
fn test_destroying_child_updates_parent() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let root = placed(&mut scene, Vec3::ZERO);
    let child = placed(&mut scene, Vec3::ZERO);
    scene.set_parent(child, root).unwrap();

    scene.entity(child).destroy();
    assert!(scene.valid(root));
    assert!(scene.children(root).is_empty());
}

#[test]
fn test_children_follow_parent_transform() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let root = placed(&mut scene, Vec3::ZERO);
    let child = placed(&mut scene, Vec3::ZERO);
    let grandchild = with_body(&mut scene, Vec3::ZERO);
    scene.set_parent(child, root).unwrap();
    scene.set_parent(grandchild, child).unwrap();
    scene.tick(DT).unwrap();
    mocks.clear();

    scene.entity(root).set_position(Vec3::Z);
    scene.tick(DT).unwrap();

    assert_eq!(scene.get::<PositionComponent>(grandchild).unwrap().position, Vec3::Z);
    let object = body_of(&scene, grandchild);
    assert!(mocks.calls().contains(&Call::PhysicsPosition(object, Vec3::Z)));
}

// ============================================================================
// Scripts and ticking
// ============================================================================

#[test]
fn test_attach_script_initializes() {
    let mocks = Mocks::new();
    mocks.scripting.borrow_mut().add_module("game", &["Player"]);
    let mut scene = mocks.scene();
    let entity = scene.create_entity();

    scene.attach_script(entity, "game", "Player").unwrap();

    let script = scene.get::<ScriptObjectComponent>(entity).unwrap();
    assert!(script.script_object_handle.valid());
    assert!(mocks
        .calls()
        .contains(&Call::Execute(script.script_object_handle, INITIALIZE.to_owned())));

    assert!(matches!(
        scene.attach_script(entity, "missing", "Player"),
        Err(SceneError::Script(_))
    ));
    assert!(matches!(
        scene.attach_script(entity, "game", "Enemy"),
        Err(SceneError::Script(_))
    ));
}

#[test]
fn test_failed_initialize_attaches_nothing() {
    let mocks = Mocks::new();
    mocks.scripting.borrow_mut().add_module("game", &["Player"]);
    mocks.scripting.borrow_mut().fail_on(INITIALIZE);
    let mut scene = mocks.scene();
    let entity = scene.create_entity();

    assert!(scene.attach_script(entity, "game", "Player").is_err());
    assert!(!scene.has::<ScriptObjectComponent>(entity));
    assert_eq!(mocks.scripting.borrow().object_count(), 0);
}

#[test]
fn test_tick_order() {
    let mocks = Mocks::new();
    mocks.scripting.borrow_mut().add_module("game", &["Level", "Player"]);
    let mut scene = mocks.scene();
    scene.attach_scene_script("game", "Level").unwrap();
    let entity = scene.create_entity();
    scene.attach_script(entity, "game", "Player").unwrap();
    mocks.clear();

    scene.tick(DT).unwrap();

    let level = scene.scene_script().unwrap();
    let player = scene.get::<ScriptObjectComponent>(entity).unwrap().script_object_handle;
    let calls = mocks.calls();
    assert_eq!(calls[0], Call::Execute(level, PRE_TICK.to_owned()));
    assert_eq!(calls[1], Call::AudioTick);
    assert_eq!(calls[2], Call::PhysicsTick);
    assert_eq!(calls[3], Call::PathfindingTick);
    assert_eq!(calls[4], Call::Execute(player, TICK.to_owned()));
    assert_eq!(calls[5], Call::Execute(level, POST_TICK.to_owned()));
}

#[test]
fn test_script_error_aborts_tick() {
    let mocks = Mocks::new();
    mocks.scripting.borrow_mut().add_module("game", &["Level", "Player"]);
    let mut scene = mocks.scene();
    scene.attach_scene_script("game", "Level").unwrap();
    let entity = with_body(&mut scene, Vec3::ZERO);
    scene.attach_script(entity, "game", "Player").unwrap();
    mocks.scripting.borrow_mut().fail_on(TICK);

    let error = scene.tick(DT).unwrap_err();
    assert!(matches!(error, SceneError::Script(_)));
    assert_eq!(mocks.count(|c| matches!(c, Call::Execute(_, m) if m == POST_TICK)), 0);
    assert!(scene.has::<crate::ecs::DirtyComponent>(entity));
}

#[test]
fn test_inactive_scene_skips_engines_and_scripts() {
    let mocks = Mocks::new();
    mocks.scripting.borrow_mut().add_module("game", &["Level"]);
    let mut scene = mocks.scene();
    scene.attach_scene_script("game", "Level").unwrap();
    scene.set_active(false);
    mocks.clear();

    let entity = with_body(&mut scene, Vec3::ZERO);
    scene.tick(DT).unwrap();

    assert_eq!(mocks.count(Call::is_tick), 0);
    assert_eq!(mocks.count(|c| matches!(c, Call::Execute(..))), 0);
    assert!(!scene.has::<crate::ecs::DirtyComponent>(entity));
}

#[test]
fn test_async_commands_apply_on_tick() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let doomed = placed(&mut scene, Vec3::ZERO);

    let commands = scene.commands();
    let future = std::thread::spawn(move || {
        commands.destroy_entity(doomed);
        commands.create_entity()
    })
    .join()
    .unwrap();
    assert!(!future.is_ready());
    assert!(scene.valid(doomed));

    scene.tick(DT).unwrap();

    let created = future.try_get().unwrap();
    assert!(scene.valid(created));
    assert!(!scene.valid(doomed));
}

#[test]
fn test_dropped_scene_abandons_futures() {
    let mocks = Mocks::new();
    let scene = mocks.scene();
    let future = scene.create_entity_async();
    drop(scene);
    assert!(future.is_ready());
    assert_eq!(future.wait(), None);
}

// ============================================================================
// Animation
// ============================================================================

#[test]
fn test_pose_computed_and_uploaded_on_render() {
    let mocks = Mocks::new();
    let (skeleton, clip) = {
        let mut resources = mocks.resources.borrow_mut();
        let mut skeleton = Skeleton::new();
        let root = skeleton.add_bone(Bone::new("root"), None);
        skeleton.add_bone(Bone::new("arm").with_translation(Vec3::Y), Some(root));
        let mut clip = AnimationClip::new("wave");
        clip.duration = 1.0;
        (
            resources.add_skeleton("rig", skeleton),
            resources.add_animation("wave", clip),
        )
    };

    let mut scene = mocks.scene();
    let entity = placed(&mut scene, Vec3::ZERO);
    scene
        .entity(entity)
        .assign(GraphicsComponent::new(MESH, TextureHandle::INVALID))
        .assign(SkeletonComponent {
            skeleton_handle: skeleton,
        })
        .assign(AnimationComponent::new(clip));

    let bones = scene.get::<AnimationComponent>(entity).unwrap().bones_handle;
    assert!(bones.valid());

    scene.tick(DT).unwrap();
    assert_eq!(mocks.count(|c| matches!(c, Call::UpdateBones(..))), 0);

    scene.render();
    assert!(mocks.calls().contains(&Call::UpdateBones(bones, 2)));
    assert_eq!(mocks.graphics.borrow().bones(bones).map(<[_]>::len), Some(2));

    scene.tick(DT).unwrap();
    let animation = scene.get::<AnimationComponent>(entity).unwrap();
    assert!((animation.running_time - 2.0 * DT).abs() < 1e-6);
}

#[test]
fn test_animation_bones_follow_graphics() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let entity = placed(&mut scene, Vec3::ZERO);
    scene.assign(entity, GraphicsComponent::new(MESH, TextureHandle::INVALID));
    scene.assign(entity, AnimationComponent::new(AnimationHandle::INVALID));
    let renderable = scene.get::<GraphicsComponent>(entity).unwrap().renderable_handle;
    let bones = scene.get::<AnimationComponent>(entity).unwrap().bones_handle;
    assert!(mocks.calls().contains(&Call::AttachBones(renderable, bones)));

    scene.destroy_entity(entity);
    let calls = mocks.calls();
    let detach = calls.iter().position(|c| *c == Call::DetachBones(renderable));
    let destroy = calls.iter().position(|c| *c == Call::DestroyRenderable(renderable));
    assert!(detach.unwrap() < destroy.unwrap());
}

// ============================================================================
// Serialization
// ============================================================================

fn saved_scene(mocks: &Mocks) -> SerializedScene {
    mocks.resources.borrow_mut().register("crate", MeshHandle::new(3, 1));
    mocks.resources.borrow_mut().register("box", CollisionShapeHandle::new(1, 1));
    mocks.scripting.borrow_mut().add_module("game", &["Crate"]);

    let mut scene = Scene::new(mocks.engines(), SceneConfig::default().with_name("yard"));
    let root = placed(&mut scene, Vec3::new(1.0, 0.0, 0.0));
    scene
        .entity(root)
        .assign(GraphicsComponent::new(MeshHandle::new(3, 1), TextureHandle::INVALID))
        .assign(RigidBodyObjectComponent::new(CollisionShapeHandle::new(1, 1)));
    scene.attach_script(root, "game", "Crate").unwrap();

    let child = placed(&mut scene, Vec3::new(1.0, 0.0, 0.0));
    let mut properties = PropertiesComponent::default();
    properties.set("label", "lid");
    scene.assign(child, properties);
    scene.set_parent(child, root).unwrap();
    scene.tick(DT).unwrap();

    scene.serialize().unwrap()
}

#[test]
fn test_serialize_records_names() {
    let mocks = Mocks::new();
    let saved = saved_scene(&mocks);

    assert_eq!(saved.name, "yard");
    assert_eq!(saved.version, FORMAT_VERSION);
    assert_eq!(saved.entity_count(), 2);
    assert_eq!(
        saved.resources[&crate::assets::ResourceKind::Mesh][&MeshHandle::new(3, 1).id()],
        "crate"
    );
    let root = saved.entities.iter().find(|e| e.graphics.is_some()).unwrap();
    assert_eq!(root.children.len(), 1);
    assert_eq!(
        root.script,
        Some(SerializedScript {
            module: "game".to_owned(),
            type_name: "Crate".to_owned(),
        })
    );
}

#[test]
fn test_unnamed_resource_rejected() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let entity = placed(&mut scene, Vec3::ZERO);
    scene.assign(entity, GraphicsComponent::new(MESH, TextureHandle::INVALID));

    assert!(matches!(
        scene.serialize(),
        Err(SceneError::UnnamedResource { .. })
    ));
}

#[test]
fn test_deserialize_remaps_by_name() {
    let saved = saved_scene(&Mocks::new());
    let text = saved.to_ron_string().unwrap();

    // A later run loaded the same assets under other handles.
    let mocks = Mocks::new();
    mocks.resources.borrow_mut().register("crate", MeshHandle::new(7, 2));
    mocks.resources.borrow_mut().register("box", CollisionShapeHandle::new(4, 4));
    mocks.scripting.borrow_mut().add_module("game", &["Crate"]);
    let mut scene = mocks.scene();

    scene.deserialize(&SerializedScene::from_ron_str(&text).unwrap()).unwrap();
    assert_eq!(scene.name(), "yard");
    assert_eq!(scene.entity_count(), 2);

    let root = scene
        .ecs()
        .entities_with::<&GraphicsComponent>()
        .into_iter()
        .next()
        .unwrap();
    let graphics = scene.get::<GraphicsComponent>(root).unwrap();
    assert_eq!(graphics.mesh_handle, MeshHandle::new(7, 2));
    assert!(!graphics.renderable_handle.valid());
    let body = scene.get::<RigidBodyObjectComponent>(root).unwrap();
    assert_eq!(body.collision_shape_handle, CollisionShapeHandle::new(4, 4));

    let script = scene.get::<ScriptObjectComponent>(root).unwrap();
    assert!(mocks
        .calls()
        .contains(&Call::Execute(script.script_object_handle, DESERIALIZE.to_owned())));

    let child = scene.children(root)[0];
    assert_eq!(scene.parent(child), Some(root));
    assert_eq!(
        scene.get::<PropertiesComponent>(child).unwrap().get("label"),
        Some("lid")
    );

    scene.tick(DT).unwrap();
    let graphics = scene.get::<GraphicsComponent>(root).unwrap();
    assert!(graphics.renderable_handle.valid());
    assert!(mocks.calls().iter().any(|c| matches!(
        c,
        Call::CreateRenderable { mesh, position, .. }
            if *mesh == MeshHandle::new(7, 2) && *position == Vec3::new(1.0, 0.0, 0.0)
    )));
    assert_eq!(mocks.physics.borrow().body_count(), 1);
}

#[test]
fn test_deserialize_json_round_trip() {
    let saved = saved_scene(&Mocks::new());
    let text = saved.to_json_string().unwrap();
    assert_eq!(SerializedScene::from_json_str(&text).unwrap(), saved);
}

#[test]
fn test_deserialize_missing_asset_keeps_scene() {
    let saved = saved_scene(&Mocks::new());

    let mocks = Mocks::new();
    mocks.resources.borrow_mut().register("box", CollisionShapeHandle::new(4, 4));
    let mut scene = mocks.scene();
    let kept = placed(&mut scene, Vec3::ZERO);

    assert!(matches!(
        scene.deserialize(&saved),
        Err(SceneError::MissingResource { .. })
    ));
    assert_eq!(scene.entity_count(), 1);
    assert!(scene.valid(kept));
    assert_ne!(scene.name(), "yard");
}

#[test]
fn test_deserialize_missing_script_leaves_scene_empty() {
    let saved = saved_scene(&Mocks::new());

    let mocks = Mocks::new();
    mocks.resources.borrow_mut().register("crate", MeshHandle::new(7, 2));
    mocks.resources.borrow_mut().register("box", CollisionShapeHandle::new(4, 4));
    let mut scene = mocks.scene();
    placed(&mut scene, Vec3::ZERO);

    assert!(matches!(scene.deserialize(&saved), Err(SceneError::Script(_))));
    assert_eq!(scene.entity_count(), 0);
    assert_eq!(mocks.physics.borrow().body_count(), 0);
}

#[test]
fn test_deserialize_rejects_dangling_parent() {
    let mocks = Mocks::new();
    let mut scene = mocks.scene();
    let data = SerializedScene {
        name: "broken".to_owned(),
        version: FORMAT_VERSION,
        entities: vec![SerializedEntity {
            id: 1,
            parent: Some(99),
            ..SerializedEntity::default()
        }],
        resources: ResourceNames::new(),
    };

    assert!(matches!(
        scene.deserialize(&data),
        Err(SceneError::UnknownEntity(99))
    ));
    assert!(matches!(
        scene.deserialize(&SerializedScene { version: 9, ..data }),
        Err(SceneError::UnsupportedVersion(9))
    ));
}

#[test]
fn test_deserialize_recreates_crowds_before_agents() {
    let mocks = Mocks::new();
    let saved = {
        mocks.resources.borrow_mut().register("floor", NavigationMeshHandle::new(0, 1));
        let mut scene = mocks.scene();
        let crowd = crowd(&mut scene);
        agent(&mut scene, crowd, Vec3::X);
        scene.tick(DT).unwrap();
        scene.serialize().unwrap()
    };

    let mut scene = mocks.scene();
    scene.deserialize(&saved).unwrap();

    let walker = scene
        .ecs()
        .entities_with::<&PathfindingAgentComponent>()
        .into_iter()
        .next()
        .unwrap();
    let agent = scene.get::<PathfindingAgentComponent>(walker).unwrap();
    assert!(mocks.pathfinding.borrow().crowd_count() >= 1);
    assert!(agent.crowd_handle.valid());
    assert_eq!(agent.agent_state, AgentState::Invalid);

    scene.tick(DT).unwrap();
    assert!(scene.get::<PathfindingAgentComponent>(walker).unwrap().agent_handle.valid());
}
