//! Assign/release hooks for scene components
//!
//! Components that stand for an engine resource create that resource when
//! they are assigned and destroy it when they are removed, replaced, or their
//! entity is destroyed.

use hecs::Entity;

use super::Scene;
use crate::ecs::{
    AnimationComponent, ChildrenComponent, DirtyFlags, EcsComponent, GhostObjectComponent,
    GraphicsComponent, GraphicsTerrainComponent, OrientationComponent, ParentComponent,
    PathfindingAgentComponent, PathfindingCrowdComponent, PointLightComponent, PositionComponent,
    PropertiesComponent, RigidBodyObjectComponent, ScriptObjectComponent, SkeletonComponent,
};
use crate::handles::Handle;

/// A component the scene knows how to keep in step with the engines.
pub trait SceneComponent: EcsComponent + Sized {
    /// Flags raised on the entity once the component is written.
    const DIRTY: DirtyFlags = DirtyFlags::NONE;

    /// Write the component onto `entity`.
    ///
    /// The resource of a replaced component is destroyed first, unless the
    /// new component carries the same resource. Afterwards any resource the
    /// new component still lacks is created at the entity's current
    /// transform, and [`DIRTY`](Self::DIRTY) is raised.
    ///
    /// # Panics
    ///
    /// If the entity is dead or lacks a component this kind requires.
    #[track_caller]
    fn assign(self, entity: Entity, scene: &mut Scene) {
        scene.replace_component(entity, self);
        Self::bind(entity, scene);
        if !Self::DIRTY.is_empty() {
            scene.raise_dirty(entity, Self::DIRTY);
        }
    }

    /// Create the engine resource of the stored component if it has none.
    fn bind(_entity: Entity, _scene: &mut Scene) {}

    /// Destroy the engine resource of a component leaving `entity`, and
    /// invalidate its handle.
    fn release(&mut self, _entity: Entity, _scene: &mut Scene) {}

    /// Raw id of the live engine resource, if there is one.
    fn resource_id(&self) -> Option<u64> {
        None
    }
}

fn live<T>(handle: Handle<T>) -> Option<u64> {
    handle.valid().then(|| handle.id())
}

impl SceneComponent for PositionComponent {
    const DIRTY: DirtyFlags = DirtyFlags::SOURCE_SCRIPT.union(DirtyFlags::POSITION);
}

impl SceneComponent for OrientationComponent {
    const DIRTY: DirtyFlags = DirtyFlags::SOURCE_SCRIPT.union(DirtyFlags::ORIENTATION);
}

impl SceneComponent for SkeletonComponent {}

impl SceneComponent for PropertiesComponent {}

// ============================================================================
// Graphics
// ============================================================================

impl SceneComponent for GraphicsComponent {
    fn bind(entity: Entity, scene: &mut Scene) {
        let Some(graphics) = scene.ecs.get_cloned::<Self>(entity) else {
            return;
        };
        if graphics.renderable_handle.valid() {
            return;
        }
        let (position, orientation) = scene.transform(entity);
        let renderable = scene.engines.graphics.borrow_mut().create_renderable(
            scene.render_scene,
            graphics.mesh_handle,
            graphics.texture_handle,
            position,
            orientation,
            graphics.scale,
        );
        log::debug!("{entity:?}: created renderable {renderable:?}");
        if let Some(mut graphics) = scene.ecs.get_mut::<Self>(entity) {
            graphics.renderable_handle = renderable;
        }
    }

    fn release(&mut self, entity: Entity, scene: &mut Scene) {
        if self.renderable_handle.valid() {
            log::debug!("{entity:?}: destroying renderable {:?}", self.renderable_handle);
            scene
                .engines
                .graphics
                .borrow_mut()
                .destroy_renderable(scene.render_scene, self.renderable_handle.take());
        }
    }

    fn resource_id(&self) -> Option<u64> {
        live(self.renderable_handle)
    }
}

impl SceneComponent for PointLightComponent {
    fn bind(entity: Entity, scene: &mut Scene) {
        let Some(light) = scene.ecs.get_cloned::<Self>(entity) else {
            return;
        };
        if light.point_light_handle.valid() {
            return;
        }
        let (position, _) = scene.transform(entity);
        let handle = scene
            .engines
            .graphics
            .borrow_mut()
            .create_point_light(scene.render_scene, position);
        if let Some(mut light) = scene.ecs.get_mut::<Self>(entity) {
            light.point_light_handle = handle;
        }
    }

    fn release(&mut self, _entity: Entity, scene: &mut Scene) {
        if self.point_light_handle.valid() {
            scene
                .engines
                .graphics
                .borrow_mut()
                .destroy_point_light(scene.render_scene, self.point_light_handle.take());
        }
    }

    fn resource_id(&self) -> Option<u64> {
        live(self.point_light_handle)
    }
}

impl SceneComponent for GraphicsTerrainComponent {
    fn bind(entity: Entity, scene: &mut Scene) {
        let Some(terrain) = scene.ecs.get_cloned::<Self>(entity) else {
            return;
        };
        if terrain.terrain_renderable_handle.valid() {
            return;
        }
        let handle = scene
            .engines
            .graphics
            .borrow_mut()
            .create_terrain_renderable(scene.render_scene, terrain.terrain_handle);
        if let Some(mut terrain) = scene.ecs.get_mut::<Self>(entity) {
            terrain.terrain_renderable_handle = handle;
        }
    }

    fn release(&mut self, _entity: Entity, scene: &mut Scene) {
        if self.terrain_renderable_handle.valid() {
            scene
                .engines
                .graphics
                .borrow_mut()
                .destroy_terrain_renderable(scene.render_scene, self.terrain_renderable_handle.take());
        }
    }

    fn resource_id(&self) -> Option<u64> {
        live(self.terrain_renderable_handle)
    }
}

/// Bones are sized by [`SceneConfig::max_bones`] and attached to the
/// entity's renderable; without a live renderable they wait for the next
/// bind.
///
/// [`SceneConfig::max_bones`]: super::SceneConfig::max_bones
impl SceneComponent for AnimationComponent {
    fn bind(entity: Entity, scene: &mut Scene) {
        let Some(bones) = scene.ecs.get::<Self>(entity).map(|a| a.bones_handle) else {
            return;
        };
        let renderable = scene
            .ecs
            .get::<GraphicsComponent>(entity)
            .map_or(Handle::INVALID, |g| g.renderable_handle);
        if bones.valid() || !renderable.valid() {
            return;
        }

        let bones = {
            let mut graphics = scene.engines.graphics.borrow_mut();
            let bones = graphics.create_bones(scene.render_scene, scene.config.max_bones);
            graphics.attach_bones(scene.render_scene, renderable, bones);
            bones
        };
        log::debug!("{entity:?}: attached bones {bones:?}");
        if let Some(mut animation) = scene.ecs.get_mut::<Self>(entity) {
            animation.bones_handle = bones;
        }
    }

    fn release(&mut self, entity: Entity, scene: &mut Scene) {
        if !self.bones_handle.valid() {
            return;
        }
        let renderable = scene
            .ecs
            .get::<GraphicsComponent>(entity)
            .map(|g| g.renderable_handle)
            .filter(Handle::valid);
        let mut graphics = scene.engines.graphics.borrow_mut();
        if let Some(renderable) = renderable {
            graphics.detach_bones(scene.render_scene, renderable);
        }
        graphics.destroy_bones(scene.render_scene, self.bones_handle.take());
    }

    fn resource_id(&self) -> Option<u64> {
        live(self.bones_handle)
    }
}

// ============================================================================
// Physics
// ============================================================================

impl SceneComponent for RigidBodyObjectComponent {
    const DIRTY: DirtyFlags = DirtyFlags::SOURCE_SCRIPT.union(DirtyFlags::RIGID_BODY_OBJECT);

    fn bind(entity: Entity, scene: &mut Scene) {
        let Some(body) = scene.ecs.get_cloned::<Self>(entity) else {
            return;
        };
        if body.rigid_body_object_handle.valid() {
            return;
        }
        let (position, orientation) = scene.transform(entity);
        let handle = scene.engines.physics.borrow_mut().create_rigid_body_object(
            scene.physics_scene,
            body.collision_shape_handle,
            position,
            orientation,
            body.desc(),
        );
        log::debug!("{entity:?}: created rigid body {handle:?}");
        if let Some(mut body) = scene.ecs.get_mut::<Self>(entity) {
            body.rigid_body_object_handle = handle;
        }
    }

    fn release(&mut self, entity: Entity, scene: &mut Scene) {
        if self.rigid_body_object_handle.valid() {
            log::debug!("{entity:?}: destroying rigid body {:?}", self.rigid_body_object_handle);
            scene
                .engines
                .physics
                .borrow_mut()
                .destroy_rigid_body_object(scene.physics_scene, self.rigid_body_object_handle.take());
        }
    }

    fn resource_id(&self) -> Option<u64> {
        live(self.rigid_body_object_handle)
    }
}

impl SceneComponent for GhostObjectComponent {
    const DIRTY: DirtyFlags = DirtyFlags::SOURCE_SCRIPT.union(DirtyFlags::GHOST_OBJECT);

    fn bind(entity: Entity, scene: &mut Scene) {
        let Some(ghost) = scene.ecs.get_cloned::<Self>(entity) else {
            return;
        };
        if ghost.ghost_object_handle.valid() {
            return;
        }
        let (position, orientation) = scene.transform(entity);
        let handle = scene.engines.physics.borrow_mut().create_ghost_object(
            scene.physics_scene,
            ghost.collision_shape_handle,
            position,
            orientation,
        );
        if let Some(mut ghost) = scene.ecs.get_mut::<Self>(entity) {
            ghost.ghost_object_handle = handle;
        }
    }

    fn release(&mut self, _entity: Entity, scene: &mut Scene) {
        if self.ghost_object_handle.valid() {
            scene
                .engines
                .physics
                .borrow_mut()
                .destroy_ghost_object(scene.physics_scene, self.ghost_object_handle.take());
        }
    }

    fn resource_id(&self) -> Option<u64> {
        live(self.ghost_object_handle)
    }
}

// ============================================================================
// Pathfinding
// ============================================================================

impl SceneComponent for PathfindingCrowdComponent {
    fn bind(entity: Entity, scene: &mut Scene) {
        let Some(crowd) = scene.ecs.get_cloned::<Self>(entity) else {
            return;
        };
        if crowd.crowd_handle.valid() {
            return;
        }
        let handle = scene.engines.pathfinding.borrow_mut().create_crowd(
            scene.pathfinding_scene,
            crowd.navigation_mesh_handle,
            &crowd.crowd_config,
        );
        log::debug!("{entity:?}: created crowd {handle:?}");
        if let Some(mut crowd) = scene.ecs.get_mut::<Self>(entity) {
            crowd.crowd_handle = handle;
        }
    }

    fn release(&mut self, _entity: Entity, scene: &mut Scene) {
        if self.crowd_handle.valid() {
            scene
                .engines
                .pathfinding
                .borrow_mut()
                .destroy_crowd(scene.pathfinding_scene, self.crowd_handle.take());
        }
    }

    fn resource_id(&self) -> Option<u64> {
        live(self.crowd_handle)
    }
}

/// The agent is created in the crowd named by `crowd_handle`; an agent
/// without a live crowd stays unplaced.
impl SceneComponent for PathfindingAgentComponent {
    const DIRTY: DirtyFlags = DirtyFlags::SOURCE_SCRIPT.union(DirtyFlags::PATHFINDING_AGENT);

    fn bind(entity: Entity, scene: &mut Scene) {
        let Some(agent) = scene.ecs.get_cloned::<Self>(entity) else {
            return;
        };
        if agent.agent_handle.valid() {
            return;
        }
        if !agent.crowd_handle.valid() {
            log::warn!("{entity:?}: agent has no crowd, not placed");
            return;
        }
        let (position, _) = scene.transform(entity);
        let handle = scene.engines.pathfinding.borrow_mut().create_agent(
            scene.pathfinding_scene,
            agent.crowd_handle,
            position,
            &agent.agent_params,
        );
        log::debug!("{entity:?}: created agent {handle:?}");
        if let Some(mut agent) = scene.ecs.get_mut::<Self>(entity) {
            agent.agent_handle = handle;
        }
    }

    fn release(&mut self, _entity: Entity, scene: &mut Scene) {
        if self.agent_handle.valid() {
            scene.engines.pathfinding.borrow_mut().destroy_agent(
                scene.pathfinding_scene,
                self.crowd_handle,
                self.agent_handle.take(),
            );
        }
    }

    fn resource_id(&self) -> Option<u64> {
        live(self.agent_handle)
    }
}

// ============================================================================
// Scripting
// ============================================================================

/// Assigning only stores the component; use [`Scene::attach_script`] to
/// create and initialize the object.
impl SceneComponent for ScriptObjectComponent {
    fn release(&mut self, entity: Entity, scene: &mut Scene) {
        if self.script_object_handle.valid() {
            log::debug!("{entity:?}: releasing script object {}::{}", self.module, self.type_name);
            scene
                .engines
                .scripting
                .borrow_mut()
                .release_script_object(self.script_object_handle.take());
        }
    }

    fn resource_id(&self) -> Option<u64> {
        live(self.script_object_handle)
    }
}

// ============================================================================
// Hierarchy
// ============================================================================

/// Routed through [`Scene::set_parent`], which keeps the parent's
/// [`ChildrenComponent`] in step.
impl SceneComponent for ParentComponent {
    #[track_caller]
    fn assign(self, entity: Entity, scene: &mut Scene) {
        if let Err(error) = scene.set_parent(entity, self.entity) {
            panic!("cannot assign ParentComponent: {error}");
        }
    }

    fn release(&mut self, entity: Entity, scene: &mut Scene) {
        if let Some(mut children) = scene.ecs.get_mut::<ChildrenComponent>(self.entity) {
            children.remove(entity);
        }
    }
}

/// Makes exactly the listed entities children of the entity. Children not
/// listed any more are detached.
impl SceneComponent for ChildrenComponent {
    #[track_caller]
    fn assign(self, entity: Entity, scene: &mut Scene) {
        for previous in scene.children(entity) {
            if !self.contains(previous) {
                scene.clear_parent(previous);
            }
        }
        for child in self.iter() {
            if let Err(error) = scene.set_parent(child, entity) {
                panic!("cannot assign ChildrenComponent: {error}");
            }
        }
    }

    fn release(&mut self, entity: Entity, scene: &mut Scene) {
        for child in self.iter() {
            if scene.parent(child) == Some(entity) {
                scene.ecs.remove::<ParentComponent>(child);
            }
        }
    }
}
