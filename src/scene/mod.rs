//! Scenes
//!
//! A [`Scene`] owns an entity world plus one scene in each engine, and keeps
//! the two in step. Components are written through [`Scene::assign`] (or
//! [`EntityMut::assign`]), which creates the matching engine resources and
//! records what changed in a [`DirtyComponent`](crate::ecs::DirtyComponent).
//! [`Scene::tick`] ticks the engines, feeds their changes back into the
//! components, and reconciles every dirty entity exactly once.
//!
//! # Example
//!
//! ```ignore
//! let mut scene = Scene::new(Engines::headless(), SceneConfig::default());
//! let entity = scene.create_entity();
//! scene
//!     .entity(entity)
//!     .assign(PositionComponent::new(Vec3::ZERO))
//!     .assign(OrientationComponent::default())
//!     .assign(RigidBodyObjectComponent::new(shape));
//! scene.tick(1.0 / 60.0)?;
//! ```

mod commands;
mod component;
mod config;
mod entity;
mod error;
mod hierarchy;
mod normalize;
mod script;
mod serialize;
mod sync;
mod tick;

#[cfg(test)]
mod tests;

use crossbeam_channel::{Receiver, Sender, unbounded};
use glam::{Quat, Vec3};
use hecs::Entity;

use crate::animation::AnimationPipeline;
use crate::ecs::{
    AnimationComponent, ChildrenComponent, DirtyComponent, DirtyFlags, EcsComponent, EcsEvent,
    EntityComponentSystem, GhostObjectComponent, GraphicsComponent, GraphicsTerrainComponent,
    OrientationComponent, PathfindingAgentComponent, PathfindingCrowdComponent,
    PointLightComponent, PositionComponent, RigidBodyObjectComponent, ScriptObjectComponent,
};
use crate::engines::Engines;
use crate::engines::audio::AudioSceneHandle;
use crate::engines::graphics::RenderSceneHandle;
use crate::engines::pathfinding::PathfindingSceneHandle;
use crate::engines::physics::{PhysicsSceneHandle, Ray, RaycastHit};
use crate::engines::scripting::ExecutionContextHandle;

pub use commands::{EntityFuture, SceneCommands};
pub use component::SceneComponent;
pub use config::SceneConfig;
pub use entity::EntityMut;
pub use error::SceneError;
pub use normalize::HandleRemap;
pub use script::OwnedScriptObject;
pub use serialize::{
    FORMAT_VERSION, ResourceNames, SerializedEntity, SerializedScene, SerializedScript,
};
pub use sync::SyncEvent;

use commands::SceneCommand;

/// An entity world synchronized with a scene in every engine.
pub struct Scene {
    config: SceneConfig,
    engines: Engines,
    ecs: EntityComponentSystem,

    render_scene: RenderSceneHandle,
    physics_scene: PhysicsSceneHandle,
    pathfinding_scene: PathfindingSceneHandle,
    audio_scene: AudioSceneHandle,
    execution_context: ExecutionContextHandle,
    script_object: Option<OwnedScriptObject>,

    /// Engine listeners push here; drained on the control thread
    sync_tx: Sender<SyncEvent>,
    sync_rx: Receiver<SyncEvent>,
    commands_tx: Sender<SceneCommand>,
    commands_rx: Receiver<SceneCommand>,
    animation: AnimationPipeline,
}

impl Scene {
    /// Create a scene, with a fresh scene in each engine.
    #[must_use]
    pub fn new(engines: Engines, config: SceneConfig) -> Self {
        let render_scene = engines.graphics.borrow_mut().create_render_scene();
        let physics_scene = engines.physics.borrow_mut().create_physics_scene();
        let pathfinding_scene = engines.pathfinding.borrow_mut().create_pathfinding_scene();
        let audio_scene = engines.audio.borrow_mut().create_audio_scene();
        let execution_context = engines.scripting.borrow_mut().create_execution_context();

        let (sync_tx, sync_rx) = unbounded();
        let (commands_tx, commands_rx) = unbounded();
        log::info!("created scene '{}'", config.name);

        Self {
            config,
            engines,
            ecs: EntityComponentSystem::new(),
            render_scene,
            physics_scene,
            pathfinding_scene,
            audio_scene,
            execution_context,
            script_object: None,
            sync_tx,
            sync_rx,
            commands_tx,
            commands_rx,
            animation: AnimationPipeline::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    #[must_use]
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.config.active
    }

    /// An inactive scene still applies queued changes on tick but does not
    /// run scripts, engines or animation.
    pub fn set_active(&mut self, active: bool) {
        self.config.active = active;
    }

    #[must_use]
    pub fn engines(&self) -> &Engines {
        &self.engines
    }

    /// Read-only view of the entity storage.
    #[must_use]
    pub fn ecs(&self) -> &EntityComponentSystem {
        &self.ecs
    }

    /// Receive every structural change of the entity storage.
    pub fn subscribe(&mut self) -> Receiver<EcsEvent> {
        self.ecs.subscribe()
    }

    #[must_use]
    pub fn render_scene(&self) -> RenderSceneHandle {
        self.render_scene
    }

    #[must_use]
    pub fn physics_scene(&self) -> PhysicsSceneHandle {
        self.physics_scene
    }

    #[must_use]
    pub fn pathfinding_scene(&self) -> PathfindingSceneHandle {
        self.pathfinding_scene
    }

    #[must_use]
    pub fn audio_scene(&self) -> AudioSceneHandle {
        self.audio_scene
    }

    #[must_use]
    pub fn execution_context(&self) -> ExecutionContextHandle {
        self.execution_context
    }

    // ========================================================================
    // Entities
    // ========================================================================

    pub fn create_entity(&mut self) -> Entity {
        let entity = self.ecs.create_entity();
        log::trace!("created {entity:?}");
        entity
    }

    /// Mutable view of `entity` for chained assignment.
    pub fn entity(&mut self, entity: Entity) -> EntityMut<'_> {
        EntityMut::new(self, entity)
    }

    #[must_use]
    pub fn valid(&self, entity: Entity) -> bool {
        self.ecs.valid(entity)
    }

    #[must_use]
    pub fn entity_count(&self) -> u32 {
        self.ecs.len()
    }

    /// Destroy `entity`, its descendants, and every engine resource they own.
    pub fn destroy_entity(&mut self, entity: Entity) {
        if !self.ecs.valid(entity) {
            log::warn!("destroy of dead entity {entity:?} ignored");
            return;
        }

        if let Some(children) = self.ecs.remove::<ChildrenComponent>(entity) {
            for child in children.iter() {
                if self.ecs.valid(child) {
                    self.destroy_entity(child);
                }
            }
        }
        self.clear_parent(entity);

        // Dependents before what they depend on.
        self.remove::<ScriptObjectComponent>(entity);
        self.remove::<AnimationComponent>(entity);
        self.remove::<GraphicsComponent>(entity);
        self.remove::<PointLightComponent>(entity);
        self.remove::<GraphicsTerrainComponent>(entity);
        self.remove::<RigidBodyObjectComponent>(entity);
        self.remove::<GhostObjectComponent>(entity);
        self.remove::<PathfindingAgentComponent>(entity);
        self.remove::<PathfindingCrowdComponent>(entity);

        self.ecs.destroy_entity(entity);
        log::trace!("destroyed {entity:?}");
    }

    /// Destroy every entity.
    pub fn clear(&mut self) {
        for entity in self.ecs.entities() {
            if self.ecs.valid(entity) {
                self.destroy_entity(entity);
            }
        }
    }

    /// Closest entity hit along `ray`, resolved through the physics object's
    /// user data.
    #[must_use]
    pub fn raycast(&self, ray: Ray) -> Option<(Entity, RaycastHit)> {
        let physics = self.engines.physics.borrow();
        let hit = physics.raycast(self.physics_scene, ray)?;
        let entity = physics
            .user_data(self.physics_scene, hit.object)
            .and_then(Entity::from_bits)
            .filter(|&e| self.ecs.valid(e))?;
        Some((entity, hit))
    }

    // ========================================================================
    // Components
    // ========================================================================

    /// Write `component` onto `entity`, see [`SceneComponent::assign`].
    ///
    /// # Panics
    ///
    /// If the entity is dead or lacks a component this kind requires.
    #[track_caller]
    pub fn assign<C: SceneComponent>(&mut self, entity: Entity, component: C) {
        component.assign(entity, self);
    }

    /// Remove a component, destroying its engine resource.
    ///
    /// The returned component has its resource handle invalidated.
    pub fn remove<C: SceneComponent>(&mut self, entity: Entity) -> Option<C> {
        let mut removed = self.ecs.remove::<C>(entity)?;
        removed.release(entity, self);
        Some(removed)
    }

    /// Copy of a component.
    #[must_use]
    pub fn get<C: EcsComponent + Clone>(&self, entity: Entity) -> Option<C> {
        self.ecs.get_cloned::<C>(entity)
    }

    #[must_use]
    pub fn has<C: EcsComponent>(&self, entity: Entity) -> bool {
        self.ecs.has::<C>(entity)
    }

    /// Request propagation of `flags` on the next reconciliation.
    pub fn raise_dirty(&mut self, entity: Entity, flags: DirtyFlags) {
        if let Some(mut dirty) = self.ecs.get_mut::<DirtyComponent>(entity) {
            dirty.raise(flags);
            return;
        }
        if self.ecs.insert(entity, DirtyComponent::new(flags)).is_err() {
            log::warn!("dirty flags {flags:?} for dead entity {entity:?} dropped");
        }
    }

    /// Raw write used by [`SceneComponent::assign`].
    #[track_caller]
    fn replace_component<C: SceneComponent>(&mut self, entity: Entity, component: C) {
        if let Err(error) = self.ecs.check_dependencies(entity, C::KIND) {
            panic!("cannot assign {:?}: {error}", C::KIND);
        }
        if let Some(mut previous) = self.ecs.remove::<C>(entity) {
            let same_resource = previous
                .resource_id()
                .is_some_and(|id| component.resource_id() == Some(id));
            if !same_resource {
                previous.release(entity, self);
            }
        }
        if let Err(error) = self.ecs.insert(entity, component) {
            panic!("cannot assign {:?}: {error}", C::KIND);
        }
    }

    /// Current position and orientation, identity where absent.
    fn transform(&self, entity: Entity) -> (Vec3, Quat) {
        let position = self
            .ecs
            .get::<PositionComponent>(entity)
            .map_or(Vec3::ZERO, |p| p.position);
        let orientation = self
            .ecs
            .get::<OrientationComponent>(entity)
            .map_or(Quat::IDENTITY, |o| o.orientation);
        (position, orientation)
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        self.clear();
        self.script_object = None;
        self.abandon_commands();

        self.engines
            .scripting
            .borrow_mut()
            .destroy_execution_context(self.execution_context);
        self.engines.audio.borrow_mut().destroy_audio_scene(self.audio_scene);
        self.engines
            .pathfinding
            .borrow_mut()
            .destroy_pathfinding_scene(self.pathfinding_scene);
        self.engines.physics.borrow_mut().destroy_physics_scene(self.physics_scene);
        self.engines.graphics.borrow_mut().destroy_render_scene(self.render_scene);
        log::info!("destroyed scene '{}'", self.config.name);
    }
}
