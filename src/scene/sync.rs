//! Engine feedback and reconciliation
//!
//! Engine listeners never touch the entity storage. They post a
//! [`SyncEvent`] to the scene, which writes the reported state into the
//! components right after the engines tick and flags the entity with the
//! engine as source. Reconciliation then pushes every change to the engines
//! that did not cause it.

use crossbeam_channel::Sender;
use glam::{Quat, Vec3};
use hecs::Entity;

use super::{Scene, SceneComponent, SceneError};
use crate::ecs::{
    AnimationComponent, DirtyComponent, DirtyFlags, GhostObjectComponent, GraphicsComponent,
    GraphicsTerrainComponent, OrientationComponent, PathfindingAgentComponent,
    PathfindingCrowdComponent, PointLightComponent, PositionComponent, RigidBodyObjectComponent,
    ScriptObjectComponent,
};
use crate::engines::pathfinding::{
    AgentMotionChangeListener, AgentState, AgentStateChangeListener, MovementRequestState,
    MovementRequestStateChangeListener,
};
use crate::engines::physics::{MotionChangeListener, PhysicsObjectHandle};
use crate::engines::scripting::{ScriptValue, UPDATE};

/// State an engine reported for an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncEvent {
    PhysicsMotion {
        entity: Entity,
        position: Vec3,
        orientation: Quat,
    },
    AgentMotion {
        entity: Entity,
        position: Vec3,
    },
    AgentState {
        entity: Entity,
        state: AgentState,
    },
    MovementRequestState {
        entity: Entity,
        state: MovementRequestState,
    },
}

/// Listener forwarding engine callbacks for one entity.
struct Forwarder {
    entity: Entity,
    events: Sender<SyncEvent>,
}

impl Forwarder {
    fn post(&self, event: SyncEvent) {
        // Fails only once the scene is gone.
        let _ = self.events.send(event);
    }
}

impl MotionChangeListener for Forwarder {
    fn update(&mut self, position: Vec3, orientation: Quat) {
        self.post(SyncEvent::PhysicsMotion {
            entity: self.entity,
            position,
            orientation,
        });
    }
}

impl AgentMotionChangeListener for Forwarder {
    fn update(&mut self, position: Vec3) {
        self.post(SyncEvent::AgentMotion {
            entity: self.entity,
            position,
        });
    }
}

impl AgentStateChangeListener for Forwarder {
    fn update(&mut self, state: AgentState) {
        self.post(SyncEvent::AgentState {
            entity: self.entity,
            state,
        });
    }
}

impl MovementRequestStateChangeListener for Forwarder {
    fn update(&mut self, state: MovementRequestState) {
        self.post(SyncEvent::MovementRequestState {
            entity: self.entity,
            state,
        });
    }
}

const TRANSFORM: DirtyFlags = DirtyFlags::POSITION.union(DirtyFlags::ORIENTATION);
const EVERY_KIND: DirtyFlags = TRANSFORM
    .union(DirtyFlags::RIGID_BODY_OBJECT)
    .union(DirtyFlags::GHOST_OBJECT)
    .union(DirtyFlags::PATHFINDING_AGENT);

impl Scene {
    fn forwarder(&self, entity: Entity) -> Box<Forwarder> {
        Box::new(Forwarder {
            entity,
            events: self.sync_tx.clone(),
        })
    }

    /// Write engine-reported state into components.
    pub(super) fn apply_sync_events(&mut self) {
        let events = self.sync_rx.clone();
        for event in events.try_iter() {
            match event {
                SyncEvent::PhysicsMotion {
                    entity,
                    position,
                    orientation,
                } => {
                    if let Some(mut own) = self.ecs.get_mut::<PositionComponent>(entity) {
                        own.position = position;
                    }
                    if let Some(mut own) = self.ecs.get_mut::<OrientationComponent>(entity) {
                        own.orientation = orientation;
                    }
                    self.raise_engine_dirty(entity, DirtyFlags::SOURCE_PHYSICS | TRANSFORM);
                }
                SyncEvent::AgentMotion { entity, position } => {
                    if let Some(mut own) = self.ecs.get_mut::<PositionComponent>(entity) {
                        own.position = position;
                    }
                    self.raise_engine_dirty(
                        entity,
                        DirtyFlags::SOURCE_PATHFINDING | DirtyFlags::POSITION,
                    );
                }
                SyncEvent::AgentState { entity, state } => {
                    if let Some(mut agent) = self.ecs.get_mut::<PathfindingAgentComponent>(entity) {
                        agent.agent_state = state;
                    }
                    self.raise_engine_dirty(
                        entity,
                        DirtyFlags::SOURCE_PATHFINDING | DirtyFlags::AGENT_STATE,
                    );
                }
                SyncEvent::MovementRequestState { entity, state } => {
                    if let Some(mut agent) = self.ecs.get_mut::<PathfindingAgentComponent>(entity) {
                        agent.movement_request_state = state;
                    }
                    self.raise_engine_dirty(
                        entity,
                        DirtyFlags::SOURCE_PATHFINDING | DirtyFlags::MOVEMENT_REQUEST_STATE,
                    );
                }
            }
        }
    }

    fn raise_engine_dirty(&mut self, entity: Entity, flags: DirtyFlags) {
        // Events may still arrive for entities destroyed since they were posted.
        if self.ecs.valid(entity) {
            self.raise_dirty(entity, flags);
        }
    }

    /// Process every dirty entity once.
    ///
    /// # Errors
    ///
    /// Stops at the first script error.
    pub(super) fn reconcile(&mut self) -> Result<(), SceneError> {
        for entity in self.ecs.entities_with::<&DirtyComponent>() {
            let Some(dirty) = self.ecs.remove::<DirtyComponent>(entity) else {
                continue;
            };
            log::trace!("reconciling {entity:?}: {dirty:?}");
            self.reconcile_entity(entity, dirty)?;
        }
        Ok(())
    }

    fn reconcile_entity(&mut self, entity: Entity, dirty: DirtyComponent) -> Result<(), SceneError> {
        let expand = |kinds: DirtyFlags| {
            if kinds.contains(DirtyFlags::ALL) {
                kinds | EVERY_KIND
            } else {
                kinds
            }
        };
        if dirty.script.contains(DirtyFlags::ALL) {
            self.bind_all(entity);
        }
        let script = expand(dirty.script);
        let physics = expand(dirty.physics);
        let pathfinding = expand(dirty.pathfinding);

        if script.intersects(TRANSFORM) {
            self.push_to_graphics(entity, script);
            self.push_to_rigid_body(entity, script);
            self.push_to_ghost(entity, script);
        }
        if script.contains(DirtyFlags::RIGID_BODY_OBJECT) {
            self.register_rigid_body(entity);
        }
        if script.contains(DirtyFlags::GHOST_OBJECT) {
            self.register_ghost(entity);
        }
        if script.contains(DirtyFlags::PATHFINDING_AGENT) {
            self.register_agent(entity);
        }

        if physics.intersects(TRANSFORM) {
            self.push_to_graphics(entity, physics);
        }

        if pathfinding.intersects(TRANSFORM) {
            self.push_to_graphics(entity, pathfinding);
            self.push_to_ghost(entity, pathfinding);
        }
        if pathfinding.intersects(DirtyFlags::AGENT_STATE | DirtyFlags::MOVEMENT_REQUEST_STATE) {
            self.notify_agent_script(entity)?;
        }
        Ok(())
    }

    /// Create every engine resource the entity's components still lack.
    fn bind_all(&mut self, entity: Entity) {
        GraphicsComponent::bind(entity, self);
        AnimationComponent::bind(entity, self);
        PointLightComponent::bind(entity, self);
        GraphicsTerrainComponent::bind(entity, self);
        RigidBodyObjectComponent::bind(entity, self);
        GhostObjectComponent::bind(entity, self);
        PathfindingCrowdComponent::bind(entity, self);
        PathfindingAgentComponent::bind(entity, self);
    }

    fn push_to_graphics(&mut self, entity: Entity, flags: DirtyFlags) {
        let Some(renderable) = self
            .ecs
            .get::<GraphicsComponent>(entity)
            .map(|g| g.renderable_handle)
            .filter(|h| h.valid())
        else {
            return;
        };
        let (position, orientation) = self.transform(entity);
        let mut graphics = self.engines.graphics.borrow_mut();
        if flags.contains(DirtyFlags::POSITION) {
            graphics.position(self.render_scene, renderable, position);
        }
        if flags.contains(DirtyFlags::ORIENTATION) {
            graphics.rotation(self.render_scene, renderable, orientation);
        }
    }

    fn push_to_physics(&mut self, entity: Entity, object: PhysicsObjectHandle, flags: DirtyFlags) {
        let (position, orientation) = self.transform(entity);
        let mut physics = self.engines.physics.borrow_mut();
        if flags.contains(DirtyFlags::POSITION) {
            physics.position(self.physics_scene, object, position);
        }
        if flags.contains(DirtyFlags::ORIENTATION) {
            physics.rotation(self.physics_scene, object, orientation);
        }
    }

    fn rigid_body(&self, entity: Entity) -> Option<PhysicsObjectHandle> {
        self.ecs
            .get::<RigidBodyObjectComponent>(entity)
            .map(|b| b.rigid_body_object_handle)
            .filter(|h| h.valid())
            .map(PhysicsObjectHandle::from)
    }

    fn ghost(&self, entity: Entity) -> Option<PhysicsObjectHandle> {
        self.ecs
            .get::<GhostObjectComponent>(entity)
            .map(|g| g.ghost_object_handle)
            .filter(|h| h.valid())
            .map(PhysicsObjectHandle::from)
    }

    fn push_to_rigid_body(&mut self, entity: Entity, flags: DirtyFlags) {
        if let Some(object) = self.rigid_body(entity) {
            self.push_to_physics(entity, object, flags);
        }
    }

    fn push_to_ghost(&mut self, entity: Entity, flags: DirtyFlags) {
        if let Some(object) = self.ghost(entity) {
            self.push_to_physics(entity, object, flags);
        }
    }

    fn register_physics_object(&mut self, entity: Entity, object: PhysicsObjectHandle) {
        let listener: Box<dyn MotionChangeListener> = self.forwarder(entity);
        let mut physics = self.engines.physics.borrow_mut();
        physics.set_user_data(self.physics_scene, object, entity.to_bits().get());
        physics.set_motion_change_listener(self.physics_scene, object, Some(listener));
    }

    fn register_rigid_body(&mut self, entity: Entity) {
        if let Some(object) = self.rigid_body(entity) {
            self.register_physics_object(entity, object);
        }
    }

    fn register_ghost(&mut self, entity: Entity) {
        if let Some(object) = self.ghost(entity) {
            self.register_physics_object(entity, object);
        }
    }

    fn register_agent(&mut self, entity: Entity) {
        let Some(agent) = self
            .ecs
            .get_cloned::<PathfindingAgentComponent>(entity)
            .filter(|a| a.agent_handle.valid())
        else {
            return;
        };
        let scene = self.pathfinding_scene;
        let (crowd, handle) = (agent.crowd_handle, agent.agent_handle);
        let motion: Box<dyn AgentMotionChangeListener> = self.forwarder(entity);
        let state: Box<dyn AgentStateChangeListener> = self.forwarder(entity);
        let request: Box<dyn MovementRequestStateChangeListener> = self.forwarder(entity);

        let mut pathfinding = self.engines.pathfinding.borrow_mut();
        pathfinding.set_user_data(scene, crowd, handle, entity.to_bits().get());
        pathfinding.set_motion_change_listener(scene, crowd, handle, Some(motion));
        pathfinding.set_state_change_listener(scene, crowd, handle, Some(state));
        pathfinding.set_movement_request_change_listener(scene, crowd, handle, Some(request));
        if agent.movement_request_state == MovementRequestState::Requesting {
            log::debug!("{entity:?}: requesting move to {}", agent.target);
            pathfinding.request_move_target(scene, crowd, handle, agent.target);
        }
    }

    fn notify_agent_script(&mut self, entity: Entity) -> Result<(), SceneError> {
        let Some(object) = self
            .ecs
            .get::<ScriptObjectComponent>(entity)
            .map(|s| s.script_object_handle)
            .filter(|h| h.valid())
        else {
            return Ok(());
        };
        let Some(agent) = self.ecs.get_cloned::<PathfindingAgentComponent>(entity) else {
            return Ok(());
        };
        self.engines.scripting.borrow_mut().execute(
            self.execution_context,
            object,
            UPDATE,
            &[
                ScriptValue::AgentState(agent.agent_state),
                ScriptValue::MovementRequestState(agent.movement_request_state),
            ],
        )?;
        Ok(())
    }
}
