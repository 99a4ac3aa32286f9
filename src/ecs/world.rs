//! Entity/component storage on top of hecs
//!
//! [`EntityComponentSystem`] knows the closed set of scene component kinds
//! and which kinds require which, and publishes structural changes. It knows
//! nothing about the engines behind the components; that is the scene's job.

use hecs::Entity;
use thiserror::Error;

use super::components::{
    AnimationComponent, GhostObjectComponent, GraphicsComponent, GraphicsTerrainComponent,
    OrientationComponent, PathfindingAgentComponent, PathfindingCrowdComponent,
    PointLightComponent, PositionComponent, PropertiesComponent, RigidBodyObjectComponent,
    ScriptObjectComponent, SkeletonComponent,
};
use super::dirty::DirtyComponent;
use super::events::{EcsEvent, EventBus};
use super::hierarchy::{ChildrenComponent, ParentComponent};

/// A component type known to the scene.
pub trait EcsComponent: hecs::Component {
    const KIND: ComponentKind;
}

macro_rules! component_kinds {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        /// Every component kind an entity can carry.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum ComponentKind {
            $($kind,)*
        }

        impl ComponentKind {
            pub const ALL: &'static [Self] = &[$(Self::$kind,)*];
        }

        $(impl EcsComponent for $ty {
            const KIND: ComponentKind = ComponentKind::$kind;
        })*

        fn entity_has(entity: hecs::EntityRef<'_>, kind: ComponentKind) -> bool {
            match kind {
                $(ComponentKind::$kind => entity.has::<$ty>(),)*
            }
        }
    };
}

component_kinds! {
    PositionComponent => Position,
    OrientationComponent => Orientation,
    GraphicsComponent => Graphics,
    PointLightComponent => PointLight,
    GraphicsTerrainComponent => GraphicsTerrain,
    RigidBodyObjectComponent => RigidBodyObject,
    GhostObjectComponent => GhostObject,
    PathfindingCrowdComponent => PathfindingCrowd,
    PathfindingAgentComponent => PathfindingAgent,
    AnimationComponent => Animation,
    SkeletonComponent => Skeleton,
    ParentComponent => Parent,
    ChildrenComponent => Children,
    DirtyComponent => Dirty,
    ScriptObjectComponent => ScriptObject,
    PropertiesComponent => Properties,
}

impl ComponentKind {
    /// Kinds that must already be present before this kind is assigned.
    #[must_use]
    pub const fn dependencies(self) -> &'static [Self] {
        match self {
            Self::Graphics | Self::RigidBodyObject | Self::GhostObject => {
                &[Self::Position, Self::Orientation]
            }
            Self::PointLight | Self::PathfindingAgent => &[Self::Position],
            Self::Animation => &[Self::Graphics],
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EcsError {
    #[error("entity {0:?} does not exist")]
    NoSuchEntity(Entity),
    #[error("{component:?} on {entity:?} requires {requires:?}")]
    MissingDependency {
        entity: Entity,
        component: ComponentKind,
        requires: ComponentKind,
    },
}

/// Entity and component storage with dependency checks and change events.
#[derive(Default)]
pub struct EntityComponentSystem {
    world: hecs::World,
    events: EventBus,
}

impl EntityComponentSystem {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn an empty entity
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.world.spawn(());
        self.events.publish(EcsEvent::EntityCreated(entity));
        entity
    }

    /// Despawn an entity with all its components.
    ///
    /// Returns false if the entity did not exist.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        let kinds = self.kinds(entity);
        if self.world.despawn(entity).is_err() {
            return false;
        }
        for kind in kinds {
            self.events.publish(EcsEvent::ComponentRemoved { entity, kind });
        }
        self.events.publish(EcsEvent::EntityDestroyed(entity));
        true
    }

    /// Check if an entity exists
    #[must_use]
    pub fn valid(&self, entity: Entity) -> bool {
        self.world.contains(entity)
    }

    /// Get the number of entities
    #[must_use]
    pub fn len(&self) -> u32 {
        self.world.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.world.is_empty()
    }

    /// Every live entity.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        self.world.iter().map(|entity| entity.entity()).collect()
    }

    /// Destroy every entity.
    pub fn clear(&mut self) {
        for entity in self.entities() {
            self.destroy_entity(entity);
        }
    }

    // ========================================================================
    // Components
    // ========================================================================

    /// Write `component`, replacing and returning any previous one.
    ///
    /// Fails if the entity is dead or lacks a component this kind requires.
    pub fn insert<C: EcsComponent>(&mut self, entity: Entity, component: C) -> Result<Option<C>, EcsError> {
        self.check_dependencies(entity, C::KIND)?;

        let previous = self.world.remove_one::<C>(entity).ok();
        if previous.is_some() {
            self.events.publish(EcsEvent::ComponentRemoved { entity, kind: C::KIND });
        }
        self.world
            .insert_one(entity, component)
            .map_err(|_| EcsError::NoSuchEntity(entity))?;
        self.events.publish(EcsEvent::ComponentAdded { entity, kind: C::KIND });
        Ok(previous)
    }

    pub fn remove<C: EcsComponent>(&mut self, entity: Entity) -> Option<C> {
        let removed = self.world.remove_one::<C>(entity).ok()?;
        self.events.publish(EcsEvent::ComponentRemoved { entity, kind: C::KIND });
        Some(removed)
    }

    #[must_use]
    pub fn get<C: EcsComponent>(&self, entity: Entity) -> Option<hecs::Ref<'_, C>> {
        self.world.get::<&C>(entity).ok()
    }

    pub fn get_mut<C: EcsComponent>(&mut self, entity: Entity) -> Option<hecs::RefMut<'_, C>> {
        self.world.get::<&mut C>(entity).ok()
    }

    /// Copy of a component, so no borrow of the storage is held.
    #[must_use]
    pub fn get_cloned<C: EcsComponent + Clone>(&self, entity: Entity) -> Option<C> {
        self.get::<C>(entity).map(|component| (*component).clone())
    }

    #[must_use]
    pub fn has<C: EcsComponent>(&self, entity: Entity) -> bool {
        self.has_kind(entity, C::KIND)
    }

    #[must_use]
    pub fn has_kind(&self, entity: Entity, kind: ComponentKind) -> bool {
        self.world
            .entity(entity)
            .is_ok_and(|entity| entity_has(entity, kind))
    }

    /// Kinds currently on `entity`.
    #[must_use]
    pub fn kinds(&self, entity: Entity) -> Vec<ComponentKind> {
        match self.world.entity(entity) {
            Ok(entity) => ComponentKind::ALL
                .iter()
                .copied()
                .filter(|&kind| entity_has(entity, kind))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Check that `entity` exists and has everything `kind` requires.
    pub fn check_dependencies(&self, entity: Entity, kind: ComponentKind) -> Result<(), EcsError> {
        let Ok(entity_ref) = self.world.entity(entity) else {
            return Err(EcsError::NoSuchEntity(entity));
        };
        match kind
            .dependencies()
            .iter()
            .find(|&&required| !entity_has(entity_ref, required))
        {
            Some(&requires) => Err(EcsError::MissingDependency {
                entity,
                component: kind,
                requires,
            }),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Query for entities with specific components
    pub fn query<Q: hecs::Query>(&self) -> hecs::QueryBorrow<'_, Q> {
        self.world.query::<Q>()
    }

    /// Query for entities with specific components (mutable)
    pub fn query_mut<Q: hecs::Query>(&mut self) -> hecs::QueryMut<'_, Q> {
        self.world.query_mut::<Q>()
    }

    /// Entities matching `Q`, collected so the storage can be mutated while
    /// walking them.
    #[must_use]
    pub fn entities_with<Q: hecs::Query>(&self) -> Vec<Entity> {
        self.world.query::<Q>().iter().map(|(entity, _)| entity).collect()
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Receive every structural change from now on.
    pub fn subscribe(&mut self) -> crossbeam_channel::Receiver<EcsEvent> {
        self.events.subscribe()
    }
}
