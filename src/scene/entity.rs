//! Entity view

use glam::{Quat, Vec3};
use hecs::Entity;

use super::{Scene, SceneComponent};
use crate::ecs::{EcsComponent, OrientationComponent, PositionComponent};

/// An entity together with a mutable borrow of its scene.
///
/// Every write goes through the scene, so resource creation and dirty
/// flagging happen exactly as with [`Scene::assign`].
pub struct EntityMut<'a> {
    scene: &'a mut Scene,
    entity: Entity,
}

impl<'a> EntityMut<'a> {
    pub(super) fn new(scene: &'a mut Scene, entity: Entity) -> Self {
        Self { scene, entity }
    }

    #[must_use]
    pub fn id(&self) -> Entity {
        self.entity
    }

    #[must_use]
    pub fn valid(&self) -> bool {
        self.scene.valid(self.entity)
    }

    /// See [`SceneComponent::assign`].
    ///
    /// # Panics
    ///
    /// If the entity is dead or lacks a component this kind requires.
    #[track_caller]
    pub fn assign<C: SceneComponent>(&mut self, component: C) -> &mut Self {
        self.scene.assign(self.entity, component);
        self
    }

    pub fn remove<C: SceneComponent>(&mut self) -> Option<C> {
        self.scene.remove::<C>(self.entity)
    }

    #[must_use]
    pub fn get<C: EcsComponent + Clone>(&self) -> Option<C> {
        self.scene.get::<C>(self.entity)
    }

    #[must_use]
    pub fn has<C: EcsComponent>(&self) -> bool {
        self.scene.has::<C>(self.entity)
    }

    /// Shorthand for assigning a [`PositionComponent`].
    #[track_caller]
    pub fn set_position(&mut self, position: Vec3) -> &mut Self {
        self.assign(PositionComponent::new(position))
    }

    /// Shorthand for assigning an [`OrientationComponent`].
    #[track_caller]
    pub fn set_orientation(&mut self, orientation: Quat) -> &mut Self {
        self.assign(OrientationComponent::new(orientation))
    }

    /// Make this entity a child of `parent`.
    ///
    /// # Panics
    ///
    /// If either entity is dead or `parent` is a descendant of this entity.
    #[track_caller]
    pub fn set_parent(&mut self, parent: Entity) -> &mut Self {
        if let Err(error) = self.scene.set_parent(self.entity, parent) {
            panic!("{error}");
        }
        self
    }

    pub fn destroy(self) {
        self.scene.destroy_entity(self.entity);
    }
}
