//! Parent/child links and transform following
//!
//! [`Scene::set_parent`] and [`Scene::clear_parent`] are the only places
//! that write both sides of a link.

use std::collections::VecDeque;

use hecs::Entity;

use super::{Scene, SceneError};
use crate::ecs::{
    ChildrenComponent, DirtyFlags, OrientationComponent, ParentComponent, PositionComponent,
};

impl Scene {
    /// Make `child` a child of `parent`, detaching it from any previous
    /// parent.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::HierarchyCycle`] if `parent` is `child` or one
    /// of its descendants.
    ///
    /// # Panics
    ///
    /// If either entity is dead.
    #[track_caller]
    pub fn set_parent(&mut self, child: Entity, parent: Entity) -> Result<(), SceneError> {
        assert!(self.valid(child), "set_parent: dead child {child:?}");
        assert!(self.valid(parent), "set_parent: dead parent {parent:?}");

        let mut cursor = Some(parent);
        while let Some(ancestor) = cursor {
            if ancestor == child {
                return Err(SceneError::HierarchyCycle {
                    child: child.to_bits().get(),
                    parent: parent.to_bits().get(),
                });
            }
            cursor = self.parent(ancestor);
        }

        if self.parent(child) != Some(parent) {
            self.clear_parent(child);
            self.ecs.insert(child, ParentComponent::new(parent))?;
        }
        if let Some(mut children) = self.ecs.get_mut::<ChildrenComponent>(parent) {
            children.add(child);
            return Ok(());
        }
        self.ecs.insert(parent, [child].into_iter().collect::<ChildrenComponent>())?;
        Ok(())
    }

    /// Detach `child` from its parent, returning the former parent.
    pub fn clear_parent(&mut self, child: Entity) -> Option<Entity> {
        let parent = self.ecs.remove::<ParentComponent>(child)?.entity;
        if let Some(mut children) = self.ecs.get_mut::<ChildrenComponent>(parent) {
            children.remove(child);
        }
        Some(parent)
    }

    #[must_use]
    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        self.ecs.get::<ParentComponent>(entity).map(|p| p.entity)
    }

    #[must_use]
    pub fn children(&self, entity: Entity) -> Vec<Entity> {
        self.ecs
            .get::<ChildrenComponent>(entity)
            .map(|c| c.iter().collect())
            .unwrap_or_default()
    }

    /// Copy each parent's transform into its children, top down, so a whole
    /// chain settles in one pass.
    pub(super) fn propagate_hierarchy(&mut self) {
        let mut pending: VecDeque<Entity> = self
            .ecs
            .entities_with::<&ChildrenComponent>()
            .into_iter()
            .filter(|&entity| !self.ecs.has::<ParentComponent>(entity))
            .collect();

        while let Some(parent) = pending.pop_front() {
            let position = self.get::<PositionComponent>(parent);
            let orientation = self.get::<OrientationComponent>(parent);
            for child in self.children(parent) {
                self.follow_parent(child, position, orientation);
                pending.push_back(child);
            }
        }
    }

    fn follow_parent(
        &mut self,
        child: Entity,
        position: Option<PositionComponent>,
        orientation: Option<OrientationComponent>,
    ) {
        let mut changed = false;
        if let Some(parent) = position
            && let Some(mut own) = self.ecs.get_mut::<PositionComponent>(child)
            && *own != parent
        {
            *own = parent;
            changed = true;
        }
        if let Some(parent) = orientation
            && let Some(mut own) = self.ecs.get_mut::<OrientationComponent>(child)
            && *own != parent
        {
            *own = parent;
            changed = true;
        }

        if changed {
            self.raise_dirty(
                child,
                DirtyFlags::SOURCE_SCRIPT | DirtyFlags::POSITION | DirtyFlags::ORIENTATION,
            );
        }
    }
}
