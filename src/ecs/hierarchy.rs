//! Entity hierarchy components
//!
//! Both sides of a parent/child link are stored: the child carries a
//! [`ParentComponent`], the parent lists it in its [`ChildrenComponent`].
//! The scene keeps the two in step.

use hecs::Entity;
use smallvec::SmallVec;

/// Parent component - this entity follows `entity`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentComponent {
    pub entity: Entity,
}

impl ParentComponent {
    #[must_use]
    pub const fn new(entity: Entity) -> Self {
        Self { entity }
    }
}

/// Children component - tracks all children of this entity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildrenComponent {
    pub children: SmallVec<[Entity; 8]>,
}

impl ChildrenComponent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a child; duplicates are ignored
    pub fn add(&mut self, child: Entity) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    /// Remove a child
    pub fn remove(&mut self, child: Entity) -> bool {
        if let Some(pos) = self.children.iter().position(|&e| e == child) {
            self.children.remove(pos);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn contains(&self, child: Entity) -> bool {
        self.children.contains(&child)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.children.iter().copied()
    }
}

impl FromIterator<Entity> for ChildrenComponent {
    fn from_iter<I: IntoIterator<Item = Entity>>(iter: I) -> Self {
        let mut children = Self::new();
        for child in iter {
            children.add(child);
        }
        children
    }
}
