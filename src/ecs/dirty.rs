//! Dirty flags
//!
//! A [`DirtyComponent`] records that something about an entity changed and
//! which subsystem changed it. The scene's reconciliation pass consumes it.

use bitflags::bitflags;

bitflags! {
    /// Change record: a *source* axis and a *kind* axis in one `u16`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DirtyFlags: u16 {
        // Sources
        const SOURCE_SCRIPT = 1 << 0;
        const SOURCE_PHYSICS = 1 << 1;
        const SOURCE_PATHFINDING = 1 << 2;

        // Kinds
        const ALL = 1 << 3;
        const POSITION = 1 << 4;
        const ORIENTATION = 1 << 5;
        const RIGID_BODY_OBJECT = 1 << 6;
        const GHOST_OBJECT = 1 << 7;
        const PATHFINDING_AGENT = 1 << 8;
        const AGENT_STATE = 1 << 9;
        const MOVEMENT_REQUEST_STATE = 1 << 10;
    }
}

impl DirtyFlags {
    pub const NONE: Self = Self::empty();

    /// Every source bit.
    pub const SOURCES: Self = Self::SOURCE_SCRIPT
        .union(Self::SOURCE_PHYSICS)
        .union(Self::SOURCE_PATHFINDING);

    /// Source bits only.
    #[must_use]
    pub const fn sources(self) -> Self {
        self.intersection(Self::SOURCES)
    }

    /// Kind bits only.
    #[must_use]
    pub const fn kinds(self) -> Self {
        self.difference(Self::SOURCES)
    }
}

/// Pending propagation for one entity, kinds kept apart per source so that
/// one source's kinds never route through another's branch. Removed once
/// reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyComponent {
    pub script: DirtyFlags,
    pub physics: DirtyFlags,
    pub pathfinding: DirtyFlags,
}

impl Default for DirtyComponent {
    fn default() -> Self {
        Self {
            script: DirtyFlags::NONE,
            physics: DirtyFlags::NONE,
            pathfinding: DirtyFlags::NONE,
        }
    }
}

impl DirtyComponent {
    #[must_use]
    pub fn new(flags: DirtyFlags) -> Self {
        let mut dirty = Self::default();
        dirty.raise(flags);
        dirty
    }

    /// Accumulate the kinds of `flags` under each source it names.
    pub fn raise(&mut self, flags: DirtyFlags) {
        let kinds = flags.kinds();
        if flags.contains(DirtyFlags::SOURCE_SCRIPT) {
            self.script |= kinds;
        }
        if flags.contains(DirtyFlags::SOURCE_PHYSICS) {
            self.physics |= kinds;
        }
        if flags.contains(DirtyFlags::SOURCE_PATHFINDING) {
            self.pathfinding |= kinds;
        }
    }

    /// Kinds raised by `source`.
    #[must_use]
    pub fn kinds(&self, source: DirtyFlags) -> DirtyFlags {
        let mut kinds = DirtyFlags::NONE;
        if source.contains(DirtyFlags::SOURCE_SCRIPT) {
            kinds |= self.script;
        }
        if source.contains(DirtyFlags::SOURCE_PHYSICS) {
            kinds |= self.physics;
        }
        if source.contains(DirtyFlags::SOURCE_PATHFINDING) {
            kinds |= self.pathfinding;
        }
        kinds
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.script.is_empty() && self.physics.is_empty() && self.pathfinding.is_empty()
    }
}
