//! Scene errors

use thiserror::Error;

use crate::assets::ResourceKind;
use crate::ecs::EcsError;
use crate::engines::scripting::ScriptError;

/// Errors that can occur during scene operations
#[derive(Debug, Error)]
pub enum SceneError {
    /// A saved scene names an asset the registry does not know.
    #[error("no {kind:?} named '{name}' is registered")]
    MissingResource { kind: ResourceKind, name: String },
    /// A saved handle has no entry in the saved name table.
    #[error("{kind:?} handle {id:#x} has no entry in the name table")]
    UnknownHandle { kind: ResourceKind, id: u64 },
    /// An agent refers to a crowd no saved entity owns.
    #[error("crowd handle {0:#x} is not owned by any entity")]
    UnknownCrowd(u64),
    /// A live handle cannot be saved because it was never registered by name.
    #[error("{kind:?} handle {id:#x} has no registered name")]
    UnnamedResource { kind: ResourceKind, id: u64 },
    /// A parent or child id that is not in the entity table.
    #[error("entity {0:#x} is referenced but not saved")]
    UnknownEntity(u64),
    #[error("parenting {child:#x} under {parent:#x} would create a cycle")]
    HierarchyCycle { child: u64, parent: u64 },
    #[error("unsupported scene format version {0}")]
    UnsupportedVersion(u32),
    #[error(transparent)]
    Component(#[from] EcsError),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
    #[error("Config error: {0}")]
    Config(String),
}
