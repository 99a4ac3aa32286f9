//! Scripting collaborator
//!
//! Script objects are created from a (module, type name) pair and driven by
//! method signatures such as `"void tick(const float)"`.

mod native;

use glam::Vec3;
use hecs::Entity;
use thiserror::Error;

use super::pathfinding::{AgentState, MovementRequestState};

pub use native::{NativeScript, NativeScriptingEngine};

crate::handle_types! {
    /// A loaded script module.
    ModuleHandle => ModuleTag;
    /// An execution context (VM stack) scripts run in.
    ExecutionContextHandle => ExecutionContextTag;
    /// A live script object.
    ScriptObjectHandle => ScriptObjectTag;
}

/// Called once per active tick on the scene script object, before engines tick.
pub const PRE_TICK: &str = "void preTick(const float)";
/// Called once per active tick on the scene script object, after entity scripts.
pub const POST_TICK: &str = "void postTick(const float)";
/// Called once per active tick on every entity script object.
pub const TICK: &str = "void tick(const float)";
/// Called after a script object is attached to a new entity.
pub const INITIALIZE: &str = "void initialize(Entity)";
/// Called after a script object is recreated for a loaded entity.
pub const DESERIALIZE: &str = "void deserialize(Entity)";
/// Called when the agent state or movement request state of the entity changed.
pub const UPDATE: &str = "void update(const AgentState, const MovementRequestState)";

/// Values passed to and returned from script methods.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Void,
    Bool(bool),
    Int(i64),
    Float(f32),
    Vec3(Vec3),
    Str(String),
    Entity(Entity),
    AgentState(AgentState),
    MovementRequestState(MovementRequestState),
}

/// Errors raised by a scripting engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("script module '{0}' not found")]
    ModuleNotFound(String),
    #[error("script type '{type_name}' not found in module '{module}'")]
    TypeNotFound { module: String, type_name: String },
    #[error("script object {0:?} does not exist")]
    InvalidObject(ScriptObjectHandle),
    #[error("script method '{method}' failed: {message}")]
    Execution { method: String, message: String },
}

/// Narrow interface to a scripting VM.
pub trait ScriptingEngine {
    /// Load a module from source. Loading a name twice replaces the module.
    fn create_module(&mut self, name: &str, sources: &[String]) -> Result<ModuleHandle, ScriptError>;
    fn destroy_module(&mut self, module: ModuleHandle);
    /// Find a loaded module by name.
    fn module(&self, name: &str) -> Option<ModuleHandle>;

    fn create_execution_context(&mut self) -> ExecutionContextHandle;
    fn destroy_execution_context(&mut self, context: ExecutionContextHandle);

    /// Instantiate `type_name` without running any script-side constructor.
    fn create_uninitialized_script_object(
        &mut self,
        module: ModuleHandle,
        type_name: &str,
    ) -> Result<ScriptObjectHandle, ScriptError>;

    /// Call `method` (a full signature) on `object`.
    fn execute(
        &mut self,
        context: ExecutionContextHandle,
        object: ScriptObjectHandle,
        method: &str,
        params: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptError>;

    fn release_script_object(&mut self, object: ScriptObjectHandle);
}
