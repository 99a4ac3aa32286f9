//! Collaborator engines
//!
//! Each engine owns the resources of one subsystem and is reached only
//! through a narrow trait plus handles. Engines are shared between scenes on
//! the control thread as [`Shared`] trait objects.

pub mod audio;
pub mod graphics;
pub mod pathfinding;
pub mod physics;
pub mod scripting;
pub mod workers;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::assets::ResourceRegistry;

pub use audio::{AudioEngine, SilentAudioEngine};
pub use graphics::{GraphicsEngine, HeadlessGraphicsEngine};
pub use pathfinding::{GridPathfindingEngine, PathfindingEngine};
pub use physics::{PhysicsEngine, RapierPhysicsEngine};
pub use scripting::{NativeScriptingEngine, ScriptingEngine};
pub use workers::{InlineWorkerPool, ThreadWorkerPool, WorkerPool};

/// Single-threaded shared ownership.
pub type Shared<T> = Rc<RefCell<T>>;

/// Wrap a value for sharing between scenes.
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// Everything a scene needs from the outside world.
#[derive(Clone)]
pub struct Engines {
    pub graphics: Shared<dyn GraphicsEngine>,
    pub physics: Shared<dyn PhysicsEngine>,
    pub pathfinding: Shared<dyn PathfindingEngine>,
    pub audio: Shared<dyn AudioEngine>,
    pub scripting: Shared<dyn ScriptingEngine>,
    /// Named assets plus the skeletons and clips animation reads
    pub resources: Shared<ResourceRegistry>,
    pub workers: Arc<dyn WorkerPool>,
}

impl Engines {
    /// The bundled backends: headless graphics, rapier physics, grid
    /// pathfinding, silent audio, native scripting and inline workers.
    #[must_use]
    pub fn headless() -> Self {
        Self {
            graphics: shared(HeadlessGraphicsEngine::new()),
            physics: shared(RapierPhysicsEngine::new()),
            pathfinding: shared(GridPathfindingEngine::new()),
            audio: shared(SilentAudioEngine::new()),
            scripting: shared(NativeScriptingEngine::new()),
            resources: shared(ResourceRegistry::new()),
            workers: Arc::new(InlineWorkerPool),
        }
    }
}
