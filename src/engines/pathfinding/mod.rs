//! Pathfinding collaborator
//!
//! Agents walk inside crowds, crowds live inside a pathfinding scene. Agent
//! motion and state changes flow back to the scene through listeners.

mod grid;

use glam::Vec3;
use serde::{Deserialize, Serialize};

pub use grid::{GridPathfindingEngine, NavigationGrid};

crate::handle_types! {
    /// A pathfinding world owned by a pathfinding engine.
    PathfindingSceneHandle => PathfindingSceneTag;
    /// Navigation mesh asset.
    NavigationMeshHandle => NavigationMeshTag;
    /// A crowd of agents sharing one navigation mesh.
    CrowdHandle => CrowdTag;
    /// One agent inside a crowd.
    AgentHandle => AgentTag;
}

/// Simulation state of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AgentState {
    /// Not placed on the navigation mesh
    #[default]
    Invalid,
    Walking,
    OffMesh,
}

/// State of an agent's pending movement request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MovementRequestState {
    #[default]
    None,
    Failed,
    Valid,
    /// A target is set but has not been handed to the engine yet
    Requesting,
    WaitingForQueue,
    WaitingForPath,
    Velocity,
}

/// Crowd creation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrowdConfig {
    pub max_agents: u32,
    pub max_agent_radius: f32,
}

impl Default for CrowdConfig {
    fn default() -> Self {
        Self {
            max_agents: 128,
            max_agent_radius: 0.6,
        }
    }
}

/// Agent creation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentParams {
    pub radius: f32,
    pub height: f32,
    pub max_acceleration: f32,
    pub max_speed: f32,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            radius: 0.6,
            height: 2.0,
            max_acceleration: 8.0,
            max_speed: 3.5,
        }
    }
}

/// Receives the new position of an agent.
pub trait AgentMotionChangeListener {
    fn update(&mut self, position: Vec3);
}

/// Receives agent state transitions.
pub trait AgentStateChangeListener {
    fn update(&mut self, state: AgentState);
}

/// Receives movement request state transitions.
pub trait MovementRequestStateChangeListener {
    fn update(&mut self, state: MovementRequestState);
}

/// Narrow interface to a pathfinding backend.
pub trait PathfindingEngine {
    fn create_pathfinding_scene(&mut self) -> PathfindingSceneHandle;
    fn destroy_pathfinding_scene(&mut self, scene: PathfindingSceneHandle);

    /// Advance every crowd of the scene. Listeners fire from inside this call.
    fn tick(&mut self, scene: PathfindingSceneHandle, delta: f32);

    fn create_crowd(
        &mut self,
        scene: PathfindingSceneHandle,
        navigation_mesh: NavigationMeshHandle,
        config: &CrowdConfig,
    ) -> CrowdHandle;
    fn destroy_crowd(&mut self, scene: PathfindingSceneHandle, crowd: CrowdHandle);

    fn create_agent(
        &mut self,
        scene: PathfindingSceneHandle,
        crowd: CrowdHandle,
        position: Vec3,
        params: &AgentParams,
    ) -> AgentHandle;
    fn destroy_agent(&mut self, scene: PathfindingSceneHandle, crowd: CrowdHandle, agent: AgentHandle);

    fn request_move_target(
        &mut self,
        scene: PathfindingSceneHandle,
        crowd: CrowdHandle,
        agent: AgentHandle,
        target: Vec3,
    );
    fn request_move_velocity(
        &mut self,
        scene: PathfindingSceneHandle,
        crowd: CrowdHandle,
        agent: AgentHandle,
        velocity: Vec3,
    );
    fn reset_move_target(&mut self, scene: PathfindingSceneHandle, crowd: CrowdHandle, agent: AgentHandle);

    fn set_motion_change_listener(
        &mut self,
        scene: PathfindingSceneHandle,
        crowd: CrowdHandle,
        agent: AgentHandle,
        listener: Option<Box<dyn AgentMotionChangeListener>>,
    );
    fn set_state_change_listener(
        &mut self,
        scene: PathfindingSceneHandle,
        crowd: CrowdHandle,
        agent: AgentHandle,
        listener: Option<Box<dyn AgentStateChangeListener>>,
    );
    fn set_movement_request_change_listener(
        &mut self,
        scene: PathfindingSceneHandle,
        crowd: CrowdHandle,
        agent: AgentHandle,
        listener: Option<Box<dyn MovementRequestStateChangeListener>>,
    );

    /// Attach an opaque payload to an agent (the scene stores entity bits).
    fn set_user_data(
        &mut self,
        scene: PathfindingSceneHandle,
        crowd: CrowdHandle,
        agent: AgentHandle,
        data: u64,
    );
    fn user_data(
        &self,
        scene: PathfindingSceneHandle,
        crowd: CrowdHandle,
        agent: AgentHandle,
    ) -> Option<u64>;
}
