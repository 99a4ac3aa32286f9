//! Grid-based pathfinding
//!
//! Navigation meshes are 2D walkability grids laid over the XZ plane. Move
//! requests are answered synchronously with an A* path; agents then walk the
//! path at their maximum speed as the scene ticks.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use glam::{Vec2, Vec3};
use rustc_hash::FxHashMap;

use super::{
    AgentHandle, AgentMotionChangeListener, AgentParams, AgentState, AgentStateChangeListener,
    AgentTag, CrowdConfig, CrowdHandle, CrowdTag, MovementRequestState,
    MovementRequestStateChangeListener, NavigationMeshHandle, NavigationMeshTag,
    PathfindingEngine, PathfindingSceneHandle, PathfindingSceneTag,
};
use crate::handles::HandleVector;

// ============================================================================
// Navigation grid
// ============================================================================

/// Walkability grid on the XZ plane.
#[derive(Debug, Clone)]
pub struct NavigationGrid {
    /// Width in cells (X axis)
    pub width: usize,
    /// Depth in cells (Z axis)
    pub depth: usize,
    /// Cell size in world units
    pub cell_size: f32,
    /// World position of the grid corner
    pub origin: Vec2,
    cells: Vec<bool>,
}

impl NavigationGrid {
    /// Create a grid with every cell walkable.
    #[must_use]
    pub fn new(width: usize, depth: usize, cell_size: f32) -> Self {
        Self {
            width,
            depth,
            cell_size,
            origin: Vec2::ZERO,
            cells: vec![true; width * depth],
        }
    }

    pub fn set_walkable(&mut self, x: usize, z: usize, walkable: bool) {
        if x < self.width && z < self.depth {
            self.cells[z * self.width + x] = walkable;
        }
    }

    #[must_use]
    pub fn is_walkable(&self, x: usize, z: usize) -> bool {
        x < self.width && z < self.depth && self.cells[z * self.width + x]
    }

    /// Cell containing a world position, if it lies on the grid.
    #[must_use]
    pub fn cell_at(&self, position: Vec3) -> Option<(usize, usize)> {
        let local = Vec2::new(position.x, position.z) - self.origin;
        let x = (local.x / self.cell_size).floor();
        let z = (local.y / self.cell_size).floor();
        if x < 0.0 || z < 0.0 {
            return None;
        }
        let cell = (x as usize, z as usize);
        (cell.0 < self.width && cell.1 < self.depth).then_some(cell)
    }

    /// Check whether a world position stands on a walkable cell.
    #[must_use]
    pub fn is_walkable_at(&self, position: Vec3) -> bool {
        self.cell_at(position)
            .is_some_and(|(x, z)| self.is_walkable(x, z))
    }

    /// Centre of a cell, at height `y`.
    #[must_use]
    pub fn cell_center(&self, x: usize, z: usize, y: f32) -> Vec3 {
        let flat = self.origin
            + Vec2::new(
                (x as f32 + 0.5) * self.cell_size,
                (z as f32 + 0.5) * self.cell_size,
            );
        Vec3::new(flat.x, y, flat.y)
    }

    /// 4-connected walkable neighbours.
    fn neighbors(&self, x: usize, z: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        let candidates = [
            x.checked_sub(1).map(|x| (x, z)),
            Some((x + 1, z)),
            z.checked_sub(1).map(|z| (x, z)),
            Some((x, z + 1)),
        ];
        candidates
            .into_iter()
            .flatten()
            .filter(|&(x, z)| self.is_walkable(x, z))
    }

    /// A* from `start` to `goal`. The returned waypoints are cell centres
    /// followed by the exact goal; `None` when no path exists.
    #[must_use]
    pub fn find_path(&self, start: Vec3, goal: Vec3) -> Option<Vec<Vec3>> {
        let start_cell = self.cell_at(start).filter(|&(x, z)| self.is_walkable(x, z))?;
        let goal_cell = self.cell_at(goal).filter(|&(x, z)| self.is_walkable(x, z))?;

        let heuristic = |(x, z): (usize, usize)| -> f32 {
            (x.abs_diff(goal_cell.0) + z.abs_diff(goal_cell.1)) as f32
        };

        let mut open = BinaryHeap::new();
        let mut came_from: FxHashMap<(usize, usize), (usize, usize)> = FxHashMap::default();
        let mut g_score: FxHashMap<(usize, usize), f32> = FxHashMap::default();

        g_score.insert(start_cell, 0.0);
        open.push(OpenNode {
            cell: start_cell,
            f_cost: heuristic(start_cell),
        });

        while let Some(OpenNode { cell, .. }) = open.pop() {
            if cell == goal_cell {
                let mut cells = vec![cell];
                let mut current = cell;
                while let Some(&previous) = came_from.get(&current) {
                    cells.push(previous);
                    current = previous;
                }
                cells.reverse();

                let mut waypoints: Vec<Vec3> = cells
                    .into_iter()
                    .skip(1)
                    .map(|(x, z)| self.cell_center(x, z, start.y))
                    .collect();
                waypoints.pop();
                waypoints.push(goal);
                return Some(waypoints);
            }

            let g = g_score.get(&cell).copied().unwrap_or(f32::MAX);
            for next in self.neighbors(cell.0, cell.1) {
                let tentative = g + 1.0;
                if tentative < g_score.get(&next).copied().unwrap_or(f32::MAX) {
                    came_from.insert(next, cell);
                    g_score.insert(next, tentative);
                    open.push(OpenNode {
                        cell: next,
                        f_cost: tentative + heuristic(next),
                    });
                }
            }
        }

        None
    }
}

/// Open-set entry, ordered as a min-heap on `f_cost`.
#[derive(Debug, Clone, Copy)]
struct OpenNode {
    cell: (usize, usize),
    f_cost: f32,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cell == other.cell
    }
}

impl Eq for OpenNode {}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_cost
            .partial_cmp(&self.f_cost)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ============================================================================
// Crowd simulation
// ============================================================================

#[derive(Default)]
struct AgentListeners {
    motion: Option<Box<dyn AgentMotionChangeListener>>,
    state: Option<Box<dyn AgentStateChangeListener>>,
    request: Option<Box<dyn MovementRequestStateChangeListener>>,
}

struct Agent {
    position: Vec3,
    params: AgentParams,
    state: AgentState,
    request: MovementRequestState,
    path: VecDeque<Vec3>,
    velocity: Option<Vec3>,
    user_data: Option<u64>,
    listeners: AgentListeners,
}

impl Agent {
    fn set_request(&mut self, request: MovementRequestState) {
        if self.request != request {
            self.request = request;
            if let Some(listener) = self.listeners.request.as_mut() {
                listener.update(request);
            }
        }
    }

    fn set_state(&mut self, state: AgentState) {
        if self.state != state {
            self.state = state;
            if let Some(listener) = self.listeners.state.as_mut() {
                listener.update(state);
            }
        }
    }

    fn moved(&mut self) {
        if let Some(listener) = self.listeners.motion.as_mut() {
            listener.update(self.position);
        }
    }

    /// Advance along the current path or velocity.
    fn step(&mut self, grid: &NavigationGrid, delta: f32) {
        if let Some(velocity) = self.velocity {
            let next = self.position + velocity * delta;
            if grid.is_walkable_at(next) {
                self.position = next;
                self.moved();
            }
            return;
        }

        if self.path.is_empty() {
            return;
        }

        let mut budget = self.params.max_speed * delta;
        while budget > 0.0 {
            let Some(&waypoint) = self.path.front() else {
                break;
            };
            let to_waypoint = waypoint - self.position;
            let distance = to_waypoint.length();
            if distance <= budget {
                self.position = waypoint;
                self.path.pop_front();
                budget -= distance;
            } else {
                self.position += to_waypoint / distance * budget;
                budget = 0.0;
            }
        }
        self.moved();

        // Arrival clears the request.
        if self.path.is_empty() {
            self.set_request(MovementRequestState::None);
        }
    }
}

struct Crowd {
    navigation_mesh: NavigationMeshHandle,
    config: CrowdConfig,
    agents: HandleVector<Agent, AgentTag>,
}

#[derive(Default)]
struct PathfindingWorld {
    crowds: HandleVector<Crowd, CrowdTag>,
}

/// [`PathfindingEngine`] over [`NavigationGrid`]s.
#[derive(Default)]
pub struct GridPathfindingEngine {
    navigation_meshes: HandleVector<NavigationGrid, NavigationMeshTag>,
    worlds: HandleVector<PathfindingWorld, PathfindingSceneTag>,
}

impl GridPathfindingEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a navigation grid.
    pub fn create_navigation_mesh(&mut self, grid: NavigationGrid) -> NavigationMeshHandle {
        self.navigation_meshes.create(grid)
    }

    pub fn destroy_navigation_mesh(&mut self, navigation_mesh: NavigationMeshHandle) {
        self.navigation_meshes.destroy(navigation_mesh);
    }

    /// Current position of an agent.
    #[must_use]
    pub fn agent_position(
        &self,
        scene: PathfindingSceneHandle,
        crowd: CrowdHandle,
        agent: AgentHandle,
    ) -> Option<Vec3> {
        let world = self.worlds.get(scene)?;
        Some(world.crowds.get(crowd)?.agents.get(agent)?.position)
    }

    fn agent_mut(
        &mut self,
        scene: PathfindingSceneHandle,
        crowd: CrowdHandle,
        agent: AgentHandle,
    ) -> Option<&mut Agent> {
        self.worlds
            .get_mut(scene)?
            .crowds
            .get_mut(crowd)?
            .agents
            .get_mut(agent)
    }
}

impl PathfindingEngine for GridPathfindingEngine {
    fn create_pathfinding_scene(&mut self) -> PathfindingSceneHandle {
        self.worlds.create(PathfindingWorld::default())
    }

    fn destroy_pathfinding_scene(&mut self, scene: PathfindingSceneHandle) {
        self.worlds.destroy(scene);
    }

    fn tick(&mut self, scene: PathfindingSceneHandle, delta: f32) {
        let Some(world) = self.worlds.get_mut(scene) else {
            return;
        };
        for (_, crowd) in world.crowds.iter_mut() {
            let Some(grid) = self.navigation_meshes.get(crowd.navigation_mesh) else {
                continue;
            };
            for (_, agent) in crowd.agents.iter_mut() {
                agent.step(grid, delta);
            }
        }
    }

    fn create_crowd(
        &mut self,
        scene: PathfindingSceneHandle,
        navigation_mesh: NavigationMeshHandle,
        config: &CrowdConfig,
    ) -> CrowdHandle {
        if !self.navigation_meshes.valid(navigation_mesh) {
            log::warn!("unknown navigation mesh {navigation_mesh:?}");
            return CrowdHandle::INVALID;
        }
        self.worlds.get_mut(scene).map_or(CrowdHandle::INVALID, |w| {
            w.crowds.create(Crowd {
                navigation_mesh,
                config: *config,
                agents: HandleVector::new(),
            })
        })
    }

    fn destroy_crowd(&mut self, scene: PathfindingSceneHandle, crowd: CrowdHandle) {
        if let Some(world) = self.worlds.get_mut(scene) {
            world.crowds.destroy(crowd);
        }
    }

    fn create_agent(
        &mut self,
        scene: PathfindingSceneHandle,
        crowd: CrowdHandle,
        position: Vec3,
        params: &AgentParams,
    ) -> AgentHandle {
        let Some(crowd) = self
            .worlds
            .get_mut(scene)
            .and_then(|w| w.crowds.get_mut(crowd))
        else {
            return AgentHandle::INVALID;
        };
        if crowd.agents.len() >= crowd.config.max_agents as usize {
            log::warn!("crowd is full ({} agents)", crowd.config.max_agents);
            return AgentHandle::INVALID;
        }

        let on_mesh = self
            .navigation_meshes
            .get(crowd.navigation_mesh)
            .is_some_and(|grid| grid.is_walkable_at(position));

        crowd.agents.create(Agent {
            position,
            params: *params,
            state: if on_mesh {
                AgentState::Walking
            } else {
                AgentState::Invalid
            },
            request: MovementRequestState::None,
            path: VecDeque::new(),
            velocity: None,
            user_data: None,
            listeners: AgentListeners::default(),
        })
    }

    fn destroy_agent(&mut self, scene: PathfindingSceneHandle, crowd: CrowdHandle, agent: AgentHandle) {
        if let Some(crowd) = self
            .worlds
            .get_mut(scene)
            .and_then(|w| w.crowds.get_mut(crowd))
        {
            crowd.agents.destroy(agent);
        }
    }

    fn request_move_target(
        &mut self,
        scene: PathfindingSceneHandle,
        crowd: CrowdHandle,
        agent: AgentHandle,
        target: Vec3,
    ) {
        let Some(world) = self.worlds.get_mut(scene) else {
            return;
        };
        let Some(crowd) = world.crowds.get_mut(crowd) else {
            return;
        };
        let grid = self.navigation_meshes.get(crowd.navigation_mesh);
        let Some(agent) = crowd.agents.get_mut(agent) else {
            return;
        };

        agent.velocity = None;
        match grid.and_then(|g| g.find_path(agent.position, target)) {
            Some(path) => {
                agent.path = path.into();
                agent.set_state(AgentState::Walking);
                agent.set_request(MovementRequestState::Valid);
            }
            None => {
                agent.path.clear();
                agent.set_request(MovementRequestState::Failed);
            }
        }
    }

    fn request_move_velocity(
        &mut self,
        scene: PathfindingSceneHandle,
        crowd: CrowdHandle,
        agent: AgentHandle,
        velocity: Vec3,
    ) {
        if let Some(agent) = self.agent_mut(scene, crowd, agent) {
            agent.path.clear();
            agent.velocity = Some(velocity);
            agent.set_request(MovementRequestState::Velocity);
        }
    }

    fn reset_move_target(&mut self, scene: PathfindingSceneHandle, crowd: CrowdHandle, agent: AgentHandle) {
        if let Some(agent) = self.agent_mut(scene, crowd, agent) {
            agent.path.clear();
            agent.velocity = None;
            agent.set_request(MovementRequestState::None);
        }
    }

    fn set_motion_change_listener(
        &mut self,
        scene: PathfindingSceneHandle,
        crowd: CrowdHandle,
        agent: AgentHandle,
        listener: Option<Box<dyn AgentMotionChangeListener>>,
    ) {
        if let Some(agent) = self.agent_mut(scene, crowd, agent) {
            agent.listeners.motion = listener;
        }
    }

    fn set_state_change_listener(
        &mut self,
        scene: PathfindingSceneHandle,
        crowd: CrowdHandle,
        agent: AgentHandle,
        listener: Option<Box<dyn AgentStateChangeListener>>,
    ) {
        if let Some(agent) = self.agent_mut(scene, crowd, agent) {
            agent.listeners.state = listener;
        }
    }

    fn set_movement_request_change_listener(
        &mut self,
        scene: PathfindingSceneHandle,
        crowd: CrowdHandle,
        agent: AgentHandle,
        listener: Option<Box<dyn MovementRequestStateChangeListener>>,
    ) {
        if let Some(agent) = self.agent_mut(scene, crowd, agent) {
            agent.listeners.request = listener;
        }
    }

    fn set_user_data(
        &mut self,
        scene: PathfindingSceneHandle,
        crowd: CrowdHandle,
        agent: AgentHandle,
        data: u64,
    ) {
        if let Some(agent) = self.agent_mut(scene, crowd, agent) {
            agent.user_data = Some(data);
        }
    }

    fn user_data(
        &self,
        scene: PathfindingSceneHandle,
        crowd: CrowdHandle,
        agent: AgentHandle,
    ) -> Option<u64> {
        self.worlds
            .get(scene)?
            .crowds
            .get(crowd)?
            .agents
            .get(agent)?
            .user_data
    }
}
