//! Recording engines for scene tests
//!
//! Every mock appends a [`Call`] to a shared log, keeps just enough state to
//! hand out and validate handles, and stores the listeners the scene installs
//! so tests can play the engine's side of a callback.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use rustc_hash::FxHashMap;

use crate::assets::ResourceRegistry;
use crate::engines::audio::{AudioEngine, AudioSceneHandle, AudioSceneTag, SoundHandle, SoundSourceHandle};
use crate::engines::graphics::{
    BonesHandle, BonesTag, GraphicsEngine, MeshHandle, PointLightHandle, PointLightTag,
    RenderSceneHandle, RenderSceneTag, RenderableHandle, RenderableTag, TerrainHandle,
    TerrainRenderableHandle, TerrainRenderableTag, TextureHandle,
};
use crate::engines::pathfinding::{
    AgentHandle, AgentMotionChangeListener, AgentParams, AgentState, AgentStateChangeListener,
    AgentTag, CrowdConfig, CrowdHandle, CrowdTag, MovementRequestState,
    MovementRequestStateChangeListener, NavigationMeshHandle, PathfindingEngine,
    PathfindingSceneHandle, PathfindingSceneTag,
};
use crate::engines::physics::{
    CollisionShapeHandle, GhostObjectHandle, GhostObjectTag, MotionChangeListener,
    PhysicsEngine, PhysicsObjectHandle, PhysicsSceneHandle, PhysicsSceneTag, Ray, RaycastHit,
    RigidBodyDesc, RigidBodyObjectHandle, RigidBodyObjectTag,
};
use crate::engines::scripting::{
    ExecutionContextHandle, ExecutionContextTag, ModuleHandle, ModuleTag, ScriptError,
    ScriptObjectHandle, ScriptObjectTag, ScriptValue, ScriptingEngine,
};
use crate::engines::{Engines, InlineWorkerPool, Shared, shared};
use crate::handles::HandleVector;
use crate::scene::{Scene, SceneConfig};

pub type CallLog = Rc<RefCell<Vec<Call>>>;

/// One engine call made by a scene.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateRenderable {
        renderable: RenderableHandle,
        mesh: MeshHandle,
        position: Vec3,
        orientation: Quat,
    },
    DestroyRenderable(RenderableHandle),
    RenderablePosition(RenderableHandle, Vec3),
    RenderableRotation(RenderableHandle, Quat),
    CreatePointLight(PointLightHandle),
    DestroyPointLight(PointLightHandle),
    CreateTerrainRenderable(TerrainRenderableHandle),
    DestroyTerrainRenderable(TerrainRenderableHandle),
    CreateBones(BonesHandle),
    DestroyBones(BonesHandle),
    AttachBones(RenderableHandle, BonesHandle),
    DetachBones(RenderableHandle),
    UpdateBones(BonesHandle, usize),
    Render,

    PhysicsTick,
    CreateRigidBody {
        body: RigidBodyObjectHandle,
        position: Vec3,
    },
    DestroyRigidBody(RigidBodyObjectHandle),
    CreateGhost(GhostObjectHandle),
    DestroyGhost(GhostObjectHandle),
    PhysicsPosition(PhysicsObjectHandle, Vec3),
    PhysicsRotation(PhysicsObjectHandle, Quat),
    PhysicsUserData(PhysicsObjectHandle, u64),
    MotionListener(PhysicsObjectHandle),

    PathfindingTick,
    CreateCrowd(CrowdHandle),
    DestroyCrowd(CrowdHandle),
    CreateAgent {
        agent: AgentHandle,
        crowd: CrowdHandle,
        position: Vec3,
    },
    DestroyAgent(AgentHandle),
    RequestMoveTarget(AgentHandle, Vec3),
    AgentUserData(AgentHandle, u64),
    AgentListener(AgentHandle),

    CreateScriptObject(ScriptObjectHandle, String),
    Execute(ScriptObjectHandle, String),
    ReleaseScriptObject(ScriptObjectHandle),

    AudioTick,
    AudioRender,
}

impl Call {
    /// True for calls that tick an engine rather than react to the scene.
    pub fn is_tick(&self) -> bool {
        matches!(
            self,
            Self::PhysicsTick | Self::PathfindingTick | Self::AudioTick | Self::AudioRender | Self::Render
        )
    }
}

// ============================================================================
// Graphics
// ============================================================================

pub struct MockGraphics {
    log: CallLog,
    scenes: HandleVector<(), RenderSceneTag>,
    renderables: HandleVector<(Vec3, Quat), RenderableTag>,
    point_lights: HandleVector<Vec3, PointLightTag>,
    terrains: HandleVector<TerrainHandle, TerrainRenderableTag>,
    bones: HandleVector<Vec<Mat4>, BonesTag>,
}

impl MockGraphics {
    fn new(log: CallLog) -> Self {
        Self {
            log,
            scenes: HandleVector::new(),
            renderables: HandleVector::new(),
            point_lights: HandleVector::new(),
            terrains: HandleVector::new(),
            bones: HandleVector::new(),
        }
    }

    pub fn renderable(&self, renderable: RenderableHandle) -> Option<(Vec3, Quat)> {
        self.renderables.get(renderable).copied()
    }

    pub fn renderable_count(&self) -> usize {
        self.renderables.len()
    }

    pub fn bones(&self, bones: BonesHandle) -> Option<&[Mat4]> {
        self.bones.get(bones).map(Vec::as_slice)
    }

    fn record(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }
}

impl GraphicsEngine for MockGraphics {
    fn create_render_scene(&mut self) -> RenderSceneHandle {
        self.scenes.create(())
    }

    fn destroy_render_scene(&mut self, scene: RenderSceneHandle) {
        self.scenes.destroy(scene);
    }

    fn create_renderable(
        &mut self,
        _scene: RenderSceneHandle,
        mesh: MeshHandle,
        _texture: TextureHandle,
        position: Vec3,
        orientation: Quat,
        _scale: Vec3,
    ) -> RenderableHandle {
        let renderable = self.renderables.create((position, orientation));
        self.record(Call::CreateRenderable {
            renderable,
            mesh,
            position,
            orientation,
        });
        renderable
    }

    fn destroy_renderable(&mut self, _scene: RenderSceneHandle, renderable: RenderableHandle) {
        self.renderables.destroy(renderable);
        self.record(Call::DestroyRenderable(renderable));
    }

    fn position(&mut self, _scene: RenderSceneHandle, renderable: RenderableHandle, position: Vec3) {
        if let Some(transform) = self.renderables.get_mut(renderable) {
            transform.0 = position;
        }
        self.record(Call::RenderablePosition(renderable, position));
    }

    fn rotation(&mut self, _scene: RenderSceneHandle, renderable: RenderableHandle, orientation: Quat) {
        if let Some(transform) = self.renderables.get_mut(renderable) {
            transform.1 = orientation;
        }
        self.record(Call::RenderableRotation(renderable, orientation));
    }

    fn create_point_light(&mut self, _scene: RenderSceneHandle, position: Vec3) -> PointLightHandle {
        let light = self.point_lights.create(position);
        self.record(Call::CreatePointLight(light));
        light
    }

    fn destroy_point_light(&mut self, _scene: RenderSceneHandle, light: PointLightHandle) {
        self.point_lights.destroy(light);
        self.record(Call::DestroyPointLight(light));
    }

    fn create_terrain_renderable(
        &mut self,
        _scene: RenderSceneHandle,
        terrain: TerrainHandle,
    ) -> TerrainRenderableHandle {
        let renderable = self.terrains.create(terrain);
        self.record(Call::CreateTerrainRenderable(renderable));
        renderable
    }

    fn destroy_terrain_renderable(&mut self, _scene: RenderSceneHandle, terrain: TerrainRenderableHandle) {
        self.terrains.destroy(terrain);
        self.record(Call::DestroyTerrainRenderable(terrain));
    }

    fn create_bones(&mut self, _scene: RenderSceneHandle, max_bones: u32) -> BonesHandle {
        let bones = self.bones.create(Vec::with_capacity(max_bones as usize));
        self.record(Call::CreateBones(bones));
        bones
    }

    fn destroy_bones(&mut self, _scene: RenderSceneHandle, bones: BonesHandle) {
        self.bones.destroy(bones);
        self.record(Call::DestroyBones(bones));
    }

    fn attach_bones(&mut self, _scene: RenderSceneHandle, renderable: RenderableHandle, bones: BonesHandle) {
        self.record(Call::AttachBones(renderable, bones));
    }

    fn detach_bones(&mut self, _scene: RenderSceneHandle, renderable: RenderableHandle) {
        self.record(Call::DetachBones(renderable));
    }

    fn update_bones(&mut self, _scene: RenderSceneHandle, bones: BonesHandle, transforms: &[Mat4]) {
        if let Some(palette) = self.bones.get_mut(bones) {
            palette.clear();
            palette.extend_from_slice(transforms);
        }
        self.record(Call::UpdateBones(bones, transforms.len()));
    }

    fn render(&mut self, _scene: RenderSceneHandle) {
        self.record(Call::Render);
    }
}

// ============================================================================
// Physics
// ============================================================================

#[derive(Default)]
struct MockObject {
    user_data: Option<u64>,
    listener: Option<Box<dyn MotionChangeListener>>,
}

pub struct MockPhysics {
    log: CallLog,
    scenes: HandleVector<(), PhysicsSceneTag>,
    bodies: HandleVector<MockObject, RigidBodyObjectTag>,
    ghosts: HandleVector<MockObject, GhostObjectTag>,
    hit: Option<RaycastHit>,
}

impl MockPhysics {
    fn new(log: CallLog) -> Self {
        Self {
            log,
            scenes: HandleVector::new(),
            bodies: HandleVector::new(),
            ghosts: HandleVector::new(),
            hit: None,
        }
    }

    /// Make every raycast report `hit`.
    pub fn set_raycast_hit(&mut self, hit: Option<RaycastHit>) {
        self.hit = hit;
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn ghost_count(&self) -> usize {
        self.ghosts.len()
    }

    fn object(&self, object: PhysicsObjectHandle) -> Option<&MockObject> {
        match object {
            PhysicsObjectHandle::RigidBody(body) => self.bodies.get(body),
            PhysicsObjectHandle::Ghost(ghost) => self.ghosts.get(ghost),
        }
    }

    fn object_mut(&mut self, object: PhysicsObjectHandle) -> Option<&mut MockObject> {
        match object {
            PhysicsObjectHandle::RigidBody(body) => self.bodies.get_mut(body),
            PhysicsObjectHandle::Ghost(ghost) => self.ghosts.get_mut(ghost),
        }
    }

    /// Report simulated motion of `object` to its listener.
    pub fn fire_motion(&mut self, object: impl Into<PhysicsObjectHandle>, position: Vec3, orientation: Quat) {
        if let Some(listener) = self
            .object_mut(object.into())
            .and_then(|o| o.listener.as_mut())
        {
            listener.update(position, orientation);
        }
    }

    fn record(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }
}

impl PhysicsEngine for MockPhysics {
    fn create_physics_scene(&mut self) -> PhysicsSceneHandle {
        self.scenes.create(())
    }

    fn destroy_physics_scene(&mut self, scene: PhysicsSceneHandle) {
        self.scenes.destroy(scene);
    }

    fn tick(&mut self, _scene: PhysicsSceneHandle, _delta: f32) {
        self.record(Call::PhysicsTick);
    }

    fn create_rigid_body_object(
        &mut self,
        _scene: PhysicsSceneHandle,
        _shape: CollisionShapeHandle,
        position: Vec3,
        _orientation: Quat,
        _desc: RigidBodyDesc,
    ) -> RigidBodyObjectHandle {
        let body = self.bodies.create(MockObject::default());
        self.record(Call::CreateRigidBody { body, position });
        body
    }

    fn destroy_rigid_body_object(&mut self, _scene: PhysicsSceneHandle, object: RigidBodyObjectHandle) {
        self.bodies.destroy(object);
        self.record(Call::DestroyRigidBody(object));
    }

    fn create_ghost_object(
        &mut self,
        _scene: PhysicsSceneHandle,
        _shape: CollisionShapeHandle,
        _position: Vec3,
        _orientation: Quat,
    ) -> GhostObjectHandle {
        let ghost = self.ghosts.create(MockObject::default());
        self.record(Call::CreateGhost(ghost));
        ghost
    }

    fn destroy_ghost_object(&mut self, _scene: PhysicsSceneHandle, object: GhostObjectHandle) {
        self.ghosts.destroy(object);
        self.record(Call::DestroyGhost(object));
    }

    fn position(&mut self, _scene: PhysicsSceneHandle, object: PhysicsObjectHandle, position: Vec3) {
        self.record(Call::PhysicsPosition(object, position));
    }

    fn rotation(&mut self, _scene: PhysicsSceneHandle, object: PhysicsObjectHandle, orientation: Quat) {
        self.record(Call::PhysicsRotation(object, orientation));
    }

    fn set_user_data(&mut self, _scene: PhysicsSceneHandle, object: PhysicsObjectHandle, data: u64) {
        if let Some(o) = self.object_mut(object) {
            o.user_data = Some(data);
        }
        self.record(Call::PhysicsUserData(object, data));
    }

    fn user_data(&self, _scene: PhysicsSceneHandle, object: PhysicsObjectHandle) -> Option<u64> {
        self.object(object)?.user_data
    }

    fn set_motion_change_listener(
        &mut self,
        _scene: PhysicsSceneHandle,
        object: PhysicsObjectHandle,
        listener: Option<Box<dyn MotionChangeListener>>,
    ) {
        if let Some(o) = self.object_mut(object) {
            o.listener = listener;
        }
        self.record(Call::MotionListener(object));
    }

    fn raycast(&self, _scene: PhysicsSceneHandle, _ray: Ray) -> Option<RaycastHit> {
        self.hit
    }
}

// ============================================================================
// Pathfinding
// ============================================================================

#[derive(Default)]
struct MockAgent {
    user_data: Option<u64>,
    motion: Option<Box<dyn AgentMotionChangeListener>>,
    state: Option<Box<dyn AgentStateChangeListener>>,
    request: Option<Box<dyn MovementRequestStateChangeListener>>,
}

pub struct MockPathfinding {
    log: CallLog,
    scenes: HandleVector<(), PathfindingSceneTag>,
    crowds: HandleVector<NavigationMeshHandle, CrowdTag>,
    agents: HandleVector<MockAgent, AgentTag>,
}

impl MockPathfinding {
    fn new(log: CallLog) -> Self {
        Self {
            log,
            scenes: HandleVector::new(),
            crowds: HandleVector::new(),
            agents: HandleVector::new(),
        }
    }

    pub fn crowd_count(&self) -> usize {
        self.crowds.len()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn fire_agent_motion(&mut self, agent: AgentHandle, position: Vec3) {
        if let Some(listener) = self.agents.get_mut(agent).and_then(|a| a.motion.as_mut()) {
            listener.update(position);
        }
    }

    pub fn fire_agent_state(&mut self, agent: AgentHandle, state: AgentState) {
        if let Some(listener) = self.agents.get_mut(agent).and_then(|a| a.state.as_mut()) {
            listener.update(state);
        }
    }

    pub fn fire_movement_request(&mut self, agent: AgentHandle, state: MovementRequestState) {
        if let Some(listener) = self.agents.get_mut(agent).and_then(|a| a.request.as_mut()) {
            listener.update(state);
        }
    }

    fn record(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }
}

impl PathfindingEngine for MockPathfinding {
    fn create_pathfinding_scene(&mut self) -> PathfindingSceneHandle {
        self.scenes.create(())
    }

    fn destroy_pathfinding_scene(&mut self, scene: PathfindingSceneHandle) {
        self.scenes.destroy(scene);
    }

    fn tick(&mut self, _scene: PathfindingSceneHandle, _delta: f32) {
        self.record(Call::PathfindingTick);
    }

    fn create_crowd(
        &mut self,
        _scene: PathfindingSceneHandle,
        navigation_mesh: NavigationMeshHandle,
        _config: &CrowdConfig,
    ) -> CrowdHandle {
        let crowd = self.crowds.create(navigation_mesh);
        self.record(Call::CreateCrowd(crowd));
        crowd
    }

    fn destroy_crowd(&mut self, _scene: PathfindingSceneHandle, crowd: CrowdHandle) {
        self.crowds.destroy(crowd);
        self.record(Call::DestroyCrowd(crowd));
    }

    fn create_agent(
        &mut self,
        _scene: PathfindingSceneHandle,
        crowd: CrowdHandle,
        position: Vec3,
        _params: &AgentParams,
    ) -> AgentHandle {
        if !self.crowds.valid(crowd) {
            return AgentHandle::INVALID;
        }
        let agent = self.agents.create(MockAgent::default());
        self.record(Call::CreateAgent {
            agent,
            crowd,
            position,
        });
        agent
    }

    fn destroy_agent(&mut self, _scene: PathfindingSceneHandle, _crowd: CrowdHandle, agent: AgentHandle) {
        self.agents.destroy(agent);
        self.record(Call::DestroyAgent(agent));
    }

    fn request_move_target(
        &mut self,
        _scene: PathfindingSceneHandle,
        _crowd: CrowdHandle,
        agent: AgentHandle,
        target: Vec3,
    ) {
        self.record(Call::RequestMoveTarget(agent, target));
    }

    fn request_move_velocity(
        &mut self,
        _scene: PathfindingSceneHandle,
        _crowd: CrowdHandle,
        _agent: AgentHandle,
        _velocity: Vec3,
    ) {
    }

    fn reset_move_target(&mut self, _scene: PathfindingSceneHandle, _crowd: CrowdHandle, _agent: AgentHandle) {}

    fn set_motion_change_listener(
        &mut self,
        _scene: PathfindingSceneHandle,
        _crowd: CrowdHandle,
        agent: AgentHandle,
        listener: Option<Box<dyn AgentMotionChangeListener>>,
    ) {
        if let Some(a) = self.agents.get_mut(agent) {
            a.motion = listener;
        }
        self.record(Call::AgentListener(agent));
    }

    fn set_state_change_listener(
        &mut self,
        _scene: PathfindingSceneHandle,
        _crowd: CrowdHandle,
        agent: AgentHandle,
        listener: Option<Box<dyn AgentStateChangeListener>>,
    ) {
        if let Some(a) = self.agents.get_mut(agent) {
            a.state = listener;
        }
        self.record(Call::AgentListener(agent));
    }

    fn set_movement_request_change_listener(
        &mut self,
        _scene: PathfindingSceneHandle,
        _crowd: CrowdHandle,
        agent: AgentHandle,
        listener: Option<Box<dyn MovementRequestStateChangeListener>>,
    ) {
        if let Some(a) = self.agents.get_mut(agent) {
            a.request = listener;
        }
        self.record(Call::AgentListener(agent));
    }

    fn set_user_data(
        &mut self,
        _scene: PathfindingSceneHandle,
        _crowd: CrowdHandle,
        agent: AgentHandle,
        data: u64,
    ) {
        if let Some(a) = self.agents.get_mut(agent) {
            a.user_data = Some(data);
        }
        self.record(Call::AgentUserData(agent, data));
    }

    fn user_data(
        &self,
        _scene: PathfindingSceneHandle,
        _crowd: CrowdHandle,
        agent: AgentHandle,
    ) -> Option<u64> {
        self.agents.get(agent)?.user_data
    }
}

// ============================================================================
// Scripting
// ============================================================================

/// Modules are created with the type names they contain as their sources.
pub struct MockScripting {
    log: CallLog,
    modules: HandleVector<Vec<String>, ModuleTag>,
    module_names: FxHashMap<String, ModuleHandle>,
    contexts: HandleVector<(), ExecutionContextTag>,
    objects: HandleVector<String, ScriptObjectTag>,
    failing: Option<String>,
}

impl MockScripting {
    fn new(log: CallLog) -> Self {
        Self {
            log,
            modules: HandleVector::new(),
            module_names: FxHashMap::default(),
            contexts: HandleVector::new(),
            objects: HandleVector::new(),
            failing: None,
        }
    }

    /// Load `name` with the given script types.
    pub fn add_module(&mut self, name: &str, types: &[&str]) -> ModuleHandle {
        let sources: Vec<String> = types.iter().map(|t| (*t).to_owned()).collect();
        match self.create_module(name, &sources) {
            Ok(module) => module,
            Err(error) => panic!("{error}"),
        }
    }

    /// Make every call of `method` fail from now on.
    pub fn fail_on(&mut self, method: &str) {
        self.failing = Some(method.to_owned());
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn record(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }
}

impl ScriptingEngine for MockScripting {
    fn create_module(&mut self, name: &str, sources: &[String]) -> Result<ModuleHandle, ScriptError> {
        if let Some(old) = self.module_names.remove(name) {
            self.modules.destroy(old);
        }
        let module = self.modules.create(sources.to_vec());
        self.module_names.insert(name.to_owned(), module);
        Ok(module)
    }

    fn destroy_module(&mut self, module: ModuleHandle) {
        self.modules.destroy(module);
        self.module_names.retain(|_, m| *m != module);
    }

    fn module(&self, name: &str) -> Option<ModuleHandle> {
        self.module_names.get(name).copied()
    }

    fn create_execution_context(&mut self) -> ExecutionContextHandle {
        self.contexts.create(())
    }

    fn destroy_execution_context(&mut self, context: ExecutionContextHandle) {
        self.contexts.destroy(context);
    }

    fn create_uninitialized_script_object(
        &mut self,
        module: ModuleHandle,
        type_name: &str,
    ) -> Result<ScriptObjectHandle, ScriptError> {
        let types = self
            .modules
            .get(module)
            .ok_or_else(|| ScriptError::ModuleNotFound(format!("{module:?}")))?;
        if !types.iter().any(|t| t == type_name) {
            return Err(ScriptError::TypeNotFound {
                module: format!("{module:?}"),
                type_name: type_name.to_owned(),
            });
        }
        let object = self.objects.create(type_name.to_owned());
        self.record(Call::CreateScriptObject(object, type_name.to_owned()));
        Ok(object)
    }

    fn execute(
        &mut self,
        _context: ExecutionContextHandle,
        object: ScriptObjectHandle,
        method: &str,
        _params: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptError> {
        if !self.objects.valid(object) {
            return Err(ScriptError::InvalidObject(object));
        }
        self.record(Call::Execute(object, method.to_owned()));
        if self.failing.as_deref() == Some(method) {
            return Err(ScriptError::Execution {
                method: method.to_owned(),
                message: "scripted failure".to_owned(),
            });
        }
        Ok(ScriptValue::Void)
    }

    fn release_script_object(&mut self, object: ScriptObjectHandle) {
        self.objects.destroy(object);
        self.record(Call::ReleaseScriptObject(object));
    }
}

// ============================================================================
// Audio
// ============================================================================

pub struct MockAudio {
    log: CallLog,
    scenes: HandleVector<(), AudioSceneTag>,
}

impl AudioEngine for MockAudio {
    fn create_audio_scene(&mut self) -> AudioSceneHandle {
        self.scenes.create(())
    }

    fn destroy_audio_scene(&mut self, scene: AudioSceneHandle) {
        self.scenes.destroy(scene);
    }

    fn play(&mut self, _scene: AudioSceneHandle, _sound: SoundHandle, _position: Option<Vec3>) -> SoundSourceHandle {
        SoundSourceHandle::INVALID
    }

    fn tick(&mut self, _scene: AudioSceneHandle, _delta: f32) {
        self.log.borrow_mut().push(Call::AudioTick);
    }

    fn render(&mut self, _scene: AudioSceneHandle) {
        self.log.borrow_mut().push(Call::AudioRender);
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A set of recording engines sharing one call log.
pub struct Mocks {
    pub log: CallLog,
    pub graphics: Shared<MockGraphics>,
    pub physics: Shared<MockPhysics>,
    pub pathfinding: Shared<MockPathfinding>,
    pub scripting: Shared<MockScripting>,
    pub audio: Shared<MockAudio>,
    pub resources: Shared<ResourceRegistry>,
}

impl Mocks {
    pub fn new() -> Self {
        let log = CallLog::default();
        Self {
            graphics: shared(MockGraphics::new(log.clone())),
            physics: shared(MockPhysics::new(log.clone())),
            pathfinding: shared(MockPathfinding::new(log.clone())),
            scripting: shared(MockScripting::new(log.clone())),
            audio: shared(MockAudio {
                log: log.clone(),
                scenes: HandleVector::new(),
            }),
            resources: shared(ResourceRegistry::new()),
            log,
        }
    }

    pub fn engines(&self) -> Engines {
        Engines {
            graphics: self.graphics.clone(),
            physics: self.physics.clone(),
            pathfinding: self.pathfinding.clone(),
            audio: self.audio.clone(),
            scripting: self.scripting.clone(),
            resources: self.resources.clone(),
            workers: Arc::new(InlineWorkerPool),
        }
    }

    pub fn scene(&self) -> Scene {
        Scene::new(self.engines(), SceneConfig::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }

    /// Calls other than engine ticks and rendering.
    pub fn sync_calls(&self) -> Vec<Call> {
        self.log.borrow().iter().filter(|c| !c.is_tick()).cloned().collect()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.log.borrow().iter().filter(|c| matches(c)).count()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }
}
