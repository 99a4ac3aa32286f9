//! Headless demo: a falling crate, a walking agent with a lamp, a waving
//! rig and a scripted scene, saved to RON and loaded back.

use std::sync::Arc;

use scene_sync::animation::{Channel, Keyframe};
use scene_sync::engines::graphics::{MeshHandle, TextureHandle};
use scene_sync::engines::pathfinding::{NavigationGrid, NavigationMeshHandle};
use scene_sync::engines::physics::{CollisionShapeHandle, Shape};
use scene_sync::engines::scripting::{
    INITIALIZE, NativeScript, POST_TICK, ScriptError, ScriptValue, ScriptingEngine, TICK,
};
use scene_sync::engines::{
    GridPathfindingEngine, HeadlessGraphicsEngine, NativeScriptingEngine, RapierPhysicsEngine,
    SilentAudioEngine, ThreadWorkerPool,
};
use scene_sync::prelude::*;

const TICKS: u32 = 120;
const DELTA: f32 = 1.0 / 60.0;

/// Counts its ticks and reports every second.
#[derive(Default)]
struct Clock {
    ticks: u32,
}

impl NativeScript for Clock {
    fn call(&mut self, method: &str, _params: &[ScriptValue]) -> Result<ScriptValue, ScriptError> {
        if method == POST_TICK {
            self.ticks += 1;
            if self.ticks % 60 == 0 {
                log::info!("clock: {} ticks", self.ticks);
            }
        }
        Ok(ScriptValue::Void)
    }
}

/// Logs what happens to its entity.
#[derive(Default)]
struct Walker;

impl NativeScript for Walker {
    fn call(&mut self, method: &str, params: &[ScriptValue]) -> Result<ScriptValue, ScriptError> {
        match method {
            INITIALIZE => log::info!("walker attached to {:?}", params.first()),
            TICK => {}
            _ => log::debug!("walker: {method} {params:?}"),
        }
        Ok(ScriptValue::Void)
    }
}

fn engines() -> Result<Engines, SceneError> {
    let physics = shared(RapierPhysicsEngine::new());
    let pathfinding = shared(GridPathfindingEngine::new());
    let resources = shared(ResourceRegistry::new());

    let shape = physics.borrow_mut().create_collision_shape(Shape::Box {
        half_extents: Vec3::splat(0.5),
    });
    let yard = pathfinding
        .borrow_mut()
        .create_navigation_mesh(NavigationGrid::new(16, 16, 1.0));

    let mut scripting = NativeScriptingEngine::new();
    scripting.register_type("demo", "Clock", Clock::default);
    scripting.register_type("demo", "Walker", Walker::default);
    scripting.create_module("demo", &[])?;

    {
        let mut resources = resources.borrow_mut();
        resources.register("crate_shape", shape);
        resources.register("yard", yard);
        resources.register("crate_mesh", MeshHandle::new(0, 1));
        resources.register("crate_texture", TextureHandle::new(0, 1));

        let mut rig = Skeleton::new();
        let root = rig.add_bone(Bone::new("root"), None);
        rig.add_bone(Bone::new("arm").with_translation(Vec3::Y), Some(root));
        resources.add_skeleton("rig", rig);

        let mut wave = AnimationClip::new("wave");
        wave.add_channel(
            1,
            Channel::Rotation(vec![
                Keyframe::new(0.0, Quat::IDENTITY),
                Keyframe::new(0.5, Quat::from_rotation_z(1.0)),
                Keyframe::new(1.0, Quat::IDENTITY),
            ]),
        );
        resources.add_animation("wave", wave);
    }

    let workers = ThreadWorkerPool::new(2).map_err(|e| SceneError::Io(e.to_string()))?;

    Ok(Engines {
        graphics: shared(HeadlessGraphicsEngine::new()),
        physics,
        pathfinding,
        audio: shared(SilentAudioEngine::new()),
        scripting: shared(scripting),
        resources,
        workers: Arc::new(workers),
    })
}

fn populate(scene: &mut Scene) -> Result<(), SceneError> {
    let (shape, yard, mesh, texture, rig, wave): (
        CollisionShapeHandle,
        NavigationMeshHandle,
        MeshHandle,
        TextureHandle,
        SkeletonHandle,
        AnimationHandle,
    ) = {
        let resources = scene.engines().resources.borrow();
        let missing = |name: &str| SceneError::Config(format!("asset '{name}' not registered"));
        (
            resources.handle("crate_shape").ok_or_else(|| missing("crate_shape"))?,
            resources.handle("yard").ok_or_else(|| missing("yard"))?,
            resources.handle("crate_mesh").ok_or_else(|| missing("crate_mesh"))?,
            resources.handle("crate_texture").ok_or_else(|| missing("crate_texture"))?,
            resources.handle("rig").ok_or_else(|| missing("rig"))?,
            resources.handle("wave").ok_or_else(|| missing("wave"))?,
        )
    };

    scene.attach_scene_script("demo", "Clock")?;

    let crate_entity = scene.create_entity();
    scene
        .entity(crate_entity)
        .assign(PositionComponent::new(Vec3::new(0.0, 5.0, 0.0)))
        .assign(OrientationComponent::default())
        .assign(GraphicsComponent::new(mesh, texture))
        .assign(RigidBodyObjectComponent::new(shape).with_mass(2.0));

    let crowd = scene.create_entity();
    scene.assign(crowd, PathfindingCrowdComponent::new(yard));
    let crowd_handle = scene
        .get::<PathfindingCrowdComponent>(crowd)
        .map(|c| c.crowd_handle)
        .unwrap_or_default();

    let walker = scene.create_entity();
    scene
        .entity(walker)
        .assign(PositionComponent::new(Vec3::new(1.5, 0.0, 1.5)))
        .assign(OrientationComponent::default())
        .assign(PathfindingAgentComponent::new(crowd_handle).with_target(Vec3::new(12.5, 0.0, 9.5)));
    scene.attach_script(walker, "demo", "Walker")?;

    let lamp = scene.create_entity();
    scene
        .entity(lamp)
        .assign(PositionComponent::default())
        .assign(PointLightComponent::default());
    scene.set_parent(lamp, walker)?;

    let waver = scene.create_entity();
    scene
        .entity(waver)
        .assign(PositionComponent::new(Vec3::new(-3.0, 0.0, 0.0)))
        .assign(OrientationComponent::default())
        .assign(GraphicsComponent::new(mesh, texture))
        .assign(SkeletonComponent {
            skeleton_handle: rig,
        })
        .assign(AnimationComponent::new(wave));

    Ok(())
}

fn report(scene: &Scene, label: &str) {
    for (entity, position) in scene.ecs().query::<&PositionComponent>().iter() {
        log::info!("{label}: {entity:?} at {}", position.position);
    }
}

fn run() -> Result<(), SceneError> {
    let config = match std::env::args().nth(1) {
        Some(path) => SceneConfig::load_ron(path)?,
        None => SceneConfig::default().with_name("yard"),
    };
    let engines = engines()?;

    let saved = {
        let mut scene = Scene::new(engines.clone(), config.clone());
        populate(&mut scene)?;

        for _ in 0..TICKS {
            scene.tick(DELTA)?;
            scene.render();
        }
        report(&scene, "simulated");
        scene.serialize()?
    };

    let path = std::env::temp_dir().join("scene_demo.ron");
    saved.save_ron(&path)?;
    log::info!("saved {} entities to {}", saved.entity_count(), path.display());

    let mut scene = Scene::new(engines, config);
    scene.deserialize(&SerializedScene::load_ron(&path)?)?;
    scene.tick(DELTA)?;
    report(&scene, "reloaded");
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("demo failed: {e}");
        std::process::exit(1);
    }
}
