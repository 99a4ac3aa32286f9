//! Rendering collaborator
//!
//! The scene only ever talks to the renderer through [`GraphicsEngine`] and
//! per-scene handles. [`HeadlessGraphicsEngine`] keeps everything in memory,
//! which is enough to drive a scene without a GPU and to inspect what the
//! scene asked for.

use glam::{Mat4, Quat, Vec3};

use crate::handles::HandleVector;

crate::handle_types! {
    /// A render scene owned by a graphics engine.
    RenderSceneHandle => RenderSceneTag;
    /// A drawable instance of a mesh inside a render scene.
    RenderableHandle => RenderableTag;
    /// Mesh asset.
    MeshHandle => MeshTag;
    /// Texture asset.
    TextureHandle => TextureTag;
    /// Point light inside a render scene.
    PointLightHandle => PointLightTag;
    /// Terrain asset.
    TerrainHandle => TerrainTag;
    /// Drawable instance of a terrain inside a render scene.
    TerrainRenderableHandle => TerrainRenderableTag;
    /// Bone palette attached to a renderable.
    BonesHandle => BonesTag;
}

/// Narrow interface to a rendering backend.
pub trait GraphicsEngine {
    /// Create an empty render scene.
    fn create_render_scene(&mut self) -> RenderSceneHandle;
    /// Destroy a render scene and everything inside it.
    fn destroy_render_scene(&mut self, scene: RenderSceneHandle);

    /// Create a renderable for `mesh`/`texture` at the given transform.
    fn create_renderable(
        &mut self,
        scene: RenderSceneHandle,
        mesh: MeshHandle,
        texture: TextureHandle,
        position: Vec3,
        orientation: Quat,
        scale: Vec3,
    ) -> RenderableHandle;
    fn destroy_renderable(&mut self, scene: RenderSceneHandle, renderable: RenderableHandle);
    /// Move a renderable.
    fn position(&mut self, scene: RenderSceneHandle, renderable: RenderableHandle, position: Vec3);
    /// Rotate a renderable.
    fn rotation(&mut self, scene: RenderSceneHandle, renderable: RenderableHandle, orientation: Quat);

    fn create_point_light(&mut self, scene: RenderSceneHandle, position: Vec3) -> PointLightHandle;
    fn destroy_point_light(&mut self, scene: RenderSceneHandle, light: PointLightHandle);

    fn create_terrain_renderable(
        &mut self,
        scene: RenderSceneHandle,
        terrain: TerrainHandle,
    ) -> TerrainRenderableHandle;
    fn destroy_terrain_renderable(&mut self, scene: RenderSceneHandle, terrain: TerrainRenderableHandle);

    /// Allocate a bone palette with room for `max_bones` matrices.
    fn create_bones(&mut self, scene: RenderSceneHandle, max_bones: u32) -> BonesHandle;
    fn destroy_bones(&mut self, scene: RenderSceneHandle, bones: BonesHandle);
    fn attach_bones(&mut self, scene: RenderSceneHandle, renderable: RenderableHandle, bones: BonesHandle);
    fn detach_bones(&mut self, scene: RenderSceneHandle, renderable: RenderableHandle);
    /// Upload skinning matrices into a bone palette. Render thread only.
    fn update_bones(&mut self, scene: RenderSceneHandle, bones: BonesHandle, transforms: &[Mat4]);

    /// Draw one frame of the scene.
    fn render(&mut self, scene: RenderSceneHandle);
}

// ============================================================================
// Headless backend
// ============================================================================

/// A renderable as tracked by [`HeadlessGraphicsEngine`].
#[derive(Debug, Clone)]
pub struct HeadlessRenderable {
    pub mesh: MeshHandle,
    pub texture: TextureHandle,
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: Vec3,
    pub bones: Option<BonesHandle>,
}

/// Contents of one headless render scene.
#[derive(Debug, Default)]
pub struct HeadlessRenderScene {
    pub renderables: HandleVector<HeadlessRenderable, RenderableTag>,
    pub point_lights: HandleVector<Vec3, PointLightTag>,
    pub terrains: HandleVector<TerrainHandle, TerrainRenderableTag>,
    pub bones: HandleVector<Vec<Mat4>, BonesTag>,
    /// Frames rendered so far
    pub frames: u64,
}

/// In-memory [`GraphicsEngine`] with no GPU behind it.
#[derive(Debug, Default)]
pub struct HeadlessGraphicsEngine {
    scenes: HandleVector<HeadlessRenderScene, RenderSceneTag>,
}

impl HeadlessGraphicsEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect a render scene.
    #[must_use]
    pub fn scene(&self, scene: RenderSceneHandle) -> Option<&HeadlessRenderScene> {
        self.scenes.get(scene)
    }

    /// Inspect a renderable.
    #[must_use]
    pub fn renderable(
        &self,
        scene: RenderSceneHandle,
        renderable: RenderableHandle,
    ) -> Option<&HeadlessRenderable> {
        self.scenes.get(scene)?.renderables.get(renderable)
    }

    fn renderable_mut(
        &mut self,
        scene: RenderSceneHandle,
        renderable: RenderableHandle,
    ) -> Option<&mut HeadlessRenderable> {
        self.scenes.get_mut(scene)?.renderables.get_mut(renderable)
    }
}

impl GraphicsEngine for HeadlessGraphicsEngine {
    fn create_render_scene(&mut self) -> RenderSceneHandle {
        self.scenes.create(HeadlessRenderScene::default())
    }

    fn destroy_render_scene(&mut self, scene: RenderSceneHandle) {
        self.scenes.destroy(scene);
    }

    fn create_renderable(
        &mut self,
        scene: RenderSceneHandle,
        mesh: MeshHandle,
        texture: TextureHandle,
        position: Vec3,
        orientation: Quat,
        scale: Vec3,
    ) -> RenderableHandle {
        let Some(render_scene) = self.scenes.get_mut(scene) else {
            log::warn!("create_renderable on unknown render scene {scene:?}");
            return RenderableHandle::INVALID;
        };
        render_scene.renderables.create(HeadlessRenderable {
            mesh,
            texture,
            position,
            orientation,
            scale,
            bones: None,
        })
    }

    fn destroy_renderable(&mut self, scene: RenderSceneHandle, renderable: RenderableHandle) {
        if let Some(render_scene) = self.scenes.get_mut(scene) {
            render_scene.renderables.destroy(renderable);
        }
    }

    fn position(&mut self, scene: RenderSceneHandle, renderable: RenderableHandle, position: Vec3) {
        if let Some(r) = self.renderable_mut(scene, renderable) {
            r.position = position;
        }
    }

    fn rotation(&mut self, scene: RenderSceneHandle, renderable: RenderableHandle, orientation: Quat) {
        if let Some(r) = self.renderable_mut(scene, renderable) {
            r.orientation = orientation;
        }
    }

    fn create_point_light(&mut self, scene: RenderSceneHandle, position: Vec3) -> PointLightHandle {
        self.scenes
            .get_mut(scene)
            .map_or(PointLightHandle::INVALID, |s| s.point_lights.create(position))
    }

    fn destroy_point_light(&mut self, scene: RenderSceneHandle, light: PointLightHandle) {
        if let Some(render_scene) = self.scenes.get_mut(scene) {
            render_scene.point_lights.destroy(light);
        }
    }

    fn create_terrain_renderable(
        &mut self,
        scene: RenderSceneHandle,
        terrain: TerrainHandle,
    ) -> TerrainRenderableHandle {
        self.scenes
            .get_mut(scene)
            .map_or(TerrainRenderableHandle::INVALID, |s| s.terrains.create(terrain))
    }

    fn destroy_terrain_renderable(&mut self, scene: RenderSceneHandle, terrain: TerrainRenderableHandle) {
        if let Some(render_scene) = self.scenes.get_mut(scene) {
            render_scene.terrains.destroy(terrain);
        }
    }

    fn create_bones(&mut self, scene: RenderSceneHandle, max_bones: u32) -> BonesHandle {
        self.scenes.get_mut(scene).map_or(BonesHandle::INVALID, |s| {
            s.bones.create(vec![Mat4::IDENTITY; max_bones as usize])
        })
    }

    fn destroy_bones(&mut self, scene: RenderSceneHandle, bones: BonesHandle) {
        if let Some(render_scene) = self.scenes.get_mut(scene) {
            render_scene.bones.destroy(bones);
        }
    }

    fn attach_bones(&mut self, scene: RenderSceneHandle, renderable: RenderableHandle, bones: BonesHandle) {
        if let Some(r) = self.renderable_mut(scene, renderable) {
            r.bones = Some(bones);
        }
    }

    fn detach_bones(&mut self, scene: RenderSceneHandle, renderable: RenderableHandle) {
        if let Some(r) = self.renderable_mut(scene, renderable) {
            r.bones = None;
        }
    }

    fn update_bones(&mut self, scene: RenderSceneHandle, bones: BonesHandle, transforms: &[Mat4]) {
        let Some(palette) = self
            .scenes
            .get_mut(scene)
            .and_then(|s| s.bones.get_mut(bones))
        else {
            return;
        };
        let count = transforms.len().min(palette.len());
        palette[..count].copy_from_slice(&transforms[..count]);
    }

    fn render(&mut self, scene: RenderSceneHandle) {
        if let Some(render_scene) = self.scenes.get_mut(scene) {
            render_scene.frames += 1;
            log::trace!(
                "rendered frame {} ({} renderables)",
                render_scene.frames,
                render_scene.renderables.len()
            );
        }
    }
}
