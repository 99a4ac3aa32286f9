//! Per-frame update
//!
//! One active tick runs, in order: scene `preTick`, engine ticks, engine
//! feedback, entity `tick`, scene `postTick`, queued commands, animation,
//! hierarchy, reconciliation. An inactive tick only applies queued changes
//! and reconciles.

use std::mem;

use super::{Scene, SceneError};
use crate::animation::{AnimationClip, PoseJob, RenderQueue};
use crate::ecs::{AnimationComponent, GraphicsComponent, SkeletonComponent};
use crate::engines::scripting::{POST_TICK, PRE_TICK, TICK};

impl Scene {
    /// Advance the scene by `delta` seconds.
    ///
    /// # Errors
    ///
    /// Returns the first script error; the rest of the tick is skipped.
    pub fn tick(&mut self, delta: f32) -> Result<(), SceneError> {
        if !self.config.active {
            self.drain_commands();
            self.apply_sync_events();
            self.propagate_hierarchy();
            return self.reconcile();
        }

        self.call_scene_script(PRE_TICK, delta)?;

        self.engines.audio.borrow_mut().tick(self.audio_scene, delta);
        self.engines.physics.borrow_mut().tick(self.physics_scene, delta);
        self.engines
            .pathfinding
            .borrow_mut()
            .tick(self.pathfinding_scene, delta);
        self.apply_sync_events();

        self.call_entity_scripts(TICK, delta)?;
        self.call_scene_script(POST_TICK, delta)?;

        self.drain_commands();
        self.animate(delta);
        self.propagate_hierarchy();
        self.reconcile()
    }

    /// Render-thread end of the bone upload queue, for callers that upload
    /// bones themselves instead of through [`render`](Self::render).
    #[must_use]
    pub fn render_queue(&self) -> RenderQueue {
        self.animation.render_queue()
    }

    /// Upload computed poses, then draw the graphics scene and mix the audio
    /// scene.
    pub fn render(&self) {
        let queue = self.animation.render_queue();
        {
            let mut graphics = self.engines.graphics.borrow_mut();
            let uploaded = queue.drain(|bones, transforms| {
                graphics.update_bones(self.render_scene, bones, transforms);
            });
            if uploaded > 0 {
                log::trace!("uploaded {uploaded} bone palettes");
            }
            graphics.render(self.render_scene);
        }
        self.engines.audio.borrow_mut().render(self.audio_scene);
    }

    /// Advance animations and dispatch pose jobs for every animated entity
    /// that has no pose in flight.
    fn animate(&mut self, delta: f32) {
        for (entity, buffer) in self.animation.reclaim() {
            if let Some(mut animation) = self.ecs.get_mut::<AnimationComponent>(entity) {
                animation.transformations = buffer;
            }
        }

        let frames_per_second = self.config.frames_per_second;
        let resources = self.engines.resources.borrow();
        for entity in self.ecs.entities_with::<(&GraphicsComponent, &AnimationComponent)>() {
            let skeleton = self
                .ecs
                .get::<SkeletonComponent>(entity)
                .and_then(|s| resources.skeleton(s.skeleton_handle));
            let in_flight = self.animation.is_in_flight(entity);

            let Some(mut animation) = self.ecs.get_mut::<AnimationComponent>(entity) else {
                continue;
            };
            animation.running_time += delta * animation.speed;

            let Some(skeleton) = skeleton else {
                continue;
            };
            if in_flight || !animation.bones_handle.valid() {
                continue;
            }

            let clip = resources.animation(animation.animation_handle);
            let time = sample_time(&animation, clip.as_deref(), frames_per_second);
            let job = PoseJob {
                entity,
                bones: animation.bones_handle,
                skeleton,
                clip,
                time,
                buffer: mem::take(&mut animation.transformations),
            };
            drop(animation);

            if let Err(buffer) = self.animation.dispatch(&*self.engines.workers, job)
                && let Some(mut animation) = self.ecs.get_mut::<AnimationComponent>(entity)
            {
                animation.transformations = buffer;
            }
        }
    }
}

/// Clip time for the component's running time, looping inside its frame
/// window.
fn sample_time(
    animation: &AnimationComponent,
    clip: Option<&AnimationClip>,
    frames_per_second: f32,
) -> f32 {
    let duration = clip.map_or(0.0, |clip| clip.duration);
    if frames_per_second <= 0.0 {
        return animation.running_time.rem_euclid(duration.max(f32::EPSILON));
    }

    let start = (animation.start_frame as f32 / frames_per_second).min(duration);
    let end = if animation.end_frame == 0 {
        duration
    } else {
        (animation.end_frame as f32 / frames_per_second).min(duration)
    };
    let window = end - start;
    if window <= 0.0 {
        return start;
    }
    start + animation.running_time.rem_euclid(window)
}
