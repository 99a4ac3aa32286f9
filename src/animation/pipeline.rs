//! Two-stage skeletal animation pipeline
//!
//! Stage one computes skinning matrices on a [`WorkerPool`]; stage two
//! uploads them to the graphics engine on the render thread. The stages are
//! joined by a channel, and a second channel hands each pose buffer back to
//! the control thread once uploaded. A buffer therefore has exactly one owner
//! at any time: the component, the worker, the upload queue, or the return
//! queue.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, unbounded};
use glam::Mat4;
use hecs::Entity;
use rustc_hash::FxHashSet;

use super::{AnimationClip, Skeleton};
use crate::engines::graphics::BonesHandle;
use crate::engines::workers::WorkerPool;

/// Work for the compute stage.
pub struct PoseJob {
    pub entity: Entity,
    pub bones: BonesHandle,
    pub skeleton: Arc<Skeleton>,
    pub clip: Option<Arc<AnimationClip>>,
    /// Clip time in seconds
    pub time: f32,
    /// Buffer to fill; its allocation is reused
    pub buffer: Vec<Mat4>,
}

/// Work for the upload stage.
#[derive(Debug)]
pub struct BoneUpload {
    pub entity: Entity,
    pub bones: BonesHandle,
    pub transforms: Vec<Mat4>,
}

/// Render-thread end of the pipeline.
#[derive(Clone)]
pub struct RenderQueue {
    uploads: Receiver<BoneUpload>,
    returned: Sender<(Entity, Vec<Mat4>)>,
}

impl RenderQueue {
    /// Upload every pose computed so far and hand the buffers back.
    ///
    /// Returns the number of uploads performed.
    pub fn drain(&self, mut upload: impl FnMut(BonesHandle, &[Mat4])) -> usize {
        let mut count = 0;
        for job in self.uploads.try_iter() {
            upload(job.bones, &job.transforms);
            count += 1;
            // The control side may already be gone; the buffer is dropped then.
            let _ = self.returned.send((job.entity, job.transforms));
        }
        count
    }
}

/// Control-thread end of the pipeline.
pub struct AnimationPipeline {
    uploads_tx: Sender<BoneUpload>,
    render_queue: RenderQueue,
    returned_rx: Receiver<(Entity, Vec<Mat4>)>,
    in_flight: FxHashSet<Entity>,
}

impl AnimationPipeline {
    #[must_use]
    pub fn new() -> Self {
        let (uploads_tx, uploads_rx) = unbounded();
        let (returned_tx, returned_rx) = unbounded();
        Self {
            uploads_tx,
            render_queue: RenderQueue {
                uploads: uploads_rx,
                returned: returned_tx,
            },
            returned_rx,
            in_flight: FxHashSet::default(),
        }
    }

    /// Handle for the render thread.
    #[must_use]
    pub fn render_queue(&self) -> RenderQueue {
        self.render_queue.clone()
    }

    /// Check whether a pose for `entity` is still being computed or uploaded.
    #[must_use]
    pub fn is_in_flight(&self, entity: Entity) -> bool {
        self.in_flight.contains(&entity)
    }

    /// Number of entities with a pose in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Start the compute stage for `job`.
    ///
    /// Returns the job's buffer back if the entity already has a pose in
    /// flight.
    pub fn dispatch(&mut self, workers: &dyn WorkerPool, job: PoseJob) -> Result<(), Vec<Mat4>> {
        if !self.in_flight.insert(job.entity) {
            return Err(job.buffer);
        }

        let uploads = self.uploads_tx.clone();
        workers.execute(Box::new(move || {
            let PoseJob {
                entity,
                bones,
                skeleton,
                clip,
                time,
                mut buffer,
            } = job;
            skeleton.pose(clip.as_deref(), time, &mut buffer);
            let _ = uploads.send(BoneUpload {
                entity,
                bones,
                transforms: buffer,
            });
        }));
        Ok(())
    }

    /// Collect buffers the render thread has finished with.
    pub fn reclaim(&mut self) -> Vec<(Entity, Vec<Mat4>)> {
        let returned: Vec<_> = self.returned_rx.try_iter().collect();
        for (entity, _) in &returned {
            self.in_flight.remove(entity);
        }
        returned
    }
}

impl Default for AnimationPipeline {
    fn default() -> Self {
        Self::new()
    }
}
