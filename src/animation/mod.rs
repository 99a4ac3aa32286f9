//! Skeletal animation
//!
//! CPU-side skeletons and clips, plus the compute-then-upload pipeline that
//! turns them into bone palettes.

mod clip;
mod pipeline;
mod skeleton;

pub use clip::{AnimationClip, Channel, Interpolation, Keyframe};
pub use pipeline::{AnimationPipeline, BoneUpload, PoseJob, RenderQueue};
pub use skeleton::{Bone, Skeleton};

crate::handle_types! {
    /// Skeleton asset.
    SkeletonHandle => SkeletonTag;
    /// Animation clip asset.
    AnimationHandle => AnimationTag;
}
