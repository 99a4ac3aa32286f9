//! Skeletons for skinned meshes
//!
//! Bones are stored parents-first, so world matrices fall out of a single
//! forward pass.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::clip::AnimationClip;

/// A single bone in a skeleton
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    /// Parent bone index; always lower than this bone's own index
    pub parent: Option<usize>,
    /// Bind-pose local translation
    pub translation: Vec3,
    /// Bind-pose local rotation
    pub rotation: Quat,
    /// Bind-pose local scale
    pub scale: Vec3,
    /// Inverse bind matrix (for skinning)
    pub inverse_bind_matrix: Mat4,
}

impl Bone {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            inverse_bind_matrix: Mat4::IDENTITY,
        }
    }

    #[must_use]
    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    #[must_use]
    pub fn with_inverse_bind_matrix(mut self, matrix: Mat4) -> Self {
        self.inverse_bind_matrix = matrix;
        self
    }
}

/// Ordered bone hierarchy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Skeleton {
    bones: Vec<Bone>,
}

impl Skeleton {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bone under `parent` and return its index.
    ///
    /// A parent index that does not name an earlier bone makes the new bone
    /// a root.
    pub fn add_bone(&mut self, mut bone: Bone, parent: Option<usize>) -> usize {
        let index = self.bones.len();
        bone.parent = parent.filter(|&p| p < index);
        self.bones.push(bone);
        index
    }

    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    #[must_use]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    /// Find bone by name
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    /// Skinning matrices for `clip` sampled at `time`, written into `out`.
    ///
    /// Channels the clip does not animate fall back to the bind pose. `out`
    /// is cleared first and keeps its allocation.
    pub fn pose(&self, clip: Option<&AnimationClip>, time: f32, out: &mut Vec<Mat4>) {
        out.clear();
        out.reserve(self.bones.len());

        // First pass: world matrices, parents are always already computed.
        for (index, bone) in self.bones.iter().enumerate() {
            let (translation, rotation, scale) = match clip {
                Some(clip) => (
                    clip.sample_translation(index, time).unwrap_or(bone.translation),
                    clip.sample_rotation(index, time).unwrap_or(bone.rotation),
                    clip.sample_scale(index, time).unwrap_or(bone.scale),
                ),
                None => (bone.translation, bone.rotation, bone.scale),
            };
            let local = Mat4::from_scale_rotation_translation(scale, rotation, translation);
            let world = bone
                .parent
                .and_then(|parent| out.get(parent))
                .map_or(local, |parent_world| *parent_world * local);
            out.push(world);
        }

        // Second pass: into skinning space.
        for (matrix, bone) in out.iter_mut().zip(&self.bones) {
            *matrix *= bone.inverse_bind_matrix;
        }
    }
}
