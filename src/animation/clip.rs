//! Animation clips and keyframes
//!
//! Per-bone translation, rotation and scale tracks sampled by time.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Interpolation method for keyframes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Interpolation {
    #[default]
    Linear,
    /// Hold the previous keyframe
    Step,
}

/// A single keyframe with timestamp and value
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Keyframe<T> {
    /// Time in seconds
    pub time: f32,
    pub value: T,
}

impl<T> Keyframe<T> {
    pub const fn new(time: f32, value: T) -> Self {
        Self { time, value }
    }
}

/// Keyframes for one property of one bone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Channel {
    Translation(Vec<Keyframe<Vec3>>),
    Rotation(Vec<Keyframe<Quat>>),
    Scale(Vec<Keyframe<Vec3>>),
}

impl Channel {
    /// Time of the last keyframe
    #[must_use]
    pub fn duration(&self) -> f32 {
        match self {
            Self::Translation(keys) | Self::Scale(keys) => keys.last().map_or(0.0, |k| k.time),
            Self::Rotation(keys) => keys.last().map_or(0.0, |k| k.time),
        }
    }
}

/// A complete animation clip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationClip {
    pub name: String,
    /// Duration in seconds
    pub duration: f32,
    pub interpolation: Interpolation,
    /// Channels keyed by bone index
    pub channels: Vec<(usize, Channel)>,
}

impl AnimationClip {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            duration: 0.0,
            interpolation: Interpolation::Linear,
            channels: Vec::new(),
        }
    }

    /// Add a channel; keyframes must be sorted by time.
    pub fn add_channel(&mut self, bone: usize, channel: Channel) {
        self.duration = self.duration.max(channel.duration());
        self.channels.push((bone, channel));
    }

    #[must_use]
    pub fn sample_translation(&self, bone: usize, time: f32) -> Option<Vec3> {
        self.channels.iter().find_map(|(b, channel)| match channel {
            Channel::Translation(keys) if *b == bone => {
                sample(keys, time, self.interpolation, Vec3::lerp)
            }
            _ => None,
        })
    }

    #[must_use]
    pub fn sample_rotation(&self, bone: usize, time: f32) -> Option<Quat> {
        self.channels.iter().find_map(|(b, channel)| match channel {
            Channel::Rotation(keys) if *b == bone => {
                sample(keys, time, self.interpolation, Quat::slerp)
            }
            _ => None,
        })
    }

    #[must_use]
    pub fn sample_scale(&self, bone: usize, time: f32) -> Option<Vec3> {
        self.channels.iter().find_map(|(b, channel)| match channel {
            Channel::Scale(keys) if *b == bone => sample(keys, time, self.interpolation, Vec3::lerp),
            _ => None,
        })
    }
}

impl Default for AnimationClip {
    fn default() -> Self {
        Self::new("untitled")
    }
}

/// Sample sorted keyframes; clamps outside the keyed range.
fn sample<T: Copy>(
    keys: &[Keyframe<T>],
    time: f32,
    interpolation: Interpolation,
    mix: impl Fn(T, T, f32) -> T,
) -> Option<T> {
    let first = keys.first()?;
    let last = keys.last()?;
    if time <= first.time {
        return Some(first.value);
    }
    if time >= last.time {
        return Some(last.value);
    }

    // First keyframe strictly after `time`; 1..len by the checks above.
    let next = keys.partition_point(|k| k.time <= time);
    let (k0, k1) = (&keys[next - 1], &keys[next]);
    Some(match interpolation {
        Interpolation::Step => k0.value,
        Interpolation::Linear => {
            let t = (time - k0.time) / (k1.time - k0.time);
            mix(k0.value, k1.value, t)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide() -> AnimationClip {
        let mut clip = AnimationClip::new("slide");
        clip.add_channel(
            0,
            Channel::Translation(vec![
                Keyframe::new(0.0, Vec3::ZERO),
                Keyframe::new(1.0, Vec3::new(10.0, 0.0, 0.0)),
                Keyframe::new(2.0, Vec3::new(10.0, 10.0, 0.0)),
            ]),
        );
        clip
    }

    #[test]
    fn test_linear_sampling() {
        let clip = slide();
        assert_eq!(clip.duration, 2.0);

        let pos = clip.sample_translation(0, 0.5).unwrap();
        assert!((pos.x - 5.0).abs() < 0.01);
        let pos = clip.sample_translation(0, 1.5).unwrap();
        assert!((pos.y - 5.0).abs() < 0.01);
    }

    #[test]
    fn test_sampling_clamps() {
        let clip = slide();
        assert_eq!(clip.sample_translation(0, -1.0), Some(Vec3::ZERO));
        assert_eq!(clip.sample_translation(0, 9.0), Some(Vec3::new(10.0, 10.0, 0.0)));
    }

    #[test]
    fn test_step_interpolation() {
        let mut clip = slide();
        clip.interpolation = Interpolation::Step;
        assert_eq!(clip.sample_translation(0, 0.9), Some(Vec3::ZERO));
    }

    #[test]
    fn test_untracked_bone() {
        let clip = slide();
        assert!(clip.sample_translation(1, 0.5).is_none());
        assert!(clip.sample_rotation(0, 0.5).is_none());
    }
}
