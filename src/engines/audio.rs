//! Audio collaborator

use glam::Vec3;

use crate::handles::HandleVector;

crate::handle_types! {
    /// An audio scene owned by an audio engine.
    AudioSceneHandle => AudioSceneTag;
    /// Sound asset.
    SoundHandle => SoundTag;
    /// A sound currently playing inside an audio scene.
    SoundSourceHandle => SoundSourceTag;
}

/// Narrow interface to an audio backend.
pub trait AudioEngine {
    fn create_audio_scene(&mut self) -> AudioSceneHandle;
    fn destroy_audio_scene(&mut self, scene: AudioSceneHandle);

    /// Start playing `sound`, positioned in 3D when `position` is given.
    fn play(&mut self, scene: AudioSceneHandle, sound: SoundHandle, position: Option<Vec3>) -> SoundSourceHandle;

    fn tick(&mut self, scene: AudioSceneHandle, delta: f32);
    /// Mix and output. Render thread only.
    fn render(&mut self, scene: AudioSceneHandle);
}

#[derive(Debug, Clone, Copy)]
struct PlayingSound {
    remaining: f32,
}

/// [`AudioEngine`] without an output device: sounds "play" for their
/// registered duration and are then retired.
#[derive(Debug, Default)]
pub struct SilentAudioEngine {
    sounds: HandleVector<f32, SoundTag>,
    scenes: HandleVector<HandleVector<PlayingSound, SoundSourceTag>, AudioSceneTag>,
}

impl SilentAudioEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sound lasting `duration` seconds.
    pub fn create_sound(&mut self, duration: f32) -> SoundHandle {
        self.sounds.create(duration)
    }

    /// Number of sounds still playing in a scene.
    #[must_use]
    pub fn playing(&self, scene: AudioSceneHandle) -> usize {
        self.scenes.get(scene).map_or(0, HandleVector::len)
    }
}

impl AudioEngine for SilentAudioEngine {
    fn create_audio_scene(&mut self) -> AudioSceneHandle {
        self.scenes.create(HandleVector::new())
    }

    fn destroy_audio_scene(&mut self, scene: AudioSceneHandle) {
        self.scenes.destroy(scene);
    }

    fn play(&mut self, scene: AudioSceneHandle, sound: SoundHandle, _position: Option<Vec3>) -> SoundSourceHandle {
        let Some(&remaining) = self.sounds.get(sound) else {
            log::warn!("unknown sound {sound:?}");
            return SoundSourceHandle::INVALID;
        };
        self.scenes
            .get_mut(scene)
            .map_or(SoundSourceHandle::INVALID, |sources| {
                sources.create(PlayingSound { remaining })
            })
    }

    fn tick(&mut self, scene: AudioSceneHandle, delta: f32) {
        let Some(sources) = self.scenes.get_mut(scene) else {
            return;
        };
        let mut finished = Vec::new();
        for (handle, sound) in sources.iter_mut() {
            sound.remaining -= delta;
            if sound.remaining <= 0.0 {
                finished.push(handle);
            }
        }
        for handle in finished {
            sources.destroy(handle);
        }
    }

    fn render(&mut self, _scene: AudioSceneHandle) {}
}
