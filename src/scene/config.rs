//! Scene configuration

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::SceneError;

/// Scene configuration
///
/// Missing fields take their defaults, so a config file only needs the
/// values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Scene name, also written into saved scenes
    pub name: String,
    /// Inactive scenes only apply queued changes; nothing is simulated
    pub active: bool,
    /// Size of the bone palette created for each animated entity
    pub max_bones: u32,
    /// Frame rate that animation start/end frames are counted in
    pub frames_per_second: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            name: String::from("scene"),
            active: true,
            max_bones: 100,
            frames_per_second: 30.0,
        }
    }
}

impl SceneConfig {
    /// Set the scene name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Start active or inactive
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    #[must_use]
    pub fn with_max_bones(mut self, max_bones: u32) -> Self {
        self.max_bones = max_bones;
        self
    }

    #[must_use]
    pub fn with_frames_per_second(mut self, frames_per_second: f32) -> Self {
        self.frames_per_second = frames_per_second;
        self
    }

    /// Parse a RON config.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config.
    pub fn from_ron_str(text: &str) -> Result<Self, SceneError> {
        ron::from_str(text).map_err(|e| SceneError::Config(e.to_string()))
    }

    /// Load a RON config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let content = fs::read_to_string(path).map_err(|e| SceneError::Io(e.to_string()))?;
        Self::from_ron_str(&content)
    }
}
