use glam::Vec3;

use crate::config::ViewerConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Vec3,
    pub intensity: f32,
}

/// Parallel light shining from `position` towards `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: Vec3,
    pub intensity: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl DirectionalLight {
    /// Unit vector pointing from the lit surface towards the light.
    pub fn direction_to_light(&self) -> Vec3 {
        (self.position - self.target).try_normalize().unwrap_or(Vec3::Y)
    }
}

#[derive(Debug, Clone)]
pub struct SceneLights {
    pub background: Vec3,
    pub ambient: AmbientLight,
    pub directional: DirectionalLight,
}

impl SceneLights {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            background: config.background,
            ambient: AmbientLight {
                color: config.ambient_light.color,
                intensity: config.ambient_light.intensity,
            },
            directional: DirectionalLight {
                color: config.directional_light.color,
                intensity: config.directional_light.intensity,
                position: config.directional_light_position,
                target: Vec3::ZERO,
            },
        }
    }
}
