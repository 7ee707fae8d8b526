use std::path::PathBuf;

use glam::Vec3;

pub const DEFAULT_MODEL_PATH: &str = "assets/models/christmas_village/scene.gltf";

#[derive(Debug, Clone)]
pub struct LightConfig {
    pub color: Vec3,
    pub intensity: f32,
}

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub model_path: PathBuf,
    pub window_title: String,
    pub window_size: (u32, u32),
    pub background: Vec3,
    /// MSAA samples per pixel. Lowered to what the adapter supports; 1 disables antialiasing.
    pub sample_count: u32,

    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,

    pub damping_factor: f32,
    /// Largest dimension of the loaded model after fitting, in world units.
    pub fit_size: f32,
    /// Distance from the model center to the camera along +Z after fitting.
    pub camera_distance: f32,

    pub ambient_light: LightConfig,
    pub directional_light: LightConfig,
    pub directional_light_position: Vec3,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            window_title: "Village Viewer".to_string(),
            window_size: (1280, 720),
            background: Vec3::ZERO,
            sample_count: 4,

            fov_y_degrees: 75.0,
            near: 0.1,
            far: 1000.0,

            damping_factor: 0.05,
            fit_size: 5.0,
            camera_distance: 10.0,

            ambient_light: LightConfig {
                color: Vec3::ONE,
                intensity: 1.0,
            },
            directional_light: LightConfig {
                color: Vec3::ONE,
                intensity: 1.5,
            },
            directional_light_position: Vec3::new(50.0, 200.0, 100.0),
        }
    }
}

impl ViewerConfig {
    /// Default config, with the model path overridden by the first argument if present.
    pub fn from_args(mut args: impl Iterator<Item = String>) -> Self {
        let mut config = Self::default();

        // Skip program name
        args.next();

        if let Some(path) = args.next() {
            config.model_path = PathBuf::from(path);
        }

        config
    }
}
