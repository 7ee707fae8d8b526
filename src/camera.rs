use glam::{Mat4, Vec3};

use crate::config::ViewerConfig;

#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,

    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            eye: Vec3::ZERO,
            target: Vec3::NEG_Z,
            up: Vec3::Y,
            fov_y_degrees,
            aspect,
            near,
            far,
        }
    }

    pub fn from_config(config: &ViewerConfig, width: u32, height: u32) -> Self {
        Self::perspective(
            config.fov_y_degrees,
            aspect_ratio(width, height),
            config.near,
            config.far,
        )
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        )
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Camera-to-world transform; columns are the camera's right, up and back axes.
    pub fn world_matrix(&self) -> Mat4 {
        self.view_matrix().inverse()
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    if height == 0 {
        return 1.0;
    }

    width as f32 / height as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_from_config_uses_viewport_aspect() {
        let camera = Camera::from_config(&ViewerConfig::default(), 1920, 1080);
        assert!((camera.aspect - 16.0 / 9.0).abs() < 1e-6);
        assert_eq!(camera.fov_y_degrees, 75.0);
        assert_eq!(camera.near, 0.1);
        assert_eq!(camera.far, 1000.0);
    }

    #[test]
    fn zero_height_does_not_produce_nan_aspect() {
        let mut camera = Camera::perspective(75.0, 1.0, 0.1, 1000.0);
        camera.set_aspect(800, 0);
        assert_eq!(camera.aspect, 1.0);
    }

    #[test]
    fn target_projects_to_screen_center() {
        let mut camera = Camera::perspective(75.0, 1.5, 0.1, 1000.0);
        camera.eye = Vec3::new(0.0, 2.0, 12.0);
        camera.look_at(Vec3::new(0.0, 2.0, 0.0));

        let clip = camera.view_projection_matrix() * camera.target.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
