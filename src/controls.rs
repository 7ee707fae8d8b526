use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};

use crate::camera::Camera;

const EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Spherical {
    radius: f32,
    /// Polar angle from +Y.
    phi: f32,
    /// Azimuth around +Y, measured from +Z towards +X.
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();

        if radius == 0.0 {
            return Self::default();
        }

        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vec3 {
        let sin_phi_radius = self.phi.sin() * self.radius;

        Vec3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }

    fn make_safe(mut self) -> Self {
        self.phi = self.phi.clamp(EPSILON, PI - EPSILON);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Rotate,
    Pan,
}

/// Orbits a camera around `target`. Input accumulates into pending deltas,
/// and `update` applies them; with damping enabled only `damping_factor` of
/// the pending motion is applied per call, so `update` has to run every
/// frame for the motion to settle.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,

    pub enable_damping: bool,
    pub damping_factor: f32,

    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,

    pub min_distance: f32,
    pub max_distance: f32,

    spherical_delta: Spherical,
    pan_offset: Vec3,
    scale: f32,

    drag: Option<DragMode>,
    last_pointer: Option<Vec2>,
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            enable_damping: false,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            spherical_delta: Spherical::default(),
            pan_offset: Vec3::ZERO,
            scale: 1.0,
            drag: None,
            last_pointer: None,
        }
    }

    pub fn with_damping(mut self, damping_factor: f32) -> Self {
        self.enable_damping = true;
        self.damping_factor = damping_factor;
        self
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.spherical_delta.theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.spherical_delta.phi -= angle;
    }

    pub fn dolly_in(&mut self, scale: f32) {
        self.scale *= scale;
    }

    pub fn dolly_out(&mut self, scale: f32) {
        self.scale /= scale;
    }

    /// Screen-space pan by a pointer movement of `delta` pixels.
    pub fn pan(&mut self, camera: &Camera, delta: Vec2, viewport_height: f32) {
        if viewport_height <= 0.0 {
            return;
        }

        // Distance covered by half the viewport height at the target's depth
        let target_distance =
            (camera.eye - self.target).length() * (camera.fov_y_degrees.to_radians() * 0.5).tan();

        let world = camera.world_matrix();
        let right = world.x_axis.truncate();
        let up = world.y_axis.truncate();

        let distance = 2.0 * target_distance / viewport_height * self.pan_speed;
        self.pan_offset += right * (-delta.x * distance);
        self.pan_offset += up * (delta.y * distance);
    }

    pub fn begin_drag(&mut self, mode: DragMode) {
        self.drag = Some(mode);
        self.last_pointer = None;
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
        self.last_pointer = None;
    }

    /// Feeds an absolute pointer position; produces rotation or panning
    /// while a drag is active.
    pub fn pointer_moved(&mut self, camera: &Camera, position: Vec2, viewport_height: f32) {
        let previous = self.last_pointer.replace(position);

        let (Some(mode), Some(previous)) = (self.drag, previous) else {
            return;
        };

        let delta = position - previous;

        match mode {
            DragMode::Rotate => {
                if viewport_height <= 0.0 {
                    return;
                }

                self.rotate_left(TAU * delta.x / viewport_height * self.rotate_speed);
                self.rotate_up(TAU * delta.y / viewport_height * self.rotate_speed);
            }
            DragMode::Pan => self.pan(camera, delta, viewport_height),
        }
    }

    /// Scroll wheel; positive `lines` scrolls up and moves the camera closer.
    /// Each event dollies one fixed step, whatever its magnitude.
    pub fn wheel(&mut self, lines: f32) {
        let zoom_scale = 0.95f32.powf(self.zoom_speed);

        if lines > 0.0 {
            self.dolly_in(zoom_scale);
        } else if lines < 0.0 {
            self.dolly_out(zoom_scale);
        }
    }

    /// Applies pending motion to `camera`. Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let last_eye = camera.eye;
        let last_target = camera.target;

        let offset = camera.eye - self.target;
        let mut spherical = Spherical::from_offset(offset);

        if self.enable_damping {
            spherical.theta += self.spherical_delta.theta * self.damping_factor;
            spherical.phi += self.spherical_delta.phi * self.damping_factor;
        } else {
            spherical.theta += self.spherical_delta.theta;
            spherical.phi += self.spherical_delta.phi;
        }

        spherical = spherical.make_safe();
        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        if self.enable_damping {
            self.target += self.pan_offset * self.damping_factor;
        } else {
            self.target += self.pan_offset;
        }

        camera.eye = self.target + spherical.to_offset();
        camera.look_at(self.target);

        if self.enable_damping {
            let decay = 1.0 - self.damping_factor;
            self.spherical_delta.theta *= decay;
            self.spherical_delta.phi *= decay;
            self.pan_offset *= decay;
        } else {
            self.spherical_delta = Spherical::default();
            self.pan_offset = Vec3::ZERO;
        }

        self.scale = 1.0;

        camera.eye.distance_squared(last_eye) > EPSILON
            || camera.target.distance_squared(last_target) > EPSILON
    }
}
