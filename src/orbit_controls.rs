use std::f32::consts::{FRAC_PI_2, FRAC_PI_3, TAU};

use glam::{Vec2, Vec3};

use crate::camera::Camera;

#[derive(Debug, Clone)]
pub struct OrbitConfig {
    /// Polar angles are measured from straight up.
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub enable_zoom: bool,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            min_polar_angle: FRAC_PI_3,
            max_polar_angle: FRAC_PI_2,
            min_distance: 3.0,
            max_distance: 8.0,
            enable_zoom: true,
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
        }
    }
}

/// Orbits the camera around a fixed target. Panning is not supported.
pub struct OrbitControls {
    config: OrbitConfig,
    target: Vec3,
    radius: f32,
    /// Azimuth around +Y, measured from +Z.
    theta: f32,
    phi: f32,
    theta_delta: f32,
    phi_delta: f32,
    pending_scale: f32,
}

impl OrbitControls {
    pub fn new(config: OrbitConfig, camera: &Camera) -> Self {
        let offset = camera.eye - camera.target;
        let radius = offset.length().max(f32::EPSILON);

        let mut controls = Self {
            target: camera.target,
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            theta_delta: 0.0,
            phi_delta: 0.0,
            pending_scale: 1.0,
            config,
        };
        controls.clamp();
        controls
    }

    /// Drag by `delta` pixels. A drag across the full viewport height is one turn.
    pub fn rotate(&mut self, delta: Vec2, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        self.theta_delta -= TAU * delta.x / height * self.config.rotate_speed;
        self.phi_delta -= TAU * delta.y / height * self.config.rotate_speed;
    }

    /// Positive steps move the camera closer.
    pub fn zoom(&mut self, steps: f32) {
        if !self.config.enable_zoom {
            return;
        }

        self.pending_scale *= 0.95f32.powf(self.config.zoom_speed * steps);
    }

    pub fn distance(&self) -> f32 {
        self.radius
    }

    pub fn polar_angle(&self) -> f32 {
        self.phi
    }

    pub fn update(&mut self, camera: &mut Camera) {
        if self.config.enable_damping {
            let factor = self.config.damping_factor;
            self.theta += self.theta_delta * factor;
            self.phi += self.phi_delta * factor;
            self.theta_delta *= 1.0 - factor;
            self.phi_delta *= 1.0 - factor;
        } else {
            self.theta += self.theta_delta;
            self.phi += self.phi_delta;
            self.theta_delta = 0.0;
            self.phi_delta = 0.0;
        }

        self.radius *= self.pending_scale;
        self.pending_scale = 1.0;

        self.clamp();

        let sin_phi = self.phi.sin();
        let offset = Vec3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        );

        camera.target = self.target;
        camera.eye = self.target + offset;
    }

    fn clamp(&mut self) {
        self.phi = self
            .phi
            .clamp(self.config.min_polar_angle, self.config.max_polar_angle)
            .clamp(f32::EPSILON, std::f32::consts::PI - f32::EPSILON);
        self.radius = self
            .radius
            .clamp(self.config.min_distance, self.config.max_distance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controls() -> (OrbitControls, Camera) {
        let camera = Camera::default();
        (OrbitControls::new(OrbitConfig::default(), &camera), camera)
    }

    #[test]
    fn starts_from_camera_position() {
        let (mut controls, mut camera) = controls();
        let eye = camera.eye;

        controls.update(&mut camera);

        assert!(camera.eye.abs_diff_eq(eye, 1e-4));
        assert!((controls.distance() - 29f32.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn polar_angle_is_clamped() {
        let (mut controls, mut camera) = controls();

        // Drag far downwards, which would take the camera below the ground
        controls.rotate(Vec2::new(0.0, -10_000.0), 720.0);
        for _ in 0..200 {
            controls.update(&mut camera);
        }
        assert!((controls.polar_angle() - FRAC_PI_2).abs() < 1e-5);
        assert!(camera.eye.y.abs() < 1e-3);

        controls.rotate(Vec2::new(0.0, 20_000.0), 720.0);
        for _ in 0..200 {
            controls.update(&mut camera);
        }
        assert!((controls.polar_angle() - FRAC_PI_3).abs() < 1e-5);
    }

    #[test]
    fn zoom_is_clamped_to_distance_range() {
        let (mut controls, mut camera) = controls();

        controls.zoom(100.0);
        controls.update(&mut camera);
        assert_eq!(controls.distance(), 3.0);
        assert!(((camera.eye - camera.target).length() - 3.0).abs() < 1e-4);

        controls.zoom(-100.0);
        controls.update(&mut camera);
        assert_eq!(controls.distance(), 8.0);
    }

    #[test]
    fn damping_eases_rotation_out() {
        let (mut controls, mut camera) = controls();
        controls.rotate(Vec2::new(100.0, 0.0), 720.0);

        controls.update(&mut camera);
        let first_step = camera.eye;
        controls.update(&mut camera);
        let second_step = camera.eye;
        for _ in 0..500 {
            controls.update(&mut camera);
        }
        let settled = camera.eye;
        controls.update(&mut camera);

        assert!(first_step.distance(second_step) > 0.0);
        assert!(settled.distance(camera.eye) < 1e-4);
    }
}
