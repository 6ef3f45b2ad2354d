use glam::Vec3;

use crate::color::Color;

pub const CAR_MODEL_PATH: &str = "assets/models/porsche/scene.gltf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneMapping {
    None,
    Reinhard,
}

impl ToneMapping {
    pub fn shader_index(self) -> u32 {
        match self {
            ToneMapping::None => 0,
            ToneMapping::Reinhard => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpotLightConfig {
    pub position: Vec3,
    pub target: Vec3,
    pub color: Color,
    pub intensity: f32,
    /// Half-angle of the cone, in radians.
    pub angle: f32,
    /// Fraction of the cone that fades out towards the edge.
    pub penumbra: f32,
}

impl SpotLightConfig {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            target: Vec3::ZERO,
            color: Color::WHITE,
            intensity: 5.0,
            angle: std::f32::consts::FRAC_PI_3,
            penumbra: 0.0,
        }
    }

    pub fn direction(&self) -> Vec3 {
        (self.target - self.position).normalize_or(Vec3::NEG_Y)
    }
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub tone_mapping: ToneMapping,
    pub exposure: f32,
    pub min_pixel_ratio: f64,
    pub max_pixel_ratio: f64,
    pub shadow_map_size: u32,
    pub shadow_normal_bias: f32,
    /// The light at `shadow_light` renders the shadow map.
    pub spot_lights: [SpotLightConfig; 2],
    pub shadow_light: usize,
    pub sky_color: Color,
    pub horizon_color: Color,
    pub ground_color: Color,
    pub ambient_intensity: f32,
    pub grid_color: Color,
    pub grid_cell_size: f32,
}

impl RenderConfig {
    /// Scale factor used for the UI, kept within the configured range.
    pub fn pixel_ratio(&self, scale_factor: f64) -> f64 {
        scale_factor.clamp(self.min_pixel_ratio, self.max_pixel_ratio)
    }

    pub fn shadow_caster(&self) -> &SpotLightConfig {
        &self.spot_lights[self.shadow_light.min(self.spot_lights.len() - 1)]
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tone_mapping: ToneMapping::Reinhard,
            exposure: 2.0,
            min_pixel_ratio: 1.0,
            max_pixel_ratio: 2.0,
            shadow_map_size: 1024,
            shadow_normal_bias: 0.03,
            spot_lights: [
                SpotLightConfig::at(Vec3::new(-7.0, 3.0, -10.0)),
                SpotLightConfig::at(Vec3::new(7.0, 3.0, 10.0)),
            ],
            shadow_light: 1,
            sky_color: Color::rgb(0.35, 0.55, 0.85),
            horizon_color: Color::rgb(0.85, 0.88, 0.92),
            ground_color: Color::rgb(0.32, 0.3, 0.28),
            ambient_intensity: 0.6,
            grid_color: Color::rgb(0.55, 0.55, 0.55),
            grid_cell_size: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_ratio_is_clamped() {
        let config = RenderConfig::default();

        assert_eq!(config.pixel_ratio(0.5), 1.0);
        assert_eq!(config.pixel_ratio(1.5), 1.5);
        assert_eq!(config.pixel_ratio(3.0), 2.0);
    }

    #[test]
    fn spot_lights_face_the_origin() {
        let config = RenderConfig::default();

        for light in &config.spot_lights {
            let towards_origin = (-light.position).normalize();
            assert!(light.direction().abs_diff_eq(towards_origin, 1e-6));
            assert_eq!(light.intensity, 5.0);
        }
        assert_eq!(config.shadow_caster().position, Vec3::new(7.0, 3.0, 10.0));
    }
}
