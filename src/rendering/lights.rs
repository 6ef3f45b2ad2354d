use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use wgpu::util::DeviceExt;

use crate::{
    math::bounds::AABB,
    rendering::config::{RenderConfig, SpotLightConfig},
};

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct SpotLightRaw {
    /// w is the intensity.
    position: Vec4,
    /// w is the cosine of the outer cone angle.
    direction: Vec4,
    /// w is the cosine of the inner cone angle.
    color: Vec4,
}

impl SpotLightRaw {
    fn from_config(light: &SpotLightConfig) -> Self {
        let outer = light.angle;
        let inner = light.angle * (1.0 - light.penumbra.clamp(0.0, 1.0));

        Self {
            position: light.position.extend(light.intensity),
            direction: light.direction().extend(outer.cos()),
            color: light.color.to_linear().extend(inner.cos()),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct LightsUniformState {
    spot_lights: [SpotLightRaw; 2],
    sky_color: Vec4,
    /// w is the ambient intensity.
    ground_color: Vec4,
    shadow_view_proj: Mat4,
    /// x: normal bias, y: texel size, z: shadow light index.
    shadow_params: Vec4,
}

impl LightsUniformState {
    pub fn new(config: &RenderConfig, shadow_view_proj: Mat4) -> Self {
        Self {
            spot_lights: [
                SpotLightRaw::from_config(&config.spot_lights[0]),
                SpotLightRaw::from_config(&config.spot_lights[1]),
            ],
            sky_color: config.sky_color.to_linear().extend(1.0),
            ground_color: config.ground_color.to_linear().extend(config.ambient_intensity),
            shadow_view_proj,
            shadow_params: Vec4::new(
                config.shadow_normal_bias,
                1.0 / config.shadow_map_size.max(1) as f32,
                config.shadow_light as f32,
                0.0,
            ),
        }
    }
}

/// Perspective projection from the light that encloses `bounds`.
pub fn shadow_view_proj(light: &SpotLightConfig, bounds: &AABB) -> Mat4 {
    let center = bounds.center();
    let radius = bounds.radius().max(0.1);
    let distance = light.position.distance(center).max(radius + 0.1);

    let up = if (center - light.position).normalize_or_zero().dot(Vec3::Y).abs() > 0.99 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let view = Mat4::look_at_rh(light.position, center, up);

    let fov = 2.0 * (radius / distance).min(0.99).asin();
    let near = (distance - radius).max(0.1);
    let far = distance + radius;
    let projection = Mat4::perspective_rh(fov, 1.0, near, far);

    projection * view
}

pub struct LightsUniform {
    buffer: wgpu::Buffer,
}

impl LightsUniform {
    pub fn new(device: &wgpu::Device, initial_state: LightsUniformState) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lights uniform buffer"),
            contents: bytemuck::cast_slice(&[initial_state]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self { buffer }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn update(&self, queue: &wgpu::Queue, state: LightsUniformState) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[state]));
    }
}
