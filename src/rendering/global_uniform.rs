use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::rendering::config::RenderConfig;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct GlobalUniformState {
    pub resolution: [f32; 2],
    pub now: f32,
    pub exposure: f32,
    pub tone_mapping: u32,
    _padding: [u32; 3],
    /// Translation of the ground pivot; w is the grid cell size.
    pub ground_offset: [f32; 4],
    pub horizon_color: [f32; 4],
    pub grid_color: [f32; 4],
}

impl GlobalUniformState {
    pub fn new(
        resolution: PhysicalSize<u32>,
        now: f32,
        ground_offset: Vec3,
        config: &RenderConfig,
    ) -> Self {
        Self {
            resolution: [resolution.width as f32, resolution.height as f32],
            now,
            exposure: config.exposure,
            tone_mapping: config.tone_mapping.shader_index(),
            _padding: [0; 3],
            ground_offset: ground_offset.extend(config.grid_cell_size).to_array(),
            horizon_color: config.horizon_color.to_linear().extend(1.0).to_array(),
            grid_color: config.grid_color.to_linear().extend(1.0).to_array(),
        }
    }
}

pub struct GlobalUniform {
    buffer: wgpu::Buffer,
}

impl GlobalUniform {
    pub fn new(device: &wgpu::Device, initial_state: GlobalUniformState) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Global uniform buffer"),
            contents: bytemuck::cast_slice(&[initial_state]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self { buffer }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn update(&self, queue: &wgpu::Queue, state: GlobalUniformState) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[state]));
    }
}
