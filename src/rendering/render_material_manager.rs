use std::{collections::HashMap, sync::Arc};

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::{
    asset_pipeline::materials::{AlphaMode, Material, MaterialKind, TextureData},
    material_manager::{MaterialId, MaterialManager},
    rendering::texture::Texture,
};

const FLAG_UNLIT: u32 = 1;
const FLAG_ALPHA_MASK: u32 = 2;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MaterialUniform {
    /// Linear colour, w is opacity.
    base_color: [f32; 4],
    roughness: f32,
    metalness: f32,
    alpha_cutoff: f32,
    flags: u32,
}

impl MaterialUniform {
    pub fn from_material(material: &Material) -> Self {
        let mut flags = 0;
        if material.kind == MaterialKind::Unlit {
            flags |= FLAG_UNLIT;
        }
        if material.alpha_mode == AlphaMode::Mask {
            flags |= FLAG_ALPHA_MASK;
        }

        Self {
            base_color: material.color.to_linear().extend(material.opacity).to_array(),
            roughness: material.roughness.clamp(0.0, 1.0),
            metalness: material.metalness.clamp(0.0, 1.0),
            alpha_cutoff: material.alpha_cutoff,
            flags,
        }
    }
}

struct RenderMaterial {
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    last_uniform: MaterialUniform,
}

/// GPU side of the material library. Bind groups are created the first time a material
/// is seen; uniforms follow the library every frame.
pub struct RenderMaterialManager {
    device: wgpu::Device,
    queue: wgpu::Queue,
    bind_group_layout: wgpu::BindGroupLayout,
    white: Texture,
    // Keyed by the address of the shared pixel data
    textures: HashMap<usize, Texture>,
    materials: HashMap<MaterialId, RenderMaterial>,
}

impl RenderMaterialManager {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bind_group_layout: wgpu::BindGroupLayout,
    ) -> Self {
        Self {
            device: device.clone(),
            queue: queue.clone(),
            bind_group_layout,
            white: Texture::white(device, queue),
            textures: HashMap::new(),
            materials: HashMap::new(),
        }
    }

    pub fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }

    pub fn sync(&mut self, materials: &MaterialManager) {
        for (id, material) in materials.iter() {
            let uniform = MaterialUniform::from_material(material);

            match self.materials.get_mut(&id) {
                Some(render_material) => {
                    if render_material.last_uniform != uniform {
                        self.queue.write_buffer(
                            &render_material.uniform_buffer,
                            0,
                            bytemuck::cast_slice(&[uniform]),
                        );
                        render_material.last_uniform = uniform;
                    }
                }
                None => {
                    let render_material = self.create_render_material(material, uniform);
                    self.materials.insert(id, render_material);
                }
            }
        }
    }

    fn create_render_material(
        &mut self,
        material: &Material,
        uniform: MaterialUniform,
    ) -> RenderMaterial {
        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("Material uniform ({})", material.name)),
                contents: bytemuck::cast_slice(&[uniform]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        if let Some(data) = &material.base_color_texture {
            self.upload_texture(data, &material.name);
        }

        let texture = material
            .base_color_texture
            .as_ref()
            .and_then(|data| self.textures.get(&texture_key(data)))
            .unwrap_or(&self.white);

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("Material bind group ({})", material.name)),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        });

        log::debug!("Created GPU material {}", material.name);

        RenderMaterial {
            uniform_buffer,
            bind_group,
            last_uniform: uniform,
        }
    }

    fn upload_texture(&mut self, data: &Arc<TextureData>, material_name: &str) {
        let key = texture_key(data);
        if self.textures.contains_key(&key) {
            return;
        }

        let label = format!("Base colour ({})", material_name);
        let texture = Texture::from_texture_data(&self.device, &self.queue, data, &label);
        self.textures.insert(key, texture);
    }

    pub fn bind_group(&self, id: MaterialId) -> Option<&wgpu::BindGroup> {
        self.materials.get(&id).map(|material| &material.bind_group)
    }
}

fn texture_key(data: &Arc<TextureData>) -> usize {
    Arc::as_ptr(data) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    #[test]
    fn uniform_carries_linear_colour_and_opacity() {
        let mut material = Material::standard("930_lights_refraction");
        material.color = Color::from_hex("#424242").unwrap();
        material.opacity = 0.7;

        let uniform = MaterialUniform::from_material(&material);
        let linear = material.color.to_linear();

        assert_eq!(uniform.base_color, [linear.x, linear.y, linear.z, 0.7]);
        assert_eq!(uniform.flags, 0);
    }

    #[test]
    fn unlit_and_masked_materials_set_flags() {
        let mut material = Material::standard("decal");
        material.kind = MaterialKind::Unlit;
        material.alpha_mode = AlphaMode::Mask;

        let uniform = MaterialUniform::from_material(&material);

        assert_eq!(uniform.flags, FLAG_UNLIT | FLAG_ALPHA_MASK);
    }

    #[test]
    fn parameters_are_clamped() {
        let mut material = Material::standard("rim");
        material.roughness = 1.5;
        material.metalness = -0.5;

        let uniform = MaterialUniform::from_material(&material);

        assert_eq!(uniform.roughness, 1.0);
        assert_eq!(uniform.metalness, 0.0);
    }
}
