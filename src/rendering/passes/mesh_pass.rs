use std::sync::Arc;

use wgpu::{
    DepthBiasState, Device, MultisampleState, PipelineCompilationOptions, RenderPass,
    ShaderSource, StencilState,
};

use crate::rendering::{
    passes::pass::{mesh_primitive, Pass},
    render_common::RenderCommon,
    render_model::RENDER_MODEL_VBL,
    shader_loader::{PipelineCache, PipelineCacheBuilder, PipelineId, ShaderDefinition},
    texture::DepthTexture,
};

const MESH_SHADER: ShaderDefinition = ShaderDefinition {
    name: "Mesh (opaque)",
    path: "mesh.wgsl",
};

const TRANSPARENT_MESH_SHADER: ShaderDefinition = ShaderDefinition {
    name: "Mesh (transparent)",
    path: "mesh.wgsl",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Blending {
    Opaque,
    Transparent,
}

fn add_mesh_pipeline(
    cache_builder: &mut PipelineCacheBuilder,
    shader: ShaderDefinition,
    layout: wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
    blending: Blending,
) -> PipelineId {
    cache_builder.add_shader(
        shader,
        Box::new(
            move |device: &Device, shader_def: &ShaderDefinition, source: &str| {
                let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(shader_def.name),
                    source: ShaderSource::Wgsl(source.into()),
                });

                let (blend, depth_write_enabled) = match blending {
                    Blending::Opaque => (wgpu::BlendState::REPLACE, true),
                    Blending::Transparent => (wgpu::BlendState::ALPHA_BLENDING, false),
                };

                let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(shader_def.name),
                    layout: Some(&layout),
                    vertex: wgpu::VertexState {
                        module: &shader,
                        entry_point: Some("vs_main"),
                        buffers: &[RENDER_MODEL_VBL],
                        compilation_options: PipelineCompilationOptions::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &shader,
                        entry_point: Some("fs_main"),
                        targets: &[Some(wgpu::ColorTargetState {
                            format,
                            blend: Some(blend),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: PipelineCompilationOptions::default(),
                    }),
                    primitive: mesh_primitive(),
                    depth_stencil: Some(wgpu::DepthStencilState {
                        format: DepthTexture::DEPTH_FORMAT,
                        depth_write_enabled,
                        depth_compare: wgpu::CompareFunction::Less,
                        stencil: StencilState::default(),
                        bias: DepthBiasState::default(),
                    }),
                    multisample: MultisampleState::default(),
                    multiview: None,
                    cache: None,
                });

                Ok(pipeline)
            },
        ),
    )
}

/// Lit and unlit meshes. The opaque pipeline is bound on entry; transparent draws
/// switch to `transparent_pipeline_id` after the opaque ones. Expects the instance
/// bind group at group 1 and a material at group 2.
pub struct MeshPass {
    pub opaque_pipeline_id: PipelineId,
    pub transparent_pipeline_id: PipelineId,
    common: Arc<RenderCommon>,
}

pub struct MeshPassTextureViews {
    pub color: wgpu::TextureView,
    pub depth: wgpu::TextureView,
}

impl Pass for MeshPass {
    type TextureViews = MeshPassTextureViews;

    fn create(
        device: &Device,
        common: Arc<RenderCommon>,
        cache_builder: &mut PipelineCacheBuilder,
    ) -> anyhow::Result<MeshPass> {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[
                &common.frame_bind_group_layout,
                &common.instance_bind_group_layout,
                &common.material_bind_group_layout,
            ],
            push_constant_ranges: &[],
        });
        let format = common.surface_format();

        let opaque_pipeline_id = add_mesh_pipeline(
            cache_builder,
            MESH_SHADER,
            layout.clone(),
            format,
            Blending::Opaque,
        );
        let transparent_pipeline_id = add_mesh_pipeline(
            cache_builder,
            TRANSPARENT_MESH_SHADER,
            layout,
            format,
            Blending::Transparent,
        );

        Ok(Self {
            opaque_pipeline_id,
            transparent_pipeline_id,
            common,
        })
    }

    fn render<'a, F>(
        &self,
        texture_views: &Self::TextureViews,
        encoder: &mut wgpu::CommandEncoder,
        pipeline_cache: &PipelineCache,
        render_callback: F,
    ) where
        F: FnOnce(&mut RenderPass) + 'a,
    {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Mesh Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &texture_views.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &texture_views.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        let Some(pipeline) = pipeline_cache.get(self.opaque_pipeline_id) else {
            return;
        };

        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &self.common.frame_bind_group, &[]);
        render_callback(&mut render_pass);
    }
}
