use std::sync::Arc;

use anyhow::Context;
use glam::Vec3;
use id_arena::Arena;
use wgpu::CommandEncoderDescriptor;
use winit::{dpi::PhysicalSize, window::Window};

use crate::{
    camera::CameraUniform,
    configurator::ConfiguratorState,
    math::bounds::AABB,
    rendering::{
        global_uniform::GlobalUniformState,
        imgui_renderer::ImguiRendererState,
        instance::{DrawItem, DrawList, InstanceBuffer},
        lights::{shadow_view_proj, LightsUniformState},
        passes::{
            ground_pass::{GroundPass, GroundPassTextureViews},
            mesh_pass::{MeshPass, MeshPassTextureViews},
            pass::{draw_fullscreen, Pass},
            shadow_pass::{ShadowPass, ShadowPassTextureViews},
            sky_pass::{SkyPass, SkyPassTextureViews},
        },
        render_common::RenderCommon,
        render_material_manager::RenderMaterialManager,
        render_model::RenderModel,
        shader_loader::{PipelineCacheBuilder, ShaderLoader},
        texture::DepthTexture,
    },
};

/// Shadow bounds used before anything casting a shadow has been loaded.
fn default_shadow_bounds() -> AABB {
    AABB::new(Vec3::new(-1.0, 0.0, -2.2), Vec3::new(1.0, 1.3, 2.2))
}

/// A frame whose scene passes have been recorded. Finished by `Renderer::finish_frame`
/// once the UI has been built.
pub struct FrameOutput {
    output: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

pub struct Renderer {
    pub window: Arc<Window>,
    pub size: PhysicalSize<u32>,

    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,

    common: Arc<RenderCommon>,
    depth_texture: DepthTexture,
    camera_uniform: CameraUniform,

    render_models: Arena<RenderModel>,
    render_materials: RenderMaterialManager,
    instance_buffer: InstanceBuffer,

    shader_loader: ShaderLoader,

    shadow_pass: ShadowPass,
    sky_pass: SkyPass,
    ground_pass: GroundPass,
    mesh_pass: MeshPass,
    imgui_renderer: ImguiRendererState,
}

impl Renderer {
    pub async fn new(
        window: Arc<Window>,
        state: &ConfiguratorState,
        imgui_context: &mut imgui::Context,
    ) -> anyhow::Result<Renderer> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;

        log::info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to request device")?;

        let mut camera_uniform = CameraUniform::default();
        camera_uniform.update(size, &state.camera);
        let camera_uniform_buffer = camera_uniform.create_buffer(&device);

        let common = Arc::new(RenderCommon::new(
            &device,
            &adapter,
            &surface,
            size,
            camera_uniform_buffer,
            state.render_config.clone(),
        )?);

        let depth_texture = DepthTexture::new(&device, size, "Depth Texture");

        let mut cache_builder = PipelineCacheBuilder::new();
        let shadow_pass = ShadowPass::create(&device, common.clone(), &mut cache_builder)?;
        let sky_pass = SkyPass::create(&device, common.clone(), &mut cache_builder)?;
        let ground_pass = GroundPass::create(&device, common.clone(), &mut cache_builder)?;
        let mesh_pass = MeshPass::create(&device, common.clone(), &mut cache_builder)?;

        let shader_loader = ShaderLoader::new(device.clone(), cache_builder)?;

        let render_materials = RenderMaterialManager::new(
            &device,
            &queue,
            common.material_bind_group_layout.clone(),
        );
        let instance_buffer = InstanceBuffer::new(&device, &common.instance_bind_group_layout);

        let imgui_renderer =
            ImguiRendererState::new(&device, &queue, common.surface_format(), imgui_context);

        Ok(Self {
            window,
            size,
            surface,
            device,
            queue,
            common,
            depth_texture,
            camera_uniform,
            render_models: Arena::new(),
            render_materials,
            instance_buffer,
            shader_loader,
            shadow_pass,
            sky_pass,
            ground_pass,
            mesh_pass,
            imgui_renderer,
        })
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        let mut config = match self.common.output_surface_config.write() {
            Ok(config) => config,
            Err(poisoned) => poisoned.into_inner(),
        };

        self.size = new_size;
        config.width = new_size.width;
        config.height = new_size.height;
        self.depth_texture.resize(&self.device, new_size);
        self.surface.configure(&self.device, &config);
    }

    /// Uploads geometry the scene gained since the last frame.
    fn upload_models(&mut self, state: &mut ConfiguratorState) {
        let mut uploaded = 0;

        for (_id, scene_model) in state.scene.models.iter_mut() {
            if scene_model.render_model.is_some() {
                continue;
            }

            let render_model = RenderModel::from_model(&self.device, &scene_model.model);
            scene_model.render_model = Some(self.render_models.alloc(render_model));
            uploaded += 1;
        }

        if uploaded > 0 {
            log::info!("Uploaded {} models to the GPU", uploaded);
        }
    }

    pub fn render(
        &mut self,
        state: &mut ConfiguratorState,
    ) -> Result<FrameOutput, wgpu::SurfaceError> {
        self.shader_loader.load_pending_shaders();

        self.upload_models(state);
        let fallback_material = state.materials.default_material();
        self.render_materials.sync(&state.materials);

        let config = &self.common.config;

        self.camera_uniform.update(self.size, &state.camera);
        self.camera_uniform
            .update_buffer(&self.queue, &self.common.camera_uniform_buffer);
        self.common.global_uniform.update(
            &self.queue,
            GlobalUniformState::new(
                self.size,
                state.clock.elapsed(),
                state.ground_offset(),
                config,
            ),
        );

        let draw_list = DrawList::gather(
            &state.scene,
            &state.materials,
            fallback_material,
            state.camera.eye,
        );
        log::trace!("Drawing {} instances", draw_list.len());

        let shadow_bounds = draw_list
            .shadow_bounds
            .unwrap_or_else(default_shadow_bounds);
        self.common.lights.update(
            &self.queue,
            LightsUniformState::new(
                config,
                shadow_view_proj(config.shadow_caster(), &shadow_bounds),
            ),
        );

        self.instance_buffer.write(
            &self.device,
            &self.queue,
            &self.common.instance_bind_group_layout,
            &draw_list.instances,
        );

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let pipeline_cache = &self.shader_loader.cache;
        let instance_bind_group = self.instance_buffer.bind_group();

        self.shadow_pass.render(
            &ShadowPassTextureViews {
                depth: self.common.shadow_map.view().clone(),
            },
            &mut encoder,
            pipeline_cache,
            |render_pass| {
                render_pass.set_bind_group(1, instance_bind_group, &[]);
                for item in draw_list.shadow_casters() {
                    if let Some(model) = self.render_models.get(item.render_model) {
                        if !model.is_empty() {
                            model.draw(render_pass, item.instance);
                        }
                    }
                }
            },
        );

        self.sky_pass.render(
            &SkyPassTextureViews {
                color: view.clone(),
            },
            &mut encoder,
            pipeline_cache,
            draw_fullscreen,
        );

        self.ground_pass.render(
            &GroundPassTextureViews {
                color: view.clone(),
                depth: self.depth_texture.view().clone(),
            },
            &mut encoder,
            pipeline_cache,
            draw_fullscreen,
        );

        self.mesh_pass.render(
            &MeshPassTextureViews {
                color: view.clone(),
                depth: self.depth_texture.view().clone(),
            },
            &mut encoder,
            pipeline_cache,
            |render_pass| {
                render_pass.set_bind_group(1, instance_bind_group, &[]);
                self.draw_items(render_pass, &draw_list.opaque);

                if let Some(pipeline) = pipeline_cache.get(self.mesh_pass.transparent_pipeline_id)
                {
                    render_pass.set_pipeline(pipeline);
                    self.draw_items(render_pass, &draw_list.transparent);
                }
            },
        );

        Ok(FrameOutput {
            output,
            view,
            encoder,
        })
    }

    fn draw_items(&self, render_pass: &mut wgpu::RenderPass, items: &[DrawItem]) {
        for item in items {
            let Some(model) = self.render_models.get(item.render_model) else {
                continue;
            };
            if model.is_empty() {
                continue;
            }
            let Some(bind_group) = self.render_materials.bind_group(item.material) else {
                continue;
            };

            render_pass.set_bind_group(2, bind_group, &[]);
            model.draw(render_pass, item.instance);
        }
    }

    pub fn finish_frame(
        &mut self,
        frame: FrameOutput,
        imgui_context: &mut imgui::Context,
    ) -> anyhow::Result<()> {
        let FrameOutput {
            output,
            view,
            mut encoder,
        } = frame;

        let ui_result = self.imgui_renderer.render(
            &view,
            imgui_context,
            &self.device,
            &self.queue,
            &mut encoder,
        );

        self.queue.submit([encoder.finish()]);
        output.present();

        ui_result
    }
}
