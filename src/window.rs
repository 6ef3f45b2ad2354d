use std::{sync::Arc, time::Instant};

use anyhow::Context;
use glam::Vec2;
use imgui::{FontConfig, FontSource};
use imgui_winit_support::{HiDpiMode, WinitPlatform};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use crate::{
    configurator::ConfiguratorState, engine, rendering::config::CAR_MODEL_PATH,
    rendering::renderer::Renderer, ui::Overlay,
};

// Pixels per line for wheel events reported in lines
const PIXELS_PER_LINE: f32 = 40.0;

struct ImguiState {
    context: imgui::Context,
    platform: WinitPlatform,
}

struct App {
    renderer: Option<Renderer>,
    state: ConfiguratorState,
    overlay: Overlay,
    mouse_pos: Vec2,
    dragging: bool,
    imgui: Option<ImguiState>,
    last_frame: Instant,
}

impl App {
    fn from_state(state: ConfiguratorState) -> Self {
        Self {
            renderer: None,
            state,
            overlay: Overlay::default(),
            mouse_pos: Vec2::ZERO,
            dragging: false,
            imgui: None,
            last_frame: Instant::now(),
        }
    }

    fn setup_imgui(&mut self, window: &Window) {
        let mut context = imgui::Context::create();
        let mut platform = WinitPlatform::new(&mut context);

        let pixel_ratio = self
            .state
            .render_config
            .pixel_ratio(window.scale_factor());
        platform.attach_window(context.io_mut(), window, HiDpiMode::Locked(pixel_ratio));

        let font_size = (14.0 * pixel_ratio) as f32;
        context.fonts().add_font(&[FontSource::DefaultFontData {
            config: Some(FontConfig {
                oversample_h: 1,
                pixel_snap_h: true,
                size_pixels: font_size,
                ..Default::default()
            }),
        }]);
        context.io_mut().font_global_scale = (1.0 / pixel_ratio) as f32;

        context.set_ini_filename(None);

        self.imgui = Some(ImguiState { context, platform });
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title("Car configurator")
            .with_inner_size(LogicalSize::new(1280.0, 800.0));
        let window = event_loop
            .create_window(window_attributes)
            .context("Failed to create window")?;

        self.setup_imgui(&window);
        let imgui = self.imgui.as_mut().context("imgui not initialised")?;

        let renderer = pollster::block_on(Renderer::new(
            Arc::new(window),
            &self.state,
            &mut imgui.context,
        ))?;
        renderer.window.request_redraw();
        self.renderer = Some(renderer);

        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let (Some(imgui), Some(renderer)) = (self.imgui.as_mut(), self.renderer.as_mut()) else {
            return Ok(());
        };

        let now = Instant::now();
        imgui
            .context
            .io_mut()
            .update_delta_time(now - self.last_frame);
        self.last_frame = now;

        renderer.window.request_redraw();

        imgui
            .platform
            .prepare_frame(imgui.context.io_mut(), &renderer.window)
            .context("Failed to prepare imgui frame")?;

        let ui = imgui.context.new_frame();
        engine::update(&mut self.state, &mut self.overlay, renderer, ui)?;
        imgui.platform.prepare_render(ui, &renderer.window);

        match renderer.render(&mut self.state) {
            Ok(frame) => {
                if let Err(error) = renderer.finish_frame(frame, &mut imgui.context) {
                    log::warn!("{:?}", error);
                }
            }
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                renderer.resize(renderer.size);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of memory");
                event_loop.exit();
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timeout");
            }
            Err(other) => {
                log::error!("Unexpected error: {:?}", other);
            }
        }

        Ok(())
    }

    fn wants_mouse(&self) -> bool {
        self.imgui
            .as_ref()
            .is_some_and(|imgui| imgui.context.io().want_capture_mouse)
    }

    fn handle_input(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                let position = Vec2::new(position.x as f32, position.y as f32);
                let delta = position - self.mouse_pos;
                self.mouse_pos = position;

                if self.dragging {
                    let height = self
                        .renderer
                        .as_ref()
                        .map(|renderer| renderer.size.height as f32)
                        .unwrap_or(1.0);
                    self.state.orbit.rotate(delta, height);
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = *state == ElementState::Pressed && !self.wants_mouse();
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if self.wants_mouse() {
                    return;
                }

                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
                };
                self.state.orbit.zoom(steps);
            }
            _ => (),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }

        if let Err(error) = self.init(event_loop) {
            log::error!("Failed to initialise: {:?}", error);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        match &event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(*new_size);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(error) = self.redraw(event_loop) {
                    log::error!("Frame failed: {:?}", error);
                    event_loop.exit();
                }
            }
            other => self.handle_input(other),
        }

        if let (Some(imgui), Some(renderer)) = (self.imgui.as_mut(), self.renderer.as_ref()) {
            imgui.platform.handle_event::<()>(
                imgui.context.io_mut(),
                &renderer.window,
                &Event::WindowEvent { window_id, event },
            );
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let state = ConfiguratorState::new(CAR_MODEL_PATH);
    let mut app = App::from_state(state);
    event_loop.run_app(&mut app)?;

    Ok(())
}
