use std::sync::Arc;

use anyhow::Context;
use glam::Vec2;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use crate::{
    config::ViewerConfig,
    controls::DragMode,
    loader::GltfLoader,
    rendering::renderer::Renderer,
    viewer::Viewer,
};

/// Pixel scroll distance treated as one wheel line.
const PIXELS_PER_LINE: f32 = 40.0;

fn scroll_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
    }
}

struct App {
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    viewer: Option<Viewer<Renderer>>,
    startup_error: Option<anyhow::Error>,
}

impl App {
    fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            window: None,
            viewer: None,
            startup_error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let (width, height) = self.config.window_size;
        let window_attributes = Window::default_attributes()
            .with_title(self.config.window_title.clone())
            .with_inner_size(PhysicalSize::new(width, height));

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("Failed to create window")?,
        );

        let renderer =
            pollster::block_on(Renderer::new(window.clone(), self.config.sample_count))?;

        let size = window.inner_size();
        let mut viewer = Viewer::new(self.config.clone(), size.width, size.height);
        viewer.mount(renderer);
        viewer.start_loading(&GltfLoader);

        window.request_redraw();

        self.window = Some(window);
        self.viewer = Some(viewer);

        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(error) = self.init(event_loop) {
            self.startup_error = Some(error.context("Failed to start viewer"));
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let (Some(window), Some(viewer)) = (self.window.as_ref(), self.viewer.as_mut()) else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                viewer.teardown();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                viewer.resize(new_size.width, new_size.height);
            }
            WindowEvent::MouseInput { state, button, .. } => match (state, button) {
                (ElementState::Pressed, MouseButton::Left) => {
                    viewer.controls.begin_drag(DragMode::Rotate)
                }
                (ElementState::Pressed, MouseButton::Right) => {
                    viewer.controls.begin_drag(DragMode::Pan)
                }
                (ElementState::Released, MouseButton::Left | MouseButton::Right) => {
                    viewer.controls.end_drag()
                }
                _ => (),
            },
            WindowEvent::CursorMoved { position, .. } => {
                let position = Vec2::new(position.x as f32, position.y as f32);
                let viewport_height = viewer.viewport_height();
                viewer
                    .controls
                    .pointer_moved(&viewer.camera, position, viewport_height);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                viewer.controls.wheel(scroll_lines(delta));
            }
            WindowEvent::RedrawRequested => {
                match viewer.run_frame(|| window.request_redraw()) {
                    None | Some(Ok(())) => (),
                    Some(Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                        let size = window.inner_size();
                        viewer.resize(size.width, size.height);
                    }
                    Some(Err(wgpu::SurfaceError::OutOfMemory)) => {
                        log::error!("Out of memory");
                        viewer.teardown();
                        event_loop.exit();
                    }
                    Some(Err(wgpu::SurfaceError::Timeout)) => {
                        log::warn!("Timeout");
                    }
                    Some(Err(other)) => {
                        log::error!("Unexpected error: {:?}", other);
                    }
                }
            }
            _ => (),
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(viewer) = self.viewer.as_mut() {
            viewer.teardown();
        }
    }
}

pub async fn run(config: ViewerConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.startup_error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
