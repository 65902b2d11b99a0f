//! Desktop host: window, event loop, renderer and UI around a [`Viewer`].

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{DeviceEvent, DeviceId, Event, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{CursorGrabMode, Window, WindowAttributes, WindowId},
};

use crate::controls::{Capabilities, ControlResponse, WinitInput};
use crate::gfx::rendering::RenderEngine;
use crate::markers::FileStorage;
use crate::model::{self, ModelLoadTask};
use crate::options::ViewerOptions;
use crate::ui::{MapPanels, UiAction, UiManager};
use crate::viewer::Viewer;

pub struct CampusApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

struct AppState {
    viewer: Viewer<FileStorage>,
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    ui_manager: Option<UiManager>,
    panels: MapPanels,
    input: WinitInput,
    load_task: Option<ModelLoadTask>,
    last_frame: Instant,
    fatal: Option<anyhow::Error>,
}

impl CampusApp {
    /// Opens the marker storage and starts parsing the models in the
    /// background. The window appears once [`Self::run`] is called.
    pub fn new(options: ViewerOptions) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new().context("creating the event loop")?;

        let storage = &options.storage;
        let open = || FileStorage::new(storage.directory.clone()).with_quota(storage.quota_bytes);
        let (photo_storage, pin_storage) = (open(), open());

        let caps = Capabilities {
            touch: false,
            width: options.window.width,
            height: options.window.height,
        };
        let load_task = model::spawn_load(options.models.assets.clone(), options.models.default_color);
        let viewer = Viewer::new(options, caps, photo_storage, pin_storage)
            .context("opening the marker collections")?;

        Ok(Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                viewer,
                window: None,
                render_engine: None,
                ui_manager: None,
                panels: MapPanels::new(),
                input: WinitInput::new(),
                load_task: Some(load_task),
                last_frame: Instant::now(),
                fatal: None,
            },
        })
    }

    /// Runs the event loop until the window closes.
    pub fn run(mut self) -> anyhow::Result<()> {
        let event_loop = self
            .event_loop
            .take()
            .context("event loop already consumed")?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop
            .run_app(&mut self.app_state)
            .context("running the event loop")?;

        match self.app_state.fatal.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_options = self.viewer.options().window.clone();
        let window = event_loop
            .create_window(
                WindowAttributes::default()
                    .with_title(window_options.title.clone())
                    .with_inner_size(LogicalSize::new(window_options.width, window_options.height)),
            )
            .context("creating the window")?;
        let window = Arc::new(window);

        let (width, height) = window.inner_size().into();
        let window_clone = window.clone();
        let renderer = pollster::block_on(RenderEngine::new(window_clone, width, height, &window_options))
            .context("starting the renderer")?;

        let font = window_options.font_path.as_ref().and_then(|path| {
            std::fs::read(path)
                .map_err(|e| log::warn!("Could not read UI font {}: {}", path.display(), e))
                .ok()
        });
        let mut ui_manager = UiManager::new(
            renderer.device(),
            renderer.queue(),
            renderer.surface_format(),
            &window,
            font.as_deref(),
        );
        ui_manager.update_display_size(width, height);
        self.viewer.resize(width, height);

        self.ui_manager = Some(ui_manager);
        self.render_engine = Some(renderer);
        self.window = Some(window);
        Ok(())
    }

    fn apply_response(&self, response: ControlResponse) {
        let (Some(locked), Some(window)) = (response.pointer_lock, self.window.as_ref()) else {
            return;
        };
        if locked {
            let grabbed = window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
            if let Err(e) = grabbed {
                log::warn!("Pointer lock unavailable: {}", e);
            }
            window.set_cursor_visible(false);
        } else {
            if let Err(e) = window.set_cursor_grab(CursorGrabMode::None) {
                log::warn!("Could not release the pointer: {}", e);
            }
            window.set_cursor_visible(true);
        }
    }

    fn poll_models(&mut self) {
        let Some(result) = self.load_task.as_mut().and_then(|task| task.poll()) else {
            return;
        };
        self.load_task = None;

        match result.and_then(|outcomes| self.viewer.install_models(outcomes)) {
            Ok(report) => log::info!(
                "Map ready: {} object(s), {} skipped",
                report.loaded.len(),
                report.skipped.len()
            ),
            Err(e) => {
                log::error!("Could not load the map: {}", e);
                self.panels.set_status(format!("Could not load the map: {}", e));
            }
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = now - self.last_frame;
        self.last_frame = now;

        self.poll_models();
        self.viewer.frame(dt);
        for event in self.viewer.drain_events() {
            self.panels.on_viewer_event(&event);
        }

        let (Some(render_engine), Some(ui_manager), Some(window)) = (
            self.render_engine.as_mut(),
            self.ui_manager.as_mut(),
            self.window.as_ref(),
        ) else {
            return;
        };
        render_engine.update(self.viewer.scene.camera.uniform);

        let mut actions: Vec<UiAction> = Vec::new();
        let viewer = &self.viewer;
        let panels = &mut self.panels;
        let rendered = render_engine.render_frame(&viewer.scene, |device, queue, encoder, view| {
            ui_manager.draw(device, queue, encoder, window, view, |ui| {
                actions = panels.build(ui, viewer);
            });
        });
        if let Err(e) = rendered {
            log::error!("Rendering failed: {}", e);
            self.fatal = Some(anyhow::Error::new(e).context("rendering a frame"));
            event_loop.exit();
            return;
        }

        for action in actions {
            let response = self.panels.apply(&mut self.viewer, action);
            self.apply_response(response);
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init_graphics(event_loop) {
            log::error!("{:#}", e);
            self.fatal = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.clone() else {
            return;
        };

        if let Some(ui_manager) = self.ui_manager.as_mut() {
            let ui_event: Event<()> = Event::WindowEvent {
                window_id,
                event: event.clone(),
            };
            // Releases still reach the viewer so no key stays held.
            let is_release = matches!(
                &event,
                WindowEvent::KeyboardInput { event: key, .. } if !key.state.is_pressed()
            );
            if ui_manager.handle_input(&window, &ui_event) && !self.viewer.is_pointer_locked() && !is_release {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Some(render_engine) = self.render_engine.as_mut() {
                    render_engine.resize(width, height);
                }
                if let Some(ui_manager) = self.ui_manager.as_mut() {
                    ui_manager.update_display_size(width, height);
                }
                self.viewer.resize(width, height);
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            other => {
                if let Some(input) = self.input.translate_window_event(&other) {
                    let response = self.viewer.handle_input(&input);
                    self.apply_response(response);
                }
            }
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if !self.viewer.is_pointer_locked() {
            return;
        }
        if let Some(input) = self.input.translate_device_event(&event) {
            let response = self.viewer.handle_input(&input);
            self.apply_response(response);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}
