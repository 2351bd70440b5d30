//! Letterfall: a character walking around a building while a word made of
//! physics-driven glyphs drops in front of it.
//!
//! winit drives the event loop via `ApplicationHandler`. Each `RedrawRequested`
//! is one frame:
//!
//!   1. `begin_frame()` measures the wall-clock delta
//!   2. the debug overlay builds its UI from the previous frame's stats
//!   3. [`GameSession::tick`] pumps loading, steps physics, drives the
//!      character, syncs meshes and hands the scene to the renderer
//!   4. overlay actions (colour edits, text rebuild) are applied
//!
//! Asset decoding happens on worker threads; everything that touches the
//! scene or the physics world runs here on the main thread.

mod assets;
mod binder;
mod camera_rig;
mod character;
mod config;
mod director;
#[cfg(test)]
mod fixtures;
mod font;
mod model;
mod sequencer;
mod session;
mod text;

use std::path::Path;
use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use assets::FsAssetSource;
use config::{load_config_from_path, GameConfig, CONFIG_PATH};
use lf_core::input::Key;
use lf_core::time::TimeState;
use lf_devtools::{DebugOverlay, OverlayFrame};
use lf_platform::window::PlatformConfig;
use lf_render::{Camera3D, FrameSink, GpuContext, OverlayPass, Renderer, SceneGraph};
use session::GameSession;

/// Routes a finished scene to the GPU along with this frame's overlay.
struct Presenter<'a> {
    gpu: &'a GpuContext,
    renderer: &'a mut Renderer,
    overlay: Option<OverlayFrame<'a>>,
}

impl FrameSink for Presenter<'_> {
    fn submit(&mut self, scene: &SceneGraph, camera: &Camera3D) {
        let overlay = self.overlay.as_mut().map(|frame| frame as &mut dyn OverlayPass);
        self.renderer.render(self.gpu, scene, camera, overlay);
    }
}

/// Everything that needs a live window and GPU surface. Built lazily in
/// `ApplicationHandler::resumed`.
struct EngineState {
    window: Arc<Window>,
    gpu: GpuContext,
    renderer: Renderer,
    debug_overlay: DebugOverlay,
    time: TimeState,
    session: Option<GameSession>,
}

impl EngineState {
    fn new(window: Arc<Window>, config: GameConfig) -> Result<Self, String> {
        let gpu = GpuContext::new(window.clone())?;
        let renderer = Renderer::new(&gpu);
        let debug_overlay = DebugOverlay::new(&gpu.device, gpu.surface_format, &window);
        let source = Arc::new(FsAssetSource::new(&config.assets.root));
        let session = GameSession::new(config, source, gpu.size);
        Ok(Self {
            window,
            gpu,
            renderer,
            debug_overlay,
            time: TimeState::new(),
            session: Some(session),
        })
    }

    fn redraw(&mut self) {
        if self.gpu.size.0 == 0 || self.gpu.size.1 == 0 {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let dt = self.time.begin_frame() as f32;
        let stats = session.overlay_stats();
        let tunables = *session.tunables();
        let (frame, actions) = self
            .debug_overlay
            .prepare(&self.window, &self.time, &stats, &tunables);

        let mut presenter = Presenter {
            gpu: &self.gpu,
            renderer: &mut self.renderer,
            overlay: Some(frame),
        };
        session.tick(dt, &mut presenter);

        for (param, color) in actions.color_changes {
            session.apply_tunable_color(param, color);
            log::debug!("{} set to {}", param.label(), color.to_hex());
        }
        if actions.rebuild_text {
            session.rebuild_text();
        }
    }

    fn shutdown(&mut self) {
        if let Some(session) = self.session.take() {
            let report = session.teardown();
            if report.leaked_bodies > 0 {
                log::error!("{} physics bodies outlived the session", report.leaked_bodies);
            }
        }
    }
}

struct App {
    config: GameConfig,
    state: Option<EngineState>,
}

impl App {
    fn new(config: GameConfig) -> Self {
        Self { config, state: None }
    }

    fn platform_config(&self) -> PlatformConfig {
        let window = &self.config.window;
        PlatformConfig {
            title: window.title.clone(),
            width: window.width,
            height: window.height,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let platform = self.platform_config();
        let window = match lf_platform::window::create_window(event_loop, &platform) {
            Ok(window) => window,
            Err(err) => {
                log::error!("Failed to create window: {}", err);
                event_loop.exit();
                return;
            }
        };
        log::info!("Window created: {}x{}", platform.width, platform.height);

        match EngineState::new(window, self.config.clone()) {
            Ok(state) => self.state = Some(state),
            Err(err) => {
                log::error!("Failed to initialise GPU: {}", err);
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        let egui_consumed = state.debug_overlay.handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                state.shutdown();
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let (w, h) = (physical_size.width, physical_size.height);
                if w > 0 && h > 0 {
                    state.gpu.resize(w, h);
                    if let Some(session) = state.session.as_mut() {
                        session.resize(w, h);
                    }
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                let PhysicalKey::Code(key_code) = event.physical_key else {
                    return;
                };
                let Some(key) = map_key(key_code) else {
                    return;
                };
                let pressed = event.state == ElementState::Pressed;
                match key {
                    Key::Escape if pressed => {
                        log::info!("Escape pressed, exiting.");
                        state.shutdown();
                        event_loop.exit();
                    }
                    Key::F3 if pressed => state.debug_overlay.toggle(),
                    _ => {
                        if let Some(session) = state.session.as_mut() {
                            if pressed {
                                session.input.key_down(key);
                            } else {
                                session.input.key_up(key);
                            }
                        }
                    }
                }
            }

            WindowEvent::Focused(false) => {
                if let Some(session) = state.session.as_mut() {
                    session.input.release_all();
                }
            }

            WindowEvent::RedrawRequested => state.redraw(),

            _ => {}
        }
    }
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::ArrowUp => Some(Key::ArrowUp),
        KeyCode::ArrowDown => Some(Key::ArrowDown),
        KeyCode::ArrowLeft => Some(Key::ArrowLeft),
        KeyCode::ArrowRight => Some(Key::ArrowRight),
        KeyCode::ShiftLeft => Some(Key::ShiftLeft),
        KeyCode::ShiftRight => Some(Key::ShiftRight),
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::F3 => Some(Key::F3),
        _ => None,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Letterfall starting...");

    if let Some(reason) = lf_platform::capability::detect().missing_reason() {
        log::error!("Cannot start: {}", reason);
        return;
    }

    let config = match load_config_from_path(Path::new(CONFIG_PATH)) {
        Ok(config) => config,
        Err(err) => {
            log::error!("{}", err);
            return;
        }
    };

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("Failed to create event loop: {}", err);
            return;
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    if let Err(err) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {}", err);
    }
}
