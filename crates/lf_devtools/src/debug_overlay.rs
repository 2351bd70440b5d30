//! Debug overlay rendered via egui on top of the 3D scene.
//!
//! egui needs a `RenderPass<'static>` while `begin_render_pass` borrows the
//! encoder, so a frame is split in two:
//!
//!   1. `prepare()` runs the UI and returns an [`OverlayFrame`] holding the
//!      tessellated primitives
//!   2. the renderer calls [`OverlayPass::encode`] on that frame, which
//!      uploads, paints with `forget_lifetime()` and frees textures
//!
//! UI logic only runs while `visible` is true (toggled by F3), but event
//! handling stays active so the overlay can intercept clicks when shown.

use lf_core::color::Color;
use lf_core::time::TimeState;
use lf_core::tunable::{TunableParam, Tunables};
use lf_render::OverlayPass;
use winit::window::Window;

#[derive(Debug, Clone, Default)]
pub struct OverlayStats {
    pub loader_phase: String,
    pub loaded_items: usize,
    pub total_items: usize,
    pub load_percentage: u32,
    /// Name of the most recently completed essential item.
    pub current_item: Option<String>,
    pub background_loaded: usize,
    pub locomotion: Option<String>,
    pub current_clip: Option<String>,
    pub body_count: usize,
    pub mesh_count: usize,
    pub letter_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct OverlayActions {
    /// Colours the user changed this frame, in widget order.
    pub color_changes: Vec<(TunableParam, Color)>,
    /// User clicked the rebuild-text button.
    pub rebuild_text: bool,
}

pub struct DebugOverlay {
    pub egui_ctx: egui::Context,
    pub egui_winit_state: egui_winit::State,
    pub egui_renderer: egui_wgpu::Renderer,
    pub visible: bool,
}

impl DebugOverlay {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat, window: &Window) -> Self {
        let egui_ctx = egui::Context::default();
        let egui_winit_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            window,
            None,
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);

        Self {
            egui_ctx,
            egui_winit_state,
            egui_renderer,
            visible: false,
        }
    }

    pub fn handle_window_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        let response = self.egui_winit_state.on_window_event(window, event);
        response.consumed
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        log::info!("Debug overlay: {}", if self.visible { "ON" } else { "OFF" });
    }

    pub fn prepare(
        &mut self,
        window: &Window,
        time: &TimeState,
        stats: &OverlayStats,
        tunables: &Tunables,
    ) -> (OverlayFrame<'_>, OverlayActions) {
        let mut actions = OverlayActions::default();
        let raw_input = self.egui_winit_state.take_egui_input(window);
        let visible = self.visible;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            if !visible {
                return;
            }
            egui::Window::new("Debug")
                .default_pos([10.0, 10.0])
                .show(ctx, |ui| {
                    ui.label(format!("FPS: {:.1}", time.smoothed_fps));
                    ui.label(format!("Frame time: {:.2} ms", time.smoothed_frame_time_ms));
                    ui.label(format!("Frame: {}", time.frame_count));

                    ui.separator();
                    ui.label(format!("Loader: {}", stats.loader_phase));
                    ui.label(format!(
                        "Essential: {}/{} ({}%)",
                        stats.loaded_items, stats.total_items, stats.load_percentage
                    ));
                    if let Some(item) = &stats.current_item {
                        ui.label(format!("Last item: {item}"));
                    }
                    ui.label(format!("Background: {}", stats.background_loaded));

                    ui.separator();
                    ui.label(format!(
                        "Locomotion: {}",
                        stats.locomotion.as_deref().unwrap_or("-")
                    ));
                    ui.label(format!("Clip: {}", stats.current_clip.as_deref().unwrap_or("-")));
                    ui.label(format!("Bodies: {}", stats.body_count));
                    ui.label(format!("Meshes: {}", stats.mesh_count));
                    ui.horizontal(|ui| {
                        ui.label(format!("Letters: {}", stats.letter_count));
                        if ui.button("Rebuild").clicked() {
                            actions.rebuild_text = true;
                        }
                    });

                    ui.separator();
                    for &param in TunableParam::ALL {
                        let mut rgb = tunables.get(param).to_rgb8();
                        ui.horizontal(|ui| {
                            ui.label(param.label());
                            if ui.color_edit_button_srgb(&mut rgb).changed() {
                                actions.color_changes.push((param, Color::from_rgb8(rgb)));
                            }
                        });
                    }
                });
        });

        self.egui_winit_state
            .handle_platform_output(window, full_output.platform_output);

        let primitives = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [window.inner_size().width, window.inner_size().height],
            pixels_per_point: full_output.pixels_per_point,
        };

        (
            OverlayFrame {
                overlay: self,
                primitives,
                textures_delta: full_output.textures_delta,
                screen_descriptor,
            },
            actions,
        )
    }
}

/// One prepared overlay frame, ready to be composited by the renderer.
pub struct OverlayFrame<'a> {
    overlay: &'a mut DebugOverlay,
    primitives: Vec<egui::ClippedPrimitive>,
    textures_delta: egui::TexturesDelta,
    screen_descriptor: egui_wgpu::ScreenDescriptor,
}

impl OverlayPass for OverlayFrame<'_> {
    fn encode(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        size: (u32, u32),
    ) {
        self.screen_descriptor.size_in_pixels = [size.0, size.1];
        let renderer = &mut self.overlay.egui_renderer;
        for (id, image_delta) in &self.textures_delta.set {
            renderer.update_texture(device, queue, *id, image_delta);
        }
        renderer.update_buffers(device, queue, encoder, &self.primitives, &self.screen_descriptor);

        {
            let mut egui_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            renderer.render(&mut egui_pass, &self.primitives, &self.screen_descriptor);
        }

        for id in &self.textures_delta.free {
            renderer.free_texture(id);
        }
    }
}
