#![cfg_attr(not(debug_assertions), warn(missing_docs))]

//! Interactive electrostatics canvas built on top of the `coulomb_rs` kernel.
//!
//! Charges are dragged directly on the canvas and edited through a
//! right-click context menu (the menu also deletes). A background worker
//! thread re-traces the field lines on every configuration change and
//! progressively supersamples a field-magnitude heat map, while the UI
//! thread visualises the accumulating image and shows the net
//! position-independent field equations for the current scene.

mod scene;
mod worker;

use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex, TryLockError};
use std::time::Duration;

use eframe::egui::{
    self, Align2, Color32, ColorImage, Context, FontId, Sense, Slider, Stroke, TextureHandle,
    TextureOptions,
};
use eframe::{App, CreationContext, Frame, NativeOptions};
use tracing::info;

use coulomb_rs::{
    log_compress, Orientation, Polarity, Polyline, Rect, Stats, TraceStatsSnapshot, Vec2,
};

use crate::scene::{build_charge_set, ChargeKind, MenuOutcome, SceneCharge};
use crate::worker::{
    spawn_worker, FieldBuffers, JobConfig, ProgressEvent, RenderParams, WorkerCommand,
};

/// Rendered net-field equations for the current scene.
#[derive(Default)]
struct Equations {
    magnitude: String,
    x: String,
    y: String,
}

impl Equations {
    fn for_scene(scene: &[SceneCharge]) -> Self {
        let set = build_charge_set(scene);
        Self {
            magnitude: format!("|E| = {}", set.magnitude_equation()),
            x: format!("Ex = {}", set.x_equation()),
            y: format!("Ey = {}", set.y_equation()),
        }
    }
}

/// Mapping between the simulation plane and canvas pixels for one frame.
#[derive(Copy, Clone)]
struct CanvasTransform {
    bounds: Rect,
    scale: f32,
    origin: egui::Pos2,
}

impl CanvasTransform {
    /// Fit `bounds` into `avail`, preserving aspect ratio (letterboxed).
    fn fit(bounds: Rect, avail: egui::Rect) -> Self {
        let scale = (avail.width() / bounds.width())
            .min(avail.height() / bounds.height())
            .max(0.01);
        let size = egui::vec2(bounds.width() * scale, bounds.height() * scale);
        let origin = avail.center() - size * 0.5;
        Self {
            bounds,
            scale,
            origin,
        }
    }

    fn to_screen(&self, p: Vec2) -> egui::Pos2 {
        egui::pos2(
            self.origin.x + (p.x - self.bounds.min.x) * self.scale,
            self.origin.y + (self.bounds.max.y - p.y) * self.scale,
        )
    }

    fn to_world(&self, pos: egui::Pos2) -> Vec2 {
        Vec2::new(
            self.bounds.min.x + (pos.x - self.origin.x) / self.scale,
            self.bounds.max.y - (pos.y - self.origin.y) / self.scale,
        )
    }

    fn image_rect(&self) -> egui::Rect {
        egui::Rect::from_min_max(
            self.to_screen(Vec2::new(self.bounds.min.x, self.bounds.max.y)),
            self.to_screen(Vec2::new(self.bounds.max.x, self.bounds.min.y)),
        )
    }
}

/// Top-level eframe application responsible for the UI and worker orchestration.
struct ChargeApp {
    /// Current UI-side render configuration.
    params: RenderParams,
    /// The editable charges.
    scene: Vec<SceneCharge>,
    /// Variant produced by the "add charge" buttons.
    add_kind: ChargeKind,
    /// Shared accumulation buffers.
    buffers: Arc<Mutex<FieldBuffers>>,
    /// Channel used to push commands to the worker.
    cmd_tx: Sender<WorkerCommand>,
    /// Channel used by the worker to publish progress.
    progress_rx: Receiver<ProgressEvent>,
    /// GPU texture that mirrors the progressive heat-map.
    texture: Option<TextureHandle>,
    /// CPU staging buffer used to upload RGBA pixels to `texture`.
    upload_rgba: Vec<u8>,
    /// Last known total magnitude sample count.
    latest_total_samples: u64,
    /// Field lines for the current configuration.
    polylines: Vec<Polyline>,
    /// Trace statistics for the current configuration.
    trace_stats: TraceStatsSnapshot,
    /// Net equations for the current scene.
    equations: Equations,
    /// Tracks whether a new frame arrived and needs uploading.
    dirty: bool,
}

impl ChargeApp {
    /// Construct the app, spawn the worker thread, and kick off the first render.
    fn new(cc: &CreationContext<'_>) -> Self {
        let buffers = Arc::new(Mutex::new(FieldBuffers::new()));
        let (cmd_tx, progress_rx) = spawn_worker(buffers.clone());

        // Start from a dipole so the canvas has something to show.
        let scene = vec![
            SceneCharge::point(Vec2::new(-0.8, 0.0), 1.0),
            SceneCharge::point(Vec2::new(0.8, 0.0), -1.0),
        ];

        let mut app = Self {
            params: RenderParams::default(),
            scene,
            add_kind: ChargeKind::Point,
            buffers,
            cmd_tx,
            progress_rx,
            texture: None,
            upload_rgba: Vec::new(),
            latest_total_samples: 0,
            polylines: Vec::new(),
            trace_stats: TraceStatsSnapshot::default(),
            equations: Equations::default(),
            dirty: false,
        };

        // Prime the worker with the default configuration.
        app.push_config();
        // Provide an initial placeholder texture so the canvas can render immediately.
        app.ensure_texture(
            &cc.egui_ctx,
            [app.params.grid as usize, app.params.grid as usize],
        );

        app
    }

    /// Send the current configuration to the worker and refresh the cached equations.
    fn push_config(&mut self) {
        self.latest_total_samples = 0;
        self.equations = Equations::for_scene(&self.scene);
        let config = JobConfig {
            set: build_charge_set(&self.scene),
            params: self.params.clone(),
        };
        if let Err(err) = self.cmd_tx.send(WorkerCommand::Configure(Box::new(config))) {
            tracing::error!(?err, "failed to send configuration");
        }
    }

    /// Rebuild `upload_rgba` and refresh the GPU texture from the shared buffers.
    fn refresh_texture(&mut self, ctx: &Context) -> bool {
        // Try to lock the shared buffers for reading.
        let guard = match self.buffers.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                // Worker currently owns the lock; try again next frame.
                return false;
            }
        };
        // If the buffers are empty, there's nothing to display.
        if guard.width == 0 || guard.height == 0 {
            return true;
        }

        // Ensure the staging RGBA buffer is the correct size.
        let len_rgba = guard.width * guard.height * 4;
        if self.upload_rgba.len() != len_rgba {
            self.upload_rgba.resize(len_rgba, 0);
        }

        // Robust log-domain range for tone mapping: field magnitudes span
        // decades, so min/max alone renders a dot on black.
        let mut summary = Stats::default();
        for (sum, count) in guard.accum.iter().zip(guard.samples.iter()) {
            if *count > 0 {
                summary.push(log_compress(*sum / *count as f32));
            }
        }
        let (min, mut max) = summary.robust_range(2.5).unwrap_or((0.0, 1.0));
        if (max - min).abs() < f32::EPSILON {
            max = min + 1e-4;
        }

        self.latest_total_samples = guard.total_samples();
        self.polylines = guard.polylines.clone();
        self.trace_stats = guard.trace_stats;

        // Tone-map the floating point buffer into RGBA for the GUI.
        for (idx, rgba) in self.upload_rgba.chunks_exact_mut(4).enumerate() {
            if guard.samples[idx] == 0 {
                // Use a dark grey for unvisited pixels.
                rgba.copy_from_slice(&[12, 12, 12, 255]);
            } else {
                let value = log_compress(guard.accum[idx] / guard.samples[idx] as f32);
                let rgb = heat_color(value, min, max);
                rgba.copy_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
            }
        }

        let color_image =
            ColorImage::from_rgba_unmultiplied([guard.width, guard.height], &self.upload_rgba);
        drop(guard);

        // Update or recreate the GPU texture.
        self.ensure_texture(ctx, color_image.size);
        if let Some(texture) = self.texture.as_mut() {
            texture.set(color_image, TextureOptions::LINEAR);
        }
        true
    }

    /// Lazily create or resize the GPU texture used for display.
    fn ensure_texture(&mut self, ctx: &Context, size: [usize; 2]) {
        let needs_new = match &self.texture {
            Some(tex) => tex.size() != size,
            None => true,
        };
        if needs_new {
            let placeholder = ColorImage::new(size, Color32::BLACK);
            self.texture =
                Some(ctx.load_texture("charge_probe_texture", placeholder, TextureOptions::NEAREST));
        }
    }

    /// Spawn position for newly added charges, staggered so they don't stack.
    fn spawn_position(&self) -> Vec2 {
        let n = self.scene.len() as f32;
        let offset = Vec2::new((n % 4.0) * 0.2 - 0.3, ((n / 4.0) % 4.0) * 0.2 - 0.3);
        self.params.bounds.center() + offset
    }

    /// Left control panel; returns true if the configuration changed.
    fn controls_ui(&mut self, ui: &mut egui::Ui) -> bool {
        ui.heading("Charge Probe");
        ui.label("Drag charges on the canvas; right-click to edit or delete.");
        ui.separator();

        let mut changed = false;

        let mut half = self.params.bounds.width() * 0.5;
        if ui
            .add(Slider::new(&mut half, 1.0..=5.0).text("View half-extent"))
            .changed()
        {
            self.params.bounds = Rect::centered(half);
            changed = true;
        }
        changed |= ui
            .add(
                Slider::new(&mut self.params.grid, 64..=512)
                    .logarithmic(true)
                    .text("Resolution"),
            )
            .changed();
        changed |= ui
            .add(
                Slider::new(&mut self.params.samples_per_pass, 1..=16)
                    .logarithmic(true)
                    .text("Samples/pass"),
            )
            .changed();
        changed |= ui
            .add(Slider::new(&mut self.params.lines_per_charge, 0..=32).text("Lines/charge"))
            .changed();
        changed |= ui
            .add(
                Slider::new(&mut self.params.max_steps, 500..=20_000)
                    .logarithmic(true)
                    .text("Max trace steps"),
            )
            .changed();

        ui.separator();
        ChargeKind::selector(ui, &mut self.add_kind);
        ui.horizontal(|ui| {
            if ui.button("Add +").clicked() {
                let p = self.spawn_position();
                self.scene.push(match self.add_kind {
                    ChargeKind::Point => SceneCharge::point(p, 1.0),
                    ChargeKind::Line => SceneCharge::line(p, 0.0, 1.0),
                });
                changed = true;
            }
            if ui.button("Add \u{2212}").clicked() {
                let p = self.spawn_position();
                self.scene.push(match self.add_kind {
                    ChargeKind::Point => SceneCharge::point(p, -1.0),
                    ChargeKind::Line => SceneCharge::line(p, 0.0, -1.0),
                });
                changed = true;
            }
        });
        ui.horizontal(|ui| {
            if ui.button("Clear charges").clicked() {
                self.scene.clear();
                changed = true;
            }
            if ui.button("Reset accumulation").clicked() {
                changed = true;
            }
        });

        ui.separator();
        egui::CollapsingHeader::new("Net field equations")
            .default_open(true)
            .show(ui, |ui| {
                for text in [
                    &self.equations.magnitude,
                    &self.equations.x,
                    &self.equations.y,
                ] {
                    ui.add(
                        egui::Label::new(egui::RichText::new(text.as_str()).monospace().small())
                            .wrap(true),
                    );
                    ui.add_space(4.0);
                }
            });

        // Display some stats at the bottom.
        ui.separator();
        ui.label(format!("Charges: {}", self.scene.len()));
        ui.label(format!("Samples: {}", self.latest_total_samples));
        ui.label(format!(
            "Lines: {} ({} arrived, {} escaped)",
            self.trace_stats.lines, self.trace_stats.arrivals, self.trace_stats.escapes
        ));

        changed
    }

    /// Central canvas: heat map, field lines, charge glyphs, and interaction.
    /// Returns true if the scene changed.
    fn canvas_ui(&mut self, ui: &mut egui::Ui) -> bool {
        let avail = ui.available_size();
        let (response, painter) = ui.allocate_painter(avail, Sense::hover());
        let tf = CanvasTransform::fit(self.params.bounds, response.rect);

        // Heat map.
        if let Some(texture) = &self.texture {
            painter.image(
                texture.id(),
                tf.image_rect(),
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }

        // Field lines, colored by traversal direction.
        for line in &self.polylines {
            if line.points.len() < 2 {
                continue;
            }
            let color = match line.orientation {
                Orientation::WithField => Color32::from_rgb(255, 236, 179),
                Orientation::AgainstField => Color32::from_rgb(179, 212, 255),
            };
            let points: Vec<egui::Pos2> = line.points.iter().map(|p| tf.to_screen(*p)).collect();
            painter.add(egui::Shape::line(points, Stroke::new(1.0, color)));
        }

        // Infinite guide line for line charges.
        for charge in &self.scene {
            if let SceneCharge::Line(line) = charge {
                let reach = self.params.bounds.width() + self.params.bounds.height();
                let a = tf.to_screen(line.point + line.direction() * reach);
                let b = tf.to_screen(line.point - line.direction() * reach);
                painter.line_segment([a, b], Stroke::new(1.5, Color32::from_gray(160)));
            }
        }

        // Charge glyphs and their interaction (drag + context menu).
        let mut edited = false;
        let mut delete: Option<usize> = None;
        for i in 0..self.scene.len() {
            let center = tf.to_screen(self.scene[i].anchor());
            let fill = match self.scene[i].polarity() {
                Polarity::Positive => Color32::from_rgb(204, 34, 0),
                Polarity::Negative => Color32::from_rgb(34, 68, 204),
                Polarity::Neutral => Color32::from_gray(96),
            };
            painter.circle_filled(center, 11.0, fill);
            painter.circle_stroke(center, 11.0, Stroke::new(1.5, Color32::WHITE));
            painter.text(
                center,
                Align2::CENTER_CENTER,
                self.scene[i].glyph(),
                FontId::proportional(16.0),
                Color32::WHITE,
            );

            let hit = egui::Rect::from_center_size(center, egui::vec2(28.0, 28.0));
            let id = ui.id().with(("charge", i));
            let charge_response = ui.interact(hit, id, Sense::click_and_drag());
            if charge_response.dragged() {
                if let Some(pos) = charge_response.interact_pointer_pos() {
                    self.scene[i].set_anchor(tf.to_world(pos));
                    edited = true;
                }
            }

            let charge = &mut self.scene[i];
            let mut outcome = MenuOutcome::default();
            charge_response.context_menu(|ui| {
                outcome = charge.context_menu(ui);
            });
            if outcome.delete {
                delete = Some(i);
            }
            edited |= outcome.edited;
        }

        // Deletion is deferred to after the UI pass over the scene.
        if let Some(index) = delete {
            self.scene.remove(index);
            info!(index, "charge deleted via context menu");
            edited = true;
        }

        edited
    }
}

impl App for ChargeApp {
    fn update(&mut self, ctx: &Context, _frame: &mut Frame) {
        // Consume progress notifications before building the UI.
        while let Ok(event) = self.progress_rx.try_recv() {
            if matches!(event, ProgressEvent::FrameReady) {
                self.dirty = true;
            }
        }
        // If new samples are available, refresh the texture.
        if self.dirty {
            if self.refresh_texture(ctx) {
                self.dirty = false;
                ctx.request_repaint();
            } else {
                // Failed to grab the buffer lock; try again soon.
                ctx.request_repaint();
            }
        }

        let mut changed = false;

        egui::SidePanel::left("controls")
            .resizable(false)
            .default_width(280.0)
            .show(ctx, |ui| {
                changed |= self.controls_ui(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            changed |= self.canvas_ui(ui);
        });

        if changed {
            self.push_config();
        }

        // The worker keeps accumulating while the UI is idle; poll for its
        // progress even without input events.
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

impl Drop for ChargeApp {
    /// Ensure the worker thread is cleanly terminated on app shutdown.
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(WorkerCommand::Exit);
    }
}

/// Traditional blue→red heat-map used to visualise field magnitudes.
fn heat_color(value: f32, min: f32, max: f32) -> [u8; 3] {
    let t = ((value - min) / (max - min)).clamp(0.0, 1.0);
    let segments = [
        (0.0, [59, 76, 192]),
        (0.25, [120, 189, 226]),
        (0.5, [197, 224, 180]),
        (0.75, [246, 170, 0]),
        (1.0, [204, 0, 0]),
    ];
    for window in segments.windows(2) {
        let (t0, c0) = window[0];
        let (t1, c1) = window[1];
        if t >= t0 && t <= t1 {
            let alpha = (t - t0) / (t1 - t0);
            let blend = |a: u8, b: u8| (a as f32 + alpha * (b as f32 - a as f32)) as u8;
            return [
                blend(c0[0], c1[0]),
                blend(c0[1], c1[1]),
                blend(c0[2], c1[2]),
            ];
        }
    }
    segments.last().unwrap().1
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(egui::Vec2::new(1120.0, 760.0))
            .with_min_inner_size(egui::Vec2::new(720.0, 520.0)),
        ..Default::default()
    };
    eframe::run_native(
        "Charge Probe",
        options,
        Box::new(|cc| Box::new(ChargeApp::new(cc))),
    )
}
