use crate::app::egui_canvas::EguiCanvas;
use crate::config::Settings;
use crate::coordinator::{Session, TickReport};
use crate::error::AppError;
use crate::inference::GatePhase;
use egui::{Color32, Rect, TextureHandle, TextureOptions, pos2, vec2};
use std::collections::VecDeque;
use std::time::Instant;
use tracing::info;

const MAX_ERRORS: usize = 50;

pub struct TrackerApp {
    session: Session,
    started: Instant,
    show_video: bool,
    show_status: bool,
    video_texture: Option<TextureHandle>,
    shown_frame: Option<u64>,
    errors: VecDeque<String>,
}

impl TrackerApp {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            started: Instant::now(),
            show_video: true,
            show_status: true,
            video_texture: None,
            shown_frame: None,
            errors: VecDeque::new(),
        }
    }

    pub fn start_gui(settings: &Settings, session: Session) -> Result<(), AppError> {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size(vec2(settings.display.window_width, settings.display.window_height))
                .with_title("Handtone"),
            ..Default::default()
        };

        info!("Starting tracker window");
        eframe::run_native(
            "Handtone",
            options,
            Box::new(move |_cc| Ok(Box::new(TrackerApp::new(session)))),
        )
        .map_err(|e| AppError::Ui(e.to_string()))
    }

    fn now_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    fn record(&mut self, report: &TickReport) {
        if let Some(e) = &report.failure {
            self.errors.push_back(format!("classification failed: {e}"));
        }
        if report.detector_failures > 0 {
            self.errors
                .push_back(format!("{} detector(s) failed", report.detector_failures));
        }
        while self.errors.len() > MAX_ERRORS {
            self.errors.pop_front();
        }
    }

    fn refresh_video(&mut self, ctx: &egui::Context) {
        let Some(frame) = self.session.last_frame() else {
            return;
        };
        if self.shown_frame == Some(frame.sequence()) && self.video_texture.is_some() {
            return;
        }
        let image = frame.image().to_rgba8();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(
            [image.width() as usize, image.height() as usize],
            image.as_raw().as_slice(),
        );
        self.shown_frame = Some(frame.sequence());
        match &mut self.video_texture {
            Some(texture) => texture.set(color_image, TextureOptions::default()),
            None => {
                self.video_texture =
                    Some(ctx.load_texture("video_frame", color_image, TextureOptions::default()));
            }
        }
    }

    fn draw_status(&self, ui: &mut egui::Ui, now_ms: f64) {
        let state = self.session.state();
        let gate = self.session.gate();
        let phase = match gate.phase(now_ms) {
            GatePhase::Idle => "idle",
            GatePhase::Requesting => "requesting",
            GatePhase::CoolingDown => "cooling down",
        };
        ui.horizontal(|ui| {
            ui.label(format!("Label: {}", state.cache.display_label()));
            ui.separator();
            ui.label(format!("Confidence: {:.2}", state.cache.confidence()));
            ui.separator();
            ui.label(format!("Gate: {phase}"));
            ui.separator();
            ui.label(format!(
                "Next request in: {:.0} ms",
                (gate.next_allowed_ms() - now_ms).max(0.0)
            ));
            ui.separator();
            ui.label(format!("Particles: {}", state.particles.len()));
            if let Some(latest) = state.cache.latest() {
                ui.separator();
                ui.label(format!("Updated: {}", latest.produced_at().format("%H:%M:%S")));
            }
        });
    }
}

impl eframe::App for TrackerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now_ms = self.now_ms();

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Handtone");
                ui.checkbox(&mut self.show_video, "Show Video");
                ui.checkbox(&mut self.show_status, "Show Status");
            });
            if self.show_status {
                self.draw_status(ui, now_ms);
            }
        });

        egui::TopBottomPanel::bottom("error_panel")
            .resizable(true)
            .show(ctx, |ui| {
                ui.heading("Error Log");
                egui::ScrollArea::vertical().show(ui, |ui| {
                    for error in self.errors.iter().rev() {
                        ui.label(format!("[ERROR] {}", error));
                    }
                });
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE.fill(Color32::BLACK))
            .show(ctx, |ui| {
                let area = ui.max_rect();
                self.session.resize(area.width(), area.height());

                let viewport = *self.session.viewport();
                let min = area.min + vec2(viewport.box_min().x, viewport.box_min().y);
                let max = area.min + vec2(viewport.box_max().x, viewport.box_max().y);
                let video_rect = Rect::from_min_max(min, max);

                if self.show_video {
                    self.refresh_video(ctx);
                    if let Some(texture) = &self.video_texture {
                        // Mirrored, like the landmarks drawn over it.
                        let uv = Rect::from_min_max(pos2(1.0, 0.0), pos2(0.0, 1.0));
                        ui.painter()
                            .image(texture.id(), video_rect, uv, Color32::WHITE);
                    }
                }
                ui.painter().rect_stroke(
                    video_rect,
                    0.0,
                    egui::Stroke::new(1.0, Color32::WHITE),
                    egui::StrokeKind::Middle,
                );

                let painter = ui.painter().clone();
                let mut canvas = EguiCanvas::new(&painter, area.min);
                let report = self.session.tick(now_ms, &mut canvas);
                self.record(&report);
            });
        ctx.request_repaint();
    }
}
