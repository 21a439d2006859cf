use eframe::egui;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::deck::{Deck, SlideKind};
use crate::notes::NotesWindow;
use crate::playback::{Playback, PlaybackState};
use crate::record::system::SystemBackend;
use crate::record::{RecordingManager, RecordingStatus};
use crate::render;
use crate::render::brightness::TextTone;
use crate::render::image_cache::ImageCache;
use crate::session::{RevealPhase, Session};
use crate::sync::{self, CommandInbox, SyncPublisher, apply_command};

struct Toast {
    message: String,
    start: Instant,
}

impl Toast {
    fn new(message: String) -> Self {
        Self {
            message,
            start: Instant::now(),
        }
    }

    fn opacity(&self) -> f32 {
        let elapsed = self.start.elapsed().as_secs_f32();
        let duration = 2.5;
        let fade_start = 2.0;
        if elapsed < fade_start {
            1.0
        } else if elapsed < duration {
            1.0 - (elapsed - fade_start) / (duration - fade_start)
        } else {
            0.0
        }
    }

    fn is_expired(&self) -> bool {
        self.start.elapsed().as_secs_f32() >= 2.5
    }
}

/// Actions gathered inside the input closure and executed after it; sending
/// viewport commands from inside `ctx.input` deadlocks egui's RwLock.
#[derive(Default)]
struct InputActions {
    advance: bool,
    retreat: bool,
    toggle_video: bool,
    open_notes: bool,
    toggle_recording: bool,
    toggle_pause: bool,
    toggle_webcam: bool,
    toggle_controls: bool,
}

struct PresenterApp {
    session: Session,
    publisher: SyncPublisher,
    inbox: CommandInbox,
    notes: NotesWindow,
    recorder: RecordingManager,
    cache: ImageCache,
    playback: Playback,
    autoplay: bool,
    show_controls: bool,
    toast: Option<Toast>,
    last_slide: Option<usize>,
}

impl PresenterApp {
    #[allow(clippy::too_many_arguments)]
    fn new(
        session: Session,
        publisher: SyncPublisher,
        inbox: CommandInbox,
        notes: NotesWindow,
        recorder: RecordingManager,
        cache: ImageCache,
        autoplay: bool,
    ) -> Self {
        Self {
            session,
            publisher,
            inbox,
            notes,
            recorder,
            cache,
            playback: Playback::new(None),
            autoplay,
            show_controls: true,
            toast: None,
            last_slide: None,
        }
    }

    /// A click or Right-arrow. On a video slide whose autoplay was deferred
    /// the interaction starts the clip instead of skipping past it.
    fn user_advance(&mut self, now: Instant) {
        if self.session.current_slide().kind() == SlideKind::Video
            && self.playback.on_interaction(now)
        {
            return;
        }
        self.session.advance(now);
    }

    /// Reset the playback clock whenever a new slide is entered.
    fn sync_playback(&mut self, now: Instant) {
        if self.last_slide == Some(self.session.current()) {
            return;
        }
        self.last_slide = Some(self.session.current());
        self.playback.stop();
        let slide = self.session.current_slide();
        if slide.kind() == SlideKind::Video {
            let duration = slide.video_duration_secs.map(Duration::from_secs_f32);
            self.playback = Playback::new(duration);
            self.playback.start(now, self.autoplay);
            if self.playback.state() == PlaybackState::Deferred {
                tracing::info!("autoplay deferred, waiting for interaction");
            }
        }
    }

    fn apply_actions(&mut self, actions: InputActions, now: Instant, ctx: &egui::Context) {
        if actions.advance {
            self.user_advance(now);
        }
        if actions.retreat {
            self.session.retreat(now);
        }
        if actions.toggle_video && self.session.current_slide().kind() == SlideKind::Video {
            self.playback.toggle(now);
        }
        if actions.open_notes {
            self.notes.open_or_focus(ctx);
        }
        if actions.toggle_recording {
            let was_idle = self.recorder.status() == RecordingStatus::Idle;
            let artifact = self.recorder.toggle(now);
            let message = if was_idle {
                match self.recorder.status() {
                    RecordingStatus::Idle => "Recording unavailable".to_string(),
                    _ => "Recording".to_string(),
                }
            } else {
                match artifact {
                    Some(path) => format!("Saved {}", path.display()),
                    None => "Recording stopped, nothing captured".to_string(),
                }
            };
            self.toast = Some(Toast::new(message));
        }
        if actions.toggle_pause {
            self.recorder.toggle_pause();
        }
        if actions.toggle_webcam {
            match self.recorder.toggle_webcam() {
                Ok(true) => self.toast = Some(Toast::new("Webcam on".to_string())),
                Ok(false) => self.toast = Some(Toast::new("Webcam off".to_string())),
                Err(_) => self.toast = Some(Toast::new("Webcam unavailable".to_string())),
            }
        }
        if actions.toggle_controls {
            self.show_controls = !self.show_controls;
        }
    }

    fn chrome_tone(&self) -> TextTone {
        if self.session.phase() < RevealPhase::Revealed {
            return TextTone::Dark;
        }
        match &self.session.current_slide().image {
            Some(path) => self.cache.tone(path),
            None => TextTone::Light,
        }
    }

    fn draw_controls(&mut self, ctx: &egui::Context, now: Instant) {
        egui::Area::new(egui::Id::new("recording-controls"))
            .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-24.0, -24.0))
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.horizontal(|ui| {
                        let status = self.recorder.status();
                        let record_label = match status {
                            RecordingStatus::Idle => "\u{23FA} record",
                            _ => "\u{23F9} stop",
                        };
                        if ui.button(record_label).clicked() {
                            if let Some(path) = self.recorder.toggle(now) {
                                self.toast =
                                    Some(Toast::new(format!("Saved {}", path.display())));
                            }
                        }
                        if status != RecordingStatus::Idle {
                            let pause_label = if status == RecordingStatus::Paused {
                                "\u{23F5} resume"
                            } else {
                                "\u{23F8} pause"
                            };
                            if ui.button(pause_label).clicked() {
                                self.recorder.toggle_pause();
                            }
                            if let Some(started) = self.recorder.started_at() {
                                let secs = now.saturating_duration_since(started).as_secs();
                                ui.monospace(format!("{:02}:{:02}", secs / 60, secs % 60));
                            }
                        }
                        let webcam_label = if self.recorder.webcam_active() {
                            "webcam off"
                        } else {
                            "webcam on"
                        };
                        if ui.button(webcam_label).clicked() {
                            if self.recorder.toggle_webcam().is_err() {
                                self.toast = Some(Toast::new("Webcam unavailable".to_string()));
                            }
                        }
                        if ui.button("notes").clicked() {
                            self.notes.open_or_focus(ctx);
                        }
                    });
                });
            });
    }

    fn draw_webcam_overlay(&self, ui: &egui::Ui, rect: egui::Rect) {
        if !self.recorder.webcam_active() {
            return;
        }
        let scale = render::compute_scale(rect);
        let size = egui::vec2(280.0 * scale, 180.0 * scale);
        let overlay = egui::Rect::from_min_size(
            egui::pos2(
                rect.left() + 24.0 * scale,
                rect.bottom() - size.y - 24.0 * scale,
            ),
            size,
        );
        ui.painter().rect_filled(
            overlay,
            10.0 * scale,
            egui::Color32::from_rgba_unmultiplied(10, 10, 14, 230),
        );
        ui.painter().rect_stroke(
            overlay,
            10.0 * scale,
            egui::Stroke::new(2.0 * scale, render::panels::PANEL_ACCENT),
            egui::StrokeKind::Outside,
        );
        let galley = ui.painter().layout_no_wrap(
            "\u{25CF} camera".to_string(),
            egui::FontId::proportional(18.0 * scale),
            egui::Color32::from_gray(200),
        );
        let pos = egui::pos2(
            overlay.center().x - galley.rect.width() / 2.0,
            overlay.center().y - galley.rect.height() / 2.0,
        );
        ui.painter()
            .galley(pos, galley, egui::Color32::from_gray(200));
    }

    fn draw_toast(&self, ui: &egui::Ui, rect: egui::Rect) {
        let Some(toast) = &self.toast else {
            return;
        };
        let opacity = toast.opacity();
        if opacity <= 0.0 {
            return;
        }
        let scale = render::compute_scale(rect);
        let color = egui::Color32::from_rgba_unmultiplied(240, 240, 240, (opacity * 230.0) as u8);
        let bg = egui::Color32::from_rgba_unmultiplied(25, 25, 32, (opacity * 230.0) as u8);
        let galley = ui.painter().layout_no_wrap(
            toast.message.clone(),
            egui::FontId::proportional(18.0 * scale),
            color,
        );
        let padding = 12.0 * scale;
        let toast_rect = egui::Rect::from_min_size(
            egui::pos2(
                rect.center().x - galley.rect.width() / 2.0 - padding,
                rect.bottom() - 90.0 * scale,
            ),
            galley.rect.size() + egui::vec2(padding * 2.0, padding * 2.0),
        );
        ui.painter().rect_filled(toast_rect, 8.0 * scale, bg);
        ui.painter().galley(
            toast_rect.min + egui::vec2(padding, padding),
            galley,
            color,
        );
    }
}

impl eframe::App for PresenterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();

        // Commands from the presenter window feed the same state machine as
        // local input.
        for command in self.inbox.drain() {
            apply_command(&mut self.session, command, now);
        }

        let mut actions = InputActions::default();
        let mut viewport_cmds: Vec<egui::ViewportCommand> = Vec::new();

        ctx.input(|i| {
            if i.key_pressed(egui::Key::ArrowRight) {
                actions.advance = true;
            }
            if i.key_pressed(egui::Key::ArrowLeft) {
                actions.retreat = true;
            }
            if i.key_pressed(egui::Key::Space) {
                actions.toggle_video = true;
            }
            if i.key_pressed(egui::Key::F) && !i.modifiers.shift {
                viewport_cmds.push(egui::ViewportCommand::Fullscreen(
                    !i.viewport().fullscreen.unwrap_or(false),
                ));
            }
            if i.key_pressed(egui::Key::N) && !i.modifiers.shift {
                actions.open_notes = true;
            }
            if i.modifiers.shift {
                if i.key_pressed(egui::Key::R) {
                    actions.toggle_recording = true;
                }
                if i.key_pressed(egui::Key::P) {
                    actions.toggle_pause = true;
                }
                if i.key_pressed(egui::Key::W) {
                    actions.toggle_webcam = true;
                }
                if i.key_pressed(egui::Key::H) {
                    actions.toggle_controls = true;
                }
            }
        });

        for cmd in viewport_cmds {
            ctx.send_viewport_cmd(cmd);
        }
        self.apply_actions(actions, now, ctx);

        // Timed transitions: phase promotion, clip end, platform stop.
        self.session.tick(now);
        self.sync_playback(now);
        if self.playback.poll_ended(now) {
            self.session.video_ended(now);
        }
        if let Some(path) = self.recorder.poll_external_stop() {
            self.toast = Some(Toast::new(format!("Saved {}", path.display())));
        }

        self.publisher.maybe_publish(&self.session, now);

        if self.toast.as_ref().is_some_and(|t| t.is_expired()) {
            self.toast = None;
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(render::STAGE_BACKGROUND).inner_margin(0.0))
            .show(ctx, |ui| {
                let rect = ui.max_rect();

                // Click anywhere on the stage advances; controls sit in a
                // foreground area and keep their clicks to themselves.
                let response = ui.interact(rect, egui::Id::new("stage"), egui::Sense::click());
                if response.clicked() {
                    self.user_advance(now);
                }

                let slide = self.session.current_slide();
                let video_hud = (slide.kind() == SlideKind::Video).then(|| render::VideoHud {
                    position: self.playback.position(now),
                    duration: self.playback.duration(),
                    paused: self.playback.state() == PlaybackState::Paused,
                });
                render::render_slide(
                    ui,
                    ctx,
                    slide,
                    self.session.phase(),
                    self.session.revealing_progress(now),
                    video_hud.as_ref(),
                    &self.cache,
                    rect,
                );

                render::render_chrome(
                    ui,
                    &self.session.deck().meta,
                    self.chrome_tone(),
                    self.session.current_slide().kind() == SlideKind::Video,
                    rect,
                );

                self.draw_webcam_overlay(ui, rect);
                self.draw_toast(ui, rect);
            });

        if self.show_controls {
            self.draw_controls(ctx, now);
        }

        self.notes.show(ctx);

        // Keep frames flowing for the promotion timer, sync cadence, clip
        // clock, and recording readout.
        if let Some(due) = self.session.next_due() {
            ctx.request_repaint_after(due.saturating_duration_since(now));
        }
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

pub fn run(
    file: PathBuf,
    windowed: bool,
    start_slide: Option<usize>,
    open_notes: bool,
) -> anyhow::Result<()> {
    let deck = Deck::load(&file)?;
    let config = Config::load_or_default();

    let base_path = file
        .parent()
        .unwrap_or(std::path::Path::new("."))
        .to_path_buf();

    let title = deck
        .meta
        .title
        .clone()
        .map(|t| format!("deckcast \u{2014} {t}"))
        .unwrap_or_else(|| "deckcast".to_string());

    let mut session = Session::new(deck, config.reveal_delay());
    if let Some(slide) = start_slide {
        session.jump_to(slide.saturating_sub(1), Instant::now());
    }

    let (publisher, inbox, endpoint) = sync::channel(config.sync_interval());
    let notes = NotesWindow::new(endpoint);
    if open_notes {
        notes.open_at_startup();
    }

    let backend = SystemBackend::new(config.microphone());
    let recorder = RecordingManager::new(Box::new(backend), config.output_dir());
    let cache = ImageCache::new(base_path);
    let autoplay = config.autoplay();

    let viewport = if windowed {
        egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title(&title)
    } else {
        egui::ViewportBuilder::default()
            .with_fullscreen(true)
            .with_title(&title)
    };

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| {
            Ok(Box::new(PresenterApp::new(
                session, publisher, inbox, notes, recorder, cache, autoplay,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
