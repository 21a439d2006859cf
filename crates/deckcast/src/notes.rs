use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use eframe::egui;

use crate::sync::{Command, NotesEndpoint};

/// The detachable speaker-notes window, rendered as a deferred viewport.
/// It re-renders from the latest pushed snapshot and sends commands back;
/// it holds no presentation state of its own.
pub struct NotesWindow {
    open: Arc<AtomicBool>,
    endpoint: Arc<Mutex<NotesEndpoint>>,
}

impl NotesWindow {
    pub fn new(endpoint: NotesEndpoint) -> Self {
        Self {
            open: Arc::new(AtomicBool::new(false)),
            endpoint: Arc::new(Mutex::new(endpoint)),
        }
    }

    fn viewport_id() -> egui::ViewportId {
        egui::ViewportId::from_hash_of("deckcast-notes")
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }

    /// Open on first use; focus the existing window on repeat use. A window
    /// the user already closed counts as not open and is reopened.
    pub fn open_or_focus(&self, ctx: &egui::Context) {
        if self.open.swap(true, Ordering::Relaxed) {
            ctx.send_viewport_cmd_to(Self::viewport_id(), egui::ViewportCommand::Focus);
        }
    }

    /// Open without focusing, for the `--notes` startup flag.
    pub fn open_at_startup(&self) {
        self.open.store(true, Ordering::Relaxed);
    }

    pub fn show(&self, ctx: &egui::Context) {
        if !self.is_open() {
            return;
        }
        let open = self.open.clone();
        let endpoint = self.endpoint.clone();
        ctx.show_viewport_deferred(
            Self::viewport_id(),
            egui::ViewportBuilder::default()
                .with_title("Deckcast \u{2014} Presenter Notes")
                .with_inner_size([920.0, 640.0]),
            move |ctx, _class| {
                egui::CentralPanel::default().show(ctx, |ui| {
                    if let Ok(mut endpoint) = endpoint.lock() {
                        draw_notes(ui, &mut endpoint);
                    }
                });
                // Keep the timer readout moving between pushes.
                ctx.request_repaint_after(std::time::Duration::from_millis(250));
                if ctx.input(|i| i.viewport().close_requested()) {
                    open.store(false, Ordering::Relaxed);
                }
            },
        );
    }
}

fn draw_notes(ui: &mut egui::Ui, endpoint: &mut NotesEndpoint) {
    let Some(snapshot) = endpoint.latest().cloned() else {
        ui.centered_and_justified(|ui| {
            ui.label("Waiting for the presentation window\u{2026}");
        });
        return;
    };

    ui.horizontal(|ui| {
        ui.heading(format!(
            "Slide {} / {}",
            snapshot.current + 1,
            snapshot.slides.len()
        ));
        ui.separator();
        ui.monospace(format_elapsed(snapshot.timer_started, Instant::now()));
        if ui.small_button("start").clicked() {
            endpoint.send(Command::StartTimer);
        }
        if ui.small_button("reset").clicked() {
            endpoint.send(Command::ResetTimer);
        }
    });

    ui.separator();

    ui.horizontal(|ui| {
        if ui.button("\u{2190} Prev").clicked() {
            endpoint.send(Command::Prev);
        }
        if ui.button("Next \u{2192}").clicked() {
            endpoint.send(Command::Next);
        }
        ui.label(format!("phase: {:?}", snapshot.phase));
    });

    ui.add_space(8.0);
    egui::ScrollArea::vertical()
        .max_height(ui.available_height() - 160.0)
        .show(ui, |ui| {
            ui.label(egui::RichText::new(&snapshot.notes).size(20.0));
        });

    ui.add_space(8.0);
    ui.group(|ui| {
        ui.label(format!("Up next: {}", snapshot.next_title));
        if let Some(image) = &snapshot.next_image {
            ui.weak(image.display().to_string());
        }
    });

    ui.add_space(4.0);
    egui::ScrollArea::horizontal().show(ui, |ui| {
        ui.horizontal(|ui| {
            for (i, preview) in snapshot.slides.iter().enumerate() {
                let marker = if preview.has_more_steps { "\u{2026}" } else { "" };
                let label = format!("{}{}", preview.id, marker);
                let button = egui::Button::new(label).selected(i == snapshot.current);
                let mut response = ui.add(button);
                if let Some(image) = &preview.image {
                    response = response.on_hover_text(image.display().to_string());
                }
                if response.clicked() {
                    endpoint.send(Command::Goto(i));
                }
            }
        });
    });
}

/// mm:ss since the talk timer started, or a dash while it is not running.
fn format_elapsed(started: Option<Instant>, now: Instant) -> String {
    match started {
        Some(started) => {
            let total = now.saturating_duration_since(started).as_secs();
            format!("{:02}:{:02}", total / 60, total % 60)
        }
        None => "--:--".to_string(),
    }
}
