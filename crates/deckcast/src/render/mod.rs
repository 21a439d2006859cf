pub mod brightness;
pub mod image_cache;
pub mod panels;

use std::time::Duration;

use eframe::egui;

use crate::deck::{DeckMeta, Slide, SlideKind};
use crate::session::RevealPhase;

use brightness::TextTone;
use image_cache::ImageCache;

pub const STAGE_BACKGROUND: egui::Color32 = egui::Color32::from_rgb(0x0E, 0x0E, 0x12);
const TITLE_COLOR: egui::Color32 = egui::Color32::WHITE;
const SUBTITLE_COLOR: egui::Color32 = egui::Color32::from_rgb(0xC8, 0xC8, 0xC8);

/// Playback readout the renderer shows on a video slide.
pub struct VideoHud {
    pub position: Duration,
    pub duration: Option<Duration>,
    pub paused: bool,
}

pub fn compute_scale(rect: egui::Rect) -> f32 {
    let ref_w = 1920.0;
    let ref_h = 1080.0;
    (rect.width() / ref_w).min(rect.height() / ref_h)
}

fn with_opacity(color: egui::Color32, opacity: f32) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), (opacity * 255.0) as u8)
}

/// Composite one slide from the machine's observable state. The reveal
/// phase decides which layers exist; everything else is slide data.
#[allow(clippy::too_many_arguments)]
pub fn render_slide(
    ui: &egui::Ui,
    ctx: &egui::Context,
    slide: &Slide,
    phase: RevealPhase,
    revealing_progress: f32,
    video: Option<&VideoHud>,
    cache: &ImageCache,
    rect: egui::Rect,
) {
    let scale = compute_scale(rect);
    ui.painter().rect_filled(rect, 0.0, STAGE_BACKGROUND);

    if slide.kind() == SlideKind::Video {
        render_video_stage(ui, slide, video, rect, scale);
        return;
    }

    // Image layer: scales in during Revealing, darkens under the second
    // layer, zooms slightly under the third.
    if phase >= RevealPhase::Revealing {
        if let Some(path) = &slide.image {
            if let Some(texture) = cache.texture(ctx, path) {
                let (image_scale, opacity) = match phase {
                    RevealPhase::Initial => (0.92, 0.0),
                    RevealPhase::Revealing => {
                        let eased = ease_out(revealing_progress);
                        (0.92 + 0.08 * eased, eased)
                    }
                    RevealPhase::Revealed | RevealPhase::Secondary => (1.0, 1.0),
                    RevealPhase::Tertiary => (1.04, 1.0),
                };
                let image_rect = fit_rect(texture.size_vec2(), rect, image_scale);
                ui.painter().image(
                    texture.id(),
                    image_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    with_opacity(egui::Color32::WHITE, opacity),
                );
                if phase >= RevealPhase::Secondary {
                    ui.painter().rect_filled(
                        rect,
                        0.0,
                        egui::Color32::from_rgba_unmultiplied(0, 0, 0, 110),
                    );
                }
            }
        }
    }

    // Text layer. Image slides hand the stage over to their panels past
    // Revealed; imageless slides keep their text up.
    let text_visible = match phase {
        RevealPhase::Initial | RevealPhase::Revealing => false,
        RevealPhase::Revealed => true,
        RevealPhase::Secondary | RevealPhase::Tertiary => !slide.has_image(),
    };
    if text_visible {
        render_text(ui, slide, rect, scale);
    }

    if phase >= RevealPhase::Secondary {
        panels::render_secondary(ui, ctx, slide, phase, rect, 1.0, cache, scale);
    }
    if phase >= RevealPhase::Tertiary {
        panels::render_tertiary(ui, ctx, slide, rect, 1.0, cache, scale);
    }
}

fn render_text(ui: &egui::Ui, slide: &Slide, rect: egui::Rect, scale: f32) {
    let center_x = rect.center().x;
    let mut y = rect.top() + rect.height() * 0.68;

    if let Some(title) = &slide.title {
        let galley = ui.painter().layout(
            title.clone(),
            egui::FontId::proportional(64.0 * scale),
            TITLE_COLOR,
            rect.width() * 0.8,
        );
        let pos = egui::pos2(center_x - galley.rect.width() / 2.0, y);
        y += galley.rect.height() + 14.0 * scale;
        ui.painter().galley(pos, galley, TITLE_COLOR);
    }
    if let Some(subtitle) = &slide.subtitle {
        if !subtitle.is_empty() {
            let galley = ui.painter().layout(
                subtitle.clone(),
                egui::FontId::proportional(28.0 * scale),
                SUBTITLE_COLOR,
                rect.width() * 0.7,
            );
            let pos = egui::pos2(center_x - galley.rect.width() / 2.0, y);
            ui.painter().galley(pos, galley, SUBTITLE_COLOR);
        }
    }
}

fn render_video_stage(
    ui: &egui::Ui,
    slide: &Slide,
    video: Option<&VideoHud>,
    rect: egui::Rect,
    scale: f32,
) {
    ui.painter().rect_filled(rect, 0.0, egui::Color32::BLACK);

    let label = slide
        .video
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let galley = ui.painter().layout_no_wrap(
        label,
        egui::FontId::monospace(22.0 * scale),
        SUBTITLE_COLOR,
    );
    let pos = egui::pos2(
        rect.center().x - galley.rect.width() / 2.0,
        rect.center().y - 60.0 * scale,
    );
    ui.painter().galley(pos, galley, SUBTITLE_COLOR);

    let Some(hud) = video else {
        return;
    };

    if let Some(duration) = hud.duration {
        let track = egui::Rect::from_min_size(
            egui::pos2(rect.left() + rect.width() * 0.2, rect.center().y),
            egui::vec2(rect.width() * 0.6, 6.0 * scale),
        );
        ui.painter()
            .rect_filled(track, 3.0 * scale, egui::Color32::from_gray(60));
        let fraction = (hud.position.as_secs_f32() / duration.as_secs_f32()).clamp(0.0, 1.0);
        let fill = egui::Rect::from_min_size(
            track.min,
            egui::vec2(track.width() * fraction, track.height()),
        );
        ui.painter()
            .rect_filled(fill, 3.0 * scale, panels::PANEL_ACCENT);
    }

    if hud.paused {
        let galley = ui.painter().layout_no_wrap(
            "\u{23F8} paused".to_string(),
            egui::FontId::proportional(24.0 * scale),
            SUBTITLE_COLOR,
        );
        let pos = egui::pos2(
            rect.center().x - galley.rect.width() / 2.0,
            rect.center().y + 30.0 * scale,
        );
        ui.painter().galley(pos, galley, SUBTITLE_COLOR);
    }
}

/// Persistent header/footer. Tone follows the slide image brightness; both
/// rows disappear while a video slide plays.
pub fn render_chrome(
    ui: &egui::Ui,
    meta: &DeckMeta,
    tone: TextTone,
    hidden: bool,
    rect: egui::Rect,
) {
    if hidden {
        return;
    }
    let scale = compute_scale(rect);
    let color = match tone {
        TextTone::Dark => egui::Color32::from_rgb(0x10, 0x10, 0x10),
        TextTone::Light => egui::Color32::from_rgb(0xF5, 0xF5, 0xF5),
    };
    let font = egui::FontId::proportional(16.0 * scale);
    let margin = 28.0 * scale;

    let mut place = |text: &str, left: Option<f32>, center: bool, y: f32| {
        if text.is_empty() {
            return;
        }
        let galley = ui
            .painter()
            .layout_no_wrap(text.to_string(), font.clone(), color);
        let x = match (left, center) {
            (Some(x), _) => x,
            (None, true) => rect.center().x - galley.rect.width() / 2.0,
            (None, false) => rect.right() - margin - galley.rect.width(),
        };
        ui.painter().galley(egui::pos2(x, y), galley, color);
    };

    let top = rect.top() + margin;
    let bottom = rect.bottom() - margin - 16.0 * scale;

    place(
        meta.venue.as_deref().unwrap_or_default(),
        Some(rect.left() + margin),
        false,
        top,
    );
    place(meta.title.as_deref().unwrap_or_default(), None, true, top);
    place(meta.date.as_deref().unwrap_or_default(), None, false, top);
    place(
        meta.byline.as_deref().unwrap_or_default(),
        Some(rect.left() + margin),
        false,
        bottom,
    );
}

fn fit_rect(image_size: egui::Vec2, rect: egui::Rect, scale: f32) -> egui::Rect {
    let fit = (rect.width() / image_size.x)
        .min(rect.height() / image_size.y)
        .max(0.0);
    let size = image_size * fit * scale;
    egui::Rect::from_center_size(rect.center(), size)
}

fn ease_out(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ease_out_endpoints() {
        assert_eq!(ease_out(0.0), 0.0);
        assert_eq!(ease_out(1.0), 1.0);
        assert!(ease_out(0.5) > 0.5);
    }

    #[test]
    fn test_fit_rect_preserves_aspect() {
        let rect = egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(1920.0, 1080.0));
        let fitted = fit_rect(egui::vec2(960.0, 540.0), rect, 1.0);
        assert!((fitted.width() / fitted.height() - 16.0 / 9.0).abs() < 0.01);
        assert!((fitted.width() - 1920.0).abs() < 0.5);
    }
}
