use eframe::egui;

use crate::deck::Slide;
use crate::session::RevealPhase;

use super::image_cache::ImageCache;

pub const PANEL_TEXT: egui::Color32 = egui::Color32::from_rgb(0xF2, 0xF2, 0xF2);
pub const PANEL_DIM: egui::Color32 = egui::Color32::from_rgb(0xB0, 0xB0, 0xB0);
pub const PANEL_ACCENT: egui::Color32 = egui::Color32::from_rgb(0x5C, 0xB8, 0xFF);
pub const PANEL_CARD: egui::Color32 = egui::Color32::from_rgba_premultiplied(20, 20, 26, 220);

fn with_opacity(color: egui::Color32, opacity: f32) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(
        color.r(),
        color.g(),
        color.b(),
        (opacity * color.a() as f32) as u8,
    )
}

fn draw_line(
    ui: &egui::Ui,
    text: &str,
    pos: egui::Pos2,
    size: f32,
    color: egui::Color32,
    max_width: f32,
) -> f32 {
    let galley = ui.painter().layout(
        text.to_string(),
        egui::FontId::proportional(size),
        color,
        max_width,
    );
    let height = galley.rect.height();
    ui.painter().galley(pos, galley, color);
    height
}

fn draw_centered(ui: &egui::Ui, text: &str, center_x: f32, y: f32, size: f32, color: egui::Color32) {
    let galley = ui
        .painter()
        .layout_no_wrap(text.to_string(), egui::FontId::proportional(size), color);
    let pos = egui::pos2(center_x - galley.rect.width() / 2.0, y);
    ui.painter().galley(pos, galley, color);
}

/// Second-layer content. Exactly which block renders is decided by the
/// slide data; the state machine only knows the layer exists.
#[allow(clippy::too_many_arguments)]
pub fn render_secondary(
    ui: &egui::Ui,
    ctx: &egui::Context,
    slide: &Slide,
    phase: RevealPhase,
    rect: egui::Rect,
    opacity: f32,
    cache: &ImageCache,
    scale: f32,
) {
    if !slide.top_messages.is_empty() {
        render_top_messages(ui, slide, rect, opacity, scale);
    }
    if !slide.tools.is_empty() {
        render_tools(ui, ctx, slide, rect, opacity, cache, scale);
    }
    if let Some(chart) = &slide.chart {
        render_chart(ui, ctx, chart, rect, opacity, cache, scale);
    }
    // User cards step aside once the third layer is on screen.
    if !slide.users.is_empty() && phase < RevealPhase::Tertiary {
        render_users(ui, ctx, slide, rect, opacity, cache, scale);
    }
    if let Some(pricing) = &slide.pricing {
        render_pricing(ui, pricing, rect, opacity, scale);
    }
    if !slide.competitors.is_empty() {
        render_competitors(ui, ctx, slide, rect, opacity, cache, scale);
    }
    if let Some(timeline) = &slide.timeline {
        render_timeline(ui, timeline, rect, opacity, scale);
    }
    if !slide.founder.is_empty() {
        render_founder(ui, slide, rect, opacity, scale);
    }
}

/// Third-layer "why them" panel.
pub fn render_tertiary(
    ui: &egui::Ui,
    ctx: &egui::Context,
    slide: &Slide,
    rect: egui::Rect,
    opacity: f32,
    cache: &ImageCache,
    scale: f32,
) {
    let Some(why) = &slide.why_them else {
        return;
    };

    let panel_w = rect.width() * 0.46;
    let panel_h = rect.height() * 0.56;
    let panel = egui::Rect::from_center_size(rect.center(), egui::vec2(panel_w, panel_h));
    ui.painter()
        .rect_filled(panel, 10.0 * scale, with_opacity(PANEL_CARD, opacity));

    if let Some(path) = &why.image {
        if let Some(texture) = cache.texture(ctx, path) {
            let image_rect = egui::Rect::from_min_max(
                panel.min,
                egui::pos2(panel.right(), panel.top() + panel_h * 0.62),
            );
            ui.painter().image(
                texture.id(),
                image_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                with_opacity(egui::Color32::WHITE, opacity),
            );
        }
    }

    let text_top = panel.top() + panel_h * 0.66;
    draw_centered(
        ui,
        &why.title,
        panel.center().x,
        text_top,
        40.0 * scale,
        with_opacity(PANEL_TEXT, opacity),
    );
    draw_centered(
        ui,
        &why.subtitle,
        panel.center().x,
        text_top + 56.0 * scale,
        24.0 * scale,
        with_opacity(PANEL_DIM, opacity),
    );
}

fn render_top_messages(ui: &egui::Ui, slide: &Slide, rect: egui::Rect, opacity: f32, scale: f32) {
    let mut y = rect.top() + rect.height() * 0.18;
    for message in &slide.top_messages {
        draw_centered(
            ui,
            message,
            rect.center().x,
            y,
            30.0 * scale,
            with_opacity(PANEL_TEXT, opacity),
        );
        y += 46.0 * scale;
    }
}

fn render_tools(
    ui: &egui::Ui,
    ctx: &egui::Context,
    slide: &Slide,
    rect: egui::Rect,
    opacity: f32,
    cache: &ImageCache,
    scale: f32,
) {
    let cols = 8usize;
    let cell = 90.0 * scale;
    let gap = 14.0 * scale;
    let rows = slide.tools.len().div_ceil(cols);
    let grid_w = cols as f32 * cell + (cols as f32 - 1.0) * gap;
    let origin = egui::pos2(
        rect.center().x - grid_w / 2.0,
        rect.bottom() - rect.height() * 0.38 - rows as f32 * (cell + gap),
    );

    for (i, logo) in slide.tools.iter().enumerate() {
        let col = i % cols;
        let row = i / cols;
        let cell_rect = egui::Rect::from_min_size(
            origin + egui::vec2(col as f32 * (cell + gap), row as f32 * (cell + gap)),
            egui::vec2(cell, cell),
        );
        match cache.texture(ctx, logo) {
            Some(texture) => ui.painter().image(
                texture.id(),
                cell_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                with_opacity(egui::Color32::WHITE, opacity),
            ),
            None => ui.painter().rect_filled(
                cell_rect,
                6.0 * scale,
                with_opacity(PANEL_CARD, opacity * 0.7),
            ),
        };
    }
}

fn render_chart(
    ui: &egui::Ui,
    ctx: &egui::Context,
    chart: &crate::deck::Chart,
    rect: egui::Rect,
    opacity: f32,
    cache: &ImageCache,
    scale: f32,
) {
    // Segment labels on a ring around the center mark; the decorative 3D
    // core itself is out of scope.
    let center = rect.center();
    let radius = rect.height() * 0.3;

    if let Some(path) = &chart.center {
        if let Some(texture) = cache.texture(ctx, path) {
            let mark = 120.0 * scale;
            let mark_rect = egui::Rect::from_center_size(center, egui::vec2(mark, mark));
            ui.painter().image(
                texture.id(),
                mark_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                with_opacity(egui::Color32::WHITE, opacity),
            );
        }
    }

    let count = chart.segments.len().max(1);
    for (i, segment) in chart.segments.iter().enumerate() {
        let angle = std::f32::consts::TAU * i as f32 / count as f32 - std::f32::consts::FRAC_PI_2;
        let pos = center + egui::vec2(angle.cos() * radius, angle.sin() * radius);
        if let Some(icon) = &segment.icon {
            draw_centered(
                ui,
                icon,
                pos.x,
                pos.y - 26.0 * scale,
                14.0 * scale,
                with_opacity(PANEL_DIM, opacity * 0.8),
            );
        }
        draw_centered(
            ui,
            &segment.label,
            pos.x,
            pos.y,
            24.0 * scale,
            with_opacity(PANEL_TEXT, opacity),
        );
        if let Some(description) = &segment.description {
            let galley = ui.painter().layout(
                description.clone(),
                egui::FontId::proportional(16.0 * scale),
                with_opacity(PANEL_DIM, opacity),
                260.0 * scale,
            );
            let text_pos = egui::pos2(pos.x - galley.rect.width() / 2.0, pos.y + 30.0 * scale);
            ui.painter()
                .galley(text_pos, galley, with_opacity(PANEL_DIM, opacity));
        }
    }
}

fn render_users(
    ui: &egui::Ui,
    ctx: &egui::Context,
    slide: &Slide,
    rect: egui::Rect,
    opacity: f32,
    cache: &ImageCache,
    scale: f32,
) {
    let card_w = 300.0 * scale;
    let card_h = 360.0 * scale;
    let gap = 40.0 * scale;
    let total = slide.users.len() as f32 * card_w + (slide.users.len() as f32 - 1.0) * gap;
    let origin_x = rect.center().x - total / 2.0;
    let top = rect.center().y - card_h / 2.0;

    for (i, user) in slide.users.iter().enumerate() {
        let card = egui::Rect::from_min_size(
            egui::pos2(origin_x + i as f32 * (card_w + gap), top),
            egui::vec2(card_w, card_h),
        );
        ui.painter()
            .rect_filled(card, 8.0 * scale, with_opacity(PANEL_CARD, opacity));
        if let Some(texture) = cache.texture(ctx, &user.image) {
            let image_rect = card.shrink(8.0 * scale);
            ui.painter().image(
                texture.id(),
                image_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                with_opacity(egui::Color32::WHITE, opacity),
            );
        }
        draw_centered(
            ui,
            &user.title,
            card.center().x,
            card.bottom() - 40.0 * scale,
            22.0 * scale,
            with_opacity(PANEL_TEXT, opacity),
        );
    }
}

fn render_pricing(
    ui: &egui::Ui,
    pricing: &crate::deck::Pricing,
    rect: egui::Rect,
    opacity: f32,
    scale: f32,
) {
    draw_centered(
        ui,
        &format!("Who pays: {}", pricing.who_pays),
        rect.center().x,
        rect.top() + rect.height() * 0.14,
        22.0 * scale,
        with_opacity(PANEL_DIM, opacity),
    );

    let count = pricing.plans.len().max(1) as f32;
    let card_w = (rect.width() * 0.8 - (count - 1.0) * 20.0 * scale) / count;
    let card_h = rect.height() * 0.56;
    let origin_x = rect.center().x - rect.width() * 0.4;
    let top = rect.top() + rect.height() * 0.22;

    for (i, plan) in pricing.plans.iter().enumerate() {
        let card = egui::Rect::from_min_size(
            egui::pos2(origin_x + i as f32 * (card_w + 20.0 * scale), top),
            egui::vec2(card_w, card_h),
        );
        ui.painter()
            .rect_filled(card, 8.0 * scale, with_opacity(PANEL_CARD, opacity));
        if plan.popular {
            ui.painter().rect_stroke(
                card,
                8.0 * scale,
                egui::Stroke::new(2.0 * scale, with_opacity(PANEL_ACCENT, opacity)),
                egui::StrokeKind::Outside,
            );
        }

        let pad = 16.0 * scale;
        let mut y = card.top() + pad;
        y += draw_line(
            ui,
            &plan.name,
            egui::pos2(card.left() + pad, y),
            24.0 * scale,
            with_opacity(PANEL_TEXT, opacity),
            card_w - pad * 2.0,
        ) + 6.0 * scale;
        y += draw_line(
            ui,
            &plan.price,
            egui::pos2(card.left() + pad, y),
            32.0 * scale,
            with_opacity(PANEL_ACCENT, opacity),
            card_w - pad * 2.0,
        ) + 6.0 * scale;
        if let Some(credits) = &plan.credits {
            y += draw_line(
                ui,
                credits,
                egui::pos2(card.left() + pad, y),
                16.0 * scale,
                with_opacity(PANEL_DIM, opacity),
                card_w - pad * 2.0,
            ) + 10.0 * scale;
        }
        for feature in &plan.features {
            if y > card.bottom() - pad {
                break;
            }
            let color = if feature.disabled() {
                with_opacity(PANEL_DIM, opacity * 0.5)
            } else {
                with_opacity(PANEL_TEXT, opacity * 0.9)
            };
            y += draw_line(
                ui,
                feature.text(),
                egui::pos2(card.left() + pad, y),
                14.0 * scale,
                color,
                card_w - pad * 2.0,
            ) + 4.0 * scale;
        }
    }
}

fn render_competitors(
    ui: &egui::Ui,
    ctx: &egui::Context,
    slide: &Slide,
    rect: egui::Rect,
    opacity: f32,
    cache: &ImageCache,
    scale: f32,
) {
    let row_w = rect.width() * 0.6;
    let row_h = 86.0 * scale;
    let gap = 16.0 * scale;
    let count = slide.competitors.len() as f32;
    let top = rect.center().y - (count * row_h + (count - 1.0) * gap) / 2.0;
    let left = rect.center().x - row_w / 2.0;

    for (i, competitor) in slide.competitors.iter().enumerate() {
        let row = egui::Rect::from_min_size(
            egui::pos2(left, top + i as f32 * (row_h + gap)),
            egui::vec2(row_w, row_h),
        );
        ui.painter()
            .rect_filled(row, 8.0 * scale, with_opacity(PANEL_CARD, opacity));

        let logo_rect = egui::Rect::from_min_size(
            row.min + egui::vec2(12.0 * scale, 12.0 * scale),
            egui::vec2(row_h - 24.0 * scale, row_h - 24.0 * scale),
        );
        if let Some(path) = &competitor.logo {
            if let Some(texture) = cache.texture(ctx, path) {
                ui.painter().image(
                    texture.id(),
                    logo_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    with_opacity(egui::Color32::WHITE, opacity),
                );
            }
        }

        draw_line(
            ui,
            &competitor.name,
            egui::pos2(logo_rect.right() + 18.0 * scale, row.top() + 16.0 * scale),
            24.0 * scale,
            with_opacity(PANEL_TEXT, opacity),
            row_w * 0.3,
        );
        draw_line(
            ui,
            &competitor.description,
            egui::pos2(row.left() + row_w * 0.5, row.top() + 22.0 * scale),
            18.0 * scale,
            with_opacity(PANEL_DIM, opacity),
            row_w * 0.46,
        );
    }
}

fn render_timeline(
    ui: &egui::Ui,
    timeline: &crate::deck::Timeline,
    rect: egui::Rect,
    opacity: f32,
    scale: f32,
) {
    let col_w = rect.width() * 0.32;
    let top = rect.top() + rect.height() * 0.28;
    let columns = [
        ("Now", &timeline.now, rect.center().x - col_w - 30.0 * scale),
        ("Next", &timeline.next, rect.center().x + 30.0 * scale),
    ];

    for (heading, items, x) in columns {
        let mut y = top;
        y += draw_line(
            ui,
            heading,
            egui::pos2(x, y),
            34.0 * scale,
            with_opacity(PANEL_ACCENT, opacity),
            col_w,
        ) + 18.0 * scale;
        for item in items.iter() {
            ui.painter().circle_filled(
                egui::pos2(x + 6.0 * scale, y + 12.0 * scale),
                4.0 * scale,
                with_opacity(PANEL_ACCENT, opacity),
            );
            y += draw_line(
                ui,
                item,
                egui::pos2(x + 20.0 * scale, y),
                20.0 * scale,
                with_opacity(PANEL_TEXT, opacity),
                col_w - 20.0 * scale,
            ) + 12.0 * scale;
        }
    }
}

fn render_founder(ui: &egui::Ui, slide: &Slide, rect: egui::Rect, opacity: f32, scale: f32) {
    let left = rect.left() + rect.width() * 0.12;
    let mut y = rect.center().y - slide.founder.len() as f32 * 24.0 * scale;
    for item in &slide.founder {
        ui.painter().circle_filled(
            egui::pos2(left - 16.0 * scale, y + 14.0 * scale),
            5.0 * scale,
            with_opacity(PANEL_ACCENT, opacity),
        );
        y += draw_line(
            ui,
            item,
            egui::pos2(left, y),
            26.0 * scale,
            with_opacity(PANEL_TEXT, opacity),
            rect.width() * 0.5,
        ) + 18.0 * scale;
    }
}
