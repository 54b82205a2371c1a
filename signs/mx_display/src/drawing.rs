//! Drawing module - replays recorded panel frames onto the preview window
//!
//! Each panel pixel becomes a `scale` x `scale` square; panel y grows
//! downwards while nannou's grows upwards.

use mx_shared::{Color, DrawCommand, Font, PANEL_HEIGHT, PANEL_WIDTH};
use nannou::prelude::*;

/// Color palette for the preview window
pub mod colors {
    use nannou::prelude::*;

    pub const BACKGROUND: Srgb<u8> = Srgb {
        red: 18,
        green: 18,
        blue: 18,
        standard: std::marker::PhantomData,
    };
    pub const PANEL: Srgb<u8> = Srgb {
        red: 0,
        green: 0,
        blue: 0,
        standard: std::marker::PhantomData,
    };
    pub const BEZEL: Srgb<u8> = Srgb {
        red: 60,
        green: 60,
        blue: 60,
        standard: std::marker::PhantomData,
    };
}

/// Where the panel sits in the window
#[derive(Debug, Clone, Copy)]
pub struct PanelLayout {
    pub rect: Rect,
    pub scale: f32,
}

impl PanelLayout {
    /// Largest integer scale of the panel that fits the window with a margin
    pub fn calculate(window_rect: Rect) -> Self {
        let margin = 16.0;
        let fit_w = (window_rect.w() - 2.0 * margin) / PANEL_WIDTH as f32;
        let fit_h = (window_rect.h() - 2.0 * margin) / PANEL_HEIGHT as f32;
        let scale = fit_w.min(fit_h).floor().max(1.0);
        let rect = Rect::from_xy_wh(
            window_rect.xy(),
            vec2(PANEL_WIDTH as f32 * scale, PANEL_HEIGHT as f32 * scale),
        );
        Self { rect, scale }
    }

    /// Window position of the centre of panel pixel (x, y)
    pub fn point(&self, x: f32, y: f32) -> Point2 {
        pt2(
            self.rect.left() + (x + 0.5) * self.scale,
            self.rect.top() - (y + 0.5) * self.scale,
        )
    }
}

fn to_srgb(color: Color) -> Srgb<u8> {
    srgb(color.r, color.g, color.b)
}

fn font_size(font: Font) -> f32 {
    match font {
        Font::Small => 11.0,
        Font::Huge => 30.0,
        Font::ExtraLarge => 22.0,
    }
}

/// Draw the panel background and every command of the presented frame
pub fn draw_panel(draw: &Draw, commands: &[DrawCommand], layout: &PanelLayout) {
    draw.rect()
        .xy(layout.rect.xy())
        .wh(layout.rect.wh() + vec2(8.0, 8.0))
        .color(colors::BEZEL);
    draw.rect()
        .xy(layout.rect.xy())
        .wh(layout.rect.wh())
        .color(colors::PANEL);

    for command in commands {
        draw_command(draw, command, layout);
    }
}

fn draw_command(draw: &Draw, command: &DrawCommand, layout: &PanelLayout) {
    match command {
        DrawCommand::Line { x0, y0, x1, y1, color } => {
            draw.line()
                .start(layout.point(*x0 as f32, *y0 as f32))
                .end(layout.point(*x1 as f32, *y1 as f32))
                .caps_square()
                .weight(layout.scale)
                .color(to_srgb(*color));
        }
        DrawCommand::Circle { cx, cy, r, color } => {
            draw.ellipse()
                .xy(layout.point(*cx as f32, *cy as f32))
                .radius(*r as f32 * layout.scale)
                .no_fill()
                .stroke(to_srgb(*color))
                .stroke_weight(layout.scale);
        }
        DrawCommand::Text { font, x, y, color, text } => {
            let (_, cell_h) = font.cell();
            let width = (PANEL_WIDTH - x).max(1) as f32 * layout.scale;
            let height = cell_h as f32 * layout.scale;
            // Box from the baseline up, left edge at x
            let left = layout.rect.left() + *x as f32 * layout.scale;
            let baseline = layout.rect.top() - *y as f32 * layout.scale;
            draw.text(text)
                .xy(pt2(left + width / 2.0, baseline + height / 2.0))
                .wh(vec2(width, height))
                .font_size((font_size(*font) * layout.scale) as u32)
                .left_justify()
                .align_text_bottom()
                .no_line_wrap()
                .color(to_srgb(*color));
        }
    }
}
