//! Draw surface abstraction
//!
//! The dispatcher renders through `DrawSurface` without knowing whether the
//! pixels end up on an LED panel, a preview window, or a test recording.

/// Panel width in pixels
pub const PANEL_WIDTH: i32 = 128;
/// Panel height in pixels
pub const PANEL_HEIGHT: i32 = 32;

/// An RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Bitmap fonts available on the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Font {
    /// 7x13 fixed font
    Small,
    /// Countdown digits
    Huge,
    /// Banner face
    ExtraLarge,
}

impl Font {
    /// Nominal glyph cell (width, height) in pixels
    pub fn cell(self) -> (i32, i32) {
        match self {
            Font::Small => (7, 13),
            Font::Huge => (14, 32),
            Font::ExtraLarge => (14, 24),
        }
    }
}

/// A single drawing primitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    Line {
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        color: Color,
    },
    Circle {
        cx: i32,
        cy: i32,
        r: i32,
        color: Color,
    },
    /// Text with its baseline at `y`
    Text {
        font: Font,
        x: i32,
        y: i32,
        color: Color,
        text: String,
    },
}

/// Something that can be drawn on
pub trait DrawSurface {
    /// Blank the back buffer
    fn clear(&mut self);

    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color);

    fn draw_circle(&mut self, cx: i32, cy: i32, r: i32, color: Color);

    /// Draw `text` with its baseline at `y`
    fn draw_text(&mut self, font: Font, x: i32, y: i32, color: Color, text: &str);

    /// Present the back buffer
    fn swap(&mut self);

    /// Fill a rectangle with horizontal lines, corners inclusive
    fn fill_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
        for y in y0..=y1 {
            self.draw_line(x0, y, x1, y, color);
        }
    }

    /// Outline a rectangle, corners inclusive
    fn draw_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
        self.draw_line(x0, y0, x1, y0, color);
        self.draw_line(x0, y1, x1, y1, color);
        self.draw_line(x0, y0, x0, y1, color);
        self.draw_line(x1, y0, x1, y1, color);
    }
}

/// Double-buffered surface that keeps frames as command lists
///
/// Drawing goes to the back buffer; `swap` publishes it as the front frame.
#[derive(Debug, Clone, Default)]
pub struct FrameRecorder {
    back: Vec<DrawCommand>,
    front: Vec<DrawCommand>,
    frames: u64,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently presented frame
    pub fn front(&self) -> &[DrawCommand] {
        &self.front
    }

    /// The frame currently being drawn
    pub fn back(&self) -> &[DrawCommand] {
        &self.back
    }

    /// Number of swaps so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl DrawSurface for FrameRecorder {
    fn clear(&mut self) {
        self.back.clear();
    }

    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
        self.back.push(DrawCommand::Line { x0, y0, x1, y1, color });
    }

    fn draw_circle(&mut self, cx: i32, cy: i32, r: i32, color: Color) {
        self.back.push(DrawCommand::Circle { cx, cy, r, color });
    }

    fn draw_text(&mut self, font: Font, x: i32, y: i32, color: Color, text: &str) {
        self.back.push(DrawCommand::Text {
            font,
            x,
            y,
            color,
            text: text.to_string(),
        });
    }

    fn swap(&mut self) {
        std::mem::swap(&mut self.front, &mut self.back);
        self.frames += 1;
        tracing::trace!(frame = self.frames, commands = self.front.len(), "frame swapped");
    }
}
