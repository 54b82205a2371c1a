//! Mode dispatcher - maps the active mode to drawing calls
//!
//! Every routine is a pure function of the mode, a state snapshot and the
//! current local time; nothing is remembered between frames.

use std::f64::consts::PI;

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

use crate::mode::{Mode, Window};
use crate::state::DisplayState;
use crate::surface::{Color, DrawSurface, Font, PANEL_HEIGHT, PANEL_WIDTH};
use crate::time_engine::{compute_countdown, format_elapsed, Countdown};

/// Color palette of the sign
pub mod colors {
    use crate::surface::Color;

    pub const TIME: Color = Color::rgb(255, 255, 255);
    pub const TIME_OVER: Color = Color::rgb(255, 0, 0);
    pub const INFO: Color = Color::rgb(255, 255, 255);
    pub const INFO_BACKGROUND: Color = Color::rgb(0, 0, 140);
    pub const WARN: Color = Color::rgb(0, 0, 0);
    pub const WARN_BACKGROUND: Color = Color::rgb(200, 200, 0);
    pub const WARN_BORDER: Color = Color::rgb(200, 0, 0);
    pub const WHITE: Color = Color::rgb(230, 230, 230);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const HOUR_HAND: Color = Color::rgb(255, 0, 0);
    pub const MINUTE_HAND: Color = Color::rgb(0, 255, 0);
    pub const SECOND_HAND: Color = Color::rgb(0, 0, 255);
}

const RIGHT: i32 = PANEL_WIDTH - 1;
const BOTTOM: i32 = PANEL_HEIGHT - 1;

/// Centre of the analog clock face shown beside countdowns
const CLOCK_CENTER: (i32, i32) = (32 * 3 + 19, 12);
const CLOCK_RADIUS: i32 = 12;

/// Size of one checkered flag square
const FLAG_CELL: i32 = 4;

/// Draw the frame for `mode`
pub fn render<S: DrawSurface + ?Sized>(mode: Mode, state: &DisplayState, now: &DateTime<Tz>, surface: &mut S) {
    match mode {
        Mode::Off | Mode::Closed => {}
        Mode::Startup => draw_startup(surface, state),
        Mode::CurrentTime => draw_current_time(surface, now),
        Mode::InfoText => draw_info_text(surface, state.info_text()),
        Mode::WarningText => draw_warning_text(surface, state.warning_text()),
        Mode::OneLapLeft => draw_laps_left(surface, 1, 0),
        Mode::TwoLapsLeft => draw_laps_left(surface, 2, -3),
        Mode::Finish => draw_finish(surface, now.second() % 2 == 1),
        Mode::Qualify => draw_qualify(surface),
        Mode::ElapsedTiming => draw_elapsed(surface, state, now.with_timezone(&Utc)),
        Mode::TimeLeft(window) => draw_time_left(surface, window, now),
    }
}

fn draw_time_left<S: DrawSurface + ?Sized>(surface: &mut S, window: Window, now: &DateTime<Tz>) {
    let countdown = compute_countdown(now, &window.schedule());
    draw_countdown(surface, &countdown);
    draw_indicator(surface);
    draw_clock(surface, now);
}

fn draw_countdown<S: DrawSurface + ?Sized>(surface: &mut S, countdown: &Countdown) {
    let color = if countdown.blink_phase {
        colors::TIME_OVER
    } else {
        colors::TIME
    };
    surface.draw_text(Font::Huge, 0, PANEL_HEIGHT, color, &countdown.format());
}

/// Small downward triangle between the digits and the clock face
fn draw_indicator<S: DrawSurface + ?Sized>(surface: &mut S) {
    let (left, right, top) = (88, 96, 11);
    for row in 0..=(right - left) / 2 {
        surface.draw_line(left + row, top + row, right - row, top + row, colors::TIME);
    }
}

fn draw_hand<S: DrawSurface + ?Sized>(
    surface: &mut S,
    (x0, y0): (i32, i32),
    length: f64,
    angle: f64,
    color: Color,
) {
    let x1 = f64::from(x0) + length * angle.cos();
    let y1 = f64::from(y0) + length * angle.sin();
    surface.draw_line(x0, y0, x1.round() as i32, y1.round() as i32, color);
}

fn draw_clock<S: DrawSurface + ?Sized>(surface: &mut S, now: &DateTime<Tz>) {
    let (x0, y0) = CLOCK_CENTER;
    surface.draw_circle(x0, y0, CLOCK_RADIUS, colors::TIME);
    surface.draw_circle(x0, y0 + 1, CLOCK_RADIUS, colors::TIME);

    let hour = f64::from(now.hour());
    let minute = f64::from(now.minute());
    let second = f64::from(now.second());

    // Angle zero points right, so a quarter turn back puts twelve o'clock on top
    let hour_angle = (hour + minute / 60.0) * 2.0 * PI / 12.0 - 0.5 * PI;
    let minute_angle = minute * 2.0 * PI / 60.0 - 0.5 * PI;
    let second_angle = second * 2.0 * PI / 60.0 - 0.5 * PI;

    draw_hand(surface, (x0, y0), 10.0, second_angle, colors::SECOND_HAND);
    for origin in [(x0, y0), (x0, y0 + 1), (x0 + 1, y0)] {
        draw_hand(surface, origin, 10.0, minute_angle, colors::MINUTE_HAND);
    }
    for origin in [(x0, y0), (x0, y0 + 1), (x0 + 1, y0)] {
        draw_hand(surface, origin, 8.0, hour_angle, colors::HOUR_HAND);
    }
}

fn draw_double_frame<S: DrawSurface + ?Sized>(surface: &mut S, color: Color) {
    surface.draw_rect(0, 0, RIGHT, BOTTOM, color);
    surface.draw_rect(1, 1, RIGHT - 1, BOTTOM - 1, color);
}

fn draw_current_time<S: DrawSurface + ?Sized>(surface: &mut S, now: &DateTime<Tz>) {
    draw_double_frame(surface, colors::TIME);
    let time_str = now.format("%H:%M:%S").to_string();
    surface.draw_text(Font::ExtraLarge, 6, 28, colors::TIME, &time_str);
}

fn draw_info_text<S: DrawSurface + ?Sized>(surface: &mut S, text: &str) {
    surface.fill_rect(0, 0, RIGHT, BOTTOM, colors::INFO_BACKGROUND);
    draw_double_frame(surface, colors::INFO);
    surface.draw_text(Font::ExtraLarge, 6, 28, colors::INFO, text);
}

fn draw_warning_text<S: DrawSurface + ?Sized>(surface: &mut S, text: &str) {
    surface.fill_rect(0, 0, RIGHT, BOTTOM, colors::WARN_BACKGROUND);
    draw_double_frame(surface, colors::WARN_BORDER);
    surface.draw_text(Font::ExtraLarge, 6, 28, colors::WARN, text);
}

fn draw_startup<S: DrawSurface + ?Sized>(surface: &mut S, state: &DisplayState) {
    let banner = state.banner();
    surface.draw_text(Font::Small, 4, 11, colors::TIME, &banner.address_line());
    surface.draw_text(Font::Small, 4, 30, colors::TIME, &banner.version_line());
}

fn draw_laps_left<S: DrawSurface + ?Sized>(surface: &mut S, laps: u32, offset: i32) {
    surface.fill_rect(0, 0, RIGHT, BOTTOM, colors::WHITE);
    let text = format!("{} VARV", laps);
    surface.draw_text(Font::ExtraLarge, 20 + offset, 28, colors::BLACK, &text);
}

fn draw_qualify<S: DrawSurface + ?Sized>(surface: &mut S) {
    surface.draw_text(Font::ExtraLarge, 10, 28, colors::WHITE, "Tidskval");
}

/// Checkered flag; `shifted` swaps the squares so the flag flickers each second
fn draw_finish<S: DrawSurface + ?Sized>(surface: &mut S, shifted: bool) {
    let mut offset = if shifted { FLAG_CELL } else { 0 };
    for y in 0..PANEL_HEIGHT {
        if y % FLAG_CELL == 0 {
            offset = FLAG_CELL - offset;
        }
        for x in (0..PANEL_WIDTH).step_by((FLAG_CELL * 2) as usize) {
            surface.draw_line(x + offset, y, x + offset + FLAG_CELL - 1, y, colors::WHITE);
        }
    }
}

fn draw_elapsed<S: DrawSurface + ?Sized>(surface: &mut S, state: &DisplayState, now: DateTime<Utc>) {
    let elapsed = state.elapsed_timing(now);
    surface.draw_text(Font::Huge, 0, PANEL_HEIGHT, colors::TIME, &format_elapsed(elapsed));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StartupBanner;
    use crate::surface::{DrawCommand, FrameRecorder};
    use chrono::TimeZone;
    use chrono_tz::Europe::Stockholm;
    use std::time::Duration;

    fn local(h: u32, m: u32, s: u32) -> DateTime<Tz> {
        Stockholm.with_ymd_and_hms(2024, 6, 1, h, m, s).unwrap()
    }

    fn state_at(now: &DateTime<Tz>) -> DisplayState {
        let banner = StartupBanner {
            host: "192.168.1.20".to_string(),
            web_port: 5000,
            version: "1.0.1".to_string(),
        };
        DisplayState::new(
            Mode::CurrentTime,
            Duration::from_secs(60),
            banner,
            now.with_timezone(&Utc),
        )
    }

    fn frame(mode: Mode, state: &DisplayState, now: &DateTime<Tz>) -> Vec<DrawCommand> {
        let mut surface = FrameRecorder::new();
        render(mode, state, now, &mut surface);
        surface.back().to_vec()
    }

    fn texts(commands: &[DrawCommand]) -> Vec<(String, Color)> {
        commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, color, .. } => Some((text.clone(), *color)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_countdown_frame() {
        let now = local(17, 29, 59);
        let state = state_at(&now);
        let commands = frame(Mode::TimeLeft(Window::HalfHour), &state, &now);
        // Odd second in the last minute blinks red
        assert_eq!(texts(&commands), vec![("00:00".to_string(), colors::TIME_OVER)]);
        assert!(commands.iter().any(|c| matches!(c, DrawCommand::Circle { .. })));

        let now = local(17, 30, 0);
        let commands = frame(Mode::TimeLeft(Window::HalfHour), &state, &now);
        assert_eq!(texts(&commands), vec![("29:59".to_string(), colors::TIME)]);
    }

    #[test]
    fn test_countdown_uses_window_schedule() {
        let now = local(17, 41, 0);
        let state = state_at(&now);
        let commands = frame(Mode::TimeLeft(Window::Twenty), &state, &now);
        assert_eq!(texts(&commands)[0].0, "18:59");
        let commands = frame(Mode::TimeLeft(Window::TwentyHalf), &state, &now);
        assert_eq!(texts(&commands)[0].0, "08:59");
    }

    #[test]
    fn test_finish_toggles_every_second() {
        let even = local(12, 0, 10);
        let odd = local(12, 0, 11);
        let state = state_at(&even);

        let even_frame = frame(Mode::Finish, &state, &even);
        let odd_frame = frame(Mode::Finish, &state, &odd);
        assert_eq!(even_frame.len(), odd_frame.len());
        assert_ne!(even_frame, odd_frame);
        assert_eq!(even_frame, frame(Mode::Finish, &state, &local(12, 0, 12)));
    }

    #[test]
    fn test_elapsed_timing_starts_at_zero() {
        let now = local(9, 15, 0);
        let state = state_at(&now);
        let commands = frame(Mode::ElapsedTiming, &state, &now);
        assert_eq!(texts(&commands)[0].0, "00:00");

        let later = local(9, 17, 5);
        let commands = frame(Mode::ElapsedTiming, &state, &later);
        assert_eq!(texts(&commands)[0].0, "02:05");
    }

    #[test]
    fn test_banner_texts() {
        let now = local(9, 0, 0);
        let mut state = state_at(&now);
        state.set_text(crate::state::TextSlot::Info, "Hello".to_string());

        let commands = frame(Mode::InfoText, &state, &now);
        assert_eq!(texts(&commands), vec![("Hello".to_string(), colors::INFO)]);

        let commands = frame(Mode::WarningText, &state, &now);
        assert_eq!(texts(&commands), vec![("Varningstext".to_string(), colors::WARN)]);

        let commands = frame(Mode::TwoLapsLeft, &state, &now);
        assert_eq!(texts(&commands)[0].0, "2 VARV");

        let commands = frame(Mode::Startup, &state, &now);
        assert_eq!(texts(&commands)[0].0, "192.168.1.20:5000");
    }

    #[test]
    fn test_current_time_uses_local_zone() {
        let now = local(23, 5, 9);
        let state = state_at(&now);
        let commands = frame(Mode::CurrentTime, &state, &now);
        assert_eq!(texts(&commands)[0].0, "23:05:09");
    }

    #[test]
    fn test_blank_modes_draw_nothing() {
        let now = local(9, 0, 0);
        let state = state_at(&now);
        assert!(frame(Mode::Off, &state, &now).is_empty());
        assert!(frame(Mode::Closed, &state, &now).is_empty());
    }
}
