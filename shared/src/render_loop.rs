//! Render loop - one tick polls the channel, applies changes and draws a frame

use std::time::{Duration, Instant};

use chrono_tz::Tz;

use crate::channel::{CommandChannel, PollOutcome, Transport};
use crate::dispatch::render;
use crate::state::DisplayState;
use crate::surface::DrawSurface;
use crate::time_engine::{ClockError, ClockSource};

/// Default render tick period
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Owns the display state and everything that reads or writes it
pub struct RenderLoop<T: Transport, C: ClockSource, S: DrawSurface> {
    state: DisplayState,
    channel: CommandChannel<T>,
    clock: C,
    surface: S,
    timezone: Tz,
    tick_period: Duration,
}

impl<T: Transport, C: ClockSource, S: DrawSurface> RenderLoop<T, C, S> {
    pub fn new(
        state: DisplayState,
        channel: CommandChannel<T>,
        clock: C,
        surface: S,
        timezone: Tz,
        tick_period: Duration,
    ) -> Self {
        Self {
            state,
            channel,
            clock,
            surface,
            timezone,
            tick_period,
        }
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn channel(&self) -> &CommandChannel<T> {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut CommandChannel<T> {
        &mut self.channel
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// Poll for one request, apply it, then draw and present a frame
    pub fn tick(&mut self) -> Result<PollOutcome, ClockError> {
        let now = self.clock.now()?;
        let outcome = self.channel.poll(&mut self.state, now, Instant::now());

        let local = now.with_timezone(&self.timezone);
        self.surface.clear();
        render(self.state.mode(), &self.state, &local, &mut self.surface);
        self.surface.swap();
        Ok(outcome)
    }

    /// Account for one tick period and apply the startup fallback
    pub fn advance(&mut self) -> bool {
        self.state.advance(self.tick_period)
    }

    /// Tick forever at the configured period; returns only on a clock failure
    pub fn run(&mut self) -> Result<(), ClockError> {
        tracing::info!(period = ?self.tick_period, timezone = %self.timezone, "render loop started");
        loop {
            self.tick()?;
            std::thread::sleep(self.tick_period);
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemoryTransport;
    use crate::mode::Mode;
    use crate::state::{StartupBanner, TextSlot};
    use crate::surface::{DrawCommand, FrameRecorder};
    use crate::time_engine::FixedClock;
    use chrono::{DateTime, TimeZone, Utc};

    struct BrokenClock;

    impl ClockSource for BrokenClock {
        fn now(&self) -> Result<DateTime<Utc>, ClockError> {
            Err(ClockError::BeforeEpoch)
        }
    }

    fn banner() -> StartupBanner {
        StartupBanner {
            host: "10.1.1.2".to_string(),
            web_port: 5000,
            version: "1.0.1".to_string(),
        }
    }

    fn sign(start: DateTime<Utc>) -> RenderLoop<MemoryTransport, FixedClock, FrameRecorder> {
        let state = DisplayState::new(Mode::CurrentTime, Duration::from_secs(60), banner(), start);
        let channel = CommandChannel::new(MemoryTransport::new(), Duration::from_secs(5));
        RenderLoop::new(
            state,
            channel,
            FixedClock::new(start),
            FrameRecorder::new(),
            Tz::UTC,
            DEFAULT_TICK,
        )
    }

    fn front_texts<T: Transport, C: ClockSource>(sign: &RenderLoop<T, C, FrameRecorder>) -> Vec<String> {
        sign.surface()
            .front()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_tick_presents_startup_screen() {
        let mut sign = sign(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap());
        assert_eq!(sign.tick().unwrap(), PollOutcome::Nothing);
        assert_eq!(front_texts(&sign), vec!["10.1.1.2:5000", "mxdisplay-1.0.1"]);
        assert_eq!(sign.surface().frames(), 1);
    }

    #[test]
    fn test_command_applies_in_same_tick() {
        let mut sign = sign(Utc.with_ymd_and_hms(2024, 6, 1, 17, 29, 59).unwrap());
        sign.channel_mut().transport_mut().push("time_left");
        sign.tick().unwrap();
        assert_eq!(front_texts(&sign), vec!["00:00"]);

        sign.clock().advance(chrono::Duration::seconds(1));
        sign.tick().unwrap();
        assert_eq!(front_texts(&sign), vec!["29:59"]);
    }

    #[test]
    fn test_reset_timing_renders_zero() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        let mut sign = sign(start);
        sign.clock().advance(chrono::Duration::minutes(42));
        sign.channel_mut().transport_mut().push("reset_timing");
        sign.tick().unwrap();
        assert_eq!(front_texts(&sign), vec!["00:00"]);

        sign.clock().advance(chrono::Duration::seconds(90));
        sign.tick().unwrap();
        assert_eq!(front_texts(&sign), vec!["01:30"]);
    }

    #[test]
    fn test_startup_fallback_after_delay() {
        let mut sign = sign(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
        let mut fallbacks = 0;
        for _ in 0..700 {
            sign.tick().unwrap();
            if sign.advance() {
                fallbacks += 1;
            }
        }
        assert_eq!(fallbacks, 1);
        assert_eq!(sign.state().mode(), Mode::CurrentTime);
        assert!(sign.state().startup_resolved());
    }

    #[test]
    fn test_set_text_spans_ticks() {
        let mut sign = sign(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
        sign.channel_mut().transport_mut().push("set_info_text");
        assert_eq!(sign.tick().unwrap(), PollOutcome::Waiting(TextSlot::Info));
        // Still rendering while the payload is outstanding
        assert_eq!(sign.surface().frames(), 1);

        sign.channel_mut().transport_mut().push("Hello");
        assert_eq!(sign.tick().unwrap(), PollOutcome::TextStored(TextSlot::Info));
        assert_eq!(sign.state().mode(), Mode::InfoText);
        assert_eq!(front_texts(&sign), vec!["Hello"]);
    }

    #[test]
    fn test_clock_failure_is_fatal() {
        let state = DisplayState::new(
            Mode::CurrentTime,
            Duration::from_secs(60),
            banner(),
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        );
        let channel = CommandChannel::new(MemoryTransport::new(), Duration::from_secs(5));
        let mut sign = RenderLoop::new(
            state,
            channel,
            BrokenClock,
            FrameRecorder::new(),
            Tz::UTC,
            DEFAULT_TICK,
        );
        assert_eq!(sign.tick(), Err(ClockError::BeforeEpoch));
        assert_eq!(sign.run(), Err(ClockError::BeforeEpoch));
        assert_eq!(sign.surface().frames(), 0);
    }
}
