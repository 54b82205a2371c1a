//! Display state owned by the render loop
//!
//! Holds the single active mode, the banner texts, the timing session start,
//! and the startup bookkeeping that drives the fallback to the default mode.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::mode::Mode;

/// Text banners that can be replaced over the command channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSlot {
    Info,
    Warning,
}

impl TextSlot {
    /// Mode that shows this banner
    pub fn mode(self) -> Mode {
        match self {
            TextSlot::Info => Mode::InfoText,
            TextSlot::Warning => Mode::WarningText,
        }
    }
}

/// Details shown on the startup screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupBanner {
    /// Address the operator console is reachable at
    pub host: String,
    /// Port of the operator console
    pub web_port: u16,
    /// Software version
    pub version: String,
}

impl StartupBanner {
    pub fn address_line(&self) -> String {
        format!("{}:{}", self.host, self.web_port)
    }

    pub fn version_line(&self) -> String {
        format!("mxdisplay-{}", self.version)
    }
}

/// Mutable state behind the sign
#[derive(Debug, Clone)]
pub struct DisplayState {
    mode: Mode,
    default_mode: Mode,
    info_text: String,
    warning_text: String,
    timing_started_at: DateTime<Utc>,
    elapsed_ticks: Duration,
    startup_delay: Duration,
    startup_resolved: bool,
    banner: StartupBanner,
}

impl DisplayState {
    /// Create a state in `Startup` mode with the timing session started at `now`
    pub fn new(default_mode: Mode, startup_delay: Duration, banner: StartupBanner, now: DateTime<Utc>) -> Self {
        Self {
            mode: Mode::Startup,
            default_mode,
            info_text: "Infotext".to_string(),
            warning_text: "Varningstext".to_string(),
            timing_started_at: now,
            elapsed_ticks: Duration::ZERO,
            startup_delay,
            startup_resolved: false,
            banner,
        }
    }

    /// Replace the initial banner texts
    pub fn with_texts(mut self, info_text: impl Into<String>, warning_text: impl Into<String>) -> Self {
        self.info_text = info_text.into();
        self.warning_text = warning_text.into();
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn info_text(&self) -> &str {
        &self.info_text
    }

    pub fn warning_text(&self) -> &str {
        &self.warning_text
    }

    pub fn text(&self, slot: TextSlot) -> &str {
        match slot {
            TextSlot::Info => &self.info_text,
            TextSlot::Warning => &self.warning_text,
        }
    }

    pub fn timing_started_at(&self) -> DateTime<Utc> {
        self.timing_started_at
    }

    pub fn startup_resolved(&self) -> bool {
        self.startup_resolved
    }

    pub fn banner(&self) -> &StartupBanner {
        &self.banner
    }

    /// Switch to `mode`, returning the mode that was active before
    pub fn transition(&mut self, mode: Mode) -> Mode {
        let previous = self.mode;
        if previous != mode {
            tracing::info!(from = %previous, to = %mode, "mode transition");
        }
        self.mode = mode;
        previous
    }

    /// Record that an operator command arrived; the startup fallback is off from now on
    pub fn note_command(&mut self) {
        if !self.startup_resolved {
            tracing::debug!("operator command received, startup fallback disabled");
            self.startup_resolved = true;
        }
    }

    /// Store a banner text
    pub fn set_text(&mut self, slot: TextSlot, text: String) {
        tracing::info!(?slot, text = %text, "banner text stored");
        match slot {
            TextSlot::Info => self.info_text = text,
            TextSlot::Warning => self.warning_text = text,
        }
    }

    /// Restart the timing session at `now`
    pub fn reset_timing(&mut self, now: DateTime<Utc>) {
        tracing::info!(started_at = %now, "timing session reset");
        self.timing_started_at = now;
    }

    /// Time since the timing session started, never negative
    pub fn elapsed_timing(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.timing_started_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Account for one render tick and apply the startup fallback
    ///
    /// Returns true on the one tick that falls back to the default mode.
    pub fn advance(&mut self, tick: Duration) -> bool {
        self.elapsed_ticks = self.elapsed_ticks.saturating_add(tick);
        if self.startup_resolved || self.elapsed_ticks <= self.startup_delay {
            return false;
        }

        tracing::info!(
            after = ?self.elapsed_ticks,
            mode = %self.default_mode,
            "no operator command during startup, falling back to default mode"
        );
        self.startup_resolved = true;
        self.transition(self.default_mode);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(100);

    fn banner() -> StartupBanner {
        StartupBanner {
            host: "10.0.0.7".to_string(),
            web_port: 5000,
            version: "1.0.1".to_string(),
        }
    }

    fn state() -> DisplayState {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        DisplayState::new(Mode::CurrentTime, Duration::from_secs(60), banner(), now)
    }

    #[test]
    fn test_initial_state() {
        let state = state();
        assert_eq!(state.mode(), Mode::Startup);
        assert!(!state.startup_resolved());
        assert_eq!(state.info_text(), "Infotext");
        assert_eq!(state.warning_text(), "Varningstext");
    }

    #[test]
    fn test_startup_fallback_fires_once() {
        let mut state = state();

        for _ in 0..600 {
            assert!(!state.advance(TICK));
        }
        // Exactly 60s elapsed is not yet past the delay
        assert_eq!(state.mode(), Mode::Startup);

        assert!(state.advance(TICK));
        assert_eq!(state.mode(), Mode::CurrentTime);
        assert!(state.startup_resolved());

        state.transition(Mode::Off);
        for _ in 0..1000 {
            assert!(!state.advance(TICK));
        }
        assert_eq!(state.mode(), Mode::Off);
        assert!(state.startup_resolved());
    }

    #[test]
    fn test_command_suppresses_fallback() {
        let mut state = state();
        state.advance(TICK);
        state.note_command();
        assert!(state.startup_resolved());

        for _ in 0..1000 {
            assert!(!state.advance(TICK));
        }
        assert_eq!(state.mode(), Mode::Startup);
    }

    #[test]
    fn test_transition_returns_previous() {
        let mut state = state();
        assert_eq!(state.transition(Mode::Finish), Mode::Startup);
        assert_eq!(state.transition(Mode::Qualify), Mode::Finish);
        assert_eq!(state.mode(), Mode::Qualify);
    }

    #[test]
    fn test_elapsed_timing_never_negative() {
        let mut state = state();
        let now = state.timing_started_at();
        assert_eq!(state.elapsed_timing(now), Duration::ZERO);
        assert_eq!(state.elapsed_timing(now - chrono::Duration::seconds(5)), Duration::ZERO);
        assert_eq!(
            state.elapsed_timing(now + chrono::Duration::seconds(75)),
            Duration::from_secs(75)
        );

        let later = now + chrono::Duration::minutes(3);
        state.reset_timing(later);
        assert_eq!(state.elapsed_timing(later), Duration::ZERO);
    }

    #[test]
    fn test_set_text_by_slot() {
        let mut state = state().with_texts("Välkommen", "Gul flagg");
        assert_eq!(state.text(TextSlot::Info), "Välkommen");
        state.set_text(TextSlot::Warning, "Olja i kurva 3".to_string());
        assert_eq!(state.warning_text(), "Olja i kurva 3");
        assert_eq!(state.info_text(), "Välkommen");
        assert_eq!(TextSlot::Warning.mode(), Mode::WarningText);
    }

    #[test]
    fn test_banner_lines() {
        let banner = banner();
        assert_eq!(banner.address_line(), "10.0.0.7:5000");
        assert_eq!(banner.version_line(), "mxdisplay-1.0.1");
    }
}
