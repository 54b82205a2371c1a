//! Display modes
//!
//! Exactly one mode is active at a time. Each mode has a command token that
//! selects it over the command channel.

use crate::time_engine::WindowSchedule;

/// The countdown windows a sign can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Window {
    /// Boundaries at :30 and :00
    HalfHour,
    /// Boundaries at :20, :40 and :00
    Twenty,
    /// Twenty minute windows shifted by half an hour
    TwentyHalf,
    /// 25 + 35 minute windows ending on the hour
    TwentyFiveThirtyFiveFull,
    /// 25 + 35 minute windows shifted by half an hour
    TwentyFiveThirtyFiveHalf,
}

impl Window {
    pub fn schedule(self) -> WindowSchedule {
        match self {
            Window::HalfHour => WindowSchedule::HALF_HOUR,
            Window::Twenty => WindowSchedule::TWENTY_MINUTE,
            Window::TwentyHalf => WindowSchedule::TWENTY_MINUTE.shifted(30),
            Window::TwentyFiveThirtyFiveFull => WindowSchedule::TWENTY_FIVE_THIRTY_FIVE,
            Window::TwentyFiveThirtyFiveHalf => WindowSchedule::TWENTY_FIVE_THIRTY_FIVE.shifted(30),
        }
    }
}

/// What the sign is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Off,
    Closed,
    Startup,
    CurrentTime,
    InfoText,
    WarningText,
    OneLapLeft,
    TwoLapsLeft,
    Finish,
    Qualify,
    ElapsedTiming,
    TimeLeft(Window),
}

impl Mode {
    /// Look up the mode selected by a command token
    ///
    /// `Closed` has no token and `reset_timing` is not a plain switch, so
    /// neither is returned here.
    pub fn from_token(token: &str) -> Option<Mode> {
        let mode = match token {
            "time_left" => Mode::TimeLeft(Window::HalfHour),
            "time_left_twenty" => Mode::TimeLeft(Window::Twenty),
            "time_left_twenty_half" => Mode::TimeLeft(Window::TwentyHalf),
            "time_left_25_35_full" => Mode::TimeLeft(Window::TwentyFiveThirtyFiveFull),
            "time_left_25_35_half" => Mode::TimeLeft(Window::TwentyFiveThirtyFiveHalf),
            "time" => Mode::CurrentTime,
            "off" => Mode::Off,
            "info" => Mode::InfoText,
            "warn" => Mode::WarningText,
            "one_lap" => Mode::OneLapLeft,
            "two_lap" => Mode::TwoLapsLeft,
            "finish" => Mode::Finish,
            "qualify" => Mode::Qualify,
            "startup" => Mode::Startup,
            "timing" => Mode::ElapsedTiming,
            _ => return None,
        };
        Some(mode)
    }

    /// The command token selecting this mode, if any
    pub fn token(self) -> Option<&'static str> {
        let token = match self {
            Mode::TimeLeft(Window::HalfHour) => "time_left",
            Mode::TimeLeft(Window::Twenty) => "time_left_twenty",
            Mode::TimeLeft(Window::TwentyHalf) => "time_left_twenty_half",
            Mode::TimeLeft(Window::TwentyFiveThirtyFiveFull) => "time_left_25_35_full",
            Mode::TimeLeft(Window::TwentyFiveThirtyFiveHalf) => "time_left_25_35_half",
            Mode::CurrentTime => "time",
            Mode::Off => "off",
            Mode::InfoText => "info",
            Mode::WarningText => "warn",
            Mode::OneLapLeft => "one_lap",
            Mode::TwoLapsLeft => "two_lap",
            Mode::Finish => "finish",
            Mode::Qualify => "qualify",
            Mode::Startup => "startup",
            Mode::ElapsedTiming => "timing",
            Mode::Closed => return None,
        };
        Some(token)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.token() {
            Some(token) => f.write_str(token),
            None => write!(f, "{:?}", self),
        }
    }
}
