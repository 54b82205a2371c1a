//! Shared core for the MX timing sign
//!
//! Countdown arithmetic, the display mode state machine, the command channel
//! protocol and the render loop that ties them to a draw surface.

pub mod channel;
pub mod config;
pub mod dispatch;
pub mod mode;
pub mod render_loop;
pub mod state;
pub mod surface;
pub mod tcp;
pub mod time_engine;

pub use channel::{ChannelError, Command, CommandChannel, MemoryTransport, PollOutcome, Transport};
pub use config::{config_path, load_or_init, ConfigError, SignConfig};
pub use dispatch::render;
pub use mode::{Mode, Window};
pub use render_loop::RenderLoop;
pub use state::{DisplayState, StartupBanner, TextSlot};
pub use surface::{Color, DrawCommand, DrawSurface, Font, FrameRecorder, PANEL_HEIGHT, PANEL_WIDTH};
pub use tcp::{local_ip, TcpTransport};
pub use time_engine::{compute_countdown, ClockError, ClockSource, Countdown, FixedClock, SystemClock, WindowSchedule};
