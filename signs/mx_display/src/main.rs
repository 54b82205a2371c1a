//! MX Display
//!
//! Drives the race timing sign: listens for operator commands, keeps the
//! display state, and renders either into a scaled preview window or headless.

mod cli;
mod drawing;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mx_shared::{
    config_path, load_or_init, local_ip, ClockSource, CommandChannel, ConfigError, DisplayState,
    FrameRecorder, RenderLoop, StartupBanner, SystemClock, TcpTransport,
};
use nannou::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::cli::Args;
use crate::drawing::{colors, draw_panel, PanelLayout};

const DISPLAY_NAME: &str = "mx_display";

/// Ticks the preview will replay at once after a stall
const MAX_CATCH_UP_TICKS: u32 = 10;

type Sign = RenderLoop<TcpTransport, SystemClock, FrameRecorder>;

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    if args.headless {
        let mut sign = build_sign(&args)?;
        sign.run().context("render loop stopped")?;
        return Ok(());
    }

    nannou::app(model).update(update).run();
    Ok(())
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn resolve_config_path(args: &Args) -> Result<PathBuf> {
    match &args.config {
        Some(path) => Ok(path.clone()),
        None => Ok(config_path(DISPLAY_NAME).ok_or(ConfigError::NoConfigDir)?),
    }
}

fn build_sign(args: &Args) -> Result<Sign> {
    let path = resolve_config_path(args)?;
    let mut config =
        load_or_init(&path).with_context(|| format!("loading configuration from {}", path.display()))?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    let timezone = config.timezone()?;
    let default_mode = config.default_mode()?;
    let tick_period = config.tick_period()?;

    let banner = StartupBanner {
        host: local_ip().to_string(),
        web_port: config.web_port,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let now = SystemClock.now().context("reading system clock")?;
    let state = DisplayState::new(default_mode, config.startup_delay(), banner, now)
        .with_texts(config.info_text.clone(), config.warning_text.clone());

    let transport = TcpTransport::bind(config.bind_addr)?;
    let channel = CommandChannel::new(transport, config.payload_timeout());

    tracing::info!(
        config = %path.display(),
        %timezone,
        default_mode = %default_mode,
        "sign ready"
    );
    Ok(RenderLoop::new(
        state,
        channel,
        SystemClock,
        FrameRecorder::new(),
        timezone,
        tick_period,
    ))
}

/// Application state
struct Model {
    /// `None` once the sign failed to start; the app is quitting
    sign: Option<Sign>,
    /// Time since the last render tick
    since_tick: Duration,
}

fn model(app: &App) -> Model {
    app.new_window()
        .title("MX Display")
        .size(800, 240)
        .view(view)
        .build()
        .unwrap();

    let args = Args::parse();
    let sign = match build_sign(&args) {
        Ok(sign) => Some(sign),
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "sign failed to start");
            app.quit();
            None
        }
    };

    Model {
        sign,
        since_tick: Duration::ZERO,
    }
}

fn update(app: &App, model: &mut Model, update: Update) {
    let Some(sign) = model.sign.as_mut() else {
        return;
    };
    let period = sign.tick_period();
    model.since_tick += update.since_last;
    if model.since_tick > period * MAX_CATCH_UP_TICKS {
        model.since_tick = period;
    }

    while model.since_tick >= period {
        model.since_tick -= period;
        if let Err(e) = sign.tick() {
            tracing::error!(error = %e, "clock failure, stopping");
            app.quit();
            return;
        }
        sign.advance();
    }
}

fn view(app: &App, model: &Model, frame: Frame) {
    let draw = app.draw();
    draw.background().color(colors::BACKGROUND);

    if let Some(sign) = &model.sign {
        let layout = PanelLayout::calculate(app.window_rect());
        draw_panel(&draw, sign.surface().front(), &layout);
    }

    draw.to_frame(app, &frame).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use mx_shared::Mode;
    use std::fs;

    fn args_with_config(name: &str, contents: &str) -> Args {
        let dir = std::env::temp_dir().join(format!("mx_display_test_{}_{}", std::process::id(), name));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("mx_display.toml");
        fs::write(&path, contents).unwrap();
        Args {
            config: Some(path),
            bind: Some("127.0.0.1:0".parse().unwrap()),
            headless: true,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn test_build_sign_starts_on_startup_screen() {
        let args = args_with_config("ok", "timezone = \"Europe/Stockholm\"\n");
        let sign = build_sign(&args).unwrap();
        assert_eq!(sign.state().mode(), Mode::Startup);
        assert!(sign.surface().front().is_empty());
    }

    #[test]
    fn test_build_sign_reports_bad_config() {
        let args = args_with_config("bad_mode", "default_mode = \"nope\"\n");
        assert!(build_sign(&args).is_err());

        let args = args_with_config("bad_timeout", "payload_timeout_secs = 9223372036854775807\n");
        assert!(build_sign(&args).is_err());
    }
}
