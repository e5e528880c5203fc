//! Towertui: stack swinging blocks as high as you can, in the terminal.

mod app;
mod camera;
mod crane;
mod feedback;
mod game;
mod input;
mod physics;
mod scheduler;
mod score;
mod theme;
mod tween;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use crane::CraneConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options derived from CLI that affect the simulation (crane, combo window, camera).
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub crane: CraneConfig,
    pub base_combo_time: Duration,
    pub damp_time: f32,
    pub keep_offset: bool,
    /// Fixed seed for spawn yaw and swing; `None` draws one from the OS.
    pub seed: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = args.log_file.as_deref() {
        init_logging(path)?;
    }
    let theme = load_theme(&args);
    let config = GameConfig {
        crane: CraneConfig {
            move_per_block: args.move_per_block,
            swing_strength: args.swing_strength,
            freeze_placed: args.freeze_placed,
            pitch_variance: args.pitch_variance,
        },
        base_combo_time: Duration::from_secs_f32(args.base_combo_time),
        damp_time: args.damp_time,
        keep_offset: args.keep_offset,
        seed: args.seed,
    };
    log::info!("starting with {config:?}");
    let mut app = App::new(&args, config, theme);
    app.run()?;
    Ok(())
}

/// An unreadable theme file falls back to One Dark; the palette still applies.
fn load_theme(args: &Args) -> theme::Theme {
    match theme::Theme::load(args.theme.as_deref(), args.palette) {
        Ok(theme) => theme,
        Err(e) => {
            log::warn!("theme not loaded, using One Dark: {e}");
            theme::Theme::default_for_palette(args.palette)
        }
    }
}

/// The terminal belongs to the game, so logs only ever go to a file.
fn init_logging(path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()
        .context("logger already installed")?;
    Ok(())
}

/// Ceiling for every tuning value; keeps the derived `Duration`s in range.
const MAX_TUNING: f32 = 1000.0;
/// A tick must fit in `Duration` and a second must fit in a sane number of ticks.
const MIN_TICK_RATE: f32 = 1.0;
const MAX_TICK_RATE: f32 = 1000.0;

fn non_negative(s: &str) -> Result<f32, String> {
    let v: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if v.is_finite() && (0.0..=MAX_TUNING).contains(&v) {
        Ok(v)
    } else {
        Err(format!("expected a value between 0 and {MAX_TUNING}, got {v}"))
    }
}

fn positive(s: &str) -> Result<f32, String> {
    let v = non_negative(s)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err("expected a value > 0".to_string())
    }
}

fn tick_rate(s: &str) -> Result<f32, String> {
    let v: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if v.is_finite() && (MIN_TICK_RATE..=MAX_TICK_RATE).contains(&v) {
        Ok(v)
    } else {
        Err(format!("expected {MIN_TICK_RATE} to {MAX_TICK_RATE} ticks per second, got {v}"))
    }
}

/// Tower stacking arcade game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "towertui",
    version,
    about = "Stack swinging blocks into a tower. Drop them on top of each other; miss and the run is over.",
    long_about = "Towertui is a one-button tower stacking game for the terminal.\n\n\
        A crane swings a block over the tower. Drop it so it lands square on the block below: \
        the closer it lands, the more it scores, and quick drops build a combo bonus. When a block \
        falls below the one it should rest on, the run ends and the camera scrolls back down the tower.\n\n\
        CONTROLS:\n  Space/Enter/Click  Drop (or play again after a loss)\n  R  Restart after a loss    P  Pause    Q / Esc  Quit"
)]
pub struct Args {
    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette for the tower blocks: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// How far the crane rises after each scored block (world units; blocks are 2 tall).
    #[arg(long, default_value = "2.0", value_name = "UNITS", value_parser = non_negative)]
    pub move_per_block: f32,

    /// Upper bound of the sideways push a new block gets; 0 hangs it still.
    #[arg(long, default_value = "0.6", value_name = "STRENGTH", value_parser = non_negative)]
    pub swing_strength: f32,

    /// Seconds after a scored drop during which the next one extends the combo.
    #[arg(long, default_value = "3.0", value_name = "SECS", value_parser = positive)]
    pub base_combo_time: f32,

    /// Camera smoothing time in seconds (smaller = snappier).
    #[arg(long, default_value = "0.3", value_name = "SECS", value_parser = positive)]
    pub damp_time: f32,

    /// Keep the camera's starting offset from the crane instead of centring on it.
    #[arg(long)]
    pub keep_offset: bool,

    /// Freeze blocks lower in the tower once another one settles on them.
    #[arg(long)]
    pub freeze_placed: bool,

    /// Random spread of the spawn/drop sound pitch around 1.0.
    #[arg(long, default_value = "0.1", value_name = "AMOUNT", value_parser = non_negative)]
    pub pitch_variance: f32,

    /// Seed for block yaw and swing, for reproducible runs.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Simulation ticks per second.
    #[arg(long, default_value = "60.0", value_name = "RATE", value_parser = tick_rate)]
    pub tick_rate: f32,

    /// Skip the title screen and start playing immediately.
    #[arg(long)]
    pub no_title: bool,

    /// Write logs to this file (filter with RUST_LOG, default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
