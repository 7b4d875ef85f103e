use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use graphconfig::{parse_duration, AntialiasSetting, PowerSetting, TransitionMode};

#[derive(Parser, Debug)]
#[command(
    name = "gpugraph",
    author,
    version,
    about = "Animated function graphs evaluated on the GPU"
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Configuration file; defaults to `config.toml` in the config directory.
    #[arg(long, value_name = "FILE", env = "GPUGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Grid points per axis (10-1000).
    #[arg(long, value_name = "N")]
    pub resolution: Option<u32>,

    /// Function shown first (see `gpugraph functions`).
    #[arg(long, value_name = "NAME")]
    pub function: Option<String>,

    /// How the next function is picked: `cycle` or `random`.
    #[arg(long, value_name = "MODE", value_parser = parse_mode)]
    pub mode: Option<TransitionMode>,

    /// Time each function is shown before morphing (e.g. `2s`, `1500ms`, `0.5`).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub function_duration: Option<Duration>,

    /// Length of the morph between two functions.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub transition_duration: Option<Duration>,

    /// Seed for random transitions; omitted means a fresh seed per run.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// FPS cap (0 = uncapped).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias)]
    pub antialias: Option<AntialiasSetting>,

    /// Window size in physical pixels (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<SurfaceSize>,

    /// Present without waiting for vertical sync.
    #[arg(long)]
    pub no_vsync: bool,

    /// Adapter preference: `high` or `low`.
    #[arg(long, value_name = "POWER", value_parser = parse_power)]
    pub power: Option<PowerSetting>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved configuration as TOML and exit.
    PrintConfig,
    /// List the functions in the kernel library.
    Functions,
    /// Show where the configuration file is looked up.
    Where,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_mode(value: &str) -> Result<TransitionMode, String> {
    value.parse()
}

pub fn parse_power(value: &str) -> Result<PowerSetting, String> {
    value.parse()
}

pub fn parse_antialias(value: &str) -> Result<AntialiasSetting, String> {
    if value.trim().is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }
    value.parse()
}

pub fn parse_surface_size(spec: &str) -> Result<SurfaceSize, String> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WxH format, e.g. 1280x720".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in size specification '{trimmed}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in size specification '{trimmed}'"))?;

    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".to_string());
    }

    Ok(SurfaceSize { width, height })
}
