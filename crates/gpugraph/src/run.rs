use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use graphconfig::GraphConfig;
use renderer::{function_names, Renderer, RendererConfig};
use scheduler::FunctionRegistry;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::paths::AppPaths;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run(args: RunArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    info!(
        function = %config.graph.function,
        resolution = config.graph.resolution,
        mode = %config.graph.transition_mode,
        "starting gpugraph"
    );
    Renderer::new(RendererConfig::from_graph_config(&config)).run()
}

pub fn print_config(args: &RunArgs) -> Result<()> {
    let config = resolve_config(args)?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}

pub fn list_functions() {
    for name in function_names() {
        println!("{name}");
    }
}

pub fn print_where(args: &RunArgs) -> Result<()> {
    let (path, explicit) = config_path(args)?;
    let state = match (path.exists(), explicit) {
        (true, _) => "present",
        (false, true) => "missing",
        (false, false) => "absent; defaults in use",
    };
    println!("{} ({state})", path.display());
    Ok(())
}

/// Loads the config file, applies command-line overrides and validates the
/// result, including the initial function name.
pub fn resolve_config(args: &RunArgs) -> Result<GraphConfig> {
    let mut config = load_config(args)?;
    apply_overrides(&mut config, args);
    config.validate()?;

    let registry = FunctionRegistry::new(function_names())?;
    registry.lookup(&config.graph.function).with_context(|| {
        format!(
            "available functions: {}",
            registry.names().collect::<Vec<_>>().join(", ")
        )
    })?;
    Ok(config)
}

fn config_path(args: &RunArgs) -> Result<(PathBuf, bool)> {
    match &args.config {
        Some(path) => Ok((path.clone(), true)),
        None => Ok((AppPaths::discover()?.config_file(), false)),
    }
}

fn load_config(args: &RunArgs) -> Result<GraphConfig> {
    let (path, explicit) = config_path(args)?;
    if !explicit && !path.exists() {
        debug!(path = %path.display(), "no config file; using defaults");
        return Ok(GraphConfig::default());
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config = GraphConfig::from_toml_str(&raw)
        .with_context(|| format!("failed to load config file {}", path.display()))?;
    debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

fn apply_overrides(config: &mut GraphConfig, args: &RunArgs) {
    let graph = &mut config.graph;
    if let Some(resolution) = args.resolution {
        graph.resolution = resolution;
    }
    if let Some(function) = &args.function {
        graph.function = function.clone();
    }
    if let Some(mode) = args.mode {
        graph.transition_mode = mode;
    }
    if let Some(duration) = args.function_duration {
        graph.function_duration = duration;
    }
    if let Some(duration) = args.transition_duration {
        graph.transition_duration = duration;
    }
    if args.seed.is_some() {
        graph.seed = args.seed;
    }

    let window = &mut config.window;
    if let Some(fps) = args.fps {
        window.fps = Some(fps);
    }
    if let Some(antialias) = args.antialias {
        window.antialias = antialias;
    }
    if let Some(size) = args.size {
        window.width = size.width;
        window.height = size.height;
    }
    if args.no_vsync {
        window.vsync = false;
    }
    if let Some(power) = args.power {
        window.power = power;
    }
}
