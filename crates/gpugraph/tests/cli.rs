use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use graphconfig::{GraphConfig, TransitionMode};
use tempfile::TempDir;

fn gpugraph(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gpugraph"))
        .env("GPUGRAPH_CONFIG_DIR", config_dir)
        .env_remove("GPUGRAPH_CONFIG")
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run gpugraph")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn print_config_without_a_file_uses_defaults() {
    let root = TempDir::new().unwrap();
    let output = gpugraph(root.path(), &["print-config"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let config = GraphConfig::from_toml_str(&stdout(&output)).unwrap();
    assert_eq!(config, GraphConfig::default());
}

#[test]
fn command_line_overrides_the_config_file() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("config.toml"),
        r#"
version = 1

[graph]
resolution = 120
function = "sphere"
function_duration = "3s"

[window]
width = 800
height = 600
"#,
    )
    .unwrap();

    let output = gpugraph(
        root.path(),
        &["--resolution", "400", "--mode", "random", "print-config"],
    );
    assert!(output.status.success(), "{}", stderr(&output));

    let config = GraphConfig::from_toml_str(&stdout(&output)).unwrap();
    assert_eq!(config.graph.resolution, 400);
    assert_eq!(config.graph.function, "sphere");
    assert_eq!(config.graph.transition_mode, TransitionMode::Random);
    assert_eq!(config.graph.function_duration.as_secs(), 3);
    assert_eq!((config.window.width, config.window.height), (800, 600));
}

#[test]
fn functions_lists_the_kernel_library() {
    let root = TempDir::new().unwrap();
    let output = gpugraph(root.path(), &["functions"]);
    assert!(output.status.success());
    let names: Vec<String> = stdout(&output).lines().map(str::to_owned).collect();
    assert_eq!(names, ["wave", "multi_wave", "ripple", "sphere", "torus"]);
}

#[test]
fn out_of_range_resolution_is_rejected() {
    let root = TempDir::new().unwrap();
    let output = gpugraph(root.path(), &["--resolution", "5", "print-config"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("resolution"));
}

#[test]
fn unknown_function_is_rejected() {
    let root = TempDir::new().unwrap();
    let output = gpugraph(root.path(), &["--function", "spiral", "print-config"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("spiral"));
}

#[test]
fn where_reports_the_config_location() {
    let root = TempDir::new().unwrap();
    let output = gpugraph(root.path(), &["where"]);
    assert!(output.status.success());
    let line = stdout(&output);
    assert!(line.contains("config.toml"));
    assert!(line.contains("defaults in use"));
}
