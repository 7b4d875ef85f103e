use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Smallest grid edge the graph accepts.
pub const MIN_RESOLUTION: u32 = 10;
/// Largest grid edge; the position buffer is sized for this once.
pub const MAX_RESOLUTION: u32 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// How the next function is picked once a steady period ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionMode {
    #[default]
    Cycle,
    Random,
}

impl TransitionMode {
    pub fn toggled(self) -> Self {
        match self {
            TransitionMode::Cycle => TransitionMode::Random,
            TransitionMode::Random => TransitionMode::Cycle,
        }
    }
}

impl fmt::Display for TransitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionMode::Cycle => f.write_str("cycle"),
            TransitionMode::Random => f.write_str("random"),
        }
    }
}

impl FromStr for TransitionMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cycle" | "next" | "sequential" => Ok(TransitionMode::Cycle),
            "random" | "shuffle" => Ok(TransitionMode::Random),
            other => Err(format!(
                "unknown transition mode '{other}'; expected cycle or random"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSetting {
    #[default]
    High,
    Low,
}

impl FromStr for PowerSetting {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" | "performance" => Ok(PowerSetting::High),
            "low" | "battery" => Ok(PowerSetting::Low),
            other => Err(format!("unknown power preference '{other}'; expected high or low")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AntialiasSetting {
    #[default]
    Auto,
    Off,
    Samples2,
    Samples4,
    Samples8,
    Samples16,
}

impl AntialiasSetting {
    pub fn from_samples(samples: u32) -> Option<Self> {
        match samples {
            0 | 1 => Some(Self::Off),
            2 => Some(Self::Samples2),
            4 => Some(Self::Samples4),
            8 => Some(Self::Samples8),
            16 => Some(Self::Samples16),
            _ => None,
        }
    }

    /// Explicit MSAA sample count, or `None` for `Auto`.
    pub fn samples(self) -> Option<u32> {
        match self {
            Self::Auto => None,
            Self::Off => Some(1),
            Self::Samples2 => Some(2),
            Self::Samples4 => Some(4),
            Self::Samples8 => Some(8),
            Self::Samples16 => Some(16),
        }
    }
}

impl fmt::Display for AntialiasSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.samples() {
            None => f.write_str("auto"),
            Some(1) => f.write_str("off"),
            Some(samples) => write!(f, "{samples}"),
        }
    }
}

impl FromStr for AntialiasSetting {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        parse_antialias(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GraphConfig {
    pub version: u32,
    #[serde(default)]
    pub graph: GraphSettings,
    #[serde(default)]
    pub window: WindowSettings,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            version: 1,
            graph: GraphSettings::default(),
            window: WindowSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GraphSettings {
    pub resolution: u32,
    pub function: String,
    pub transition_mode: TransitionMode,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub function_duration: Duration,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub transition_duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            resolution: MIN_RESOLUTION,
            function: "wave".into(),
            transition_mode: TransitionMode::Cycle,
            function_duration: default_duration(),
            transition_duration: default_duration(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f32>,
    #[serde(
        deserialize_with = "deserialize_antialias",
        serialize_with = "serialize_antialias"
    )]
    pub antialias: AntialiasSetting,
    pub vsync: bool,
    pub power: PowerSetting,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: None,
            antialias: AntialiasSetting::Auto,
            vsync: true,
            power: PowerSetting::High,
        }
    }
}

impl WindowSettings {
    /// Frame cap in frames per second; zero means uncapped.
    pub fn target_fps(&self) -> Option<f32> {
        self.fps.filter(|fps| *fps > 0.0)
    }
}

fn default_duration() -> Duration {
    Duration::from_secs(1)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            parse_duration(v).map_err(E::custom)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.is_zero() {
        return serializer.serialize_str("0s");
    }
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

/// Parses `"1.5"`, `"250ms"` or `"2m 3s"` into a duration.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let trimmed = raw.trim();
    if let Ok(seconds) = trimmed.parse::<f64>() {
        if !seconds.is_finite() || seconds.is_sign_negative() {
            return Err(format!("invalid duration '{raw}': must be non-negative"));
        }
        return Ok(Duration::from_secs_f64(seconds));
    }
    humantime::parse_duration(trimmed).map_err(|err| format!("invalid duration '{raw}': {err}"))
}

fn deserialize_antialias<'de, D>(deserializer: D) -> Result<AntialiasSetting, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Num(i64),
    }

    match Helper::deserialize(deserializer)? {
        Helper::Str(raw) => parse_antialias(&raw).map_err(de::Error::custom),
        Helper::Num(value) => {
            if value < 0 {
                return Err(de::Error::custom("antialias value must be non-negative"));
            }
            parse_antialias(&value.to_string()).map_err(de::Error::custom)
        }
    }
}

fn serialize_antialias<S>(value: &AntialiasSetting, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}

fn parse_antialias(raw: &str) -> Result<AntialiasSetting, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(AntialiasSetting::Auto),
        "off" | "none" | "disable" | "disabled" | "0" | "1" => Ok(AntialiasSetting::Off),
        "2" => Ok(AntialiasSetting::Samples2),
        "4" => Ok(AntialiasSetting::Samples4),
        "8" => Ok(AntialiasSetting::Samples8),
        "16" => Ok(AntialiasSetting::Samples16),
        other => Err(format!("invalid antialias setting '{other}'")),
    }
}

impl GraphConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: GraphConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        let graph = &self.graph;
        if !(MIN_RESOLUTION..=MAX_RESOLUTION).contains(&graph.resolution) {
            return Err(ConfigError::Invalid(format!(
                "graph.resolution {} is outside [{MIN_RESOLUTION}, {MAX_RESOLUTION}]",
                graph.resolution
            )));
        }

        if graph.function.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "graph.function must name a function".into(),
            ));
        }

        let window = &self.window;
        if window.width == 0 || window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size {}x{} must be non-zero",
                window.width, window.height
            )));
        }

        if let Some(fps) = window.fps {
            if !fps.is_finite() || fps < 0.0 {
                return Err(ConfigError::Invalid("window.fps must be >= 0".into()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1

[graph]
resolution = 200
function = "ripple"
transition_mode = "random"
function_duration = "2.5s"
transition_duration = 0.5
seed = 42

[window]
width = 800
height = 600
fps = 30
antialias = 4
vsync = false
power = "low"
"#;

    #[test]
    fn parses_sample_config() {
        let config = GraphConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.graph.resolution, 200);
        assert_eq!(config.graph.function, "ripple");
        assert_eq!(config.graph.transition_mode, TransitionMode::Random);
        assert_eq!(config.graph.function_duration, Duration::from_millis(2500));
        assert_eq!(config.graph.transition_duration, Duration::from_millis(500));
        assert_eq!(config.graph.seed, Some(42));
        assert_eq!(config.window.antialias, AntialiasSetting::Samples4);
        assert_eq!(config.window.target_fps(), Some(30.0));
        assert_eq!(config.window.power, PowerSetting::Low);
        assert!(!config.window.vsync);
    }

    #[test]
    fn empty_sections_fall_back_to_defaults() {
        let config = GraphConfig::from_toml_str("version = 1\n").unwrap();
        assert_eq!(config, GraphConfig::default());
        assert_eq!(config.graph.resolution, MIN_RESOLUTION);
        assert_eq!(config.graph.transition_mode, TransitionMode::Cycle);
        assert_eq!(config.window.target_fps(), None);
    }

    #[test]
    fn zero_durations_are_accepted() {
        let config = GraphConfig::from_toml_str(
            r#"
version = 1

[graph]
function_duration = 0
transition_duration = "0s"
"#,
        )
        .unwrap();
        assert!(config.graph.function_duration.is_zero());
        assert!(config.graph.transition_duration.is_zero());
    }

    #[test]
    fn rejects_resolution_outside_range() {
        for resolution in [0, MIN_RESOLUTION - 1, MAX_RESOLUTION + 1] {
            let doc = format!("version = 1\n[graph]\nresolution = {resolution}\n");
            let err = GraphConfig::from_toml_str(&doc).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "resolution {resolution}");
        }
    }

    #[test]
    fn rejects_negative_duration() {
        let err = GraphConfig::from_toml_str(
            r#"
version = 1

[graph]
function_duration = -1
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_unknown_version() {
        let err = GraphConfig::from_toml_str("version = 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_blank_function_name() {
        for name in ["", "   "] {
            let doc = format!("version = 1\n[graph]\nfunction = \"{name}\"\n");
            let err = GraphConfig::from_toml_str(&doc).unwrap_err();
            assert!(
                matches!(&err, ConfigError::Invalid(message) if message.contains("graph.function")),
                "{name:?}: {err}"
            );
        }
    }

    #[test]
    fn rejects_zero_window_dimensions() {
        for (width, height) in [(0, 600), (800, 0)] {
            let doc = format!("version = 1\n[window]\nwidth = {width}\nheight = {height}\n");
            let err = GraphConfig::from_toml_str(&doc).unwrap_err();
            assert!(
                matches!(&err, ConfigError::Invalid(message) if message.contains("window size")),
                "{width}x{height}: {err}"
            );
        }
    }

    #[test]
    fn rejects_negative_or_non_finite_fps() {
        let err = GraphConfig::from_toml_str("version = 1\n[window]\nfps = -5.0\n").unwrap_err();
        assert!(matches!(&err, ConfigError::Invalid(message) if message.contains("fps")));

        for fps in [f32::NAN, f32::INFINITY] {
            let mut config = GraphConfig::default();
            config.window.fps = Some(fps);
            let err = config.validate().unwrap_err();
            assert!(matches!(&err, ConfigError::Invalid(message) if message.contains("fps")), "{fps}");
        }

        let mut uncapped = GraphConfig::default();
        uncapped.window.fps = Some(0.0);
        assert!(uncapped.validate().is_ok());
    }

    #[test]
    fn serialized_config_parses_back() {
        let config = GraphConfig::from_toml_str(SAMPLE).unwrap();
        let rendered = config.to_toml_string().unwrap();
        let reparsed = GraphConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn transition_mode_parses_and_toggles() {
        assert_eq!("Cycle".parse::<TransitionMode>(), Ok(TransitionMode::Cycle));
        assert_eq!("random".parse::<TransitionMode>(), Ok(TransitionMode::Random));
        assert!("sideways".parse::<TransitionMode>().is_err());
        assert_eq!(TransitionMode::Cycle.toggled(), TransitionMode::Random);
    }
}
