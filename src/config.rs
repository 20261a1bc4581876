use serde::{Deserialize, Deserializer};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::metrics::{MetricSet, ReferencePoint};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid reference coordinates for {0}")]
    InvalidReference(String),
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("{0} must be a whole number of milliseconds")]
    SubMillisecond(&'static str),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default = "default_reference")]
    pub reference: Option<ReferenceConfig>,
    #[serde(default)]
    pub object_references: HashMap<String, ReferenceConfig>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub simulator: Option<SimulatorConfig>,
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_window", deserialize_with = "deserialize_duration")]
    pub window: Duration,
    #[serde(default = "default_lateness", deserialize_with = "deserialize_duration")]
    pub allowed_lateness: Duration,
    #[serde(default = "default_object_id")]
    pub default_object_id: String,
    #[serde(default)]
    pub metrics: MetricSet,
    #[serde(default = "default_closed_retention")]
    pub closed_window_retention: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            allowed_lateness: default_lateness(),
            default_object_id: default_object_id(),
            metrics: MetricSet::default(),
            closed_window_retention: default_closed_retention(),
        }
    }
}

fn default_window() -> Duration {
    Duration::from_secs(60)
}

fn default_lateness() -> Duration {
    Duration::from_secs(10)
}

fn default_object_id() -> String {
    "iss".to_string()
}

fn default_closed_retention() -> usize {
    64
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceConfig {
    pub name: Option<String>,
    pub coordinates: String,
}

fn default_reference() -> Option<ReferenceConfig> {
    Some(ReferenceConfig {
        name: Some("Paris".to_string()),
        coordinates: "48.8566,2.3522".to_string(),
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub folder: Option<PathBuf>,
    #[serde(default = "default_console")]
    pub console: bool,
    pub checkpoint: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            folder: None,
            console: default_console(),
            checkpoint: None,
        }
    }
}

fn default_console() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_history")]
    pub window_history: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            window_history: default_history(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_history() -> usize {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorConfig {
    pub tle: PathBuf,
    #[serde(default = "default_interval", deserialize_with = "deserialize_duration")]
    pub interval: Duration,
    pub object_id: Option<String>,
}

fn default_interval() -> Duration {
    Duration::from_secs(5)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKey {
    pub key: String,
    pub name: String,
    pub permissions: HashSet<Permission>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    IngestSamples,
    FlushWindows,
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            reference: default_reference(),
            object_references: HashMap::new(),
            output: OutputConfig::default(),
            web: WebConfig::default(),
            simulator: None,
            api_keys: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.window.is_zero() {
            return Err(ConfigError::ZeroDuration("pipeline.window"));
        }
        if self.pipeline.window.subsec_nanos() % 1_000_000 != 0 {
            return Err(ConfigError::SubMillisecond("pipeline.window"));
        }
        if let Some(sim) = &self.simulator {
            if sim.interval.is_zero() {
                return Err(ConfigError::ZeroDuration("simulator.interval"));
            }
        }
        self.reference_point()?;
        self.object_reference_points()?;
        Ok(())
    }

    pub fn reference_point(&self) -> Result<Option<ReferencePoint>, ConfigError> {
        self.reference
            .as_ref()
            .map(|r| r.to_point("reference"))
            .transpose()
    }

    pub fn object_reference_points(&self) -> Result<HashMap<String, ReferencePoint>, ConfigError> {
        self.object_references
            .iter()
            .map(|(id, r)| Ok((id.clone(), r.to_point(id)?)))
            .collect()
    }

    pub fn find_api_key(&self, key: &str) -> Option<&ApiKey> {
        self.api_keys.iter().find(|k| k.key == key)
    }
}

impl ReferenceConfig {
    fn to_point(&self, label: &str) -> Result<ReferencePoint, ConfigError> {
        ReferencePoint::from_coordinates(self.name.clone(), &self.coordinates)
            .ok_or_else(|| ConfigError::InvalidReference(label.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metric;

    #[test]
    fn empty_document_uses_feed_defaults() {
        let config = Config::from_str("{}").unwrap();

        assert_eq!(config.pipeline.window, Duration::from_secs(60));
        assert_eq!(config.pipeline.allowed_lateness, Duration::from_secs(10));
        assert_eq!(config.pipeline.default_object_id, "iss");
        assert_eq!(config.pipeline.metrics, MetricSet::all());
        assert_eq!(config.reference_point().unwrap(), Some(ReferencePoint::paris()));
        assert!(config.output.console);
        assert_eq!(config.web.bind, "0.0.0.0:8080");
    }

    #[test]
    fn full_document() {
        let yaml = r#"
pipeline:
  window: 30s
  allowed_lateness: 2m
  default_object_id: hubble
  metrics: [orbit_phase]
  closed_window_retention: 8
reference:
  name: Origin
  coordinates: "0,0"
object_references:
  tiangong:
    coordinates: "10.5, -20.25"
output:
  folder: /tmp/out
  console: false
  checkpoint: /tmp/out/checkpoint.yaml
simulator:
  tle: ./iss.tle
  interval: 1s
api_keys:
  - key: secret
    name: producer
    permissions: [ingest_samples]
"#;
        let config = Config::from_str(yaml).unwrap();

        assert_eq!(config.pipeline.window, Duration::from_secs(30));
        assert_eq!(config.pipeline.allowed_lateness, Duration::from_secs(120));
        assert_eq!(config.pipeline.default_object_id, "hubble");
        assert!(config.pipeline.metrics.contains(Metric::OrbitPhase));
        assert!(!config.pipeline.metrics.contains(Metric::DistanceToReference));
        assert_eq!(config.pipeline.closed_window_retention, 8);

        let reference = config.reference_point().unwrap().unwrap();
        assert_eq!(reference.name.as_deref(), Some("Origin"));
        let tiangong = &config.object_reference_points().unwrap()["tiangong"];
        assert_eq!(tiangong.latitude_deg, 10.5);
        assert_eq!(tiangong.longitude_deg, -20.25);

        assert!(!config.output.console);
        assert_eq!(config.simulator.as_ref().unwrap().interval, Duration::from_secs(1));
        let key = config.find_api_key("secret").unwrap();
        assert!(key.permissions.contains(&Permission::IngestSamples));
        assert!(config.find_api_key("nope").is_none());
    }

    #[test]
    fn example_config_is_valid() {
        let config = Config::from_str(include_str!("../config.example.yaml")).unwrap();
        assert_eq!(config.api_keys.len(), 2);
        assert!(config.object_reference_points().unwrap().contains_key("hubble"));
        let operator = config.find_api_key("change-me-too").unwrap();
        assert!(operator.permissions.contains(&Permission::FlushWindows));
    }

    #[test]
    fn null_reference_disables_distance() {
        let config = Config::from_str("reference: null").unwrap();
        assert_eq!(config.reference_point().unwrap(), None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            Config::from_str("pipeline: { window: 0s }"),
            Err(ConfigError::ZeroDuration(_))
        ));
        assert!(matches!(
            Config::from_str("reference: { coordinates: \"200,0\" }"),
            Err(ConfigError::InvalidReference(_))
        ));
        assert!(matches!(
            Config::from_str("pipeline: { window: 1500us }"),
            Err(ConfigError::SubMillisecond(_))
        ));
        assert!(Config::from_str("pipeline: { window: 1500ms }").is_ok());
        assert!(matches!(
            Config::from_str("pipeline: { window: soon }"),
            Err(ConfigError::Yaml(_))
        ));
    }
}
