use std::path::Path;
use std::time::Duration;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use common::{EngineEvent, FaultCategory, FaultRecord, QualityLevel};
use playback_session::serde_helpers;

pub const SOURCE_ENV: &str = "SESSION_SIM_SOURCE";
pub const AUTOPLAY_ENV: &str = "SESSION_SIM_AUTOPLAY";

/// 模拟器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub source: String,
    pub autoplay: bool,
    pub runtime: RuntimeMode,
    pub sink: SinkConfig,
    /// Quiet period after which a session without a running scenario is done
    #[serde(with = "serde_helpers::millis")]
    pub idle_timeout: Duration,
    pub scenario: Vec<ScenarioStep>,
}

/// Availability of the simulated adaptive engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    /// Engine runtime present and usable
    Available,
    /// Engine runtime present but reports itself unsupported
    Unusable,
    /// No engine runtime at all
    Absent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub native_hls: bool,
    pub autoplay: AutoplayPolicy,
}

/// How the simulated sink answers play requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum AutoplayPolicy {
    Allow,
    Block { cause: String },
}

/// One scripted engine event, emitted `after` the previous step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioStep {
    #[serde(rename = "after_ms", with = "serde_helpers::millis")]
    pub after: Duration,
    pub event: EngineEvent,
}

impl ScenarioStep {
    pub fn new(after_ms: u64, event: EngineEvent) -> Self {
        Self {
            after: Duration::from_millis(after_ms),
            event,
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            source: "https://test-streams.example.com/x36xhzz/x36xhzz.m3u8".to_string(),
            autoplay: true,
            runtime: RuntimeMode::Available,
            sink: SinkConfig::default(),
            idle_timeout: Duration::from_millis(500),
            scenario: default_scenario(),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            native_hls: false,
            autoplay: AutoplayPolicy::Allow,
        }
    }
}

/// 默认场景：清单解析、首个分片、两次网络故障、一次媒体故障
fn default_scenario() -> Vec<ScenarioStep> {
    vec![
        ScenarioStep::new(
            50,
            EngineEvent::ManifestParsed {
                levels: vec![
                    QualityLevel::new(800_000, "avc1.4d401e,mp4a.40.2"),
                    QualityLevel::new(2_500_000, "avc1.64001f,mp4a.40.2"),
                    QualityLevel::new(6_000_000, "hvc1.1.6.L93.B0,mp4a.40.2"),
                ],
            },
        ),
        ScenarioStep::new(100, EngineEvent::FragmentLoaded { start: 0.0 }),
        ScenarioStep::new(
            200,
            EngineEvent::Error(FaultRecord::fatal(FaultCategory::Network, "fragLoadTimeOut")),
        ),
        ScenarioStep::new(100, EngineEvent::FragmentLoaded { start: 6.006 }),
        ScenarioStep::new(
            200,
            EngineEvent::Error(FaultRecord::fatal(FaultCategory::Network, "fragLoadError")),
        ),
        ScenarioStep::new(
            200,
            EngineEvent::Error(FaultRecord::fatal(FaultCategory::Media, "bufferAppendError")),
        ),
        ScenarioStep::new(100, EngineEvent::FragmentLoaded { start: 12.012 }),
    ]
}

impl SimulatorConfig {
    /// Load from a toml file, or start from defaults when no file is given.
    /// Environment overrides are applied afterwards.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read config file {:?}", path))?;
                toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file {:?}", path))?
            }
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SESSION_SIM_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(source) = lookup(SOURCE_ENV) {
            self.source = source;
        }

        if let Some(autoplay) = lookup(AUTOPLAY_ENV) {
            self.autoplay = match autoplay.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => bail!("Invalid {} value: {}", AUTOPLAY_ENV, other),
            };
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.idle_timeout.is_zero() {
            bail!("idle_timeout must be greater than 0");
        }

        if let AutoplayPolicy::Block { cause } = &self.sink.autoplay {
            if cause.trim().is_empty() {
                bail!("Blocked autoplay policy needs a cause");
            }
        }

        Ok(())
    }
}
