use std::time::Duration;
use serde::{Deserialize, Serialize};
use common::{Result, SessionError};

/// Fixed playback policy applied when a session binds an engine.
///
/// The values are tuned for stability over startup latency and are not
/// exposed to callers; `SessionConfig::default()` is the policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Worker offloading and latency mode
    pub worker: WorkerConfig,

    /// Forward and backward buffer targets
    pub buffer: BufferConfig,

    /// Bandwidth estimation (ABR) tuning
    pub bandwidth: BandwidthConfig,

    /// Per resource class loading budgets
    pub loading: LoadingConfig,

    /// Automatic recovery ceilings
    pub recovery: RecoveryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Parse and demux on a worker instead of the playback thread
    pub enable_worker: bool,

    /// Chase the live edge aggressively
    pub low_latency_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Target forward buffer
    #[serde(with = "crate::serde_helpers::millis")]
    pub forward_buffer_length: Duration,

    /// Hard ceiling for the forward buffer
    #[serde(with = "crate::serde_helpers::millis")]
    pub max_buffer_length: Duration,

    /// Forward buffer ceiling in bytes
    pub max_buffer_size: u64,

    /// Largest gap the engine may jump over
    #[serde(with = "crate::serde_helpers::millis")]
    pub max_buffer_hole: Duration,

    /// Played media kept behind the playhead
    #[serde(with = "crate::serde_helpers::millis")]
    pub back_buffer_length: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandwidthConfig {
    /// Estimate used before the first sample, in bits per second
    pub initial_estimate_bps: u64,

    /// EWMA half-lives in seconds
    pub fast_half_life_live: f64,
    pub slow_half_life_live: f64,
    pub fast_half_life_vod: f64,
    pub slow_half_life_vod: f64,

    /// Fraction of the estimate usable for steady state and downswitch
    pub usage_factor: f64,

    /// Fraction of the estimate usable for upswitch
    pub upgrade_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadingConfig {
    pub fragment: LoadPolicy,
    pub manifest: LoadPolicy,
    pub level: LoadPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadPolicy {
    pub max_retry: u32,

    #[serde(with = "crate::serde_helpers::millis")]
    pub retry_delay: Duration,

    /// Ceiling for the backed-off retry delay
    #[serde(with = "crate::serde_helpers::millis")]
    pub max_retry_timeout: Duration,

    #[serde(with = "crate::serde_helpers::millis")]
    pub load_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Fatal network faults tolerated before the session fails
    pub max_network_retries: u32,

    /// Fatal media faults tolerated before the session fails
    pub max_media_retries: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            worker: WorkerConfig::default(),
            buffer: BufferConfig::default(),
            bandwidth: BandwidthConfig::default(),
            loading: LoadingConfig::default(),
            recovery: RecoveryConfig::default(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enable_worker: true,
            low_latency_mode: false,
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            forward_buffer_length: Duration::from_secs(30),
            max_buffer_length: Duration::from_secs(600),
            max_buffer_size: 60 * 1024 * 1024, // 60MB
            max_buffer_hole: Duration::from_millis(500),
            back_buffer_length: Duration::from_secs(90),
        }
    }
}

impl Default for BandwidthConfig {
    fn default() -> Self {
        Self {
            initial_estimate_bps: 500_000,
            fast_half_life_live: 3.0,
            slow_half_life_live: 9.0,
            fast_half_life_vod: 3.0,
            slow_half_life_vod: 9.0,
            usage_factor: 0.95,
            upgrade_factor: 0.7,
        }
    }
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self {
            fragment: LoadPolicy {
                max_retry: 6,
                retry_delay: Duration::from_secs(1),
                max_retry_timeout: Duration::from_secs(64),
                load_timeout: Duration::from_secs(20),
            },
            manifest: LoadPolicy {
                max_retry: 4,
                retry_delay: Duration::from_secs(1),
                max_retry_timeout: Duration::from_secs(64),
                load_timeout: Duration::from_secs(10),
            },
            level: LoadPolicy {
                max_retry: 4,
                retry_delay: Duration::from_secs(1),
                max_retry_timeout: Duration::from_secs(64),
                load_timeout: Duration::from_secs(10),
            },
        }
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_network_retries: 3,
            max_media_retries: 3,
        }
    }
}

impl SessionConfig {
    /// Validate policy invariants
    pub fn validate(&self) -> Result<()> {
        let bandwidth = &self.bandwidth;

        for (name, factor) in [
            ("usage_factor", bandwidth.usage_factor),
            ("upgrade_factor", bandwidth.upgrade_factor),
        ] {
            if !(factor > 0.0 && factor <= 1.0) {
                return Err(SessionError::InvalidConfig(format!(
                    "{} must be within (0, 1], got {}",
                    name, factor
                )));
            }
        }

        if bandwidth.upgrade_factor > bandwidth.usage_factor {
            return Err(SessionError::InvalidConfig(format!(
                "upgrade_factor ({}) must not exceed usage_factor ({})",
                bandwidth.upgrade_factor, bandwidth.usage_factor
            )));
        }

        for (name, fast, slow) in [
            ("live", bandwidth.fast_half_life_live, bandwidth.slow_half_life_live),
            ("vod", bandwidth.fast_half_life_vod, bandwidth.slow_half_life_vod),
        ] {
            if fast <= 0.0 || slow <= 0.0 {
                return Err(SessionError::InvalidConfig(format!(
                    "{} half-lives must be greater than 0",
                    name
                )));
            }
            if fast > slow {
                return Err(SessionError::InvalidConfig(format!(
                    "{} fast half-life ({}) must not exceed slow half-life ({})",
                    name, fast, slow
                )));
            }
        }

        if self.buffer.max_buffer_length < self.buffer.forward_buffer_length {
            return Err(SessionError::InvalidConfig(
                "max_buffer_length must be at least forward_buffer_length".to_string(),
            ));
        }

        if self.buffer.max_buffer_size == 0 {
            return Err(SessionError::InvalidConfig(
                "max_buffer_size must be greater than 0".to_string(),
            ));
        }

        for (name, policy) in [
            ("fragment", &self.loading.fragment),
            ("manifest", &self.loading.manifest),
            ("level", &self.loading.level),
        ] {
            if policy.load_timeout.is_zero() {
                return Err(SessionError::InvalidConfig(format!(
                    "{} load_timeout must be greater than 0",
                    name
                )));
            }
            if policy.max_retry_timeout < policy.retry_delay {
                return Err(SessionError::InvalidConfig(format!(
                    "{} max_retry_timeout must be at least retry_delay",
                    name
                )));
            }
        }

        Ok(())
    }
}
