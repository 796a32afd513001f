use serde::{Deserialize, Serialize};
use std::fmt;

/// 引擎实例代号
///
/// Every bind of a session gets a fresh, strictly increasing generation.
/// Anything produced under an older generation is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(pub u64);

impl Generation {
    pub const FIRST: Generation = Generation(1);

    pub fn next(self) -> Generation {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// 播放路径
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PlaybackPath {
    /// The sink plays the format itself.
    Native,
    /// An adaptive streaming engine feeds the sink.
    EngineManaged,
    Unsupported,
}

impl fmt::Display for PlaybackPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackPath::Native => "native",
            PlaybackPath::EngineManaged => "engine-managed",
            PlaybackPath::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// 故障严重程度
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FaultSeverity {
    Fatal,
    NonFatal,
}

/// 故障类别
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FaultCategory {
    Network,
    Media,
    Other,
}

impl fmt::Display for FaultCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FaultCategory::Network => "network",
            FaultCategory::Media => "media",
            FaultCategory::Other => "other",
        };
        f.write_str(name)
    }
}

/// 引擎上报的故障
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FaultRecord {
    pub severity: FaultSeverity,
    pub category: FaultCategory,
    /// Engine detail code, e.g. `fragLoadError`.
    pub detail: String,
}

impl FaultRecord {
    pub fn fatal(category: FaultCategory, detail: impl Into<String>) -> Self {
        Self {
            severity: FaultSeverity::Fatal,
            category,
            detail: detail.into(),
        }
    }

    pub fn non_fatal(category: FaultCategory, detail: impl Into<String>) -> Self {
        Self {
            severity: FaultSeverity::NonFatal,
            category,
            detail: detail.into(),
        }
    }
}

/// 码率档位
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QualityLevel {
    pub bitrate: u64,
    /// RFC 6381 codec string, e.g. `avc1.64001f,mp4a.40.2`.
    pub codec: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl QualityLevel {
    pub fn new(bitrate: u64, codec: impl Into<String>) -> Self {
        Self {
            bitrate,
            codec: codec.into(),
            width: None,
            height: None,
        }
    }
}
