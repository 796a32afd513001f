use crate::types::*;
use serde::{Deserialize, Serialize};

/// 引擎事件类别
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventClass {
    FragmentLoaded,
    ManifestParsed,
    Error,
}

impl EventClass {
    pub const ALL: [EventClass; 3] = [
        EventClass::FragmentLoaded,
        EventClass::ManifestParsed,
        EventClass::Error,
    ];
}

/// 引擎生命周期事件
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A segment finished loading. `start` is its offset in seconds.
    FragmentLoaded { start: f64 },
    ManifestParsed { levels: Vec<QualityLevel> },
    Error(FaultRecord),
}

impl EngineEvent {
    pub fn class(&self) -> EventClass {
        match self {
            EngineEvent::FragmentLoaded { .. } => EventClass::FragmentLoaded,
            EngineEvent::ManifestParsed { .. } => EventClass::ManifestParsed,
            EngineEvent::Error(_) => EventClass::Error,
        }
    }
}

/// 带代号的引擎事件
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedEvent {
    pub generation: Generation,
    pub event: EngineEvent,
}

/// 订阅凭证
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(pub u64);
