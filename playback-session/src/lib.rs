pub mod config;
pub mod serde_helpers;
pub mod sink;
pub mod engine;
pub mod capability;
pub mod binding;
pub mod recovery;
pub mod notifier;
pub mod router;
pub mod controller;
#[cfg(test)]
mod mock;

pub use config::SessionConfig;
pub use sink::{MediaSink, HLS_MIME_TYPE};
pub use engine::{EngineHandle, EngineRuntime, EventEmitter};
pub use binding::EngineBinding;
pub use recovery::{RecoveryCounters, RecoveryState};
pub use notifier::NoticeCallback;
pub use router::RouteOutcome;
pub use controller::{SessionController, SessionProps, SessionSnapshot, UpdateOutcome};
pub use common::{
    EngineEvent, EventClass, FaultCategory, FaultRecord, FaultSeverity, Generation, PlayRejection,
    PlaybackPath, QualityLevel, SessionError, SubscriptionToken, TaggedEvent,
};
