use std::sync::Arc;
use tokio::sync::mpsc;
use common::{EngineEvent, EventClass, Generation, Result, SubscriptionToken, TaggedEvent};
use crate::config::SessionConfig;
use crate::sink::MediaSink;

// ============================================================================
// Engine Runtime / Handle Traits
// ============================================================================

/// Factory for adaptive streaming engines
pub trait EngineRuntime: Send + Sync {
    /// Whether the runtime is usable in the current environment
    fn is_runtime_supported(&self) -> bool;

    /// Construct an engine with the session policy applied
    fn create_engine(&self, config: &SessionConfig) -> Result<Box<dyn EngineHandle>>;
}

/// One adaptive streaming engine instance
///
/// The engine does segment fetch, parse and demux on its own; the session
/// only drives its lifecycle and reacts to the events it emits.
pub trait EngineHandle: Send {
    fn load_source(&mut self, url: &str);

    fn attach(&mut self, sink: Arc<dyn MediaSink>);

    /// Release the engine, cancelling outstanding requests and timers.
    fn destroy(&mut self);

    /// Register an emitter for one event class
    fn subscribe(&mut self, class: EventClass, emitter: EventEmitter) -> SubscriptionToken;

    /// Resume loading after a network fault
    fn resume_load(&mut self);

    /// Reset the decode pipeline in place, keeping the manifest
    fn recover_media_pipeline(&mut self);
}

// ============================================================================
// Event Emitter
// ============================================================================

/// Generation-tagged sender handed to an engine on subscribe.
///
/// Events are queued for the session controller; an emitter never calls
/// into session state directly.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    generation: Generation,
    class: EventClass,
    tx: mpsc::UnboundedSender<TaggedEvent>,
}

impl EventEmitter {
    pub fn new(
        generation: Generation,
        class: EventClass,
        tx: mpsc::UnboundedSender<TaggedEvent>,
    ) -> Self {
        Self { generation, class, tx }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn class(&self) -> EventClass {
        self.class
    }

    /// Queue an event for the session.
    ///
    /// Returns `false` when the event does not belong to this emitter's class
    /// or the session is gone.
    pub fn emit(&self, event: EngineEvent) -> bool {
        if event.class() != self.class {
            return false;
        }

        self.tx
            .send(TaggedEvent {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}
