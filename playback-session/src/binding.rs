use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use common::{EventClass, Generation, Result, SessionError, SubscriptionToken, TaggedEvent};
use crate::config::SessionConfig;
use crate::engine::{EngineHandle, EngineRuntime, EventEmitter};
use crate::sink::MediaSink;

/// Owns the single engine instance of a session.
pub struct EngineBinding {
    engine: Option<BoundEngine>,
}

struct BoundEngine {
    handle: Box<dyn EngineHandle>,
    generation: Generation,
    /// One token per event class, released together with the engine
    subscriptions: Vec<SubscriptionToken>,
}

impl EngineBinding {
    pub fn new() -> Self {
        Self { engine: None }
    }

    /// Create an engine, subscribe it, load `source` and attach `sink`.
    ///
    /// Fails with `EngineAlreadyBound` when the previous engine has not been
    /// torn down.
    pub fn start(
        &mut self,
        generation: Generation,
        runtime: &dyn EngineRuntime,
        source: &str,
        sink: Arc<dyn MediaSink>,
        config: &SessionConfig,
        events: &mpsc::UnboundedSender<TaggedEvent>,
    ) -> Result<()> {
        if self.engine.is_some() {
            return Err(SessionError::EngineAlreadyBound);
        }

        let mut handle = runtime.create_engine(config)?;

        let subscriptions = EventClass::ALL
            .iter()
            .map(|class| handle.subscribe(*class, EventEmitter::new(generation, *class, events.clone())))
            .collect();

        handle.load_source(source);
        handle.attach(sink);

        info!(%generation, source, "Streaming engine bound");
        self.engine = Some(BoundEngine {
            handle,
            generation,
            subscriptions,
        });
        Ok(())
    }

    /// Destroy the bound engine. Returns `false` when nothing was bound.
    pub fn teardown(&mut self) -> bool {
        match self.engine.take() {
            Some(mut engine) => {
                engine.handle.destroy();
                info!(
                    generation = %engine.generation,
                    subscriptions = engine.subscriptions.len(),
                    "Streaming engine released"
                );
                true
            }
            None => false,
        }
    }

    pub fn request_resume(&mut self) {
        match self.engine.as_mut() {
            Some(engine) => engine.handle.resume_load(),
            None => debug!("Resume requested with no engine bound"),
        }
    }

    pub fn request_media_recovery(&mut self) {
        match self.engine.as_mut() {
            Some(engine) => engine.handle.recover_media_pipeline(),
            None => debug!("Media recovery requested with no engine bound"),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.engine.is_some()
    }

    pub fn generation(&self) -> Option<Generation> {
        self.engine.as_ref().map(|engine| engine.generation)
    }
}

impl Default for EngineBinding {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EngineBinding {
    fn drop(&mut self) {
        self.teardown();
    }
}
