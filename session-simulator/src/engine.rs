// 模拟自适应流引擎
//
// Plays a scripted list of engine events instead of fetching segments.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use common::{EventClass, SessionError, SubscriptionToken};
use playback_session::{EngineHandle, EngineRuntime, EventEmitter, MediaSink, SessionConfig};
use crate::config::{RuntimeMode, ScenarioStep};

/// Counters shared by every engine the runtime creates
#[derive(Debug, Default)]
pub struct EngineStats {
    created: AtomicUsize,
    destroyed: AtomicUsize,
    resumes: AtomicUsize,
    media_recoveries: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineReport {
    pub created: usize,
    pub destroyed: usize,
    pub resumes: usize,
    pub media_recoveries: usize,
}

impl EngineStats {
    pub fn report(&self) -> EngineReport {
        EngineReport {
            created: self.created.load(Ordering::SeqCst),
            destroyed: self.destroyed.load(Ordering::SeqCst),
            resumes: self.resumes.load(Ordering::SeqCst),
            media_recoveries: self.media_recoveries.load(Ordering::SeqCst),
        }
    }
}

// ============================================================================
// Simulated Runtime
// ============================================================================

pub struct SimulatedRuntime {
    mode: RuntimeMode,
    scenario: Arc<Vec<ScenarioStep>>,
    stats: Arc<EngineStats>,
    finished: CancellationToken,
}

impl SimulatedRuntime {
    pub fn new(mode: RuntimeMode, scenario: Vec<ScenarioStep>) -> Self {
        Self {
            mode,
            scenario: Arc::new(scenario),
            stats: Arc::new(EngineStats::default()),
            finished: CancellationToken::new(),
        }
    }

    pub fn stats(&self) -> Arc<EngineStats> {
        self.stats.clone()
    }

    /// Cancelled once a scenario task has stopped, whether it ran to the
    /// end or its engine was destroyed.
    pub fn finished(&self) -> CancellationToken {
        self.finished.clone()
    }
}

impl EngineRuntime for SimulatedRuntime {
    fn is_runtime_supported(&self) -> bool {
        self.mode == RuntimeMode::Available
    }

    fn create_engine(&self, config: &SessionConfig) -> Result<Box<dyn EngineHandle>, SessionError> {
        if self.mode != RuntimeMode::Available {
            return Err(SessionError::EngineCreation(format!(
                "runtime is {:?}",
                self.mode
            )));
        }

        let index = self.stats.created.fetch_add(1, Ordering::SeqCst);
        info!(
            "🔧 Creating simulated engine #{} (forward buffer {:?}, max buffer {:?}, fragment retries {})",
            index,
            config.buffer.forward_buffer_length,
            config.buffer.max_buffer_length,
            config.loading.fragment.max_retry
        );

        Ok(Box::new(SimulatedEngine {
            index,
            scenario: self.scenario.clone(),
            emitters: Vec::new(),
            source: None,
            cancel: CancellationToken::new(),
            stats: self.stats.clone(),
            finished: self.finished.clone(),
        }))
    }
}

// ============================================================================
// Simulated Engine
// ============================================================================

struct SimulatedEngine {
    index: usize,
    scenario: Arc<Vec<ScenarioStep>>,
    emitters: Vec<EventEmitter>,
    source: Option<String>,
    cancel: CancellationToken,
    stats: Arc<EngineStats>,
    finished: CancellationToken,
}

impl EngineHandle for SimulatedEngine {
    fn load_source(&mut self, url: &str) {
        debug!(engine = self.index, "Loading source {}", url);
        self.source = Some(url.to_string());
    }

    fn attach(&mut self, _sink: Arc<dyn MediaSink>) {
        if self.source.is_none() {
            warn!(engine = self.index, "Attached without a source, scenario not started");
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(engine = self.index, "No tokio runtime, scenario not started");
            return;
        };

        handle.spawn(play_scenario(
            self.index,
            self.scenario.clone(),
            self.emitters.clone(),
            self.cancel.clone(),
            self.finished.clone(),
        ));
    }

    fn destroy(&mut self) {
        info!(engine = self.index, "🗑️  Destroying simulated engine");
        self.cancel.cancel();
        self.emitters.clear();
        self.stats.destroyed.fetch_add(1, Ordering::SeqCst);
    }

    fn subscribe(&mut self, class: EventClass, emitter: EventEmitter) -> SubscriptionToken {
        debug!(engine = self.index, ?class, generation = %emitter.generation(), "Subscribed");
        self.emitters.push(emitter);
        SubscriptionToken(self.emitters.len() as u64)
    }

    fn resume_load(&mut self) {
        info!(engine = self.index, "🔄 Resuming load after network fault");
        self.stats.resumes.fetch_add(1, Ordering::SeqCst);
    }

    fn recover_media_pipeline(&mut self) {
        info!(engine = self.index, "🔄 Recovering media pipeline");
        self.stats.media_recoveries.fetch_add(1, Ordering::SeqCst);
    }
}

async fn play_scenario(
    engine: usize,
    scenario: Arc<Vec<ScenarioStep>>,
    emitters: Vec<EventEmitter>,
    cancel: CancellationToken,
    finished: CancellationToken,
) {
    info!(engine, steps = scenario.len(), "▶️  Scenario started");

    for (index, step) in scenario.iter().enumerate() {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(engine, step = index, "⏹️ Scenario cancelled");
                finished.cancel();
                return;
            }
            _ = tokio::time::sleep(step.after) => {}
        }

        // 每个事件只会被对应类别的订阅接收
        let delivered = emitters
            .iter()
            .filter(|emitter| emitter.emit(step.event.clone()))
            .count();
        debug!(engine, step = index, delivered, event = ?step.event, "Scenario step emitted");
    }

    info!(engine, "✓ Scenario finished");
    finished.cancel();
}
