use std::fmt;
use std::sync::Arc;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;
use common::{Generation, PlaybackPath, Result, SessionError, TaggedEvent};
use crate::binding::EngineBinding;
use crate::capability;
use crate::config::SessionConfig;
use crate::engine::EngineRuntime;
use crate::notifier::{NoticeCallback, Notifier};
use crate::recovery::{RecoveryCounters, RecoveryState};
use crate::router::{EventRouter, PlayOutcome, PlayRequests, PlayTrigger, RouteContext, RouteOutcome};
use crate::sink::{MediaSink, HLS_MIME_TYPE};

// ============================================================================
// Session Inputs
// ============================================================================

/// The caller-tunable inputs of a session
#[derive(Clone, Default)]
pub struct SessionProps {
    pub source: String,
    pub autoplay: bool,
    pub on_autoplay_prevented: Option<NoticeCallback>,
    pub on_error: Option<NoticeCallback>,
}

impl SessionProps {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn on_autoplay_prevented(mut self, callback: NoticeCallback) -> Self {
        self.on_autoplay_prevented = Some(callback);
        self
    }

    pub fn on_error(mut self, callback: NoticeCallback) -> Self {
        self.on_error = Some(callback);
        self
    }
}

impl fmt::Debug for SessionProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionProps")
            .field("source", &self.source)
            .field("autoplay", &self.autoplay)
            .field("on_autoplay_prevented", &self.on_autoplay_prevented.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Result of feeding new inputs to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Same inputs as before, nothing touched
    Unchanged,
    /// Previous bind released, a new one started on this path
    Bound(PlaybackPath),
    /// Previous bind released, nothing to bind to
    Released,
    /// No playback could be started; the error went to the host
    Failed,
}

/// Serializable view of the session for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub source: Option<String>,
    pub path: Option<PlaybackPath>,
    pub generation: Option<Generation>,
    pub engine_bound: bool,
    pub recovery_state: RecoveryState,
    pub counters: RecoveryCounters,
}

// ============================================================================
// Session Controller
// ============================================================================

/// 会话控制器
///
/// Owns the engine binding, event router and recovery state of one playback
/// session. All session state is mutated through `&mut self`: engines only
/// queue generation-tagged events, and play requests settle back through
/// the same path.
pub struct SessionController {
    session_id: Uuid,
    config: Arc<SessionConfig>,
    runtime: Option<Arc<dyn EngineRuntime>>,
    sink: Option<Arc<dyn MediaSink>>,
    props: Option<SessionProps>,
    path: Option<PlaybackPath>,
    last_generation: Option<Generation>,
    active: Option<Generation>,
    binding: EngineBinding,
    router: EventRouter,
    notifier: Notifier,
    plays: PlayRequests,
    events_tx: mpsc::UnboundedSender<TaggedEvent>,
    events_rx: mpsc::UnboundedReceiver<TaggedEvent>,
}

impl SessionController {
    /// Create a controller with the fixed session policy.
    ///
    /// `runtime` is `None` when no adaptive engine is available at all.
    pub fn new(runtime: Option<Arc<dyn EngineRuntime>>) -> Self {
        Self::build(Arc::new(SessionConfig::default()), runtime)
    }

    pub(crate) fn with_config(
        config: SessionConfig,
        runtime: Option<Arc<dyn EngineRuntime>>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(Arc::new(config), runtime))
    }

    fn build(config: Arc<SessionConfig>, runtime: Option<Arc<dyn EngineRuntime>>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let router = EventRouter::new(false, config.recovery.clone());

        Self {
            session_id: Uuid::new_v4(),
            config,
            runtime,
            sink: None,
            props: None,
            path: None,
            last_generation: None,
            active: None,
            binding: EngineBinding::new(),
            router,
            notifier: Notifier::default(),
            plays: PlayRequests::new(),
            events_tx,
            events_rx,
        }
    }

    /// Apply new session inputs.
    ///
    /// Identical inputs are a no-op. Otherwise the previous bind is torn down
    /// completely before capability is evaluated and a new bind starts.
    pub fn update(&mut self, sink: Option<Arc<dyn MediaSink>>, props: SessionProps) -> UpdateOutcome {
        if self.is_current(sink.as_ref(), &props) {
            debug!(session_id = %self.session_id, "Session inputs unchanged");
            return UpdateOutcome::Unchanged;
        }

        self.release("session inputs changed");

        self.notifier = Notifier::new(props.on_autoplay_prevented.clone(), props.on_error.clone());
        self.router = EventRouter::new(props.autoplay, self.config.recovery.clone());
        self.sink = sink;
        self.props = Some(props);

        let source = self.props.as_ref().map(|p| p.source.clone()).unwrap_or_default();
        match self.sink.clone() {
            Some(sink) if !source.is_empty() => self.bind(sink, &source),
            _ => UpdateOutcome::Released,
        }
    }

    /// Tear down without rebinding (the hosting context went away)
    pub fn stop(&mut self) {
        self.release("session stopped");
        self.sink = None;
        self.props = None;
    }

    /// Process the next queued engine event or settled play request.
    ///
    /// Returns `None` when nothing can arrive any more: the queue is empty,
    /// no engine is bound and no play request is in flight.
    pub async fn process_next(&mut self) -> Option<RouteOutcome> {
        loop {
            if !self.binding.is_bound() && self.plays.is_empty() {
                let tagged = self.events_rx.try_recv().ok()?;
                return Some(self.dispatch(tagged));
            }

            tokio::select! {
                Some(tagged) = self.events_rx.recv() => return Some(self.dispatch(tagged)),
                outcome = self.plays.next(), if !self.plays.is_empty() => match outcome {
                    Some(outcome) => return Some(self.settle_play(outcome)),
                    // 请求被中止或异常退出，重新检查
                    None => continue,
                },
                else => return None,
            }
        }
    }

    /// Drain queued events and wait for in-flight play requests to settle
    pub async fn run_until_idle(&mut self) {
        loop {
            while let Ok(tagged) = self.events_rx.try_recv() {
                self.dispatch(tagged);
            }

            match self.plays.next().await {
                Some(outcome) => {
                    self.settle_play(outcome);
                }
                None => break,
            }
        }
    }

    /// Route one engine event. Events from any generation other than the
    /// active one are dropped without effect.
    pub fn dispatch(&mut self, tagged: TaggedEvent) -> RouteOutcome {
        let (Some(generation), Some(sink)) = (self.active, self.sink.as_ref()) else {
            debug!(generation = %tagged.generation, "Dropping event, no active bind");
            return RouteOutcome::Stale;
        };

        let ctx = RouteContext {
            generation,
            sink,
            binding: &mut self.binding,
            notifier: &self.notifier,
            plays: &mut self.plays,
        };
        let outcome = self.router.route(tagged, ctx);

        if outcome == RouteOutcome::TornDown {
            self.active = None;
        }
        outcome
    }

    fn settle_play(&mut self, outcome: PlayOutcome) -> RouteOutcome {
        let (Some(generation), Some(sink)) = (self.active, self.sink.as_ref()) else {
            debug!(generation = %outcome.generation, "Dropping play outcome, no active bind");
            return RouteOutcome::Stale;
        };

        let ctx = RouteContext {
            generation,
            sink,
            binding: &mut self.binding,
            notifier: &self.notifier,
            plays: &mut self.plays,
        };
        self.router.on_play_outcome(outcome, ctx)
    }

    fn bind(&mut self, sink: Arc<dyn MediaSink>, source: &str) -> UpdateOutcome {
        let path = capability::detect(sink.can_play_natively(HLS_MIME_TYPE), self.runtime.as_deref());
        self.path = Some(path);

        match (path, self.runtime.clone()) {
            (PlaybackPath::EngineManaged, Some(runtime)) => {
                let generation = self.next_generation();
                match self.binding.start(
                    generation,
                    runtime.as_ref(),
                    source,
                    sink,
                    &self.config,
                    &self.events_tx,
                ) {
                    Ok(()) => {
                        self.active = Some(generation);
                        info!(session_id = %self.session_id, %generation, %path, "Session bound");
                        UpdateOutcome::Bound(path)
                    }
                    Err(e) => {
                        self.notifier.error(&e);
                        UpdateOutcome::Failed
                    }
                }
            }
            (PlaybackPath::Native, _) => {
                let generation = self.next_generation();
                sink.set_source(source);
                self.active = Some(generation);
                info!(session_id = %self.session_id, %generation, %path, "Session bound");

                let ctx = RouteContext {
                    generation,
                    sink: &sink,
                    binding: &mut self.binding,
                    notifier: &self.notifier,
                    plays: &mut self.plays,
                };
                self.router.request_play(PlayTrigger::NativeSource, ctx);
                UpdateOutcome::Bound(path)
            }
            _ => {
                self.path = Some(PlaybackPath::Unsupported);
                self.notifier.error(&SessionError::UnsupportedPlayback {
                    mime: HLS_MIME_TYPE.to_string(),
                });
                UpdateOutcome::Failed
            }
        }
    }

    fn release(&mut self, reason: &str) {
        self.plays.abort_all();
        let engine_released = self.binding.teardown();

        if let Some(generation) = self.active.take() {
            info!(session_id = %self.session_id, %generation, engine_released, reason, "Session released");
        }
        self.path = None;
    }

    fn next_generation(&mut self) -> Generation {
        let generation = self.last_generation.map_or(Generation::FIRST, Generation::next);
        self.last_generation = Some(generation);
        generation
    }

    fn is_current(&self, sink: Option<&Arc<dyn MediaSink>>, props: &SessionProps) -> bool {
        let Some(current) = self.props.as_ref() else {
            return false;
        };

        let same_sink = match (self.sink.as_ref(), sink) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };

        same_sink
            && current.source == props.source
            && current.autoplay == props.autoplay
            && same_callback(&current.on_autoplay_prevented, &props.on_autoplay_prevented)
            && same_callback(&current.on_error, &props.on_error)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn path(&self) -> Option<PlaybackPath> {
        self.path
    }

    pub fn active_generation(&self) -> Option<Generation> {
        self.active
    }

    pub fn is_engine_bound(&self) -> bool {
        self.binding.is_bound()
    }

    pub fn recovery_state(&self) -> RecoveryState {
        self.router.recovery_state()
    }

    pub fn counters(&self) -> RecoveryCounters {
        self.router.counters()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            source: self.props.as_ref().map(|p| p.source.clone()),
            path: self.path,
            generation: self.active,
            engine_bound: self.binding.is_bound(),
            recovery_state: self.router.recovery_state(),
            counters: self.router.counters(),
        }
    }
}

fn same_callback(a: &Option<NoticeCallback>, b: &Option<NoticeCallback>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}
