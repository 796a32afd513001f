use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use common::{EngineEvent, FaultRecord, Generation, PlayRejection, QualityLevel, TaggedEvent};
use crate::binding::EngineBinding;
use crate::config::RecoveryConfig;
use crate::notifier::Notifier;
use crate::recovery::{RecoveryAction, RecoveryCounters, RecoveryState, RecoveryStateMachine};
use crate::sink::MediaSink;

/// Codec tokens that mark an HEVC/H.265 rendition
const HEVC_CODEC_TOKENS: [&str; 5] = ["hvc1", "hev1", "hevc", "h265", "h.265"];

/// Which handler asked the sink to play
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayTrigger {
    ManifestParsed,
    FragmentLoaded,
    NativeSource,
}

/// Settled play request
#[derive(Debug, Clone)]
pub struct PlayOutcome {
    pub generation: Generation,
    pub trigger: PlayTrigger,
    pub result: Result<(), PlayRejection>,
}

/// In-flight play requests of the session
pub struct PlayRequests {
    tasks: JoinSet<PlayOutcome>,
}

impl PlayRequests {
    pub fn new() -> Self {
        Self {
            tasks: JoinSet::new(),
        }
    }

    /// Spawn a play request on the current runtime.
    ///
    /// Returns `false` when called outside a tokio runtime; nothing is spawned.
    fn spawn(&mut self, generation: Generation, trigger: PlayTrigger, sink: Arc<dyn MediaSink>) -> bool {
        let Ok(handle) = Handle::try_current() else {
            return false;
        };

        self.tasks.spawn_on(
            async move {
                let result = sink.play().await;
                PlayOutcome {
                    generation,
                    trigger,
                    result,
                }
            },
            &handle,
        );
        true
    }

    /// Wait for the next request to settle. `None` when nothing is in flight.
    pub async fn next(&mut self) -> Option<PlayOutcome> {
        loop {
            match self.tasks.join_next().await? {
                Ok(outcome) => return Some(outcome),
                Err(e) => debug!("Play request did not complete: {}", e),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Abort every in-flight request and forget it
    pub fn abort_all(&mut self) {
        self.tasks.abort_all();
        self.tasks = JoinSet::new();
    }
}

impl Default for PlayRequests {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a handler may touch while routing one event
pub struct RouteContext<'a> {
    pub generation: Generation,
    pub sink: &'a Arc<dyn MediaSink>,
    pub binding: &'a mut EngineBinding,
    pub notifier: &'a Notifier,
    pub plays: &'a mut PlayRequests,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Handled,
    /// Produced under another generation, dropped without effect
    Stale,
    /// A fatal error tore the engine down
    TornDown,
}

/// Routes engine events of one bind to the playback policies.
pub struct EventRouter {
    autoplay: bool,
    autoplay_prevented: bool,
    play_pending: bool,
    recovery: RecoveryStateMachine,
}

impl EventRouter {
    pub fn new(autoplay: bool, policy: RecoveryConfig) -> Self {
        Self {
            autoplay,
            autoplay_prevented: false,
            play_pending: false,
            recovery: RecoveryStateMachine::new(policy),
        }
    }

    pub fn recovery_state(&self) -> RecoveryState {
        self.recovery.state()
    }

    pub fn counters(&self) -> RecoveryCounters {
        self.recovery.counters()
    }

    pub fn route(&mut self, tagged: TaggedEvent, ctx: RouteContext<'_>) -> RouteOutcome {
        if tagged.generation != ctx.generation {
            debug!(
                stale = %tagged.generation,
                active = %ctx.generation,
                "Dropping event from replaced engine"
            );
            return RouteOutcome::Stale;
        }

        match tagged.event {
            EngineEvent::FragmentLoaded { start } => {
                if is_stream_start(start) {
                    self.request_play(PlayTrigger::FragmentLoaded, ctx);
                }
                RouteOutcome::Handled
            }
            EngineEvent::ManifestParsed { levels } => {
                self.on_manifest_parsed(&levels, ctx);
                RouteOutcome::Handled
            }
            EngineEvent::Error(fault) => self.on_fault(&fault, ctx),
        }
    }

    pub fn on_play_outcome(&mut self, outcome: PlayOutcome, ctx: RouteContext<'_>) -> RouteOutcome {
        if outcome.generation != ctx.generation {
            debug!(stale = %outcome.generation, "Dropping play outcome from replaced bind");
            return RouteOutcome::Stale;
        }

        self.play_pending = false;
        match outcome.result {
            Ok(()) => debug!(trigger = ?outcome.trigger, "Playback started"),
            Err(rejection) => match outcome.trigger {
                PlayTrigger::ManifestParsed | PlayTrigger::NativeSource => {
                    self.autoplay_prevented = true;
                    ctx.notifier.autoplay_prevented(&rejection.cause);
                }
                PlayTrigger::FragmentLoaded => {
                    debug!(cause = %rejection.cause, "Play on first fragment rejected");
                }
            },
        }
        RouteOutcome::Handled
    }

    /// Ask the sink to play when autoplay applies.
    ///
    /// Skipped when the sink is already playing, a request is in flight, or
    /// autoplay was already prevented for this bind.
    pub fn request_play(&mut self, trigger: PlayTrigger, ctx: RouteContext<'_>) {
        if !self.autoplay || self.autoplay_prevented || self.play_pending {
            return;
        }
        if !ctx.sink.is_paused() {
            debug!(?trigger, "Sink already playing");
            return;
        }

        if ctx.plays.spawn(ctx.generation, trigger, ctx.sink.clone()) {
            debug!(?trigger, "Requesting playback");
            self.play_pending = true;
        } else {
            warn!(?trigger, "No async runtime available, play request skipped");
        }
    }

    fn on_manifest_parsed(&mut self, levels: &[QualityLevel], ctx: RouteContext<'_>) {
        info!(levels = levels.len(), "Manifest parsed");

        if let Some(level) = find_hevc_level(levels) {
            ctx.notifier.advisory(&format!(
                "HEVC/H.265 codec detected ({}); some decoders may not support this stream",
                level.codec
            ));
        }

        self.request_play(PlayTrigger::ManifestParsed, ctx);
    }

    fn on_fault(&mut self, fault: &FaultRecord, ctx: RouteContext<'_>) -> RouteOutcome {
        match self.recovery.on_fault(fault) {
            RecoveryAction::None => RouteOutcome::Handled,
            RecoveryAction::ResumeLoad => {
                ctx.binding.request_resume();
                RouteOutcome::Handled
            }
            RecoveryAction::RecoverMedia => {
                ctx.binding.request_media_recovery();
                RouteOutcome::Handled
            }
            RecoveryAction::Fail(err) => {
                warn!(
                    category = %fault.category,
                    detail = %fault.detail,
                    "Unrecoverable fault, tearing down engine"
                );
                ctx.notifier.error(&err);
                ctx.binding.teardown();
                ctx.plays.abort_all();
                self.play_pending = false;
                RouteOutcome::TornDown
            }
        }
    }
}

fn is_stream_start(start: f64) -> bool {
    start.abs() < f64::EPSILON
}

fn find_hevc_level(levels: &[QualityLevel]) -> Option<&QualityLevel> {
    levels.iter().find(|level| {
        let codec = level.codec.to_ascii_lowercase();
        HEVC_CODEC_TOKENS.iter().any(|token| codec.contains(token))
    })
}
