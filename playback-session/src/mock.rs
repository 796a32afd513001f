// 测试用的模拟播放端与引擎
//
// The mock engine never stops delivering once destroyed: emitting through a
// released instance models events already in flight when teardown happened.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use common::{EngineEvent, EventClass, PlayRejection, SessionError, SubscriptionToken};
use crate::config::SessionConfig;
use crate::engine::{EngineHandle, EngineRuntime, EventEmitter};
use crate::sink::MediaSink;

// ============================================================================
// Mock Sink
// ============================================================================

pub struct MockSink {
    native: bool,
    paused: AtomicBool,
    play_calls: AtomicUsize,
    rejection: Mutex<Option<String>>,
    sources: Mutex<Vec<String>>,
}

impl MockSink {
    /// Paused sink that accepts play requests
    pub fn new(native: bool) -> Self {
        Self {
            native,
            paused: AtomicBool::new(true),
            play_calls: AtomicUsize::new(0),
            rejection: Mutex::new(None),
            sources: Mutex::new(Vec::new()),
        }
    }

    /// Sink that is already playing
    pub fn playing(native: bool) -> Self {
        let sink = Self::new(native);
        sink.paused.store(false, Ordering::SeqCst);
        sink
    }

    /// Paused sink whose play requests are refused with `cause`
    pub fn rejecting(native: bool, cause: &str) -> Self {
        let sink = Self::new(native);
        *sink.rejection.lock().unwrap() = Some(cause.to_string());
        sink
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls.load(Ordering::SeqCst)
    }

    pub fn sources(&self) -> Vec<String> {
        self.sources.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaSink for MockSink {
    fn can_play_natively(&self, _mime: &str) -> bool {
        self.native
    }

    fn set_source(&self, url: &str) {
        self.sources.lock().unwrap().push(url.to_string());
    }

    async fn play(&self) -> Result<(), PlayRejection> {
        self.play_calls.fetch_add(1, Ordering::SeqCst);
        let rejection = self.rejection.lock().unwrap().clone();
        match rejection {
            Some(cause) => Err(PlayRejection::new(cause)),
            None => {
                self.paused.store(false, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Mock Engine
// ============================================================================

#[derive(Default)]
pub struct MockEngineState {
    emitters: Mutex<Vec<EventEmitter>>,
    source: Mutex<Option<String>>,
    attached: AtomicBool,
    destroyed: AtomicUsize,
    resumes: AtomicUsize,
    media_recoveries: AtomicUsize,
    next_token: AtomicU64,
}

impl MockEngineState {
    /// Push an event through every matching subscription.
    pub fn emit(&self, event: EngineEvent) -> usize {
        self.emitters
            .lock()
            .unwrap()
            .iter()
            .filter(|emitter| emitter.emit(event.clone()))
            .count()
    }

    pub fn loaded_source(&self) -> Option<String> {
        self.source.lock().unwrap().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    pub fn subscription_count(&self) -> usize {
        self.emitters.lock().unwrap().len()
    }

    pub fn destroy_count(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn resume_count(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }

    pub fn media_recovery_count(&self) -> usize {
        self.media_recoveries.load(Ordering::SeqCst)
    }
}

struct MockEngine {
    state: Arc<MockEngineState>,
}

impl EngineHandle for MockEngine {
    fn load_source(&mut self, url: &str) {
        *self.state.source.lock().unwrap() = Some(url.to_string());
    }

    fn attach(&mut self, _sink: Arc<dyn MediaSink>) {
        self.state.attached.store(true, Ordering::SeqCst);
    }

    fn destroy(&mut self) {
        self.state.destroyed.fetch_add(1, Ordering::SeqCst);
    }

    fn subscribe(&mut self, _class: EventClass, emitter: EventEmitter) -> SubscriptionToken {
        self.state.emitters.lock().unwrap().push(emitter);
        SubscriptionToken(self.state.next_token.fetch_add(1, Ordering::SeqCst))
    }

    fn resume_load(&mut self) {
        self.state.resumes.fetch_add(1, Ordering::SeqCst);
    }

    fn recover_media_pipeline(&mut self) {
        self.state.media_recoveries.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockRuntime {
    supported: bool,
    failure: Option<String>,
    engines: Mutex<Vec<Arc<MockEngineState>>>,
}

impl MockRuntime {
    pub fn new(supported: bool) -> Self {
        Self {
            supported,
            failure: None,
            engines: Mutex::new(Vec::new()),
        }
    }

    /// Supported runtime whose engine construction fails
    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Self::new(true)
        }
    }

    pub fn created_count(&self) -> usize {
        self.engines.lock().unwrap().len()
    }

    pub fn engine(&self, index: usize) -> Arc<MockEngineState> {
        self.engines.lock().unwrap()[index].clone()
    }

    pub fn latest(&self) -> Arc<MockEngineState> {
        self.engines
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no engine created")
    }
}

impl EngineRuntime for MockRuntime {
    fn is_runtime_supported(&self) -> bool {
        self.supported
    }

    fn create_engine(&self, _config: &SessionConfig) -> Result<Box<dyn EngineHandle>, SessionError> {
        if let Some(reason) = &self.failure {
            return Err(SessionError::EngineCreation(reason.clone()));
        }

        let state = Arc::new(MockEngineState::default());
        self.engines.lock().unwrap().push(state.clone());
        Ok(Box::new(MockEngine { state }))
    }
}
