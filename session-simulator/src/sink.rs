use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use async_trait::async_trait;
use tracing::{debug, info};
use common::PlayRejection;
use playback_session::MediaSink;
use crate::config::{AutoplayPolicy, SinkConfig};

/// Time a simulated play request takes to settle
const PLAY_LATENCY: Duration = Duration::from_millis(20);

/// 模拟播放端
pub struct SimulatedSink {
    native_hls: bool,
    policy: AutoplayPolicy,
    paused: AtomicBool,
    play_requests: AtomicUsize,
    source: Mutex<Option<String>>,
}

impl SimulatedSink {
    pub fn new(config: &SinkConfig) -> Self {
        Self {
            native_hls: config.native_hls,
            policy: config.autoplay.clone(),
            paused: AtomicBool::new(true),
            play_requests: AtomicUsize::new(0),
            source: Mutex::new(None),
        }
    }

    pub fn play_requests(&self) -> usize {
        self.play_requests.load(Ordering::SeqCst)
    }

    /// Source assigned directly on the native path
    pub fn native_source(&self) -> Option<String> {
        self.source.lock().ok().and_then(|source| source.clone())
    }
}

#[async_trait]
impl MediaSink for SimulatedSink {
    fn can_play_natively(&self, mime: &str) -> bool {
        debug!(mime, native = self.native_hls, "Native playback probe");
        self.native_hls
    }

    fn set_source(&self, url: &str) {
        info!("📺 Native source set: {}", url);
        if let Ok(mut source) = self.source.lock() {
            *source = Some(url.to_string());
        }
    }

    async fn play(&self) -> Result<(), PlayRejection> {
        self.play_requests.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(PLAY_LATENCY).await;

        match &self.policy {
            AutoplayPolicy::Allow => {
                self.paused.store(false, Ordering::SeqCst);
                info!("▶️  Playback started");
                Ok(())
            }
            AutoplayPolicy::Block { cause } => Err(PlayRejection::new(cause.clone())),
        }
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}
