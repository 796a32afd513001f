use async_trait::async_trait;
use common::PlayRejection;

/// Mime type queried for native HLS support
pub const HLS_MIME_TYPE: &str = "application/vnd.apple.mpegurl";

/// Media sink the session plays into (a video element, a native player view)
#[async_trait]
pub trait MediaSink: Send + Sync {
    /// Whether the sink can play the given mime type or codec string itself
    fn can_play_natively(&self, mime: &str) -> bool;

    /// Hand a source URL to the sink for native playback
    fn set_source(&self, url: &str);

    /// Ask the sink to start playback
    async fn play(&self) -> Result<(), PlayRejection>;

    fn is_paused(&self) -> bool;
}
