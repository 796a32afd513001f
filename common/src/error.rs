use thiserror::Error;

/// 会话错误
///
/// The `Display` text of each variant is what the host receives through its
/// error callback, so it is written for people rather than logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("This stream cannot be played here: no native {mime} support and no usable streaming engine")]
    UnsupportedPlayback { mime: String },

    #[error("Network error: playback could not recover after {retries} retries")]
    NetworkExhausted { retries: u32 },

    #[error("Media error: playback could not recover after {retries} retries")]
    MediaExhausted { retries: u32 },

    #[error("Fatal playback error: {detail}")]
    Fatal { detail: String },

    #[error("Streaming engine is already bound to this session")]
    EngineAlreadyBound,

    #[error("Streaming engine could not be created: {0}")]
    EngineCreation(String),

    #[error("Invalid session configuration: {0}")]
    InvalidConfig(String),
}

/// 播放请求被拒绝
///
/// Not a playback failure: the stream is healthy but the sink refused to
/// start, usually because of an autoplay policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("play request rejected: {cause}")]
pub struct PlayRejection {
    pub cause: String,
}

impl PlayRejection {
    pub fn new(cause: impl Into<String>) -> Self {
        Self { cause: cause.into() }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
