use std::fmt;
use std::sync::Arc;
use tracing::{error, warn};
use common::SessionError;

/// Host callback receiving a human readable message
pub type NoticeCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// The two channels notifications leave the session through.
///
/// Fatal errors and advisories go to `on_error`; autoplay rejection goes to
/// `on_autoplay_prevented` because the stream itself is healthy. Without a
/// callback the notification is only logged.
#[derive(Clone, Default)]
pub struct Notifier {
    on_autoplay_prevented: Option<NoticeCallback>,
    on_error: Option<NoticeCallback>,
}

impl Notifier {
    pub fn new(on_autoplay_prevented: Option<NoticeCallback>, on_error: Option<NoticeCallback>) -> Self {
        Self {
            on_autoplay_prevented,
            on_error,
        }
    }

    pub fn autoplay_prevented(&self, cause: &str) {
        warn!(cause, "Autoplay prevented");
        if let Some(callback) = &self.on_autoplay_prevented {
            callback(cause);
        }
    }

    /// Non-fatal advisory, playback continues
    pub fn advisory(&self, message: &str) {
        warn!("{}", message);
        if let Some(callback) = &self.on_error {
            callback(message);
        }
    }

    pub fn error(&self, err: &SessionError) {
        let message = err.to_string();
        match &self.on_error {
            Some(callback) => {
                warn!(error = %message, "Session error reported to host");
                callback(&message);
            }
            None => error!(error = %message, "Session error (no error callback registered)"),
        }
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("on_autoplay_prevented", &self.on_autoplay_prevented.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
