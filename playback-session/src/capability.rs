use common::PlaybackPath;
use tracing::debug;
use crate::engine::EngineRuntime;

/// Pick the playback path for a sink.
///
/// A usable engine runtime wins; an unusable or absent runtime falls back to
/// native playback when the sink supports it.
pub fn detect(native_supported: bool, runtime: Option<&dyn EngineRuntime>) -> PlaybackPath {
    let path = match runtime {
        Some(runtime) if runtime.is_runtime_supported() => PlaybackPath::EngineManaged,
        _ if native_supported => PlaybackPath::Native,
        _ => PlaybackPath::Unsupported,
    };

    debug!(
        native_supported,
        runtime_present = runtime.is_some(),
        %path,
        "Playback path selected"
    );
    path
}
