//! Audio probing seam between the classifier and stromboli-av.

pub use stromboli_av::probe::{parse_codec_output, DEFAULT_PROBE_TIMEOUT};
pub use stromboli_av::{check_tool, check_tools, AudioCodecProbe, ToolInfo};

use async_trait::async_trait;
use std::path::Path;

/// Something that can report the codec of a file's first audio stream.
///
/// `Ok(None)` means the file has no audio stream. Errors are the caller's
/// cue to fail closed.
#[async_trait]
pub trait AudioProber: Send + Sync {
    async fn audio_codec(&self, path: &Path) -> stromboli_av::Result<Option<String>>;
}

#[async_trait]
impl AudioProber for AudioCodecProbe {
    async fn audio_codec(&self, path: &Path) -> stromboli_av::Result<Option<String>> {
        AudioCodecProbe::audio_codec(self, path).await
    }
}
