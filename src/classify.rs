//! Play strategy classification.
//!
//! A file is served as-is when its container is one browsers play natively
//! and its first audio stream is a codec browsers decode. Anything else that
//! looks like video is converted on the fly.

use serde::Serialize;
use std::path::Path;

use crate::conversion::ConversionError;
use crate::probe::AudioProber;

/// Containers typical browsers play natively.
pub const NATIVE_EXTENSIONS: &[&str] = &["mp4", "webm", "ogg"];

/// Every extension recognized as video.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "webm", "ogg", "mkv", "avi", "mov", "wmv", "flv", "m4v", "mpg", "mpeg", "3gp",
];

/// Audio codecs browsers decode inside the native containers.
pub const BROWSER_AUDIO_CODECS: &[&str] = &["aac", "mp3", "opus", "vorbis"];

/// How a file should be delivered to the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayDecision {
    /// Send the file bytes unmodified, with range support.
    Direct,
    /// Run the file through the encoder and stream its output.
    Convert,
    /// Not a media file.
    Unsupported,
}

impl PlayDecision {
    pub fn is_media(self) -> bool {
        self != PlayDecision::Unsupported
    }
}

impl std::fmt::Display for PlayDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayDecision::Direct => write!(f, "direct"),
            PlayDecision::Convert => write!(f, "convert"),
            PlayDecision::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// Lowercased extension of `path`, if any.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Decision from the extension alone. Native containers come back as
/// `Direct` and still need [`decide_with_codec`] before being trusted.
pub fn classify_extension(ext: &str) -> PlayDecision {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    if !VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        PlayDecision::Unsupported
    } else if NATIVE_EXTENSIONS.contains(&ext.as_str()) {
        PlayDecision::Direct
    } else {
        PlayDecision::Convert
    }
}

/// Whether browsers decode this audio codec.
pub fn is_browser_audio(codec: &str) -> bool {
    BROWSER_AUDIO_CODECS.contains(&codec.trim().to_ascii_lowercase().as_str())
}

/// Refine an extension decision with the probe result.
///
/// Probe errors and missing audio both resolve to `Convert`.
pub fn decide_with_codec<E>(
    by_extension: PlayDecision,
    probed: &Result<Option<String>, E>,
) -> PlayDecision {
    match (by_extension, probed) {
        (PlayDecision::Direct, Ok(Some(codec))) if is_browser_audio(codec) => PlayDecision::Direct,
        (PlayDecision::Direct, _) => PlayDecision::Convert,
        (other, _) => other,
    }
}

/// A decision together with what led to it.
#[derive(Debug)]
pub struct Classification {
    pub by_extension: PlayDecision,
    /// The probe result, when the prober was consulted.
    pub probed: Option<Result<Option<String>, ConversionError>>,
    pub decision: PlayDecision,
}

/// Classify a path, probing natively-playable files.
///
/// Directories are never media and never reach the prober.
pub async fn inspect(path: &Path, is_dir: bool, prober: &dyn AudioProber) -> Classification {
    if is_dir {
        return Classification {
            by_extension: PlayDecision::Unsupported,
            probed: None,
            decision: PlayDecision::Unsupported,
        };
    }

    let by_extension = extension_of(path)
        .map(|ext| classify_extension(&ext))
        .unwrap_or(PlayDecision::Unsupported);

    if by_extension != PlayDecision::Direct {
        return Classification {
            by_extension,
            probed: None,
            decision: by_extension,
        };
    }

    let probed = prober
        .audio_codec(path)
        .await
        .map_err(|source| ConversionError::ProbeFailure {
            path: path.to_path_buf(),
            source,
        });
    if let Err(e) = &probed {
        tracing::debug!("{}, converting instead", e);
    }
    let decision = decide_with_codec(by_extension, &probed);
    Classification {
        by_extension,
        probed: Some(probed),
        decision,
    }
}

/// Classify a directory entry. See [`inspect`].
pub async fn classify(path: &Path, is_dir: bool, prober: &dyn AudioProber) -> PlayDecision {
    inspect(path, is_dir, prober).await.decision
}
