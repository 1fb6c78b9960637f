use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::cmp::Ordering;
use std::path::PathBuf;

use super::sandbox::{PathError, Sandbox};
use crate::classify::{classify, PlayDecision};
use crate::probe::AudioProber;

/// Probes allowed in flight while listing one directory.
const PROBE_CONCURRENCY: usize = 4;

/// One visible entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaEntry {
    pub name: String,
    #[serde(rename = "path")]
    pub relative_path: String,
    #[serde(rename = "isDir")]
    pub is_directory: bool,
    #[serde(rename = "isVideo")]
    pub is_media_file: bool,
    #[serde(rename = "canPlay")]
    pub playable_natively: bool,
    #[serde(rename = "needsTranscode")]
    pub needs_transcode: bool,
}

impl MediaEntry {
    fn new(name: String, relative_path: String, is_directory: bool, decision: PlayDecision) -> Self {
        Self {
            name,
            relative_path,
            is_directory,
            is_media_file: decision.is_media(),
            playable_natively: decision == PlayDecision::Direct,
            needs_transcode: decision == PlayDecision::Convert,
        }
    }
}

struct Candidate {
    name: String,
    relative: PathBuf,
    full: PathBuf,
    is_dir: bool,
}

/// List a directory under the sandbox root, classifying every file.
///
/// Hidden entries and entries whose metadata cannot be read are skipped.
/// Directories sort first, then names in byte order.
pub async fn list_directory(
    sandbox: &Sandbox,
    rel: &str,
    prober: &dyn AudioProber,
) -> Result<Vec<MediaEntry>, PathError> {
    let dir = sandbox.resolve(rel)?;
    let display = dir.relative.display().to_string();

    let metadata = tokio::fs::metadata(&dir.full)
        .await
        .map_err(|e| PathError::io(&display, e))?;
    if !metadata.is_dir() {
        return Err(PathError::NotADirectory { path: display });
    }

    let mut reader = tokio::fs::read_dir(&dir.full)
        .await
        .map_err(|e| PathError::io(&display, e))?;

    let mut candidates = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|e| PathError::io(&display, e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }

        let full = entry.path();
        // Follows symlinks; broken links are skipped.
        let metadata = match tokio::fs::metadata(&full).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::debug!("Skipping {:?}: {}", full, e);
                continue;
            }
        };

        if is_symlink(&entry).await && !links_inside(sandbox, &full).await {
            tracing::debug!("Skipping symlink leaving the root: {:?}", full);
            continue;
        }

        candidates.push(Candidate {
            relative: dir.relative.join(&name),
            name,
            full,
            is_dir: metadata.is_dir(),
        });
    }

    let mut entries: Vec<MediaEntry> = stream::iter(candidates)
        .map(|c| async move {
            let decision = classify(&c.full, c.is_dir, prober).await;
            MediaEntry::new(
                c.name,
                c.relative.to_string_lossy().into_owned(),
                c.is_dir,
                decision,
            )
        })
        .buffered(PROBE_CONCURRENCY)
        .collect()
        .await;

    entries.sort_by(directories_first);
    Ok(entries)
}

fn directories_first(a: &MediaEntry, b: &MediaEntry) -> Ordering {
    b.is_directory
        .cmp(&a.is_directory)
        .then_with(|| a.name.cmp(&b.name))
}

async fn is_symlink(entry: &tokio::fs::DirEntry) -> bool {
    entry
        .file_type()
        .await
        .map(|t| t.is_symlink())
        .unwrap_or(false)
}

async fn links_inside(sandbox: &Sandbox, path: &std::path::Path) -> bool {
    tokio::fs::canonicalize(path)
        .await
        .map(|target| sandbox.contains(&target))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::path::Path;

    /// Reports the codec named by the file's contents.
    struct ContentsProber;

    #[async_trait]
    impl AudioProber for ContentsProber {
        async fn audio_codec(&self, path: &Path) -> stromboli_av::Result<Option<String>> {
            let codec = std::fs::read_to_string(path)?;
            Ok(Some(codec.trim().to_string()).filter(|c| !c.is_empty()))
        }
    }

    fn library() -> (tempfile::TempDir, Sandbox) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("Shows/S01")).unwrap();
        std::fs::create_dir_all(root.join("Anime")).unwrap();
        std::fs::create_dir_all(root.join(".cache")).unwrap();
        std::fs::write(root.join("zeta.mkv"), b"").unwrap();
        std::fs::write(root.join("clip.mp4"), b"aac").unwrap();
        std::fs::write(root.join("dolby.mp4"), b"eac3").unwrap();
        std::fs::write(root.join("notes.txt"), b"aac").unwrap();
        std::fs::write(root.join(".hidden.mp4"), b"aac").unwrap();
        std::fs::write(root.join("Shows/S01/e01.webm"), b"opus").unwrap();
        let sandbox = Sandbox::new(root).unwrap();
        (dir, sandbox)
    }

    #[tokio::test]
    async fn test_lists_root_sorted() {
        let (_dir, sandbox) = library();
        let entries = list_directory(&sandbox, "", &ContentsProber).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            ["Anime", "Shows", "clip.mp4", "dolby.mp4", "notes.txt", "zeta.mkv"]
        );
    }

    #[tokio::test]
    async fn test_entry_flags() {
        let (_dir, sandbox) = library();
        let entries = list_directory(&sandbox, "", &ContentsProber).await.unwrap();
        let get = |name: &str| entries.iter().find(|e| e.name == name).unwrap().clone();

        let shows = get("Shows");
        assert!(shows.is_directory);
        assert!(!shows.is_media_file && !shows.playable_natively && !shows.needs_transcode);

        let clip = get("clip.mp4");
        assert!(clip.is_media_file && clip.playable_natively && !clip.needs_transcode);

        let dolby = get("dolby.mp4");
        assert!(dolby.is_media_file && !dolby.playable_natively && dolby.needs_transcode);

        let zeta = get("zeta.mkv");
        assert!(zeta.is_media_file && zeta.needs_transcode);

        let notes = get("notes.txt");
        assert!(!notes.is_media_file && !notes.playable_natively && !notes.needs_transcode);
    }

    #[tokio::test]
    async fn test_nested_paths_are_relative() {
        let (_dir, sandbox) = library();
        let entries = list_directory(&sandbox, "Shows/S01", &ContentsProber)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].relative_path, "Shows/S01/e01.webm");
        assert!(entries[0].playable_natively);
    }

    #[test]
    fn test_serialized_field_names() {
        let entry = MediaEntry::new(
            "a.mkv".into(),
            "x/a.mkv".into(),
            false,
            PlayDecision::Convert,
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "a.mkv",
                "path": "x/a.mkv",
                "isDir": false,
                "isVideo": true,
                "canPlay": false,
                "needsTranscode": true,
            })
        );
    }

    #[tokio::test]
    async fn test_errors() {
        let (_dir, sandbox) = library();
        assert_matches!(
            list_directory(&sandbox, "../", &ContentsProber).await,
            Err(PathError::Invalid { .. })
        );
        assert_matches!(
            list_directory(&sandbox, "Missing", &ContentsProber).await,
            Err(PathError::NotFound { .. })
        );
        assert_matches!(
            list_directory(&sandbox, "clip.mp4", &ContentsProber).await,
            Err(PathError::NotADirectory { .. })
        );
    }
}
