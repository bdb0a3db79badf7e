//! Media sources: resolve a media reference to bytes and a MIME type.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use famlog_core::{Error, MediaSource, ResolvedMedia, Result, TaskKind};

/// Map a reference's file suffix to a MIME type using the fixed table.
pub fn mime_from_suffix(media_ref: &str) -> Option<&'static str> {
    let ext = Path::new(media_ref)
        .extension()
        .and_then(|e| e.to_str())?
        .to_lowercase();

    let mime = match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "aiff" => "audio/aiff",
        "pcm" => "audio/pcm",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => return None,
    };
    Some(mime)
}

/// Derive the MIME type for resolved media.
///
/// Order: suffix table, then magic bytes (only when the sniffed family matches
/// the task kind), then the kind's default. Never fails.
pub fn detect_mime(media_ref: &str, data: &[u8], kind: TaskKind) -> String {
    if let Some(mime) = mime_from_suffix(media_ref) {
        return mime.to_string();
    }

    if let Some(sniffed) = infer::get(data) {
        let mime = sniffed.mime_type();
        if mime.split('/').next() == Some(kind.mime_family()) {
            debug!(media_ref, mime, "MIME type detected from magic bytes");
            return mime.to_string();
        }
    }

    debug!(
        media_ref,
        default = kind.default_mime(),
        "Unrecognized media suffix, using default MIME type"
    );
    kind.default_mime().to_string()
}

/// Media source reading from the local filesystem.
///
/// Relative references are joined onto the optional root directory; absolute
/// references are read as-is.
#[derive(Debug, Clone, Default)]
pub struct FsMediaSource {
    root: Option<PathBuf>,
}

impl FsMediaSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn path_for(&self, media_ref: &str) -> PathBuf {
        let path = Path::new(media_ref);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[async_trait]
impl MediaSource for FsMediaSource {
    async fn resolve(&self, media_ref: &str, kind: TaskKind) -> Result<ResolvedMedia> {
        let path = self.path_for(media_ref);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::MediaNotFound(path.display().to_string()));
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let mime_type = detect_mime(media_ref, &bytes, kind);
        debug!(
            media_ref,
            mime_type = %mime_type,
            size_bytes = bytes.len(),
            "Resolved media"
        );
        Ok(ResolvedMedia { bytes, mime_type })
    }
}

/// Media source backed by an in-memory map, for uploads already held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMediaSource {
    items: HashMap<String, Vec<u8>>,
}

impl InMemoryMediaSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, media_ref: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(media_ref, bytes);
        self
    }

    pub fn insert(&mut self, media_ref: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.items.insert(media_ref.into(), bytes.into());
    }
}

#[async_trait]
impl MediaSource for InMemoryMediaSource {
    async fn resolve(&self, media_ref: &str, kind: TaskKind) -> Result<ResolvedMedia> {
        let bytes = self
            .items
            .get(media_ref)
            .cloned()
            .ok_or_else(|| Error::MediaNotFound(media_ref.to_string()))?;
        let mime_type = detect_mime(media_ref, &bytes, kind);
        Ok(ResolvedMedia { bytes, mime_type })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";

    #[test]
    fn test_mime_from_suffix_table() {
        let cases = vec![
            ("a.mp3", "audio/mpeg"),
            ("a.wav", "audio/wav"),
            ("a.ogg", "audio/ogg"),
            ("a.flac", "audio/flac"),
            ("a.aiff", "audio/aiff"),
            ("a.pcm", "audio/pcm"),
            ("a.jpg", "image/jpeg"),
            ("a.JPEG", "image/jpeg"),
            ("a.png", "image/png"),
        ];
        for (media_ref, expected) in cases {
            assert_eq!(
                mime_from_suffix(media_ref),
                Some(expected),
                "{} should map to {}",
                media_ref,
                expected
            );
        }
    }

    #[test]
    fn test_mime_from_suffix_unknown() {
        assert_eq!(mime_from_suffix("voice.xyz"), None);
        assert_eq!(mime_from_suffix("no-extension"), None);
    }

    #[test]
    fn test_detect_mime_unknown_suffix_defaults_by_kind() {
        assert_eq!(
            detect_mime("voice.xyz", b"not audio", TaskKind::Speech),
            "audio/mpeg"
        );
        assert_eq!(
            detect_mime("scan.xyz", b"not an image", TaskKind::Vision),
            "image/jpeg"
        );
    }

    #[test]
    fn test_detect_mime_sniffs_matching_family() {
        assert_eq!(detect_mime("upload.bin", PNG_HEADER, TaskKind::Vision), "image/png");
    }

    #[test]
    fn test_detect_mime_ignores_mismatched_family() {
        // PNG bytes submitted as speech still get the audio default
        assert_eq!(
            detect_mime("upload.bin", PNG_HEADER, TaskKind::Speech),
            "audio/mpeg"
        );
    }

    #[test]
    fn test_detect_mime_suffix_wins_over_bytes() {
        assert_eq!(detect_mime("receipt.jpg", PNG_HEADER, TaskKind::Vision), "image/jpeg");
    }

    #[tokio::test]
    async fn test_fs_source_resolves_existing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("receipt.jpg"), b"\xFF\xD8\xFFjpeg").unwrap();

        let source = FsMediaSource::with_root(dir.path());
        let media = source.resolve("receipt.jpg", TaskKind::Vision).await.unwrap();
        assert_eq!(media.mime_type, "image/jpeg");
        assert_eq!(media.bytes, b"\xFF\xD8\xFFjpeg");
    }

    #[tokio::test]
    async fn test_fs_source_unknown_suffix_does_not_fail() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("voice.xyz"), b"raw audio").unwrap();

        let source = FsMediaSource::with_root(dir.path());
        let media = source.resolve("voice.xyz", TaskKind::Speech).await.unwrap();
        assert_eq!(media.mime_type, "audio/mpeg");
    }

    #[tokio::test]
    async fn test_fs_source_absolute_path_ignores_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("memo.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        let source = FsMediaSource::with_root("/nonexistent-root");
        let media = source
            .resolve(path.to_str().unwrap(), TaskKind::Speech)
            .await
            .unwrap();
        assert_eq!(media.mime_type, "audio/wav");
    }

    #[tokio::test]
    async fn test_fs_source_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = FsMediaSource::with_root(dir.path());
        let err = source
            .resolve("missing.mp3", TaskKind::Speech)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MediaNotFound(_)));
    }

    #[tokio::test]
    async fn test_in_memory_source() {
        let source = InMemoryMediaSource::new().with("memo.ogg", b"OggS".to_vec());
        let media = source.resolve("memo.ogg", TaskKind::Speech).await.unwrap();
        assert_eq!(media.mime_type, "audio/ogg");

        let err = source.resolve("other.ogg", TaskKind::Speech).await.unwrap_err();
        assert!(matches!(err, Error::MediaNotFound(_)));
    }
}
