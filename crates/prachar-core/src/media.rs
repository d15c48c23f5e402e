//! Media resolution
//!
//! Turns the campaign's media sources into postable items: reads the bytes,
//! detects whether each item is a photo, a video or a generic document, and
//! reports unreadable sources per item instead of failing the whole list.

use std::fmt;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use thiserror::Error;
use tracing::debug;

/// Extensions posted through the photo endpoint
const PHOTO_EXTENSIONS: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
];

/// Extensions posted through the video endpoint
const VIDEO_EXTENSIONS: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/mp4"),
    ("mov", "video/quicktime"),
    ("webm", "video/webm"),
];

const OCTET_STREAM: &str = "application/octet-stream";

/// How the surface should treat a media item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    /// Anything else, sent through the generic file path
    Document,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Photo => write!(f, "photo"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Document => write!(f, "document"),
        }
    }
}

/// Where a media item comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Local file
    File(PathBuf),
    /// Bytes already in memory
    Bytes { name: String, bytes: Vec<u8> },
    /// `data:<mime>;base64,<payload>` string, or bare base64
    DataUrl { name: String, data: String },
    /// Remote URL the surface fetches itself
    Url(String),
}

impl MediaSource {
    /// Interprets a command-line argument as a media source
    pub fn from_arg(arg: &str) -> Self {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            MediaSource::Url(arg.to_string())
        } else if arg.starts_with("data:") {
            MediaSource::DataUrl {
                name: "inline".to_string(),
                data: arg.to_string(),
            }
        } else {
            MediaSource::File(PathBuf::from(arg))
        }
    }

    /// Short human-readable label for logs and reports
    pub fn label(&self) -> String {
        match self {
            MediaSource::File(path) => path.display().to_string(),
            MediaSource::Bytes { name, .. } | MediaSource::DataUrl { name, .. } => name.clone(),
            MediaSource::Url(url) => url.clone(),
        }
    }
}

/// Content handed to the surface
#[derive(Clone, PartialEq, Eq)]
pub enum MediaPayload {
    /// Uploaded as a file part
    Bytes(Vec<u8>),
    /// Passed by reference
    Url(String),
}

impl fmt::Debug for MediaPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaPayload::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            MediaPayload::Url(url) => f.debug_tuple("Url").field(url).finish(),
        }
    }
}

/// A resolved, postable media item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    /// Position in the campaign; 0 is the head
    pub ordinal: usize,
    /// Label of the original source
    pub label: String,
    /// File name sent to the surface
    pub file_name: String,
    pub kind: MediaKind,
    pub mime_type: &'static str,
    pub payload: MediaPayload,
}

impl MediaItem {
    pub fn is_head(&self) -> bool {
        self.ordinal == 0
    }

    /// Size of the uploaded content; `None` for URL payloads
    pub fn size_bytes(&self) -> Option<usize> {
        match &self.payload {
            MediaPayload::Bytes(bytes) => Some(bytes.len()),
            MediaPayload::Url(_) => None,
        }
    }
}

/// A media source that cannot be posted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("Media unreadable: {path}: {reason}")]
    Unreadable {
        /// Label of the offending source
        path: String,
        /// Why it could not be read
        reason: String,
    },
}

impl MediaError {
    fn unreadable(path: impl Into<String>, reason: impl Into<String>) -> Self {
        MediaError::Unreadable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Label of the source that failed
    pub fn path(&self) -> &str {
        match self {
            MediaError::Unreadable { path, .. } => path,
        }
    }
}

/// Resolves every source, preserving order
///
/// One entry is returned per input so callers can decide per ordinal whether
/// a failure is fatal.
pub async fn resolve_media(sources: &[MediaSource]) -> Vec<Result<MediaItem, MediaError>> {
    let mut resolved = Vec::with_capacity(sources.len());
    for (ordinal, source) in sources.iter().enumerate() {
        resolved.push(resolve_one(ordinal, source).await);
    }
    resolved
}

/// Resolves a single source at the given ordinal
pub async fn resolve_one(ordinal: usize, source: &MediaSource) -> Result<MediaItem, MediaError> {
    let label = source.label();
    let item = match source {
        MediaSource::File(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| MediaError::unreadable(&label, e.to_string()))?;
            from_bytes(ordinal, label, file_name_of(path), bytes, None)?
        }
        MediaSource::Bytes { name, bytes } => {
            from_bytes(ordinal, label, name.clone(), bytes.clone(), None)?
        }
        MediaSource::DataUrl { name, data } => {
            let (declared_mime, bytes) = decode_data_url(data)
                .map_err(|reason| MediaError::unreadable(&label, reason))?;
            from_bytes(ordinal, label, name.clone(), bytes, declared_mime.as_deref())?
        }
        MediaSource::Url(url) => {
            let file_name = url_file_name(url);
            let (kind, mime_type) =
                kind_from_extension(&file_name).unwrap_or((MediaKind::Document, OCTET_STREAM));
            MediaItem {
                ordinal,
                label,
                file_name,
                kind,
                mime_type,
                payload: MediaPayload::Url(url.clone()),
            }
        }
    };

    debug!(
        ordinal,
        kind = %item.kind,
        mime = item.mime_type,
        size = ?item.size_bytes(),
        "Resolved media"
    );
    Ok(item)
}

fn from_bytes(
    ordinal: usize,
    label: String,
    file_name: String,
    bytes: Vec<u8>,
    declared_mime: Option<&str>,
) -> Result<MediaItem, MediaError> {
    if bytes.is_empty() {
        return Err(MediaError::unreadable(label, "file is empty"));
    }

    let (kind, mime_type) = kind_from_extension(&file_name)
        .or_else(|| declared_mime.and_then(kind_from_mime))
        .or_else(|| sniff_kind(&bytes))
        .unwrap_or((MediaKind::Document, OCTET_STREAM));

    Ok(MediaItem {
        ordinal,
        label,
        file_name,
        kind,
        mime_type,
        payload: MediaPayload::Bytes(bytes),
    })
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "media".to_string())
}

fn url_file_name(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .unwrap_or("media")
        .to_string()
}

/// Detects kind and MIME type from the file extension
pub fn kind_from_extension(file_name: &str) -> Option<(MediaKind, &'static str)> {
    let ext = Path::new(file_name)
        .extension()?
        .to_string_lossy()
        .to_lowercase();

    let lookup = |table: &[(&str, &'static str)]| {
        table
            .iter()
            .find(|(candidate, _)| *candidate == ext)
            .map(|(_, mime)| *mime)
    };

    lookup(PHOTO_EXTENSIONS)
        .map(|mime| (MediaKind::Photo, mime))
        .or_else(|| lookup(VIDEO_EXTENSIONS).map(|mime| (MediaKind::Video, mime)))
}

fn kind_from_mime(mime: &str) -> Option<(MediaKind, &'static str)> {
    PHOTO_EXTENSIONS
        .iter()
        .find(|(_, known)| *known == mime)
        .map(|(_, known)| (MediaKind::Photo, *known))
        .or_else(|| {
            VIDEO_EXTENSIONS
                .iter()
                .find(|(_, known)| *known == mime)
                .map(|(_, known)| (MediaKind::Video, *known))
        })
}

/// Detects kind and MIME type from magic bytes
pub fn sniff_kind(bytes: &[u8]) -> Option<(MediaKind, &'static str)> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some((MediaKind::Photo, "image/jpeg"));
    }
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some((MediaKind::Photo, "image/png"));
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some((MediaKind::Photo, "image/gif"));
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some((MediaKind::Photo, "image/webp"));
    }
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        // HEIF shares the ISO-BMFF container but is not a video
        return match &bytes[8..12] {
            b"qt  " => Some((MediaKind::Video, "video/quicktime")),
            b"heic" | b"heix" | b"mif1" | b"msf1" => None,
            _ => Some((MediaKind::Video, "video/mp4")),
        };
    }
    if bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        return Some((MediaKind::Video, "video/webm"));
    }
    None
}

/// Splits a data URL into its declared MIME type and decoded bytes
///
/// A string without a `,` is treated as bare base64.
fn decode_data_url(data: &str) -> Result<(Option<String>, Vec<u8>), String> {
    let (header, encoded) = match data.split_once(',') {
        Some((header, encoded)) => (Some(header), encoded),
        None => (None, data),
    };

    let declared_mime = header
        .and_then(|h| h.strip_prefix("data:"))
        .and_then(|h| h.split(';').next())
        .filter(|mime| !mime.is_empty())
        .map(str::to_string);

    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| format!("invalid base64 payload: {}", e))?;

    Ok((declared_mime, bytes))
}
