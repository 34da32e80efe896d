//! Source classification
//!
//! Decides whether an incoming source URL points at an adaptive manifest or
//! a progressive file. Purely syntactic; no network I/O. The heuristics are
//! ordered and deliberately loose: manifest URLs in the wild carry query
//! strings, token segments, and extensionless origin-server names that a
//! strict extension check would miss.

use url::Url;

const MANIFEST_EXTENSION: &str = ".m3u8";

/// What a source URL resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Adaptive manifest describing renditions and segments
    Manifest,
    /// Single progressive file
    File,
}

impl SourceKind {
    pub fn is_manifest(&self) -> bool {
        matches!(self, SourceKind::Manifest)
    }
}

/// Classify a source URL
///
/// Malformed URLs never fail classification; they fall back to a raw
/// substring check for the manifest extension.
pub fn classify(source: &str) -> SourceKind {
    match Url::parse(source) {
        Ok(url) => {
            if is_manifest_url(&url) {
                SourceKind::Manifest
            } else {
                SourceKind::File
            }
        }
        Err(_) => {
            if source.to_ascii_lowercase().contains(MANIFEST_EXTENSION) {
                SourceKind::Manifest
            } else {
                SourceKind::File
            }
        }
    }
}

fn is_manifest_url(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();

    // Manifest file extension, with or without query strings
    if path.ends_with(MANIFEST_EXTENSION) {
        return true;
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    // CDN path convention for adaptive streams
    if segments.iter().any(|s| *s == "hls") {
        return true;
    }

    // Origin-server manifest naming: an extensionless master/playlist-style
    // final segment only counts when another signal marks the URL as a
    // stream, so plain sites like /index.html stay direct
    if let Some(last) = segments.last() {
        let stem = last.split_once('.').map(|(s, _)| s).unwrap_or(last);
        if matches!(stem, "master" | "playlist" | "manifest" | "index") {
            let query_hint = url
                .query()
                .map(|q| q.to_ascii_lowercase().contains("m3u8"))
                .unwrap_or(false);
            let path_hint = segments.iter().any(|s| matches!(*s, "live" | "streaming"));
            if query_hint || path_hint {
                return true;
            }
        }
    }

    false
}
