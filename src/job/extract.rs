//! Locates the authoritative video URL in a backend's untyped output.
//!
//! Backends do not standardize their result encoding: the output may be a
//! bare CDN URL, an array of asset URLs, or an arbitrarily nested object.
//! This module is the system's only defense against that variability.

use serde_json::{Map, Value};
use url::Url;

/// Conventional key names probed, in order, when the output is a mapping.
const RESULT_KEYS: [&str; 7] = [
    "video",
    "video_url",
    "videoUrl",
    "url",
    "output",
    "file",
    "mp4",
];

/// File extensions that identify a playable video asset.
const VIDEO_EXTENSIONS: [&str; 5] = [".mp4", ".webm", ".mov", ".m4v", ".avi"];

/// Recursion ceiling. Well-behaved backends return shallow payloads; a
/// malformed one must not overflow the stack.
const MAX_DEPTH: usize = 8;

/// Extracts the single authoritative video URL from a raw backend output
/// value, or `None` if no playable result is resolvable yet.
///
/// Depth-first and deterministic. A mapping is probed through a fixed list of
/// conventional keys before falling back to a scan of all its values; an
/// int-indexed mapping is treated as a sequence. A video-like value nested
/// under an unrecognized key inside another unrecognized key is not found;
/// an accepted limitation of the heuristic, not something to widen.
pub fn extract_video_url(raw: &Value) -> Option<String> {
    extract_at_depth(raw, 0)
}

fn extract_at_depth(value: &Value, depth: usize) -> Option<String> {
    if depth > MAX_DEPTH {
        return None;
    }
    match value {
        Value::String(s) => video_url_candidate(s),
        Value::Array(items) => extract_from_sequence(items, depth),
        Value::Object(map) => {
            if let Some(items) = int_indexed_values(map) {
                return extract_from_sequence(&items, depth);
            }
            for key in RESULT_KEYS {
                match map.get(key) {
                    None | Some(Value::Null) => continue,
                    Some(Value::String(s)) if s.is_empty() => continue,
                    Some(candidate) => {
                        if let Some(found) = extract_at_depth(candidate, depth + 1) {
                            return Some(found);
                        }
                    }
                }
            }
            // Last resort: any bare string value that looks like a video URL.
            map.values()
                .find_map(|v| v.as_str().and_then(video_url_candidate))
        }
        _ => None,
    }
}

/// First string element that qualifies wins; when none does and the first
/// element is itself a nested structure, recurse into it (the
/// array-of-richer-objects case).
fn extract_from_sequence(items: &[Value], depth: usize) -> Option<String> {
    for item in items {
        if let Value::String(s) = item {
            if let Some(found) = video_url_candidate(s) {
                return Some(found);
            }
        }
    }
    match items.first() {
        Some(first @ (Value::Array(_) | Value::Object(_))) => extract_at_depth(first, depth + 1),
        _ => None,
    }
}

/// A string qualifies only as an absolute http(s) URL that either carries a
/// video file extension or the substring "video"; providers routinely return
/// extension-less CDN URLs with a descriptive path segment instead.
fn video_url_candidate(s: &str) -> Option<String> {
    let lower = s.to_ascii_lowercase();
    let looks_like_video =
        VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) || lower.contains("video");
    if !looks_like_video {
        return None;
    }
    let parsed = Url::parse(s).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    Some(s.to_string())
}

/// Treats `{"0": ..., "1": ...}` as a sequence ordered by its indices.
fn int_indexed_values(map: &Map<String, Value>) -> Option<Vec<Value>> {
    if map.is_empty() {
        return None;
    }
    let mut indexed: Vec<(usize, &Value)> = Vec::with_capacity(map.len());
    for (key, value) in map {
        indexed.push((key.parse::<usize>().ok()?, value));
    }
    indexed.sort_by_key(|(index, _)| *index);
    Some(indexed.into_iter().map(|(_, value)| value.clone()).collect())
}
