// src/normalize.rs

//! Deterministic text normalization and quality detection.
//!
//! Raw file names and captions arrive full of release-tag noise:
//! `@uploader` handles, `[bracketed]` tags, dotted separators, trailing
//! extensions. Indexing and querying must run the exact same pipeline so
//! that records and queries stay comparable.

use std::sync::OnceLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::models::Quality;

/// File extensions dropped from names before tokenization.
const MEDIA_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "webm", "mov", "m4v", "wmv", "flv", "ts", "mp3", "m4a", "flac", "wav",
    "ogg", "pdf", "php", "zip", "rar", "7z", "srt",
];

fn mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@\w+").unwrap())
}

fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[_\-.+]+").unwrap())
}

/// Result of normalizing a raw name/caption pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// Lower-cased tokens the text index is built over
    pub search_tokens: String,
    /// Quality tag detected from name and caption together
    pub quality: Quality,
}

/// Normalize a raw file name and caption into index-ready form.
///
/// Applying this to its own output changes nothing: the second pass finds
/// no mentions, no separators and no extension left to strip.
pub fn normalize(raw_name: &str, raw_caption: &str) -> Normalized {
    let name_tokens = normalize_text(&strip_extension(raw_name));
    let caption_tokens = normalize_text(raw_caption);

    let search_tokens = if caption_tokens.is_empty() {
        name_tokens
    } else if name_tokens.is_empty() {
        caption_tokens
    } else {
        format!("{name_tokens} {caption_tokens}")
    };

    let quality = detect_quality(&format!("{raw_name} {raw_caption}"));

    Normalized {
        search_tokens,
        quality,
    }
}

/// Canonicalize one piece of text: drop `@handle` mentions, treat
/// bracket/parenthesis characters and punctuation runs as separators,
/// lower-case, and collapse whitespace.
///
/// Bracket *contents* survive: a `[1080p]` tag must index the same as a
/// bare `1080p`.
pub fn normalize_text(text: &str) -> String {
    let no_mentions = mention_re().replace_all(text, " ");
    // Underscores glue words together under UAX#29, so separators must be
    // flattened before segmentation.
    let spaced = separator_re().replace_all(&no_mentions, " ");
    let lowered = spaced.to_lowercase();

    lowered.unicode_words().collect::<Vec<_>>().join(" ")
}

/// Human-facing display name: mentions dropped, separator runs flattened
/// to spaces, extension removed, original casing kept.
pub fn display_name(raw_name: &str) -> String {
    let stripped = strip_extension(raw_name);
    let no_mentions = mention_re().replace_all(&stripped, " ");
    let spaced = separator_re().replace_all(&no_mentions, " ");

    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Detect the quality tag with fixed precedence: higher resolutions win
/// when a name mentions several.
pub fn detect_quality(text: &str) -> Quality {
    let t = text.to_lowercase();
    if t.contains("2160") || t.contains("4k") {
        Quality::P2160
    } else if t.contains("1080") {
        Quality::P1080
    } else if t.contains("720") {
        Quality::P720
    } else if t.contains("480") {
        Quality::P480
    } else {
        Quality::Unknown
    }
}

/// Cut a known media extension off the end of a name.
fn strip_extension(name: &str) -> String {
    let lower = name.to_lowercase();
    for ext in MEDIA_EXTENSIONS {
        let suffix = format!(".{ext}");
        if lower.ends_with(&suffix) {
            return name[..name.len() - suffix.len()].to_string();
        }
    }
    name.to_string()
}
