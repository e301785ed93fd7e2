//! Raw source messages and media classification.

use serde::{Deserialize, Serialize};

/// The closed set of media kinds the source can carry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Document,
    Audio,
}

impl MediaKind {
    /// Stable numeric tag used when packing the record identity.
    pub fn discriminant(&self) -> i32 {
        match self {
            MediaKind::Video => 1,
            MediaKind::Document => 2,
            MediaKind::Audio => 3,
        }
    }
}

/// The media attachment of a message, as handed over by the source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaPayload {
    /// What the source says this attachment is
    pub kind: MediaKind,

    /// Original file name, possibly empty
    pub file_name: String,

    /// File size in bytes
    pub size_bytes: u64,

    /// Data-center the file lives in
    pub dc_id: i32,

    /// Source-assigned media identifier
    pub media_id: i64,

    /// Source-assigned access hash
    pub access_hash: i64,
}

/// One message pulled from the source channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawMessage {
    /// Position of the message in the channel, used as the crawl cursor
    pub id: i64,

    /// Media attachment, absent for plain text/service messages
    pub media: Option<MediaPayload>,

    /// Message caption, if any
    pub caption: Option<String>,
}

/// Document extensions the catalog accepts.
const DOCUMENT_EXTENSIONS: &[&str] = &[".pdf", ".php"];

/// Outcome of classifying a raw message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified<'a> {
    /// A video file; always indexable
    Video(&'a MediaPayload),
    /// A document with a whitelisted extension
    Document(&'a MediaPayload),
    /// Not a media message, or a media kind/shape we do not index
    Unsupported,
}

/// Decide whether a message carries indexable media.
///
/// Videos are always accepted. Documents must carry a whitelisted
/// extension. Audio and everything else is skipped.
pub fn classify(message: &RawMessage) -> Classified<'_> {
    let Some(media) = message.media.as_ref() else {
        return Classified::Unsupported;
    };

    match media.kind {
        MediaKind::Video => Classified::Video(media),
        MediaKind::Document => {
            let name = media.file_name.to_lowercase();
            if !name.is_empty() && DOCUMENT_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
                Classified::Document(media)
            } else {
                Classified::Unsupported
            }
        }
        MediaKind::Audio => Classified::Unsupported,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_with(kind: MediaKind, file_name: &str) -> RawMessage {
        RawMessage {
            id: 100,
            media: Some(MediaPayload {
                kind,
                file_name: file_name.to_string(),
                size_bytes: 1024,
                dc_id: 2,
                media_id: 42,
                access_hash: 7,
            }),
            caption: None,
        }
    }

    #[test]
    fn test_video_always_accepted() {
        let msg = message_with(MediaKind::Video, "");
        assert!(matches!(classify(&msg), Classified::Video(_)));
    }

    #[test]
    fn test_document_extension_whitelist() {
        let pdf = message_with(MediaKind::Document, "Handbook.PDF");
        assert!(matches!(classify(&pdf), Classified::Document(_)));

        let exe = message_with(MediaKind::Document, "setup.exe");
        assert_eq!(classify(&exe), Classified::Unsupported);

        let unnamed = message_with(MediaKind::Document, "");
        assert_eq!(classify(&unnamed), Classified::Unsupported);
    }

    #[test]
    fn test_audio_and_plain_messages_skipped() {
        let audio = message_with(MediaKind::Audio, "song.mp3");
        assert_eq!(classify(&audio), Classified::Unsupported);

        let plain = RawMessage {
            id: 1,
            media: None,
            caption: Some("no attachment".into()),
        };
        assert_eq!(classify(&plain), Classified::Unsupported);
    }
}
