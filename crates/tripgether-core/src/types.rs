// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the share hand-off.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one Share Extension invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShareInvocationId(pub Uuid);

impl ShareInvocationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ShareInvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ShareInvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content kinds an attachment can advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    /// A web link (`public.url`).
    Url,
    /// Unformatted text (`public.plain-text`).
    PlainText,
    /// Any text, possibly rich (`public.text`).
    Text,
    /// Still image. Advertised by the OS but never extracted.
    Image,
    /// Video. Advertised by the OS but never extracted.
    Movie,
    /// Local file reference. Advertised by the OS but never extracted.
    FileUrl,
}

impl ContentKind {
    /// Kinds the producer extracts, highest priority first.
    pub const EXTRACTION_PRIORITY: [ContentKind; 3] =
        [ContentKind::Url, ContentKind::PlainText, ContentKind::Text];

    /// Uniform type identifier used by the iOS item provider.
    pub fn type_identifier(&self) -> &'static str {
        match self {
            Self::Url => "public.url",
            Self::PlainText => "public.plain-text",
            Self::Text => "public.text",
            Self::Image => "public.image",
            Self::Movie => "public.movie",
            Self::FileUrl => "public.file-url",
        }
    }

    /// Parse a uniform type identifier.
    pub fn from_type_identifier(identifier: &str) -> Option<Self> {
        match identifier {
            "public.url" => Some(Self::Url),
            "public.plain-text" | "public.utf8-plain-text" => Some(Self::PlainText),
            "public.text" => Some(Self::Text),
            "public.image" | "public.jpeg" | "public.png" => Some(Self::Image),
            "public.movie" | "public.mpeg-4" => Some(Self::Movie),
            "public.file-url" => Some(Self::FileUrl),
            _ => None,
        }
    }

    /// Infer the kind from an Android intent MIME type.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        let lower = mime.to_ascii_lowercase();
        if lower == "text/plain" {
            Some(Self::PlainText)
        } else if lower == "text/uri-list" || lower == "text/x-uri" {
            Some(Self::Url)
        } else if lower.starts_with("text/") {
            Some(Self::Text)
        } else if lower.starts_with("image/") {
            Some(Self::Image)
        } else if lower.starts_with("video/") {
            Some(Self::Movie)
        } else if lower.is_empty() {
            None
        } else {
            Some(Self::FileUrl)
        }
    }

    /// Whether the producer ever extracts this kind.
    pub fn is_extractable(&self) -> bool {
        Self::EXTRACTION_PRIORITY.contains(self)
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_identifier())
    }
}

/// One string pulled out of an attachment, tagged with the kind it was
/// loaded as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedItem {
    pub kind: ContentKind,
    pub value: String,
}

/// Items captured from a single share action.
///
/// A batch is never empty; [`ShareBatch::new`] refuses an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<String>", try_from = "Vec<String>")]
pub struct ShareBatch(Vec<String>);

impl ShareBatch {
    /// Build a batch, or `None` when there is nothing to hand off.
    pub fn new(items: Vec<String>) -> Option<Self> {
        if items.is_empty() {
            None
        } else {
            Some(Self(items))
        }
    }

    pub fn items(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_items(self) -> Vec<String> {
        self.0
    }
}

impl From<ShareBatch> for Vec<String> {
    fn from(batch: ShareBatch) -> Self {
        batch.0
    }
}

impl TryFrom<Vec<String>> for ShareBatch {
    type Error = &'static str;

    fn try_from(items: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(items).ok_or("share batch must not be empty")
    }
}

/// Classification of errors, mirroring the hand-off's failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Shared namespace missing; the feature is disabled for this install.
    Configuration,
    /// One attachment could not be read. Siblings are unaffected.
    Extraction,
    /// A write did not durably commit. The next share is the retry.
    SyncFailure,
    /// Any other storage fault.
    Storage,
}

/// How a share request ended. Exactly one outcome is reported per
/// invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShareOutcome {
    /// A batch was appended to the queue.
    Queued { items: usize, queue_len: usize },
    /// Nothing extractable, or nothing passed the URL filter.
    Empty,
    /// The shared namespace could not be opened.
    ConfigurationError,
    /// The queue write did not commit.
    SyncFailed,
    /// Extraction did not finish inside the extension's lifetime budget.
    TimedOut,
    /// The completion handle was dropped without an explicit outcome.
    Abandoned,
}

impl ShareOutcome {
    /// Whether the share reached the queue.
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_is_rejected() {
        assert!(ShareBatch::new(Vec::new()).is_none());
        let batch = ShareBatch::new(vec!["https://a.example".into()]).expect("non-empty");
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn batch_serializes_as_plain_array() {
        let batch = ShareBatch::new(vec!["a".into(), "b".into()]).expect("non-empty");
        let json = serde_json::to_value(&batch).expect("serialize");
        assert_eq!(json, serde_json::json!(["a", "b"]));
    }

    #[test]
    fn empty_batch_does_not_deserialize() {
        assert!(serde_json::from_value::<ShareBatch>(serde_json::json!([])).is_err());
        let batch: ShareBatch =
            serde_json::from_value(serde_json::json!(["a"])).expect("deserialize");
        assert_eq!(batch.items(), ["a"]);
    }

    #[test]
    fn priority_is_url_then_plain_then_text() {
        assert_eq!(
            ContentKind::EXTRACTION_PRIORITY,
            [ContentKind::Url, ContentKind::PlainText, ContentKind::Text]
        );
        assert!(!ContentKind::Image.is_extractable());
    }

    #[test]
    fn mime_types_map_to_kinds() {
        assert_eq!(ContentKind::from_mime_type("text/plain"), Some(ContentKind::PlainText));
        assert_eq!(ContentKind::from_mime_type("image/jpeg"), Some(ContentKind::Image));
        assert_eq!(ContentKind::from_mime_type("video/mp4"), Some(ContentKind::Movie));
        assert_eq!(ContentKind::from_mime_type("application/pdf"), Some(ContentKind::FileUrl));
        assert_eq!(ContentKind::from_mime_type(""), None);
    }

    #[test]
    fn type_identifiers_parse() {
        for kind in ContentKind::EXTRACTION_PRIORITY {
            assert_eq!(ContentKind::from_type_identifier(kind.type_identifier()), Some(kind));
        }
        assert_eq!(ContentKind::from_type_identifier("com.adobe.pdf"), None);
    }
}
