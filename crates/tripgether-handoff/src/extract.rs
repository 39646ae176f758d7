// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Attachment extraction.
//
// A share request carries attachments that each advertise the content kinds
// they can materialise. Each attachment yields at most one item: the first
// kind it advertises in URL > plain text > text order is loaded and the
// others are ignored, even if that load fails.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, warn};

pub use tripgether_bridge::Attachment;
use tripgether_core::config::HandoffConfig;
use tripgether_core::error::{HandoffError, Result};
use tripgether_core::types::{ContentKind, ExtractedItem};

/// First extractable kind `attachment` advertises, by priority.
pub fn preferred_kind(attachment: &dyn Attachment) -> Option<ContentKind> {
    let advertised = attachment.kinds();
    ContentKind::EXTRACTION_PRIORITY
        .into_iter()
        .find(|kind| advertised.contains(kind))
}

/// Extract a single attachment. Failures are absorbed and yield `None`.
///
/// A load still pending at `deadline` counts as a failure.
pub async fn extract_item(
    attachment: &dyn Attachment,
    index: usize,
    deadline: Instant,
) -> Option<ExtractedItem> {
    let Some(kind) = preferred_kind(attachment) else {
        debug!(index, "attachment has no supported kind");
        return None;
    };

    match tokio::time::timeout_at(deadline, attachment.load(kind)).await {
        Ok(Ok(value)) => Some(ExtractedItem { kind, value }),
        Ok(Err(e)) => {
            warn!(index, %kind, error = %e, "attachment extraction failed");
            None
        }
        Err(_) => {
            warn!(index, %kind, "attachment extraction timed out");
            None
        }
    }
}

/// Extract every attachment concurrently, giving each until `timeout`
/// from now.
///
/// Output order follows attachment order; failed and expired attachments
/// are skipped.
pub async fn extract_all(attachments: &[Box<dyn Attachment>], timeout: Duration) -> Vec<ExtractedItem> {
    let deadline = Instant::now() + timeout;
    let loads = attachments
        .iter()
        .enumerate()
        .map(|(index, attachment)| extract_item(attachment.as_ref(), index, deadline));

    join_all(loads).await.into_iter().flatten().collect()
}

/// Keep the items that may be queued.
///
/// URLs always pass; other non-blank text passes only with
/// `retain_plain_text`. Items are stored exactly as extracted.
pub fn filter_batch(items: Vec<ExtractedItem>, config: &HandoffConfig) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.value)
        .filter(|value| {
            config.is_url(value) || (config.retain_plain_text && !value.trim().is_empty())
        })
        .collect()
}

/// Mask shared content for logs: first 10 characters, `***`, last 5.
pub fn mask(data: &str) -> String {
    let chars: Vec<char> = data.chars().collect();
    let head: String = chars.iter().take(10).collect();
    let tail: String = chars[chars.len().saturating_sub(5)..].iter().collect();
    format!("{head}***{tail}")
}

// ---------------------------------------------------------------------------
// StaticAttachment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Payload {
    Value(String),
    LoadError(String),
    WrongType(String),
}

/// Attachment with pre-materialised payloads.
///
/// Used by the desktop producer (command-line arguments become attachments)
/// and by tests, which also need failing and slow attachments.
#[derive(Debug, Clone, Default)]
pub struct StaticAttachment {
    payloads: Vec<(ContentKind, Payload)>,
    delay: Option<Duration>,
}

impl StaticAttachment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attachment for a piece of shared text: URLs advertise both the URL and
    /// plain-text kinds, as share sheets do.
    pub fn from_text(text: &str, config: &HandoffConfig) -> Self {
        let attachment = Self::new();
        if config.is_url(text) {
            attachment
                .with(ContentKind::Url, text)
                .with(ContentKind::PlainText, text)
        } else {
            attachment.with(ContentKind::PlainText, text)
        }
    }

    /// Advertise `kind`, loading as `value`.
    pub fn with(mut self, kind: ContentKind, value: impl Into<String>) -> Self {
        self.payloads.push((kind, Payload::Value(value.into())));
        self
    }

    /// Advertise `kind`, failing to load it.
    pub fn failing(mut self, kind: ContentKind, reason: impl Into<String>) -> Self {
        self.payloads.push((kind, Payload::LoadError(reason.into())));
        self
    }

    /// Advertise `kind`, delivering data of type `actual` instead.
    pub fn mismatched(mut self, kind: ContentKind, actual: impl Into<String>) -> Self {
        self.payloads.push((kind, Payload::WrongType(actual.into())));
        self
    }

    /// Sleep for `delay` before every load.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Attachment for StaticAttachment {
    fn kinds(&self) -> Vec<ContentKind> {
        self.payloads.iter().map(|(kind, _)| *kind).collect()
    }

    async fn load(&self, kind: ContentKind) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let payload = self
            .payloads
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, p)| p.clone())
            .ok_or_else(|| HandoffError::Extraction(format!("{kind} not advertised")))?;

        match payload {
            Payload::Value(value) => Ok(value),
            Payload::LoadError(reason) => Err(HandoffError::Extraction(reason)),
            Payload::WrongType(actual) => Err(HandoffError::UnexpectedItemType {
                expected: kind.to_string(),
                actual,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn boxed(attachment: StaticAttachment) -> Box<dyn Attachment> {
        Box::new(attachment)
    }

    fn soon() -> Instant {
        Instant::now() + TIMEOUT
    }

    #[tokio::test]
    async fn url_wins_over_text() {
        let attachment = StaticAttachment::new()
            .with(ContentKind::Text, "title")
            .with(ContentKind::Url, "https://a.example");

        let item = extract_item(&attachment, 0, soon()).await.expect("item");
        assert_eq!(item.kind, ContentKind::Url);
        assert_eq!(item.value, "https://a.example");
    }

    #[tokio::test]
    async fn failed_preferred_kind_drops_the_attachment() {
        let attachment = StaticAttachment::new()
            .failing(ContentKind::Url, "provider error")
            .with(ContentKind::PlainText, "https://fallback.example");

        assert!(extract_item(&attachment, 0, soon()).await.is_none());
    }

    #[tokio::test]
    async fn unsupported_kinds_yield_nothing() {
        let attachment = StaticAttachment::new()
            .with(ContentKind::Image, "file:///tmp/a.jpg")
            .with(ContentKind::Movie, "file:///tmp/a.mp4");
        assert!(preferred_kind(&attachment).is_none());
        assert!(extract_item(&attachment, 0, soon()).await.is_none());
    }

    #[tokio::test]
    async fn partial_extraction_keeps_order() {
        let attachments = vec![
            boxed(StaticAttachment::new().with(ContentKind::Url, "https://1.example")),
            boxed(StaticAttachment::new().mismatched(ContentKind::Url, "NSData")),
            boxed(
                StaticAttachment::new()
                    .with(ContentKind::Url, "https://3.example")
                    .delayed(Duration::from_millis(20)),
            ),
            boxed(StaticAttachment::new().with(ContentKind::Url, "https://4.example")),
        ];

        let values: Vec<String> = extract_all(&attachments, TIMEOUT)
            .await
            .into_iter()
            .map(|item| item.value)
            .collect();
        assert_eq!(
            values,
            vec!["https://1.example", "https://3.example", "https://4.example"]
        );
    }

    #[tokio::test]
    async fn expired_attachment_is_skipped() {
        let attachments = vec![
            boxed(StaticAttachment::new().with(ContentKind::Url, "https://1.example")),
            boxed(
                StaticAttachment::new()
                    .with(ContentKind::Url, "https://slow.example")
                    .delayed(Duration::from_secs(10)),
            ),
            boxed(StaticAttachment::new().with(ContentKind::Url, "https://3.example")),
        ];

        let values: Vec<String> = extract_all(&attachments, Duration::from_millis(50))
            .await
            .into_iter()
            .map(|item| item.value)
            .collect();
        assert_eq!(values, vec!["https://1.example", "https://3.example"]);
    }

    #[test]
    fn filter_drops_plain_text_by_default() {
        let items = vec![
            ExtractedItem {
                kind: ContentKind::Url,
                value: "https://a.example".into(),
            },
            ExtractedItem {
                kind: ContentKind::PlainText,
                value: "look at this".into(),
            },
            ExtractedItem {
                kind: ContentKind::PlainText,
                value: "  http://b.example  ".into(),
            },
        ];

        let config = HandoffConfig::default();
        assert_eq!(filter_batch(items.clone(), &config), vec!["https://a.example"]);

        let config = HandoffConfig {
            retain_plain_text: true,
            ..Default::default()
        };
        assert_eq!(
            filter_batch(items, &config),
            vec!["https://a.example", "look at this", "  http://b.example  "]
        );
    }

    #[test]
    fn mask_keeps_head_and_tail() {
        assert_eq!(
            mask("https://www.example.com/abcde"),
            "https://ww***abcde"
        );
        assert_eq!(mask("short"), "short***short");
        assert_eq!(mask(""), "***");
    }

    #[test]
    fn text_attachment_advertises_url_when_it_is_one() {
        let config = HandoffConfig::default();
        let url = StaticAttachment::from_text("https://a.example", &config);
        assert_eq!(preferred_kind(&url), Some(ContentKind::Url));

        let text = StaticAttachment::from_text("hello", &config);
        assert_eq!(preferred_kind(&text), Some(ContentKind::PlainText));
    }
}
