// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android share intents as attachments.
//
// The JNI side (`android::share_intent`) only copies the intent fields out of
// the JVM. Turning them into attachments happens here so it can be tested
// off-device.

use async_trait::async_trait;
use tracing::debug;

use tripgether_core::error::{HandoffError, Result};
use tripgether_core::types::ContentKind;

use crate::traits::Attachment;

/// `Intent.ACTION_SEND`.
pub const ACTION_SEND: &str = "android.intent.action.SEND";
/// `Intent.ACTION_SEND_MULTIPLE`.
pub const ACTION_SEND_MULTIPLE: &str = "android.intent.action.SEND_MULTIPLE";
/// `Intent.EXTRA_TEXT`.
pub const EXTRA_TEXT: &str = "android.intent.extra.TEXT";
/// `Intent.EXTRA_STREAM`.
pub const EXTRA_STREAM: &str = "android.intent.extra.STREAM";

/// The parts of an inbound share `Intent` the hand-off reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareIntent {
    pub action: Option<String>,
    pub mime_type: Option<String>,
    /// `EXTRA_TEXT`.
    pub text: Option<String>,
    /// `EXTRA_STREAM` content URIs, one per shared file.
    pub streams: Vec<String>,
}

impl ShareIntent {
    /// Attachments carried by this intent, in intent order.
    ///
    /// `ACTION_SEND` with a `text/*` type carries its payload in
    /// `EXTRA_TEXT`; every other share carries content URIs in
    /// `EXTRA_STREAM`. Intents with any other action carry nothing.
    pub fn into_attachments(self) -> Vec<Box<dyn Attachment>> {
        let mime = self.mime_type.unwrap_or_default();
        let kind = ContentKind::from_mime_type(&mime);

        let values: Vec<String> = match self.action.as_deref() {
            Some(ACTION_SEND) if mime.to_ascii_lowercase().starts_with("text/") => {
                self.text.into_iter().filter(|t| !t.is_empty()).collect()
            }
            Some(ACTION_SEND) => self.streams.into_iter().take(1).collect(),
            Some(ACTION_SEND_MULTIPLE) => self.streams,
            other => {
                debug!(action = ?other, "intent is not a share");
                Vec::new()
            }
        };

        let Some(kind) = kind else {
            debug!(mime, "share intent without a usable type");
            return Vec::new();
        };

        values
            .into_iter()
            .map(|value| Box::new(IntentAttachment { kind, value }) as Box<dyn Attachment>)
            .collect()
    }
}

/// A single intent extra. Already materialised when the intent arrived.
#[derive(Debug, Clone)]
pub struct IntentAttachment {
    kind: ContentKind,
    value: String,
}

#[async_trait]
impl Attachment for IntentAttachment {
    fn kinds(&self) -> Vec<ContentKind> {
        vec![self.kind]
    }

    async fn load(&self, kind: ContentKind) -> Result<String> {
        if kind != self.kind {
            return Err(HandoffError::UnexpectedItemType {
                expected: kind.to_string(),
                actual: self.kind.to_string(),
            });
        }
        Ok(self.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(action: &str, mime: &str) -> ShareIntent {
        ShareIntent {
            action: Some(action.into()),
            mime_type: Some(mime.into()),
            ..Default::default()
        }
    }

    async fn loaded(attachments: Vec<Box<dyn Attachment>>) -> Vec<(ContentKind, String)> {
        let mut out = Vec::new();
        for attachment in attachments {
            let kind = attachment.kinds()[0];
            out.push((kind, attachment.load(kind).await.expect("load")));
        }
        out
    }

    #[tokio::test]
    async fn shared_text_becomes_plain_text() {
        let share = ShareIntent {
            text: Some("https://a.example".into()),
            ..intent(ACTION_SEND, "text/plain")
        };
        assert_eq!(
            loaded(share.into_attachments()).await,
            vec![(ContentKind::PlainText, "https://a.example".into())]
        );
    }

    #[tokio::test]
    async fn single_image_uses_the_stream() {
        let share = ShareIntent {
            streams: vec!["content://media/1".into()],
            ..intent(ACTION_SEND, "image/jpeg")
        };
        let attachments = share.into_attachments();
        assert_eq!(attachments.len(), 1);
        assert!(!attachments[0].kinds()[0].is_extractable());
    }

    #[tokio::test]
    async fn multiple_streams_keep_order() {
        let share = ShareIntent {
            streams: vec!["content://a".into(), "content://b".into()],
            ..intent(ACTION_SEND_MULTIPLE, "application/pdf")
        };
        assert_eq!(
            loaded(share.into_attachments()).await,
            vec![
                (ContentKind::FileUrl, "content://a".into()),
                (ContentKind::FileUrl, "content://b".into()),
            ]
        );
    }

    #[test]
    fn empty_text_and_foreign_actions_yield_nothing() {
        let share = ShareIntent {
            text: Some(String::new()),
            ..intent(ACTION_SEND, "text/plain")
        };
        assert!(share.into_attachments().is_empty());

        let main = ShareIntent {
            text: Some("https://a.example".into()),
            ..intent("android.intent.action.MAIN", "text/plain")
        };
        assert!(main.into_attachments().is_empty());

        assert!(ShareIntent::default().into_attachments().is_empty());
    }

    #[tokio::test]
    async fn wrong_kind_is_rejected() {
        let share = ShareIntent {
            text: Some("hello".into()),
            ..intent(ACTION_SEND, "text/plain")
        };
        let attachment = share.into_attachments().remove(0);
        assert!(attachment.load(ContentKind::Url).await.is_err());
    }
}
