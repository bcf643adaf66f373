//! Message context builder — normalizes a raw delivery into a
//! [`ProcessingContext`].
//!
//! Missing optional metadata never fails the build. The only failure is a
//! payload that contradicts its own self-describing content type (invalid
//! JSON, invalid UTF-8 for a text type, non-ASCII bytes under `us-ascii`, or
//! an unsupported text charset).

use chrono::Utc;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::config::{CONTENT_TYPE_KEY, DEFAULT_CONTENT_TYPE};
use crate::error::MessageError;
use crate::message::context::ProcessingContext;
use crate::message::types::{
    CORRELATION_ID_HEADER, InboundMessage, MESSAGE_ID_HEADER, SOAP_ACTION_HEADER,
    TransportHeaders, TransportMetadata,
};

/// Charsets accepted for textual payloads.
const SUPPORTED_CHARSETS: &[&str] = &["utf-8", "utf8", "us-ascii"];

/// Builds processing contexts from raw deliveries.
#[derive(Debug, Clone)]
pub struct MessageContextBuilder {
    default_content_type: String,
}

impl Default for MessageContextBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_CONTENT_TYPE)
    }
}

impl MessageContextBuilder {
    pub fn new(default_content_type: impl Into<String>) -> Self {
        Self {
            default_content_type: default_content_type.into(),
        }
    }

    /// Build a fresh context for one delivery.
    ///
    /// `content_type_override` wins over the message's own content type and is
    /// also recorded on the context under [`CONTENT_TYPE_KEY`].
    pub fn build(
        &self,
        metadata: &TransportMetadata,
        payload: &[u8],
        content_type_override: Option<&str>,
    ) -> Result<ProcessingContext, MessageError> {
        let override_ct = content_type_override.filter(|s| !s.trim().is_empty());
        let raw_content_type = override_ct
            .or(metadata.content_type.as_deref().filter(|s| !s.trim().is_empty()))
            .unwrap_or(&self.default_content_type);

        let parsed = ContentType::parse(raw_content_type)?;
        let charset = parsed.charset.or_else(|| {
            metadata
                .content_encoding
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_ascii_lowercase)
        });

        validate_payload(&parsed.media_type, charset.as_deref(), payload)?;

        let message_id = metadata
            .message_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let headers = transport_headers(metadata, &message_id);
        let operation = headers
            .get(SOAP_ACTION_HEADER)
            .map(String::as_str)
            .and_then(non_blank)
            .or_else(|| metadata.message_type.as_deref().and_then(non_blank))
            .map(str::to_string);

        debug!(
            delivery_tag = metadata.delivery_tag,
            content_type = %parsed.media_type,
            header_count = headers.len(),
            "Built processing context"
        );

        let message = InboundMessage {
            delivery_tag: metadata.delivery_tag,
            content_type: parsed.media_type,
            charset,
            headers,
            correlation_id: metadata.correlation_id.clone(),
            reply_to: metadata.reply_to.clone(),
            message_id,
            operation,
            redelivered: metadata.redelivered,
            received_at: Utc::now(),
            body: payload.to_vec(),
        };

        let mut ctx = ProcessingContext::new(message);
        if let Some(ct) = override_ct {
            ctx.set_property(CONTENT_TYPE_KEY, ct.trim());
        }
        Ok(ctx)
    }
}

// ── Content type ────────────────────────────────────────────────────

/// Media type plus the optional `charset` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContentType {
    pub media_type: String,
    pub charset: Option<String>,
}

impl ContentType {
    pub(crate) fn parse(raw: &str) -> Result<Self, MessageError> {
        let mut parts = raw.split(';');
        let media_type = parts.next().unwrap_or_default().trim().to_ascii_lowercase();

        match media_type.split_once('/') {
            Some((top, sub)) if !top.is_empty() && !sub.is_empty() && !sub.contains('/') => {}
            _ => return Err(MessageError::InvalidContentType(raw.to_string())),
        }

        let charset = parts
            .filter_map(|param| param.split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
            .map(|(_, value)| value.trim().trim_matches('"').to_ascii_lowercase())
            .filter(|s| !s.is_empty());

        Ok(Self {
            media_type,
            charset,
        })
    }
}

fn non_blank(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

fn is_json(media_type: &str) -> bool {
    media_type == "application/json" || media_type.ends_with("+json")
}

fn is_xml(media_type: &str) -> bool {
    media_type == "application/xml" || media_type.ends_with("+xml")
}

fn validate_payload(
    media_type: &str,
    charset: Option<&str>,
    payload: &[u8],
) -> Result<(), MessageError> {
    let json = is_json(media_type);
    let textual = json || is_xml(media_type) || media_type.starts_with("text/");
    if !textual {
        return Ok(());
    }

    if let Some(charset) = charset {
        if !SUPPORTED_CHARSETS.contains(&charset) {
            return Err(MessageError::UnsupportedCharset {
                content_type: media_type.to_string(),
                charset: charset.to_string(),
            });
        }
    }

    let text = std::str::from_utf8(payload).map_err(|e| MessageError::InvalidUtf8 {
        content_type: media_type.to_string(),
        offset: e.valid_up_to(),
    })?;

    if charset == Some("us-ascii") {
        if let Some(offset) = payload.iter().position(|b| !b.is_ascii()) {
            return Err(MessageError::NonAscii {
                content_type: media_type.to_string(),
                offset,
            });
        }
    }

    if json {
        serde_json::from_str::<Value>(text).map_err(|source| MessageError::MalformedJson {
            content_type: media_type.to_string(),
            source,
        })?;
    }
    Ok(())
}

/// Flatten broker headers to strings and expose identity fields.
fn transport_headers(metadata: &TransportMetadata, message_id: &str) -> TransportHeaders {
    let mut headers = TransportHeaders::new();

    if let Some(raw) = &metadata.headers {
        for (key, value) in raw {
            let rendered = match value {
                Value::Null => continue,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            headers.insert(key.clone(), rendered);
        }
    }

    if let Some(corr) = &metadata.correlation_id {
        headers.insert(CORRELATION_ID_HEADER.to_string(), corr.clone());
    }
    headers.insert(MESSAGE_ID_HEADER.to_string(), message_id.to_string());
    headers
}
