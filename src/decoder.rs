//! Raw event decoding.
//!
//! Turns raw sync events into typed [`Message`] values: resolves both
//! endpoints against the directory, normalizes text markup and fetches
//! out-of-band payloads (images, location thumbnails) where the event only
//! carries a reference.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::directory::ContactDirectory;
use crate::emoji::replace_emoji;
use crate::protocol::{Api, LoginSession, RawMessage};
use crate::transport::TransportError;
use crate::types::{Message, MessageContent, MsgType, SUB_MSG_TYPE_LOCATION};

lazy_static! {
    static ref CDN_URL: Regex = Regex::new(r#"cdnurl\s*=\s*"([^"]+)""#).unwrap();
}

#[derive(Debug, Error)]
pub enum DecodeError {
    /// Sender or recipient still unknown after the directory was given a
    /// chance to fetch it.
    #[error("unknown contact {0}")]
    UnknownContact(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Decode one raw event. Returns `Ok(None)` for kinds the client does not
/// publish (voice, video, system notices and the rest); unknown kind codes
/// are dropped the same way, never treated as fatal.
pub async fn decode(
    api: &dyn Api,
    session: &LoginSession,
    directory: &ContactDirectory,
    raw: &RawMessage,
) -> Result<Option<Message>, DecodeError> {
    let from = directory
        .get(&raw.from_username)
        .ok_or_else(|| DecodeError::UnknownContact(raw.from_username.clone()))?;
    let to = directory
        .get(&raw.to_username)
        .ok_or_else(|| DecodeError::UnknownContact(raw.to_username.clone()))?;

    let kind = match MsgType::from_code(raw.msg_type) {
        Some(kind) => kind,
        None => {
            debug!(msg_type = raw.msg_type, "dropping event of unknown kind");
            return Ok(None);
        }
    };

    let content = match kind {
        MsgType::Text if raw.sub_msg_type == SUB_MSG_TYPE_LOCATION => {
            let thumb = api.get_location_thumb(session, &raw.msg_id).await?;
            MessageContent::Location {
                thumbnail: BASE64.encode(thumb),
            }
        }
        MsgType::Text => MessageContent::Text {
            text: normalize_text(&raw.content),
        },
        MsgType::Image => {
            let payload = api.get_msg_img(session, &raw.msg_id).await?;
            MessageContent::Image {
                payload: BASE64.encode(payload),
            }
        }
        MsgType::Emotion => MessageContent::Emotion {
            // Built-in stickers carry no cdnurl attribute; publish an empty
            // URL for those instead of failing.
            cdn_url: extract_cdn_url(&raw.content),
        },
        _ => {
            debug!(msg_type = raw.msg_type, "unhandled event kind");
            return Ok(None);
        }
    };

    Ok(Some(Message {
        msg_id: raw.msg_id.clone(),
        from: from.clone(),
        to: to.clone(),
        content,
        create_time: raw.create_time,
    }))
}

/// Unescape the HTML entities the server embeds in text bodies, then swap
/// emoji spans for their glyphs.
pub fn normalize_text(content: &str) -> String {
    replace_emoji(&unescape_entities(content))
}

fn extract_cdn_url(content: &str) -> String {
    let unescaped = unescape_entities(content);
    CDN_URL
        .captures(&unescaped)
        .map(|caps| caps[1].to_string())
        .unwrap_or_default()
}

fn unescape_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let Some(semi) = rest.find(';') else {
            break;
        };
        let entity = &rest[..=semi];
        match entity {
            "&amp;" => out.push('&'),
            "&lt;" => out.push('<'),
            "&gt;" => out.push('>'),
            "&quot;" => out.push('"'),
            "&#39;" | "&apos;" => out.push('\''),
            "&nbsp;" => out.push(' '),
            _ => {
                // Numeric references; anything else passes through as-is.
                let parsed = entity
                    .strip_prefix("&#")
                    .and_then(|e| e.strip_suffix(';'))
                    .and_then(|digits| {
                        if let Some(hex) = digits.strip_prefix('x').or(digits.strip_prefix('X')) {
                            u32::from_str_radix(hex, 16).ok()
                        } else {
                            digits.parse::<u32>().ok()
                        }
                    })
                    .and_then(char::from_u32);
                match parsed {
                    Some(c) => out.push(c),
                    None => {
                        out.push('&');
                        rest = &rest[1..];
                        continue;
                    }
                }
            }
        }
        rest = &rest[semi + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RawContact;
    use crate::testutil::MockApi;

    fn directory() -> ContactDirectory {
        let mut dir = ContactDirectory::new("@self");
        dir.apply_batch(&[
            RawContact {
                username: "@self".into(),
                nickname: "Me".into(),
                ..Default::default()
            },
            RawContact {
                username: "@alice".into(),
                nickname: "Alice".into(),
                ..Default::default()
            },
        ]);
        dir
    }

    fn raw(msg_type: i64, sub: i64, content: &str) -> RawMessage {
        RawMessage {
            msg_id: "77".into(),
            from_username: "@alice".into(),
            to_username: "@self".into(),
            msg_type,
            sub_msg_type: sub,
            content: content.into(),
            create_time: 42,
        }
    }

    #[tokio::test]
    async fn test_decode_text() {
        let api = MockApi::new();
        let session = LoginSession::default();
        let msg = decode(&api, &session, &directory(), &raw(1, 0, "hi &amp; bye"))
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(msg.content, MessageContent::Text { ref text } if text == "hi & bye"));
        assert_eq!(msg.from.nickname(), "Alice");
    }

    #[tokio::test]
    async fn test_decode_location_retags_and_fetches_thumbnail() {
        let api = MockApi::new();
        let session = LoginSession::default();
        let msg = decode(&api, &session, &directory(), &raw(1, 48, "loc"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.to_json().msg_type, SUB_MSG_TYPE_LOCATION);
        assert!(matches!(msg.content, MessageContent::Location { .. }));
        assert!(api.calls().contains(&"get_location_thumb:77".to_string()));
    }

    #[tokio::test]
    async fn test_decode_image_fetches_payload() {
        let api = MockApi::new();
        let session = LoginSession::default();
        let msg = decode(&api, &session, &directory(), &raw(3, 0, ""))
            .await
            .unwrap()
            .unwrap();
        let MessageContent::Image { payload } = msg.content else {
            panic!("expected image content");
        };
        assert_eq!(payload, BASE64.encode(b"bytes"));
    }

    #[tokio::test]
    async fn test_decode_voice_dropped_without_fetch() {
        // Voice and video carry out-of-band payloads the client does not
        // publish; the event is dropped without hitting any fetch endpoint.
        let api = MockApi::new();
        let session = LoginSession::default();
        let result = decode(&api, &session, &directory(), &raw(34, 0, ""))
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_decode_unknown_kind_dropped() {
        let api = MockApi::new();
        let session = LoginSession::default();
        let result = decode(&api, &session, &directory(), &raw(9999, 0, ""))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_decode_unknown_sender_is_error() {
        let api = MockApi::new();
        let session = LoginSession::default();
        let mut event = raw(1, 0, "hi");
        event.from_username = "@ghost".into();
        let err = decode(&api, &session, &directory(), &event)
            .await
            .unwrap_err();
        assert!(matches!(err, DecodeError::UnknownContact(u) if u == "@ghost"));
    }

    #[test]
    fn test_unescape_entities() {
        assert_eq!(unescape_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(unescape_entities("&quot;hi&quot;"), "\"hi\"");
        assert_eq!(unescape_entities("&#20320;&#22909;"), "你好");
        assert_eq!(unescape_entities("&#x4f60;"), "你");
    }

    #[test]
    fn test_unescape_leaves_bare_ampersand() {
        assert_eq!(unescape_entities("a & b"), "a & b");
        assert_eq!(unescape_entities("trailing &"), "trailing &");
        assert_eq!(unescape_entities("&bogus; x"), "&bogus; x");
    }

    #[test]
    fn test_normalize_text_entities_then_emoji() {
        let raw = r#"hi &lt;b&gt; <span class="emoji emoji1f602"></span>"#;
        assert_eq!(normalize_text(raw), "hi <b> 😂");
    }

    #[test]
    fn test_extract_cdn_url() {
        let content = "&lt;msg&gt;&lt;emoji cdnurl = \"http://emoji.example/a.gif\" /&gt;&lt;/msg&gt;";
        assert_eq!(extract_cdn_url(content), "http://emoji.example/a.gif");
    }

    #[test]
    fn test_extract_cdn_url_builtin_sticker() {
        // Built-in stickers come without a cdnurl attribute.
        assert_eq!(extract_cdn_url("&lt;msg&gt;&lt;emoji type=\"2\"/&gt;&lt;/msg&gt;"), "");
    }
}
