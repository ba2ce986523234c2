//! Typed inbound messages decoded from raw sync events.

use serde::{Deserialize, Serialize};

use crate::types::Contact;

/// Numeric message kinds used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgType {
    Text,
    Image,
    File,
    Voice,
    Card,
    Video,
    Emotion,
    Link,
    Call,
    ContactsInfo,
    Video2,
    System,
    Revoke,
}

impl MsgType {
    /// Map a wire code to a known kind. Unknown codes return `None` and the
    /// event is dropped by the caller, never treated as fatal.
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            1 => MsgType::Text,
            3 => MsgType::Image,
            6 => MsgType::File,
            34 => MsgType::Voice,
            42 => MsgType::Card,
            43 => MsgType::Video,
            47 => MsgType::Emotion,
            49 => MsgType::Link,
            50 => MsgType::Call,
            51 => MsgType::ContactsInfo,
            62 => MsgType::Video2,
            10000 => MsgType::System,
            10002 => MsgType::Revoke,
            _ => return None,
        })
    }

    pub fn code(self) -> i64 {
        match self {
            MsgType::Text => 1,
            MsgType::Image => 3,
            MsgType::File => 6,
            MsgType::Voice => 34,
            MsgType::Card => 42,
            MsgType::Video => 43,
            MsgType::Emotion => 47,
            MsgType::Link => 49,
            MsgType::Call => 50,
            MsgType::ContactsInfo => 51,
            MsgType::Video2 => 62,
            MsgType::System => 10000,
            MsgType::Revoke => 10002,
        }
    }
}

/// Sub-kind marker inside a TEXT event that turns it into a location share.
pub const SUB_MSG_TYPE_LOCATION: i64 = 48;

/// Kind-specific payload of a decoded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text { text: String },
    /// Full image payload, base64-encoded.
    Image { payload: String },
    /// Location thumbnail fetched out-of-band, base64-encoded.
    Location { thumbnail: String },
    /// Animated emotion; the CDN URL is empty for built-in stickers.
    Emotion { cdn_url: String },
}

impl MessageContent {
    /// Wire code published in the JSON projection. Locations keep the
    /// sub-kind code so consumers can tell them apart from plain text.
    pub fn type_code(&self) -> i64 {
        match self {
            MessageContent::Text { .. } => MsgType::Text.code(),
            MessageContent::Image { .. } => MsgType::Image.code(),
            MessageContent::Location { .. } => SUB_MSG_TYPE_LOCATION,
            MessageContent::Emotion { .. } => MsgType::Emotion.code(),
        }
    }

    fn content_string(&self) -> &str {
        match self {
            MessageContent::Text { text } => text,
            MessageContent::Image { payload } => payload,
            MessageContent::Location { thumbnail } => thumbnail,
            MessageContent::Emotion { cdn_url } => cdn_url,
        }
    }
}

/// One decoded inbound message. Constructed once per raw event, handed to
/// the publish sink and not retained afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub msg_id: String,
    pub from: Contact,
    pub to: Contact,
    pub content: MessageContent,
    pub create_time: i64,
}

/// JSON projection published for every decoded message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageJson {
    pub msg_id: String,
    pub msg_type: i64,
    pub from_username: String,
    pub from_nickname: String,
    pub from_remark_name: String,
    pub to_username: String,
    pub to_nickname: String,
    pub to_remark_name: String,
    pub content: String,
    pub create_time: i64,
}

impl Message {
    pub fn to_json(&self) -> MessageJson {
        MessageJson {
            msg_id: self.msg_id.clone(),
            msg_type: self.content.type_code(),
            from_username: self.from.username().to_string(),
            from_nickname: self.from.nickname().to_string(),
            from_remark_name: self.from.remark_name().to_string(),
            to_username: self.to.username().to_string(),
            to_nickname: self.to.nickname().to_string(),
            to_remark_name: self.to.remark_name().to_string(),
            content: self.content.content_string().to_string(),
            create_time: self.create_time,
        }
    }
}
