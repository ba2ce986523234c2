//! Contact types for the WeChat Web contact directory.
//!
//! The remote service tags every entity with the same record shape; locally
//! each identity lives in exactly one classification bucket, expressed as a
//! variant of [`Contact`] over a shared [`ContactInfo`] header.

use serde::{Deserialize, Serialize};

/// Gender flag carried on every remote contact record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Sex {
    #[default]
    Unknown,
    Male,
    Female,
}

impl From<i64> for Sex {
    fn from(code: i64) -> Self {
        match code {
            1 => Sex::Male,
            2 => Sex::Female,
            _ => Sex::Unknown,
        }
    }
}

/// Fields shared by every contact classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ContactInfo {
    /// Opaque identity key issued by the remote service (`UserName`).
    pub username: String,
    /// Self-chosen nickname.
    pub nickname: String,
    /// Local alias assigned by the logged-in user, overrides the nickname.
    pub remark_name: String,
    pub sex: Sex,
    /// Avatar fetch path relative to the session host.
    pub avatar_url: String,
}

/// One member of a chatroom. Member lists preserve insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatroomMember {
    pub username: String,
    pub nickname: String,
    /// Display name the member chose inside this room, if any.
    pub display_name: String,
}

/// A classified contact record.
///
/// Reclassification never happens in place: the directory replaces the whole
/// entry, so an identity can only ever sit in one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Contact {
    /// The authenticated account itself.
    Own(ContactInfo),
    /// A regular friend; carries the chat-window display name override.
    Friend {
        #[serde(flatten)]
        info: ContactInfo,
        display_name: String,
    },
    /// Service-reserved identities (file helper, news app, ...).
    SpecialUser(ContactInfo),
    /// Subscription / media platform accounts.
    MediaPlatform(ContactInfo),
    /// A group chat with its ordered member list.
    ChatRoom {
        #[serde(flatten)]
        info: ContactInfo,
        members: Vec<ChatroomMember>,
    },
}

impl Contact {
    pub fn info(&self) -> &ContactInfo {
        match self {
            Contact::Own(info)
            | Contact::SpecialUser(info)
            | Contact::MediaPlatform(info) => info,
            Contact::Friend { info, .. } | Contact::ChatRoom { info, .. } => info,
        }
    }

    pub fn username(&self) -> &str {
        &self.info().username
    }

    pub fn nickname(&self) -> &str {
        &self.info().nickname
    }

    pub fn remark_name(&self) -> &str {
        &self.info().remark_name
    }

    /// Preferred display name: the remark if one is set, the nickname otherwise.
    pub fn display_name(&self) -> &str {
        let info = self.info();
        if info.remark_name.is_empty() {
            &info.nickname
        } else {
            &info.remark_name
        }
    }

    /// Snapshot-store bucket name for this classification.
    pub fn bucket(&self) -> &'static str {
        match self {
            Contact::Own(_) => "self",
            Contact::Friend { .. } => "friend",
            Contact::SpecialUser(_) => "special_user",
            Contact::MediaPlatform(_) => "media_platform",
            Contact::ChatRoom { .. } => "chatroom",
        }
    }

    /// Chatroom members, if this is a chatroom.
    pub fn members(&self) -> Option<&[ChatroomMember]> {
        match self {
            Contact::ChatRoom { members, .. } => Some(members),
            _ => None,
        }
    }
}
