//! In-memory contact directory.
//!
//! Holds the classified identity records for the current session along with
//! a remark-name reverse index. Owned and mutated by the sync engine only;
//! other tasks see contacts through published snapshots.

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;

use crate::protocol::RawContact;
use crate::types::{ChatroomMember, Contact, ContactInfo};

lazy_static! {
    /// Service-reserved identities that never count as friends.
    static ref BUILTIN_SPECIAL_USERS: HashSet<&'static str> = [
        "newsapp",
        "fmessage",
        "filehelper",
        "weibo",
        "qqmail",
        "tmessage",
        "qmessage",
        "qqsync",
        "floatbottle",
        "lbsapp",
        "shakeapp",
        "medianote",
        "qqfriend",
        "readerapp",
        "blogapp",
        "facebookapp",
        "masssendapp",
        "meishiapp",
        "feedsapp",
        "voip",
        "blogappweixin",
        "weixin",
        "brandsessionholder",
        "weixinreminder",
        "officialaccounts",
        "notification_messages",
        "wxitil",
        "userexperience_alarm",
    ]
    .into_iter()
    .collect();
}

fn info_of(raw: &RawContact) -> ContactInfo {
    ContactInfo {
        username: raw.username.clone(),
        nickname: raw.nickname.clone(),
        remark_name: raw.remark_name.clone(),
        sex: raw.sex.into(),
        avatar_url: raw.head_img_url.clone(),
    }
}

fn members_of(raw: &RawContact) -> Vec<ChatroomMember> {
    raw.member_list
        .iter()
        .map(|m| ChatroomMember {
            username: m.username.clone(),
            nickname: m.nickname.clone(),
            display_name: m.display_name.clone(),
        })
        .collect()
}

/// Classify one raw record into its bucket.
///
/// Precedence is fixed: media platform beats everything, then the builtin
/// special-user set, then the chatroom prefix, then self. A record matching
/// none of those is a friend.
pub fn classify(raw: &RawContact, own_username: &str) -> Contact {
    if raw.verify_flag & 8 != 0 {
        Contact::MediaPlatform(info_of(raw))
    } else if BUILTIN_SPECIAL_USERS.contains(raw.username.as_str()) {
        Contact::SpecialUser(info_of(raw))
    } else if raw.username.starts_with("@@") {
        Contact::ChatRoom {
            info: info_of(raw),
            members: members_of(raw),
        }
    } else if raw.username == own_username {
        Contact::Own(info_of(raw))
    } else {
        Contact::Friend {
            info: info_of(raw),
            display_name: raw.display_name.clone(),
        }
    }
}

/// The session's contact book plus the remark-name reverse index.
#[derive(Debug, Default)]
pub struct ContactDirectory {
    own_username: String,
    contacts: HashMap<String, Contact>,
    remark_to_username: HashMap<String, String>,
    username_to_remark: HashMap<String, String>,
}

impl ContactDirectory {
    pub fn new(own_username: impl Into<String>) -> Self {
        Self {
            own_username: own_username.into(),
            ..Default::default()
        }
    }

    pub fn own_username(&self) -> &str {
        &self.own_username
    }

    pub fn get(&self, username: &str) -> Option<&Contact> {
        self.contacts.get(username)
    }

    pub fn contains(&self, username: &str) -> bool {
        self.contacts.contains_key(username)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Contact> {
        self.contacts.values()
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Resolve a remark name back to the identity it aliases.
    pub fn username_for_remark(&self, remark: &str) -> Option<&str> {
        self.remark_to_username.get(remark).map(|s| s.as_str())
    }

    /// Insert or replace one identity. Classification always runs from
    /// scratch, so a record can move between buckets but never sit in two.
    pub fn upsert_raw(&mut self, raw: &RawContact) {
        let contact = classify(raw, &self.own_username);
        self.index_remark(&raw.username, &raw.remark_name);
        self.contacts.insert(raw.username.clone(), contact);
    }

    /// Apply a full or partial contact batch. Returns the chatroom member
    /// identities that are not yet known as standalone records, for the
    /// caller to bulk-fetch; an empty result is the common case, not an
    /// error.
    pub fn apply_batch(&mut self, batch: &[RawContact]) -> Vec<String> {
        let mut pending = Vec::new();
        for raw in batch {
            if raw.username.starts_with("@@") {
                for member in &raw.member_list {
                    if !member.username.is_empty()
                        && !self.contains(&member.username)
                        && !pending.contains(&member.username)
                    {
                        pending.push(member.username.clone());
                    }
                }
            }
            self.upsert_raw(raw);
        }
        pending
    }

    /// Keep the reverse index consistent: an identity owns at most one
    /// remark, and a remark points to at most one identity. The stale
    /// mapping is removed before the new one lands, so re-applying the same
    /// record is idempotent.
    fn index_remark(&mut self, username: &str, remark: &str) {
        if let Some(old_remark) = self.username_to_remark.remove(username) {
            self.remark_to_username.remove(&old_remark);
        }
        if !remark.is_empty() {
            if let Some(previous_owner) = self
                .remark_to_username
                .insert(remark.to_string(), username.to_string())
            {
                if previous_owner != username {
                    self.username_to_remark.remove(&previous_owner);
                }
            }
            self.username_to_remark
                .insert(username.to_string(), remark.to_string());
        }
    }

    /// Both directions of the remark index, for snapshot persistence.
    pub fn remark_mappings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.remark_to_username
            .iter()
            .map(|(remark, username)| (remark.as_str(), username.as_str()))
    }
}
