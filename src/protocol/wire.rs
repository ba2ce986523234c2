//! Wire-level request and response shapes for the webwx endpoints.

use serde::{Deserialize, Serialize};

/// Protocol-level status envelope present on every JSON response.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct BaseResponse {
    #[serde(rename = "Ret")]
    pub ret: i64,
    #[serde(rename = "ErrMsg", default)]
    pub err_msg: String,
}

impl BaseResponse {
    pub fn ok(&self) -> bool {
        self.ret == 0
    }
}

/// One counter of the sync continuation token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncKeyPair {
    #[serde(rename = "Key")]
    pub key: i64,
    #[serde(rename = "Val")]
    pub val: i64,
}

/// Opaque multi-part continuation token for the event stream.
///
/// Echoed back verbatim on every poll and replaced wholesale by the value
/// embedded in each sync response; counters are never merged field-by-field.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SyncCursor {
    #[serde(rename = "Count")]
    pub count: i64,
    #[serde(rename = "List")]
    pub list: Vec<SyncKeyPair>,
}

impl SyncCursor {
    /// Query-string form expected by the long-poll probe: `key_val|key_val`.
    pub fn as_query(&self) -> String {
        self.list
            .iter()
            .map(|kv| format!("{}_{}", kv.key, kv.val))
            .collect::<Vec<_>>()
            .join("|")
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

/// Identity parameters of one authenticated session.
///
/// Fully populated only after a successful handshake and invalidated
/// wholesale on relogin or logout; never partially mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginSession {
    pub uuid: String,
    pub redirect_uri: String,
    pub base_uri: String,
    pub skey: String,
    pub sid: String,
    pub uin: String,
    pub pass_ticket: String,
    pub device_id: String,
}

impl LoginSession {
    /// `BaseRequest` block attached to every authenticated call.
    pub fn base_request(&self) -> serde_json::Value {
        serde_json::json!({
            "Uin": self.uin.parse::<i64>().unwrap_or(0),
            "Sid": self.sid,
            "Skey": self.skey,
            "DeviceID": self.device_id,
        })
    }
}

/// Raw contact record as sent by the server.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RawContact {
    #[serde(rename = "UserName")]
    pub username: String,
    #[serde(rename = "NickName")]
    pub nickname: String,
    #[serde(rename = "RemarkName")]
    pub remark_name: String,
    #[serde(rename = "Sex")]
    pub sex: i64,
    #[serde(rename = "HeadImgUrl")]
    pub head_img_url: String,
    #[serde(rename = "VerifyFlag")]
    pub verify_flag: i64,
    #[serde(rename = "DisplayName")]
    pub display_name: String,
    #[serde(rename = "MemberList")]
    pub member_list: Vec<RawContact>,
}

/// Raw inbound event (`AddMsg`) inside a sync batch.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RawMessage {
    #[serde(rename = "MsgId")]
    pub msg_id: String,
    #[serde(rename = "FromUserName")]
    pub from_username: String,
    #[serde(rename = "ToUserName")]
    pub to_username: String,
    #[serde(rename = "MsgType")]
    pub msg_type: i64,
    #[serde(rename = "SubMsgType")]
    pub sub_msg_type: i64,
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "CreateTime")]
    pub create_time: i64,
}

/// One fetched event batch from `webwxsync`.
///
/// `base_response` and `sync_key` are required on purpose: a response
/// missing either is malformed and must be dropped without touching the
/// current cursor.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SyncBatch {
    #[serde(rename = "BaseResponse")]
    pub base_response: BaseResponse,
    #[serde(rename = "SyncKey")]
    pub sync_key: SyncCursor,
    #[serde(rename = "AddMsgList", default)]
    pub add_msg_list: Vec<RawMessage>,
    #[serde(rename = "ModContactList", default)]
    pub mod_contact_list: Vec<RawContact>,
}

/// Response of the session-init handshake call.
#[derive(Debug, Clone, Deserialize)]
pub struct InitResponse {
    #[serde(rename = "BaseResponse")]
    pub base_response: BaseResponse,
    #[serde(rename = "SyncKey", default)]
    pub sync_key: SyncCursor,
    #[serde(rename = "User", default)]
    pub user: RawContact,
    #[serde(rename = "ContactList", default)]
    pub contact_list: Vec<RawContact>,
}

/// Response of the full contact bootstrap.
#[derive(Debug, Clone, Deserialize)]
pub struct GetContactResponse {
    #[serde(rename = "BaseResponse")]
    pub base_response: BaseResponse,
    #[serde(rename = "MemberList", default)]
    pub member_list: Vec<RawContact>,
}

/// Response of a bulk contact fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchGetContactResponse {
    #[serde(rename = "BaseResponse")]
    pub base_response: BaseResponse,
    #[serde(rename = "ContactList", default)]
    pub contact_list: Vec<RawContact>,
}

/// Response of a media upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(rename = "BaseResponse")]
    pub base_response: BaseResponse,
    #[serde(rename = "MediaId", default)]
    pub media_id: String,
}

/// Result of one QR status probe during login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrPollResult {
    /// Code not scanned yet.
    Waiting,
    /// Scanned on the phone, confirmation pending.
    Scanned,
    /// Confirmed; carries the redirect target for the identity handshake.
    Confirmed { redirect_uri: String },
    /// Token expired; a fresh one must be generated.
    Expired,
}
