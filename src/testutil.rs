//! Shared test doubles for the endpoint trait.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::protocol::{
    Api, BaseResponse, BatchGetContactResponse, GetContactResponse, InitResponse, LoginSession,
    QrPollResult, RawContact, SyncBatch, SyncCursor,
};
use crate::sink::MessagePublisher;
use crate::transport::TransportError;
use crate::types::MessageJson;

fn ok_response() -> BaseResponse {
    BaseResponse::default()
}

/// Scripted [`Api`] double. Queued responses pop in order; every call is
/// recorded by name for assertion.
#[derive(Default)]
pub struct MockApi {
    pub calls: Mutex<Vec<String>>,
    pub login_tokens: Mutex<VecDeque<Option<String>>>,
    pub statuses: Mutex<VecDeque<QrPollResult>>,
    pub identity_xml: Mutex<String>,
    pub init_responses: Mutex<VecDeque<InitResponse>>,
    pub contact_lists: Mutex<VecDeque<Vec<RawContact>>>,
    pub push_login_uuid: Mutex<Option<String>>,
    pub sync_checks: Mutex<VecDeque<(String, String)>>,
    pub sync_batches: Mutex<VecDeque<SyncBatch>>,
    /// Records served to bulk contact fetches, keyed by username.
    pub known_contacts: Mutex<HashMap<String, RawContact>>,
    pub upload_result: Mutex<Option<(String, usize)>>,
    pub media_bytes: Vec<u8>,
    pub cookies: Vec<(String, String)>,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            media_bytes: b"bytes".to_vec(),
            ..Default::default()
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn queue_sync_batch(&self, batch: SyncBatch) {
        self.sync_batches.lock().unwrap().push_back(batch);
    }

    pub fn add_known_contact(&self, raw: RawContact) {
        self.known_contacts
            .lock()
            .unwrap()
            .insert(raw.username.clone(), raw);
    }

    /// Script a full successful login: token, immediate confirm, identity
    /// and handshake responses.
    pub fn script_full_login(
        &self,
        own: RawContact,
        contacts: Vec<RawContact>,
        cursor: SyncCursor,
    ) {
        self.login_tokens
            .lock()
            .unwrap()
            .push_back(Some("mock-uuid".into()));
        self.statuses.lock().unwrap().push_back(QrPollResult::Confirmed {
            redirect_uri: "https://wx2.qq.com/cgi-bin/mmwebwx-bin/webwxnewloginpage?ticket=t&uuid=mock-uuid&scan=1".into(),
        });
        *self.identity_xml.lock().unwrap() =
            "<error><skey>@skey2</skey><wxsid>sid2</wxsid><wxuin>222</wxuin>\
             <pass_ticket>ticket2</pass_ticket></error>"
                .to_string();
        self.init_responses.lock().unwrap().push_back(InitResponse {
            base_response: ok_response(),
            sync_key: cursor,
            user: own,
            contact_list: Vec::new(),
        });
        self.contact_lists.lock().unwrap().push_back(contacts);
        self.sync_checks
            .lock()
            .unwrap()
            .push_back(("0".into(), "0".into()));
    }
}

#[async_trait]
impl Api for MockApi {
    async fn fresh_login_token(&self) -> Result<Option<String>, TransportError> {
        self.record("fresh_login_token");
        Ok(self
            .login_tokens
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(None))
    }

    async fn login_status(&self, _uuid: &str, tip: u8) -> Result<QrPollResult, TransportError> {
        self.record(format!("login_status:{}", tip));
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(QrPollResult::Expired))
    }

    async fn fetch_identity(&self, _redirect_uri: &str) -> Result<String, TransportError> {
        self.record("fetch_identity");
        Ok(self.identity_xml.lock().unwrap().clone())
    }

    async fn push_login(&self, _uin: &str) -> Result<Option<String>, TransportError> {
        self.record("push_login");
        Ok(self.push_login_uuid.lock().unwrap().clone())
    }

    async fn init(&self, _session: &LoginSession) -> Result<InitResponse, TransportError> {
        self.record("init");
        self.init_responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError::Decode("no scripted init response".into()))
    }

    async fn status_notify(
        &self,
        _session: &LoginSession,
        _own_username: &str,
    ) -> Result<bool, TransportError> {
        self.record("status_notify");
        Ok(true)
    }

    async fn get_contacts(
        &self,
        _session: &LoginSession,
    ) -> Result<GetContactResponse, TransportError> {
        self.record("get_contacts");
        Ok(GetContactResponse {
            base_response: ok_response(),
            member_list: self
                .contact_lists
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default(),
        })
    }

    async fn sync_check(
        &self,
        _session: &LoginSession,
        host: &str,
        _cursor: &SyncCursor,
    ) -> Result<(String, String), TransportError> {
        self.record(format!("sync_check:{}", host));
        self.sync_checks
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(TransportError::Timeout)
    }

    async fn sync(
        &self,
        _session: &LoginSession,
        _cursor: &SyncCursor,
    ) -> Result<SyncBatch, TransportError> {
        self.record("sync");
        self.sync_batches
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError::Decode("no scripted batch".into()))
    }

    async fn batch_get_contacts(
        &self,
        _session: &LoginSession,
        usernames: &[String],
    ) -> Result<BatchGetContactResponse, TransportError> {
        self.record(format!("batch_get_contacts:{}", usernames.join(",")));
        let known = self.known_contacts.lock().unwrap();
        Ok(BatchGetContactResponse {
            base_response: ok_response(),
            contact_list: usernames
                .iter()
                .filter_map(|u| known.get(u).cloned())
                .collect(),
        })
    }

    async fn get_msg_img(
        &self,
        _session: &LoginSession,
        msg_id: &str,
    ) -> Result<Vec<u8>, TransportError> {
        self.record(format!("get_msg_img:{}", msg_id));
        Ok(self.media_bytes.clone())
    }

    async fn get_location_thumb(
        &self,
        _session: &LoginSession,
        msg_id: &str,
    ) -> Result<Vec<u8>, TransportError> {
        self.record(format!("get_location_thumb:{}", msg_id));
        Ok(self.media_bytes.clone())
    }

    async fn send_text(
        &self,
        _session: &LoginSession,
        _own_username: &str,
        to_username: &str,
        content: &str,
    ) -> Result<bool, TransportError> {
        self.record(format!("send_text:{}:{}", to_username, content));
        Ok(true)
    }

    async fn send_image(
        &self,
        _session: &LoginSession,
        _own_username: &str,
        to_username: &str,
        media_id: &str,
    ) -> Result<bool, TransportError> {
        self.record(format!("send_image:{}:{}", to_username, media_id));
        Ok(true)
    }

    async fn send_app_file(
        &self,
        _session: &LoginSession,
        _own_username: &str,
        to_username: &str,
        media_id: &str,
        _file_url: &str,
        file_size: usize,
    ) -> Result<bool, TransportError> {
        self.record(format!(
            "send_app_file:{}:{}:{}",
            to_username, media_id, file_size
        ));
        Ok(true)
    }

    async fn upload_media(
        &self,
        _session: &LoginSession,
        file_url: &str,
    ) -> Result<Option<(String, usize)>, TransportError> {
        self.record(format!("upload_media:{}", file_url));
        Ok(self.upload_result.lock().unwrap().clone())
    }

    async fn set_remark_name(
        &self,
        _session: &LoginSession,
        to_username: &str,
        remark_name: &str,
    ) -> Result<bool, TransportError> {
        self.record(format!("set_remark_name:{}:{}", to_username, remark_name));
        Ok(true)
    }

    async fn update_chatroom_topic(
        &self,
        _session: &LoginSession,
        room_username: &str,
        topic: &str,
    ) -> Result<bool, TransportError> {
        self.record(format!(
            "update_chatroom_topic:{}:{}",
            room_username, topic
        ));
        Ok(true)
    }

    async fn revoke_message(
        &self,
        _session: &LoginSession,
        to_username: &str,
        msg_id: &str,
    ) -> Result<bool, TransportError> {
        self.record(format!("revoke_message:{}:{}", to_username, msg_id));
        Ok(true)
    }

    async fn logout(&self, _session: &LoginSession) -> Result<bool, TransportError> {
        self.record("logout");
        Ok(true)
    }

    fn session_cookies(&self) -> Vec<(String, String)> {
        self.cookies.clone()
    }
}

/// Publisher that collects everything it is handed.
#[derive(Default)]
pub struct CollectingPublisher {
    pub messages: Mutex<Vec<MessageJson>>,
}

#[async_trait]
impl MessagePublisher for CollectingPublisher {
    async fn publish(&self, message: &MessageJson) {
        self.messages.lock().unwrap().push(message.clone());
    }
}

/// Convenience constructor for a scripted upload result.
pub fn upload_ok(media_id: &str, size: usize) -> Option<(String, usize)> {
    Some((media_id.to_string(), size))
}
