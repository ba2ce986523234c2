//! Endpoint surface of the webwx protocol.
//!
//! [`Api`] is the seam between protocol plumbing and the engine logic above
//! it: login, sync and dispatch are all written against the trait so tests
//! can script server behavior without a network. [`HttpApi`] is the real
//! implementation over [`SessionTransport`].

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use reqwest::multipart::{Form, Part};
use tracing::{debug, warn};

use crate::config::{ClientConfig, APP_ID};
use crate::protocol::wire::{
    BatchGetContactResponse, GetContactResponse, InitResponse, LoginSession, QrPollResult,
    SyncBatch, SyncCursor, UploadResponse,
};
use crate::transport::{SessionTransport, TransportError};

lazy_static! {
    static ref QR_LOGIN: Regex =
        Regex::new(r#"window\.QRLogin\.code = (\d+); window\.QRLogin\.uuid = "([^"]+)""#).unwrap();
    static ref WINDOW_CODE: Regex = Regex::new(r"window\.code=(\d+);").unwrap();
    static ref REDIRECT_URI: Regex = Regex::new(r#"window\.redirect_uri="([^"]+)";"#).unwrap();
    static ref SYNC_STATUS: Regex =
        Regex::new(r#"retcode:"(\d+)",selector:"(\d+)""#).unwrap();
    static ref UUID_PARAM: Regex = Regex::new(r"uuid=[^&]+").unwrap();
}

fn now_ts() -> i64 {
    Utc::now().timestamp()
}

/// Client-side message id: millisecond timestamp plus four random digits.
pub fn gen_client_msg_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("{}{:04}", millis, suffix)
}

/// Device id: `e` followed by fifteen random digits.
pub fn gen_device_id() -> String {
    let mut rng = rand::thread_rng();
    let digits: String = (0..15).map(|_| rng.gen_range(0..10u8).to_string()).collect();
    format!("e{}", digits)
}

/// Substitute the uuid parameter inside a stored redirect target.
pub fn replace_uuid(redirect_uri: &str, uuid: &str) -> String {
    UUID_PARAM
        .replace(redirect_uri, format!("uuid={}", uuid))
        .into_owned()
}

/// Everything the protocol server can be asked to do, one method per
/// endpoint. Methods that the server answers with a bare `Ret` return
/// `bool` for success; fetches return their parsed payloads.
#[async_trait]
pub trait Api: Send + Sync {
    /// `jslogin`: mint a fresh login token (uuid).
    async fn fresh_login_token(&self) -> Result<Option<String>, TransportError>;

    /// QR status probe; `tip` is 1 before the first scan, 0 after.
    async fn login_status(&self, uuid: &str, tip: u8) -> Result<QrPollResult, TransportError>;

    /// Follow the confirmed redirect and return the identity XML.
    async fn fetch_identity(&self, redirect_uri: &str) -> Result<String, TransportError>;

    /// `webwxpushloginurl`: ask for a scan-free relogin token.
    async fn push_login(&self, uin: &str) -> Result<Option<String>, TransportError>;

    async fn init(&self, session: &LoginSession) -> Result<InitResponse, TransportError>;

    async fn status_notify(
        &self,
        session: &LoginSession,
        own_username: &str,
    ) -> Result<bool, TransportError>;

    async fn get_contacts(
        &self,
        session: &LoginSession,
    ) -> Result<GetContactResponse, TransportError>;

    /// Long-poll probe against `host`; returns `(retcode, selector)`.
    async fn sync_check(
        &self,
        session: &LoginSession,
        host: &str,
        cursor: &SyncCursor,
    ) -> Result<(String, String), TransportError>;

    async fn sync(
        &self,
        session: &LoginSession,
        cursor: &SyncCursor,
    ) -> Result<SyncBatch, TransportError>;

    async fn batch_get_contacts(
        &self,
        session: &LoginSession,
        usernames: &[String],
    ) -> Result<BatchGetContactResponse, TransportError>;

    async fn get_msg_img(
        &self,
        session: &LoginSession,
        msg_id: &str,
    ) -> Result<Vec<u8>, TransportError>;

    /// Location thumbnail via the public-link image endpoint.
    async fn get_location_thumb(
        &self,
        session: &LoginSession,
        msg_id: &str,
    ) -> Result<Vec<u8>, TransportError>;

    async fn send_text(
        &self,
        session: &LoginSession,
        own_username: &str,
        to_username: &str,
        content: &str,
    ) -> Result<bool, TransportError>;

    async fn send_image(
        &self,
        session: &LoginSession,
        own_username: &str,
        to_username: &str,
        media_id: &str,
    ) -> Result<bool, TransportError>;

    async fn send_app_file(
        &self,
        session: &LoginSession,
        own_username: &str,
        to_username: &str,
        media_id: &str,
        file_url: &str,
        file_size: usize,
    ) -> Result<bool, TransportError>;

    /// Upload a remote file to the media host; returns `(media_id, size)`.
    async fn upload_media(
        &self,
        session: &LoginSession,
        file_url: &str,
    ) -> Result<Option<(String, usize)>, TransportError>;

    async fn set_remark_name(
        &self,
        session: &LoginSession,
        to_username: &str,
        remark_name: &str,
    ) -> Result<bool, TransportError>;

    async fn update_chatroom_topic(
        &self,
        session: &LoginSession,
        room_username: &str,
        topic: &str,
    ) -> Result<bool, TransportError>;

    async fn revoke_message(
        &self,
        session: &LoginSession,
        to_username: &str,
        msg_id: &str,
    ) -> Result<bool, TransportError>;

    async fn logout(&self, session: &LoginSession) -> Result<bool, TransportError>;

    /// Cookies observed on this session, for persistence.
    fn session_cookies(&self) -> Vec<(String, String)>;
}

/// [`Api`] over a live HTTP session.
pub struct HttpApi {
    transport: Arc<SessionTransport>,
    config: ClientConfig,
    /// Counter behind the `WU_FILE_<n>` upload field.
    media_count: AtomicI64,
}

impl HttpApi {
    pub fn new(transport: Arc<SessionTransport>, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            media_count: AtomicI64::new(0),
        }
    }

    fn ret_ok(body: &serde_json::Value) -> bool {
        body["BaseResponse"]["Ret"].as_i64() == Some(0)
    }

    async fn post_ret(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<bool, TransportError> {
        let response = self.transport.post_json(url, body).await?;
        if !Self::ret_ok(&response) {
            warn!(
                err_msg = %response["BaseResponse"]["ErrMsg"].as_str().unwrap_or(""),
                "server rejected request"
            );
        }
        Ok(Self::ret_ok(&response))
    }
}

#[async_trait]
impl Api for HttpApi {
    async fn fresh_login_token(&self) -> Result<Option<String>, TransportError> {
        let url = format!(
            "{}/jslogin?appid={}&fun=new&lang={}&_={}",
            self.config.login_base, APP_ID, self.config.lang, now_ts()
        );
        let text = self.transport.get_text(&url).await?;
        if let Some(caps) = QR_LOGIN.captures(&text) {
            if &caps[1] == "200" {
                return Ok(Some(caps[2].to_string()));
            }
        }
        Ok(None)
    }

    async fn login_status(&self, uuid: &str, tip: u8) -> Result<QrPollResult, TransportError> {
        let url = format!(
            "{}/cgi-bin/mmwebwx-bin/login?loginicon=true&tip={}&uuid={}&_={}",
            self.config.login_base, tip, uuid, now_ts()
        );
        let text = self.transport.get_text(&url).await?;
        let code = WINDOW_CODE
            .captures(&text)
            .map(|caps| caps[1].to_string())
            .unwrap_or_default();
        Ok(match code.as_str() {
            "408" => QrPollResult::Waiting,
            "201" => QrPollResult::Scanned,
            "200" => {
                let redirect_uri = REDIRECT_URI
                    .captures(&text)
                    .map(|caps| caps[1].to_string())
                    .unwrap_or_default();
                QrPollResult::Confirmed { redirect_uri }
            }
            _ => QrPollResult::Expired,
        })
    }

    async fn fetch_identity(&self, redirect_uri: &str) -> Result<String, TransportError> {
        self.transport.get_text(redirect_uri).await
    }

    async fn push_login(&self, uin: &str) -> Result<Option<String>, TransportError> {
        let url = format!(
            "{}/cgi-bin/mmwebwx-bin/webwxpushloginurl?uin={}",
            self.config.login_base, uin
        );
        let text = self.transport.get_text(&url).await?;
        let body: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))?;
        // `ret` comes back as the string "0" on some hosts and the number 0
        // on others.
        let ret_ok = body["ret"].as_str() == Some("0") || body["ret"].as_i64() == Some(0);
        if ret_ok {
            Ok(body["uuid"].as_str().map(|s| s.to_string()))
        } else {
            Ok(None)
        }
    }

    async fn init(&self, session: &LoginSession) -> Result<InitResponse, TransportError> {
        let url = format!(
            "{}/webwxinit?pass_ticket={}&skey={}&r={}",
            session.base_uri, session.pass_ticket, session.skey, now_ts()
        );
        let body = serde_json::json!({ "BaseRequest": session.base_request() });
        let response = self.transport.post_json(&url, &body).await?;
        serde_json::from_value(response).map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn status_notify(
        &self,
        session: &LoginSession,
        own_username: &str,
    ) -> Result<bool, TransportError> {
        let url = format!(
            "{}/webwxstatusnotify?lang={}&pass_ticket={}",
            session.base_uri, self.config.lang, session.pass_ticket
        );
        let body = serde_json::json!({
            "BaseRequest": session.base_request(),
            "Code": 3,
            "FromUserName": own_username,
            "ToUserName": own_username,
            "ClientMsgId": now_ts(),
        });
        self.post_ret(&url, &body).await
    }

    async fn get_contacts(
        &self,
        session: &LoginSession,
    ) -> Result<GetContactResponse, TransportError> {
        let url = format!(
            "{}/webwxgetcontact?pass_ticket={}&skey={}&r={}",
            session.base_uri, session.pass_ticket, session.skey, now_ts()
        );
        let response = self.transport.post_empty(&url).await?;
        serde_json::from_value(response).map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn sync_check(
        &self,
        session: &LoginSession,
        host: &str,
        cursor: &SyncCursor,
    ) -> Result<(String, String), TransportError> {
        let ts = now_ts();
        let url = format!(
            "https://{}/cgi-bin/mmwebwx-bin/synccheck?r={}&sid={}&uin={}&skey={}&deviceid={}&synckey={}&_={}",
            host, ts, session.sid, session.uin, session.skey, session.device_id,
            cursor.as_query(), ts
        );
        let text = self.transport.get_text(&url).await?;
        debug!(%host, response = %text, "sync check");
        match SYNC_STATUS.captures(&text) {
            Some(caps) => Ok((caps[1].to_string(), caps[2].to_string())),
            None => Err(TransportError::Decode(format!(
                "unrecognized sync check response: {}",
                text
            ))),
        }
    }

    async fn sync(
        &self,
        session: &LoginSession,
        cursor: &SyncCursor,
    ) -> Result<SyncBatch, TransportError> {
        let url = format!(
            "{}/webwxsync?sid={}&skey={}&pass_ticket={}",
            session.base_uri, session.sid, session.skey, session.pass_ticket
        );
        let body = serde_json::json!({
            "BaseRequest": session.base_request(),
            "SyncKey": cursor,
            "rr": !now_ts(),
        });
        let response = self.transport.post_json(&url, &body).await?;
        serde_json::from_value(response).map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn batch_get_contacts(
        &self,
        session: &LoginSession,
        usernames: &[String],
    ) -> Result<BatchGetContactResponse, TransportError> {
        let url = format!(
            "{}/webwxbatchgetcontact?type=ex&pass_ticket={}&r={}",
            session.base_uri, session.pass_ticket, now_ts()
        );
        let list: Vec<serde_json::Value> = usernames
            .iter()
            .map(|u| serde_json::json!({ "UserName": u, "EncryChatRoomId": "" }))
            .collect();
        let body = serde_json::json!({
            "BaseRequest": session.base_request(),
            "Count": usernames.len(),
            "List": list,
        });
        let response = self.transport.post_json(&url, &body).await?;
        serde_json::from_value(response).map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn get_msg_img(
        &self,
        session: &LoginSession,
        msg_id: &str,
    ) -> Result<Vec<u8>, TransportError> {
        let url = format!(
            "{}/webwxgetmsgimg?MsgID={}&skey={}",
            session.base_uri, msg_id, session.skey
        );
        self.transport.get_bytes(&url).await
    }

    async fn get_location_thumb(
        &self,
        session: &LoginSession,
        msg_id: &str,
    ) -> Result<Vec<u8>, TransportError> {
        let url = format!(
            "{}/webwxgetpubliclinkimg?url=xxx&msgid={}&pictype=location",
            session.base_uri, msg_id
        );
        self.transport.get_bytes(&url).await
    }

    async fn send_text(
        &self,
        session: &LoginSession,
        own_username: &str,
        to_username: &str,
        content: &str,
    ) -> Result<bool, TransportError> {
        let url = format!(
            "{}/webwxsendmsg?pass_ticket={}",
            session.base_uri, session.pass_ticket
        );
        let client_msg_id = gen_client_msg_id();
        let body = serde_json::json!({
            "BaseRequest": session.base_request(),
            "Msg": {
                "Type": 1,
                "Content": content,
                "FromUserName": own_username,
                "ToUserName": to_username,
                "LocalID": client_msg_id,
                "ClientMsgId": client_msg_id,
            }
        });
        self.post_ret(&url, &body).await
    }

    async fn send_image(
        &self,
        session: &LoginSession,
        own_username: &str,
        to_username: &str,
        media_id: &str,
    ) -> Result<bool, TransportError> {
        let url = format!(
            "{}/webwxsendmsgimg?fun=async&f=json&pass_ticket={}",
            session.base_uri, session.pass_ticket
        );
        let client_msg_id = gen_client_msg_id();
        let body = serde_json::json!({
            "BaseRequest": session.base_request(),
            "Msg": {
                "Type": 3,
                "MediaId": media_id,
                "FromUserName": own_username,
                "ToUserName": to_username,
                "LocalID": client_msg_id,
                "ClientMsgId": client_msg_id,
            }
        });
        self.post_ret(&url, &body).await
    }

    async fn send_app_file(
        &self,
        session: &LoginSession,
        own_username: &str,
        to_username: &str,
        media_id: &str,
        file_url: &str,
        file_size: usize,
    ) -> Result<bool, TransportError> {
        let url = format!(
            "{}/webwxsendappmsg?fun=async&f=json&pass_ticket={}",
            session.base_uri, session.pass_ticket
        );
        let file_name = file_url.rsplit('/').next().unwrap_or(file_url);
        let file_ext = file_url.rsplit('.').next().unwrap_or("");
        let content = format!(
            "<appmsg appid='wxeb7ec651dd0aefa9' sdkver=''><title>{}</title><des></des>\
             <action></action><type>6</type><content></content><url></url><lowurl></lowurl>\
             <appattach><totallen>{}</totallen><attachid>{}</attachid><fileext>{}</fileext>\
             </appattach><extinfo></extinfo></appmsg>",
            file_name, file_size, media_id, file_ext
        );
        let client_msg_id = gen_client_msg_id();
        let body = serde_json::json!({
            "BaseRequest": session.base_request(),
            "Msg": {
                "Type": 6,
                "Content": content,
                "FromUserName": own_username,
                "ToUserName": to_username,
                "LocalID": client_msg_id,
                "ClientMsgId": client_msg_id,
            }
        });
        self.post_ret(&url, &body).await
    }

    async fn upload_media(
        &self,
        session: &LoginSession,
        file_url: &str,
    ) -> Result<Option<(String, usize)>, TransportError> {
        let file_name = file_url.rsplit('/').next().unwrap_or(file_url).to_string();
        // The server knows two render classes only: pic shows inline, doc
        // shows as an attachment.
        let media_type = match file_name.rsplit('.').next().map(|e| e.to_ascii_lowercase()) {
            Some(ext) if ["jpg", "jpeg", "png", "gif", "bmp"].contains(&ext.as_str()) => "pic",
            _ => "doc",
        };
        let file_content = self.transport.get_bytes(file_url).await?;
        let file_size = file_content.len();
        let webwx_data_ticket = match self.transport.cookie("webwx_data_ticket") {
            Some(ticket) => ticket,
            None => {
                warn!("missing webwx_data_ticket cookie, cannot upload");
                return Ok(None);
            }
        };
        let upload_request = serde_json::json!({
            "BaseRequest": session.base_request(),
            "ClientMediaId": gen_client_msg_id(),
            "TotalLen": file_size,
            "StartPos": 0,
            "DataLen": file_size,
            "MediaType": 4,
        });
        let count = self.media_count.fetch_add(1, Ordering::SeqCst) + 1;
        let form = Form::new()
            .text("id", format!("WU_FILE_{}", count))
            .text("name", file_name.clone())
            .text("type", "application/octet-stream")
            .text("lastModifieDate", Utc::now().to_rfc2822())
            .text("size", file_size.to_string())
            .text("mediatype", media_type)
            .text("uploadmediarequest", upload_request.to_string())
            .text("webwx_data_ticket", webwx_data_ticket)
            .text("pass_ticket", session.pass_ticket.clone())
            .part(
                "filename",
                Part::bytes(file_content)
                    .file_name(file_name)
                    .mime_str("application/octet-stream")
                    .map_err(|e| TransportError::Decode(e.to_string()))?,
            );
        let response = self
            .transport
            .post_multipart(&self.config.upload_url, form)
            .await?;
        let parsed: UploadResponse = serde_json::from_value(response)
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        if parsed.base_response.ok() && !parsed.media_id.is_empty() {
            Ok(Some((parsed.media_id, file_size)))
        } else {
            Ok(None)
        }
    }

    async fn set_remark_name(
        &self,
        session: &LoginSession,
        to_username: &str,
        remark_name: &str,
    ) -> Result<bool, TransportError> {
        let url = format!(
            "{}/webwxoplog?pass_ticket={}",
            session.base_uri, session.pass_ticket
        );
        let body = serde_json::json!({
            "BaseRequest": session.base_request(),
            "CmdId": 2,
            "RemarkName": remark_name,
            "UserName": to_username,
        });
        self.post_ret(&url, &body).await
    }

    async fn update_chatroom_topic(
        &self,
        session: &LoginSession,
        room_username: &str,
        topic: &str,
    ) -> Result<bool, TransportError> {
        let url = format!(
            "{}/webwxupdatechatroom?fun=modtopic&pass_ticket={}",
            session.base_uri, session.pass_ticket
        );
        let body = serde_json::json!({
            "BaseRequest": session.base_request(),
            "ChatRoomName": room_username,
            "NewTopic": topic,
        });
        self.post_ret(&url, &body).await
    }

    async fn revoke_message(
        &self,
        session: &LoginSession,
        to_username: &str,
        msg_id: &str,
    ) -> Result<bool, TransportError> {
        let url = format!("{}/webwxrevokemsg", session.base_uri);
        let body = serde_json::json!({
            "BaseRequest": session.base_request(),
            "Msg": {
                "ToUserName": to_username,
                "SvrMsgId": msg_id,
                "ClientMsgId": msg_id,
            }
        });
        self.post_ret(&url, &body).await
    }

    async fn logout(&self, session: &LoginSession) -> Result<bool, TransportError> {
        let url = format!(
            "{}/webwxlogout?redirect=1&type=1&skey={}",
            session.base_uri, session.skey
        );
        let status = self
            .transport
            .post_form(&url, &[("sid", session.sid.as_str()), ("uin", session.uin.as_str())])
            .await?;
        Ok(status == 301 || status == 200)
    }

    fn session_cookies(&self) -> Vec<(String, String)> {
        self.transport.session_cookies()
    }
}
