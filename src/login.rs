//! QR login and session handshake.
//!
//! Drives the state machine from a fresh login token through scan, confirm
//! and the four-step handshake that yields an authenticated session: init,
//! status notify, full contact bootstrap and the sync-host probe.

use std::sync::Arc;

use qrcode::{render::unicode, QrCode};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::protocol::{
    gen_device_id, replace_uuid, Api, LoginSession, QrPollResult, RawContact, SyncCursor,
};
use crate::transport::TransportError;

/// Observable phases of the login state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    /// QR rendered, waiting for a scan.
    WaitingScan,
    /// Scanned on the phone, confirmation pending.
    Scanned,
    /// Confirmed; handshake not yet run.
    Confirmed,
    /// Handshake complete, session usable.
    HandshakeDone,
    /// Token expired; a new one has been minted.
    Expired,
}

impl LoginState {
    /// Next phase after a QR status probe. Expiry always restarts the
    /// machine; a waiting probe never moves it backwards.
    pub fn advance(self, poll: &QrPollResult) -> LoginState {
        match poll {
            QrPollResult::Waiting => self,
            QrPollResult::Scanned => LoginState::Scanned,
            QrPollResult::Confirmed { .. } => LoginState::Confirmed,
            QrPollResult::Expired => LoginState::Expired,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("could not mint a login token")]
    NoLoginToken,
    #[error("handshake step {step} rejected by the server")]
    Handshake { step: &'static str },
    #[error("identity response missing field {0}")]
    MissingField(&'static str),
    #[error("no sync host answered the probe")]
    NoSyncHost,
    #[error("failed to render login qr code: {0}")]
    QrRender(String),
}

/// Result of a completed login: the session identity plus the initial
/// engine state derived during the handshake.
pub struct LoginOutcome {
    pub session: LoginSession,
    pub cursor: SyncCursor,
    pub own: RawContact,
    pub contacts: Vec<RawContact>,
    pub sync_host: String,
}

/// The interactive login flow.
pub struct LoginFlow {
    api: Arc<dyn Api>,
    config: ClientConfig,
}

impl LoginFlow {
    pub fn new(api: Arc<dyn Api>, config: ClientConfig) -> Self {
        Self { api, config }
    }

    /// Run the full flow: QR display, scan wait and handshake. Loops over
    /// expired tokens until one is confirmed.
    pub async fn run(&self) -> Result<LoginOutcome, LoginError> {
        let redirect_uri = self.wait_for_confirm().await?;
        self.handshake(&redirect_uri).await
    }

    /// Attempt a scan-free relogin from a stale session. Returns `None` if
    /// the server refuses, in which case the caller falls back to [`run`].
    ///
    /// [`run`]: LoginFlow::run
    pub async fn relogin(&self, stale: &LoginSession) -> Result<Option<LoginOutcome>, LoginError> {
        let uuid = match self.api.push_login(&stale.uin).await {
            Ok(Some(uuid)) => uuid,
            Ok(None) => {
                warn!("push login refused, full login required");
                return Ok(None);
            }
            Err(err) => {
                warn!(error = %err, "push login failed, full login required");
                return Ok(None);
            }
        };
        info!(%uuid, "push login accepted, waiting for phone confirm");
        // The phone shows a confirm dialog instead of a QR scan; the status
        // endpoint behaves exactly as in the scan flow.
        let redirect_uri = replace_uuid(&stale.redirect_uri, &uuid);
        let mut tip = 1;
        loop {
            match self.api.login_status(&uuid, tip).await? {
                QrPollResult::Waiting => {}
                QrPollResult::Scanned => tip = 0,
                QrPollResult::Confirmed { redirect_uri: uri } => {
                    let uri = if uri.is_empty() { redirect_uri } else { uri };
                    return Ok(Some(self.handshake(&uri).await?));
                }
                QrPollResult::Expired => return Ok(None),
            }
        }
    }

    async fn wait_for_confirm(&self) -> Result<String, LoginError> {
        loop {
            let uuid = self
                .api
                .fresh_login_token()
                .await?
                .ok_or(LoginError::NoLoginToken)?;
            info!(%uuid, "login token generated");
            print_login_qr(&self.config.login_base, &uuid)?;

            let mut state = LoginState::WaitingScan;
            loop {
                // tip 1 marks the pre-scan probe; it drops to 0 once the
                // phone has scanned the code.
                let tip = if state == LoginState::WaitingScan { 1 } else { 0 };
                let poll = match self.api.login_status(&uuid, tip).await {
                    Ok(poll) => poll,
                    Err(TransportError::Timeout) => {
                        // The status endpoint long-polls; a timeout just
                        // means nothing happened, so probe again.
                        continue;
                    }
                    Err(err) => return Err(err.into()),
                };
                let next = state.advance(&poll);
                if next != state {
                    info!(from = ?state, to = ?next, "login state change");
                }
                state = next;
                match poll {
                    QrPollResult::Confirmed { redirect_uri } => return Ok(redirect_uri),
                    QrPollResult::Expired => break,
                    _ => {}
                }
            }
        }
    }

    /// Exchange the redirect for session credentials and run the handshake
    /// sequence. Any rejected step aborts the whole login.
    async fn handshake(&self, redirect_uri: &str) -> Result<LoginOutcome, LoginError> {
        let redirect_uri = format!("{}&fun=new", redirect_uri);
        let base_uri = redirect_uri
            .rfind('/')
            .map(|idx| redirect_uri[..idx].to_string())
            .unwrap_or_else(|| redirect_uri.clone());

        let xml = self.api.fetch_identity(&redirect_uri).await?;
        let mut session = LoginSession {
            uuid: String::new(),
            redirect_uri: redirect_uri.clone(),
            base_uri,
            skey: xml_field(&xml, "skey").ok_or(LoginError::MissingField("skey"))?,
            sid: xml_field(&xml, "wxsid").ok_or(LoginError::MissingField("wxsid"))?,
            uin: xml_field(&xml, "wxuin").ok_or(LoginError::MissingField("wxuin"))?,
            pass_ticket: xml_field(&xml, "pass_ticket")
                .ok_or(LoginError::MissingField("pass_ticket"))?,
            device_id: gen_device_id(),
        };
        if let Some(param) = redirect_uri
            .split('?')
            .nth(1)
            .and_then(|q| q.split('&').find(|p| p.starts_with("uuid=")))
        {
            session.uuid = param.trim_start_matches("uuid=").to_string();
        }

        info!("initializing session");
        let init = self.api.init(&session).await?;
        if !init.base_response.ok() {
            return Err(LoginError::Handshake { step: "webwxinit" });
        }
        let own = init.user.clone();
        let cursor = init.sync_key.clone();

        info!("sending status notify");
        if !self.api.status_notify(&session, &own.username).await? {
            return Err(LoginError::Handshake {
                step: "webwxstatusnotify",
            });
        }

        info!("fetching contacts");
        let contact_response = self.api.get_contacts(&session).await?;
        if !contact_response.base_response.ok() {
            return Err(LoginError::Handshake {
                step: "webwxgetcontact",
            });
        }
        let mut contacts = init.contact_list;
        contacts.extend(contact_response.member_list);

        info!("probing sync hosts");
        let sync_host = self.probe_sync_host(&session, &cursor).await?;
        info!(%sync_host, "login complete");

        Ok(LoginOutcome {
            session,
            cursor,
            own,
            contacts,
            sync_host,
        })
    }

    /// Try each candidate host until one answers the probe with retcode 0.
    async fn probe_sync_host(
        &self,
        session: &LoginSession,
        cursor: &SyncCursor,
    ) -> Result<String, LoginError> {
        for host in &self.config.sync_hosts {
            match self.api.sync_check(session, host, cursor).await {
                Ok((retcode, _)) if retcode == "0" => return Ok(host.clone()),
                Ok((retcode, _)) => {
                    warn!(%host, %retcode, "sync host rejected probe");
                }
                Err(err) => {
                    warn!(%host, error = %err, "sync host probe failed");
                }
            }
        }
        Err(LoginError::NoSyncHost)
    }
}

/// Extract one child element's text from the identity XML. The document is
/// one flat `<error>` element, so a scan for the tag pair is enough.
fn xml_field(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    let value = xml[start..end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Render the login QR to the terminal.
fn print_login_qr(login_base: &str, uuid: &str) -> Result<(), LoginError> {
    let data = format!("{}/l/{}", login_base, uuid);
    let code = QrCode::new(data.as_bytes()).map_err(|e| LoginError::QrRender(e.to_string()))?;
    let image = code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build();
    println!("{}", image);
    println!("Scan the QR code with the mobile app to log in.");
    Ok(())
}
