//! Long-poll sync engine.
//!
//! One engine task owns the session, the sync cursor and the contact
//! directory, and is their only mutator. It loops on the long-poll probe,
//! fetches event batches, routes them by selector and recovers from
//! authentication loss. Other tasks observe the session through the watch
//! channel published after every (re)login.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::decoder::{decode, DecodeError};
use crate::directory::ContactDirectory;
use crate::login::{LoginFlow, LoginOutcome};
use crate::protocol::{Api, LoginSession, SyncBatch, SyncCursor};
use crate::sink::MessagePublisher;
use crate::store::SnapshotStore;

/// What one long-poll probe result tells the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Nothing new.
    Idle,
    /// Fetch the batch and log it without publishing. Contact updates and
    /// the cursor replacement still land.
    FetchAndLog,
    /// Fetch the batch and publish its messages.
    FetchAndHandle,
    /// Fetch the batch for its contact updates only.
    FetchContactsOnly,
    /// Fetch the batch to advance the cursor and absorb its contact
    /// updates, discard its messages.
    FetchAndDiscard,
    /// Fetch twice and handle the second batch.
    DoubleFetch,
    /// Session credentials expired on another device; try a scan-free
    /// relogin first.
    Relogin,
    /// Logged out remotely; only a full QR login recovers.
    FullLogin,
    /// Unrecognized probe response.
    Unknown,
}

/// Map a probe's `(retcode, selector)` pair to an action.
pub fn probe_action(retcode: &str, selector: &str) -> SyncAction {
    match retcode {
        "0" => match selector {
            "0" => SyncAction::Idle,
            "1" => SyncAction::FetchAndLog,
            "2" | "3" | "6" => SyncAction::FetchAndHandle,
            "4" => SyncAction::FetchContactsOnly,
            "5" => SyncAction::FetchAndDiscard,
            "7" => SyncAction::DoubleFetch,
            _ => SyncAction::Unknown,
        },
        "1100" => SyncAction::FullLogin,
        "1101" | "1102" => SyncAction::Relogin,
        _ => SyncAction::Unknown,
    }
}

/// Read-only view of the authenticated session, published to other tasks.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub session: LoginSession,
    pub own_username: String,
}

/// The engine task.
pub struct SyncEngine {
    api: Arc<dyn Api>,
    config: ClientConfig,
    session: LoginSession,
    cursor: SyncCursor,
    directory: ContactDirectory,
    sync_host: String,
    publisher: Arc<dyn MessagePublisher>,
    store: Arc<dyn SnapshotStore>,
    session_tx: watch::Sender<SessionSnapshot>,
    shutdown: watch::Receiver<bool>,
    /// Chatroom member identities awaiting a bulk fetch, flushed at the top
    /// of the loop.
    pending_members: Vec<String>,
}

impl SyncEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api: Arc<dyn Api>,
        config: ClientConfig,
        outcome: LoginOutcome,
        publisher: Arc<dyn MessagePublisher>,
        store: Arc<dyn SnapshotStore>,
        session_tx: watch::Sender<SessionSnapshot>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let mut engine = Self {
            api,
            config,
            session: LoginSession::default(),
            cursor: SyncCursor::default(),
            directory: ContactDirectory::default(),
            sync_host: String::new(),
            publisher,
            store,
            session_tx,
            shutdown,
            pending_members: Vec::new(),
        };
        engine.adopt(outcome);
        engine
    }

    pub fn directory(&self) -> &ContactDirectory {
        &self.directory
    }

    pub fn cursor(&self) -> &SyncCursor {
        &self.cursor
    }

    /// Main loop: probe, act, repeat until shutdown.
    pub async fn run(&mut self) {
        loop {
            if *self.shutdown.borrow() {
                info!("shutdown requested, logging out");
                if let Err(err) = self.api.logout(&self.session).await {
                    warn!(error = %err, "logout failed");
                }
                return;
            }
            if !self.pending_members.is_empty() {
                let pending = std::mem::take(&mut self.pending_members);
                self.fetch_identities(pending).await;
            }
            let mut shutdown = self.shutdown.clone();
            let probe = tokio::select! {
                result = self
                    .api
                    .sync_check(&self.session, &self.sync_host, &self.cursor) => result,
                _ = shutdown.changed() => continue,
            };
            let (retcode, selector) = match probe {
                Ok(pair) => pair,
                Err(err) => {
                    warn!(error = %err, "sync probe failed, backing off");
                    tokio::time::sleep(self.config.backoff_delay).await;
                    continue;
                }
            };
            self.act(probe_action(&retcode, &selector), &retcode, &selector)
                .await;
        }
    }

    async fn act(&mut self, action: SyncAction, retcode: &str, selector: &str) {
        match action {
            SyncAction::Idle => {}
            SyncAction::FetchAndLog => {
                if let Some(batch) = self.fetch_batch().await {
                    let count = batch.add_msg_list.len();
                    self.apply_batch(batch, false).await;
                    info!(count, "profile sync batch absorbed");
                }
            }
            SyncAction::FetchAndHandle => {
                if let Some(batch) = self.fetch_batch().await {
                    self.apply_batch(batch, true).await;
                }
            }
            SyncAction::FetchContactsOnly => {
                if let Some(batch) = self.fetch_batch().await {
                    self.apply_batch(batch, false).await;
                }
            }
            SyncAction::FetchAndDiscard => {
                if let Some(batch) = self.fetch_batch().await {
                    self.apply_batch(batch, false).await;
                }
            }
            SyncAction::DoubleFetch => {
                // The first fetch only advances the cursor; the second
                // carries the actual events.
                if let Some(batch) = self.fetch_batch().await {
                    self.apply_batch(batch, false).await;
                }
                if let Some(batch) = self.fetch_batch().await {
                    self.apply_batch(batch, true).await;
                }
            }
            SyncAction::Relogin => {
                info!(%retcode, "session invalidated, attempting push relogin");
                self.recover_auth(false).await;
            }
            SyncAction::FullLogin => {
                info!(%retcode, "logged out remotely, full login required");
                self.recover_auth(true).await;
            }
            SyncAction::Unknown => {
                warn!(%retcode, %selector, "unrecognized probe response");
            }
        }
    }

    async fn fetch_batch(&self) -> Option<SyncBatch> {
        match self.api.sync(&self.session, &self.cursor).await {
            Ok(batch) => Some(batch),
            Err(err) => {
                warn!(error = %err, "batch fetch failed");
                None
            }
        }
    }

    /// Apply one event batch: contacts first, messages after, cursor
    /// replaced wholesale. A batch the server flags as failed is dropped
    /// without touching any state.
    async fn apply_batch(&mut self, batch: SyncBatch, publish_messages: bool) {
        if !batch.base_response.ok() {
            warn!(
                ret = batch.base_response.ret,
                "dropping failed sync batch, cursor unchanged"
            );
            return;
        }
        self.cursor = batch.sync_key;

        if !batch.mod_contact_list.is_empty() {
            let stale_remarks: Vec<(String, String)> = batch
                .mod_contact_list
                .iter()
                .filter_map(|raw| self.directory.get(&raw.username))
                .filter(|contact| !contact.remark_name().is_empty())
                .map(|contact| {
                    (
                        contact.remark_name().to_string(),
                        contact.username().to_string(),
                    )
                })
                .collect();
            let pending = self.directory.apply_batch(&batch.mod_contact_list);
            debug!(
                count = batch.mod_contact_list.len(),
                "contact records updated"
            );
            self.mirror_modified_contacts(&batch.mod_contact_list, &stale_remarks);
            self.fetch_identities(pending).await;
        }

        if batch.add_msg_list.is_empty() {
            return;
        }

        self.ensure_contacts_known(&batch.add_msg_list).await;

        if !publish_messages {
            return;
        }
        for raw in &batch.add_msg_list {
            match decode(self.api.as_ref(), &self.session, &self.directory, raw).await {
                Ok(Some(message)) => {
                    self.publisher.publish(&message.to_json()).await;
                }
                Ok(None) => {}
                Err(DecodeError::UnknownContact(username)) => {
                    warn!(%username, "dropping message from unresolvable contact");
                }
                Err(DecodeError::Transport(err)) => {
                    warn!(error = %err, msg_id = %raw.msg_id, "payload fetch failed, dropping message");
                }
            }
        }
    }

    /// Resolve message endpoints that are not in the directory yet, e.g.
    /// chatroom senders. One bulk fetch per batch, chunked to the protocol
    /// limit.
    async fn ensure_contacts_known(&mut self, messages: &[crate::protocol::RawMessage]) {
        let mut unknown: Vec<String> = Vec::new();
        for raw in messages {
            for username in [&raw.from_username, &raw.to_username] {
                if !username.is_empty()
                    && !self.directory.contains(username)
                    && !unknown.contains(username)
                {
                    unknown.push(username.clone());
                }
            }
        }
        self.fetch_identities(unknown).await;
    }

    /// Bulk-fetch full records for `identities`, chunked to the protocol
    /// limit. Records arriving with chatroom member lists of their own are
    /// queued for the next loop iteration.
    async fn fetch_identities(&mut self, identities: Vec<String>) {
        if identities.is_empty() {
            return;
        }
        for chunk in identities.chunks(self.config.batch_size) {
            match self.api.batch_get_contacts(&self.session, chunk).await {
                Ok(response) if response.base_response.ok() => {
                    let pending = self.directory.apply_batch(&response.contact_list);
                    for username in pending {
                        if !self.pending_members.contains(&username) {
                            self.pending_members.push(username);
                        }
                    }
                }
                Ok(response) => {
                    warn!(ret = response.base_response.ret, "bulk contact fetch rejected");
                }
                Err(err) => {
                    warn!(error = %err, "bulk contact fetch failed");
                }
            }
        }
    }

    /// Mirror mid-session contact modifications into the snapshot store so
    /// external consumers see current aliases without waiting for a relogin.
    /// The stale remark keys are dropped before the fresh mappings land.
    fn mirror_modified_contacts(
        &self,
        modified: &[crate::protocol::RawContact],
        stale_remarks: &[(String, String)],
    ) {
        let result: Result<(), crate::store::StoreError> = (|| {
            for (remark, username) in stale_remarks {
                self.store.remove_remark_mapping(remark, username)?;
            }
            for raw in modified {
                let Some(contact) = self.directory.get(&raw.username) else {
                    continue;
                };
                self.store.put_contact_record(contact)?;
                if !contact.nickname().is_empty() {
                    self.store
                        .put_nickname(contact.username(), contact.nickname())?;
                }
                if !contact.remark_name().is_empty() {
                    self.store
                        .put_remark_mapping(contact.remark_name(), contact.username())?;
                }
                if let Some(members) = contact.members() {
                    let names: Vec<(String, String)> = members
                        .iter()
                        .filter(|m| !m.display_name.is_empty())
                        .map(|m| (m.username.clone(), m.display_name.clone()))
                        .collect();
                    if !names.is_empty() {
                        self.store
                            .put_room_display_names(contact.username(), &names)?;
                    }
                }
            }
            Ok(())
        })();
        if let Err(err) = result {
            warn!(error = %err, "snapshot update failed");
        }
    }

    /// Recover from credential loss. Tries the scan-free path first unless
    /// the server demanded a full login, then falls back to QR logins until
    /// one succeeds or shutdown is requested.
    async fn recover_auth(&mut self, full_only: bool) {
        let flow = LoginFlow::new(self.api.clone(), self.config.clone());
        if !full_only {
            match flow.relogin(&self.session).await {
                Ok(Some(outcome)) => {
                    info!("push relogin succeeded");
                    self.adopt(outcome);
                    return;
                }
                Ok(None) => info!("push relogin refused, falling back to full login"),
                Err(err) => warn!(error = %err, "push relogin failed, falling back"),
            }
        }
        loop {
            if *self.shutdown.borrow() {
                return;
            }
            match flow.run().await {
                Ok(outcome) => {
                    self.adopt(outcome);
                    return;
                }
                Err(err) => {
                    warn!(error = %err, "full login failed, retrying");
                    tokio::time::sleep(self.config.backoff_delay).await;
                }
            }
        }
    }

    /// Replace the whole engine state with a fresh login outcome, persist
    /// the snapshot and publish the new session.
    fn adopt(&mut self, outcome: LoginOutcome) {
        self.session = outcome.session;
        self.cursor = outcome.cursor;
        self.sync_host = outcome.sync_host;
        let mut directory = ContactDirectory::new(outcome.own.username.clone());
        directory.upsert_raw(&outcome.own);
        // Member records referenced by bootstrap chatrooms are fetched
        // lazily by the run loop.
        self.pending_members = directory.apply_batch(&outcome.contacts);
        self.directory = directory;

        self.persist_snapshot();
        let snapshot = SessionSnapshot {
            session: self.session.clone(),
            own_username: self.directory.own_username().to_string(),
        };
        if self.session_tx.send(snapshot).is_err() {
            debug!("no session watchers");
        }
    }

    /// Write the whole directory and session to the snapshot store. Store
    /// failures are logged, never fatal: the live state stays authoritative.
    fn persist_snapshot(&self) {
        let result = (|| {
            self.store.clear_all()?;
            self.store
                .put_self_identity(self.directory.own_username())?;
            for contact in self.directory.iter() {
                self.store.put_contact_record(contact)?;
                if !contact.nickname().is_empty() {
                    self.store
                        .put_nickname(contact.username(), contact.nickname())?;
                }
                if let Some(members) = contact.members() {
                    let names: Vec<(String, String)> = members
                        .iter()
                        .filter(|m| !m.display_name.is_empty())
                        .map(|m| (m.username.clone(), m.display_name.clone()))
                        .collect();
                    if !names.is_empty() {
                        self.store
                            .put_room_display_names(contact.username(), &names)?;
                    }
                }
            }
            for (remark, username) in self.directory.remark_mappings() {
                self.store.put_remark_mapping(remark, username)?;
            }
            self.store
                .put_session_cookies(&self.api.session_cookies())
        })();
        if let Err(err) = result {
            warn!(error = %err, "snapshot persistence failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{BaseResponse, RawContact, RawMessage, SyncKeyPair};
    use crate::store::MemoryStore;
    use crate::testutil::{CollectingPublisher, MockApi};

    fn raw_contact(username: &str, nickname: &str) -> RawContact {
        RawContact {
            username: username.into(),
            nickname: nickname.into(),
            ..Default::default()
        }
    }

    fn cursor_with(key: i64, val: i64) -> SyncCursor {
        SyncCursor {
            count: 1,
            list: vec![SyncKeyPair { key, val }],
        }
    }

    fn outcome() -> LoginOutcome {
        LoginOutcome {
            session: LoginSession {
                skey: "@skey1".into(),
                sid: "sid1".into(),
                uin: "111".into(),
                pass_ticket: "ticket1".into(),
                device_id: "e1".into(),
                base_uri: "https://wx2.qq.com/cgi-bin/mmwebwx-bin".into(),
                redirect_uri: "https://wx2.qq.com/x?ticket=t&uuid=old&scan=1".into(),
                ..Default::default()
            },
            cursor: cursor_with(1, 10),
            own: raw_contact("@self", "Me"),
            contacts: vec![raw_contact("@alice", "Alice")],
            sync_host: "wx2.qq.com".into(),
        }
    }

    struct Harness {
        engine: SyncEngine,
        api: Arc<MockApi>,
        publisher: Arc<CollectingPublisher>,
        store: Arc<MemoryStore>,
        session_rx: watch::Receiver<SessionSnapshot>,
    }

    fn harness() -> Harness {
        let api = Arc::new(MockApi::new());
        let publisher = Arc::new(CollectingPublisher::default());
        let store = Arc::new(MemoryStore::new());
        let (session_tx, session_rx) = watch::channel(SessionSnapshot::default());
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let engine = SyncEngine::new(
            api.clone(),
            ClientConfig::default(),
            outcome(),
            publisher.clone(),
            store.clone(),
            session_tx,
            shutdown_rx,
        );
        Harness {
            engine,
            api,
            publisher,
            store,
            session_rx,
        }
    }

    fn text_message(from: &str, to: &str, content: &str) -> RawMessage {
        RawMessage {
            msg_id: "1".into(),
            from_username: from.into(),
            to_username: to.into(),
            msg_type: 1,
            content: content.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_state_untouched() {
        let mut h = harness();
        let batch = SyncBatch {
            base_response: BaseResponse {
                ret: 1101,
                err_msg: String::new(),
            },
            sync_key: cursor_with(1, 99),
            add_msg_list: vec![text_message("@alice", "@self", "hi")],
            mod_contact_list: Vec::new(),
        };
        h.engine.apply_batch(batch, true).await;
        assert_eq!(h.engine.cursor().as_query(), "1_10");
        assert!(h.publisher.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cursor_replaced_wholesale() {
        let mut h = harness();
        let batch = SyncBatch {
            base_response: BaseResponse::default(),
            sync_key: SyncCursor {
                count: 2,
                list: vec![
                    SyncKeyPair { key: 1, val: 11 },
                    SyncKeyPair { key: 2, val: 20 },
                ],
            },
            add_msg_list: Vec::new(),
            mod_contact_list: Vec::new(),
        };
        h.engine.apply_batch(batch, true).await;
        assert_eq!(h.engine.cursor().as_query(), "1_11|2_20");
    }

    #[tokio::test]
    async fn test_unknown_sender_fetched_then_published() {
        let mut h = harness();
        h.api.add_known_contact(raw_contact("@u1", "Stranger"));
        let batch = SyncBatch {
            base_response: BaseResponse::default(),
            sync_key: cursor_with(1, 11),
            add_msg_list: vec![text_message("@u1", "@self", "hello")],
            mod_contact_list: Vec::new(),
        };
        h.engine.apply_batch(batch, true).await;
        assert!(h
            .api
            .calls()
            .contains(&"batch_get_contacts:@u1".to_string()));
        let messages = h.publisher.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].from_nickname, "Stranger");
        assert_eq!(messages[0].content, "hello");
    }

    #[tokio::test]
    async fn test_remark_update_applied_before_messages() {
        let mut h = harness();
        let mut alice = raw_contact("@alice", "Alice");
        alice.remark_name = "Ally".into();
        let batch = SyncBatch {
            base_response: BaseResponse::default(),
            sync_key: cursor_with(1, 11),
            add_msg_list: vec![text_message("@alice", "@self", "hi")],
            mod_contact_list: vec![alice],
        };
        h.engine.apply_batch(batch, true).await;
        let messages = h.publisher.messages.lock().unwrap();
        assert_eq!(messages[0].from_remark_name, "Ally");
    }

    fn mod_batch(val: i64, contact: RawContact) -> SyncBatch {
        SyncBatch {
            base_response: BaseResponse::default(),
            sync_key: cursor_with(1, val),
            add_msg_list: Vec::new(),
            mod_contact_list: vec![contact],
        }
    }

    #[tokio::test]
    async fn test_mod_contacts_mirrored_to_store() {
        let mut h = harness();
        let mut alice = raw_contact("@alice", "Alice");
        alice.remark_name = "Ally".into();
        h.engine.apply_batch(mod_batch(11, alice.clone()), true).await;
        assert_eq!(
            h.store.get("remark:Ally").unwrap().as_deref(),
            Some("@alice")
        );
        assert_eq!(
            h.store.get("remark_of:@alice").unwrap().as_deref(),
            Some("Ally")
        );
        assert!(h.store.get("friend:@alice").unwrap().is_some());

        // A later remark change drops the stale key without a relogin.
        alice.remark_name = "Al".into();
        h.engine.apply_batch(mod_batch(12, alice), true).await;
        assert_eq!(h.store.get("remark:Ally").unwrap(), None);
        assert_eq!(h.store.get("remark:Al").unwrap().as_deref(), Some("@alice"));
        assert_eq!(
            h.store.get("remark_of:@alice").unwrap().as_deref(),
            Some("Al")
        );
    }

    #[tokio::test]
    async fn test_mod_chatroom_display_names_mirrored_to_store() {
        let mut h = harness();
        let mut member = raw_contact("@alice", "Alice");
        member.display_name = "Ops Alice".into();
        let mut room = raw_contact("@@room1", "Ops");
        room.member_list = vec![member];
        h.engine.apply_batch(mod_batch(11, room), true).await;
        assert_eq!(
            h.store.get("room:@@room1:@alice").unwrap().as_deref(),
            Some("Ops Alice")
        );
        assert!(h.store.get("chatroom:@@room1").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_contacts_only_selector_publishes_nothing() {
        let mut h = harness();
        let mut bob = raw_contact("@bob", "Bob");
        bob.remark_name = "Bobby".into();
        h.api.queue_sync_batch(SyncBatch {
            base_response: BaseResponse::default(),
            sync_key: cursor_with(1, 12),
            add_msg_list: vec![text_message("@alice", "@self", "ignored")],
            mod_contact_list: vec![bob],
        });
        h.engine
            .act(SyncAction::FetchContactsOnly, "0", "4")
            .await;
        assert_eq!(h.engine.cursor().as_query(), "1_12");
        assert!(h.engine.directory().contains("@bob"));
        assert!(h.publisher.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_double_fetch_handles_second_batch_only() {
        let mut h = harness();
        h.api.queue_sync_batch(SyncBatch {
            base_response: BaseResponse::default(),
            sync_key: cursor_with(1, 12),
            add_msg_list: vec![text_message("@alice", "@self", "first")],
            mod_contact_list: Vec::new(),
        });
        h.api.queue_sync_batch(SyncBatch {
            base_response: BaseResponse::default(),
            sync_key: cursor_with(1, 13),
            add_msg_list: vec![text_message("@alice", "@self", "second")],
            mod_contact_list: Vec::new(),
        });
        h.engine.act(SyncAction::DoubleFetch, "0", "7").await;
        assert_eq!(h.engine.cursor().as_query(), "1_13");
        let messages = h.publisher.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "second");
    }

    #[tokio::test]
    async fn test_relogin_refusal_falls_back_to_full_login() {
        let mut h = harness();
        // Push relogin refused; the scripted QR login must replace the
        // whole session.
        *h.api.push_login_uuid.lock().unwrap() = None;
        h.api.script_full_login(
            raw_contact("@self2", "Me2"),
            vec![raw_contact("@bob", "Bob")],
            cursor_with(5, 50),
        );
        h.engine.recover_auth(false).await;
        assert_eq!(h.engine.session.skey, "@skey2");
        assert_eq!(h.engine.cursor().as_query(), "5_50");
        assert_eq!(h.engine.directory().own_username(), "@self2");
        assert!(h.engine.directory().contains("@bob"));
        assert!(!h.engine.directory().contains("@alice"));
        let snapshot = h.session_rx.borrow();
        assert_eq!(snapshot.own_username, "@self2");
        assert_eq!(snapshot.session.skey, "@skey2");
    }

    #[test]
    fn test_probe_action_selectors() {
        assert_eq!(probe_action("0", "0"), SyncAction::Idle);
        assert_eq!(probe_action("0", "1"), SyncAction::FetchAndLog);
        assert_eq!(probe_action("0", "2"), SyncAction::FetchAndHandle);
        assert_eq!(probe_action("0", "3"), SyncAction::FetchAndHandle);
        assert_eq!(probe_action("0", "4"), SyncAction::FetchContactsOnly);
        assert_eq!(probe_action("0", "5"), SyncAction::FetchAndDiscard);
        assert_eq!(probe_action("0", "6"), SyncAction::FetchAndHandle);
        assert_eq!(probe_action("0", "7"), SyncAction::DoubleFetch);
        assert_eq!(probe_action("0", "9"), SyncAction::Unknown);
    }

    #[test]
    fn test_probe_action_retcodes() {
        assert_eq!(probe_action("1100", "0"), SyncAction::FullLogin);
        assert_eq!(probe_action("1101", "0"), SyncAction::Relogin);
        assert_eq!(probe_action("1102", "0"), SyncAction::Relogin);
        assert_eq!(probe_action("9999", "0"), SyncAction::Unknown);
    }
}
