//! Outbound command dispatch.
//!
//! Consumes JSON commands from a [`CommandSource`] and executes them
//! against the protocol endpoints, reading the current session from the
//! watch channel the engine publishes. The dispatcher never mutates engine
//! state: remark and topic changes come back through the sync stream like
//! any other contact update.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::protocol::Api;
use crate::sink::CommandSource;
use crate::sync::SessionSnapshot;
use crate::types::MsgType;

/// Kinds of commands accepted on the inbound channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    SendMessage,
    ModifyFriendRemarkName,
    ModifyChatroomName,
    RevokeMessage,
    #[serde(other)]
    Unknown,
}

/// One inbound command. `content` is the text body, media URL, remark
/// name, topic or message id depending on the kind; `msg_type` selects the
/// send flavor for [`CommandKind::SendMessage`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InboundCommand {
    pub event_type: CommandKind,
    pub to_username: String,
    pub content: String,
    #[serde(default)]
    pub msg_type: Option<i64>,
}

/// The dispatcher task.
pub struct CommandDispatcher {
    api: Arc<dyn Api>,
    session_rx: watch::Receiver<SessionSnapshot>,
}

impl CommandDispatcher {
    pub fn new(api: Arc<dyn Api>, session_rx: watch::Receiver<SessionSnapshot>) -> Self {
        Self { api, session_rx }
    }

    /// Pull commands until the source ends or shutdown is requested, acking
    /// each with its dispatch result.
    pub async fn run<S: CommandSource>(
        &self,
        mut source: S,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            let command = tokio::select! {
                command = source.recv() => match command {
                    Some(command) => command,
                    None => {
                        info!("command source closed");
                        return;
                    }
                },
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                    continue;
                }
            };
            let success = self.dispatch(&command).await;
            source.ack(&command, success).await;
        }
    }

    /// Execute one command. Returns whether the server accepted it; errors
    /// are logged and reported as failure, never propagated.
    pub async fn dispatch(&self, command: &InboundCommand) -> bool {
        let snapshot = self.session_rx.borrow().clone();
        if snapshot.own_username.is_empty() {
            warn!("no session yet, dropping command");
            return false;
        }
        let session = &snapshot.session;
        let result = match command.event_type {
            CommandKind::SendMessage => {
                match command.msg_type.and_then(MsgType::from_code) {
                    Some(MsgType::Text) | None => {
                        self.api
                            .send_text(
                                session,
                                &snapshot.own_username,
                                &command.to_username,
                                &command.content,
                            )
                            .await
                    }
                    Some(MsgType::Image) => {
                        self.send_uploaded(&snapshot, command, MsgType::Image).await
                    }
                    Some(MsgType::File) => {
                        self.send_uploaded(&snapshot, command, MsgType::File).await
                    }
                    Some(other) => {
                        warn!(msg_type = other.code(), "unsupported send kind");
                        return false;
                    }
                }
            }
            CommandKind::ModifyFriendRemarkName => {
                self.api
                    .set_remark_name(session, &command.to_username, &command.content)
                    .await
            }
            CommandKind::ModifyChatroomName => {
                self.api
                    .update_chatroom_topic(session, &command.to_username, &command.content)
                    .await
            }
            CommandKind::RevokeMessage => {
                self.api
                    .revoke_message(session, &command.to_username, &command.content)
                    .await
            }
            CommandKind::Unknown => {
                warn!("ignoring command of unknown kind");
                return true;
            }
        };
        match result {
            Ok(accepted) => {
                if !accepted {
                    warn!(event_type = ?command.event_type, "server rejected command");
                }
                accepted
            }
            Err(err) => {
                warn!(event_type = ?command.event_type, error = %err, "command failed");
                false
            }
        }
    }

    /// Upload the media behind `content` (a URL) and send it as an image or
    /// file message.
    async fn send_uploaded(
        &self,
        snapshot: &SessionSnapshot,
        command: &InboundCommand,
        kind: MsgType,
    ) -> Result<bool, crate::transport::TransportError> {
        let session = &snapshot.session;
        let (media_id, file_size) =
            match self.api.upload_media(session, &command.content).await? {
                Some(uploaded) => uploaded,
                None => {
                    warn!(url = %command.content, "media upload failed");
                    return Ok(false);
                }
            };
        match kind {
            MsgType::Image => {
                self.api
                    .send_image(
                        session,
                        &snapshot.own_username,
                        &command.to_username,
                        &media_id,
                    )
                    .await
            }
            _ => {
                self.api
                    .send_app_file(
                        session,
                        &snapshot.own_username,
                        &command.to_username,
                        &media_id,
                        &command.content,
                        file_size,
                    )
                    .await
            }
        }
    }
}
