//! webwx-rust: WeChat Web Protocol Client
//!
//! A Rust client for the reverse-engineered WeChat Web ("webwx") protocol:
//! QR login, long-poll sync, contact directory, message decoding and an
//! outbound command dispatcher.
//!
//! ## Modules
//!
//! - `types` - Classified contacts and decoded messages
//! - `protocol` - Wire shapes and the endpoint trait
//! - `login` - QR login state machine and session handshake
//! - `sync` - Long-poll engine owning session, cursor and directory
//! - `dispatch` - Outbound command execution
//! - `store` - Session snapshot persistence

pub mod config;
pub mod decoder;
pub mod directory;
pub mod dispatch;
pub mod emoji;
pub mod login;
pub mod protocol;
pub mod sink;
pub mod store;
pub mod sync;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::ClientConfig;
pub use dispatch::{CommandDispatcher, CommandKind, InboundCommand};
pub use login::{LoginError, LoginFlow, LoginOutcome, LoginState};
pub use protocol::{Api, HttpApi, LoginSession, SyncCursor};
pub use sink::{CommandSource, MessagePublisher, StdinCommandSource, StdoutPublisher};
pub use store::{MemoryStore, SnapshotStore};
pub use sync::{probe_action, SessionSnapshot, SyncAction, SyncEngine};
pub use transport::{SessionTransport, TransportError};
pub use types::{Contact, ContactInfo, Message, MessageContent, MessageJson, MsgType};
