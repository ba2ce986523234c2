//! Snapshot store interface.
//!
//! After every successful login or relogin the engine persists a snapshot
//! of the session: identity, remark index, nicknames, room display names,
//! classification buckets and the session cookies. The snapshot is always
//! written from scratch so a stale session never leaves partial state.

use thiserror::Error;

use crate::types::Contact;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for one session snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Drop everything from the previous snapshot.
    fn clear_all(&self) -> StoreResult<()>;

    /// Record which identity is the logged-in account.
    fn put_self_identity(&self, username: &str) -> StoreResult<()>;

    /// Record one remark alias in both directions.
    fn put_remark_mapping(&self, remark: &str, username: &str) -> StoreResult<()>;

    /// Drop a remark alias in both directions. Called when a contact
    /// modification replaces or clears the alias mid-session.
    fn remove_remark_mapping(&self, remark: &str, username: &str) -> StoreResult<()>;

    /// Record an identity's nickname.
    fn put_nickname(&self, username: &str, nickname: &str) -> StoreResult<()>;

    /// Record the in-room display names of a chatroom's members.
    fn put_room_display_names(
        &self,
        room_username: &str,
        names: &[(String, String)],
    ) -> StoreResult<()>;

    /// Record one classified contact under its bucket.
    fn put_contact_record(&self, contact: &Contact) -> StoreResult<()>;

    /// Record the session cookies for later reuse.
    fn put_session_cookies(&self, cookies: &[(String, String)]) -> StoreResult<()>;
}
