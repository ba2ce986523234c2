//! Types module for webwx domain types.
//!
//! Contains the classified contact model and the decoded message types
//! handed to the publish sink.

mod contact;
mod message;

pub use contact::*;
pub use message::*;
