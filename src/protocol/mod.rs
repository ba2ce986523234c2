//! Protocol layer: wire shapes and the endpoint trait.

mod api;
mod wire;

pub use api::{gen_client_msg_id, gen_device_id, replace_uuid, Api, HttpApi};
pub use wire::*;
