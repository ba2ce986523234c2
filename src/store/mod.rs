//! Session snapshot persistence.

mod memory;
mod traits;

pub use memory::*;
pub use traits::*;
