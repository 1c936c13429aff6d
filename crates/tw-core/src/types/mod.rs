//! Core data types: exchanges, markets, frames, messages, trades and
//! subscription bookkeeping.

pub mod enums;
pub mod market;
pub mod message;
pub mod subscription;
pub mod trade;

pub use enums::*;
pub use market::*;
pub use message::*;
pub use subscription::*;
pub use trade::*;
