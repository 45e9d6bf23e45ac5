//! Command channel traits and abstractions
//!
//! This module defines the transport contract every flash operation runs
//! on top of. The engine never opens, closes, or reconfigures a channel; it
//! only borrows one for the duration of a call.

mod traits;

#[cfg(test)]
pub(crate) mod mock;

pub use traits::*;
