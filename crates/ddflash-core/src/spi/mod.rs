//! SPI types and transaction structures
//!
//! This module provides types for representing command channel
//! transactions and the opcodes of the supported flash families.

mod address;
pub mod opcodes;
mod transaction;

pub use address::AddressWidth;
pub use opcodes::*;
pub use transaction::Transaction;
