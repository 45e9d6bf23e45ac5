//! Flash chip types and registry
//!
//! This module provides the descriptor of a detected flash part, the
//! status register layouts of the supported families, and the static table
//! that maps identification bytes to descriptors.

mod registry;
mod status;
mod types;

pub use registry::*;
pub use status::{DataFlashStatus, StatusRegister};
pub use types::*;
