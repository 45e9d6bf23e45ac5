//! Erase/program strategies, one per flash family
//!
//! Every strategy runs the same contract: validate the range without
//! touching the bus, erase, program, and stop at the first failing
//! transaction. A failure leaves the region in an unknown state; callers
//! must verify before trusting or rewriting it.
//!
//! The byte-stream and page strategies erase ascending but program
//! descending, so the lowest sector (which holds the boot image) is always
//! the last one written.

mod buffer;
mod byte_stream;
mod page;

use core::fmt;

use crate::channel::CommandChannel;
use crate::chip::{FlashDescriptor, FlashFamily};
use crate::error::Error;
use crate::progress::ProgressSink;

pub use crate::protocol::PollConfig;
pub use buffer::BufferMode;
pub use byte_stream::ByteStreamMode;
pub use page::PageMode;

/// Failure during erase or program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramError {
    /// Absolute flash address of the failing transaction
    pub offset: u32,
    /// Underlying channel or precondition error
    pub source: Error,
}

impl ProgramError {
    /// Returns a closure that attaches `offset` to an error, for `map_err`
    pub fn at(offset: u32) -> impl FnOnce(Error) -> ProgramError {
        move |source| ProgramError { offset, source }
    }
}

impl fmt::Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "programming failed at 0x{:08X}: {}", self.offset, self.source)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProgramError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Poll limits for the erase and program phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSet {
    /// Poll limit after each sector or block erase
    pub erase: PollConfig,
    /// Poll limit after each program transaction
    pub program: PollConfig,
}

impl Default for PollSet {
    fn default() -> Self {
        Self {
            erase: PollConfig::ERASE,
            program: PollConfig::PROGRAM,
        }
    }
}

/// Erase/program algorithm for one flash family
pub trait ProgramStrategy {
    /// Family this strategy drives
    fn family(&self) -> FlashFamily;

    /// Erase `offset..offset + data.len()` and program it with `data`
    ///
    /// `data.len()` must be a non-zero multiple of `chip.sector_size`, and
    /// the range must be sector-aligned and inside the part; otherwise this
    /// fails before any transaction is sent.
    fn erase_and_program(
        &self,
        channel: &mut dyn CommandChannel,
        chip: &FlashDescriptor,
        offset: u32,
        data: &[u8],
        progress: &mut dyn ProgressSink,
    ) -> Result<(), ProgramError>;
}
