//! Protocol implementations
//!
//! This module contains the command sequences shared by the program
//! strategies: identification, status polling, write enable, status
//! register writes and chunked reads. JEDEC sequences live in `spi25`,
//! Atmel DataFlash ones in `dataflash`.

pub mod dataflash;
mod spi25;

pub use spi25::*;

/// Bounds for one busy-poll loop
///
/// Timeouts are counted in status reads, not wall-clock time. Exceeding
/// `max_polls` fails with `Error::Timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Maximum number of status reads before giving up
    pub max_polls: u32,
    /// Delay between status reads in microseconds
    pub delay_us: u32,
}

impl PollConfig {
    /// Create a new poll configuration
    pub const fn new(max_polls: u32, delay_us: u32) -> Self {
        Self {
            max_polls,
            delay_us,
        }
    }

    /// Erase default: 10 000 polls, 100 µs apart (1 s)
    pub const ERASE: Self = Self::new(10_000, 100);

    /// Program default: 1 000 polls, 10 µs apart (10 ms)
    pub const PROGRAM: Self = Self::new(1_000, 10);

    /// Status register write: 500 polls, 1 ms apart
    pub const STATUS_WRITE: Self = Self::new(500, 1_000);
}
