//! Error types for ddflash-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Channel errors
    /// The command channel reported a failed transaction
    ChannelFailed,
    /// A busy-poll exceeded its retry budget
    Timeout,
    /// Transaction is larger than the channel can carry in one cycle
    TransferTooLarge {
        /// Requested length
        len: usize,
        /// Channel limit
        max: usize,
    },
    /// Opcode is not understood by the device behind the channel
    OpcodeNotSupported(u8),

    // Chip errors
    /// Identification bytes do not match any supported flash part
    UnknownFlash {
        /// Raw bytes returned by the identification transaction
        id: [u8; 3],
    },
    /// Device rejected a write or erase (write enable latch not set)
    WriteProtected,

    // Address/size errors
    /// Offset or length is not a multiple of the sector size
    InvalidAlignment {
        /// Offending offset or length
        value: u32,
        /// Required alignment
        sector_size: u32,
    },
    /// Range extends beyond the end of the flash part
    AddressOutOfBounds {
        /// Start of the range
        offset: u32,
        /// Length of the range
        len: u32,
    },
    /// Zero-length program request
    EmptyBuffer,
}

impl Error {
    /// Returns true for errors raised before any bus activity took place
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::InvalidAlignment { .. } | Self::AddressOutOfBounds { .. } | Self::EmptyBuffer
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelFailed => write!(f, "command channel transaction failed"),
            Self::Timeout => write!(f, "flash stayed busy past the poll limit"),
            Self::TransferTooLarge { len, max } => {
                write!(f, "transfer of {} bytes exceeds channel limit of {}", len, max)
            }
            Self::OpcodeNotSupported(op) => write!(f, "opcode 0x{:02X} not supported", op),
            Self::UnknownFlash { id } => write!(
                f,
                "unknown flash, id = {:02X} {:02X} {:02X}",
                id[0], id[1], id[2]
            ),
            Self::WriteProtected => write!(f, "flash is write protected"),
            Self::InvalidAlignment { value, sector_size } => write!(
                f,
                "0x{:08X} is not a multiple of the {} byte sector size",
                value, sector_size
            ),
            Self::AddressOutOfBounds { offset, len } => write!(
                f,
                "range 0x{:08X}+0x{:X} is beyond the end of the flash",
                offset, len
            ),
            Self::EmptyBuffer => write!(f, "nothing to program"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
