//! Terminal result of one update

use core::fmt;

use crate::error::Error;
use crate::image::ImageError;
use crate::program::ProgramError;

/// Why nothing was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentReason {
    /// Flash already holds the payload byte for byte
    Identical,
    /// Image version is not newer than the device's
    NotNewer,
}

/// Failure classes of an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateError {
    /// Image file does not exist
    FileNotFound,
    /// Image file or payload size is outside the allowed range
    SizeOutOfRange {
        /// Size found
        len: usize,
        /// Largest size allowed
        max: usize,
    },
    /// Flash identification failed
    UnknownFlash {
        /// Raw identification bytes
        id: [u8; 3],
    },
    /// Command channel failed outside the program phase
    Channel(Error),
    /// Erase or program failed; flash contents are unknown
    Program(ProgramError),
    /// Read-back after programming differs from the payload
    VerifyMismatch {
        /// First differing address
        address: u32,
        /// Byte that was written
        expected: u8,
        /// Byte read back
        actual: u8,
    },
    /// Image header is malformed
    InvalidImage(ImageError),
}

impl UpdateError {
    /// Short name of the failure class
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FileNotFound => "file-not-found",
            Self::SizeOutOfRange { .. } => "size-out-of-range",
            Self::UnknownFlash { .. } => "unknown-flash",
            Self::Channel(_) => "channel",
            Self::Program(_) => "program",
            Self::VerifyMismatch { .. } => "verify-mismatch",
            Self::InvalidImage(_) => "invalid-image",
        }
    }

    /// Negative exit code of the failure class
    pub fn code(&self) -> i32 {
        match self {
            Self::FileNotFound => -1,
            Self::SizeOutOfRange { .. } => -2,
            Self::UnknownFlash { .. } => -3,
            Self::Channel(_) => -5,
            Self::VerifyMismatch { .. } => -6,
            Self::Program(_) => -7,
            Self::InvalidImage(_) => -8,
        }
    }
}

impl From<Error> for UpdateError {
    fn from(e: Error) -> Self {
        match e {
            Error::UnknownFlash { id } => Self::UnknownFlash { id },
            other => Self::Channel(other),
        }
    }
}

impl From<ProgramError> for UpdateError {
    fn from(e: ProgramError) -> Self {
        Self::Program(e)
    }
}

impl From<ImageError> for UpdateError {
    fn from(e: ImageError) -> Self {
        Self::InvalidImage(e)
    }
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileNotFound => write!(f, "image file not found"),
            Self::SizeOutOfRange { len, max } => {
                write!(f, "image size {} out of range (max {})", len, max)
            }
            Self::UnknownFlash { id } => write!(
                f,
                "unknown flash, id = {:02X} {:02X} {:02X}",
                id[0], id[1], id[2]
            ),
            Self::Channel(e) => write!(f, "channel error: {}", e),
            Self::Program(e) => write!(f, "{}", e),
            Self::VerifyMismatch {
                address,
                expected,
                actual,
            } => write!(
                f,
                "verify failed at 0x{:08X}: expected 0x{:02X}, read 0x{:02X}",
                address, expected, actual
            ),
            Self::InvalidImage(e) => write!(f, "invalid image: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UpdateError {}

/// Terminal report for one (device, image) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Image was written and verified
    Applied,
    /// Nothing needed to be written
    AlreadyCurrent(CurrentReason),
    /// Image may not be installed on this device
    Incompatible,
    /// Update failed
    Error(UpdateError),
}

impl UpdateOutcome {
    /// Process exit code: 1 applied, 0 nothing to do, negative on failure
    pub fn code(&self) -> i32 {
        match self {
            Self::Applied => 1,
            Self::AlreadyCurrent(_) => 0,
            Self::Incompatible => -4,
            Self::Error(e) => e.code(),
        }
    }

    /// Returns true if the image was written
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    /// Returns true for failures (not for policy skips)
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl From<UpdateError> for UpdateOutcome {
    fn from(e: UpdateError) -> Self {
        Self::Error(e)
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => write!(f, "applied"),
            Self::AlreadyCurrent(CurrentReason::Identical) => {
                write!(f, "already current (flash contents identical)")
            }
            Self::AlreadyCurrent(CurrentReason::NotNewer) => {
                write!(f, "already current (image not newer)")
            }
            Self::Incompatible => write!(f, "image not compatible with this card"),
            Self::Error(e) => write!(f, "failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let outcomes = [
            UpdateOutcome::Applied,
            UpdateOutcome::AlreadyCurrent(CurrentReason::Identical),
            UpdateOutcome::Incompatible,
            UpdateError::FileNotFound.into(),
            UpdateError::SizeOutOfRange { len: 0, max: 0 }.into(),
            UpdateError::UnknownFlash { id: [0; 3] }.into(),
            UpdateError::Channel(Error::ChannelFailed).into(),
            UpdateError::VerifyMismatch {
                address: 0,
                expected: 0,
                actual: 1,
            }
            .into(),
            UpdateError::Program(ProgramError {
                offset: 0,
                source: Error::Timeout,
            })
            .into(),
            UpdateError::InvalidImage(ImageError::InvalidValue {
                key: crate::image::HeaderKey::Length,
            })
            .into(),
        ];
        let codes: alloc::vec::Vec<i32> = outcomes.iter().map(|o| o.code()).collect();
        assert_eq!(codes, [1, 0, -4, -1, -2, -3, -5, -6, -7, -8]);
    }

    #[test]
    fn test_unknown_flash_error_maps_to_its_own_class() {
        let e: UpdateError = Error::UnknownFlash { id: [1, 2, 3] }.into();
        assert_eq!(e, UpdateError::UnknownFlash { id: [1, 2, 3] });
        let e: UpdateError = Error::Timeout.into();
        assert_eq!(e.kind(), "channel");
    }
}
