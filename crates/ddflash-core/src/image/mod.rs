//! Firmware image parsing and install policy
//!
//! An image file is an optional ASCII header of `key:value` lines followed
//! by the binary payload. The header ends at a `0x00` byte (consumed) or at
//! the first line that is not a well-formed header line (not consumed).
//! The buffer itself is never modified; the payload is always a byte-exact
//! slice of the input.

mod bitstream;
mod header;

use alloc::vec::Vec;
use core::fmt;
use log::{debug, info};

pub use bitstream::{find as find_bitstream_id, BitstreamId, SEARCH_WINDOW};
pub use header::{format_version, parse_hex, parse_version, Header, HeaderKey};

/// Smallest image file accepted from disk
pub const MIN_FILE_SIZE: usize = 1024;
/// Largest image file accepted from disk
pub const MAX_FILE_SIZE: usize = 5_000_000;

/// Image rejection reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageError {
    /// A recognized header key has a value that does not parse
    InvalidValue {
        /// Offending key
        key: HeaderKey,
    },
    /// `Length` points past the end of the buffer
    LengthExceedsBuffer {
        /// Where the payload starts
        payload_offset: usize,
        /// Declared payload length
        length: usize,
        /// Size of the whole buffer
        buffer_len: usize,
    },
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { key } => write!(f, "invalid value for header key {}", key),
            Self::LengthExceedsBuffer {
                payload_offset,
                length,
                buffer_len,
            } => write!(
                f,
                "declared length {} at offset {} exceeds image size {}",
                length, payload_offset, buffer_len
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ImageError {}

/// A firmware image: owned bytes plus the parsed header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareImage {
    data: Vec<u8>,
    header: Option<Header>,
    payload_offset: usize,
}

impl FirmwareImage {
    /// Parse an image, extracting the header if there is one
    pub fn parse(data: Vec<u8>) -> Result<Self, ImageError> {
        let mut header = Header::default();
        let mut lines = 0;
        let mut pos = 0;

        while pos < data.len() {
            if data[pos] == 0 {
                if lines > 0 {
                    pos += 1;
                }
                break;
            }
            let Some(len) = data[pos..].iter().position(|&b| b == b'\n') else {
                break;
            };
            let Some((key, value)) = header::split_line(&data[pos..pos + len]) else {
                break;
            };
            header
                .insert(key, value)
                .map_err(|key| ImageError::InvalidValue { key })?;
            lines += 1;
            pos += len + 1;
        }

        if lines == 0 {
            debug!("Image has no header, {} bytes of payload", data.len());
            return Ok(Self::raw(data));
        }

        if let Some(length) = header.length {
            if pos.checked_add(length).map_or(true, |end| end > data.len()) {
                return Err(ImageError::LengthExceedsBuffer {
                    payload_offset: pos,
                    length,
                    buffer_len: data.len(),
                });
            }
        }

        info!(
            "Image header: devid {:?}, version {:?}, payload at 0x{:X}",
            header.device_id, header.version, pos
        );
        Ok(Self {
            data,
            header: Some(header),
            payload_offset: pos,
        })
    }

    /// Use the whole buffer as payload without looking for a header
    pub fn raw(data: Vec<u8>) -> Self {
        Self {
            data,
            header: None,
            payload_offset: 0,
        }
    }

    /// Parsed header, if the image has one
    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    /// Offset of the first payload byte
    pub fn payload_offset(&self) -> usize {
        self.payload_offset
    }

    /// Payload bytes: `Length` bytes after the header, or everything after it
    pub fn payload(&self) -> &[u8] {
        let rest = &self.data[self.payload_offset..];
        match self.header.as_ref().and_then(|h| h.length) {
            Some(length) => &rest[..length],
            None => rest,
        }
    }

    /// The complete buffer, header included
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Identifier embedded in the payload, if it is an FPGA bitstream
    pub fn bitstream_id(&self) -> Option<BitstreamId> {
        bitstream::find(self.payload())
    }

    /// Check the on-disk size gate
    pub fn file_size_ok(len: usize) -> bool {
        (MIN_FILE_SIZE..=MAX_FILE_SIZE).contains(&len)
    }
}

/// Why an image is not installed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Image version is not newer than the installed one
    NotNewer,
}

/// Install decision for one image on one device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Install the image
    Apply,
    /// Leave the device alone
    Skip(SkipReason),
    /// Image may not be installed on this device
    Incompatible,
}

/// Decide whether `image` should be installed on a device
///
/// A compatibility list that does not name the device makes the image
/// incompatible regardless of version. An image built for this very device
/// id is skipped unless its version is newer. Everything else is applied.
pub fn decide(image: &FirmwareImage, target_device_id: u32, target_version: u32) -> Decision {
    let Some(header) = image.header() else {
        return Decision::Apply;
    };

    if let Some(compat) = &header.compat {
        if !compat.contains(&target_device_id) {
            return Decision::Incompatible;
        }
    }

    if header.device_id == Some(target_device_id) {
        if let Some(version) = header.version {
            if version <= target_version {
                return Decision::Skip(SkipReason::NotNewer);
            }
        }
    }

    Decision::Apply
}
