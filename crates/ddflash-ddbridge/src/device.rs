//! ddbridge card device implementation
//!
//! This module provides the `DdBridge` struct that implements the
//! `CommandChannel` trait on top of the ddbridge driver's `FLASHIO` ioctl.

use crate::error::{DdBridgeError, Result};

use ddflash_core::channel::CommandChannel;
use ddflash_core::error::{Error as CoreError, Result as CoreResult};
use ddflash_core::update::UpdateTarget;

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;

/// Largest write phase the driver accepts (opcode, address and one 1 KiB page)
pub const MAX_WRITE_LEN: usize = 1028;

/// Largest read phase the driver accepts
pub const MAX_READ_LEN: usize = 1024;

/// ddbridge ioctl definitions
mod ioctl {
    use nix::{ioctl_read, ioctl_write_ptr};

    const DDB_MAGIC: u8 = b'd';

    /// `struct ddb_flashio`
    #[repr(C)]
    #[derive(Debug)]
    pub struct DdbFlashio {
        pub write_buf: *const u8,
        pub write_len: u32,
        pub read_buf: *mut u8,
        pub read_len: u32,
        pub link: u32,
    }

    /// `struct ddb_id`
    #[repr(C)]
    #[derive(Debug, Default, Clone, Copy)]
    pub struct DdbId {
        pub vendor: u16,
        pub device: u16,
        pub subvendor: u16,
        pub subdevice: u16,
        pub hw: u32,
        pub regmap: u32,
    }

    // The driver fills read_buf through the pointer, so FLASHIO is declared
    // as a write of the descriptor only.
    ioctl_write_ptr!(ddb_flashio, DDB_MAGIC, 0x00, DdbFlashio);
    ioctl_read!(ddb_id, DDB_MAGIC, 0x03, DdbId);
}

/// Identification reported by the card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardId {
    /// PCI vendor id
    pub vendor: u16,
    /// Device id, matched against image `Devid`
    pub device: u16,
    /// PCI subsystem vendor id
    pub subvendor: u16,
    /// PCI subsystem id
    pub subdevice: u16,
    /// Raw hardware version register
    pub hw: u32,
    /// Register map version
    pub regmap: u32,
}

impl CardId {
    /// Running FPGA version (low 24 bits of the hardware register)
    pub fn hw_version(&self) -> u32 {
        self.hw & 0xFF_FFFF
    }

    /// Update target describing this card
    pub fn target(&self) -> UpdateTarget {
        UpdateTarget::new(u32::from(self.device), self.hw_version())
    }
}

impl From<ioctl::DdbId> for CardId {
    fn from(id: ioctl::DdbId) -> Self {
        Self {
            vendor: id.vendor,
            device: id.device,
            subvendor: id.subvendor,
            subdevice: id.subdevice,
            hw: id.hw,
            regmap: id.regmap,
        }
    }
}

/// Configuration for opening a ddbridge card
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DdBridgeConfig {
    /// Card number (`/dev/ddbridge/cardN`)
    pub card: u32,
    /// Link the flash sits behind (0 for the card's own flash)
    pub link: u32,
    /// Explicit device path, overriding `card`
    pub device: Option<String>,
}

impl DdBridgeConfig {
    /// Create a new configuration for card `card`, link 0
    pub fn new(card: u32) -> Self {
        Self {
            card,
            ..Default::default()
        }
    }

    /// Set the link number
    pub fn with_link(mut self, link: u32) -> Self {
        self.link = link;
        self
    }

    /// Path of the card's character device
    pub fn device_path(&self) -> String {
        match &self.device {
            Some(path) => path.clone(),
            None => format!("/dev/ddbridge/card{}", self.card),
        }
    }
}

/// Flash channel over a ddbridge card
///
/// Each `transact()` is one `FLASHIO` ioctl, which the driver runs as a
/// single chip-select cycle on the configured link.
pub struct DdBridge {
    file: File,
    link: u32,
    id: CardId,
}

impl DdBridge {
    /// Open a card with the given configuration and read its id
    pub fn open(config: &DdBridgeConfig) -> Result<Self> {
        let path = config.device_path();
        log::debug!("ddbridge: Opening device {}", path);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| DdBridgeError::OpenFailed {
                path: path.clone(),
                source: e,
            })?;

        let mut raw = ioctl::DdbId::default();
        // SAFETY: the fd is open and `raw` is a valid, writable DdbId.
        unsafe { ioctl::ddb_id(file.as_raw_fd(), &mut raw) }
            .map_err(|e| DdBridgeError::IdFailed(std::io::Error::from_raw_os_error(e as i32)))?;
        let id = CardId::from(raw);

        log::info!(
            "ddbridge: Opened {} (device 0x{:04X}, subdevice 0x{:04X}, hw 0x{:06X}, regmap 0x{:08X}, link {})",
            path,
            id.device,
            id.subdevice,
            id.hw_version(),
            id.regmap,
            config.link
        );

        Ok(Self {
            file,
            link: config.link,
            id,
        })
    }

    /// Open card `card` on link 0
    pub fn open_card(card: u32) -> Result<Self> {
        Self::open(&DdBridgeConfig::new(card))
    }

    /// Identification read at open time
    pub fn card_id(&self) -> CardId {
        self.id
    }

    /// Link this channel talks to
    pub fn link(&self) -> u32 {
        self.link
    }

    /// One FLASHIO cycle
    fn flashio(&mut self, write: &[u8], read: &mut [u8]) -> Result<()> {
        if write.len() > MAX_WRITE_LEN {
            return Err(DdBridgeError::TransferTooLarge {
                len: write.len(),
                max: MAX_WRITE_LEN,
            });
        }
        if read.len() > MAX_READ_LEN {
            return Err(DdBridgeError::TransferTooLarge {
                len: read.len(),
                max: MAX_READ_LEN,
            });
        }

        let io = ioctl::DdbFlashio {
            write_buf: write.as_ptr(),
            write_len: write.len() as u32,
            read_buf: if read.is_empty() {
                std::ptr::null_mut()
            } else {
                read.as_mut_ptr()
            },
            read_len: read.len() as u32,
            link: self.link,
        };

        // SAFETY: both buffers outlive the ioctl and their lengths match
        // the descriptor.
        unsafe { ioctl::ddb_flashio(self.file.as_raw_fd(), &io) }.map_err(|e| {
            DdBridgeError::TransferFailed {
                link: self.link,
                source: std::io::Error::from_raw_os_error(e as i32),
            }
        })?;
        Ok(())
    }
}

impl CommandChannel for DdBridge {
    fn transact(&mut self, write: &[u8], read: &mut [u8]) -> CoreResult<()> {
        self.flashio(write, read).map_err(|e| match e {
            DdBridgeError::TransferTooLarge { len, max } => CoreError::TransferTooLarge { len, max },
            e => {
                log::error!("ddbridge: {}", e);
                CoreError::ChannelFailed
            }
        })
    }

    fn max_transfer_len(&self) -> usize {
        MAX_READ_LEN
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(std::time::Duration::from_micros(us as u64));
    }
}

/// Parse channel options from a list of key-value pairs
///
/// Recognized keys: `card` (default 0), `link` (default 0) and `dev`
/// (explicit device path).
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<DdBridgeConfig, String> {
    let mut config = DdBridgeConfig::default();

    for (key, value) in options {
        match *key {
            "card" => {
                config.card = value
                    .parse()
                    .map_err(|_| format!("Invalid card value: {}", value))?;
            }
            "link" => {
                let link: u32 = value
                    .parse()
                    .map_err(|_| format!("Invalid link value: {}", value))?;
                if link > 3 {
                    return Err(format!("Invalid link: {} (must be 0-3)", link));
                }
                config.link = link;
            }
            "dev" => {
                config.device = Some(value.to_string());
            }
            _ => {
                log::warn!("ddbridge: Unknown option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}
