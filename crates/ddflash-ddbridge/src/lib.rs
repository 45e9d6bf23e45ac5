//! ddflash-ddbridge - Digital Devices ddbridge flash channel
//!
//! This crate talks to the configuration flash of a Digital Devices card
//! through the ddbridge driver's character device at
//! `/dev/ddbridge/cardN`.
//!
//! # Overview
//!
//! The driver exposes two ioctls used here:
//!
//! - `FLASHIO` runs one SPI cycle (write phase, then read phase) against
//!   the flash behind a given link
//! - `ID` reports the card's PCI ids and the running FPGA version
//!
//! # Example
//!
//! ```no_run
//! use ddflash_ddbridge::{DdBridge, DdBridgeConfig};
//! use ddflash_core::chip;
//!
//! let mut card = DdBridge::open(&DdBridgeConfig::new(0))?;
//! let part = chip::identify(&mut card)?;
//! println!("{} {} on device 0x{:04X}", part.vendor, part.name, card.card_id().device);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Usage with the ddflash CLI
//!
//! ```bash
//! # Probe the flash of card 0
//! ddflash probe -c ddbridge
//!
//! # Update the flash behind link 1 of card 2
//! ddflash update -c ddbridge:card=2,link=1 DVBBridgeV2A_DD01_0007_MXL.fpga
//! ```
//!
//! # System Requirements
//!
//! - The ddbridge kernel module loaded
//! - Read/write access to `/dev/ddbridge/cardN`

pub mod device;
pub mod error;

// Re-exports
pub use device::{parse_options, CardId, DdBridge, DdBridgeConfig, MAX_READ_LEN, MAX_WRITE_LEN};
pub use error::{DdBridgeError, Result};

/// Open a ddbridge card from channel string options
///
/// # Example Options
///
/// - `card=0` - Optional: card number (default: 0)
/// - `link=1` - Optional: link number 0-3 (default: 0)
/// - `dev=/dev/ddbridge/card0` - Optional: explicit device path
pub fn open_ddbridge(
    options: &[(&str, &str)],
) -> std::result::Result<DdBridge, Box<dyn std::error::Error>> {
    let config = parse_options(options)?;
    Ok(DdBridge::open(&config)?)
}
