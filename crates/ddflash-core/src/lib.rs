//! ddflash-core - SPI-NOR flash engine for Digital Devices cards
//!
//! This crate identifies the configuration flash behind a card's bridge,
//! erases and programs it with the command sequence of its flash family,
//! reads it back for verification, and drives firmware updates from
//! header-tagged image files. It is `no_std` compatible (with `alloc`);
//! the `std` feature adds file loading and TOML update plans.
//!
//! # Features
//!
//! - `std` - Enable standard library support (default)
//!
//! # Example
//!
//! ```ignore
//! use ddflash_core::update::{Updater, UpdateRequest, UpdateTarget};
//!
//! fn flash(channel: &mut dyn ddflash_core::channel::CommandChannel, image: &[u8]) {
//!     let target = UpdateTarget::new(0x0007, 0x0001_0003);
//!     let mut updater = Updater::new(channel, target);
//!     let image = ddflash_core::image::FirmwareImage::parse(image.to_vec()).unwrap();
//!     let outcome = updater.update(&image, &UpdateRequest::new(0x10000, 0x1F0000));
//!     println!("{}", outcome);
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod catalog;
pub mod channel;
pub mod chip;
pub mod error;
pub mod image;
pub mod program;
pub mod progress;
pub mod protocol;
pub mod spi;
pub mod update;
pub mod verify;

pub use error::{Error, Result};
