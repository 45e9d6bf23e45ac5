//! CLI command implementations
//!
//! Every command that touches the flash takes the channel as
//! `&mut dyn CommandChannel`, so the same code runs against a ddbridge
//! card or the dummy emulator.

mod inspect;
mod list;
mod probe;
mod progress;
mod read;
pub mod update;
mod verify;
mod write;

pub use inspect::run_inspect;
pub use list::{list_cards, list_channels, list_chips};
pub use probe::run_probe;
pub use progress::IndicatifProgress;
pub use read::run_read;
pub use verify::run_verify;
pub use write::run_write;
