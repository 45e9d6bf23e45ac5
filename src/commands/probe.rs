//! Probe command implementation

use ddflash_core::catalog;
use ddflash_core::channel::CommandChannel;
use ddflash_core::chip::{self, FlashDescriptor};
use ddflash_core::image::format_version;
use ddflash_core::update::UpdateTarget;

/// Identify the flash behind `channel` and print what was found
pub fn run_probe(
    channel: &mut dyn CommandChannel,
    target: Option<UpdateTarget>,
) -> Result<FlashDescriptor, Box<dyn std::error::Error>> {
    if let Some(target) = target {
        let name = catalog::lookup(target.device_id)
            .map(|c| c.name)
            .unwrap_or("unknown card");
        println!("Card:");
        println!("  Device:   0x{:04X} ({})", target.device_id, name);
        println!("  Hardware: {}", format_version(target.hw_version));
    }

    match chip::identify(channel) {
        Ok(part) => {
            println!("Found flash chip:");
            println!("  Vendor: {}", part.vendor);
            println!("  Name:   {}", part.name);
            println!("  ID:     {}", part.id_string());
            println!("  Family: {}", part.family);
            println!(
                "  Size:   {} bytes ({} KiB), {} byte sectors",
                part.total_size,
                part.total_size / 1024,
                part.sector_size
            );
            Ok(part)
        }
        Err(e) => {
            eprintln!("Probe failed: {}", e);
            Err(Box::new(e))
        }
    }
}
