//! List commands implementation

use crate::channels;
use ddflash_core::{catalog, chip};

/// List all available channels
pub fn list_channels() {
    println!("Supported channels:");
    println!();
    print!("{}", channels::channel_help());
}

/// List all supported chips
pub fn list_chips(vendor_filter: Option<&str>) {
    println!("Supported flash chips:");
    println!();
    println!(
        "{:<10} {:<14} {:>8} {:>9} {:<14} {:>8}",
        "Vendor", "Name", "Size", "ID", "Family", "Sector"
    );
    println!("{}", "-".repeat(68));

    for part in chip::CHIPS {
        if let Some(vendor) = vendor_filter {
            if !part.vendor.to_lowercase().contains(&vendor.to_lowercase()) {
                continue;
            }
        }

        println!(
            "{:<10} {:<14} {:>8} {:>9} {:<14} {:>8}",
            part.vendor,
            part.name,
            format_size(part.total_size),
            part.id_string().as_str(),
            part.family.as_str(),
            part.sector_size
        );
    }
}

/// List all known cards
pub fn list_cards() {
    println!("Known cards:");
    println!();
    println!("{:<8} {:<20} {}", "Device", "Name", "Default image");
    println!("{}", "-".repeat(68));

    for card in catalog::CARDS {
        println!(
            "0x{:04X}   {:<20} {}",
            card.device_id, card.name, card.image
        );
    }
}

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
