//! Write command implementation
//!
//! Writes a raw file without any install policy: the file is padded with
//! `0xFF` to whole sectors, erased and programmed with the strategy of the
//! detected part, and read back.

use super::IndicatifProgress;
use ddflash_core::channel::CommandChannel;
use ddflash_core::chip;
use ddflash_core::verify::{self, MatchResult};
use std::path::Path;

/// Run the write command
pub fn run_write(
    channel: &mut dyn CommandChannel,
    input: &Path,
    offset: u32,
    do_verify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let part = chip::identify(channel)?;
    println!(
        "Found: {} {} ({} bytes)",
        part.vendor, part.name, part.total_size
    );

    let mut data = std::fs::read(input)?;
    println!("Read {} bytes from {:?}", data.len(), input);
    if data.is_empty() {
        return Err(format!("{} is empty", input.display()).into());
    }

    let padded = part.align_up(data.len());
    if padded != data.len() {
        println!(
            "Padding file from {} to {} bytes with 0xFF",
            data.len(),
            padded
        );
        data.resize(padded, 0xFF);
    }
    part.check_range(offset, data.len())
        .map_err(|e| format!("File does not fit the flash: {}", e))?;

    let mut progress = IndicatifProgress::new();
    part.strategy()
        .erase_and_program(channel, &part, offset, &data, &mut progress)?;

    if do_verify {
        if let MatchResult::FirstMismatch {
            address,
            expected,
            actual,
        } = verify::compare_with_progress(channel, offset, &data, &mut progress)?
        {
            return Err(format!(
                "Verification failed at 0x{:08X}: expected 0x{:02X}, got 0x{:02X}",
                address, expected, actual
            )
            .into());
        }
    }
    progress.finish();

    println!("Write complete!");

    Ok(())
}
