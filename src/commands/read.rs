//! Read command implementation

use super::IndicatifProgress;
use ddflash_core::channel::CommandChannel;
use ddflash_core::chip;
use ddflash_core::verify;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Run the read command
///
/// Reads `length` bytes at `offset` (default: to the end of the flash) and
/// writes them to `output`.
pub fn run_read(
    channel: &mut dyn CommandChannel,
    output: &Path,
    offset: u32,
    length: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let part = chip::identify(channel)?;
    println!(
        "Found: {} {} ({} bytes)",
        part.vendor, part.name, part.total_size
    );

    let available = (part.total_size as usize).saturating_sub(offset as usize);
    let length = length.unwrap_or(available);
    if length == 0 || length > available {
        return Err(format!(
            "Cannot read {} bytes at 0x{:08X} from a {} byte flash",
            length, offset, part.total_size
        )
        .into());
    }

    let mut data = vec![0u8; length];
    let mut progress = IndicatifProgress::new();
    verify::read(channel, offset, &mut data, &mut progress)?;
    progress.finish();

    let mut file = File::create(output)?;
    file.write_all(&data)?;

    println!("Wrote {} bytes to {:?}", data.len(), output);

    Ok(())
}
