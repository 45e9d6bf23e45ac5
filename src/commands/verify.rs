//! Verify command implementation

use super::IndicatifProgress;
use ddflash_core::channel::CommandChannel;
use ddflash_core::chip;
use ddflash_core::image::FirmwareImage;
use ddflash_core::verify::{self, MatchResult};
use std::path::Path;

/// Run the verify command
///
/// With `header` set, the image header is stripped and only the payload is
/// compared, as the update command would have written it.
pub fn run_verify(
    channel: &mut dyn CommandChannel,
    input: &Path,
    offset: u32,
    header: bool,
) -> Result<MatchResult, Box<dyn std::error::Error>> {
    let part = chip::identify(channel)?;
    println!(
        "Found: {} {} ({} bytes)",
        part.vendor, part.name, part.total_size
    );

    let data = std::fs::read(input)?;
    let image = if header {
        FirmwareImage::parse(data)?
    } else {
        FirmwareImage::raw(data)
    };
    let expected = image.payload();
    println!("Comparing {} bytes from {:?} at 0x{:08X}", expected.len(), input, offset);

    part.check_range(offset, part.align_up(expected.len()))
        .map_err(|e| format!("File does not fit the flash: {}", e))?;

    let mut progress = IndicatifProgress::new();
    let result = verify::compare_with_progress(channel, offset, expected, &mut progress)?;
    progress.finish();

    match result {
        MatchResult::Identical => println!("Verification passed!"),
        MatchResult::FirstMismatch {
            address,
            expected,
            actual,
        } => {
            return Err(format!(
                "Verification failed at 0x{:08X}: expected 0x{:02X}, got 0x{:02X}",
                address, expected, actual
            )
            .into())
        }
    }

    Ok(result)
}
