//! Inspect command implementation

use ddflash_core::catalog;
use ddflash_core::image::{self, format_version, Decision, FirmwareImage};
use ddflash_core::update::{self, UpdateTarget};
use std::fmt::Write;
use std::path::Path;

/// Describe an image file: header fields, payload, bitstream id, and the
/// install decision for `target` when one is given
pub fn describe(image: &FirmwareImage, target: Option<UpdateTarget>) -> String {
    let mut out = String::new();

    match image.header() {
        Some(header) => {
            let _ = writeln!(out, "Header ({} bytes):", image.payload_offset());
            for (key, value) in &header.fields {
                let _ = writeln!(out, "  {:10} {}", format!("{}:", key), value);
            }
            if let Some(devid) = header.device_id {
                let card = catalog::lookup(devid).map(|c| c.name).unwrap_or("unknown card");
                let _ = writeln!(out, "Device:     0x{:04X} ({})", devid, card);
            }
            if let Some(version) = header.version {
                let _ = writeln!(out, "Version:    {}", format_version(version));
            }
        }
        None => {
            let _ = writeln!(out, "No header");
        }
    }

    let _ = writeln!(out, "Payload:    {} bytes", image.payload().len());
    match image.bitstream_id() {
        Some(id) => {
            let _ = writeln!(
                out,
                "Bitstream:  id 0x{:08X} at 0x{:X}{}",
                id.id,
                id.offset,
                if id.protected { " (protected)" } else { "" }
            );
        }
        None => {
            let _ = writeln!(out, "Bitstream:  no id found");
        }
    }

    if let Some(target) = target {
        let decision = match image::decide(image, target.device_id, target.hw_version) {
            Decision::Apply => "apply",
            Decision::Skip(_) => "skip (not newer)",
            Decision::Incompatible => "incompatible",
        };
        let _ = writeln!(
            out,
            "Decision for 0x{:04X} at {}: {}",
            target.device_id,
            format_version(target.hw_version),
            decision
        );
    }

    out
}

/// Run the inspect command
pub fn run_inspect(
    path: &Path,
    target: Option<UpdateTarget>,
) -> Result<(), Box<dyn std::error::Error>> {
    let image = update::load_image(path, true)?;
    println!("{}:", path.display());
    print!("{}", describe(&image, target));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> FirmwareImage {
        let mut data = b"Devid:0007\nVersion:1.4\nBuild:2024-03-01\n\0".to_vec();
        data.extend_from_slice(&[0xBD, 0xB3, 0xDD, 0x01, 0x00, 0x07]);
        data.resize(4096, 0xFF);
        FirmwareImage::parse(data).unwrap()
    }

    #[test]
    fn test_describe() {
        let text = describe(&image(), Some(UpdateTarget::new(7, 0x0001_0003)));
        assert!(text.contains("Build:"));
        assert!(text.contains("Device:     0x0007 (Octopus 4/8)"));
        assert!(text.contains("Version:    1.4"));
        assert!(text.contains("id 0xDD010007 at 0x0"));
        assert!(text.contains(": apply"));
    }

    #[test]
    fn test_describe_without_target() {
        let text = describe(&FirmwareImage::raw(vec![0; 1024]), None);
        assert!(text.starts_with("No header"));
        assert!(text.contains("no id found"));
        assert!(!text.contains("Decision"));
    }

    #[test]
    fn test_inspect_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run_inspect(&dir.path().join("none.fpga"), None).is_err());
    }
}
