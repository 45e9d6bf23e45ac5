//! Static table of supported flash parts

use log::{debug, warn};

use super::types::{FlashDescriptor, FlashFamily};
use crate::channel::CommandChannel;
use crate::error::{Error, Result};
use crate::protocol;

const KIB: u32 = 1024;
const MIB: u32 = 1024 * 1024;

const fn part(
    id: [u8; 3],
    vendor: &'static str,
    name: &'static str,
    family: FlashFamily,
    sector_size: u32,
    total_size: u32,
    lock_bits: u8,
) -> FlashDescriptor {
    FlashDescriptor {
        id,
        vendor,
        name,
        family,
        sector_size,
        total_size,
        lock_bits,
    }
}

/// Every flash part the engine knows how to program
pub static CHIPS: &[FlashDescriptor] = &[
    part([0x1F, 0x28, 0x00], "Atmel", "AT45DB642D", FlashFamily::BufferMode, KIB, 8 * MIB, 0x00),
    part([0xBF, 0x25, 0x41], "SST", "SST25VF016B", FlashFamily::ByteStreamMode, 4 * KIB, 2 * MIB, 0x1C),
    part([0xBF, 0x25, 0x4A], "SST", "SST25VF032B", FlashFamily::ByteStreamMode, 4 * KIB, 4 * MIB, 0x1C),
    part([0xBF, 0x25, 0x4B], "SST", "SST25VF064C", FlashFamily::PageMode, 4 * KIB, 8 * MIB, 0x1C),
    part([0x01, 0x40, 0x15], "Spansion", "S25FL116K", FlashFamily::PageMode, 4 * KIB, 2 * MIB, 0x1C),
    part([0x01, 0x40, 0x16], "Spansion", "S25FL132K", FlashFamily::PageMode, 4 * KIB, 4 * MIB, 0x1C),
    part([0x01, 0x40, 0x17], "Spansion", "S25FL164K", FlashFamily::PageMode, 4 * KIB, 8 * MIB, 0x1C),
    part([0xEF, 0x40, 0x15], "Winbond", "W25Q16JV", FlashFamily::PageMode, 4 * KIB, 2 * MIB, 0x3C),
    part([0xEF, 0x40, 0x16], "Winbond", "W25Q32JV", FlashFamily::PageMode, 4 * KIB, 4 * MIB, 0x3C),
    part([0xEF, 0x40, 0x17], "Winbond", "W25Q64JV", FlashFamily::PageMode, 4 * KIB, 8 * MIB, 0x3C),
    part([0xEF, 0x40, 0x18], "Winbond", "W25Q128JV", FlashFamily::PageMode, 4 * KIB, 16 * MIB, 0x3C),
];

/// Look up identification bytes in the table
///
/// All three bytes must match.
pub fn lookup(id: [u8; 3]) -> Option<&'static FlashDescriptor> {
    CHIPS.iter().find(|chip| chip.id == id)
}

/// Look up a part by name (case-insensitive)
pub fn find_by_name(name: &str) -> Option<&'static FlashDescriptor> {
    CHIPS.iter().find(|chip| chip.name.eq_ignore_ascii_case(name))
}

/// Read the identification bytes and resolve them to a descriptor
///
/// Issues exactly one transaction. An unknown id is returned as
/// `Error::UnknownFlash` carrying the raw bytes; it is never retried.
pub fn identify<C: CommandChannel + ?Sized>(channel: &mut C) -> Result<FlashDescriptor> {
    let id = protocol::read_id(channel)?;
    match lookup(id) {
        Some(chip) => {
            debug!(
                "Identified {} {} ({} family, {} KiB)",
                chip.vendor,
                chip.name,
                chip.family,
                chip.total_size / KIB
            );
            Ok(*chip)
        }
        None => {
            warn!(
                "Unknown flash id {:02X} {:02X} {:02X}",
                id[0], id[1], id[2]
            );
            Err(Error::UnknownFlash { id })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::mock::MockChannel;

    #[test]
    fn test_every_table_entry_identifies() {
        for chip in CHIPS {
            let mut channel = MockChannel::new(chip.id, 0);
            let found = identify(&mut channel).unwrap();
            assert_eq!(found, *chip);
            assert_eq!(channel.frames.len(), 1);
            assert_eq!(channel.frames[0], (alloc::vec![0x9F], 3));
        }
    }

    #[test]
    fn test_unknown_id_carries_raw_bytes() {
        let mut channel = MockChannel::new([0x1F, 0x28, 0x01], 0);
        let err = identify(&mut channel).unwrap_err();
        assert_eq!(err, Error::UnknownFlash { id: [0x1F, 0x28, 0x01] });
        assert_eq!(channel.frames.len(), 1);
    }

    #[test]
    fn test_dataflash_prefix_needs_capacity_byte() {
        assert_eq!(lookup([0x1F, 0x28, 0x00]).map(|c| c.name), Some("AT45DB642D"));
        for third in [0x01, 0x80, 0xFF] {
            assert!(lookup([0x1F, 0x28, third]).is_none());
        }
    }

    #[test]
    fn test_all_zero_and_all_ones_are_unknown() {
        assert!(lookup([0x00, 0x00, 0x00]).is_none());
        assert!(lookup([0xFF, 0xFF, 0xFF]).is_none());
    }

    #[test]
    fn test_table_geometry() {
        for chip in CHIPS {
            assert!(chip.sector_size == 1024 || chip.sector_size == 4096);
            assert_eq!(chip.total_size % chip.sector_size, 0);
        }
        assert_eq!(find_by_name("w25q16jv").map(|c| c.id), Some([0xEF, 0x40, 0x15]));
    }

    #[test]
    fn test_check_range() {
        let chip = lookup([0xEF, 0x40, 0x15]).unwrap();
        assert!(chip.check_range(0x1000, 0x2000).is_ok());
        assert_eq!(
            chip.check_range(0, 100),
            Err(Error::InvalidAlignment {
                value: 100,
                sector_size: 4096
            })
        );
        assert_eq!(chip.check_range(0, 0), Err(Error::EmptyBuffer));
        assert!(matches!(
            chip.check_range(chip.total_size - 0x1000, 0x2000),
            Err(Error::AddressOutOfBounds { .. })
        ));
        assert_eq!(chip.align_up(1), 4096);
        assert_eq!(chip.align_up(8192), 8192);
    }
}
