//! Flash chip type definitions

use alloc::boxed::Box;

use crate::program::{BufferMode, ByteStreamMode, PageMode, PollSet, ProgramStrategy};

/// Command protocol shared by a class of flash parts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlashFamily {
    /// Atmel DataFlash: internal SRAM buffer committed page by page
    BufferMode,
    /// SST 25VF: global unlock, auto-increment word program
    ByteStreamMode,
    /// JEDEC 256-byte page program
    PageMode,
}

impl FlashFamily {
    /// Short lowercase name used in listings and channel strings
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BufferMode => "buffer",
            Self::ByteStreamMode => "byte-stream",
            Self::PageMode => "page",
        }
    }
}

impl core::fmt::Display for FlashFamily {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of a detected flash part
///
/// Built from the static registry table; never modified after detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashDescriptor {
    /// Identification bytes (manufacturer, memory type, capacity)
    pub id: [u8; 3],
    /// Vendor name
    pub vendor: &'static str,
    /// Part name
    pub name: &'static str,
    /// Command protocol
    pub family: FlashFamily,
    /// Smallest erase unit in bytes
    pub sector_size: u32,
    /// Total capacity in bytes
    pub total_size: u32,
    /// Status register value written when re-locking after a write
    pub lock_bits: u8,
}

impl FlashDescriptor {
    /// Check that `offset..offset + len` is a sector-aligned range on this part
    pub fn check_range(&self, offset: u32, len: usize) -> crate::Result<()> {
        use crate::Error;

        if len == 0 {
            return Err(Error::EmptyBuffer);
        }
        if offset % self.sector_size != 0 {
            return Err(Error::InvalidAlignment {
                value: offset,
                sector_size: self.sector_size,
            });
        }
        if len % self.sector_size as usize != 0 {
            return Err(Error::InvalidAlignment {
                value: len as u32,
                sector_size: self.sector_size,
            });
        }
        let end = offset as u64 + len as u64;
        if end > self.total_size as u64 {
            return Err(Error::AddressOutOfBounds {
                offset,
                len: len as u32,
            });
        }
        Ok(())
    }

    /// Round `len` up to a whole number of sectors
    pub fn align_up(&self, len: usize) -> usize {
        let sector = self.sector_size as usize;
        len.div_ceil(sector) * sector
    }

    /// Program strategy for this part's family with default poll limits
    pub fn strategy(&self) -> Box<dyn ProgramStrategy> {
        self.strategy_with(PollSet::default())
    }

    /// Program strategy for this part's family with custom poll limits
    pub fn strategy_with(&self, polls: PollSet) -> Box<dyn ProgramStrategy> {
        match self.family {
            FlashFamily::BufferMode => Box::new(BufferMode::new(polls)),
            FlashFamily::ByteStreamMode => Box::new(ByteStreamMode::new(polls)),
            FlashFamily::PageMode => Box::new(PageMode::new(polls)),
        }
    }

    /// Format the identification bytes as `XX XX XX`
    pub fn id_string(&self) -> heapless::String<8> {
        format_id(&self.id)
    }
}

/// Format raw identification bytes as `XX XX XX`
pub fn format_id(id: &[u8; 3]) -> heapless::String<8> {
    use core::fmt::Write;

    let mut s = heapless::String::new();
    // 8 bytes is exactly enough for three hex pairs and two spaces.
    let _ = write!(s, "{:02X} {:02X} {:02X}", id[0], id[1], id[2]);
    s
}
