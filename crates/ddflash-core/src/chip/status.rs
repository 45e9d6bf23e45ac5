//! Status register layouts

use bitflags::bitflags;

bitflags! {
    /// JEDEC status register (opcode 0x05)
    ///
    /// Used by the byte-stream and page families.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusRegister: u8 {
        /// Write in progress
        const BUSY = 1 << 0;
        /// Write enable latch
        const WEL  = 1 << 1;
        /// Block protect bit 0
        const BP0  = 1 << 2;
        /// Block protect bit 1
        const BP1  = 1 << 3;
        /// Block protect bit 2
        const BP2  = 1 << 4;
        /// Block protect bit 3 (top/bottom on some parts)
        const BP3  = 1 << 5;
        /// Auto address increment mode active (SST)
        const AAI  = 1 << 6;
        /// Block protect lock / status register protect
        const BPL  = 1 << 7;

        /// All block protect bits
        const BP_ALL = Self::BP0.bits() | Self::BP1.bits() | Self::BP2.bits() | Self::BP3.bits();
    }
}

impl StatusRegister {
    /// Returns true while an erase or program operation is running
    pub fn is_busy(self) -> bool {
        self.contains(Self::BUSY)
    }
}

bitflags! {
    /// Atmel DataFlash status register (opcode 0xD7)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DataFlashStatus: u8 {
        /// Page size is a power of two (1024 bytes)
        const POW2_PAGES = 1 << 0;
        /// Sector protection enabled
        const PROTECT    = 1 << 1;
        /// Density code bits
        const DENSITY    = 0b0011_1100;
        /// Last compare mismatched
        const COMP       = 1 << 6;
        /// Device is ready
        const READY      = 1 << 7;
    }
}

impl DataFlashStatus {
    /// Returns true while an erase or program operation is running
    pub fn is_busy(self) -> bool {
        !self.contains(Self::READY)
    }
}
