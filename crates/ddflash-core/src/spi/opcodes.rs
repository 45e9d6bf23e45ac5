//! SPI flash opcodes used by the supported families
//!
//! The JEDEC-style families (byte-stream and page mode) share one opcode set.
//! The Atmel DataFlash family (buffer mode) has its own, and some of its
//! values collide with the JEDEC ones (`0x50` is EWSR on SST parts and block
//! erase on DataFlash), so they live in a separate namespace.

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before any write/erase operation
pub const WREN: u8 = 0x06;
/// Write Disable - clears WEL bit in status register
pub const WRDI: u8 = 0x04;
/// Enable Write Status Register (legacy SST command)
pub const EWSR: u8 = 0x50;

// ============================================================================
// Status register operations
// ============================================================================

/// Read Status Register
pub const RDSR: u8 = 0x05;
/// Write Status Register
pub const WRSR: u8 = 0x01;

// ============================================================================
// Identification
// ============================================================================

/// Read JEDEC ID (manufacturer + device ID)
pub const RDID: u8 = 0x9F;

// ============================================================================
// Read / program / erase - 3-byte address
// ============================================================================

/// Read Data
pub const READ: u8 = 0x03;
/// Page Program (up to 256 bytes)
pub const PP: u8 = 0x02;
/// Auto Address Increment word program (SST)
pub const AAI_WP: u8 = 0xAD;
/// Sector Erase 4KB
pub const SE_20: u8 = 0x20;

// ============================================================================
// Status register bits
// ============================================================================

/// Status Register: Write In Progress (busy)
pub const SR_WIP: u8 = 0x01;
/// Status Register: Write Enable Latch
pub const SR_WEL: u8 = 0x02;
/// Status Register: Block Protect bits 0-3
pub const SR_BP_MASK: u8 = 0x3C;

/// Atmel DataFlash (buffer mode) opcodes
pub mod dataflash {
    /// Status register read
    pub const STATUS: u8 = 0xD7;
    /// Block erase (8 pages, 8192 bytes)
    pub const BLOCK_ERASE: u8 = 0x50;
    /// Buffer 1 write
    pub const BUFFER1_WRITE: u8 = 0x84;
    /// Buffer 1 to main memory page program, without built-in erase
    pub const BUFFER1_PROGRAM: u8 = 0x88;
    /// Buffer 1 to main memory page program, with built-in erase
    pub const BUFFER1_ERASE_PROGRAM: u8 = 0x83;

    /// Status register: ready (set when idle)
    pub const SR_READY: u8 = 0x80;

    /// Page size in the power-of-two configuration
    pub const PAGE_SIZE: u32 = 1024;
    /// Block erase granularity
    pub const BLOCK_SIZE: u32 = 8192;
}
