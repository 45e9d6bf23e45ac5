//! ddflash-dummy - In-memory flash emulator for testing
//!
//! This crate provides a command channel that emulates one of the flash
//! parts from the registry in memory. It follows the protocol of the
//! part's family closely enough to catch sequencing mistakes: writes need
//! the write enable latch, protected parts refuse to erase, AAI words need
//! an open AAI sequence, and DataFlash pages are programmed through the
//! SRAM buffer. Every frame is recorded for inspection.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;

use ddflash_core::channel::{CommandChannel, DEFAULT_MAX_TRANSFER};
use ddflash_core::chip::{self, DataFlashStatus, FlashDescriptor, FlashFamily, StatusRegister};
use ddflash_core::error::{Error, Result};
use ddflash_core::spi::opcodes::{self, dataflash};
use log::trace;

/// Configuration for the dummy flash
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Part to emulate
    pub chip: FlashDescriptor,
    /// Status reads that report busy after each erase or program
    pub busy_polls: u32,
    /// Fail the transaction with this index
    pub fail_on: Option<usize>,
    /// Largest read phase accepted
    pub max_transfer: usize,
    /// Start with the block protect bits set, as after power-up
    pub protected: bool,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self::for_chip(Self::default_chip())
    }
}

impl DummyConfig {
    /// Configuration emulating `chip`
    pub fn for_chip(chip: FlashDescriptor) -> Self {
        Self {
            chip,
            busy_polls: 1,
            fail_on: None,
            max_transfer: DEFAULT_MAX_TRANSFER,
            protected: true,
        }
    }

    /// Configuration emulating the part called `name`
    pub fn by_name(name: &str) -> Option<Self> {
        chip::find_by_name(name).map(|c| Self::for_chip(*c))
    }

    fn default_chip() -> FlashDescriptor {
        // W25Q16JV
        chip::CHIPS
            .iter()
            .copied()
            .find(|c| c.id == [0xEF, 0x40, 0x15])
            .unwrap_or(chip::CHIPS[0])
    }
}

/// One recorded transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Write phase bytes
    pub bytes: Vec<u8>,
    /// Length of the read phase
    pub read_len: usize,
}

impl Frame {
    /// Opcode byte
    pub fn opcode(&self) -> u8 {
        self.bytes[0]
    }

    /// 3-byte address, if the frame is long enough to carry one
    pub fn address(&self) -> Option<u32> {
        if self.bytes.len() < 4 {
            return None;
        }
        Some(u32::from_be_bytes([0, self.bytes[1], self.bytes[2], self.bytes[3]]))
    }
}

/// Dummy flash channel
///
/// Emulates a flash chip in memory for testing purposes.
pub struct DummyFlash {
    config: DummyConfig,
    data: Vec<u8>,
    status: StatusRegister,
    write_enabled: bool,
    status_write_enabled: bool,
    aai_addr: Option<usize>,
    buffer: Vec<u8>,
    busy: u32,
    frames: Vec<Frame>,
}

impl DummyFlash {
    /// Create a new dummy flash with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![0xFF; config.chip.total_size as usize];
        let status = if config.protected && config.chip.family != FlashFamily::BufferMode {
            StatusRegister::BP_ALL
        } else {
            StatusRegister::empty()
        };
        Self {
            config,
            data,
            status,
            write_enabled: false,
            status_write_enabled: false,
            aai_addr: None,
            buffer: vec![0xFF; dataflash::PAGE_SIZE as usize],
            busy: 0,
            frames: Vec::new(),
        }
    }

    /// Create a new dummy flash with default configuration (W25Q16JV)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a dummy flash with pre-filled data
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(config);
        let len = core::cmp::min(initial_data.len(), flash.data.len());
        flash.data[..len].copy_from_slice(&initial_data[..len]);
        flash
    }

    /// Get a reference to the flash data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the flash data
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Frames received so far
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Forget recorded frames
    pub fn clear_frames(&mut self) {
        self.frames.clear();
    }

    /// Addresses of every frame with `opcode` that carries one, in order
    pub fn addresses_of(&self, opcode: u8) -> Vec<u32> {
        self.frames
            .iter()
            .filter(|f| f.opcode() == opcode)
            .filter_map(Frame::address)
            .collect()
    }

    /// Current status register (JEDEC families)
    pub fn status(&self) -> StatusRegister {
        self.status
    }

    /// Make the next transaction with index `index` fail
    pub fn fail_on(&mut self, index: Option<usize>) {
        self.config.fail_on = index;
    }

    fn range(&self, addr: usize, len: usize) -> Result<core::ops::Range<usize>> {
        if addr + len > self.data.len() {
            return Err(Error::AddressOutOfBounds {
                offset: addr as u32,
                len: len as u32,
            });
        }
        Ok(addr..addr + len)
    }

    fn start_busy(&mut self) {
        self.busy = self.config.busy_polls;
    }

    fn take_write_enable(&mut self) -> Result<()> {
        if !self.write_enabled {
            return Err(Error::WriteProtected);
        }
        self.write_enabled = false;
        Ok(())
    }

    fn program(&mut self, addr: usize, bytes: &[u8]) -> Result<()> {
        let range = self.range(addr, bytes.len())?;
        // Flash programming: can only change 1 -> 0
        for (cell, &byte) in self.data[range].iter_mut().zip(bytes) {
            *cell &= byte;
        }
        Ok(())
    }

    fn erase(&mut self, addr: usize, size: usize) -> Result<()> {
        let aligned = addr & !(size - 1);
        let range = self.range(aligned, size)?;
        self.data[range].fill(0xFF);
        Ok(())
    }

    fn read(&mut self, write: &[u8], read: &mut [u8]) -> Result<()> {
        let addr = address(write)?;
        let range = self.range(addr, read.len())?;
        read.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn handle_jedec(&mut self, write: &[u8], read: &mut [u8]) -> Result<()> {
        let opcode = write[0];

        if let Some(next) = self.aai_addr {
            match opcode {
                opcodes::RDSR | opcodes::WRDI | opcodes::AAI_WP => {}
                _ => return Err(Error::OpcodeNotSupported(opcode)),
            }
            if opcode == opcodes::AAI_WP && write.len() == 3 {
                if self.busy > 0 {
                    return Err(Error::ChannelFailed);
                }
                self.program(next, &write[1..3])?;
                self.aai_addr = Some(next + 2);
                self.start_busy();
                return Ok(());
            }
        }

        match opcode {
            opcodes::RDSR => {
                let mut status = self.status;
                status.set(StatusRegister::BUSY, self.busy > 0);
                status.set(StatusRegister::WEL, self.write_enabled);
                status.set(StatusRegister::AAI, self.aai_addr.is_some());
                read.fill(status.bits());
                self.busy = self.busy.saturating_sub(1);
                Ok(())
            }
            opcodes::WREN => {
                self.write_enabled = true;
                Ok(())
            }
            opcodes::WRDI => {
                self.write_enabled = false;
                self.aai_addr = None;
                Ok(())
            }
            opcodes::EWSR => {
                self.status_write_enabled = true;
                Ok(())
            }
            opcodes::WRSR => {
                if !(self.status_write_enabled || self.write_enabled) {
                    return Err(Error::WriteProtected);
                }
                let value = write.get(1).copied().unwrap_or(0);
                self.status = StatusRegister::from_bits_retain(value)
                    & (StatusRegister::BP_ALL | StatusRegister::BPL);
                self.status_write_enabled = false;
                self.write_enabled = false;
                Ok(())
            }
            opcodes::READ => self.read(write, read),
            opcodes::SE_20 => {
                self.take_write_enable()?;
                if self.status.intersects(StatusRegister::BP_ALL) {
                    return Err(Error::WriteProtected);
                }
                self.erase(address(write)?, 4096)?;
                self.start_busy();
                Ok(())
            }
            opcodes::PP => {
                self.take_write_enable()?;
                if self.status.intersects(StatusRegister::BP_ALL) {
                    return Err(Error::WriteProtected);
                }
                let addr = address(write)?;
                let data = &write[4..];
                if (addr & 0xFF) + data.len() > 256 {
                    return Err(Error::InvalidAlignment {
                        value: addr as u32,
                        sector_size: 256,
                    });
                }
                self.program(addr, data)?;
                self.start_busy();
                Ok(())
            }
            opcodes::AAI_WP if self.config.chip.family == FlashFamily::ByteStreamMode => {
                if write.len() != 6 {
                    return Err(Error::OpcodeNotSupported(opcode));
                }
                self.take_write_enable()?;
                if self.status.intersects(StatusRegister::BP_ALL) {
                    return Err(Error::WriteProtected);
                }
                let addr = address(write)?;
                self.program(addr, &write[4..6])?;
                self.aai_addr = Some(addr + 2);
                // WEL stays set for the whole AAI sequence
                self.write_enabled = true;
                self.start_busy();
                Ok(())
            }
            _ => Err(Error::OpcodeNotSupported(opcode)),
        }
    }

    fn handle_dataflash(&mut self, write: &[u8], read: &mut [u8]) -> Result<()> {
        let opcode = write[0];
        let page = dataflash::PAGE_SIZE as usize;

        match opcode {
            dataflash::STATUS => {
                let mut status = DataFlashStatus::POW2_PAGES | DataFlashStatus::DENSITY;
                status.set(DataFlashStatus::READY, self.busy == 0);
                read.fill(status.bits());
                self.busy = self.busy.saturating_sub(1);
                Ok(())
            }
            opcodes::READ => self.read(write, read),
            dataflash::BLOCK_ERASE => {
                self.erase(address(write)?, dataflash::BLOCK_SIZE as usize)?;
                self.start_busy();
                Ok(())
            }
            dataflash::BUFFER1_WRITE => {
                let start = address(write)? % page;
                let data = &write[4..];
                if start + data.len() > page {
                    return Err(Error::TransferTooLarge {
                        len: data.len(),
                        max: page - start,
                    });
                }
                self.buffer[start..start + data.len()].copy_from_slice(data);
                Ok(())
            }
            dataflash::BUFFER1_ERASE_PROGRAM | dataflash::BUFFER1_PROGRAM => {
                let addr = address(write)? & !(page - 1);
                if opcode == dataflash::BUFFER1_ERASE_PROGRAM {
                    self.erase(addr, page)?;
                }
                let buffer = core::mem::take(&mut self.buffer);
                let result = self.program(addr, &buffer);
                self.buffer = buffer;
                result?;
                self.start_busy();
                Ok(())
            }
            _ => Err(Error::OpcodeNotSupported(opcode)),
        }
    }
}

fn address(write: &[u8]) -> Result<usize> {
    if write.len() < 4 {
        return Err(Error::ChannelFailed);
    }
    Ok(((write[1] as usize) << 16) | ((write[2] as usize) << 8) | write[3] as usize)
}

impl CommandChannel for DummyFlash {
    fn transact(&mut self, write: &[u8], read: &mut [u8]) -> Result<()> {
        let index = self.frames.len();
        self.frames.push(Frame {
            bytes: write.to_vec(),
            read_len: read.len(),
        });

        if self.config.fail_on == Some(index) {
            trace!("dummy: injected failure on transaction {}", index);
            return Err(Error::ChannelFailed);
        }
        if write.is_empty() {
            return Err(Error::ChannelFailed);
        }
        if read.len() > self.config.max_transfer {
            return Err(Error::TransferTooLarge {
                len: read.len(),
                max: self.config.max_transfer,
            });
        }

        if write[0] == opcodes::RDID {
            for (dst, src) in read.iter_mut().zip(self.config.chip.id.iter()) {
                *dst = *src;
            }
            return Ok(());
        }

        match self.config.chip.family {
            FlashFamily::BufferMode => self.handle_dataflash(write, read),
            FlashFamily::ByteStreamMode | FlashFamily::PageMode => self.handle_jedec(write, read),
        }
    }

    fn max_transfer_len(&self) -> usize {
        self.config.max_transfer
    }

    fn delay_us(&mut self, _us: u32) {
        // No delay needed for in-memory operations
    }
}

#[cfg(test)]
mod tests;
