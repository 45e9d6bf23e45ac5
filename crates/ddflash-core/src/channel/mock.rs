//! Recording command channel for unit tests

use alloc::vec;
use alloc::vec::Vec;

use super::CommandChannel;
use crate::error::{Error, Result};
use crate::spi::opcodes::{self, dataflash};

/// Minimal JEDEC flash model that records every frame
///
/// Answers identification, status and read requests; applies page program,
/// AAI word program and 4 KiB sector erase to its memory. DataFlash buffer
/// commands are only recorded.
pub struct MockChannel {
    pub id: [u8; 3],
    pub memory: Vec<u8>,
    /// Frames in the order they were sent, with their read lengths
    pub frames: Vec<(Vec<u8>, usize)>,
    /// Fail the transaction with this index
    pub fail_at: Option<usize>,
    /// Report busy on every status read
    pub stuck_busy: bool,
    pub max_transfer: usize,
    aai_addr: Option<usize>,
}

impl MockChannel {
    pub fn new(id: [u8; 3], size: usize) -> Self {
        Self {
            id,
            memory: vec![0xFF; size],
            frames: Vec::new(),
            fail_at: None,
            stuck_busy: false,
            max_transfer: 1024,
            aai_addr: None,
        }
    }

    pub fn winbond() -> Self {
        Self::new([0xEF, 0x40, 0x15], 2 * 1024 * 1024)
    }

    pub fn opcodes(&self) -> Vec<u8> {
        self.frames.iter().map(|(f, _)| f[0]).collect()
    }

    /// Addresses of every frame with the given opcode that carries one
    pub fn addresses_of(&self, opcode: u8) -> Vec<u32> {
        self.frames
            .iter()
            .filter(|(f, _)| f[0] == opcode && f.len() >= 4)
            .map(|(f, _)| addr_of(f) as u32)
            .collect()
    }

    fn program(&mut self, addr: usize, data: &[u8]) {
        for (i, b) in data.iter().enumerate() {
            if let Some(cell) = self.memory.get_mut(addr + i) {
                *cell &= *b;
            }
        }
    }
}

fn addr_of(frame: &[u8]) -> usize {
    ((frame[1] as usize) << 16) | ((frame[2] as usize) << 8) | frame[3] as usize
}

impl CommandChannel for MockChannel {
    fn transact(&mut self, write: &[u8], read: &mut [u8]) -> Result<()> {
        let index = self.frames.len();
        self.frames.push((write.to_vec(), read.len()));
        if self.fail_at == Some(index) {
            return Err(Error::ChannelFailed);
        }

        match write[0] {
            opcodes::RDID => {
                for (dst, src) in read.iter_mut().zip(self.id.iter()) {
                    *dst = *src;
                }
            }
            opcodes::RDSR => {
                read.fill(if self.stuck_busy { opcodes::SR_WIP } else { 0 });
            }
            dataflash::STATUS => {
                read.fill(if self.stuck_busy { 0 } else { dataflash::SR_READY });
            }
            opcodes::READ => {
                let addr = addr_of(write);
                for (i, b) in read.iter_mut().enumerate() {
                    *b = self.memory.get(addr + i).copied().unwrap_or(0xFF);
                }
            }
            opcodes::PP => {
                let addr = addr_of(write);
                self.program(addr, &write[4..]);
            }
            opcodes::AAI_WP => {
                let (addr, data) = if write.len() == 6 {
                    (addr_of(write), &write[4..])
                } else {
                    (self.aai_addr.unwrap_or(0), &write[1..])
                };
                self.program(addr, data);
                self.aai_addr = Some(addr + 2);
            }
            opcodes::SE_20 => {
                let addr = addr_of(write) & !0xFFF;
                let end = (addr + 4096).min(self.memory.len());
                self.memory[addr..end].fill(0xFF);
            }
            opcodes::WRDI => self.aai_addr = None,
            _ => {}
        }
        Ok(())
    }

    fn max_transfer_len(&self) -> usize {
        self.max_transfer
    }

    fn delay_us(&mut self, _us: u32) {}
}
