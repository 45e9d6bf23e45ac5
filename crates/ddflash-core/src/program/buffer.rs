//! Atmel DataFlash buffer strategy

use log::{debug, trace};

use super::{PollSet, ProgramError, ProgramStrategy};
use crate::channel::CommandChannel;
use crate::chip::{FlashDescriptor, FlashFamily};
use crate::progress::ProgressSink;
use crate::protocol::dataflash;
use crate::spi::opcodes::dataflash::{BLOCK_SIZE, PAGE_SIZE};

/// Block-erase what can be erased in whole 8 KiB blocks, then stream 1 KiB
/// pages through the SRAM buffer in ascending order
///
/// Pages inside an erased block are committed with the plain program
/// opcode; all others use the commit-with-erase opcode.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferMode {
    polls: PollSet,
}

impl BufferMode {
    /// Create a buffer-mode strategy with the given poll limits
    pub fn new(polls: PollSet) -> Self {
        Self { polls }
    }
}

/// Whole 8 KiB blocks contained in `offset..end`, as a byte range
fn erasable_blocks(offset: u32, end: u32) -> core::ops::Range<u32> {
    let first = offset.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
    let last = end / BLOCK_SIZE * BLOCK_SIZE;
    if end - offset < BLOCK_SIZE || first >= last {
        return first..first;
    }
    first..last
}

impl ProgramStrategy for BufferMode {
    fn family(&self) -> FlashFamily {
        FlashFamily::BufferMode
    }

    fn erase_and_program(
        &self,
        channel: &mut dyn CommandChannel,
        chip: &FlashDescriptor,
        offset: u32,
        data: &[u8],
        progress: &mut dyn ProgressSink,
    ) -> Result<(), ProgramError> {
        chip.check_range(offset, data.len())
            .map_err(ProgramError::at(offset))?;

        let end = offset + data.len() as u32;
        let erased = erasable_blocks(offset, end);
        let blocks = ((erased.end - erased.start) / BLOCK_SIZE) as usize;

        if blocks > 0 {
            debug!(
                "Buffer mode: erasing {} blocks 0x{:08X}..0x{:08X}",
                blocks, erased.start, erased.end
            );
            progress.erasing(blocks, (erased.end - erased.start) as usize);
            for (i, addr) in erased.clone().step_by(BLOCK_SIZE as usize).enumerate() {
                dataflash::block_erase(channel, addr, self.polls.erase)
                    .map_err(ProgramError::at(addr))?;
                progress.erase_progress(i + 1);
            }
        }

        progress.writing(data.len());
        let mut written = 0;
        for (i, page) in data.chunks(PAGE_SIZE as usize).enumerate() {
            let addr = offset + i as u32 * PAGE_SIZE;
            let blank = erased.contains(&addr);
            trace!("Committing page 0x{:08X} (erased: {})", addr, blank);
            dataflash::buffer_write(channel, page).map_err(ProgramError::at(addr))?;
            dataflash::buffer_commit(channel, addr, blank, self.polls.program)
                .map_err(ProgramError::at(addr))?;
            written += page.len();
            progress.write_progress(written);
        }

        Ok(())
    }
}
