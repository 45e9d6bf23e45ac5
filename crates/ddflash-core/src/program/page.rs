//! JEDEC page-program strategy

use log::{debug, trace};

use super::{PollSet, ProgramError, ProgramStrategy};
use crate::channel::CommandChannel;
use crate::chip::{FlashDescriptor, FlashFamily};
use crate::progress::ProgressSink;
use crate::protocol;

/// Page program size
pub const PAGE_SIZE: usize = 256;

/// Unlock, erase 4 KiB sectors ascending, program 256-byte pages descending,
/// re-lock with the part's lock bits
#[derive(Debug, Clone, Copy, Default)]
pub struct PageMode {
    polls: PollSet,
}

impl PageMode {
    /// Create a page-mode strategy with the given poll limits
    pub fn new(polls: PollSet) -> Self {
        Self { polls }
    }
}

impl ProgramStrategy for PageMode {
    fn family(&self) -> FlashFamily {
        FlashFamily::PageMode
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

        let sector_size = chip.sector_size as usize;
        let sectors = data.len() / sector_size;

        debug!("Page mode: unlocking {}", chip.name);
        protocol::write_status_ewsr(channel, 0x00).map_err(ProgramError::at(offset))?;

        progress.erasing(sectors, data.len());
        for i in 0..sectors {
            let addr = offset + (i * sector_size) as u32;
            trace!("Erasing sector at 0x{:08X}", addr);
            protocol::sector_erase(channel, addr, self.polls.erase)
                .map_err(ProgramError::at(addr))?;
            progress.erase_progress(i + 1);
        }

        progress.writing(data.len());
        let mut written = 0;
        for (i, page) in data.chunks(PAGE_SIZE).enumerate().rev() {
            let addr = offset + (i * PAGE_SIZE) as u32;
            protocol::program_page(channel, addr, page, self.polls.program)
                .map_err(ProgramError::at(addr))?;
            written += page.len();
            if written % sector_size == 0 {
                trace!("Programmed sector at 0x{:08X}", addr);
                progress.write_progress(written);
            }
        }

        debug!("Page mode: relocking with 0x{:02X}", chip.lock_bits);
        protocol::write_status_ewsr(channel, chip.lock_bits).map_err(ProgramError::at(offset))?;

        Ok(())
    }
}
