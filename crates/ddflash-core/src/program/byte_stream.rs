//! SST auto-address-increment strategy

use log::{debug, trace};

use super::{PollSet, ProgramError, ProgramStrategy};
use crate::channel::CommandChannel;
use crate::chip::{FlashDescriptor, FlashFamily};
use crate::progress::ProgressSink;
use crate::protocol;
use crate::spi::{opcodes, Transaction};

/// Unlock, erase 4 KiB sectors ascending, program each sector with AAI word
/// writes from the top sector down, re-lock
///
/// The first AAI transaction of a sector carries the address; the rest carry
/// only the next two bytes. The device must not see any other command in
/// between apart from status polls, so the sequence is never split.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteStreamMode {
    polls: PollSet,
}

impl ByteStreamMode {
    /// Create a byte-stream strategy with the given poll limits
    pub fn new(polls: PollSet) -> Self {
        Self { polls }
    }

    fn program_sector(
        &self,
        channel: &mut dyn CommandChannel,
        base: u32,
        sector: &[u8],
    ) -> Result<(), ProgramError> {
        protocol::write_enable(channel).map_err(ProgramError::at(base))?;

        let mut txn = Transaction::write_3b(opcodes::AAI_WP, base, &sector[..2]);
        channel.execute(&mut txn).map_err(ProgramError::at(base))?;
        protocol::wait_ready(channel, self.polls.program).map_err(ProgramError::at(base))?;

        for i in (2..sector.len()).step_by(2) {
            let addr = base + i as u32;
            let mut txn = Transaction::write_reg(opcodes::AAI_WP, &sector[i..i + 2]);
            channel.execute(&mut txn).map_err(ProgramError::at(addr))?;
            protocol::wait_ready(channel, self.polls.program).map_err(ProgramError::at(addr))?;
        }

        protocol::write_disable(channel).map_err(ProgramError::at(base))
    }
}

impl ProgramStrategy for ByteStreamMode {
    fn family(&self) -> FlashFamily {
        FlashFamily::ByteStreamMode
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

        debug!("Byte-stream mode: unlocking {}", chip.name);
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
        for (i, sector) in data.chunks(sector_size).enumerate().rev() {
            let base = offset + (i * sector_size) as u32;
            trace!("Programming sector at 0x{:08X}", base);
            self.program_sector(channel, base, sector)?;
            written += sector.len();
            progress.write_progress(written);
        }

        debug!("Byte-stream mode: relocking with 0x{:02X}", chip.lock_bits);
        protocol::write_status_ewsr(channel, chip.lock_bits).map_err(ProgramError::at(offset))?;

        Ok(())
    }
}
