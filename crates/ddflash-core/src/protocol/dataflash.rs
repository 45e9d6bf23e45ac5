//! Atmel DataFlash command sequences

use super::PollConfig;
use crate::channel::CommandChannel;
use crate::chip::DataFlashStatus;
use crate::error::{Error, Result};
use crate::spi::{opcodes::dataflash, Transaction};

/// Read the DataFlash status register
pub fn read_status<C: CommandChannel + ?Sized>(channel: &mut C) -> Result<DataFlashStatus> {
    let mut buf = [0u8; 1];
    let mut txn = Transaction::read_reg(dataflash::STATUS, &mut buf);
    channel.execute(&mut txn)?;
    Ok(DataFlashStatus::from_bits_retain(buf[0]))
}

/// Wait for the ready bit to be set
pub fn wait_ready<C: CommandChannel + ?Sized>(channel: &mut C, poll: PollConfig) -> Result<()> {
    for _ in 0..poll.max_polls {
        if !read_status(channel)?.is_busy() {
            return Ok(());
        }
        if poll.delay_us > 0 {
            channel.delay_us(poll.delay_us);
        }
    }

    Err(Error::Timeout)
}

/// Erase one 8 KiB block and wait for completion
pub fn block_erase<C: CommandChannel + ?Sized>(
    channel: &mut C,
    addr: u32,
    poll: PollConfig,
) -> Result<()> {
    let mut txn = Transaction::erase_3b(dataflash::BLOCK_ERASE, addr);
    channel.execute(&mut txn)?;
    wait_ready(channel, poll)
}

/// Fill the internal SRAM buffer starting at buffer offset 0
pub fn buffer_write<C: CommandChannel + ?Sized>(channel: &mut C, data: &[u8]) -> Result<()> {
    let mut txn = Transaction::write_3b(dataflash::BUFFER1_WRITE, 0, data);
    channel.execute(&mut txn)
}

/// Commit the buffer to the page at `addr` and wait for completion
///
/// With `erased` set the page is known to be blank and the plain program
/// opcode is used; otherwise the page is erased as part of the commit.
pub fn buffer_commit<C: CommandChannel + ?Sized>(
    channel: &mut C,
    addr: u32,
    erased: bool,
    poll: PollConfig,
) -> Result<()> {
    let opcode = if erased {
        dataflash::BUFFER1_PROGRAM
    } else {
        dataflash::BUFFER1_ERASE_PROGRAM
    };
    let mut txn = Transaction::erase_3b(opcode, addr);
    channel.execute(&mut txn)?;
    wait_ready(channel, poll)
}
