//! SPI25 protocol implementation
//!
//! This module implements the JEDEC command sequences used by the
//! byte-stream and page families, plus the identification and read
//! transactions every family shares.

use super::PollConfig;
use crate::channel::CommandChannel;
use crate::chip::StatusRegister;
use crate::error::{Error, Result};
use crate::spi::{opcodes, Transaction};

/// Read the three identification bytes
pub fn read_id<C: CommandChannel + ?Sized>(channel: &mut C) -> Result<[u8; 3]> {
    let mut buf = [0u8; 3];
    let mut txn = Transaction::read_reg(opcodes::RDID, &mut buf);
    channel.execute(&mut txn)?;
    Ok(buf)
}

/// Read the status register
pub fn read_status<C: CommandChannel + ?Sized>(channel: &mut C) -> Result<StatusRegister> {
    let mut buf = [0u8; 1];
    let mut txn = Transaction::read_reg(opcodes::RDSR, &mut buf);
    channel.execute(&mut txn)?;
    Ok(StatusRegister::from_bits_retain(buf[0]))
}

/// Send the Write Enable command
pub fn write_enable<C: CommandChannel + ?Sized>(channel: &mut C) -> Result<()> {
    let mut txn = Transaction::simple(opcodes::WREN);
    channel.execute(&mut txn)
}

/// Send the Write Disable command
pub fn write_disable<C: CommandChannel + ?Sized>(channel: &mut C) -> Result<()> {
    let mut txn = Transaction::simple(opcodes::WRDI);
    channel.execute(&mut txn)
}

/// Wait for the busy bit to clear
///
/// Polls the status register at most `poll.max_polls` times with
/// `poll.delay_us` between reads.
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

/// Write the status register using the EWSR sequence
///
/// Sends EWSR (0x50) then WRSR (0x01) with `value`. Used both to clear
/// the block protect bits before a write and to restore them afterwards.
pub fn write_status_ewsr<C: CommandChannel + ?Sized>(channel: &mut C, value: u8) -> Result<()> {
    let mut txn = Transaction::simple(opcodes::EWSR);
    channel.execute(&mut txn)?;
    let data = [value];
    let mut txn = Transaction::write_reg(opcodes::WRSR, &data);
    channel.execute(&mut txn)
}

/// Erase one 4 KiB sector and wait for completion
pub fn sector_erase<C: CommandChannel + ?Sized>(
    channel: &mut C,
    addr: u32,
    poll: PollConfig,
) -> Result<()> {
    write_enable(channel)?;
    let mut txn = Transaction::erase_3b(opcodes::SE_20, addr);
    channel.execute(&mut txn)?;
    wait_ready(channel, poll)
}

/// Program a single page (up to 256 bytes, must not cross a page boundary)
pub fn program_page<C: CommandChannel + ?Sized>(
    channel: &mut C,
    addr: u32,
    data: &[u8],
    poll: PollConfig,
) -> Result<()> {
    write_enable(channel)?;
    let mut txn = Transaction::write_3b(opcodes::PP, addr, data);
    channel.execute(&mut txn)?;
    wait_ready(channel, poll)
}

/// Read data from flash using 3-byte addressing
///
/// Splits the read into transactions of at most `chunk` bytes.
pub fn read_3b<C: CommandChannel + ?Sized>(
    channel: &mut C,
    addr: u32,
    buf: &mut [u8],
    chunk: usize,
) -> Result<()> {
    let chunk = chunk.max(1);
    let mut offset = 0;

    while offset < buf.len() {
        let chunk_len = core::cmp::min(chunk, buf.len() - offset);
        let dst = &mut buf[offset..offset + chunk_len];
        let mut txn = Transaction::read_3b(opcodes::READ, addr + offset as u32, dst);
        channel.execute(&mut txn)?;
        offset += chunk_len;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::mock::MockChannel;
    use alloc::vec;

    #[test]
    fn test_wait_ready_times_out_after_max_polls() {
        let mut channel = MockChannel::winbond();
        channel.stuck_busy = true;
        let result = wait_ready(&mut channel, PollConfig::new(5, 0));
        assert_eq!(result, Err(Error::Timeout));
        assert_eq!(channel.frames.len(), 5);
    }

    #[test]
    fn test_ewsr_sequence() {
        let mut channel = MockChannel::winbond();
        write_status_ewsr(&mut channel, 0x1C).unwrap();
        assert_eq!(channel.frames[0].0, vec![0x50]);
        assert_eq!(channel.frames[1].0, vec![0x01, 0x1C]);
    }

    #[test]
    fn test_read_is_chunked() {
        let mut channel = MockChannel::winbond();
        channel.memory[0x100..0x180].fill(0x5A);
        let mut buf = [0u8; 0x80];
        read_3b(&mut channel, 0x100, &mut buf, 32).unwrap();
        assert!(buf.iter().all(|&b| b == 0x5A));
        assert_eq!(channel.addresses_of(opcodes::READ), vec![0x100, 0x120, 0x140, 0x160]);
    }
}
