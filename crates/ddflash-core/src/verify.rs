//! Read-back and comparison

use alloc::vec;
use log::debug;

use crate::channel::CommandChannel;
use crate::error::{Error, Result};
use crate::progress::ProgressSink;
use crate::protocol;
use crate::spi::AddressWidth;

/// Smallest read chunk used for comparison
pub const MIN_CHUNK: usize = 32;
/// Largest read chunk used for comparison
pub const MAX_CHUNK: usize = 256;

/// Result of comparing flash contents with an expected image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    /// Every byte matched
    Identical,
    /// First differing byte
    FirstMismatch {
        /// Absolute flash address
        address: u32,
        /// Byte in the expected image
        expected: u8,
        /// Byte read from flash
        actual: u8,
    },
}

impl MatchResult {
    /// Returns true if the compared region matched
    pub fn is_identical(&self) -> bool {
        matches!(self, Self::Identical)
    }
}

/// Read chunk size for a channel: its transfer limit clamped to 32..=256
pub fn chunk_size<C: CommandChannel + ?Sized>(channel: &C) -> usize {
    channel.max_transfer_len().clamp(MIN_CHUNK, MAX_CHUNK)
}

/// Reject ranges that do not fit the 3-byte read address space
fn check_span(offset: u32, len: usize) -> Result<()> {
    let limit = u64::from(AddressWidth::ThreeByte.max_size());
    if u64::from(offset) + len as u64 > limit {
        return Err(Error::AddressOutOfBounds {
            offset,
            len: u32::try_from(len).unwrap_or(u32::MAX),
        });
    }
    Ok(())
}

/// Compare flash contents at `offset` against `expected`
///
/// Reads back in bounded chunks and stops at the first mismatch.
pub fn compare<C: CommandChannel + ?Sized>(
    channel: &mut C,
    offset: u32,
    expected: &[u8],
) -> Result<MatchResult> {
    compare_with_progress(channel, offset, expected, &mut crate::progress::NoProgress)
}

/// Compare flash contents, reporting read progress
pub fn compare_with_progress<C: CommandChannel + ?Sized>(
    channel: &mut C,
    offset: u32,
    expected: &[u8],
    progress: &mut dyn ProgressSink,
) -> Result<MatchResult> {
    check_span(offset, expected.len())?;
    let chunk = chunk_size(channel);
    let mut buf = vec![0u8; chunk];

    progress.reading(expected.len());
    for (i, want) in expected.chunks(chunk).enumerate() {
        let addr = offset + (i * chunk) as u32;
        let got = &mut buf[..want.len()];
        protocol::read_3b(channel, addr, got, chunk)?;

        if let Some(pos) = want.iter().zip(got.iter()).position(|(a, b)| a != b) {
            let result = MatchResult::FirstMismatch {
                address: addr + pos as u32,
                expected: want[pos],
                actual: got[pos],
            };
            debug!("Compare: {:?}", result);
            return Ok(result);
        }
        progress.read_progress(i * chunk + want.len());
    }

    Ok(MatchResult::Identical)
}

/// Read flash contents at `offset` into `buf`
pub fn read<C: CommandChannel + ?Sized>(
    channel: &mut C,
    offset: u32,
    buf: &mut [u8],
    progress: &mut dyn ProgressSink,
) -> Result<()> {
    check_span(offset, buf.len())?;
    let chunk = chunk_size(channel);
    progress.reading(buf.len());
    let mut done = 0;
    for part in buf.chunks_mut(chunk * 16) {
        protocol::read_3b(channel, offset + done as u32, part, chunk)?;
        done += part.len();
        progress.read_progress(done);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::mock::MockChannel;
    use crate::progress::NoProgress;
    use crate::spi::opcodes;
    use alloc::vec::Vec;

    #[test]
    fn test_identical() {
        let mut channel = MockChannel::winbond();
        let expected = vec![0xFF; 1000];
        assert_eq!(compare(&mut channel, 0x100, &expected), Ok(MatchResult::Identical));
    }

    #[test]
    fn test_first_mismatch() {
        let mut channel = MockChannel::winbond();
        channel.memory[0x1234] = 0x00;
        channel.memory[0x1300] = 0x00;
        let expected = vec![0xFF; 0x1000];

        assert_eq!(
            compare(&mut channel, 0x1000, &expected),
            Ok(MatchResult::FirstMismatch {
                address: 0x1234,
                expected: 0xFF,
                actual: 0x00
            })
        );
    }

    #[test]
    fn test_compare_is_repeatable() {
        let mut channel = MockChannel::winbond();
        channel.memory[0x10] = 0x42;
        let expected = vec![0xFF; 64];
        let first = compare(&mut channel, 0, &expected);
        let second = compare(&mut channel, 0, &expected);
        assert_eq!(first, second);
    }

    #[test]
    fn test_chunk_size_is_clamped() {
        let mut channel = MockChannel::winbond();
        channel.max_transfer = 8;
        assert_eq!(chunk_size(&channel), 32);
        channel.max_transfer = 1024;
        assert_eq!(chunk_size(&channel), 256);

        let expected = vec![0xFF; 600];
        compare(&mut channel, 0, &expected).unwrap();
        let lens: Vec<usize> = channel
            .frames
            .iter()
            .filter(|(f, _)| f[0] == opcodes::READ)
            .map(|(_, len)| *len)
            .collect();
        assert_eq!(lens, vec![256, 256, 88]);
    }

    #[test]
    fn test_channel_error_propagates() {
        let mut channel = MockChannel::winbond();
        channel.fail_at = Some(1);
        let expected = vec![0xFF; 1024];
        assert_eq!(
            compare(&mut channel, 0, &expected),
            Err(crate::Error::ChannelFailed)
        );
    }

    #[test]
    fn test_range_past_address_space_is_rejected() {
        let mut channel = MockChannel::winbond();
        let expected = vec![0xFF; 64];
        assert_eq!(
            compare(&mut channel, u32::MAX - 8, &expected),
            Err(crate::Error::AddressOutOfBounds {
                offset: u32::MAX - 8,
                len: 64
            })
        );

        let mut buf = vec![0u8; 0x100];
        assert!(read(&mut channel, 0xFF_FF80, &mut buf, &mut NoProgress).is_err());
        assert!(channel.frames.is_empty());
    }

    #[test]
    fn test_read_dump() {
        let mut channel = MockChannel::winbond();
        channel.memory[0x2000..0x3000].fill(0x77);
        let mut buf = vec![0u8; 0x1000];
        read(&mut channel, 0x2000, &mut buf, &mut NoProgress).unwrap();
        assert!(buf.iter().all(|&b| b == 0x77));
    }
}
