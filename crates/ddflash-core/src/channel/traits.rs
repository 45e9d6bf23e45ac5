//! Command channel trait definitions

use crate::error::{Error, Result};
use crate::spi::Transaction;

/// Default largest read phase accepted in one bus cycle
pub const DEFAULT_MAX_TRANSFER: usize = 1024;

/// Command channel trait
///
/// This trait represents a byte-oriented link to one flash device. Each call
/// to `transact()` is one atomic select-then-transfer bus cycle: the write
/// phase completes before the read phase begins, and no other transaction on
/// the same link is interleaved with it.
///
/// Errors are opaque. Implementations map whatever their transport reports
/// to `Error::ChannelFailed` (or `Error::TransferTooLarge` when a request
/// exceeds the link's limits).
///
/// ## Example
///
/// ```ignore
/// impl CommandChannel for MyBridge {
///     fn transact(&mut self, write: &[u8], read: &mut [u8]) -> Result<()> {
///         self.ioctl_flashio(write, read).map_err(|_| Error::ChannelFailed)
///     }
///
///     fn delay_us(&mut self, us: u32) {
///         std::thread::sleep(std::time::Duration::from_micros(us as u64));
///     }
/// }
/// ```
pub trait CommandChannel {
    /// Run one bus cycle: send `write`, then fill `read`
    ///
    /// An empty `read` means the cycle has no read phase.
    fn transact(&mut self, write: &[u8], read: &mut [u8]) -> Result<()>;

    /// Get the maximum number of bytes that can be read in a single transaction
    fn max_transfer_len(&self) -> usize {
        DEFAULT_MAX_TRANSFER
    }

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);

    /// Execute a single transaction
    ///
    /// Encodes the opcode, address and payload into one frame and fills the
    /// transaction's read buffer from the response.
    fn execute(&mut self, txn: &mut Transaction<'_>) -> Result<()> {
        let max = self.max_transfer_len();
        if txn.read_buf.len() > max {
            return Err(Error::TransferTooLarge {
                len: txn.read_buf.len(),
                max,
            });
        }
        let frame = txn.encode_frame();
        self.transact(&frame, txn.read_buf)
    }
}

impl<C: CommandChannel + ?Sized> CommandChannel for &mut C {
    fn transact(&mut self, write: &[u8], read: &mut [u8]) -> Result<()> {
        (**self).transact(write, read)
    }

    fn max_transfer_len(&self) -> usize {
        (**self).max_transfer_len()
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

// Blanket impl for boxed channels to allow trait objects
impl CommandChannel for alloc::boxed::Box<dyn CommandChannel + Send> {
    fn transact(&mut self, write: &[u8], read: &mut [u8]) -> Result<()> {
        (**self).transact(write, read)
    }

    fn max_transfer_len(&self) -> usize {
        (**self).max_transfer_len()
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

/// Information about a channel backend
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    /// Name used in channel selection strings
    pub name: &'static str,
    /// Description
    pub description: &'static str,
    /// Whether this channel requires elevated privileges
    pub requires_root: bool,
}
