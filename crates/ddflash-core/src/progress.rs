//! Progress reporting hooks

/// Callback for progress reporting during read, erase and program phases
///
/// Every method has a no-op default so sinks only implement what they show.
pub trait ProgressSink {
    /// Called when starting to read flash contents
    fn reading(&mut self, _total_bytes: usize) {}

    /// Called to update read progress
    fn read_progress(&mut self, _bytes_read: usize) {}

    /// Called when starting erase operations
    fn erasing(&mut self, _blocks_to_erase: usize, _bytes_to_erase: usize) {}

    /// Called after each block is erased
    fn erase_progress(&mut self, _blocks_erased: usize) {}

    /// Called when starting write operations
    fn writing(&mut self, _bytes_to_write: usize) {}

    /// Called to update write progress
    fn write_progress(&mut self, _bytes_written: usize) {}
}

/// A no-op progress reporter
pub struct NoProgress;

impl ProgressSink for NoProgress {}
