//! Update orchestration
//!
//! One update runs Detect, Decide, Compare, Program and Verify against a
//! single borrowed channel and always ends in exactly one [`UpdateOutcome`].
//! Nothing is retried: a failed program or verify is reported, and the
//! region must be verified before it is written again.

mod outcome;
#[cfg(feature = "std")]
mod plan;

use alloc::vec::Vec;
use core::fmt;
use log::{debug, error, info, warn};

use crate::channel::CommandChannel;
use crate::chip::{self, FlashDescriptor};
use crate::image::{self, Decision, FirmwareImage, SkipReason};
use crate::program::{PollSet, ProgramError};
use crate::progress::{NoProgress, ProgressSink};
use crate::verify::{self, MatchResult};
use crate::Error;

pub use outcome::{CurrentReason, UpdateError, UpdateOutcome};
#[cfg(feature = "std")]
pub use plan::{run_plan, PlanEntry, PlanError, PlanReport, UpdatePlan};

/// The card being updated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateTarget {
    /// Device id reported by the bridge
    pub device_id: u32,
    /// Hardware (FPGA) version currently running
    pub hw_version: u32,
}

impl UpdateTarget {
    /// Create a new target description
    pub const fn new(device_id: u32, hw_version: u32) -> Self {
        Self {
            device_id,
            hw_version,
        }
    }
}

/// Parameters of one update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateRequest {
    /// Flash address of the region
    pub offset: u32,
    /// Size of the region; larger payloads are rejected
    pub max_len: usize,
    /// Parse the image header (otherwise the whole file is payload)
    pub use_header: bool,
    /// Install even if the version is not newer
    pub force: bool,
    /// Reject images whose embedded bitstream id disagrees with `Devid`
    pub check_bitstream: bool,
}

impl UpdateRequest {
    /// Request for the region `offset..offset + max_len`, header parsing on
    pub const fn new(offset: u32, max_len: usize) -> Self {
        Self {
            offset,
            max_len,
            use_header: true,
            force: false,
            check_bitstream: false,
        }
    }

    /// Set whether the image header is parsed
    pub const fn with_header(mut self, use_header: bool) -> Self {
        self.use_header = use_header;
        self
    }

    /// Set whether the version gate is bypassed
    pub const fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Set whether the bitstream id is checked against the header
    pub const fn with_bitstream_check(mut self, check: bool) -> Self {
        self.check_bitstream = check;
        self
    }
}

/// Update state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    /// Nothing done yet
    Idle,
    /// Identifying the flash
    Detect,
    /// Applying the install policy
    Decide,
    /// Comparing flash contents with the payload
    Compare,
    /// Erasing and programming
    Program,
    /// Reading back after programming
    Verify,
    /// Outcome produced
    Done,
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Detect => "detect",
            Self::Decide => "decide",
            Self::Compare => "compare",
            Self::Program => "program",
            Self::Verify => "verify",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Drives updates over one borrowed command channel
pub struct Updater<'a> {
    channel: &'a mut dyn CommandChannel,
    target: UpdateTarget,
    polls: PollSet,
    state: UpdateState,
    chip: Option<FlashDescriptor>,
}

impl<'a> Updater<'a> {
    /// Create an updater for `target` behind `channel`
    pub fn new(channel: &'a mut dyn CommandChannel, target: UpdateTarget) -> Self {
        Self {
            channel,
            target,
            polls: PollSet::default(),
            state: UpdateState::Idle,
            chip: None,
        }
    }

    /// Override the busy-poll limits
    pub fn with_polls(mut self, polls: PollSet) -> Self {
        self.polls = polls;
        self
    }

    /// Last state entered
    pub fn state(&self) -> UpdateState {
        self.state
    }

    /// Flash detected by the last update
    pub fn chip(&self) -> Option<&FlashDescriptor> {
        self.chip.as_ref()
    }

    /// The card being updated
    pub fn target(&self) -> UpdateTarget {
        self.target
    }

    /// Install `image` as described by `request`
    pub fn update(&mut self, image: &FirmwareImage, request: &UpdateRequest) -> UpdateOutcome {
        self.update_with_progress(image, request, &mut NoProgress)
    }

    /// Install `image`, reporting progress of the flash phases
    pub fn update_with_progress(
        &mut self,
        image: &FirmwareImage,
        request: &UpdateRequest,
        progress: &mut dyn ProgressSink,
    ) -> UpdateOutcome {
        self.state = UpdateState::Idle;
        let outcome = match self.run(image, request, progress) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Update failed in {} phase: {}", self.state, e);
                UpdateOutcome::Error(e)
            }
        };
        self.enter(UpdateState::Done);
        info!("Update outcome: {}", outcome);
        outcome
    }

    fn enter(&mut self, state: UpdateState) {
        debug!("Update: {} -> {}", self.state, state);
        self.state = state;
    }

    fn run(
        &mut self,
        image: &FirmwareImage,
        request: &UpdateRequest,
        progress: &mut dyn ProgressSink,
    ) -> Result<UpdateOutcome, UpdateError> {
        self.enter(UpdateState::Detect);
        let chip = chip::identify(&mut *self.channel)?;
        self.chip = Some(chip);
        info!(
            "Found {} {} ({} KiB, {} byte sectors)",
            chip.vendor,
            chip.name,
            chip.total_size / 1024,
            chip.sector_size
        );

        self.enter(UpdateState::Decide);
        if let Some(outcome) = self.decide(image, request) {
            return Ok(outcome);
        }

        let payload = image.payload();
        let data = pad_payload(&chip, payload, request)?;

        self.enter(UpdateState::Compare);
        if verify::compare_with_progress(&mut *self.channel, request.offset, &data, progress)?
            .is_identical()
        {
            info!("Flash at 0x{:08X} already holds this image", request.offset);
            return Ok(UpdateOutcome::AlreadyCurrent(CurrentReason::Identical));
        }

        self.enter(UpdateState::Program);
        info!(
            "Programming {} bytes at 0x{:08X} ({} family)",
            data.len(),
            request.offset,
            chip.family
        );
        chip.strategy_with(self.polls).erase_and_program(
            &mut *self.channel,
            &chip,
            request.offset,
            &data,
            progress,
        )?;

        self.enter(UpdateState::Verify);
        match verify::compare_with_progress(&mut *self.channel, request.offset, &data, progress)? {
            MatchResult::Identical => Ok(UpdateOutcome::Applied),
            MatchResult::FirstMismatch {
                address,
                expected,
                actual,
            } => Err(UpdateError::VerifyMismatch {
                address,
                expected,
                actual,
            }),
        }
    }

    /// Install policy; `Some` short-circuits the update
    fn decide(&self, image: &FirmwareImage, request: &UpdateRequest) -> Option<UpdateOutcome> {
        let target = self.target;
        match image::decide(image, target.device_id, target.hw_version) {
            Decision::Incompatible => {
                warn!(
                    "Image is not compatible with device id 0x{:04X}",
                    target.device_id
                );
                return Some(UpdateOutcome::Incompatible);
            }
            Decision::Skip(SkipReason::NotNewer) if !request.force => {
                warn!(
                    "Image version is not newer than {}, skipping",
                    image::format_version(target.hw_version)
                );
                return Some(UpdateOutcome::AlreadyCurrent(CurrentReason::NotNewer));
            }
            Decision::Skip(SkipReason::NotNewer) => {
                info!("Image version is not newer, forced");
            }
            Decision::Apply => {}
        }

        if request.check_bitstream {
            let devid = image.header().and_then(|h| h.device_id);
            if let (Some(devid), Some(found)) = (devid, image.bitstream_id()) {
                debug!("Bitstream id 0x{:08X} at 0x{:X}", found.id, found.offset);
                if found.device_id() != devid & 0xFFFF {
                    warn!(
                        "Bitstream id 0x{:08X} does not match Devid 0x{:04X}",
                        found.id, devid
                    );
                    return Some(UpdateOutcome::Incompatible);
                }
            }
        }

        None
    }
}

/// Check the payload against the region and the part, then pad it with
/// `0xFF` to a whole number of sectors
fn pad_payload(
    chip: &FlashDescriptor,
    payload: &[u8],
    request: &UpdateRequest,
) -> Result<Vec<u8>, UpdateError> {
    if payload.is_empty() || payload.len() > request.max_len {
        return Err(UpdateError::SizeOutOfRange {
            len: payload.len(),
            max: request.max_len,
        });
    }

    let padded = chip.align_up(payload.len());
    match chip.check_range(request.offset, padded) {
        Ok(()) => {}
        Err(Error::AddressOutOfBounds { .. }) => {
            return Err(UpdateError::SizeOutOfRange {
                len: padded,
                max: (chip.total_size as usize).saturating_sub(request.offset as usize),
            })
        }
        Err(e) => return Err(ProgramError::at(request.offset)(e).into()),
    }

    let mut data = Vec::with_capacity(padded);
    data.extend_from_slice(payload);
    data.resize(padded, 0xFF);
    Ok(data)
}

/// Load an image file, applying the size gate
///
/// A missing file is `FileNotFound`; files outside 1024..=5_000_000 bytes
/// are `SizeOutOfRange`.
#[cfg(feature = "std")]
pub fn load_image(path: &std::path::Path, use_header: bool) -> Result<FirmwareImage, UpdateError> {
    let data = std::fs::read(path).map_err(|e| {
        error!("Cannot read {}: {}", path.display(), e);
        UpdateError::FileNotFound
    })?;

    if !FirmwareImage::file_size_ok(data.len()) {
        return Err(UpdateError::SizeOutOfRange {
            len: data.len(),
            max: image::MAX_FILE_SIZE,
        });
    }

    if use_header {
        Ok(FirmwareImage::parse(data)?)
    } else {
        Ok(FirmwareImage::raw(data))
    }
}

#[cfg(feature = "std")]
impl Updater<'_> {
    /// Load `path` and install it
    pub fn update_file(
        &mut self,
        path: &std::path::Path,
        request: &UpdateRequest,
        progress: &mut dyn ProgressSink,
    ) -> UpdateOutcome {
        info!("Updating from {}", path.display());
        match load_image(path, request.use_header) {
            Ok(image) => self.update_with_progress(&image, request, progress),
            Err(e) => {
                error!("{}: {}", path.display(), e);
                UpdateOutcome::Error(e)
            }
        }
    }
}
