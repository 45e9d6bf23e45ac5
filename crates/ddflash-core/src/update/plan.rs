//! Multi-image update plans
//!
//! A plan is an ordered list of images to install on one card, usually
//! loaded from TOML:
//!
//! ```toml
//! [[image]]
//! path = "DVBBridgeV2A_DD01_0007_MXL.fpga"
//! offset = 0x10000
//! max_len = 0x1F0000
//! status_bit = 0
//! ```

use std::path::{Path, PathBuf};
use std::string::String;
use std::vec::Vec;

use log::{info, warn};
use serde::Deserialize;
use thiserror::Error;

use super::{UpdateOutcome, UpdateRequest, UpdateTarget, Updater};
use crate::catalog;
use crate::channel::CommandChannel;
use crate::progress::ProgressSink;

/// Errors loading or building a plan
#[derive(Debug, Error)]
pub enum PlanError {
    /// Plan file could not be read
    #[error("Failed to read plan '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Plan file is not valid TOML for a plan
    #[error("Failed to parse plan: {0}")]
    Parse(#[from] toml::de::Error),

    /// Plan has no images
    #[error("Plan contains no images")]
    Empty,

    /// No catalog entry for the card
    #[error("No default image known for device id {0:#06x}")]
    UnknownCard(u32),

    /// Region does not fit in the flash
    #[error("Image offset {offset:#x} is beyond the flash size {flash_size:#x}")]
    OffsetBeyondFlash { offset: u32, flash_size: u32 },
}

fn default_offset() -> u32 {
    catalog::DEFAULT_IMAGE_OFFSET
}

fn default_header() -> bool {
    true
}

/// One image of a plan
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanEntry {
    /// Image file; relative paths are resolved against the plan's directory
    pub path: PathBuf,
    /// Flash address of the region
    #[serde(default = "default_offset")]
    pub offset: u32,
    /// Region size; unlimited (up to the end of the flash) if absent
    #[serde(default)]
    pub max_len: Option<usize>,
    /// Parse the image header
    #[serde(default = "default_header")]
    pub header: bool,
    /// Install even if the version is not newer
    #[serde(default)]
    pub force: bool,
    /// Check the embedded bitstream id against `Devid`
    #[serde(default)]
    pub check_bitstream: bool,
    /// Bit set in the report's status mask when this image is applied
    /// (defaults to the entry's position)
    #[serde(default)]
    pub status_bit: Option<u8>,
}

impl PlanEntry {
    /// Update request described by this entry
    pub fn request(&self) -> UpdateRequest {
        UpdateRequest::new(self.offset, self.max_len.unwrap_or(usize::MAX))
            .with_header(self.header)
            .with_force(self.force)
            .with_bitstream_check(self.check_bitstream)
    }
}

/// Ordered list of images to install
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePlan {
    /// Images in installation order
    #[serde(rename = "image", default)]
    pub images: Vec<PlanEntry>,
}

impl UpdatePlan {
    /// Parse a plan from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, PlanError> {
        let plan: UpdatePlan = toml::from_str(text)?;
        if plan.images.is_empty() {
            return Err(PlanError::Empty);
        }
        Ok(plan)
    }

    /// Load a plan file, resolving relative image paths against its directory
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let text = std::fs::read_to_string(path).map_err(|source| PlanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut plan = Self::from_toml_str(&text)?;
        if let Some(dir) = path.parent() {
            for entry in &mut plan.images {
                if entry.path.is_relative() {
                    entry.path = dir.join(&entry.path);
                }
            }
        }
        Ok(plan)
    }

    /// Default plan for a card: its catalog image, above the boot region
    pub fn default_for(device_id: u32, flash_size: u32, image_dir: &Path) -> Result<Self, PlanError> {
        let card = catalog::lookup(device_id).ok_or(PlanError::UnknownCard(device_id))?;
        let offset = catalog::DEFAULT_IMAGE_OFFSET;
        if flash_size <= offset {
            return Err(PlanError::OffsetBeyondFlash { offset, flash_size });
        }

        Ok(Self {
            images: std::vec![PlanEntry {
                path: image_dir.join(card.image),
                offset,
                max_len: Some((flash_size - offset) as usize),
                header: true,
                force: false,
                check_bitstream: false,
                status_bit: Some(0),
            }],
        })
    }
}

/// Outcome of running a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanReport {
    /// Outcome per entry, in plan order
    pub entries: Vec<(PathBuf, UpdateOutcome)>,
    /// One bit per applied entry
    pub status: u32,
}

impl PlanReport {
    /// Worst exit code among the entries: the first failure, else 1 if
    /// anything was applied, else 0
    pub fn code(&self) -> i32 {
        if let Some((_, failed)) = self.entries.iter().find(|(_, o)| o.code() < 0) {
            return failed.code();
        }
        if self.status != 0 {
            1
        } else {
            0
        }
    }

    /// One line per entry
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for (path, outcome) in &self.entries {
            out.push_str(&std::format!("{}: {}\n", path.display(), outcome));
        }
        out
    }
}

/// Install every image of `plan` in order over one channel
///
/// Entries are independent: a failed entry is reported and the next one
/// still runs.
pub fn run_plan(
    channel: &mut dyn CommandChannel,
    target: UpdateTarget,
    plan: &UpdatePlan,
    progress: &mut dyn ProgressSink,
) -> PlanReport {
    let mut updater = Updater::new(channel, target);
    let mut report = PlanReport {
        entries: Vec::with_capacity(plan.images.len()),
        status: 0,
    };

    for (index, entry) in plan.images.iter().enumerate() {
        info!(
            "Plan entry {}/{}: {} at 0x{:08X}",
            index + 1,
            plan.images.len(),
            entry.path.display(),
            entry.offset
        );
        let outcome = updater.update_file(&entry.path, &entry.request(), progress);
        if outcome.is_applied() {
            let bit = entry.status_bit.map(u32::from).unwrap_or(index as u32);
            if bit < 32 {
                report.status |= 1 << bit;
            } else {
                warn!("Status bit {} out of range, ignored", bit);
            }
        }
        report.entries.push((entry.path.clone(), outcome));
    }

    report
}
