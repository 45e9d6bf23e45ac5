//! Update command implementation

use super::IndicatifProgress;
use crate::cli::TargetArgs;
use ddflash_core::channel::CommandChannel;
use ddflash_core::chip;
use ddflash_core::image::format_version;
use ddflash_core::update::{run_plan, PlanEntry, PlanReport, UpdatePlan, UpdateTarget};
use std::path::PathBuf;

/// Where the images of an update come from, and how to install them
#[derive(Debug, Clone, Default)]
pub struct UpdateArgs {
    pub images: Vec<PathBuf>,
    pub plan: Option<PathBuf>,
    pub image_dir: PathBuf,
    pub offset: u32,
    pub max_len: Option<usize>,
    pub header: bool,
    pub force: bool,
    pub check_bitstream: bool,
}

/// Combine the identity reported by the channel with command-line overrides
pub fn resolve_target(
    args: TargetArgs,
    detected: Option<UpdateTarget>,
) -> Result<UpdateTarget, Box<dyn std::error::Error>> {
    let device_id = args
        .device_id
        .or(detected.map(|t| t.device_id))
        .ok_or("Device id unknown for this channel; pass --device-id")?;
    let hw_version = args
        .hw_version
        .or(detected.map(|t| t.hw_version))
        .unwrap_or(0);
    Ok(UpdateTarget::new(device_id, hw_version))
}

/// Build the plan described by `args`
///
/// An explicit plan file wins; otherwise each image on the command line
/// becomes one entry; with neither, the card's catalog image from
/// `image_dir` is used.
pub fn build_plan(
    channel: &mut dyn CommandChannel,
    target: UpdateTarget,
    args: &UpdateArgs,
) -> Result<UpdatePlan, Box<dyn std::error::Error>> {
    if let Some(path) = &args.plan {
        let plan = UpdatePlan::load(path)?;
        log::info!("Loaded plan {} with {} images", path.display(), plan.images.len());
        return Ok(plan);
    }

    if !args.images.is_empty() {
        let images = args
            .images
            .iter()
            .map(|path| PlanEntry {
                path: path.clone(),
                offset: args.offset,
                max_len: args.max_len,
                header: args.header,
                force: args.force,
                check_bitstream: args.check_bitstream,
                status_bit: None,
            })
            .collect();
        return Ok(UpdatePlan { images });
    }

    let part = chip::identify(channel)?;
    let mut plan = UpdatePlan::default_for(target.device_id, part.total_size, &args.image_dir)?;
    for entry in &mut plan.images {
        entry.force = args.force;
        entry.check_bitstream = args.check_bitstream;
    }
    Ok(plan)
}

/// Run the update command and return the process exit code
pub fn run_update(
    channel: &mut dyn CommandChannel,
    target: UpdateTarget,
    args: &UpdateArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    println!(
        "Updating device 0x{:04X} (hardware {})",
        target.device_id,
        format_version(target.hw_version)
    );

    let plan = build_plan(channel, target, args)?;
    let report = install(channel, target, &plan);

    print!("{}", report.summary());
    Ok(report.code())
}

fn install(channel: &mut dyn CommandChannel, target: UpdateTarget, plan: &UpdatePlan) -> PlanReport {
    let mut progress = IndicatifProgress::new();
    let report = run_plan(channel, target, plan, &mut progress);
    progress.finish();
    if report.status != 0 {
        log::info!("Plan status mask 0x{:08X}", report.status);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddflash_dummy::DummyFlash;

    fn args(images: Vec<PathBuf>) -> UpdateArgs {
        UpdateArgs {
            images,
            offset: 0x10000,
            header: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_target() {
        let detected = Some(UpdateTarget::new(7, 0x0001_0003));
        assert_eq!(
            resolve_target(TargetArgs::default(), detected).unwrap(),
            UpdateTarget::new(7, 0x0001_0003)
        );

        let overrides = TargetArgs {
            device_id: Some(9),
            hw_version: None,
        };
        assert_eq!(
            resolve_target(overrides, detected).unwrap(),
            UpdateTarget::new(9, 0x0001_0003)
        );
        assert!(resolve_target(TargetArgs::default(), None).is_err());
    }

    #[test]
    fn test_update_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fpga.fpga");
        let mut contents = b"Devid:0007\nVersion:1.4\nCompat:0007\n\0".to_vec();
        contents.resize(8192, 0x77);
        std::fs::write(&path, &contents).unwrap();

        let mut flash = DummyFlash::new_default();
        let target = UpdateTarget::new(7, 0x0001_0003);

        assert_eq!(run_update(&mut flash, target, &args(vec![path.clone()])).unwrap(), 1);
        assert_eq!(run_update(&mut flash, target, &args(vec![path.clone()])).unwrap(), 0);

        let other = UpdateTarget::new(8, 0);
        assert_eq!(run_update(&mut flash, other, &args(vec![path])).unwrap(), -4);

        // no Compat list: another device id is not gated, and the flash
        // already holds the same payload
        let open = dir.path().join("open.fpga");
        let mut contents = b"Devid:0007\nVersion:1.4\n\0".to_vec();
        contents.resize(8192, 0x77);
        std::fs::write(&open, &contents).unwrap();
        assert_eq!(run_update(&mut flash, other, &args(vec![open])).unwrap(), 0);

        let missing = dir.path().join("missing.fpga");
        assert_eq!(run_update(&mut flash, target, &args(vec![missing])).unwrap(), -1);
    }

    #[test]
    fn test_default_plan_uses_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let mut flash = DummyFlash::new_default();
        let update = UpdateArgs {
            image_dir: dir.path().to_path_buf(),
            force: true,
            ..args(vec![])
        };

        let plan = build_plan(&mut flash, UpdateTarget::new(7, 0), &update).unwrap();
        assert_eq!(plan.images.len(), 1);
        assert_eq!(
            plan.images[0].path,
            dir.path().join("DVBBridgeV2A_DD01_0007_MXL.fpga")
        );
        assert_eq!(plan.images[0].max_len, Some(0x1F0000));
        assert!(plan.images[0].force);

        assert!(build_plan(&mut flash, UpdateTarget::new(0x7777, 0), &update).is_err());
    }
}
