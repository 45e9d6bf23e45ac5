use super::*;

use ddflash_core::chip::identify;
use ddflash_core::image::{FirmwareImage, HeaderKey, ImageError};
use ddflash_core::progress::NoProgress;
use ddflash_core::protocol::{self, PollConfig};
use ddflash_core::update::{
    self, run_plan, CurrentReason, UpdateError, UpdateOutcome, UpdatePlan, UpdateRequest,
    UpdateTarget, Updater,
};
use ddflash_core::verify::{self, MatchResult};

const SECTOR: usize = 4096;

fn flash(name: &str) -> DummyFlash {
    DummyFlash::new(DummyConfig::by_name(name).unwrap())
}

/// Sector index of each address, with consecutive repeats removed
fn sector_order(addresses: &[u32]) -> Vec<u32> {
    let mut order: Vec<u32> = addresses.iter().map(|a| a / SECTOR as u32).collect();
    order.dedup();
    order
}

fn headed_image(header: &[u8], payload: &[u8]) -> FirmwareImage {
    let mut data = header.to_vec();
    data.extend_from_slice(payload);
    FirmwareImage::parse(data).unwrap()
}

#[test]
fn test_identify_matches_configured_part() {
    for part in chip::CHIPS {
        let mut dummy = DummyFlash::new(DummyConfig::for_chip(*part));
        assert_eq!(identify(&mut dummy).unwrap(), *part);
    }
}

#[test]
fn test_three_sector_pattern_page_mode() {
    let mut dummy = flash("W25Q16JV");
    let chip = identify(&mut dummy).unwrap();
    let data = vec![0xAA; 3 * SECTOR];

    chip.strategy()
        .erase_and_program(&mut dummy, &chip, 0, &data, &mut NoProgress)
        .unwrap();

    assert_eq!(dummy.addresses_of(opcodes::SE_20), vec![0x0000, 0x1000, 0x2000]);
    assert_eq!(sector_order(&dummy.addresses_of(opcodes::PP)), vec![2, 1, 0]);
    assert_eq!(verify::compare(&mut dummy, 0, &data), Ok(MatchResult::Identical));
    // protection restored
    assert_eq!(dummy.status().bits() & 0x3C, 0x3C);
}

#[test]
fn test_three_sector_pattern_byte_stream_mode() {
    let mut dummy = flash("SST25VF016B");
    let chip = identify(&mut dummy).unwrap();
    let data = vec![0xAA; 3 * SECTOR];

    chip.strategy()
        .erase_and_program(&mut dummy, &chip, 0, &data, &mut NoProgress)
        .unwrap();

    assert_eq!(dummy.addresses_of(opcodes::SE_20), vec![0x0000, 0x1000, 0x2000]);
    assert_eq!(dummy.addresses_of(opcodes::AAI_WP), vec![0x2000, 0x1000, 0x0000]);
    assert_eq!(verify::compare(&mut dummy, 0, &data), Ok(MatchResult::Identical));
    assert_eq!(dummy.status().bits() & 0x3C, 0x1C);
}

#[test]
fn test_buffer_mode_round_trip() {
    let mut dummy = flash("AT45DB642D");
    let chip = identify(&mut dummy).unwrap();
    dummy.data_mut()[0x4000..0xA000].fill(0x00);
    let data: Vec<u8> = (0..0x4000u32).map(|i| (i * 7) as u8).collect();

    // 0x4400..0x8400 contains exactly one whole block, 0x6000..0x8000
    chip.strategy()
        .erase_and_program(&mut dummy, &chip, 0x4400, &data, &mut NoProgress)
        .unwrap();

    assert_eq!(dummy.addresses_of(dataflash::BLOCK_ERASE), vec![0x6000]);
    assert_eq!(verify::compare(&mut dummy, 0x4400, &data), Ok(MatchResult::Identical));
    // neighbouring pages untouched
    assert_eq!(dummy.data()[0x43FF], 0x00);
    assert_eq!(dummy.data()[0x8400], 0x00);
}

#[test]
fn test_protected_part_refuses_erase_without_unlock() {
    let mut dummy = flash("W25Q32JV");
    assert_eq!(
        protocol::sector_erase(&mut dummy, 0, PollConfig::ERASE),
        Err(Error::WriteProtected)
    );
}

#[test]
fn test_header_scenario_applies_payload_only() {
    let header = b"Devid:0007\nVersion:1.4\nLength:131072\n\0";
    let payload: Vec<u8> = (0..131072u32).map(|i| (i ^ (i >> 8)) as u8).collect();
    let image = headed_image(header, &payload);
    assert_eq!(image.payload_offset(), header.len());

    let mut dummy = flash("W25Q16JV");
    let target = UpdateTarget::new(0x0007, 0x0001_0003);
    let request = UpdateRequest::new(0x10000, 0x1F0000);

    let outcome = Updater::new(&mut dummy, target).update(&image, &request);

    assert_eq!(outcome, UpdateOutcome::Applied);
    assert_eq!(outcome.code(), 1);
    assert_eq!(&dummy.data()[0x10000..0x10000 + 131072], &payload[..]);
    assert!(dummy.data()[0x10000 + 131072..].iter().all(|&b| b == 0xFF));
    assert!(dummy.data()[..0x10000].iter().all(|&b| b == 0xFF));
}

#[test]
fn test_unlisted_id_stops_after_identification() {
    let mut part = DummyConfig::default().chip;
    part.id = [0x1F, 0x28, 0x01];
    let mut dummy = DummyFlash::new(DummyConfig::for_chip(part));
    let image = FirmwareImage::raw(vec![0x00; SECTOR]);

    let outcome = Updater::new(&mut dummy, UpdateTarget::new(7, 0))
        .update(&image, &UpdateRequest::new(0x10000, 0x10000));

    assert_eq!(
        outcome,
        UpdateOutcome::Error(UpdateError::UnknownFlash {
            id: [0x1F, 0x28, 0x01]
        })
    );
    assert_eq!(dummy.frames().len(), 1);
    assert_eq!(dummy.frames()[0].opcode(), opcodes::RDID);
}

#[test]
fn test_second_update_is_already_current() {
    let mut dummy = flash("SST25VF032B");
    let image = headed_image(b"Devid:0008\nVersion:2.0\n\0", &vec![0x3C; 3 * SECTOR + 10]);
    let target = UpdateTarget::new(0x0008, 0x0001_0009);
    let request = UpdateRequest::new(0x10000, 0x10000);

    let first = Updater::new(&mut dummy, target).update(&image, &request);
    dummy.clear_frames();
    let second = Updater::new(&mut dummy, target).update(&image, &request);

    assert_eq!(first, UpdateOutcome::Applied);
    assert_eq!(second, UpdateOutcome::AlreadyCurrent(CurrentReason::Identical));
    assert!(dummy.addresses_of(opcodes::SE_20).is_empty());
}

#[test]
fn test_version_gate_equal_skips_greater_applies() {
    let image = headed_image(b"Devid:0007\nVersion:1.3\n\0", &[0x42; SECTOR]);
    let request = UpdateRequest::new(0x10000, 0x10000);

    let mut dummy = flash("W25Q16JV");
    let outcome = Updater::new(&mut dummy, UpdateTarget::new(7, 0x0001_0003)).update(&image, &request);
    assert_eq!(outcome, UpdateOutcome::AlreadyCurrent(CurrentReason::NotNewer));
    assert_eq!(dummy.frames().len(), 1);

    let outcome = Updater::new(&mut dummy, UpdateTarget::new(7, 0x0001_0002)).update(&image, &request);
    assert_eq!(outcome, UpdateOutcome::Applied);
}

#[test]
fn test_compat_gate_regardless_of_version() {
    let image = headed_image(b"Devid:0009\nVersion:99.0\nCardId:0009,000A\n\0", &[0x42; SECTOR]);
    let mut dummy = flash("W25Q16JV");

    let outcome = Updater::new(&mut dummy, UpdateTarget::new(0x0007, 0))
        .update(&image, &UpdateRequest::new(0x10000, 0x10000).with_force(true));

    assert_eq!(outcome, UpdateOutcome::Incompatible);
    assert_eq!(outcome.code(), -4);
    assert!(dummy.data().iter().all(|&b| b == 0xFF));
}

#[test]
fn test_failed_program_then_rerun_recovers() {
    let mut dummy = flash("W25Q16JV");
    let image = FirmwareImage::raw(vec![0x99; 2 * SECTOR]);
    let request = UpdateRequest::new(0x20000, 0x10000);
    dummy.fail_on(Some(40));

    let outcome = Updater::new(&mut dummy, UpdateTarget::new(7, 0)).update(&image, &request);
    assert!(matches!(outcome, UpdateOutcome::Error(UpdateError::Program(_))));
    assert_eq!(outcome.code(), -7);

    dummy.fail_on(None);
    let outcome = Updater::new(&mut dummy, UpdateTarget::new(7, 0)).update(&image, &request);
    assert_eq!(outcome, UpdateOutcome::Applied);
}

#[test]
fn test_verify_mismatch_is_reported() {
    // Bit 0 of 0x10005 reads back as 1
    struct StuckBit(DummyFlash);

    impl CommandChannel for StuckBit {
        fn transact(&mut self, write: &[u8], read: &mut [u8]) -> Result<()> {
            self.0.transact(write, read)?;
            if write[0] == opcodes::READ && write[1..4] == [0x01, 0x00, 0x00] && read.len() > 5 {
                read[5] ^= 0x01;
            }
            Ok(())
        }

        fn delay_us(&mut self, _us: u32) {}
    }

    let mut channel = StuckBit(flash("W25Q16JV"));
    let image = FirmwareImage::raw(vec![0x00; SECTOR]);
    let outcome = Updater::new(&mut channel, UpdateTarget::new(7, 0))
        .update(&image, &UpdateRequest::new(0x10000, 0x10000));

    assert_eq!(
        outcome,
        UpdateOutcome::Error(UpdateError::VerifyMismatch {
            address: 0x10005,
            expected: 0x00,
            actual: 0x01
        })
    );
    assert_eq!(outcome.code(), -6);
}

#[test]
fn test_update_file_gates() {
    let dir = tempfile::tempdir().unwrap();
    let mut dummy = flash("W25Q16JV");
    let target = UpdateTarget::new(7, 0);
    let request = UpdateRequest::new(0x10000, 0x10000);

    let missing = dir.path().join("missing.fpga");
    let outcome = Updater::new(&mut dummy, target).update_file(&missing, &request, &mut NoProgress);
    assert_eq!(outcome, UpdateOutcome::Error(UpdateError::FileNotFound));
    assert_eq!(outcome.code(), -1);

    let tiny = dir.path().join("tiny.fpga");
    std::fs::write(&tiny, [0u8; 100]).unwrap();
    let outcome = Updater::new(&mut dummy, target).update_file(&tiny, &request, &mut NoProgress);
    assert_eq!(outcome.code(), -2);

    let bad = dir.path().join("bad.fpga");
    let mut contents = b"Devid:xyz\n\0".to_vec();
    contents.resize(2048, 0xFF);
    std::fs::write(&bad, contents).unwrap();
    let outcome = Updater::new(&mut dummy, target).update_file(&bad, &request, &mut NoProgress);
    assert_eq!(
        outcome,
        UpdateOutcome::Error(UpdateError::InvalidImage(ImageError::InvalidValue {
            key: HeaderKey::Devid
        }))
    );

    let good = dir.path().join("good.fpga");
    let mut contents = b"Devid:0007\nVersion:1.0\n\0".to_vec();
    contents.resize(5000, 0x12);
    std::fs::write(&good, &contents).unwrap();
    let outcome = Updater::new(&mut dummy, target).update_file(&good, &request, &mut NoProgress);
    assert_eq!(outcome, UpdateOutcome::Applied);

    let image = update::load_image(&good, true).unwrap();
    assert_eq!(&dummy.data()[0x10000..0x10000 + image.payload().len()], image.payload());
}

#[test]
fn test_run_plan_sets_status_bits() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("boot.bin"), vec![0x01; 4096]).unwrap();
    let mut fpga = b"Devid:0007\nVersion:1.1\n\0".to_vec();
    fpga.resize(8192, 0x02);
    std::fs::write(dir.path().join("fpga.fpga"), fpga).unwrap();
    let plan_path = dir.path().join("plan.toml");
    std::fs::write(
        &plan_path,
        r#"
[[image]]
path = "boot.bin"
offset = 0
max_len = 0x10000
header = false
status_bit = 4

[[image]]
path = "fpga.fpga"
offset = 0x10000

[[image]]
path = "absent.fpga"
"#,
    )
    .unwrap();

    let plan = UpdatePlan::load(&plan_path).unwrap();
    let mut dummy = flash("W25Q16JV");
    let report = run_plan(&mut dummy, UpdateTarget::new(7, 0x0001_0000), &plan, &mut NoProgress);

    assert_eq!(report.entries.len(), 3);
    assert_eq!(report.entries[0].1, UpdateOutcome::Applied);
    assert_eq!(report.entries[1].1, UpdateOutcome::Applied);
    assert_eq!(report.entries[2].1, UpdateOutcome::Error(UpdateError::FileNotFound));
    assert_eq!(report.status, (1 << 4) | (1 << 1));
    assert_eq!(report.code(), -1);
    assert_eq!(dummy.data()[0], 0x01);
    assert_eq!(dummy.data()[0x10000], 0x02);
}

#[test]
fn test_transfer_limit_is_enforced() {
    let mut config = DummyConfig::default();
    config.max_transfer = 64;
    let mut dummy = DummyFlash::new(config);
    let mut buf = vec![0u8; 128];

    assert!(matches!(
        protocol::read_3b(&mut dummy, 0, &mut buf, 128),
        Err(Error::TransferTooLarge { len: 128, max: 64 })
    ));
    // the verify engine stays within the limit
    let expected = vec![0xFF; 256];
    assert_eq!(verify::compare(&mut dummy, 0, &expected), Ok(MatchResult::Identical));
}
