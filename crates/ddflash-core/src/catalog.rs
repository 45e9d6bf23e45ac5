//! Digital Devices card catalog
//!
//! Maps the device id reported by the bridge to the card name and the FPGA
//! image file shipped for it.

/// Offset of the FPGA image in the configuration flash; the region below
/// holds the boot image
pub const DEFAULT_IMAGE_OFFSET: u32 = 0x10000;

/// One catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardInfo {
    /// Device id as reported by the bridge
    pub device_id: u32,
    /// Marketing name
    pub name: &'static str,
    /// Default FPGA image file name
    pub image: &'static str,
}

const fn card(device_id: u32, name: &'static str, image: &'static str) -> CardInfo {
    CardInfo {
        device_id,
        name,
        image,
    }
}

/// Known cards
pub static CARDS: &[CardInfo] = &[
    card(0x0002, "Octopus 35", "DVBBridgeV1A_DVBBridgeV1A.bit"),
    card(0x0003, "Octopus", "DVBBridgeV1B_DVBBridgeV1B.fpga"),
    card(0x0005, "Octopus Classic", "DVBBridgeV2A_DD01_0005_STD.fpga"),
    card(0x0006, "CineS2 V7", "DVBBridgeV2A_DD01_0006_STD.fpga"),
    card(0x0007, "Octopus 4/8", "DVBBridgeV2A_DD01_0007_MXL.fpga"),
    card(0x0008, "Octopus 4/8", "DVBBridgeV2A_DD01_0008_CXD.fpga"),
    card(0x0009, "Max SX8", "DVBBridgeV2A_DD01_0009_SX8.fpga"),
    card(0x000A, "Max M4", "DVBBridgeV2A_DD01_000A_M4.fpga"),
    card(0x0011, "Octopus CI", "DVBBridgeV2B_DD01_0011.fpga"),
    card(0x0012, "Octopus CI", "DVBBridgeV2B_DD01_0012_STD.fpga"),
    card(0x0013, "Octopus PRO", "DVBBridgeV2B_DD01_0013_PRO.fpga"),
    card(0x0020, "Octopus GT Mini", "DVBBridgeV2B_DD01_0020.fpga"),
    card(0x0201, "Modulator", "DVBModulatorV1B_DVBModulatorV1B.bit"),
    card(0x0203, "Octopus CI Single", "DVBModulatorV1B_DD01_0203.fpga"),
    card(0x0210, "Modulator V2", "DVBModulatorV2A_DD01_0210.fpga"),
    card(0x0220, "SDRModulator ATV", "SDRModulatorV1A_DD01_0220.fpga"),
    card(0x0221, "SDRModulator IQ", "SDRModulatorV1A_DD01_0221_IQ.fpga"),
    card(0x0222, "SDRModulator DVBT", "SDRModulatorV1A_DD01_0222_DVBT.fpga"),
];

/// Look up a card by device id
pub fn lookup(device_id: u32) -> Option<&'static CardInfo> {
    CARDS.iter().find(|c| c.device_id == device_id)
}
