//! CLI argument parsing

use crate::channels;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a string as a hex or decimal length
fn parse_len(s: &str) -> Result<usize, String> {
    parse_hex_u32(s).map(|v| v as usize)
}

/// Parse a hardware version as `major.minor` or hex
fn parse_version(s: &str) -> Result<u32, String> {
    ddflash_core::image::parse_version(s).ok_or_else(|| format!("Invalid version: {}", s))
}

/// Generate dynamic help text for the channel argument
fn channel_help() -> String {
    format!(
        "Command channel to use [available: {}]",
        channels::channel_names_short()
    )
}

#[derive(Parser)]
#[command(name = "ddflash")]
#[command(author, version, about = "Digital Devices card flash programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Card identity overrides shared by update and inspect
#[derive(clap::Args, Debug, Clone, Copy, Default)]
pub struct TargetArgs {
    /// Device id of the card (required for the dummy channel)
    #[arg(long, value_parser = parse_hex_u32)]
    pub device_id: Option<u32>,

    /// Running hardware version, `major.minor` or hex (default: 0)
    #[arg(long, value_parser = parse_version)]
    pub hw_version: Option<u32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify the flash behind the channel
    Probe {
        #[arg(short, long, default_value = "ddbridge", help = channel_help())]
        channel: String,
    },

    /// Read flash contents to file
    Read {
        #[arg(short, long, default_value = "ddbridge", help = channel_help())]
        channel: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Start address (hex or decimal)
        #[arg(long, default_value = "0", value_parser = parse_hex_u32)]
        offset: u32,

        /// Number of bytes to read (default: up to the end of the flash)
        #[arg(long, value_parser = parse_len)]
        length: Option<usize>,
    },

    /// Compare flash contents against a file
    Verify {
        #[arg(short, long, default_value = "ddbridge", help = channel_help())]
        channel: String,

        /// File to compare against
        #[arg(short, long)]
        input: PathBuf,

        /// Flash address of the region (hex or decimal)
        #[arg(long, default_value = "0", value_parser = parse_hex_u32)]
        offset: u32,

        /// Strip the image header and compare only the payload
        #[arg(long)]
        header: bool,
    },

    /// Write a raw file to flash
    Write {
        #[arg(short, long, default_value = "ddbridge", help = channel_help())]
        channel: String,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Flash address of the region (hex or decimal)
        #[arg(long, default_value = "0", value_parser = parse_hex_u32)]
        offset: u32,

        /// Skip the read-back after programming
        #[arg(long)]
        no_verify: bool,
    },

    /// Install FPGA images, skipping ones that are not newer
    Update {
        #[arg(short, long, default_value = "ddbridge", help = channel_help())]
        channel: String,

        /// Image files, installed in order
        #[arg(conflicts_with = "plan")]
        images: Vec<PathBuf>,

        /// TOML update plan
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Directory holding the catalog images, used when no image or plan is given
        #[arg(long, default_value = ".")]
        image_dir: PathBuf,

        /// Flash address of the region (hex or decimal)
        #[arg(long, default_value = "0x10000", value_parser = parse_hex_u32)]
        offset: u32,

        /// Region size (default: up to the end of the flash)
        #[arg(long, value_parser = parse_len)]
        max_len: Option<usize>,

        /// Treat the whole file as payload
        #[arg(long)]
        no_header: bool,

        /// Install even if the image version is not newer
        #[arg(short, long)]
        force: bool,

        /// Reject images whose bitstream id disagrees with the header
        #[arg(long)]
        check_bitstream: bool,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Show the header and bitstream id of an image file
    Inspect {
        /// Image file
        image: PathBuf,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// List supported flash chips
    ListChips {
        /// Filter by vendor
        #[arg(long)]
        vendor: Option<String>,
    },

    /// List known cards and their default images
    ListCards,

    /// List available command channels
    ListChannels,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_hex_u32("0x10000"), Ok(0x10000));
        assert_eq!(parse_hex_u32("4096"), Ok(4096));
        assert!(parse_hex_u32("0xZZ").is_err());
        assert_eq!(parse_version("1.4"), Ok(0x0001_0004));
        assert_eq!(parse_version("0x10003"), Ok(0x0001_0003));
    }

    #[test]
    fn test_cli_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_update_args() {
        let cli = Cli::try_parse_from([
            "ddflash",
            "update",
            "-c",
            "dummy:chip=W25Q16JV",
            "--device-id",
            "0x0007",
            "--hw-version",
            "1.3",
            "--force",
            "a.fpga",
        ])
        .unwrap();

        match cli.command {
            Commands::Update {
                channel,
                images,
                offset,
                force,
                target,
                ..
            } => {
                assert_eq!(channel, "dummy:chip=W25Q16JV");
                assert_eq!(images, vec![PathBuf::from("a.fpga")]);
                assert_eq!(offset, 0x10000);
                assert!(force);
                assert_eq!(target.device_id, Some(7));
                assert_eq!(target.hw_version, Some(0x0001_0003));
            }
            _ => panic!("expected update"),
        }
    }
}
