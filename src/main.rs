//! ddflash - Flash programmer for Digital Devices cards
//!
//! Identifies the SPI configuration flash of a Digital Devices bridge or
//! modulator card, reads, writes and verifies it, and installs FPGA images
//! only when they are compatible with the card and newer than what it runs.
//!
//! # Architecture
//!
//! All flash access goes through a `CommandChannel`:
//! - **ddbridge** - the card's `/dev/ddbridge/cardN` device, one ioctl per
//!   bus cycle
//! - **dummy** - an in-memory emulator of the supported flash families
//!
//! The `update` command exits with the outcome code of the update (1 when
//! an image was applied, 0 when nothing needed doing, negative on errors).

mod channels;
mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::update::{resolve_target, UpdateArgs};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Probe { channel } => {
            let mut opened = channels::open_channel(&channel)?;
            commands::run_probe(&mut opened.channel, opened.target)?;
            Ok(())
        }
        Commands::Read {
            channel,
            output,
            offset,
            length,
        } => {
            let mut opened = channels::open_channel(&channel)?;
            commands::run_read(&mut opened.channel, &output, offset, length)
        }
        Commands::Verify {
            channel,
            input,
            offset,
            header,
        } => {
            let mut opened = channels::open_channel(&channel)?;
            commands::run_verify(&mut opened.channel, &input, offset, header)?;
            Ok(())
        }
        Commands::Write {
            channel,
            input,
            offset,
            no_verify,
        } => {
            let mut opened = channels::open_channel(&channel)?;
            commands::run_write(&mut opened.channel, &input, offset, !no_verify)
        }
        Commands::Update {
            channel,
            images,
            plan,
            image_dir,
            offset,
            max_len,
            no_header,
            force,
            check_bitstream,
            target,
        } => {
            let mut opened = channels::open_channel(&channel)?;
            let target = resolve_target(target, opened.target)?;
            let args = UpdateArgs {
                images,
                plan,
                image_dir,
                offset,
                max_len,
                header: !no_header,
                force,
                check_bitstream,
            };
            let code = commands::update::run_update(&mut opened.channel, target, &args)?;
            std::process::exit(code)
        }
        Commands::Inspect { image, target } => {
            let target = target
                .device_id
                .map(|id| ddflash_core::update::UpdateTarget::new(id, target.hw_version.unwrap_or(0)));
            commands::run_inspect(&image, target)
        }
        Commands::ListChips { vendor } => {
            commands::list_chips(vendor.as_deref());
            Ok(())
        }
        Commands::ListCards => {
            commands::list_cards();
            Ok(())
        }
        Commands::ListChannels => {
            commands::list_channels();
            Ok(())
        }
    }
}
