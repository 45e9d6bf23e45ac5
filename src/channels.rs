//! Command channel registration and dispatch
//!
//! This module provides a centralized registry for all channel backends,
//! with support for feature-gated inclusion and dynamic help text
//! generation.

use ddflash_core::channel::{ChannelInfo, CommandChannel};
use ddflash_core::update::UpdateTarget;

/// Get information about all available channels (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_channels() -> Vec<ChannelInfo> {
    let mut channels = Vec::new();

    #[cfg(feature = "ddbridge")]
    channels.push(ChannelInfo {
        name: "ddbridge",
        description: "Digital Devices card via /dev/ddbridge (card=<n>,link=<0-3>,dev=<path>)",
        requires_root: true,
    });

    #[cfg(feature = "dummy")]
    channels.push(ChannelInfo {
        name: "dummy",
        description: "In-memory flash emulator for testing (chip=<name>,size=<bytes>,busy=<polls>)",
        requires_root: false,
    });

    channels
}

/// Generate help text listing all available channels
pub fn channel_help() -> String {
    let channels = available_channels();

    if channels.is_empty() {
        return "No channels available (recompile with channel features enabled)".to_string();
    }

    let mut help = String::from("Available channels:\n");
    for c in &channels {
        let root = if c.requires_root { " [root]" } else { "" };
        help.push_str(&format!("  {:10} - {}{}\n", c.name, c.description, root));
    }
    help
}

/// Generate a short list of channel names for CLI help
pub fn channel_names_short() -> String {
    let channels = available_channels();
    let names: Vec<&str> = channels.iter().map(|c| c.name).collect();
    names.join(", ")
}

/// An opened channel and, when the backend can tell, the card behind it
pub struct OpenChannel {
    /// The channel itself
    pub channel: Box<dyn CommandChannel + Send>,
    /// Card identity reported by the backend
    pub target: Option<UpdateTarget>,
}

/// Open the channel described by `channel`
///
/// The string can be just the name (e.g., "ddbridge") or include
/// parameters (e.g., "ddbridge:card=1,link=0").
#[allow(unused_variables)]
pub fn open_channel(channel: &str) -> Result<OpenChannel, Box<dyn std::error::Error>> {
    let (name, options) = parse_channel_string(channel);

    match name {
        #[cfg(feature = "ddbridge")]
        "ddbridge" => {
            log::info!("Opening ddbridge channel...");
            let bridge = ddflash_ddbridge::open_ddbridge(&options).map_err(|e| {
                format!(
                    "Failed to open ddbridge card: {}\n\
                     Make sure the ddbridge module is loaded and you have read/write permissions.",
                    e
                )
            })?;
            let target = bridge.card_id().target();
            Ok(OpenChannel {
                channel: Box::new(bridge),
                target: Some(target),
            })
        }

        #[cfg(feature = "dummy")]
        "dummy" => {
            let config = parse_dummy_options(&options)?;
            log::info!(
                "Opening dummy channel emulating {} ({} bytes)",
                config.chip.name,
                config.chip.total_size
            );
            Ok(OpenChannel {
                channel: Box::new(ddflash_dummy::DummyFlash::new(config)),
                target: None,
            })
        }

        _ => Err(unknown_channel_error(name)),
    }
}

/// Build a dummy configuration from channel options
#[cfg(feature = "dummy")]
fn parse_dummy_options(
    options: &[(&str, &str)],
) -> Result<ddflash_dummy::DummyConfig, Box<dyn std::error::Error>> {
    let mut config = ddflash_dummy::DummyConfig::default();

    for (key, value) in options {
        match *key {
            "chip" => {
                config = ddflash_dummy::DummyConfig::by_name(value).ok_or_else(|| {
                    format!("Unknown chip: {} (see 'ddflash list-chips')", value)
                })?;
            }
            "size" => {
                let size = parse_size(value).ok_or_else(|| format!("Invalid size: {}", value))?;
                if size == 0 || size % config.chip.sector_size != 0 {
                    return Err(format!("Size {} is not a multiple of the sector size", size).into());
                }
                config.chip.total_size = size;
            }
            "busy" => {
                config.busy_polls = value
                    .parse()
                    .map_err(|_| format!("Invalid busy value: {}", value))?;
            }
            _ => log::warn!("dummy: Unknown option: {}={}", key, value),
        }
    }

    Ok(config)
}

/// Parse a byte count with an optional `K`/`M` suffix or `0x` prefix
#[cfg(feature = "dummy")]
fn parse_size(s: &str) -> Option<u32> {
    let s = s.trim();
    if let Some(n) = s.strip_suffix(['M', 'm']) {
        return n.parse::<u32>().ok()?.checked_mul(1024 * 1024);
    }
    if let Some(n) = s.strip_suffix(['K', 'k']) {
        return n.parse::<u32>().ok()?.checked_mul(1024);
    }
    match s.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

/// Parse a channel string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_channel_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

fn unknown_channel_error(name: &str) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown channel: {}\n\n", name);
    msg.push_str(&channel_help());
    msg.push_str("\nUse 'ddflash list-channels' for more details");
    msg.into()
}
