//! ASCII `key:value` header

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::{String, ToString};
use core::fmt;

/// Header keys the engine interprets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderKey {
    /// `Devid`: device id the image was built for (hex)
    Devid,
    /// `Version`: `major.minor` (decimal) or raw hex
    Version,
    /// `Compat`: comma separated device ids (hex)
    Compat,
    /// `CardId`: alias of `Compat`
    CardId,
    /// `Length`: payload length in bytes (decimal)
    Length,
}

impl HeaderKey {
    /// Match a key case-insensitively
    pub fn from_key(key: &str) -> Option<Self> {
        [
            Self::Devid,
            Self::Version,
            Self::Compat,
            Self::CardId,
            Self::Length,
        ]
        .into_iter()
        .find(|k| k.as_str().eq_ignore_ascii_case(key))
    }

    /// Canonical spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Devid => "Devid",
            Self::Version => "Version",
            Self::Compat => "Compat",
            Self::CardId => "CardId",
            Self::Length => "Length",
        }
    }
}

impl fmt::Display for HeaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed image header
///
/// `fields` keeps every line as written, including keys the engine does not
/// interpret.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    /// Device id the image targets
    pub device_id: Option<u32>,
    /// Image version
    pub version: Option<u32>,
    /// Device ids the image may be installed on
    pub compat: Option<BTreeSet<u32>>,
    /// Declared payload length
    pub length: Option<usize>,
    /// All header fields, keyed by the key text as written
    pub fields: BTreeMap<String, String>,
}

impl Header {
    /// Look up a raw field case-insensitively
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Record one `key:value` pair, interpreting recognized keys
    pub(crate) fn insert(&mut self, key: &str, value: &str) -> Result<(), HeaderKey> {
        if let Some(known) = HeaderKey::from_key(key) {
            match known {
                HeaderKey::Devid => self.device_id = Some(parse_hex(value).ok_or(known)?),
                HeaderKey::Version => self.version = Some(parse_version(value).ok_or(known)?),
                HeaderKey::Compat | HeaderKey::CardId => {
                    let ids = parse_id_list(value).ok_or(known)?;
                    self.compat.get_or_insert_with(BTreeSet::new).extend(ids);
                }
                HeaderKey::Length => {
                    self.length = Some(value.parse::<usize>().map_err(|_| known)?)
                }
            }
        }
        self.fields.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Split a header line into key and value
///
/// Returns `None` unless the line has a `:`, a non-empty printable key
/// without spaces, and a printable value.
pub(crate) fn split_line(line: &[u8]) -> Option<(&str, &str)> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let colon = line.iter().position(|&b| b == b':')?;
    let (key, value) = (&line[..colon], &line[colon + 1..]);

    if key.is_empty() || !key.iter().all(|b| b.is_ascii_graphic()) {
        return None;
    }
    if !value.iter().all(|&b| b == b' ' || b == b'\t' || b.is_ascii_graphic()) {
        return None;
    }

    let key = core::str::from_utf8(key).ok()?;
    let value = core::str::from_utf8(value).ok()?;
    Some((key, value.trim()))
}

/// Parse a hex number with optional `0x` prefix
pub fn parse_hex(s: &str) -> Option<u32> {
    let s = s.trim();
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(digits, 16).ok()
}

/// Parse a version: `major.minor` in decimal, otherwise raw hex
///
/// `1.4` becomes `0x0001_0004`. The two spellings are told apart only by
/// the presence of a `.`.
pub fn parse_version(s: &str) -> Option<u32> {
    let s = s.trim();
    match s.split_once('.') {
        Some((major, minor)) => {
            let major: u16 = major.trim().parse().ok()?;
            let minor: u16 = minor.trim().parse().ok()?;
            Some(((major as u32) << 16) | minor as u32)
        }
        None => parse_hex(s),
    }
}

fn parse_id_list(s: &str) -> Option<BTreeSet<u32>> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(parse_hex)
        .collect()
}

/// Format a version as `major.minor`
pub fn format_version(version: u32) -> heapless::String<16> {
    use core::fmt::Write;

    let mut s = heapless::String::new();
    let _ = write!(s, "{}.{}", version >> 16, version & 0xFFFF);
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_forms() {
        assert_eq!(parse_version("1.4"), Some(0x0001_0004));
        assert_eq!(parse_version("2.10"), Some(0x0002_000A));
        assert_eq!(parse_version("10003"), Some(0x0001_0003));
        assert_eq!(parse_version("0x10003"), Some(0x0001_0003));
        assert_eq!(parse_version("1.x"), None);
        assert_eq!(format_version(0x0001_0004).as_str(), "1.4");
    }

    #[test]
    fn test_split_line() {
        assert_eq!(split_line(b"Devid:0007"), Some(("Devid", "0007")));
        assert_eq!(split_line(b"Version: 1.4\r"), Some(("Version", "1.4")));
        assert_eq!(split_line(b"no separator"), None);
        assert_eq!(split_line(b":empty key"), None);
        assert_eq!(split_line(b"bad key:x"), None);
        assert_eq!(split_line(b"Key:\xFF\x00"), None);
    }

    #[test]
    fn test_compat_and_card_id_merge() {
        let mut header = Header::default();
        header.insert("Compat", "0005, 0x0006").unwrap();
        header.insert("cardid", "0007").unwrap();
        let ids: alloc::vec::Vec<u32> = header.compat.unwrap().into_iter().collect();
        assert_eq!(ids, [5, 6, 7]);
    }

    #[test]
    fn test_malformed_value_names_key() {
        let mut header = Header::default();
        assert_eq!(header.insert("LENGTH", "12k"), Err(HeaderKey::Length));
        assert_eq!(header.insert("devid", "zz"), Err(HeaderKey::Devid));
        assert!(header.insert("Build", "anything goes").is_ok());
        assert_eq!(header.get("build"), Some("anything goes"));
    }
}
