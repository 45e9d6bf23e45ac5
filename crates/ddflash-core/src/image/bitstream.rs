//! Identifier embedded in FPGA bitstreams

/// How far into the payload the marker is searched for
pub const SEARCH_WINDOW: usize = 64 * 1024;

const MARKER_PLAIN: [u8; 2] = [0xBD, 0xB3];
const MARKER_PROTECTED: [u8; 2] = [0xBC, 0xB3];

/// Identifier found in a bitstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitstreamId {
    /// Offset of the marker within the payload
    pub offset: usize,
    /// Whether the id was XOR-folded
    pub protected: bool,
    /// Decoded 32-bit identifier
    pub id: u32,
}

impl BitstreamId {
    /// Device id part (low 16 bits)
    pub fn device_id(&self) -> u32 {
        self.id & 0xFFFF
    }
}

/// Search the first 64 KiB of `payload` for an identifier
///
/// Unprotected streams store the id as the four bytes after `BD B3`, big
/// endian. Protected streams follow `BC B3` with 16 bytes; id byte `k` is
/// the XOR of bytes `k`, `k + 4`, `k + 8` and `k + 12`.
pub fn find(payload: &[u8]) -> Option<BitstreamId> {
    let window = &payload[..payload.len().min(SEARCH_WINDOW)];

    for pos in 0..window.len().saturating_sub(1) {
        let marker = [window[pos], window[pos + 1]];
        let body = &window[pos + 2..];

        if marker == MARKER_PLAIN && body.len() >= 4 {
            let id = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
            return Some(BitstreamId {
                offset: pos,
                protected: false,
                id,
            });
        }
        if marker == MARKER_PROTECTED && body.len() >= 16 {
            let mut bytes = [0u8; 4];
            for (k, b) in bytes.iter_mut().enumerate() {
                *b = body[k] ^ body[k + 4] ^ body[k + 8] ^ body[k + 12];
            }
            return Some(BitstreamId {
                offset: pos,
                protected: true,
                id: u32::from_be_bytes(bytes),
            });
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_plain_marker() {
        let mut data = vec![0xFF; 256];
        data[100..106].copy_from_slice(&[0xBD, 0xB3, 0xDD, 0x01, 0x00, 0x07]);
        let found = find(&data).unwrap();
        assert_eq!(found.offset, 100);
        assert!(!found.protected);
        assert_eq!(found.id, 0xDD01_0007);
        assert_eq!(found.device_id(), 0x0007);
    }

    #[test]
    fn test_protected_marker_is_xor_folded() {
        let mut data = vec![0x00; 64];
        data[10] = 0xBC;
        data[11] = 0xB3;
        let body = [
            0x10, 0x20, 0x30, 0x40, //
            0x01, 0x02, 0x03, 0x04, //
            0xCC, 0x23, 0x33, 0x40, //
            0x00, 0x00, 0x00, 0x03, //
        ];
        data[12..28].copy_from_slice(&body);
        let found = find(&data).unwrap();
        assert!(found.protected);
        assert_eq!(found.id, 0xDD01_0007);
    }

    #[test]
    fn test_marker_outside_window_is_ignored() {
        let mut data = vec![0xFF; SEARCH_WINDOW + 16];
        data[SEARCH_WINDOW + 2..SEARCH_WINDOW + 8]
            .copy_from_slice(&[0xBD, 0xB3, 0, 0, 0, 7]);
        assert_eq!(find(&data), None);
    }

    #[test]
    fn test_truncated_marker() {
        assert_eq!(find(&[0xBD, 0xB3, 0x00]), None);
    }
}
