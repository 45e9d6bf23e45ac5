//! Transaction structure

use super::AddressWidth;
use heapless::Vec as HVec;

/// A single command channel transaction
///
/// Designed to avoid allocation - uses slices for data.
/// The lifetime parameter `'a` ties the transaction to the buffers it references.
pub struct Transaction<'a> {
    /// The opcode byte
    pub opcode: u8,

    /// Address (if any)
    pub address: Option<u32>,

    /// Address width
    pub address_width: AddressWidth,

    /// Data to write after opcode/address
    pub payload: &'a [u8],

    /// Buffer to read into (mutable); its length is the expected read length
    pub read_buf: &'a mut [u8],
}

impl<'a> Transaction<'a> {
    /// Create a simple command with no address or data (e.g., WREN, WRDI)
    pub fn simple(opcode: u8) -> Self {
        Self {
            opcode,
            address: None,
            address_width: AddressWidth::None,
            payload: &[],
            read_buf: &mut [],
        }
    }

    /// Create a read register command with no address (e.g., RDSR, RDID)
    pub fn read_reg(opcode: u8, buf: &'a mut [u8]) -> Self {
        Self {
            opcode,
            address: None,
            address_width: AddressWidth::None,
            payload: &[],
            read_buf: buf,
        }
    }

    /// Create a write command with no address (e.g., WRSR, AAI continuation)
    pub fn write_reg(opcode: u8, data: &'a [u8]) -> Self {
        Self {
            opcode,
            address: None,
            address_width: AddressWidth::None,
            payload: data,
            read_buf: &mut [],
        }
    }

    /// Create a read command with 3-byte address (e.g., READ)
    pub fn read_3b(opcode: u8, addr: u32, buf: &'a mut [u8]) -> Self {
        Self {
            opcode,
            address: Some(addr),
            address_width: AddressWidth::ThreeByte,
            payload: &[],
            read_buf: buf,
        }
    }

    /// Create a write command with 3-byte address (e.g., PP)
    pub fn write_3b(opcode: u8, addr: u32, data: &'a [u8]) -> Self {
        Self {
            opcode,
            address: Some(addr),
            address_width: AddressWidth::ThreeByte,
            payload: data,
            read_buf: &mut [],
        }
    }

    /// Create an erase command with 3-byte address
    pub fn erase_3b(opcode: u8, addr: u32) -> Self {
        Self {
            opcode,
            address: Some(addr),
            address_width: AddressWidth::ThreeByte,
            payload: &[],
            read_buf: &mut [],
        }
    }

    /// Returns true if this transaction has a read phase
    pub fn has_read(&self) -> bool {
        !self.read_buf.is_empty()
    }

    /// Number of bytes in the write phase (opcode + address + payload)
    pub fn write_len(&self) -> usize {
        self.header_len() + self.payload.len()
    }

    /// Calculate the header length (opcode + address bytes)
    pub fn header_len(&self) -> usize {
        1 + self.address_width.bytes() as usize
    }

    /// Encode opcode and address into a small stack buffer
    pub fn encode_header(&self) -> HVec<u8, 4> {
        let mut header = HVec::new();
        // Capacity is 4 and the header is at most 4 bytes.
        let _ = header.push(self.opcode);
        if let Some(addr) = self.address {
            let mut buf = [0u8; 3];
            self.address_width.encode(addr, &mut buf);
            let _ = header.extend_from_slice(&buf[..self.address_width.bytes() as usize]);
        }
        header
    }

    /// Encode the complete write phase (header followed by payload)
    pub fn encode_frame(&self) -> alloc::vec::Vec<u8> {
        let mut frame = alloc::vec::Vec::with_capacity(self.write_len());
        frame.extend_from_slice(&self.encode_header());
        frame.extend_from_slice(self.payload);
        frame
    }
}
