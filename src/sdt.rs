//! Raw table input: header decoding and a validated byte wrapper.
//!
//! The fixed header is decoded into an owned struct up front, so the parser
//! works with plain integers and never touches unaligned table memory.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Size of the common header every system description table starts with.
pub const HEADER_LEN: usize = 36;

/// The fixed header fields of a system description table.
#[derive(Clone, Debug)]
pub struct SdtHeader {
    pub signature: [u8; 4],
    pub length: u32,
    pub revision: u8,
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
    pub oem_revision: u32,
    pub creator_id: u32,
    pub creator_revision: u32,
}

fn dword_at(bytes: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

impl SdtHeader {
    /// Decodes the header from the start of `bytes`, or nothing when fewer
    /// than [`HEADER_LEN`] bytes are present.
    fn decode(bytes: &[u8]) -> Option<SdtHeader> {
        if bytes.len() < HEADER_LEN {
            return None;
        }

        let mut signature = [0u8; 4];
        signature.copy_from_slice(&bytes[0..4]);
        let mut oem_id = [0u8; 6];
        oem_id.copy_from_slice(&bytes[10..16]);
        let mut oem_table_id = [0u8; 8];
        oem_table_id.copy_from_slice(&bytes[16..24]);

        Some(SdtHeader {
            signature,
            length: dword_at(bytes, 4),
            revision: bytes[8],
            checksum: bytes[9],
            oem_id,
            oem_table_id,
            oem_revision: dword_at(bytes, 24),
            creator_id: dword_at(bytes, 28),
            creator_revision: dword_at(bytes, 32),
        })
    }

    pub fn length(&self) -> usize {
        self.length as usize
    }

    /// The 4-character signature, used to label diagnostics.
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.signature).into_owned()
    }
}

#[derive(Debug, Error)]
pub enum InvalidSdtError {
    #[error("table shorter than its header")]
    TruncatedHeader,

    #[error("header length field does not match the table size")]
    LengthMismatch,

    #[error("table bytes do not sum to zero")]
    ChecksumMismatch,
}

/// An AML-containing table (DSDT, SSDT, ...), validated on construction.
/// The decoded header is kept alongside the raw bytes.
#[derive(Clone)]
pub struct Sdt {
    header: SdtHeader,
    bytes: Arc<[u8]>,
}

impl Sdt {
    pub fn new(bytes: Arc<[u8]>) -> Result<Self, InvalidSdtError> {
        let header = SdtHeader::decode(&bytes).ok_or(InvalidSdtError::TruncatedHeader)?;
        if header.length() != bytes.len() {
            return Err(InvalidSdtError::LengthMismatch);
        }

        // The checksum byte is chosen so the whole table sums to zero.
        let sum = bytes
            .iter()
            .fold(0u8, |sum, &byte| sum.wrapping_add(byte));
        if sum != 0 {
            return Err(InvalidSdtError::ChecksumMismatch);
        }

        Ok(Sdt { header, bytes })
    }

    pub fn header(&self) -> &SdtHeader {
        &self.header
    }

    pub fn name(&self) -> String {
        self.header.name()
    }

    /// The whole table, header included.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// The AML byte stream after the fixed header.
    pub fn data(&self) -> &[u8] {
        &self.bytes[HEADER_LEN..]
    }
}

impl fmt::Debug for Sdt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sdt")
            .field("signature", &self.name())
            .field("aml_len", &self.data().len())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::{InvalidSdtError, Sdt, HEADER_LEN};

    fn raw_table(aml: &[u8]) -> Vec<u8> {
        let total = HEADER_LEN + aml.len();
        let mut bytes = Vec::with_capacity(total);
        bytes.extend_from_slice(b"DSDT");
        bytes.extend_from_slice(&(total as u32).to_le_bytes());
        bytes.push(2); // revision
        bytes.push(0); // checksum, patched below
        bytes.extend_from_slice(b"OEMIDX");
        bytes.extend_from_slice(b"OEMTBLID");
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(b"RUST");
        bytes.extend_from_slice(&1u32.to_le_bytes());
        assert_eq!(bytes.len(), HEADER_LEN);
        bytes.extend_from_slice(aml);

        let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        bytes[9] = sum.wrapping_neg();
        bytes
    }

    #[test]
    fn accepts_valid_table() {
        let aml = [0xa3u8, 0xa3];
        let sdt = Sdt::new(raw_table(&aml).into()).unwrap();
        assert_eq!(sdt.name(), "DSDT");
        assert_eq!(sdt.data(), &aml);
        assert_eq!(sdt.header().length(), sdt.as_slice().len());
        assert_eq!(sdt.header().revision, 2);
        assert_eq!(&sdt.header().oem_id, b"OEMIDX");
    }

    #[test]
    fn rejects_bad_checksum() {
        let mut bytes = raw_table(&[0xa3]);
        bytes[9] = bytes[9].wrapping_add(1);
        assert!(matches!(
            Sdt::new(bytes.into()),
            Err(InvalidSdtError::ChecksumMismatch)
        ));
    }

    #[test]
    fn rejects_truncated_table() {
        let bytes = raw_table(&[]);
        let truncated: Vec<u8> = bytes[..20].to_vec();
        assert!(matches!(
            Sdt::new(truncated.into()),
            Err(InvalidSdtError::TruncatedHeader)
        ));

        let mut wrong_length = raw_table(&[]);
        wrong_length.push(0);
        assert!(matches!(
            Sdt::new(wrong_length.into()),
            Err(InvalidSdtError::LengthMismatch)
        ));
    }
}
