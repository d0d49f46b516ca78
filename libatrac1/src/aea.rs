//! AEA container header.
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0      | 4    | magic `00 08 00 00` |
//! | 4      | 256  | null-padded ASCII title |
//! | 260    | 4    | little-endian frame count (units x channels) |
//! | 264    | 1    | channel count (1 or 2) |
//! | 265    | 1783 | zero |

use serde::Serialize;

use crate::error::{AtracError, AtracResult};

/// Total header size in bytes.
pub const AEA_HEADER_SIZE: usize = 2048;

/// Magic bytes at the start of every AEA file.
pub const AEA_MAGIC: [u8; 4] = [0x00, 0x08, 0x00, 0x00];

const TITLE_FIELD: usize = 256;
const MAX_TITLE_LEN: usize = TITLE_FIELD - 1;

/// Parsed AEA header fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AeaHeader {
    pub title: String,
    /// Total sound units in the file across all channels.
    pub frame_count: u32,
    pub channel_count: u8,
}

impl AeaHeader {
    /// Build a 2048-byte header. The title must be ASCII and at most 255
    /// bytes; the channel count must be 1 or 2.
    pub fn create(title: &str, frame_count: u32, channel_count: u8) -> AtracResult<[u8; AEA_HEADER_SIZE]> {
        if !title.is_ascii() {
            return Err(AtracError::InvalidTitle(format!(
                "title must be ASCII: {:?}",
                title
            )));
        }
        if title.len() > MAX_TITLE_LEN {
            return Err(AtracError::InvalidTitle(format!(
                "title too long: {} bytes (max {})",
                title.len(),
                MAX_TITLE_LEN
            )));
        }
        if !(1..=2).contains(&channel_count) {
            return Err(AtracError::InvalidOption(format!(
                "channel count must be 1 or 2, got {}",
                channel_count
            )));
        }

        let mut buf = [0u8; AEA_HEADER_SIZE];
        buf[..4].copy_from_slice(&AEA_MAGIC);
        buf[4..4 + title.len()].copy_from_slice(title.as_bytes());
        buf[260..264].copy_from_slice(&frame_count.to_le_bytes());
        buf[264] = channel_count;
        Ok(buf)
    }

    /// Parse the 2048-byte header block. Fails with `InvalidMagic` when the
    /// magic does not match; handing over a complete header block (and
    /// reporting short reads) is the I/O layer's job.
    pub fn parse(data: &[u8; AEA_HEADER_SIZE]) -> AtracResult<AeaHeader> {
        if data[..4] != AEA_MAGIC {
            let mut magic = [0u8; 4];
            magic.copy_from_slice(&data[..4]);
            return Err(AtracError::InvalidMagic(magic));
        }

        let title_bytes = &data[4..4 + TITLE_FIELD];
        let end = title_bytes.iter().position(|&b| b == 0).unwrap_or(TITLE_FIELD);
        let title = String::from_utf8_lossy(&title_bytes[..end]).into_owned();

        let mut count = [0u8; 4];
        count.copy_from_slice(&data[260..264]);

        Ok(AeaHeader {
            title,
            frame_count: u32::from_le_bytes(count),
            channel_count: data[264],
        })
    }

    /// Serialize this header back to its 2048-byte form.
    pub fn to_bytes(&self) -> AtracResult<[u8; AEA_HEADER_SIZE]> {
        AeaHeader::create(&self.title, self.frame_count, self.channel_count)
    }
}
