//! Decoder for the thread basic information block.
//!
//! The block is what `NtQueryInformationThread(ThreadBasicInformation)` fills
//! in. Its layout is fixed per pointer width, little-endian:
//!
//! | field            | 64-bit | 32-bit |
//! |------------------|--------|--------|
//! | `exit_status`    | 0..4   | 0..4   |
//! | padding          | 4..8   | -      |
//! | `teb_base`       | 8..16  | 4..8   |
//! | `client_process` | 16..24 | 8..12  |
//! | `client_thread`  | 24..32 | 12..16 |
//! | `affinity_mask`  | 32..40 | 16..20 |
//! | `priority`       | 40..44 | 20..24 |
//! | `base_priority`  | 44..48 | 24..28 |
//!
//! Decoding is pure so it can be exercised on synthetic buffers.

use bytes::Buf;

use crate::core::error::DecodeError;
use crate::util::AffinityMask;

/// Size and pointer width of one basic information block layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicInfoLayout {
    pointer_width: usize,
    size: usize,
}

impl BasicInfoLayout {
    pub const LAYOUT_64: BasicInfoLayout = BasicInfoLayout {
        pointer_width: 8,
        size: 48,
    };

    pub const LAYOUT_32: BasicInfoLayout = BasicInfoLayout {
        pointer_width: 4,
        size: 28,
    };

    #[cfg(target_pointer_width = "64")]
    pub const NATIVE: BasicInfoLayout = Self::LAYOUT_64;

    #[cfg(not(target_pointer_width = "64"))]
    pub const NATIVE: BasicInfoLayout = Self::LAYOUT_32;

    /// Largest block of any supported layout; sizes the query buffer.
    pub const MAX_SIZE: usize = 48;

    pub const fn size(&self) -> usize {
        self.size
    }

    pub const fn pointer_width(&self) -> usize {
        self.pointer_width
    }

    /// Byte offset of the affinity mask field.
    pub const fn affinity_offset(&self) -> usize {
        // exit status, alignment padding, then three pointers
        if self.pointer_width == 8 {
            8 + 3 * 8
        } else {
            4 + 3 * 4
        }
    }

    /// Decodes a full block from the front of `buf`. Trailing bytes are ignored.
    pub fn decode(&self, buf: &[u8]) -> Result<BasicInformation, DecodeError> {
        if buf.len() < self.size {
            return Err(DecodeError::Truncated {
                expected: self.size,
                actual: buf.len(),
            });
        }

        let mut cur = &buf[..self.size];
        let exit_status = cur.get_i32_le();
        if self.pointer_width == 8 {
            cur.advance(4);
        }
        let teb_base_address = self.get_pointer(&mut cur);
        let client_process = self.get_pointer(&mut cur);
        let client_thread = self.get_pointer(&mut cur);
        let affinity_mask = self.get_pointer(&mut cur);
        let priority = cur.get_i32_le();
        let base_priority = cur.get_i32_le();

        Ok(BasicInformation {
            exit_status,
            teb_base_address,
            client_process,
            client_thread,
            affinity_mask: AffinityMask::new(affinity_mask),
            priority,
            base_priority,
        })
    }

    fn get_pointer(&self, cur: &mut &[u8]) -> u64 {
        if self.pointer_width == 8 {
            cur.get_u64_le()
        } else {
            u64::from(cur.get_u32_le())
        }
    }
}

/// Decoded thread basic information block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicInformation {
    pub exit_status: i32,
    pub teb_base_address: u64,
    pub client_process: u64,
    pub client_thread: u64,
    pub affinity_mask: AffinityMask,
    pub priority: i32,
    pub base_priority: i32,
}

/// Decodes with the layout of the running target.
pub fn decode_native(buf: &[u8]) -> Result<BasicInformation, DecodeError> {
    BasicInfoLayout::NATIVE.decode(buf)
}
