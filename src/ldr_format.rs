// Block header layout (16 bytes, little-endian):
//
// +-------+-------+--------+---------+----------------+------------+----------+
// | bcode | flags | hdrchk | hdrsign | target_address | byte_count | argument |
// | 4 bit | 12 bit| 8 bit  | 8 bit   | 32 bit         | 32 bit     | 32 bit   |
// +-------+-------+--------+---------+----------------+------------+----------+
//  \____________ block code word ___________/
//
// The XOR of all 16 bytes is zero for a valid header.

pub const HEADER_SIZE: usize = 16;

/// Size of the repeating word carried by a Fill block's `argument`.
pub const FILL_WORD_SIZE: usize = 4;

/// Fill blocks at or below this many bytes are unrolled into literal data.
pub const DEFAULT_FILL_UNROLL_THRESHOLD: u32 = 256;

pub const BCODE_MASK: u32 = 0x0000_000F;
pub const FLAGS_SHIFT: u32 = 4;
pub const FLAGS_MASK: u32 = 0x0000_0FFF;
pub const CHECKSUM_SHIFT: u32 = 16;
pub const SIGNATURE_SHIFT: u32 = 24;

/// Byte offset of the checksum inside a raw header.
pub const CHECKSUM_OFFSET: usize = 2;

bitflags::bitflags! {
    /// Block flags, the 12-bit field of the block code word.
    ///
    /// Bits not named here are carried through untouched.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct BlockFlags: u16 {
        /// Fill the target range with the 32-bit `argument`.
        const FILL = 0x010;
        /// Call the code at the target address once the payload is loaded.
        const INIT = 0x080;
        /// Payload is present in the stream but must not be loaded.
        const IGNORE = 0x100;
        /// Start of an application: carries the entry point.
        const FIRST = 0x400;
        /// Last block of the stream.
        const FINAL = 0x800;

        const _ = 0x0FFF;
    }
}

impl Default for BlockFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl BlockFlags {
    pub fn from_field(field: u16) -> Self {
        Self::from_bits_retain(field & FLAGS_MASK as u16)
    }

    pub fn field(self) -> u16 {
        self.bits() & FLAGS_MASK as u16
    }

    /// FILL set and nothing else.
    pub fn is_fill_only(self) -> bool {
        self == BlockFlags::FILL
    }
}
