use std::io::{self, Write};

use crate::checksum::xor8;
use crate::error::{LdrError, Result};
use crate::ldr_format::*;

fn get_fixed32_le(src4: &[u8]) -> u32 {
    u32::from_le_bytes([src4[0], src4[1], src4[2], src4[3]])
}

fn put_fixed32_le(dst4: &mut [u8], v: u32) {
    dst4.copy_from_slice(&v.to_le_bytes());
}

/// One fixed-size block header of a loader stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockHeader {
    pub bcode: u8,
    pub flags: BlockFlags,
    /// Checksum as stored on the wire. Ignored by `to_bytes`, which recomputes it.
    pub checksum: u8,
    pub signature: u8,
    pub target_address: u32,
    pub byte_count: u32,
    pub argument: u32,
}

impl BlockHeader {
    pub fn new(flags: BlockFlags, target_address: u32, byte_count: u32, argument: u32) -> Self {
        Self {
            flags,
            target_address,
            byte_count,
            argument,
            ..Self::default()
        }
    }

    /// Splits the raw bytes into fields without checking the checksum.
    pub fn parse(raw: &[u8; HEADER_SIZE]) -> Self {
        let code = get_fixed32_le(&raw[0..4]);
        Self {
            bcode: (code & BCODE_MASK) as u8,
            flags: BlockFlags::from_field(((code >> FLAGS_SHIFT) & FLAGS_MASK) as u16),
            checksum: (code >> CHECKSUM_SHIFT) as u8,
            signature: (code >> SIGNATURE_SHIFT) as u8,
            target_address: get_fixed32_le(&raw[4..8]),
            byte_count: get_fixed32_le(&raw[8..12]),
            argument: get_fixed32_le(&raw[12..16]),
        }
    }

    /// Validates the checksum of a header read at `offset` and decodes it.
    pub fn decode(raw: &[u8; HEADER_SIZE], offset: u64) -> Result<Self> {
        let computed = xor8::value(raw);
        if computed != 0 {
            return Err(LdrError::Checksum { offset, computed });
        }
        Ok(Self::parse(raw))
    }

    /// Packs the header with a freshly computed checksum.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let code = (self.bcode as u32 & BCODE_MASK)
            | ((self.flags.field() as u32 & FLAGS_MASK) << FLAGS_SHIFT)
            | ((self.signature as u32) << SIGNATURE_SHIFT);

        let mut raw = [0u8; HEADER_SIZE];
        put_fixed32_le(&mut raw[0..4], code);
        put_fixed32_le(&mut raw[4..8], self.target_address);
        put_fixed32_le(&mut raw[8..12], self.byte_count);
        put_fixed32_le(&mut raw[12..16], self.argument);
        raw[CHECKSUM_OFFSET] = xor8::seal(&raw, CHECKSUM_OFFSET);
        raw
    }

    /// Same header with `checksum` set to the value `to_bytes` would write.
    pub fn sealed(mut self) -> Self {
        self.checksum = self.to_bytes()[CHECKSUM_OFFSET];
        self
    }

    pub fn write<W: Write>(&self, dest: &mut W) -> io::Result<()> {
        dest.write_all(&self.to_bytes())
    }

    pub fn is_fill(&self) -> bool {
        self.flags.contains(BlockFlags::FILL)
    }

    /// Exclusive end of the target range, widened so it cannot wrap.
    pub fn end_address(&self) -> u64 {
        self.target_address as u64 + self.byte_count as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const FIRST_BLOCK: [u8; HEADER_SIZE] = [
        0x01, 0x50, 0xAC, 0xAD, // bcode 1, IGNORE|FIRST, checksum, signature
        0x00, 0x40, 0x00, 0x11, // entry point
        0x00, 0x00, 0x00, 0x00, // byte count
        0x00, 0x01, 0x00, 0x00, // argument
    ];

    #[test]
    fn decodes_known_first_block() {
        let hdr = BlockHeader::decode(&FIRST_BLOCK, 0).unwrap();
        assert_eq!(hdr.bcode, 1);
        assert_eq!(hdr.flags, BlockFlags::IGNORE | BlockFlags::FIRST);
        assert_eq!(hdr.checksum, 0xAC);
        assert_eq!(hdr.signature, 0xAD);
        assert_eq!(hdr.target_address, 0x1100_4000);
        assert_eq!(hdr.byte_count, 0);
        assert_eq!(hdr.argument, 0x100);
        assert_eq!(hdr.to_bytes(), FIRST_BLOCK);
    }

    #[test]
    fn low_flag_nibble_shares_byte_with_bcode() {
        let mut hdr = BlockHeader::new(BlockFlags::FILL, 0x2000, 64, 0xFFFF_FFFF);
        hdr.bcode = 1;
        hdr.signature = 0xAD;
        let raw = hdr.to_bytes();
        assert_eq!(
            raw,
            [
                0x01, 0x01, 0xCD, 0xAD, 0x00, 0x20, 0x00, 0x00, 0x40, 0x00, 0x00, 0x00, 0xFF, 0xFF,
                0xFF, 0xFF
            ]
        );
    }

    #[test]
    fn encode_ignores_stale_checksum() {
        let mut hdr = BlockHeader::parse(&FIRST_BLOCK);
        hdr.checksum = 0x00;
        assert_eq!(hdr.to_bytes(), FIRST_BLOCK);
        assert_eq!(hdr.sealed().checksum, 0xAC);
    }

    #[test]
    fn checksum_round_trip_over_random_headers() {
        let mut rng = StdRng::seed_from_u64(0x5C58);
        for _ in 0..500 {
            let mut raw = [0u8; HEADER_SIZE];
            rng.fill(&mut raw[..]);
            raw[CHECKSUM_OFFSET] = xor8::seal(&raw, CHECKSUM_OFFSET);

            let hdr = BlockHeader::decode(&raw, 0).unwrap();
            assert_eq!(hdr.to_bytes(), raw);
        }
    }

    #[test]
    fn any_single_bit_flip_is_rejected() {
        for byte in 0..HEADER_SIZE {
            for bit in 0..8 {
                let mut raw = FIRST_BLOCK;
                raw[byte] ^= 1 << bit;
                match BlockHeader::decode(&raw, 0x30) {
                    Err(LdrError::Checksum { offset, computed }) => {
                        assert_eq!(offset, 0x30);
                        assert_eq!(computed, 1 << bit);
                    }
                    other => panic!("flip {byte}:{bit} decoded as {other:?}"),
                }
            }
        }
    }

    #[test]
    fn end_address_does_not_wrap() {
        let hdr = BlockHeader::new(BlockFlags::empty(), 0xFFFF_FFF0, 0x20, 0);
        assert_eq!(hdr.end_address(), 0x1_0000_0010);
    }
}
