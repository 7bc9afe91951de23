pub mod xor8 {
    // The Boot ROM's header checksum: XOR of every header byte.
    // A header is valid when the XOR over all 16 bytes, checksum included, is zero.

    #[inline]
    pub fn value(data: &[u8]) -> u8 {
        extend(0, data)
    }

    // Extend a prior checksum with more bytes (i.e., xor(data0 || data1)).
    #[inline]
    pub fn extend(initial: u8, data: &[u8]) -> u8 {
        data.iter().fold(initial, |acc, &b| acc ^ b)
    }

    /// Checksum to store in `slot` so that the whole buffer XORs to zero.
    #[inline]
    pub fn seal(data: &[u8], slot: usize) -> u8 {
        value(data) ^ data[slot]
    }

    #[inline]
    pub fn verify(data: &[u8]) -> bool {
        value(data) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::xor8;

    #[test]
    fn empty_is_zero() {
        assert_eq!(xor8::value(&[]), 0);
    }

    #[test]
    fn extend_matches_concatenation() {
        let a = [0x12, 0x34, 0x56];
        let b = [0xAB, 0xCD];
        let whole = [0x12, 0x34, 0x56, 0xAB, 0xCD];
        assert_eq!(xor8::extend(xor8::value(&a), &b), xor8::value(&whole));
    }

    #[test]
    fn sealed_buffer_verifies() {
        let mut buf = [0x01, 0x40, 0x77, 0xAD, 0x00, 0x10, 0x00, 0x00];
        buf[2] = xor8::seal(&buf, 2);
        assert!(xor8::verify(&buf));
        buf[5] ^= 0x01;
        assert!(!xor8::verify(&buf));
    }
}
