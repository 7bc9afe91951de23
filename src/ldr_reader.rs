use std::io::{self, Read};

use tracing::warn;

use crate::error::{LdrError, Result};
use crate::header::BlockHeader;
use crate::ldr_format::HEADER_SIZE;

/// Sequential reader over a loader stream that tracks its byte offset.
pub struct Reader<R: Read> {
    src: R,
    offset: u64,
}

impl<R: Read> Reader<R> {
    pub fn new(src: R) -> Self {
        Self { src, offset: 0 }
    }

    /// Offset of the next unread byte.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads and checksums the next header. Returns `None` at end of input.
    pub fn read_header(&mut self) -> Result<Option<BlockHeader>> {
        let start = self.offset;
        let mut raw = [0u8; HEADER_SIZE];
        let n = self.read_full(&mut raw)?;
        if n == 0 {
            return Ok(None);
        }
        if n < HEADER_SIZE {
            warn!("ignoring {} trailing bytes @ 0x{:02x}", n, start);
            return Ok(None);
        }
        BlockHeader::decode(&raw, start).map(Some)
    }

    /// Reads the next `len` payload bytes.
    ///
    /// The buffer only grows as bytes arrive, so a header claiming more than
    /// the input holds fails with `Truncated` without allocating its count.
    pub fn read_payload(&mut self, len: u32) -> Result<Vec<u8>> {
        let start = self.offset;
        let mut buf = Vec::new();
        let n = (&mut self.src).take(len as u64).read_to_end(&mut buf)?;
        self.offset += n as u64;
        if n < len as usize {
            return Err(LdrError::Truncated {
                offset: start,
                expected: len as u64,
                actual: n as u64,
            });
        }
        Ok(buf)
    }

    /// Consumes `len` payload bytes without keeping them.
    pub fn skip_payload(&mut self, len: u64) -> Result<()> {
        let start = self.offset;
        let skipped = io::copy(&mut (&mut self.src).take(len), &mut io::sink())?;
        self.offset += skipped;
        if skipped < len {
            return Err(LdrError::Truncated {
                offset: start,
                expected: len,
                actual: skipped,
            });
        }
        Ok(())
    }

    // Like read_exact, but reports how much arrived before end of input.
    fn read_full(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.src.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        self.offset += filled as u64;
        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldr_format::BlockFlags;
    use std::io::Cursor;

    fn block(flags: BlockFlags, address: u32, payload: &[u8]) -> Vec<u8> {
        let hdr = BlockHeader::new(flags, address, payload.len() as u32, 0);
        let mut out = hdr.to_bytes().to_vec();
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn reads_headers_and_payloads_in_sequence() {
        let mut log = block(BlockFlags::empty(), 0x1000, b"abcd");
        log.extend(block(BlockFlags::IGNORE, 0x2000, b"skip me"));
        log.extend(block(BlockFlags::FINAL, 0, b""));

        let mut r = Reader::new(Cursor::new(log));

        let first = r.read_header().unwrap().unwrap();
        assert_eq!(first.target_address, 0x1000);
        assert_eq!(r.read_payload(first.byte_count).unwrap(), b"abcd");

        let ignored = r.read_header().unwrap().unwrap();
        assert_eq!(ignored.flags, BlockFlags::IGNORE);
        r.skip_payload(ignored.byte_count as u64).unwrap();

        let last = r.read_header().unwrap().unwrap();
        assert_eq!(last.flags, BlockFlags::FINAL);
        assert_eq!(r.offset(), 16 + 4 + 16 + 7 + 16);
        assert!(r.read_header().unwrap().is_none());
    }

    #[test]
    fn partial_header_ends_the_stream() {
        let mut log = block(BlockFlags::empty(), 0x1000, b"");
        log.extend_from_slice(&[0x01, 0x02, 0x03]);

        let mut r = Reader::new(Cursor::new(log));
        assert!(r.read_header().unwrap().is_some());
        assert!(r.read_header().unwrap().is_none());
    }

    #[test]
    fn checksum_error_reports_header_offset() {
        let mut log = block(BlockFlags::empty(), 0x1000, b"xy");
        let mut bad = block(BlockFlags::empty(), 0x1002, b"");
        bad[5] ^= 0x40;
        log.extend(bad);

        let mut r = Reader::new(Cursor::new(log));
        r.read_header().unwrap();
        r.skip_payload(2).unwrap();
        match r.read_header() {
            Err(LdrError::Checksum { offset, .. }) => assert_eq!(offset, 18),
            other => panic!("expected checksum failure, got {other:?}"),
        }
    }

    #[test]
    fn short_payload_is_truncation() {
        let mut log = BlockHeader::new(BlockFlags::empty(), 0x1000, 8, 0)
            .to_bytes()
            .to_vec();
        log.extend_from_slice(b"abc");

        let mut r = Reader::new(Cursor::new(log));
        r.read_header().unwrap();
        match r.read_payload(8) {
            Err(LdrError::Truncated {
                offset,
                expected,
                actual,
            }) => {
                assert_eq!((offset, expected, actual), (16, 8, 3));
            }
            other => panic!("expected truncation, got {other:?}"),
        }
    }

    #[test]
    fn oversized_byte_count_fails_on_what_is_there() {
        let mut log = BlockHeader::new(BlockFlags::empty(), 0, 0xFFFF_FFF0, 0)
            .to_bytes()
            .to_vec();
        log.extend_from_slice(&[0xEE; 3]);

        let mut r = Reader::new(Cursor::new(log));
        let hdr = r.read_header().unwrap().unwrap();
        match r.read_payload(hdr.byte_count) {
            Err(LdrError::Truncated { expected, actual, .. }) => {
                assert_eq!((expected, actual), (0xFFFF_FFF0, 3));
            }
            other => panic!("expected truncation, got {other:?}"),
        }
        assert_eq!(r.offset(), 19);
    }

    #[test]
    fn short_skip_is_truncation() {
        let log = BlockHeader::new(BlockFlags::IGNORE, 0, 32, 0).to_bytes().to_vec();
        let mut r = Reader::new(Cursor::new(log));
        r.read_header().unwrap();
        assert!(matches!(
            r.skip_payload(32),
            Err(LdrError::Truncated { actual: 0, .. })
        ));
    }
}
