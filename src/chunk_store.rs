use std::ops::{Index, IndexMut};

use crate::config::ShrinkConfig;
use crate::header::BlockHeader;
use crate::ldr_format::{BlockFlags, FILL_WORD_SIZE, HEADER_SIZE};

/// One merged output range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub address: u32,
    pub argument: u32,
    pub flags: BlockFlags,
    /// Bytes covered. A chunk may end exactly at the top of the 32-bit space.
    pub length: u64,
    /// Literal contents. `None` for a Fill chunk that is written header-only.
    pub data: Option<Vec<u8>>,
}

/// Where an incoming block's range lands inside a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Byte offset of the block's target address from the chunk start.
    pub offset: usize,
    /// Bytes the chunk grew by.
    pub overhang: u32,
    /// Bytes of the block's range the chunk already covered.
    pub overlap: u32,
}

impl Chunk {
    fn from_header(header: &BlockHeader, unroll: bool) -> Self {
        let (flags, data) = if !header.is_fill() {
            (header.flags, Some(Vec::new()))
        } else if unroll {
            (header.flags - BlockFlags::FILL, Some(Vec::new()))
        } else {
            (header.flags, None)
        };
        Self {
            address: header.target_address,
            argument: header.argument,
            flags,
            length: 0,
            data,
        }
    }

    pub fn is_fill(&self) -> bool {
        self.flags.contains(BlockFlags::FILL)
    }

    pub fn is_materialized(&self) -> bool {
        self.data.is_some()
    }

    pub fn end(&self) -> u64 {
        self.address as u64 + self.length
    }

    /// True when a block starting at `target` continues or overwrites this chunk.
    /// Fill chunks never take more data.
    pub fn accepts(&self, target: u32) -> bool {
        !self.is_fill() && target >= self.address && target as u64 <= self.end()
    }

    /// Claims `[target, target + byte_count)` for this chunk, growing it as needed.
    ///
    /// `target` must lie inside `[address, address + length]`.
    pub fn place(&mut self, target: u32, byte_count: u32) -> Placement {
        debug_assert!(target >= self.address && target as u64 <= self.end());
        let offset = target - self.address;
        let end = offset as u64 + byte_count as u64;
        let overhang = end.saturating_sub(self.length) as u32;

        self.length += overhang as u64;
        if let Some(data) = self.data.as_mut() {
            data.resize(self.length as usize, 0);
        }

        Placement {
            offset: offset as usize,
            overhang,
            overlap: byte_count - overhang,
        }
    }

    /// Writes the 32-bit fill word over a placed range, whole words only.
    /// A trailing remainder under four bytes is left as it was.
    pub fn unroll_fill(&mut self, at: Placement, byte_count: u32, word: u32) {
        let Some(data) = self.data.as_mut() else {
            return;
        };
        let pattern = word.to_le_bytes();
        let words = byte_count as usize / FILL_WORD_SIZE;
        for slot in data[at.offset..]
            .chunks_exact_mut(FILL_WORD_SIZE)
            .take(words)
        {
            slot.copy_from_slice(&pattern);
        }
    }

    /// Copies a literal payload over a placed range. Later bytes win.
    ///
    /// Only non-Fill chunks take payloads, and those always hold data.
    pub fn write_payload(&mut self, at: Placement, payload: &[u8]) {
        debug_assert!(self.is_materialized(), "payload for header-only chunk @ 0x{:x}", self.address);
        if let Some(data) = self.data.as_mut() {
            data[at.offset..at.offset + payload.len()].copy_from_slice(payload);
        }
    }

    /// Bytes this chunk occupies in the output stream.
    pub fn encoded_size(&self) -> u64 {
        HEADER_SIZE as u64 + self.data.as_ref().map_or(0, |data| data.len() as u64)
    }
}

/// Chunks in discovery order.
#[derive(Debug, Default)]
pub struct ChunkStore {
    chunks: Vec<Chunk>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self { chunks: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chunk> {
        self.chunks.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    /// Finds the chunk `header` merges into, or appends a new one.
    /// Returns the chunk index and whether it was created.
    ///
    /// Only plain data blocks and small Fill-only blocks may merge; anything
    /// carrying another flag, or a Fill too large to unroll, always starts a
    /// new chunk at the end of the list.
    pub fn find_or_insert(&mut self, header: &BlockHeader, config: &ShrinkConfig) -> (usize, bool) {
        let fill_only = header.flags.is_fill_only();
        let unroll = fill_only && config.unrolls(header.byte_count);
        let mergeable = header.flags.is_empty() || unroll;

        if mergeable {
            if let Some(index) = self
                .chunks
                .iter()
                .position(|chunk| chunk.accepts(header.target_address))
            {
                return (index, false);
            }
        }

        self.chunks.push(Chunk::from_header(header, unroll));
        (self.chunks.len() - 1, true)
    }

    /// Size of the image this store serializes to, including the leading
    /// sizing header.
    pub fn image_size(&self) -> u64 {
        HEADER_SIZE as u64 + self.chunks.iter().map(Chunk::encoded_size).sum::<u64>()
    }

    /// Hands over every chunk, leaving the store empty.
    pub fn take(&mut self) -> Vec<Chunk> {
        std::mem::take(&mut self.chunks)
    }
}

impl Index<usize> for ChunkStore {
    type Output = Chunk;

    fn index(&self, index: usize) -> &Chunk {
        &self.chunks[index]
    }
}

impl IndexMut<usize> for ChunkStore {
    fn index_mut(&mut self, index: usize) -> &mut Chunk {
        &mut self.chunks[index]
    }
}
