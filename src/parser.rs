use std::io::Read;

use tracing::{debug, info, warn};

use crate::chunk_store::ChunkStore;
use crate::common::{flag_notes, ImageSettings, ShrinkStats};
use crate::config::ShrinkConfig;
use crate::error::{LdrError, Result};
use crate::header::BlockHeader;
use crate::ldr_format::BlockFlags;
use crate::ldr_reader::Reader;

/// One past the last byte a block may load.
const ADDRESS_SPACE_END: u64 = 1 << 32;

/// Receives each completed application image. Must leave `store` empty.
pub trait ImageSink {
    fn write_image(&mut self, store: &mut ChunkStore, settings: &ImageSettings) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParserState {
    AwaitingFirst,
    Streaming,
    Done,
}

/// Single pass over a loader stream, merging blocks into chunks and handing
/// finished images to an [`ImageSink`].
pub struct StreamParser<R: Read> {
    reader: Reader<R>,
    config: ShrinkConfig,
    store: ChunkStore,
    settings: Option<ImageSettings>,
    final_block: Option<BlockHeader>,
    state: ParserState,
    stats: ShrinkStats,
}

impl<R: Read> StreamParser<R> {
    pub fn new(src: R, config: ShrinkConfig) -> Self {
        Self {
            reader: Reader::new(src),
            config,
            store: ChunkStore::new(),
            settings: None,
            final_block: None,
            state: ParserState::AwaitingFirst,
            stats: ShrinkStats::default(),
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn settings(&self) -> Option<&ImageSettings> {
        self.settings.as_ref()
    }

    pub fn stats(&self) -> ShrinkStats {
        self.stats
    }

    /// Consumes blocks until the Final block or end of input.
    pub fn run<S: ImageSink>(&mut self, sink: &mut S) -> Result<ShrinkStats> {
        while self.state != ParserState::Done {
            self.step(sink)?;
        }
        Ok(self.stats)
    }

    /// Processes one block.
    pub fn step<S: ImageSink>(&mut self, sink: &mut S) -> Result<ParserState> {
        if self.state == ParserState::Done {
            return Ok(self.state);
        }

        let header = match self.reader.read_header()? {
            Some(header) => header,
            None => {
                if !self.store.is_empty() {
                    warn!(
                        "stream ended without a Final block; flushing {} pending chunks",
                        self.store.len()
                    );
                }
                self.flush(sink)?;
                return Ok(self.finish());
            }
        };

        if header.flags.intersects(BlockFlags::FIRST | BlockFlags::FINAL) {
            self.flush(sink)?;
        } else {
            info!(
                "0x{:x} 0x{:x}{}",
                header.target_address,
                header.byte_count,
                flag_notes(header.flags, header.argument)
            );
        }

        if header.flags.contains(BlockFlags::FINAL) {
            self.final_block = Some(header);
            return Ok(self.finish());
        }

        if header.flags.contains(BlockFlags::FIRST) {
            info!(
                "--- read 0x{:02x} entry 0x{:x}",
                header.signature, header.target_address
            );
            self.settings = Some(ImageSettings::from_first_block(&header));
            self.state = ParserState::Streaming;
            return Ok(self.state);
        }

        self.stats.blocks_read += 1;

        if header.flags.contains(BlockFlags::IGNORE) {
            self.reader.skip_payload(header.byte_count as u64)?;
            return Ok(self.state);
        }

        self.merge_block(&header)?;

        if header.flags.contains(BlockFlags::INIT) {
            self.flush(sink)?;
        }
        Ok(self.state)
    }

    fn merge_block(&mut self, header: &BlockHeader) -> Result<()> {
        if header.end_address() > ADDRESS_SPACE_END {
            return Err(LdrError::AddressOverflow {
                address: header.target_address,
                byte_count: header.byte_count,
            });
        }

        // Literal payloads are in hand before any chunk grows to hold them.
        let payload = if header.is_fill() {
            None
        } else {
            Some(self.reader.read_payload(header.byte_count)?)
        };

        let (index, created) = self.store.find_or_insert(header, &self.config);
        let chunk = &mut self.store[index];
        if created {
            self.stats.blocks_written += 1;
            debug!("new chunk #{} @ 0x{:x}", index, chunk.address);
        } else {
            debug!("0x{:x} joins chunk #{} @ 0x{:x}", header.target_address, index, chunk.address);
        }

        let at = chunk.place(header.target_address, header.byte_count);
        match payload {
            Some(payload) => chunk.write_payload(at, &payload),
            None => chunk.unroll_fill(at, header.byte_count, header.argument),
        }

        if at.overlap > 0 {
            self.stats.overwrites += 1;
            warn!(
                "memory overwrite in region 0x{:x} to 0x{:x}",
                header.target_address,
                header.end_address()
            );
        }
        Ok(())
    }

    fn flush<S: ImageSink>(&mut self, sink: &mut S) -> Result<()> {
        if self.store.is_empty() {
            return Ok(());
        }
        let settings = self.settings.unwrap_or_else(|| {
            warn!("no First block precedes this image; writing zeroed loader identity");
            ImageSettings::default()
        });
        sink.write_image(&mut self.store, &settings)?;
        self.stats.images_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> ParserState {
        self.stats.bytes_read = self.reader.offset();
        self.state = ParserState::Done;
        self.state
    }

    /// The Final block that closes the rewritten stream.
    ///
    /// Targets the last entry point seen and keeps the loader identity of the
    /// input's own Final block when there was one.
    pub fn trailer(&self) -> BlockHeader {
        let settings = self.settings.unwrap_or_default();
        let mut hdr = settings.header(BlockFlags::FINAL, settings.entry_point, 0, 0);
        if let Some(final_block) = self.final_block {
            hdr.bcode = final_block.bcode;
            hdr.signature = final_block.signature;
        }
        hdr
    }
}
