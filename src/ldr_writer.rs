use std::io::Write;

use tracing::info;

use crate::chunk_store::ChunkStore;
use crate::common::{flag_notes, ImageSettings};
use crate::error::{LdrError, Result};
use crate::header::BlockHeader;
use crate::ldr_format::{BlockFlags, HEADER_SIZE};
use crate::parser::ImageSink;

/// Serializes merged chunk sets back into loader blocks.
pub struct Writer<W: Write> {
    dest: W,
    bytes_written: u64,
}

impl<W: Write> Writer<W> {
    pub fn new(dest: W) -> Self {
        Self {
            dest,
            bytes_written: 0,
        }
    }

    /// Drains `store` as one application image: a sizing header, then every
    /// chunk in list order.
    pub fn write_image(&mut self, store: &mut ChunkStore, settings: &ImageSettings) -> Result<()> {
        info!(
            "--- write 0x{:02x} entry 0x{:x}",
            settings.signature, settings.entry_point
        );
        for chunk in store.iter() {
            info!(
                "0x{:x} 0x{:x}{}",
                chunk.address,
                chunk.length,
                flag_notes(chunk.flags, chunk.argument)
            );
        }

        // Nothing is written unless every field of the image fits.
        let image_size = sizing_argument(store.image_size())?;
        let lengths = store
            .iter()
            .map(|chunk| {
                u32::try_from(chunk.length).map_err(|_| LdrError::ChunkTooLarge {
                    address: chunk.address,
                    length: chunk.length,
                })
            })
            .collect::<Result<Vec<u32>>>()?;

        let sizing = settings.header(
            BlockFlags::IGNORE | BlockFlags::FIRST,
            settings.entry_point,
            0,
            image_size,
        );
        self.emit_header(&sizing)?;

        for (chunk, length) in store.take().into_iter().zip(lengths) {
            let hdr = settings.header(chunk.flags, chunk.address, length, chunk.argument);
            self.emit_header(&hdr)?;
            if let Some(data) = chunk.data {
                self.dest.write_all(&data)?;
                self.bytes_written += data.len() as u64;
            }
        }

        Ok(())
    }

    /// Writes the closing Final block.
    pub fn write_final(&mut self, trailer: &BlockHeader) -> Result<()> {
        self.emit_header(trailer)?;
        self.dest.flush()?;
        Ok(())
    }

    fn emit_header(&mut self, hdr: &BlockHeader) -> Result<()> {
        hdr.write(&mut self.dest)?;
        self.bytes_written += HEADER_SIZE as u64;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn into_inner(self) -> W {
        self.dest
    }
}

/// The sizing header's argument is a 32-bit field.
fn sizing_argument(image_size: u64) -> Result<u32> {
    u32::try_from(image_size).map_err(|_| LdrError::ImageTooLarge { size: image_size })
}

impl<W: Write> ImageSink for Writer<W> {
    fn write_image(&mut self, store: &mut ChunkStore, settings: &ImageSettings) -> Result<()> {
        Writer::write_image(self, store, settings)
    }
}
