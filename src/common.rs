use crate::header::BlockHeader;
use crate::ldr_format::BlockFlags;

/// Per-application context captured from the most recent First block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImageSettings {
    pub signature: u8,
    pub bcode: u8,
    pub entry_point: u32,
}

impl ImageSettings {
    pub fn from_first_block(header: &BlockHeader) -> Self {
        Self {
            signature: header.signature,
            bcode: header.bcode,
            entry_point: header.target_address,
        }
    }

    /// A header stamped with this application's loader identity.
    pub fn header(
        &self,
        flags: BlockFlags,
        target_address: u32,
        byte_count: u32,
        argument: u32,
    ) -> BlockHeader {
        BlockHeader {
            bcode: self.bcode,
            signature: self.signature,
            ..BlockHeader::new(flags, target_address, byte_count, argument)
        }
    }
}

/// Counters reported at the end of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShrinkStats {
    /// Blocks read, not counting First and Final blocks.
    pub blocks_read: u64,
    /// Chunks created, not counting synthetic headers.
    pub blocks_written: u64,
    pub images_written: u64,
    pub overwrites: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

/// Diagnostic suffix naming the flags the Boot ROM acts on.
pub fn flag_notes(flags: BlockFlags, argument: u32) -> String {
    let mut notes = String::new();
    if flags.contains(BlockFlags::FILL) {
        notes.push_str(&format!(" FILL (0x{:x})", argument));
    }
    if flags.contains(BlockFlags::INIT) {
        notes.push_str(" INIT");
    }
    notes
}
