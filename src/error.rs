use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LdrError {
    #[error("checksum failed @ 0x{offset:02x} (header XORs to 0x{computed:02x})")]
    Checksum { offset: u64, computed: u8 },

    #[error("block @ 0x{offset:x} needs {expected} payload bytes but only {actual} remain")]
    Truncated {
        offset: u64,
        expected: u64,
        actual: u64,
    },

    #[error("block at address 0x{address:x} with 0x{byte_count:x} bytes runs past the 32-bit address space")]
    AddressOverflow { address: u32, byte_count: u32 },

    #[error("image of 0x{size:x} bytes does not fit the 32-bit sizing header")]
    ImageTooLarge { size: u64 },

    #[error("chunk at address 0x{address:x} spans 0x{length:x} bytes, more than one block can carry")]
    ChunkTooLarge { address: u32, length: u64 },

    #[error("unable to open {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LdrError>;
