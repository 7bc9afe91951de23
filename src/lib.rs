pub mod checksum;
pub mod chunk_store;
pub mod common;
pub mod config;
pub mod error;
pub mod header;
pub mod ldr_format;
pub mod ldr_reader;
pub mod ldr_writer;
pub mod parser;
pub mod shrinker;

pub use common::{ImageSettings, ShrinkStats};
pub use config::ShrinkConfig;
pub use error::LdrError;
pub use header::BlockHeader;
pub use ldr_format::BlockFlags;
pub use shrinker::{shrink, shrink_file};
