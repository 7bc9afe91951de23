// +------------------+
// |  input .ldr      |  First | data | data | Fill | data+INIT | ... | Final
// +--------+---------+
//          |
//          | StreamParser: checksum, classify, merge
//          v
// +------------------+
// |   ChunkStore     |  contiguous ranges, small Fills unrolled
// +--------+---------+
//          |
//          | flush on First / INIT / Final
//          v
// +------------------+
// |  output .ldr     |  First(size) | chunk | chunk | ... | Final
// +------------------+

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::info;

use crate::common::ShrinkStats;
use crate::config::ShrinkConfig;
use crate::error::{LdrError, Result};
use crate::ldr_writer::Writer;
use crate::parser::StreamParser;

/// Rewrites the loader stream in `input` into `output` with fewer blocks.
///
/// On error, images flushed before the failure have already been written.
pub fn shrink<R: Read, W: Write>(input: R, output: W, config: ShrinkConfig) -> Result<ShrinkStats> {
    let mut parser = StreamParser::new(input, config);
    let mut writer = Writer::new(output);

    let mut stats = parser.run(&mut writer)?;
    writer.write_final(&parser.trailer())?;
    stats.bytes_written = writer.bytes_written();

    info!("---");
    info!(
        "{} blocks read; {} blocks written",
        stats.blocks_read, stats.blocks_written
    );
    Ok(stats)
}

/// File-to-file form of [`shrink`].
pub fn shrink_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    config: ShrinkConfig,
) -> Result<ShrinkStats> {
    let input = input.as_ref();
    let output = output.as_ref();
    let src = File::open(input).map_err(|source| LdrError::Open {
        path: input.to_path_buf(),
        source,
    })?;
    let dest = File::create(output).map_err(|source| LdrError::Open {
        path: output.to_path_buf(),
        source,
    })?;
    shrink(BufReader::new(src), BufWriter::new(dest), config)
}
