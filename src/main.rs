use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use ldrshrink::{shrink_file, ShrinkConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ldrshrink")]
#[command(about = "Simplify an ADSP-SC58x/BF70x loader file so it boots faster", long_about = None)]
struct Cli {
    /// Loader stream to read
    #[arg(value_name = "INPUT_LDR")]
    input: PathBuf,

    /// Where to write the simplified loader stream
    #[arg(value_name = "OUTPUT_LDR")]
    output: PathBuf,

    /// Largest Fill block, in bytes, that is unrolled into literal data
    #[arg(long, value_name = "BYTES", default_value_t = ShrinkConfig::default().fill_unroll_threshold)]
    fill_threshold: u32,

    /// Log every merge decision
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let config = ShrinkConfig::default().with_fill_unroll_threshold(cli.fill_threshold);
    shrink_file(&cli.input, &cli.output, config).with_context(|| {
        format!(
            "failed to simplify {} into {}",
            cli.input.display(),
            cli.output.display()
        )
    })?;
    Ok(())
}
