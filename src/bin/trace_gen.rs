//! Writes a synthetic swing trace for swing-replay.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use swing_tracker::swing::{write_trace, SyntheticSwing};

#[derive(Parser, Debug)]
#[command(about = "Generate a synthetic pose trace of one swing")]
struct CliArgs {
    /// Output path (JSON lines).
    #[clap(default_value = "swing_trace.jsonl")]
    output: PathBuf,

    /// Frame interval in milliseconds.
    #[clap(long)]
    interval_ms: Option<u64>,

    /// Number of resting frames before the backswing.
    #[clap(long)]
    rest_frames: Option<usize>,
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let mut swing = SyntheticSwing::default();
    if let Some(interval) = args.interval_ms {
        swing.frame_interval_ms = interval;
    }
    if let Some(rest) = args.rest_frames {
        swing.rest_frames = rest;
    }

    let frames = swing.frames();
    write_trace(&args.output, &frames)?;
    println!("Wrote {} frames to {}", frames.len(), args.output.display());
    Ok(())
}
