// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// The entry point for all user interaction, parsed with clap.
// All work is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `pack`    — pack a conversation dataset into windows on disk
//   2. `inspect` — pull a few items and report packing statistics

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, InspectArgs, PackArgs};

#[derive(Parser, Debug)]
#[command(
    name = "chat-packer",
    version = "0.1.0",
    about = "Pack tokenized chat conversations into fixed-length training windows."
)]
pub struct Cli {
    /// The subcommand to run (pack or inspect)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Pack(args)    => run_pack(args),
            Commands::Inspect(args) => run_inspect(args),
        }
    }
}

fn run_pack(args: PackArgs) -> Result<()> {
    use crate::application::pack_use_case::PackUseCase;

    tracing::info!("Packing conversations from: {}", args.common.input.display());

    let use_case = PackUseCase::new(args.into());
    let stats = use_case.execute()?;

    println!(
        "Packed {} items from {} records ({} restarts). Output: {}",
        stats.items_emitted,
        stats.records_pulled,
        stats.restarts,
        use_case.items_path().display()
    );
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    use crate::application::inspect_use_case::InspectUseCase;

    let batch_size = args.batch_size;
    let report = InspectUseCase::new(args.into(), batch_size).execute()?;

    println!("\nItems inspected     : {}", report.items);
    println!("Window capacity     : {}", report.max_window_len);
    println!("Mean item length    : {:.1}", report.mean_item_len);
    println!("Longest item        : {}", report.longest_item);
    println!("Samples per window  : {:.2}", report.samples_per_window);
    println!("Fill ratio          : {:.2}%", report.fill_ratio * 100.0);
    println!("Trainable fraction  : {:.2}%", report.trainable_fraction * 100.0);
    println!("Restarts            : {}", report.restarts);
    println!("Skipped samples     : {}", report.skipped);
    if let Some([b, s]) = report.batch_shape {
        println!("First batch shape   : [{b}, {s}]");
    }
    Ok(())
}
