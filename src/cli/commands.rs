// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `pack` and `inspect`, and their
// flags. Options that shape the windows live in CommonArgs and
// are shared by both, so an inspect run is configured exactly
// like the pack run it previews.
//
// Boolean options that default to on take an explicit value:
//
//   --pack-samples false
//   --train-on-completions-only false

use clap::{ArgAction, Args, Subcommand};
use std::path::PathBuf;

use crate::application::pack_use_case::PackConfig;
use crate::data::emitter::OverLengthPolicy;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pack a JSONL conversation dataset into training windows
    Pack(PackArgs),

    /// Pull a few items and report packing statistics without writing
    Inspect(InspectArgs),
}

/// Dataset, tokenizer and window options shared by every command.
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// JSONL file with one conversation record per line
    #[arg(long)]
    pub input: PathBuf,

    /// tokenizer.json, or a directory containing one
    #[arg(long)]
    pub tokenizer: PathBuf,

    /// Record field holding the list of messages
    #[arg(long, default_value = "conversations")]
    pub conversation_column: String,

    /// Training sequence length; packed windows hold up to one token more
    #[arg(long, default_value_t = 2048)]
    pub sequence_length: usize,

    /// Only completion-role tokens contribute to the loss
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub train_on_completions_only: bool,

    /// Restart position ids at each sample boundary inside a window
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub remove_cross_attention: bool,

    /// Pack several samples per window; when false each sample is padded alone
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub pack_samples: bool,

    /// Sequence-parallel group size, sets the alignment of unpacked samples
    #[arg(long, default_value_t = 1)]
    pub sp_ranks_size: usize,

    /// This worker's data-parallel rank
    #[arg(long, default_value_t = 0)]
    pub dp_rank: usize,

    /// Number of data-parallel ranks the dataset is sharded over
    #[arg(long, default_value_t = 1)]
    pub dp_ranks_size: usize,

    /// Seed for the shard shuffle
    #[arg(long, default_value_t = 1234)]
    pub seed: u64,

    /// What to do with a sample longer than the window: skip or fail
    #[arg(long, default_value = "skip")]
    pub over_length: OverLengthPolicy,

    /// Override the padding token (defaults to <|finetune_right_pad_id|>, then eos)
    #[arg(long)]
    pub pad_token: Option<String>,

    /// Re-encode each rendered conversation and compare against the piecewise encoding
    #[arg(long)]
    pub verify: bool,
}

#[derive(Args, Debug)]
pub struct PackArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Directory for items.jsonl, metrics.csv and the run manifest
    #[arg(long, default_value = "packed")]
    pub output: PathBuf,

    /// Number of items to emit
    #[arg(long, default_value_t = 1000)]
    pub num_items: u64,

    /// Append a metrics row every N items
    #[arg(long, default_value_t = 100)]
    pub log_every: u64,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Number of items to pull
    #[arg(long, default_value_t = 64)]
    pub num_items: u64,

    /// Windows stacked into the sample batch
    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,
}

/// The application layer never sees clap types.
impl From<CommonArgs> for PackConfig {
    fn from(a: CommonArgs) -> Self {
        PackConfig {
            input:                     a.input,
            tokenizer:                 a.tokenizer,
            conversation_column:       a.conversation_column,
            sequence_length:           a.sequence_length,
            train_on_completions_only: a.train_on_completions_only,
            remove_cross_attention:    a.remove_cross_attention,
            pack_samples:              a.pack_samples,
            sp_ranks_size:             a.sp_ranks_size,
            dp_rank:                   a.dp_rank,
            dp_ranks_size:             a.dp_ranks_size,
            seed:                      a.seed,
            over_length:               a.over_length,
            pad_token:                 a.pad_token,
            verify:                    a.verify,
            ..PackConfig::default()
        }
    }
}

impl From<PackArgs> for PackConfig {
    fn from(a: PackArgs) -> Self {
        PackConfig {
            output_dir: a.output,
            num_items:  a.num_items,
            log_every:  a.log_every,
            ..a.common.into()
        }
    }
}

impl From<InspectArgs> for PackConfig {
    fn from(a: InspectArgs) -> Self {
        PackConfig {
            num_items: a.num_items,
            ..a.common.into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_pack_defaults() {
        let cli = parse(&["chat-packer", "pack", "--input", "d.jsonl", "--tokenizer", "tok"]);
        let Commands::Pack(args) = cli.command else { panic!("expected pack") };
        let cfg: PackConfig = args.into();

        assert_eq!(cfg.sequence_length, 2048);
        assert!(cfg.pack_samples);
        assert!(cfg.train_on_completions_only);
        assert_eq!(cfg.over_length, OverLengthPolicy::Skip);
        assert_eq!(cfg.output_dir, PathBuf::from("packed"));
        assert_eq!(cfg.input, PathBuf::from("d.jsonl"));
    }

    #[test]
    fn test_explicit_flags() {
        let cli = parse(&[
            "chat-packer", "inspect",
            "--input", "d.jsonl", "--tokenizer", "tok",
            "--pack-samples", "false",
            "--sp-ranks-size", "2",
            "--dp-rank", "1", "--dp-ranks-size", "4",
            "--over-length", "fail",
            "--num-items", "5",
        ]);
        let Commands::Inspect(args) = cli.command else { panic!("expected inspect") };
        assert_eq!(args.batch_size, 8);
        let cfg: PackConfig = args.into();

        assert!(!cfg.pack_samples);
        assert_eq!(cfg.sp_ranks_size, 2);
        assert_eq!((cfg.dp_rank, cfg.dp_ranks_size), (1, 4));
        assert_eq!(cfg.over_length, OverLengthPolicy::Fail);
        assert_eq!(cfg.num_items, 5);
    }

    #[test]
    fn test_bad_over_length_rejected() {
        let result = Cli::try_parse_from([
            "chat-packer", "pack", "--input", "d", "--tokenizer", "t", "--over-length", "truncate",
        ]);
        assert!(result.is_err());
    }
}
