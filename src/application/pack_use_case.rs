// ============================================================
// Layer 2 — PackUseCase
// ============================================================
// Runs a packing job end to end:
//
//   Step 1: Validate the configuration
//   Step 2: Save run_config.json          (Layer 6 - infra)
//   Step 3: Load the tokenizer            (Layer 6 - infra)
//   Step 4: Open this rank's record shard (Layer 4 - data)
//   Step 5: Build the window emitter      (Layer 4 - data)
//   Step 6: Pull N items, write them as JSONL, log metrics
//   Step 7: Save run_summary.json         (Layer 6 - infra)
//
// The emitter itself is infinite; num_items decides where
// this job stops.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::{
    chat_tokenizer::{ChatTemplate, ChatTokenizer},
    emitter::{EmitterConfig, EmitterStats, OverLengthPolicy, WindowEmitter},
    label_policy::LabelPolicy,
    position_policy::PositionPolicy,
    source::{JsonlRecordSource, ShardConfig},
    verifier::TemplateVerifier,
};
use crate::domain::error::PackingError;
use crate::infra::{
    manifest::ManifestStore,
    metrics::{MetricsLogger, PackingMetrics},
    tokenizer_store::TokenizerStore,
    window_writer::WindowWriter,
};

// ─── Pack Configuration ──────────────────────────────────────────────────────
// Every option of a packing run. Serialisable so the run can
// be recorded next to its output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackConfig {
    pub input:                     PathBuf,
    pub tokenizer:                 PathBuf,
    pub output_dir:                PathBuf,
    pub conversation_column:       String,
    pub sequence_length:           usize,
    pub train_on_completions_only: bool,
    pub remove_cross_attention:    bool,
    pub pack_samples:              bool,
    pub sp_ranks_size:             usize,
    pub dp_rank:                   usize,
    pub dp_ranks_size:             usize,
    pub seed:                      u64,
    pub over_length:               OverLengthPolicy,
    pub pad_token:                 Option<String>,
    pub verify:                    bool,
    pub num_items:                 u64,
    pub log_every:                 u64,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            input:                     PathBuf::from("data/conversations.jsonl"),
            tokenizer:                 PathBuf::from("tokenizer.json"),
            output_dir:                PathBuf::from("packed"),
            conversation_column:       "conversations".to_string(),
            sequence_length:           2048,
            train_on_completions_only: true,
            remove_cross_attention:    true,
            pack_samples:              true,
            sp_ranks_size:             1,
            dp_rank:                   0,
            dp_ranks_size:             1,
            seed:                      1234,
            over_length:               OverLengthPolicy::Skip,
            pad_token:                 None,
            verify:                    false,
            num_items:                 1000,
            log_every:                 100,
        }
    }
}

impl PackConfig {
    pub fn emitter_config(&self) -> EmitterConfig {
        EmitterConfig {
            sequence_length:     self.sequence_length,
            labels:              LabelPolicy::from_flag(self.train_on_completions_only),
            positions:           PositionPolicy::from_flag(self.remove_cross_attention),
            pack_samples:        self.pack_samples,
            sp_ranks_size:       self.sp_ranks_size,
            conversation_column: self.conversation_column.clone(),
            over_length:         self.over_length,
        }
    }

    pub fn shard_config(&self) -> ShardConfig {
        ShardConfig {
            dp_rank:       self.dp_rank,
            dp_ranks_size: self.dp_ranks_size,
            seed:          self.seed,
        }
    }

    pub fn validate(&self) -> Result<(), PackingError> {
        self.emitter_config().validate()?;
        self.shard_config().validate()?;
        if self.log_every == 0 {
            return Err(PackingError::InvalidConfig("log_every must be at least 1".into()));
        }
        Ok(())
    }
}

pub type ChatEmitter = WindowEmitter<JsonlRecordSource, ChatTokenizer>;

/// Wire tokenizer, shard and emitter together from a config.
pub fn build_emitter(cfg: &PackConfig) -> Result<ChatEmitter> {
    cfg.validate()?;

    let tokenizer = TokenizerStore::new(&cfg.tokenizer).load()?;
    let verifier_tokenizer = cfg.verify.then(|| tokenizer.clone());

    let chat = ChatTokenizer::new(tokenizer, ChatTemplate::default(), cfg.pad_token.as_deref())?;
    let source = JsonlRecordSource::open(&cfg.input, cfg.shard_config())?;

    let mut emitter = WindowEmitter::new(source, chat, cfg.emitter_config())?;
    if let Some(tok) = verifier_tokenizer {
        emitter = emitter.with_verifier(Box::new(TemplateVerifier::new(tok, ChatTemplate::default())));
    }
    Ok(emitter)
}

// ─── PackUseCase ──────────────────────────────────────────────────────────────
pub struct PackUseCase {
    config: PackConfig,
}

impl PackUseCase {
    pub fn new(config: PackConfig) -> Self {
        Self { config }
    }

    pub fn items_path(&self) -> PathBuf {
        items_path(&self.config.output_dir)
    }

    /// Execute the packing job and return the final statistics.
    pub fn execute(&self) -> Result<EmitterStats> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Record the run before doing any work ─────────────────────────────
        let manifest = ManifestStore::new(&cfg.output_dir)?;
        manifest.save_config(cfg)?;

        let mut emitter = build_emitter(cfg)?;
        let max_window_len = emitter.config().max_window_len();

        let mut writer  = WindowWriter::create(self.items_path())?;
        let metrics     = MetricsLogger::create(&cfg.output_dir)?;

        tracing::info!("Packing {} items into '{}'", cfg.num_items, cfg.output_dir.display());

        // ── Main loop ─────────────────────────────────────────────────────────
        for n in 1..=cfg.num_items {
            let item = emitter
                .next_item()
                .with_context(|| format!("Packing failed after {} items", n - 1))?;
            writer.write(&item)?;

            if n % cfg.log_every == 0 {
                let m = PackingMetrics::from_stats(emitter.stats(), max_window_len);
                metrics.log(&m)?;
                tracing::info!(
                    "{} items, fill {:.1}%, trainable {:.1}%, {} restarts",
                    n,
                    m.fill_ratio * 100.0,
                    m.trainable_fraction * 100.0,
                    m.restarts
                );
            }
        }

        writer.finish()?;
        let stats = emitter.stats().clone();
        manifest.save_summary(&stats)?;

        if stats.skipped_over_length > 0 {
            tracing::warn!(
                "{} samples were longer than the {}-token window and were skipped",
                stats.skipped_over_length,
                max_window_len
            );
        }
        Ok(stats)
    }
}

pub fn items_path(output_dir: &Path) -> PathBuf {
    output_dir.join("items.jsonl")
}

// ─── Tests ────────────────────────────────────────────────────────────────────
#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::data::chat_tokenizer::fixtures;
    use crate::domain::window::TrainingItem;
    use serde_json::json;
    use std::io::Write;

    /// Writes a fixture tokenizer and `n` conversations into `dir`.
    pub fn workspace(dir: &Path, n: usize) -> PackConfig {
        let tokenizer = dir.join("tokenizer.json");
        std::fs::write(&tokenizer, fixtures::tokenizer_json()).unwrap();

        let input = dir.join("conversations.jsonl");
        let mut f = std::fs::File::create(&input).unwrap();
        for i in 0..n {
            let answer = if i % 2 == 0 { "a language" } else { "hello world hello" };
            let record = json!({
                "id": i,
                "conversations": [
                    { "from": "system", "value": "hi" },
                    { "from": "human", "value": "what is rust" },
                    { "from": "gpt", "value": answer },
                ]
            });
            writeln!(f, "{record}").unwrap();
        }

        PackConfig {
            input,
            tokenizer,
            output_dir: dir.join("out"),
            sequence_length: 48,
            num_items: 12,
            log_every: 5,
            ..PackConfig::default()
        }
    }

    #[test]
    fn test_pack_writes_items_metrics_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = workspace(dir.path(), 7);
        let use_case = PackUseCase::new(cfg.clone());

        let stats = use_case.execute().unwrap();
        assert_eq!(stats.items_emitted, 12);
        assert!(stats.restarts > 0);

        let text = std::fs::read_to_string(use_case.items_path()).unwrap();
        let items: Vec<TrainingItem> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(items.len(), 12);
        for item in &items {
            let w = item.as_packed().unwrap();
            assert!(w.len() <= cfg.sequence_length + 1);
            w.validate().unwrap();
        }

        let csv = std::fs::read_to_string(cfg.output_dir.join("metrics.csv")).unwrap();
        // header + rows at 5 and 10 items
        assert_eq!(csv.lines().count(), 3);

        let manifest = ManifestStore::new(&cfg.output_dir).unwrap();
        assert_eq!(manifest.load_config().unwrap(), cfg);
        assert_eq!(manifest.load_summary().unwrap(), stats);
    }

    #[test]
    fn test_rerun_into_same_directory_replaces_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = workspace(dir.path(), 7);
        let use_case = PackUseCase::new(cfg.clone());

        use_case.execute().unwrap();
        use_case.execute().unwrap();

        let items = std::fs::read_to_string(use_case.items_path()).unwrap();
        assert_eq!(items.lines().count(), 12);

        // one header and one row per 5 items of the second run only
        let csv = std::fs::read_to_string(cfg.output_dir.join("metrics.csv")).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("items,"));
        assert!(lines[1].starts_with("5,"));
        assert!(lines[2].starts_with("10,"));
    }

    #[test]
    fn test_pack_with_verification_and_no_packing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = PackConfig {
            pack_samples: false,
            sp_ranks_size: 2,
            verify: true,
            ..workspace(dir.path(), 3)
        };
        let use_case = PackUseCase::new(cfg);
        use_case.execute().unwrap();

        let text = std::fs::read_to_string(use_case.items_path()).unwrap();
        for line in text.lines() {
            let item: TrainingItem = serde_json::from_str(line).unwrap();
            let item = item.as_non_packed().unwrap();
            assert_eq!(item.len() % 4, 1);
        }
    }

    #[test]
    fn test_invalid_rank_rejected_before_any_output() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = PackConfig { dp_rank: 3, dp_ranks_size: 2, ..workspace(dir.path(), 3) };
        assert!(PackUseCase::new(cfg.clone()).execute().is_err());
        assert!(!cfg.output_dir.exists());
    }

    #[test]
    fn test_emitter_config_mapping() {
        let cfg = PackConfig {
            train_on_completions_only: false,
            remove_cross_attention: false,
            ..PackConfig::default()
        };
        let em = cfg.emitter_config();
        assert_eq!(em.labels, LabelPolicy::Full);
        assert_eq!(em.positions, PositionPolicy::Continuous);
        assert_eq!(em.max_window_len(), 2049);
    }
}
