// ============================================================
// Layer 2 — InspectUseCase
// ============================================================
// Pulls a handful of items from the emitter without writing
// anything, so a packing configuration can be checked before a
// long run:
//
//   - how full the windows are
//   - how much of each window contributes to the loss
//   - how often the shard was re-looped
//
// When packing is on, the first `batch_size` windows are also
// stacked through WindowBatcher to show the tensor shape a
// training loop would receive.

use anyhow::Result;
use burn::{
    backend::NdArray,
    data::dataloader::batcher::Batcher,
};

use crate::application::pack_use_case::{build_emitter, PackConfig};
use crate::data::{batcher::WindowBatcher, emitter::EmitterStats};
use crate::domain::{traits::ConversationTokenizer, window::PackedWindow};

type InspectBackend = NdArray;

#[derive(Debug, Clone, PartialEq)]
pub struct InspectReport {
    pub items:              u64,
    pub max_window_len:     usize,
    pub mean_item_len:      f64,
    pub longest_item:       usize,
    pub samples_per_window: f64,
    pub fill_ratio:         f64,
    pub trainable_fraction: f64,
    pub restarts:           u64,
    pub skipped:            u64,
    /// [batch, seq] of the first batch, packed mode only
    pub batch_shape:        Option<[usize; 2]>,
    pub stats:              EmitterStats,
}

pub struct InspectUseCase {
    config:     PackConfig,
    batch_size: usize,
}

impl InspectUseCase {
    pub fn new(config: PackConfig, batch_size: usize) -> Self {
        Self { config, batch_size }
    }

    pub fn execute(&self) -> Result<InspectReport> {
        let mut emitter = build_emitter(&self.config)?;
        let max_window_len = emitter.config().max_window_len();
        let pad_token_id = emitter.tokenizer().pad_token_id();

        let mut lengths = Vec::new();
        let mut packed: Vec<PackedWindow> = Vec::new();
        let mut windows = 0usize;
        let mut samples = 0usize;

        for _ in 0..self.config.num_items {
            let item = emitter.next_item()?;
            lengths.push(item.len());
            if let Some(w) = item.as_packed() {
                windows += 1;
                samples += w.sample_lengths.len();
                if packed.len() < self.batch_size {
                    packed.push(w.clone());
                }
            }
        }

        let batch_shape = if packed.is_empty() {
            None
        } else {
            let batcher = WindowBatcher::<InspectBackend>::new(Default::default(), pad_token_id);
            Some(batcher.batch(packed).input_ids.dims())
        };

        let stats = emitter.stats().clone();
        let report = InspectReport {
            items:              stats.items_emitted,
            max_window_len,
            mean_item_len:      mean(&lengths),
            longest_item:       lengths.iter().copied().max().unwrap_or(0),
            samples_per_window: if windows == 0 { 0.0 } else { samples as f64 / windows as f64 },
            fill_ratio:         stats.fill_ratio(max_window_len),
            trainable_fraction: stats.trainable_fraction(),
            restarts:           stats.restarts,
            skipped:            stats.skipped_over_length + stats.skipped_empty,
            batch_shape,
            stats,
        };

        tracing::info!(
            "Inspected {} items: mean length {:.1}/{}, fill {:.1}%, trainable {:.1}%, {} restarts",
            report.items,
            report.mean_item_len,
            report.max_window_len,
            report.fill_ratio * 100.0,
            report.trainable_fraction * 100.0,
            report.restarts
        );
        Ok(report)
    }
}

fn mean(values: &[usize]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<usize>() as f64 / values.len() as f64
}

// ─── Tests ────────────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pack_use_case::tests::workspace;

    #[test]
    fn test_inspect_reports_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = workspace(dir.path(), 5);

        let report = InspectUseCase::new(cfg.clone(), 4).execute().unwrap();
        assert_eq!(report.items, 12);
        assert_eq!(report.max_window_len, 49);
        assert!(report.longest_item <= 49);
        assert!(report.fill_ratio > 0.5 && report.fill_ratio <= 1.0);
        assert!(report.trainable_fraction > 0.0 && report.trainable_fraction < 1.0);
        assert!(report.samples_per_window >= 1.0);
        assert!(report.restarts > 0);
        assert_eq!(report.batch_shape.map(|s| s[0]), Some(4));

        assert!(!cfg.output_dir.exists());
    }

    #[test]
    fn test_inspect_non_packed_has_no_batch() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = PackConfig { pack_samples: false, num_items: 3, ..workspace(dir.path(), 5) };

        let report = InspectUseCase::new(cfg, 4).execute().unwrap();
        assert_eq!(report.items, 3);
        assert_eq!(report.batch_shape, None);
        assert_eq!(report.samples_per_window, 0.0);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[2, 4]), 3.0);
    }
}
