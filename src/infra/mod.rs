// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// File-system concerns used by the application layer:
//
//   tokenizer_store.rs — finds and loads tokenizer.json
//
//   window_writer.rs   — writes emitted items as JSON Lines
//
//   metrics.rs         — appends packing statistics to a CSV
//                        every N items (fill ratio, trainable
//                        fraction, restarts, skips)
//
//   manifest.rs        — run_config.json before a run and
//                        run_summary.json after it

/// Tokenizer loading
pub mod tokenizer_store;

/// JSONL output of emitted items
pub mod window_writer;

/// Packing metrics CSV logger
pub mod metrics;

/// Run config and summary persistence
pub mod manifest;
