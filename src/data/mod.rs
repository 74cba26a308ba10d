// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from a raw conversation record to a training
// window.
//
// The pipeline flows in this order:
//
//   JSONL records
//       │
//       ▼
//   JsonlRecordSource   → shards by rank, shuffles by seed, restarts
//       │
//       ▼
//   ChatTokenizer       → (tokens, is_completion) per conversation
//       │
//       ▼
//   WindowEmitter       → pulls, routes, restarts the source
//       │
//       ├──► PackingBuffer    → padding-free packed windows
//       │        + LabelPolicy, PositionPolicy
//       │
//       └──► AlignmentPadder  → one sample, padded for sequence parallelism
//                + LabelPolicy
//       │
//       ▼
//   WindowBatcher       → [batch, seq] tensors for the training loop
//
// Each module is responsible for exactly one step.

/// Which tokens contribute to the loss
pub mod label_policy;

/// Position ids from packed sample lengths
pub mod position_policy;

/// Padding-free packing of samples into windows
pub mod packing_buffer;

/// Sequence-parallel alignment padding for unpacked samples
pub mod alignment_padder;

/// Pull/route/restart orchestration
pub mod emitter;

/// Restartable record sources
pub mod source;

/// Llama-3 style conversation tokenizer
pub mod chat_tokenizer;

/// Diagnostic cross-check of tokenization against the rendered template
pub mod verifier;

/// Burn Batcher for packed windows
pub mod batcher;
