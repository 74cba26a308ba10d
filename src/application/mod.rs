// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each:
// packing a dataset to disk, or inspecting what packing would
// produce.
//
// Rules for this layer:
//   - No packing arithmetic here (that's Layer 4)
//   - No printing here (that's Layer 1)
//   - File access only through Layer 6
//
// Both use cases share PackConfig and build_emitter, so an
// `inspect` run sees exactly the windows `pack` would write.

// Packing a shard to items.jsonl
pub mod pack_use_case;

// Dry-run statistics
pub mod inspect_use_case;
