// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that define what the
// packing pipeline talks about: conversations, tokenized
// samples, emitted windows, and the seams to the outside
// world (record sources and tokenizers).
//
// Rules for this layer:
//   - NO burn types
//   - NO file I/O
//   - Only data, invariants and traits
//
// Everything that produces or consumes these types lives in
// Layer 4 (data) or Layer 6 (infra).

// Chat conversation records as they come out of the source
pub mod conversation;

// A tokenized conversation with its completion flags
pub mod sample;

// The two artifact shapes handed to the training loop
pub mod window;

// Typed error taxonomy for the packing core
pub mod error;

// Record source, tokenizer and verifier abstractions
pub mod traits;
