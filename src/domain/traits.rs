// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The packing core only knows three seams:
//
//   RecordSource          — a restartable stream of records
//   ConversationTokenizer — conversation → (tokens, flags)
//   SampleVerifier        — optional diagnostic cross-check
//
// Implementations:
//   - JsonlRecordSource / InMemorySource  (Layer 4, data::source)
//   - ChatTokenizer                       (Layer 4, data::chat_tokenizer)
//   - TemplateVerifier                    (Layer 4, data::verifier)
//
// WindowEmitter is generic over the first two, so tests can
// swap in tiny fakes without touching tokenizer files.

use anyhow::Result;

use crate::domain::conversation::Conversation;
use crate::domain::sample::TokenizedSample;

/// A raw record. The conversation lives in one named field.
pub type Record = serde_json::Value;

// ─── RecordSource ─────────────────────────────────────────────────────────────
/// A restartable, pre-sharded, pre-shuffled sequence of records.
pub trait RecordSource {
    /// Next record, or `None` once the source is exhausted.
    fn next_record(&mut self) -> Result<Option<Record>>;

    /// Re-open the source from its first record.
    fn restart(&mut self) -> Result<()>;
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn next_record(&mut self) -> Result<Option<Record>> {
        (**self).next_record()
    }

    fn restart(&mut self) -> Result<()> {
        (**self).restart()
    }
}

// ─── ConversationTokenizer ────────────────────────────────────────────────────
/// Deterministic conversion of a conversation into token ids
/// plus per-token completion flags.
pub trait ConversationTokenizer {
    fn tokenize(&self, conversation: &Conversation) -> Result<TokenizedSample>;

    /// Token id used to pad non-packed items.
    fn pad_token_id(&self) -> u32;
}

// ─── SampleVerifier ───────────────────────────────────────────────────────────
/// Diagnostic check run on every sample when verification is
/// switched on. Never installed on the production path.
pub trait SampleVerifier {
    fn verify(&self, conversation: &Conversation, sample: &TokenizedSample) -> Result<()>;
}
