// ============================================================
// Layer 4 — Window Emitter
// ============================================================
// Drives the whole pipeline, one item per call:
//
//   record source ──► tokenizer ──► (verifier) ──┬─► PackingBuffer ──► PackedWindow
//                                                └─► AlignmentPadder ─► NonPackedItem
//
// The source is treated as infinite. Its handle moves through
// three states:
//
//   Pulling ──(None)──► Exhausted ──► Restarting ──► Pulling ...
//
// Each restart is logged and counted in EmitterStats. The
// packing buffer is NOT cleared on restart: samples buffered at
// the end of one pass are packed together with the start of
// the next.
//
// If a whole pass produces no usable sample (an empty shard, or
// every sample over-length and skipped) we stop with
// EmptySource instead of spinning forever.
//
// The emitter is an Iterator<Item = Result<TrainingItem>>. After
// the first error it is fused and only returns None.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::data::{
    alignment_padder::AlignmentPadder,
    label_policy::LabelPolicy,
    packing_buffer::PackingBuffer,
    position_policy::PositionPolicy,
};
use crate::domain::{
    conversation::Conversation,
    error::PackingError,
    sample::TokenizedSample,
    traits::{ConversationTokenizer, Record, RecordSource, SampleVerifier},
    window::TrainingItem,
};

// ─── Configuration ────────────────────────────────────────────────────────────
/// What to do with a sample that cannot fit in any window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverLengthPolicy {
    /// Log a warning, count it, move on
    #[default]
    Skip,
    /// Abort iteration with OverLengthSample
    Fail,
}

impl FromStr for OverLengthPolicy {
    type Err = PackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(Self::Skip),
            "fail" => Ok(Self::Fail),
            other  => Err(PackingError::InvalidConfig(format!(
                "unknown over-length policy '{other}' (expected skip or fail)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitterConfig {
    pub sequence_length:     usize,
    pub labels:              LabelPolicy,
    pub positions:           PositionPolicy,
    pub pack_samples:        bool,
    pub sp_ranks_size:       usize,
    pub conversation_column: String,
    pub over_length:         OverLengthPolicy,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            sequence_length:     2048,
            labels:              LabelPolicy::CompletionsOnly,
            positions:           PositionPolicy::ResetAtBoundary,
            pack_samples:        true,
            sp_ranks_size:       1,
            conversation_column: "conversations".to_string(),
            over_length:         OverLengthPolicy::Skip,
        }
    }
}

impl EmitterConfig {
    pub fn max_window_len(&self) -> usize {
        self.sequence_length + 1
    }

    pub fn validate(&self) -> Result<(), PackingError> {
        if self.sequence_length == 0 {
            return Err(PackingError::InvalidConfig("sequence_length must be positive".into()));
        }
        if self.sequence_length.checked_add(1).is_none() {
            return Err(PackingError::InvalidConfig(format!(
                "sequence_length {} leaves no room for the extra window slot",
                self.sequence_length
            )));
        }
        if self.sp_ranks_size == 0 {
            return Err(PackingError::InvalidConfig("sp_ranks_size must be at least 1".into()));
        }
        if self.conversation_column.is_empty() {
            return Err(PackingError::InvalidConfig("conversation_column must not be empty".into()));
        }
        Ok(())
    }
}

// ─── Observability ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitterStats {
    pub records_pulled:      u64,
    pub samples_accepted:    u64,
    pub items_emitted:       u64,
    pub tokens_emitted:      u64,
    pub trainable_tokens:    u64,
    pub restarts:            u64,
    pub skipped_over_length: u64,
    pub skipped_empty:       u64,
}

impl EmitterStats {
    /// Average share of window capacity actually filled with tokens.
    pub fn fill_ratio(&self, max_window_len: usize) -> f64 {
        if self.items_emitted == 0 || max_window_len == 0 {
            return 0.0;
        }
        self.tokens_emitted as f64 / (self.items_emitted as f64 * max_window_len as f64)
    }

    /// Share of emitted tokens that contribute to the loss.
    pub fn trainable_fraction(&self) -> f64 {
        if self.tokens_emitted == 0 {
            return 0.0;
        }
        self.trainable_tokens as f64 / self.tokens_emitted as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Pulling,
    Exhausted,
    Restarting,
}

// ─── WindowEmitter ────────────────────────────────────────────────────────────
pub struct WindowEmitter<S, T> {
    source:    S,
    tokenizer: T,
    config:    EmitterConfig,
    buffer:    PackingBuffer,
    padder:    AlignmentPadder,
    verifier:  Option<Box<dyn SampleVerifier>>,
    state:     SourceState,
    /// Samples that reached the buffer or padder since the last restart
    usable_since_restart: u64,
    stats:     EmitterStats,
    failed:    bool,
}

impl<S: RecordSource, T: ConversationTokenizer> WindowEmitter<S, T> {
    pub fn new(source: S, tokenizer: T, config: EmitterConfig) -> Result<Self, PackingError> {
        config.validate()?;

        let buffer = PackingBuffer::new(config.sequence_length);
        let padder = AlignmentPadder::new(config.sp_ranks_size, tokenizer.pad_token_id(), config.labels);

        tracing::info!(
            "Window emitter: packing={} sequence_length={} labels={:?} positions={:?} sp_chunks={}",
            config.pack_samples,
            config.sequence_length,
            config.labels,
            config.positions,
            padder.sp_chunks()
        );

        Ok(Self {
            source,
            tokenizer,
            config,
            buffer,
            padder,
            verifier: None,
            state: SourceState::Pulling,
            usable_since_restart: 0,
            stats: EmitterStats::default(),
            failed: false,
        })
    }

    /// Install a diagnostic verifier that sees every sample.
    pub fn with_verifier(mut self, verifier: Box<dyn SampleVerifier>) -> Self {
        tracing::warn!("Sample verification enabled; tokenization cost roughly doubles");
        self.verifier = Some(verifier);
        self
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &T {
        &self.tokenizer
    }

    pub fn stats(&self) -> &EmitterStats {
        &self.stats
    }

    pub fn buffer(&self) -> &PackingBuffer {
        &self.buffer
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    /// Produce the next item, pulling as many records as needed.
    pub fn next_item(&mut self) -> Result<TrainingItem> {
        loop {
            let record = self.pull_record()?;
            let conversation = self.extract_conversation(&record)?;
            let sample = self.tokenizer.tokenize(&conversation)?;

            if let Some(verifier) = &self.verifier {
                verifier.verify(&conversation, &sample)?;
            }

            if let Some(item) = self.route(sample)? {
                self.record_emission(&item);
                return Ok(item);
            }
        }
    }

    /// Pack whatever is still buffered into one last window.
    /// Only meaningful for finite consumers; the infinite stream
    /// never calls it.
    pub fn flush(&mut self) -> Result<Option<TrainingItem>> {
        if !self.config.pack_samples {
            return Ok(None);
        }
        let Some(raw) = self.buffer.flush()? else {
            return Ok(None);
        };
        let window = raw.finish(self.config.labels, self.config.positions)?;
        let item = TrainingItem::Packed(window);
        self.record_emission(&item);
        Ok(Some(item))
    }

    fn pull_record(&mut self) -> Result<Record> {
        loop {
            match self.state {
                SourceState::Pulling => match self.source.next_record()? {
                    Some(record) => {
                        self.stats.records_pulled += 1;
                        return Ok(record);
                    }
                    None => self.state = SourceState::Exhausted,
                },
                SourceState::Exhausted => {
                    if self.usable_since_restart == 0 {
                        return Err(PackingError::EmptySource.into());
                    }
                    tracing::info!(
                        "Consumed all records, source is being re-looped (restart #{}, {} tokens buffered)",
                        self.stats.restarts + 1,
                        self.buffer.len()
                    );
                    self.state = SourceState::Restarting;
                }
                SourceState::Restarting => {
                    self.source.restart()?;
                    self.stats.restarts += 1;
                    self.usable_since_restart = 0;
                    self.state = SourceState::Pulling;
                }
            }
        }
    }

    fn extract_conversation(&self, record: &Record) -> Result<Conversation, PackingError> {
        let column = &self.config.conversation_column;
        let field = record.get(column).ok_or_else(|| PackingError::MalformedRecord {
            column: column.clone(),
            reason: "field missing".to_string(),
        })?;
        serde_json::from_value(field.clone()).map_err(|e| PackingError::MalformedRecord {
            column: column.clone(),
            reason: e.to_string(),
        })
    }

    fn route(&mut self, sample: TokenizedSample) -> Result<Option<TrainingItem>> {
        if sample.is_empty() {
            self.stats.skipped_empty += 1;
            tracing::debug!("Skipping empty sample");
            return Ok(None);
        }

        if !self.config.pack_samples {
            self.accept();
            let item = self.padder.pad(sample)?;
            return Ok(Some(TrainingItem::NonPacked(item)));
        }

        match self.buffer.push(sample) {
            Ok(raw) => {
                self.accept();
                let Some(raw) = raw else {
                    return Ok(None);
                };
                let window = raw.finish(self.config.labels, self.config.positions)?;
                Ok(Some(TrainingItem::Packed(window)))
            }
            Err(PackingError::OverLengthSample { len, max })
                if self.config.over_length == OverLengthPolicy::Skip =>
            {
                self.stats.skipped_over_length += 1;
                tracing::warn!(
                    "Skipping sample of {} tokens, window capacity is {} ({} skipped so far)",
                    len,
                    max,
                    self.stats.skipped_over_length
                );
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn accept(&mut self) {
        self.stats.samples_accepted += 1;
        self.usable_since_restart += 1;
    }

    fn record_emission(&mut self, item: &TrainingItem) {
        self.stats.items_emitted += 1;
        self.stats.tokens_emitted += item.len() as u64;
        self.stats.trainable_tokens += item.trainable_tokens() as u64;
    }
}

impl<S: RecordSource, T: ConversationTokenizer> Iterator for WindowEmitter<S, T> {
    type Item = Result<TrainingItem>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_item() {
            Ok(item) => Some(Ok(item)),
            Err(e) => {
                match e.downcast_ref::<PackingError>() {
                    Some(p) if p.is_contract_violation() => {
                        tracing::error!("Window emitter stopped on malformed data: {e:#}")
                    }
                    _ => tracing::error!("Window emitter stopped: {e:#}"),
                }
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
