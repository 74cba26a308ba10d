// ============================================================
// Layer 4 — Padding-Free Packing Buffer
// ============================================================
// Concatenates tokenized samples until the next one would not
// fit, then hands back everything except that last sample as
// a finished window.
//
// Capacity is sequence_length + 1: the extra slot is consumed
// when the training loop shifts the window by one to build
// next-token targets.
//
// Example with sequence_length = 150 (capacity 151):
//
//   push 100  → buffer [100]          total 100   keep going
//   push  50  → buffer [100, 50]      total 150   keep going
//   push  80  → buffer [100, 50, 80]  total 230   overflow!
//               emit   [100, 50]      (150 tokens)
//               keep   [80]           as the seed of the next window
//
// Only one sample is appended per push and the capacity check
// runs after every append, so an overflow is always caused by
// the sample just added. Samples longer than the capacity on
// their own are refused before they touch the buffer, so an
// emitted window is never empty and never over capacity.
//
// Invariant, checked on every emission:
//   sum(sample_lengths) == tokens.len() == is_completion.len()

use crate::data::{label_policy::LabelPolicy, position_policy::PositionPolicy};
use crate::domain::{error::PackingError, sample::TokenizedSample, window::PackedWindow};

/// Window contents before the label and position policies run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawWindow {
    pub tokens:         Vec<u32>,
    pub is_completion:  Vec<bool>,
    pub sample_lengths: Vec<usize>,
}

impl RawWindow {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Apply both policies and produce the artifact handed to
    /// the training loop.
    pub fn finish(self, labels: LabelPolicy, positions: PositionPolicy) -> Result<PackedWindow, PackingError> {
        let label_mask   = labels.apply(&self.tokens, &self.is_completion);
        let position_ids = positions.apply(&self.sample_lengths);

        let window = PackedWindow {
            input_ids: self.tokens,
            label_mask,
            position_ids,
            sample_lengths: self.sample_lengths,
        };
        window.validate()?;
        Ok(window)
    }
}

#[derive(Debug, Clone)]
pub struct PackingBuffer {
    tokens:         Vec<u32>,
    is_completion:  Vec<bool>,
    sample_lengths: Vec<usize>,
    max_window_len: usize,
}

impl PackingBuffer {
    pub fn new(sequence_length: usize) -> Self {
        let max_window_len = sequence_length + 1;
        Self {
            tokens:         Vec::new(),
            is_completion:  Vec::new(),
            sample_lengths: Vec::new(),
            max_window_len,
        }
    }

    pub fn max_window_len(&self) -> usize {
        self.max_window_len
    }

    /// Tokens currently buffered.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn sample_lengths(&self) -> &[usize] {
        &self.sample_lengths
    }

    /// Add one sample. Returns a finished window when this sample
    /// overflowed the buffer; the sample itself then seeds the
    /// next window.
    ///
    /// A sample longer than the window capacity is refused with
    /// `OverLengthSample` and the buffer is left untouched.
    pub fn push(&mut self, sample: TokenizedSample) -> Result<Option<RawWindow>, PackingError> {
        let sample_len = sample.len();
        if sample_len > self.max_window_len {
            return Err(PackingError::OverLengthSample {
                len: sample_len,
                max: self.max_window_len,
            });
        }

        let (tokens, flags) = sample.into_parts();
        self.tokens.extend_from_slice(&tokens);
        self.is_completion.extend_from_slice(&flags);
        self.sample_lengths.push(sample_len);

        if self.tokens.len() <= self.max_window_len {
            return Ok(None);
        }

        // Everything but the sample we just appended becomes the window.
        let cut = self.tokens.len() - sample_len;
        let seed_tokens = self.tokens.split_off(cut);
        let seed_flags  = self.is_completion.split_off(cut);
        let seed_len    = self.sample_lengths.pop().unwrap_or(sample_len);

        let window = RawWindow {
            tokens:         std::mem::replace(&mut self.tokens, seed_tokens),
            is_completion:  std::mem::replace(&mut self.is_completion, seed_flags),
            sample_lengths: std::mem::replace(&mut self.sample_lengths, vec![seed_len]),
        };

        check_invariant(&window)?;
        tracing::trace!(
            "Packed window: {} tokens from {} samples",
            window.len(),
            window.sample_lengths.len()
        );
        Ok(Some(window))
    }

    /// Drain whatever is buffered into a final window.
    /// Returns `None` when the buffer is empty.
    pub fn flush(&mut self) -> Result<Option<RawWindow>, PackingError> {
        if self.sample_lengths.is_empty() {
            return Ok(None);
        }
        let window = RawWindow {
            tokens:         std::mem::take(&mut self.tokens),
            is_completion:  std::mem::take(&mut self.is_completion),
            sample_lengths: std::mem::take(&mut self.sample_lengths),
        };
        check_invariant(&window)?;
        Ok(Some(window))
    }
}

fn check_invariant(window: &RawWindow) -> Result<(), PackingError> {
    if window.tokens.len() != window.is_completion.len() {
        return Err(PackingError::LengthMismatch {
            tokens: window.tokens.len(),
            flags:  window.is_completion.len(),
        });
    }
    let summed: usize = window.sample_lengths.iter().sum();
    if summed != window.tokens.len() {
        return Err(PackingError::BufferInvariant {
            buffered: window.tokens.len(),
            summed,
        });
    }
    Ok(())
}
