// ============================================================
// Layer 4 — Alignment Padder (non-packing path)
// ============================================================
// When packing is off, each sample becomes its own item. Under
// sequence parallelism the sequence is split into
// sp_chunks = 2 * sp_ranks_size pieces, so its length must be a
// multiple of sp_chunks once the causal shift has removed one
// token.
//
//   1. pad to the next multiple of sp_chunks
//   2. if sp_chunks > 1, add one more pad for the shift slot
//
// Example, sp_ranks_size = 2 → sp_chunks = 4, 5 tokens:
//   5 → 8 (multiple of 4) → 9 (shift slot)
//
// Pad positions get input_mask 0 and label_mask 0.

use crate::data::label_policy::LabelPolicy;
use crate::domain::{error::PackingError, sample::TokenizedSample, window::NonPackedItem};

#[derive(Debug, Clone, Copy)]
pub struct AlignmentPadder {
    sp_chunks:    usize,
    pad_token_id: u32,
    labels:       LabelPolicy,
}

impl AlignmentPadder {
    pub fn new(sp_ranks_size: usize, pad_token_id: u32, labels: LabelPolicy) -> Self {
        Self {
            sp_chunks: sp_chunks(sp_ranks_size),
            pad_token_id,
            labels,
        }
    }

    pub fn sp_chunks(&self) -> usize {
        self.sp_chunks
    }

    /// Length a sample of `len` tokens ends up with.
    pub fn padded_len(&self, len: usize) -> usize {
        let aligned = len.div_ceil(self.sp_chunks) * self.sp_chunks;
        if self.sp_chunks > 1 {
            aligned + 1
        } else {
            aligned
        }
    }

    pub fn pad(&self, sample: TokenizedSample) -> Result<NonPackedItem, PackingError> {
        let mut label_mask = self.labels.apply(sample.tokens(), sample.is_completion());
        let (mut input_ids, _) = sample.into_parts();
        let mut input_mask = vec![1u32; input_ids.len()];

        let target = self.padded_len(input_ids.len());
        input_ids.resize(target, self.pad_token_id);
        label_mask.resize(target, 0);
        input_mask.resize(target, 0);

        let item = NonPackedItem { input_ids, input_mask, label_mask };
        item.validate()?;
        Ok(item)
    }
}

/// Number of sequence-parallel chunks a sequence is split into.
pub fn sp_chunks(sp_ranks_size: usize) -> usize {
    if sp_ranks_size > 1 {
        2 * sp_ranks_size
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAD: u32 = 0;

    fn sample(len: usize) -> TokenizedSample {
        let tokens: Vec<u32> = (1..=len as u32).collect();
        let flags = (0..len).map(|i| i % 2 == 1).collect();
        TokenizedSample::new(tokens, flags).unwrap()
    }

    #[test]
    fn test_sp_two_pads_five_tokens_to_nine() {
        let padder = AlignmentPadder::new(2, PAD, LabelPolicy::CompletionsOnly);
        assert_eq!(padder.sp_chunks(), 4);

        let item = padder.pad(sample(5)).unwrap();
        assert_eq!(item.len(), 9);
        assert_eq!(item.input_ids, vec![1, 2, 3, 4, 5, PAD, PAD, PAD, PAD]);
        assert_eq!(item.input_mask, vec![1, 1, 1, 1, 1, 0, 0, 0, 0]);
        assert_eq!(item.label_mask, vec![0, 1, 0, 1, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_already_aligned_still_gets_shift_slot() {
        let padder = AlignmentPadder::new(2, PAD, LabelPolicy::Full);
        let item = padder.pad(sample(8)).unwrap();
        assert_eq!(item.len(), 9);
        assert_eq!(item.input_mask.iter().sum::<u32>(), 8);
        assert_eq!(item.label_mask.iter().sum::<u32>(), 8);
    }

    #[test]
    fn test_no_sequence_parallelism_leaves_sample_alone() {
        let padder = AlignmentPadder::new(1, PAD, LabelPolicy::Full);
        assert_eq!(padder.sp_chunks(), 1);

        let item = padder.pad(sample(5)).unwrap();
        assert_eq!(item.len(), 5);
        assert!(item.input_mask.iter().all(|&m| m == 1));
    }

    #[test]
    fn test_padded_len_rule() {
        let padder = AlignmentPadder::new(3, PAD, LabelPolicy::Full);
        assert_eq!(padder.sp_chunks(), 6);
        assert_eq!(padder.padded_len(1), 7);
        assert_eq!(padder.padded_len(6), 7);
        assert_eq!(padder.padded_len(7), 13);
    }

    #[test]
    fn test_sp_chunks_helper() {
        assert_eq!(sp_chunks(0), 1);
        assert_eq!(sp_chunks(1), 1);
        assert_eq!(sp_chunks(4), 8);
    }
}
