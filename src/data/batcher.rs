// ============================================================
// Layer 4 — Packed Window Batcher
// ============================================================
// Implements Burn's Batcher trait so a training loop can stack
// packed windows into [batch, seq] Int tensors.
//
// Windows are at most sequence_length + 1 tokens but usually a
// little shorter, since packing stops at the last whole sample
// that fits. The batcher right-pads every window in a batch to
// the longest one:
//
//   input_ids       pad_token_id
//   label_mask      0   (padding never contributes to the loss)
//   position_ids    0
//   attention_mask  1 for real tokens, 0 for padding
//
// Burn's Int tensors take i32, so ids are converted on the way.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::window::PackedWindow;

/// A batch of packed windows. Every tensor is [batch_size, seq_len].
#[derive(Debug, Clone)]
pub struct PackedBatch<B: Backend> {
    pub input_ids:      Tensor<B, 2, Int>,
    pub label_mask:     Tensor<B, 2, Int>,
    pub position_ids:   Tensor<B, 2, Int>,
    pub attention_mask: Tensor<B, 2, Int>,
}

#[derive(Clone, Debug)]
pub struct WindowBatcher<B: Backend> {
    pub device:       B::Device,
    pub pad_token_id: u32,
}

impl<B: Backend> WindowBatcher<B> {
    pub fn new(device: B::Device, pad_token_id: u32) -> Self {
        Self { device, pad_token_id }
    }
}

/// Copy `values` and right-pad with `fill` up to `len`.
fn padded_row(values: &[u32], len: usize, fill: u32) -> impl Iterator<Item = i32> + '_ {
    values
        .iter()
        .copied()
        .chain(std::iter::repeat(fill))
        .take(len)
        .map(|v| v as i32)
}

impl<B: Backend> Batcher<PackedWindow, PackedBatch<B>> for WindowBatcher<B> {
    fn batch(&self, items: Vec<PackedWindow>) -> PackedBatch<B> {
        let batch_size = items.len();
        let seq_len = items.iter().map(PackedWindow::len).max().unwrap_or(0);

        let mut ids   = Vec::with_capacity(batch_size * seq_len);
        let mut label = Vec::with_capacity(batch_size * seq_len);
        let mut pos   = Vec::with_capacity(batch_size * seq_len);
        let mut attn  = Vec::with_capacity(batch_size * seq_len);

        for w in &items {
            ids.extend(padded_row(&w.input_ids, seq_len, self.pad_token_id));
            label.extend(padded_row(&w.label_mask, seq_len, 0));
            pos.extend(padded_row(&w.position_ids, seq_len, 0));
            attn.extend((0..seq_len).map(|i| i32::from(i < w.len())));
        }

        let to_tensor = |flat: Vec<i32>| {
            Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
                .reshape([batch_size, seq_len])
        };

        PackedBatch {
            input_ids:      to_tensor(ids),
            label_mask:     to_tensor(label),
            position_ids:   to_tensor(pos),
            attention_mask: to_tensor(attn),
        }
    }
}
