// ============================================================
// Layer 4 — Label Policy
// ============================================================
// Decides which positions of a window contribute to the loss.
//
//   CompletionsOnly — only tokens flagged as assistant output
//   Full            — every token
//
// No shift is applied here. The mask answers "is the token at
// this position part of an assistant response"; the training
// loop shifts inputs and labels by one when it builds targets.
//
//   tokens        [a, b, c, d]
//   is_completion [F, F, T, T]
//   mask          [0, 0, 1, 1]

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelPolicy {
    CompletionsOnly,
    Full,
}

impl LabelPolicy {
    /// Picks the variant from the `train_on_completions_only` switch.
    pub fn from_flag(train_on_completions_only: bool) -> Self {
        if train_on_completions_only {
            Self::CompletionsOnly
        } else {
            Self::Full
        }
    }

    /// Build a 0/1 mask with one entry per token.
    pub fn apply(self, tokens: &[u32], is_completion: &[bool]) -> Vec<u32> {
        debug_assert_eq!(tokens.len(), is_completion.len());
        match self {
            Self::CompletionsOnly => is_completion.iter().map(|&c| u32::from(c)).collect(),
            Self::Full            => vec![1; tokens.len()],
        }
    }
}
