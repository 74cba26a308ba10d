// ============================================================
// Layer 4 — Position Policy
// ============================================================
// Derives position ids for a packed window from the lengths
// of the samples inside it.
//
//   ResetAtBoundary — restart at 0 for every sample:
//                     lengths [3, 2] → [0, 1, 2, 0, 1]
//   Continuous      — one running count across the window:
//                     lengths [3, 2] → [0, 1, 2, 3, 4]
//
// Resetting positions stops one sample's positional embedding
// from depending on what was packed before it. It does NOT
// stop tokens from attending across samples; a consumer that
// needs that must mask attention using the sample lengths.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionPolicy {
    ResetAtBoundary,
    Continuous,
}

impl PositionPolicy {
    /// Picks the variant from the `remove_cross_attention` switch.
    pub fn from_flag(remove_cross_attention: bool) -> Self {
        if remove_cross_attention {
            Self::ResetAtBoundary
        } else {
            Self::Continuous
        }
    }

    /// The output always covers exactly `sum(sample_lengths)`
    /// positions.
    pub fn apply(self, sample_lengths: &[usize]) -> Vec<u32> {
        let total: usize = sample_lengths.iter().sum();
        let mut ids = Vec::with_capacity(total);

        match self {
            Self::ResetAtBoundary => {
                for &len in sample_lengths {
                    ids.extend((0..len).map(|p| p as u32));
                }
            }
            Self::Continuous => ids.extend((0..total).map(|p| p as u32)),
        }
        ids
    }
}
