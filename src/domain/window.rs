// ============================================================
// Layer 3 — Emitted Artifacts
// ============================================================
// The training loop receives one of two shapes:
//
//   packing mode     { input_ids, label_mask, position_ids }
//   non-packing mode { input_ids, input_mask, label_mask }
//
// Every field of an artifact has the same length. Packed
// windows also carry the lengths of the samples packed into
// them, so a consumer that wants true per-sample attention
// isolation (not just position resets) can build its own
// block-diagonal mask.

use serde::{Deserialize, Serialize};

use crate::domain::error::PackingError;

/// A window of several samples concatenated back to back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedWindow {
    pub input_ids:      Vec<u32>,
    pub label_mask:     Vec<u32>,
    pub position_ids:   Vec<u32>,
    pub sample_lengths: Vec<usize>,
}

impl PackedWindow {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Number of positions that contribute to the loss.
    pub fn trainable_tokens(&self) -> usize {
        self.label_mask.iter().filter(|&&m| m == 1).count()
    }

    /// Fails with `ArtifactShape` unless every field lines up
    /// and the sample lengths cover the window exactly.
    pub fn validate(&self) -> Result<(), PackingError> {
        let lengths = vec![self.input_ids.len(), self.label_mask.len(), self.position_ids.len()];
        if lengths.iter().any(|&l| l != lengths[0]) {
            return Err(PackingError::ArtifactShape { what: "packed window", lengths });
        }
        let summed: usize = self.sample_lengths.iter().sum();
        if summed != self.input_ids.len() {
            return Err(PackingError::BufferInvariant {
                buffered: self.input_ids.len(),
                summed,
            });
        }
        Ok(())
    }
}

/// A single sample padded to sequence-parallel alignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonPackedItem {
    pub input_ids:  Vec<u32>,
    pub input_mask: Vec<u32>,
    pub label_mask: Vec<u32>,
}

impl NonPackedItem {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    pub fn trainable_tokens(&self) -> usize {
        self.label_mask.iter().filter(|&&m| m == 1).count()
    }

    pub fn validate(&self) -> Result<(), PackingError> {
        let lengths = vec![self.input_ids.len(), self.input_mask.len(), self.label_mask.len()];
        if lengths.iter().any(|&l| l != lengths[0]) {
            return Err(PackingError::ArtifactShape { what: "non-packed item", lengths });
        }
        Ok(())
    }
}

/// What the emitter yields. Serialized untagged, so each line
/// of output carries exactly the fields of its shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrainingItem {
    Packed(PackedWindow),
    NonPacked(NonPackedItem),
}

impl TrainingItem {
    pub fn len(&self) -> usize {
        match self {
            Self::Packed(w)    => w.len(),
            Self::NonPacked(i) => i.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn trainable_tokens(&self) -> usize {
        match self {
            Self::Packed(w)    => w.trainable_tokens(),
            Self::NonPacked(i) => i.trainable_tokens(),
        }
    }

    pub fn as_packed(&self) -> Option<&PackedWindow> {
        match self {
            Self::Packed(w) => Some(w),
            Self::NonPacked(_) => None,
        }
    }

    pub fn as_non_packed(&self) -> Option<&NonPackedItem> {
        match self {
            Self::NonPacked(i) => Some(i),
            Self::Packed(_) => None,
        }
    }
}
