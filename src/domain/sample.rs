use serde::{Deserialize, Serialize};

use crate::domain::error::PackingError;

/// One tokenized conversation.
///
/// `is_completion[i]` says whether token `i` belongs to an
/// assistant response. The two vectors always have the same
/// length; `new` is the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizedSample {
    tokens:        Vec<u32>,
    is_completion: Vec<bool>,
}

impl TokenizedSample {
    pub fn new(tokens: Vec<u32>, is_completion: Vec<bool>) -> Result<Self, PackingError> {
        if tokens.len() != is_completion.len() {
            return Err(PackingError::LengthMismatch {
                tokens: tokens.len(),
                flags:  is_completion.len(),
            });
        }
        Ok(Self { tokens, is_completion })
    }

    pub fn tokens(&self) -> &[u32] {
        &self.tokens
    }

    pub fn is_completion(&self) -> &[bool] {
        &self.is_completion
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn into_parts(self) -> (Vec<u32>, Vec<bool>) {
        (self.tokens, self.is_completion)
    }
}
