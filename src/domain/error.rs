// ============================================================
// Layer 3 — Packing Errors
// ============================================================
// Three kinds of failure exist in the packing core:
//
//   ContractViolation — mismatched lengths or a broken buffer
//                       invariant. Upstream data or a logic
//                       defect; the run must abort rather than
//                       train on malformed windows.
//   OverLengthSample  — a single sample that cannot fit in a
//                       window. What happens next is decided by
//                       the configured OverLengthPolicy.
//   Source problems   — empty shards and malformed records.
//
// Source exhaustion is NOT here: it is an expected restart
// event, counted in EmitterStats.
//
// Application code works with anyhow::Result; these typed
// errors travel inside anyhow::Error and stay downcastable.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PackingError {
    #[error("contract violation: {tokens} tokens but {flags} completion flags")]
    LengthMismatch { tokens: usize, flags: usize },

    #[error("contract violation: buffer holds {buffered} tokens but sample lengths sum to {summed}")]
    BufferInvariant { buffered: usize, summed: usize },

    #[error("contract violation: {what} fields have unequal lengths {lengths:?}")]
    ArtifactShape { what: &'static str, lengths: Vec<usize> },

    #[error("sample of {len} tokens exceeds the window capacity of {max}")]
    OverLengthSample { len: usize, max: usize },

    #[error("record source finished a full pass without a usable sample")]
    EmptySource,

    #[error("record has no usable '{column}' field: {reason}")]
    MalformedRecord { column: String, reason: String },

    #[error("tokenization does not match the rendered template: expected {expected} tokens, got {actual}")]
    VerificationFailed { expected: usize, actual: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PackingError {
    /// True for the fatal contract-violation family.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::LengthMismatch { .. } | Self::BufferInvariant { .. } | Self::ArtifactShape { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_violation_family() {
        assert!(PackingError::LengthMismatch { tokens: 3, flags: 2 }.is_contract_violation());
        assert!(PackingError::BufferInvariant { buffered: 3, summed: 2 }.is_contract_violation());
        assert!(!PackingError::OverLengthSample { len: 10, max: 5 }.is_contract_violation());
        assert!(!PackingError::EmptySource.is_contract_violation());
    }

    #[test]
    fn test_messages_carry_numbers() {
        let msg = PackingError::OverLengthSample { len: 300, max: 151 }.to_string();
        assert!(msg.contains("300"));
        assert!(msg.contains("151"));
    }
}
