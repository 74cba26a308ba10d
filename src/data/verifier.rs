// ============================================================
// Layer 4 — Template Verifier (diagnostics only)
// ============================================================
// Cross-checks the piecewise ChatTokenizer against a one-shot
// encode of the fully rendered template. The rendered string
// has no trailing <|end_of_text|>, so it must match every
// token of the sample except the last.
//
// Only installed when --verify is passed. It re-encodes every
// conversation, so it roughly doubles tokenization cost.

use anyhow::Result;
use tokenizers::Tokenizer;

use crate::data::chat_tokenizer::{encode_plain, ChatTemplate};
use crate::domain::{
    conversation::Conversation,
    error::PackingError,
    sample::TokenizedSample,
    traits::SampleVerifier,
};

pub struct TemplateVerifier {
    tokenizer: Tokenizer,
    template:  ChatTemplate,
}

impl TemplateVerifier {
    pub fn new(tokenizer: Tokenizer, template: ChatTemplate) -> Self {
        Self { tokenizer, template }
    }
}

impl SampleVerifier for TemplateVerifier {
    fn verify(&self, conversation: &Conversation, sample: &TokenizedSample) -> Result<()> {
        let expected = encode_plain(&self.tokenizer, &self.template.render(conversation))?;
        let actual = &sample.tokens()[..sample.len().saturating_sub(1)];

        if expected.as_slice() != actual {
            tracing::error!(
                "Template mismatch:\n  rendered: {:?}\n  sample:   {:?}",
                expected,
                actual
            );
            return Err(PackingError::VerificationFailed {
                expected: expected.len(),
                actual:   actual.len(),
            }
            .into());
        }
        Ok(())
    }
}
