// ============================================================
// Layer 4 — Chat Tokenizer
// ============================================================
// Turns a Conversation into (tokens, is_completion) using the
// Llama-3 header layout:
//
//   <|begin_of_text|>
//   <|start_header_id|>{from}<|end_header_id|>\n\n{value}<|eot_id|>   ← per message
//   <|end_of_text|>
//
// Each piece is encoded on its own so we know exactly which
// tokens came from which message. Completion flags:
//
//   <|begin_of_text|>            false
//   header tokens                false
//   value tokens + <|eot_id|>    true iff the speaker is a completion role
//   <|end_of_text|>              true (the model must learn to stop)
//
// The pad token id is taken from, in order: an explicit pad
// token, <|finetune_right_pad_id|>, or <|end_of_text|>.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

use crate::domain::{
    conversation::{Conversation, Message},
    sample::TokenizedSample,
    traits::ConversationTokenizer,
};

/// Special-token strings of the chat layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTemplate {
    pub bos:              String,
    pub eos:              String,
    pub start_header:     String,
    pub end_header:       String,
    pub eot:              String,
    pub header_separator: String,
    pub default_pad:      String,
}

impl Default for ChatTemplate {
    fn default() -> Self {
        Self {
            bos:              "<|begin_of_text|>".to_string(),
            eos:              "<|end_of_text|>".to_string(),
            start_header:     "<|start_header_id|>".to_string(),
            end_header:       "<|end_header_id|>".to_string(),
            eot:              "<|eot_id|>".to_string(),
            header_separator: "\n\n".to_string(),
            default_pad:      "<|finetune_right_pad_id|>".to_string(),
        }
    }
}

impl ChatTemplate {
    /// Render a conversation as one string, without the trailing
    /// end-of-text token. Used by the template verifier.
    pub fn render(&self, conversation: &Conversation) -> String {
        let mut out = self.bos.clone();
        for message in &conversation.messages {
            out.push_str(&self.start_header);
            out.push_str(&message.from);
            out.push_str(&self.end_header);
            out.push_str(&self.header_separator);
            out.push_str(message.value.trim());
            out.push_str(&self.eot);
        }
        out
    }
}

#[derive(Debug, Clone, Copy)]
struct SpecialIds {
    bos:          u32,
    eos:          u32,
    start_header: u32,
    end_header:   u32,
    eot:          u32,
}

pub struct ChatTokenizer {
    tokenizer:    Tokenizer,
    template:     ChatTemplate,
    ids:          SpecialIds,
    pad_token_id: u32,
}

impl ChatTokenizer {
    pub fn new(tokenizer: Tokenizer, template: ChatTemplate, pad_token: Option<&str>) -> Result<Self> {
        let ids = SpecialIds {
            bos:          special_id(&tokenizer, &template.bos)?,
            eos:          special_id(&tokenizer, &template.eos)?,
            start_header: special_id(&tokenizer, &template.start_header)?,
            end_header:   special_id(&tokenizer, &template.end_header)?,
            eot:          special_id(&tokenizer, &template.eot)?,
        };

        let pad_token_id = match pad_token {
            Some(token) => special_id(&tokenizer, token)?,
            None => tokenizer.token_to_id(&template.default_pad).unwrap_or(ids.eos),
        };

        tracing::debug!(
            "Chat tokenizer ready: bos={} eos={} eot={} pad={}",
            ids.bos,
            ids.eos,
            ids.eot,
            pad_token_id
        );

        Ok(Self { tokenizer, template, ids, pad_token_id })
    }

    pub fn inner(&self) -> &Tokenizer {
        &self.tokenizer
    }

    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        encode_plain(&self.tokenizer, text)
    }

    fn encode_message(&self, message: &Message, tokens: &mut Vec<u32>, flags: &mut Vec<bool>) -> Result<()> {
        let header_start = tokens.len();
        tokens.push(self.ids.start_header);
        tokens.extend(self.encode(&message.from)?);
        tokens.push(self.ids.end_header);
        tokens.extend(self.encode(&self.template.header_separator)?);
        flags.resize(flags.len() + (tokens.len() - header_start), false);

        let body_start = tokens.len();
        tokens.extend(self.encode(message.value.trim())?);
        tokens.push(self.ids.eot);
        flags.resize(flags.len() + (tokens.len() - body_start), message.is_completion());
        Ok(())
    }
}

impl ConversationTokenizer for ChatTokenizer {
    fn tokenize(&self, conversation: &Conversation) -> Result<TokenizedSample> {
        let mut tokens = vec![self.ids.bos];
        let mut flags  = vec![false];

        for message in &conversation.messages {
            self.encode_message(message, &mut tokens, &mut flags)?;
        }

        tokens.push(self.ids.eos);
        flags.push(true);

        Ok(TokenizedSample::new(tokens, flags)?)
    }

    fn pad_token_id(&self) -> u32 {
        self.pad_token_id
    }
}

/// Encode without the tokenizer's own post-processing specials.
pub fn encode_plain(tokenizer: &Tokenizer, text: &str) -> Result<Vec<u32>> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    let enc = tokenizer
        .encode(text, false)
        .map_err(|e| anyhow!("Tokenisation error: {e}"))?;
    Ok(enc.get_ids().to_vec())
}

fn special_id(tokenizer: &Tokenizer, token: &str) -> Result<u32> {
    tokenizer
        .token_to_id(token)
        .ok_or_else(|| anyhow!("Tokenizer has no id for special token '{token}'"))
}
