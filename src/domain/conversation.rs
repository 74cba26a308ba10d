// ============================================================
// Layer 3 — Conversation Domain Type
// ============================================================
// A chat conversation in the ShareGPT / SlimOrca layout:
//
//   [
//     {"from": "system", "value": "You are a helpful assistant."},
//     {"from": "human",  "value": "What is 2 + 2?"},
//     {"from": "gpt",    "value": "4"}
//   ]
//
// Only messages from a completion role are trained on when
// train_on_completions_only is set.

use serde::{Deserialize, Serialize};

/// Roles whose messages count as model output.
pub const COMPLETION_ROLES: [&str; 2] = ["gpt", "assistant"];

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Speaker role, e.g. "system", "human", "gpt"
    pub from: String,

    /// Raw message text
    pub value: String,
}

impl Message {
    pub fn new(from: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            from:  from.into(),
            value: value.into(),
        }
    }

    /// Whether this message is part of the assistant's response.
    pub fn is_completion(&self) -> bool {
        COMPLETION_ROLES.contains(&self.from.as_str())
    }
}

/// An ordered list of messages.
///
/// `#[serde(transparent)]` lets a bare JSON array deserialize
/// straight into a Conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_roles() {
        assert!(Message::new("gpt", "hi").is_completion());
        assert!(Message::new("assistant", "hi").is_completion());
        assert!(!Message::new("human", "hi").is_completion());
        assert!(!Message::new("system", "hi").is_completion());
    }

    #[test]
    fn test_deserializes_from_bare_array() {
        let json = r#"[{"from": "human", "value": "hi"}, {"from": "gpt", "value": "hello"}]"#;
        let conv: Conversation = serde_json::from_str(json).unwrap();
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.messages[1], Message::new("gpt", "hello"));
    }
}
