// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Locates and loads a HuggingFace tokenizer.json.
//
// The path may point at the JSON file itself or at a directory
// that contains one (the usual layout of a downloaded model).

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

pub struct TokenizerStore {
    path: PathBuf,
}

impl TokenizerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolved location of tokenizer.json
    pub fn file(&self) -> PathBuf {
        if self.path.is_dir() {
            self.path.join("tokenizer.json")
        } else {
            self.path.clone()
        }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        let file = self.file();
        ensure_exists(&file)?;

        let tokenizer = Tokenizer::from_file(&file).map_err(|e| {
            anyhow::anyhow!("Cannot load tokenizer from '{}': {}", file.display(), e)
        })?;

        tracing::info!(
            "Loaded tokenizer from '{}' (vocab size {})",
            file.display(),
            tokenizer.get_vocab_size(true)
        );
        Ok(tokenizer)
    }
}

fn ensure_exists(file: &Path) -> Result<()> {
    std::fs::metadata(file)
        .map(|_| ())
        .with_context(|| format!("No tokenizer found at '{}'", file.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::chat_tokenizer::fixtures;

    #[test]
    fn test_loads_from_file_or_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("tokenizer.json");
        std::fs::write(&file, fixtures::tokenizer_json()).unwrap();

        let from_file = TokenizerStore::new(&file).load().unwrap();
        let from_dir  = TokenizerStore::new(dir.path()).load().unwrap();
        assert_eq!(from_file.token_to_id("gpt"), from_dir.token_to_id("gpt"));
        assert!(from_file.token_to_id("<|eot_id|>").is_some());
    }

    #[test]
    fn test_missing_tokenizer_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TokenizerStore::new(dir.path()).load().unwrap_err();
        assert!(err.to_string().contains("No tokenizer found"));
    }
}
