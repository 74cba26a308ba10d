use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::domain::window::TrainingItem;

/// Writes emitted items as JSON Lines, one item per line.
pub struct WindowWriter {
    path:    PathBuf,
    out:     BufWriter<File>,
    written: u64,
}

impl WindowWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;
        Ok(Self { path, out: BufWriter::new(file), written: 0 })
    }

    pub fn write(&mut self, item: &TrainingItem) -> Result<()> {
        serde_json::to_writer(&mut self.out, item)?;
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Flush buffered lines to disk.
    pub fn finish(mut self) -> Result<u64> {
        self.out
            .flush()
            .with_context(|| format!("Cannot flush '{}'", self.path.display()))?;
        tracing::info!("Wrote {} items to '{}'", self.written, self.path.display());
        Ok(self.written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::window::{NonPackedItem, PackedWindow};

    #[test]
    fn test_one_line_per_item() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.jsonl");

        let mut writer = WindowWriter::create(&path).unwrap();
        writer
            .write(&TrainingItem::Packed(PackedWindow {
                input_ids:      vec![1, 2],
                label_mask:     vec![0, 1],
                position_ids:   vec![0, 1],
                sample_lengths: vec![2],
            }))
            .unwrap();
        writer
            .write(&TrainingItem::NonPacked(NonPackedItem {
                input_ids:  vec![3],
                input_mask: vec![1],
                label_mask: vec![1],
            }))
            .unwrap();
        assert_eq!(writer.finish().unwrap(), 2);

        let text = std::fs::read_to_string(&path).unwrap();
        let items: Vec<TrainingItem> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].as_packed().is_some());
        assert!(items[1].as_non_packed().is_some());
    }
}
