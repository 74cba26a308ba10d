// ============================================================
// Layer 6 — Run Manifest
// ============================================================
// Records what a packing run was asked to do and what it did:
//
//   <output_dir>/
//     run_config.json   ← written before the first item
//     run_summary.json  ← EmitterStats after the last item
//
// This is a record of the run, not a resume point: buffered
// samples are not persisted, so a run cannot be continued
// mid-stream.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::pack_use_case::PackConfig;
use crate::data::emitter::EmitterStats;

pub struct ManifestStore {
    dir: PathBuf,
}

impl ManifestStore {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn save_config(&self, cfg: &PackConfig) -> Result<()> {
        self.write_json("run_config.json", cfg)
    }

    pub fn load_config(&self) -> Result<PackConfig> {
        self.read_json("run_config.json")
    }

    pub fn save_summary(&self, stats: &EmitterStats) -> Result<()> {
        self.write_json("run_summary.json", stats)
    }

    pub fn load_summary(&self) -> Result<EmitterStats> {
        self.read_json("run_summary.json")
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Saved '{}'", path.display());
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }
}
