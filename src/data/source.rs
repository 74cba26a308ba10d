// ============================================================
// Layer 4 — Record Sources
// ============================================================
// Restartable record streams feeding the WindowEmitter.
//
//   InMemorySource    — a Vec of records, replayed on restart
//   JsonlRecordSource — one JSON record per line of a file,
//                       sharded by data-parallel rank and
//                       shuffled once with a seeded RNG
//
// Sharding is round-robin over line order:
//   rank r of n keeps records r, r + n, r + 2n, ...
// so every record lands on exactly one rank.
//
// The shuffle is seeded, and every restart replays the same
// order. Each rank shuffles only its own shard.

use anyhow::{Context, Result};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::domain::{
    error::PackingError,
    traits::{Record, RecordSource},
};

// ─── InMemorySource ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: Vec<Record>,
    cursor:  usize,
}

impl InMemorySource {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSource for InMemorySource {
    fn next_record(&mut self) -> Result<Option<Record>> {
        let record = self.records.get(self.cursor).cloned();
        if record.is_some() {
            self.cursor += 1;
        }
        Ok(record)
    }

    fn restart(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }
}

// ─── JsonlRecordSource ────────────────────────────────────────────────────────
/// Which slice of the dataset this process reads, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardConfig {
    pub dp_rank:       usize,
    pub dp_ranks_size: usize,
    pub seed:          u64,
}

impl ShardConfig {
    pub fn single(seed: u64) -> Self {
        Self { dp_rank: 0, dp_ranks_size: 1, seed }
    }

    pub fn validate(&self) -> Result<(), PackingError> {
        if self.dp_ranks_size == 0 {
            return Err(PackingError::InvalidConfig("dp_ranks_size must be at least 1".into()));
        }
        if self.dp_rank >= self.dp_ranks_size {
            return Err(PackingError::InvalidConfig(format!(
                "dp_rank {} is out of range for {} ranks",
                self.dp_rank, self.dp_ranks_size
            )));
        }
        Ok(())
    }

    fn owns(&self, index: usize) -> bool {
        index % self.dp_ranks_size == self.dp_rank
    }
}

/// Reads a JSONL file once, keeps this rank's shard in memory
/// and replays it forever.
#[derive(Debug)]
pub struct JsonlRecordSource {
    inner: InMemorySource,
}

impl JsonlRecordSource {
    pub fn open(path: impl AsRef<Path>, shard: ShardConfig) -> Result<Self> {
        shard.validate()?;
        let path = path.as_ref();

        let file = File::open(path)
            .with_context(|| format!("Cannot read records from '{}'", path.display()))?;

        // Other ranks' lines are counted but never parsed or kept.
        let mut records = Vec::new();
        let mut index = 0usize;
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| {
                format!("Cannot read line {} of '{}'", line_no + 1, path.display())
            })?;
            if line.trim().is_empty() {
                continue;
            }
            if shard.owns(index) {
                let record: Record = serde_json::from_str(&line).with_context(|| {
                    format!("Invalid JSON on line {} of '{}'", line_no + 1, path.display())
                })?;
                records.push(record);
            }
            index += 1;
        }

        let mut rng = StdRng::seed_from_u64(shard.seed);
        records.shuffle(&mut rng);

        tracing::info!(
            "Rank {}/{} owns {} of {} records in '{}'",
            shard.dp_rank,
            shard.dp_ranks_size,
            records.len(),
            index,
            path.display()
        );

        Ok(Self { inner: InMemorySource::new(records) })
    }
}

impl RecordSource for JsonlRecordSource {
    fn next_record(&mut self) -> Result<Option<Record>> {
        self.inner.next_record()
    }

    fn restart(&mut self) -> Result<()> {
        self.inner.restart()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;
    use std::io::Write;

    fn write_jsonl(n: usize) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        for i in 0..n {
            writeln!(f, "{}", json!({ "id": i, "conversations": [] })).unwrap();
            if i % 4 == 0 {
                // blank lines are ignored and do not count as records
                writeln!(f).unwrap();
            }
        }
        f
    }

    fn drain(source: &mut impl RecordSource) -> Vec<u64> {
        let mut ids = Vec::new();
        while let Some(r) = source.next_record().unwrap() {
            ids.push(r["id"].as_u64().unwrap());
        }
        ids
    }

    #[test]
    fn test_in_memory_replays_after_restart() {
        let mut src = InMemorySource::new(vec![json!({"id": 0}), json!({"id": 1})]);
        assert_eq!(drain(&mut src), vec![0, 1]);
        assert!(src.next_record().unwrap().is_none());

        src.restart().unwrap();
        assert_eq!(drain(&mut src), vec![0, 1]);
    }

    #[test]
    fn test_shards_are_disjoint_and_cover_everything() {
        let file = write_jsonl(23);
        let mut seen = HashSet::new();
        let mut total = 0;

        for rank in 0..3 {
            let shard = ShardConfig { dp_rank: rank, dp_ranks_size: 3, seed: 7 };
            let mut src = JsonlRecordSource::open(file.path(), shard).unwrap();
            let ids = drain(&mut src);
            assert!(ids.iter().all(|id| *id as usize % 3 == rank));
            total += ids.len();
            seen.extend(ids);
        }

        assert_eq!(total, 23);
        assert_eq!(seen.len(), 23);
    }

    #[test]
    fn test_shuffle_is_deterministic_per_seed() {
        let file = write_jsonl(50);
        let a = drain(&mut JsonlRecordSource::open(file.path(), ShardConfig::single(1)).unwrap());
        let b = drain(&mut JsonlRecordSource::open(file.path(), ShardConfig::single(1)).unwrap());
        let c = drain(&mut JsonlRecordSource::open(file.path(), ShardConfig::single(2)).unwrap());

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, (0..50).collect::<Vec<u64>>());
    }

    #[test]
    fn test_restart_replays_same_order() {
        let file = write_jsonl(10);
        let mut src = JsonlRecordSource::open(file.path(), ShardConfig::single(3)).unwrap();
        let first = drain(&mut src);
        src.restart().unwrap();
        assert_eq!(drain(&mut src), first);
    }

    #[test]
    fn test_invalid_rank_rejected() {
        let file = write_jsonl(3);
        let shard = ShardConfig { dp_rank: 2, dp_ranks_size: 2, seed: 0 };
        assert!(JsonlRecordSource::open(file.path(), shard).is_err());

        let shard = ShardConfig { dp_rank: 0, dp_ranks_size: 0, seed: 0 };
        assert!(shard.validate().is_err());
    }

    #[test]
    fn test_bad_json_reports_line() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "{{\"id\": 0}}").unwrap();
        writeln!(f, "not json").unwrap();
        let err = JsonlRecordSource::open(f.path(), ShardConfig::single(0)).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_other_ranks_lines_are_not_parsed() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "{}", json!({ "id": 0 })).unwrap();
        writeln!(f, "not json, owned by rank 1").unwrap();
        writeln!(f).unwrap();
        writeln!(f, "{}", json!({ "id": 2 })).unwrap();

        let shard = ShardConfig { dp_rank: 0, dp_ranks_size: 2, seed: 0 };
        let mut src = JsonlRecordSource::open(f.path(), shard).unwrap();
        let mut ids = drain(&mut src);
        ids.sort();
        assert_eq!(ids, vec![0, 2]);

        let shard = ShardConfig { dp_rank: 1, dp_ranks_size: 2, seed: 0 };
        assert!(JsonlRecordSource::open(f.path(), shard).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonlRecordSource::open(dir.path().join("absent.jsonl"), ShardConfig::single(0)).unwrap_err();
        assert!(err.to_string().contains("Cannot read records"));
    }
}
