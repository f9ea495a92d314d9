//! Append-only JSONL record logs.
//!
//! The experiment runner writes one log per run, named
//! `responses_<timestamp>.jsonl`. Analysis reads exactly one log, passed in
//! explicitly as a [`RecordSource`]; [`latest_log`] is the helper a caller
//! uses once to pick the newest log in a results directory.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{ResponseRecord, Result, StudyError};

/// Handling of log lines that do not parse as a [`ResponseRecord`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Abort the whole batch on the first malformed line.
    #[default]
    Fail,
    /// Skip malformed lines and report how many were skipped.
    Skip,
}

/// Records loaded from one source.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBatch {
    pub records: Vec<ResponseRecord>,
    /// Lines skipped under [`MalformedPolicy::Skip`].
    pub malformed: usize,
    /// SHA-256 hex of the raw log bytes, when the source is a file.
    pub content_digest: Option<String>,
}

/// Where an analysis run gets its records from.
pub trait RecordSource {
    /// Human-readable origin, used in logs and the analysis manifest.
    fn describe(&self) -> String;

    /// Read every record.
    fn load(&self) -> Result<RecordBatch>;
}

/// A `responses_*.jsonl` file on disk.
#[derive(Debug, Clone)]
pub struct JsonlRecordLog {
    path: PathBuf,
    policy: MalformedPolicy,
}

impl JsonlRecordLog {
    pub fn new(path: impl Into<PathBuf>, policy: MalformedPolicy) -> Self {
        Self {
            path: path.into(),
            policy,
        }
    }
}

impl RecordSource for JsonlRecordLog {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<RecordBatch> {
        let raw = std::fs::read(&self.path)?;
        let digest = hex::encode(Sha256::digest(&raw));
        let (records, malformed) = parse_jsonl(&raw, self.policy)?;

        if malformed > 0 {
            tracing::warn!(
                path = %self.path.display(),
                malformed = malformed,
                "skipped malformed record lines"
            );
        }

        Ok(RecordBatch {
            records,
            malformed,
            content_digest: Some(digest),
        })
    }
}

/// Records already in memory (tests, re-analysis of a filtered batch).
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecords(pub Vec<ResponseRecord>);

impl RecordSource for InMemoryRecords {
    fn describe(&self) -> String {
        format!("in-memory ({} records)", self.0.len())
    }

    fn load(&self) -> Result<RecordBatch> {
        Ok(RecordBatch {
            records: self.0.clone(),
            malformed: 0,
            content_digest: None,
        })
    }
}

/// Parse JSONL bytes. Blank lines are ignored; line numbers are 1-based.
///
/// Each line must be valid UTF-8 holding one JSON record; a line failing
/// either check is malformed. Returns the parsed records and the number of
/// malformed lines skipped.
pub fn parse_jsonl(
    raw: impl AsRef<[u8]>,
    policy: MalformedPolicy,
) -> Result<(Vec<ResponseRecord>, usize)> {
    let mut records = Vec::new();
    let mut malformed = 0usize;

    for (idx, bytes) in raw.as_ref().split(|b| *b == b'\n').enumerate() {
        let line = idx + 1;
        let parsed = std::str::from_utf8(bytes)
            .map_err(|source| StudyError::InvalidUtf8 { line, source })
            .and_then(|text| {
                let text = text.strip_suffix('\r').unwrap_or(text);
                if text.trim().is_empty() {
                    return Ok(None);
                }
                serde_json::from_str::<ResponseRecord>(text)
                    .map(Some)
                    .map_err(|source| StudyError::MalformedRecord { line, source })
            });

        match parsed {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(err) => match policy {
                MalformedPolicy::Fail => return Err(err),
                MalformedPolicy::Skip => {
                    tracing::debug!(line = line, error = %err, "skipping malformed record");
                    malformed += 1;
                }
            },
        }
    }

    Ok((records, malformed))
}

fn log_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^responses_.*\.jsonl$").expect("static log name pattern is valid")
    })
}

/// The lexicographically greatest `responses_*.jsonl` file in `dir`.
///
/// Timestamped names sort chronologically, so this is the newest run.
pub fn latest_log(dir: &Path) -> Result<PathBuf> {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StudyError::NoRecordLog {
                dir: dir.to_path_buf(),
            })
        }
        Err(e) => return Err(StudyError::Io(e)),
    };

    let mut candidates: Vec<PathBuf> = read_dir
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| log_name_pattern().is_match(n))
        })
        .collect();
    candidates.sort();

    candidates.pop().ok_or_else(|| StudyError::NoRecordLog {
        dir: dir.to_path_buf(),
    })
}

/// `responses_<ISO-8601 UTC>.jsonl` with `:` replaced so the name is portable.
pub fn log_file_name(started_at: DateTime<Utc>) -> String {
    let stamp = started_at
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
        .replace(':', "-");
    format!("responses_{stamp}.jsonl")
}

/// Writes one JSON record per line to a new log file.
pub struct RecordLogWriter {
    path: PathBuf,
    out: BufWriter<File>,
    written: usize,
}

impl RecordLogWriter {
    /// Create `<dir>/responses_<started_at>.jsonl`, creating `dir` if needed.
    pub fn create(dir: &Path, started_at: DateTime<Utc>) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(log_file_name(started_at));
        let file = File::create(&path)?;
        Ok(Self {
            path,
            out: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn append(&mut self, record: &ResponseRecord) -> Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush buffered lines and return the log path.
    pub fn finish(mut self) -> Result<PathBuf> {
        self.out.flush()?;
        Ok(self.path)
    }
}
