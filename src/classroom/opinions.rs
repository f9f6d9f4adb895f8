// The opinion ledger: an append-only CSV file of votes.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classroom::*;

pub const LEDGER_HEADER: &str = "id,timestamp,bestCountry,worstCountry";

/// One stored vote.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VoteRecord {
    pub id: String,
    /// UTC, RFC 3339 with milliseconds.
    pub timestamp: String,
    #[serde(rename = "bestCountry")]
    pub best_country: String,
    #[serde(rename = "worstCountry")]
    pub worst_country: String,
}

/// A vote as submitted. Both fields are required, the option only reports
/// what was missing.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpinionSubmission {
    #[serde(rename = "bestCountry")]
    pub best_country: Option<String>,
    #[serde(rename = "worstCountry")]
    pub worst_country: Option<String>,
}

fn required_field(value: &Option<String>, name: &str) -> ClassroomResult<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => ValidationSnafu {
            message: format!("{} is missing", name),
        }
        .fail(),
    }
}

#[derive(Debug)]
pub struct OpinionLedger {
    path: PathBuf,
    // Serializes the accesses to the file within this process.
    lock: Mutex<()>,
}

impl OpinionLedger {
    /// Nothing is touched on disk until the first read or append.
    pub fn open(path: PathBuf) -> OpinionLedger {
        OpinionLedger {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn path_str(&self) -> String {
        self.path.display().to_string()
    }

    /// Creates the file with its header line, and the missing parent directories.
    fn ensure_file(&self) -> ClassroomResult<()> {
        if self.path.exists() {
            return Ok(());
        }
        let path = self.path_str();
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context(LedgerIoSnafu { path: &path })?;
            }
        }
        match OpenOptions::new().write(true).create_new(true).open(&self.path) {
            Ok(mut f) => {
                info!("ensure_file: creating ledger {:?}", path);
                f.write_all(format!("{}\n", LEDGER_HEADER).as_bytes())
                    .context(LedgerIoSnafu { path: &path })
            }
            // Created by another process in the meantime.
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e).context(LedgerIoSnafu { path: &path }),
        }
    }

    fn ends_with_newline(&self) -> ClassroomResult<bool> {
        let path = self.path_str();
        let mut f = File::open(&self.path).context(LedgerIoSnafu { path: &path })?;
        let len = f.metadata().context(LedgerIoSnafu { path: &path })?.len();
        if len == 0 {
            return Ok(true);
        }
        f.seek(SeekFrom::End(-1))
            .context(LedgerIoSnafu { path: &path })?;
        let mut last = [0u8; 1];
        f.read_exact(&mut last)
            .context(LedgerIoSnafu { path: &path })?;
        Ok(last[0] == b'\n')
    }

    fn encode_row(&self, record: &VoteRecord) -> ClassroomResult<Vec<u8>> {
        let path = self.path_str();
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(vec![]);
        wtr.serialize(record)
            .context(LedgerCsvSnafu { path: &path })?;
        wtr.flush().context(LedgerIoSnafu { path: &path })?;
        Ok(wtr.get_ref().clone())
    }

    /// Every stored vote, oldest first. Rows that cannot be read are skipped.
    pub fn read_all(&self) -> ClassroomResult<Vec<VoteRecord>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.ensure_file()?;
        let path = self.path_str();
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .context(LedgerCsvSnafu { path: &path })?;
        let mut res: Vec<VoteRecord> = Vec::new();
        for (idx, rec_r) in rdr.deserialize::<VoteRecord>().enumerate() {
            match rec_r {
                Ok(rec) => res.push(rec),
                Err(e) => warn!("read_all: {:?}: skipping row {}: {}", path, idx + 1, e),
            }
        }
        debug!("read_all: {} votes in {:?}", res.len(), path);
        Ok(res)
    }

    /// Validates the submission, stamps it and appends it to the file.
    pub fn append(&self, submission: &OpinionSubmission) -> ClassroomResult<VoteRecord> {
        let record = VoteRecord {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            best_country: required_field(&submission.best_country, "bestCountry")?,
            worst_country: required_field(&submission.worst_country, "worstCountry")?,
        };
        let row = self.encode_row(&record)?;

        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.ensure_file()?;
        let mut buf: Vec<u8> = Vec::with_capacity(row.len() + 1);
        if !self.ends_with_newline()? {
            buf.push(b'\n');
        }
        buf.extend_from_slice(&row);

        let path = self.path_str();
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .context(LedgerIoSnafu { path: &path })?;
        f.write_all(&buf).context(LedgerIoSnafu { path: &path })?;
        debug!("append: {:?}", record);
        Ok(record)
    }
}
