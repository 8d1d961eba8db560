//! JSONL (JSON Lines) files.
//!
//! Each line is a valid JSON object representing one record.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::{RecordKind, StorageConfig, StorageError};

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    /// Create a new JSONL writer for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Create a writer for a record type.
    pub fn for_kind(config: &StorageConfig, kind: RecordKind) -> Self {
        Self::new(config.record_path(kind))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure the parent directory exists.
    fn ensure_dir(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Append records to the file.
    pub fn append_batch<'a, I>(&self, records: I) -> Result<usize, StorageError>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        self.ensure_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let count = write_lines(BufWriter::new(file), records)?;
        debug!("Appended {} records to {:?}", count, self.path);
        Ok(count)
    }

    /// Write records, replacing the entire file via a sibling temp file.
    pub fn write_all<'a, I>(&self, records: I) -> Result<usize, StorageError>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        self.ensure_dir()?;

        let tmp = self.path.with_extension("jsonl.tmp");
        let count = write_lines(BufWriter::new(File::create(&tmp)?), records)?;
        fs::rename(&tmp, &self.path)?;

        debug!("Wrote {} records to {:?}", count, self.path);
        Ok(count)
    }
}

fn write_lines<'a, T, I, W>(mut writer: BufWriter<W>, records: I) -> Result<usize, StorageError>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
    W: Write,
{
    let mut count = 0;
    for record in records {
        let json = serde_json::to_string(record)?;
        writeln!(writer, "{}", json)?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    /// Create a new JSONL reader for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Create a reader for a record type.
    pub fn for_kind(config: &StorageConfig, kind: RecordKind) -> Self {
        Self::new(config.record_path(kind))
    }

    /// Check if the file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read all records from the file. A missing file reads as empty;
    /// unparseable lines are logged and skipped.
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Failed to parse line {} in {:?}: {}", i + 1, self.path, e);
                }
            }
        }

        debug!("Read {} records from {:?}", records.len(), self.path);
        Ok(records)
    }
}
