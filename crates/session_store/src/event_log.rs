use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::SessionStoreError;
use crate::schema::EventRecord;

/// Append-only JSON-lines sink shared by every session.
///
/// Each record is serialized up front and written with a single
/// `write_all` under the mutex, so lines from concurrent sessions never
/// interleave.
#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl EventLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionStoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| SessionStoreError::io("creating log directory", parent, source))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| SessionStoreError::io("opening event log for append", &path, source))?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &EventRecord) -> Result<(), SessionStoreError> {
        let mut line = serde_json::to_string(record)
            .map_err(|source| SessionStoreError::json_serialize(&self.path, source))?;
        line.push('\n');

        let mut file = lock_unpoisoned(&self.file);
        file.write_all(line.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|source| SessionStoreError::io("appending event", &self.path, source))
    }

    /// Reads every record from a log file, in write order.
    pub fn read_all(path: &Path) -> Result<Vec<EventRecord>, SessionStoreError> {
        let file = File::open(path)
            .map_err(|source| SessionStoreError::io("opening event log", path, source))?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();
        for (line_index, line_result) in reader.lines().enumerate() {
            let line_number = line_index + 1;
            let line =
                line_result.map_err(|source| SessionStoreError::io_line(path, line_number, source))?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str::<EventRecord>(&line)
                .map_err(|source| SessionStoreError::json_line(path, line_number, source))?;
            records.push(record);
        }

        Ok(records)
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
