use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::clock::is_rfc3339;
use crate::error::SessionStoreError;
use crate::paths::{is_safe_session_id, session_file_name, session_root};
use crate::schema::SessionRecord;

/// Writes one snapshot file per session under `<log_dir>/sessions/`.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    pub fn new(log_dir: &Path) -> Self {
        Self {
            root: session_root(log_dir),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.root.join(session_file_name(session_id))
    }

    /// Persists `record` as pretty JSON keyed by its session id.
    ///
    /// The file is created exclusively; an existing record for the same id is
    /// an error and is left untouched.
    pub fn save<Fs: Serialize>(
        &self,
        record: &SessionRecord<Fs>,
    ) -> Result<PathBuf, SessionStoreError> {
        if !is_safe_session_id(&record.sid) {
            return Err(SessionStoreError::InvalidSessionId {
                sid: record.sid.clone(),
            });
        }

        fs::create_dir_all(&self.root).map_err(|source| {
            SessionStoreError::io("creating session directory", &self.root, source)
        })?;

        let path = self.path_for(&record.sid);
        let mut body = serde_json::to_vec_pretty(record)
            .map_err(|source| SessionStoreError::json_serialize(&path, source))?;
        body.push(b'\n');

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(source) if source.kind() == ErrorKind::AlreadyExists => {
                return Err(SessionStoreError::AlreadyExists { path });
            }
            Err(source) => {
                return Err(SessionStoreError::io("creating session file", &path, source));
            }
        };
        file.write_all(&body)
            .and_then(|()| file.sync_all())
            .map_err(|source| SessionStoreError::io("writing session file", &path, source))?;

        Ok(path)
    }

    /// Reads a snapshot back, validating its timestamp and working directory.
    pub fn load<Fs: DeserializeOwned>(path: &Path) -> Result<SessionRecord<Fs>, SessionStoreError> {
        let body = fs::read(path)
            .map_err(|source| SessionStoreError::io("reading session file", path, source))?;
        let record = serde_json::from_slice::<SessionRecord<Fs>>(&body).map_err(|source| {
            SessionStoreError::JsonParse {
                path: path.to_path_buf(),
                source,
            }
        })?;

        if !is_rfc3339(&record.ts) {
            return Err(SessionStoreError::InvalidTimestamp {
                path: path.to_path_buf(),
                field: "ts",
                value: record.ts,
            });
        }

        if !record.cwd.starts_with('/') {
            return Err(SessionStoreError::NonAbsoluteCwd {
                path: path.to_path_buf(),
                cwd: record.cwd,
            });
        }

        Ok(record)
    }
}
