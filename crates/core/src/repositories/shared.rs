//! Shared repository utilities.
//!
//! [`RecordRepository`] is the file-backed table used by every service in this module. It
//! knows how to allocate a record directory, write and read the YAML document inside it, and
//! walk the sharded tree to list a table.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/<table>/
//!   <s1>/
//!     <s2>/
//!       <uuid>/
//!         record.yaml
//! ```

use crate::config::CoreConfig;
use crate::constants::RECORD_FILENAME;
use crate::error::{LaudoError, LaudoResult};
use crate::records::{parse_record, render_record, StoredRecord};
use crate::ShardableUuid;
use std::marker::PhantomData;
use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

/// Creates a unique sharded directory within the base records directory.
///
/// Generates identifiers with `uuid_source` and creates the matching sharded directory,
/// retrying up to 5 times when the directory already exists.
///
/// # Errors
///
/// Returns [`LaudoError::RecordDirCreation`] if directory creation fails, or if no free
/// directory was found after 5 attempts.
pub(crate) fn create_uuid_and_shard_dir(
    base_dir: &Path,
    mut uuid_source: impl FnMut() -> ShardableUuid,
) -> LaudoResult<(ShardableUuid, PathBuf)> {
    for _attempt in 0..5 {
        let uuid = uuid_source();
        let candidate = uuid.sharded_dir(base_dir);

        if candidate.exists() {
            continue;
        }

        if let Some(parent) = candidate.parent() {
            fs::create_dir_all(parent).map_err(LaudoError::RecordDirCreation)?;
        }

        match fs::create_dir(&candidate) {
            Ok(()) => return Ok((uuid, candidate)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(LaudoError::RecordDirCreation(e)),
        }
    }

    Err(LaudoError::RecordDirCreation(io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to allocate a unique record directory after 5 attempts",
    )))
}

/// One table of the store.
#[derive(Debug, Clone)]
pub struct RecordRepository<T> {
    base_dir: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T: StoredRecord> RecordRepository<T> {
    pub fn new(cfg: &CoreConfig) -> Self {
        Self::at(cfg.table_dir(T::KIND))
    }

    /// A table rooted at `base_dir` instead of the configured data dir.
    pub fn at(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            _record: PhantomData,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn record_path(&self, id: &ShardableUuid) -> PathBuf {
        id.sharded_dir(&self.base_dir).join(RECORD_FILENAME)
    }

    /// Allocates a fresh id, builds the record with it and writes it.
    ///
    /// If the write fails the freshly created directory is removed again.
    pub fn create(&self, build: impl FnOnce(ShardableUuid) -> T) -> LaudoResult<T> {
        fs::create_dir_all(&self.base_dir).map_err(LaudoError::StorageDirCreation)?;
        let (id, record_dir) = create_uuid_and_shard_dir(&self.base_dir, ShardableUuid::new)?;
        let record = build(id);

        let written = render_record(&record).and_then(|yaml| {
            fs::write(record_dir.join(RECORD_FILENAME), yaml).map_err(LaudoError::FileWrite)
        });

        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_dir_all(&record_dir) {
                tracing::warn!(
                    "failed to remove partially created record {}: {}",
                    record_dir.display(),
                    cleanup
                );
            }
            return Err(e);
        }

        tracing::info!("created {} record {}", T::KIND, record.id());
        Ok(record)
    }

    /// Writes `record` at its own id, creating the directory when needed.
    pub fn write(&self, record: &T) -> LaudoResult<()> {
        let record_dir = record.id().sharded_dir(&self.base_dir);
        fs::create_dir_all(&record_dir).map_err(LaudoError::RecordDirCreation)?;

        let yaml = render_record(record)?;
        fs::write(record_dir.join(RECORD_FILENAME), yaml).map_err(LaudoError::FileWrite)?;

        tracing::debug!("wrote {} record {}", T::KIND, record.id());
        Ok(())
    }

    /// Reads the record stored at `id`.
    ///
    /// # Errors
    ///
    /// Returns [`LaudoError::NotFound`] when there is no such record.
    pub fn read(&self, id: &ShardableUuid) -> LaudoResult<T> {
        let path = self.record_path(id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(self.not_found(id)),
            Err(e) => return Err(LaudoError::FileRead(e)),
        };
        parse_record(&contents)
    }

    /// Like [`read`](Self::read), but a record owned by another user is also `NotFound`.
    pub fn read_owned(&self, user_id: &ShardableUuid, id: &ShardableUuid) -> LaudoResult<T> {
        let record = self.read(id)?;
        if record.user_id() != user_id {
            return Err(self.not_found(id));
        }
        Ok(record)
    }

    /// Removes the record directory.
    pub fn delete(&self, id: &ShardableUuid) -> LaudoResult<()> {
        let record_dir = id.sharded_dir(&self.base_dir);
        match fs::remove_dir_all(&record_dir) {
            Ok(()) => {
                tracing::info!("deleted {} record {}", T::KIND, id);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(self.not_found(id)),
            Err(e) => Err(LaudoError::FileDelete(e)),
        }
    }

    /// Lists every record in the table.
    ///
    /// Walks `<s1>/<s2>/<uuid>/record.yaml`. Files that cannot be read or parsed are logged
    /// and skipped.
    pub fn list(&self) -> Vec<T> {
        let mut records = Vec::new();

        let s1_iter = match fs::read_dir(&self.base_dir) {
            Ok(it) => it,
            Err(_) => return records,
        };
        for s1 in s1_iter.flatten() {
            let s1_path = s1.path();
            if !s1_path.is_dir() {
                continue;
            }

            let s2_iter = match fs::read_dir(&s1_path) {
                Ok(it) => it,
                Err(_) => continue,
            };

            for s2 in s2_iter.flatten() {
                let s2_path = s2.path();
                if !s2_path.is_dir() {
                    continue;
                }

                let id_iter = match fs::read_dir(&s2_path) {
                    Ok(it) => it,
                    Err(_) => continue,
                };

                for id_ent in id_iter.flatten() {
                    let record_path = id_ent.path().join(RECORD_FILENAME);
                    if !record_path.is_file() {
                        continue;
                    }

                    let contents = match fs::read_to_string(&record_path) {
                        Ok(contents) => contents,
                        Err(e) => {
                            tracing::warn!("failed to read {}: {}", record_path.display(), e);
                            continue;
                        }
                    };

                    match parse_record::<T>(&contents) {
                        Ok(record) => records.push(record),
                        Err(e) => {
                            tracing::warn!(
                                "failed to parse {}: {} - {}",
                                RECORD_FILENAME,
                                record_path.display(),
                                e
                            );
                        }
                    }
                }
            }
        }

        records
    }

    /// Records owned by `user_id`, in directory order.
    pub fn list_owned(&self, user_id: &ShardableUuid) -> Vec<T> {
        self.list()
            .into_iter()
            .filter(|record| record.user_id() == user_id)
            .collect()
    }

    fn not_found(&self, id: &ShardableUuid) -> LaudoError {
        LaudoError::NotFound {
            kind: T::KIND,
            id: id.to_string(),
        }
    }
}
