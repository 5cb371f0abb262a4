//! File-backed task store.
//!
//! The [`TaskStore`] persists the whole [`TaskList`] as one JSON file.
//! Writes go to a sibling temp file which is fsynced and renamed over the
//! target, so a reader never observes a half-written collection. All
//! read-modify-write operations run under a single async mutex, which
//! serializes the interactive menu and the sync endpoint inside one
//! process. Nothing is buffered: every mutation is on disk before it
//! returns.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use endel_proto::task::{Priority, Task, TaskError, TaskList};
use endel_proto::wire::{self, CodecError};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The task file exists but does not hold a valid collection.
    #[error("task file {path} is corrupt: {source}")]
    CorruptState {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying decode error.
        source: CodecError,
    },

    /// A positional operation referenced a missing task.
    #[error("task number {} does not exist (there are {len} tasks)", .index + 1)]
    IndexOutOfRange {
        /// Requested zero-based position.
        index: usize,
        /// Collection length when the call was made.
        len: usize,
    },

    /// Reading or writing the task file failed.
    #[error("task file I/O failed for {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The collection could not be serialized.
    #[error("failed to encode tasks: {0}")]
    Encode(#[source] CodecError),
}

impl StoreError {
    /// Whether the error means a write may have been lost.
    ///
    /// Callers stop instead of continuing with an unknown on-disk state.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Encode(_))
    }
}

impl From<TaskError> for StoreError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::IndexOutOfRange { index, len } => Self::IndexOutOfRange { index, len },
        }
    }
}

/// Durable task collection backed by a single JSON file.
pub struct TaskStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TaskStore {
    /// Creates a store for `path`. No I/O happens until first use.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the task file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted collection.
    ///
    /// A missing file is an empty collection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CorruptState`] if the file cannot be parsed,
    /// or [`StoreError::Io`] if it cannot be read.
    pub async fn load(&self) -> Result<TaskList, StoreError> {
        let Some(bytes) = self.raw_bytes().await? else {
            tracing::debug!(path = %self.path.display(), "no task file yet");
            return Ok(TaskList::new());
        };

        match wire::decode_collection(&bytes) {
            Ok(tasks) => {
                tracing::debug!(path = %self.path.display(), count = tasks.len(), "loaded tasks");
                Ok(TaskList::from(tasks))
            }
            Err(source) => {
                tracing::warn!(path = %self.path.display(), error = %source, "task file is corrupt");
                Err(StoreError::CorruptState {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    /// Returns the exact bytes on disk, or `None` if there is no file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on read failures other than not-found.
    pub async fn raw_bytes(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Persists `tasks`, replacing whatever was stored before.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] or [`StoreError::Encode`] if the write
    /// fails; the previous file is left intact in that case.
    pub async fn save(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.write_atomic(tasks).await
    }

    /// Replaces the whole collection. Last writer wins.
    ///
    /// # Errors
    ///
    /// Same as [`TaskStore::save`].
    pub async fn replace(&self, tasks: &[Task]) -> Result<(), StoreError> {
        self.save(tasks).await?;
        tracing::info!(path = %self.path.display(), count = tasks.len(), "task collection replaced");
        Ok(())
    }

    /// Appends a new open task and returns the updated collection.
    ///
    /// An unrecognized `priority` is stored as medium.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CorruptState`] if the current file is corrupt,
    /// or a write error.
    pub async fn add(
        &self,
        name: &str,
        due_date: NaiveDate,
        priority: &str,
    ) -> Result<TaskList, StoreError> {
        self.add_task(Task::new(name, due_date, Priority::parse_lenient(priority)))
            .await
    }

    /// Appends `task` as given and returns the updated collection.
    ///
    /// # Errors
    ///
    /// Same as [`TaskStore::add`].
    pub async fn add_task(&self, task: Task) -> Result<TaskList, StoreError> {
        let name = task.name.clone();
        let ((), tasks) = self
            .mutate(|list| {
                list.add(task);
                Ok(())
            })
            .await?;
        tracing::info!(name = %name, count = tasks.len(), "task added");
        Ok(tasks)
    }

    /// Marks the task at `index` completed and returns the updated collection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IndexOutOfRange`] (nothing is written) if
    /// `index` is outside the collection, or a load/write error.
    pub async fn complete(&self, index: usize) -> Result<TaskList, StoreError> {
        let (name, tasks) = self
            .mutate(|list| list.complete(index).map(|task| task.name.clone()))
            .await?;
        tracing::info!(index, name = %name, "task completed");
        Ok(tasks)
    }

    /// Removes the task at `index`, returning it with the updated collection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IndexOutOfRange`] (nothing is written) if
    /// `index` is outside the collection, or a load/write error.
    pub async fn delete(&self, index: usize) -> Result<(Task, TaskList), StoreError> {
        let (removed, tasks) = self.mutate(|list| list.delete(index)).await?;
        tracing::info!(index, name = %removed.name, "task deleted");
        Ok((removed, tasks))
    }

    /// Runs load → `apply` → save while holding the write lock.
    async fn mutate<T, F>(&self, apply: F) -> Result<(T, TaskList), StoreError>
    where
        F: FnOnce(&mut TaskList) -> Result<T, TaskError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut tasks = self.load().await?;
        let out = apply(&mut tasks)?;
        self.write_atomic(tasks.as_slice()).await?;
        Ok((out, tasks))
    }

    /// Writes to `<file>.tmp`, fsyncs, then renames over the target.
    async fn write_atomic(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let bytes = wire::encode_collection(tasks).map_err(StoreError::Encode)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let tmp_path = temp_path(&self.path);
        let io_err = |source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        };

        let mut file = tokio::fs::File::create(&tmp_path).await.map_err(io_err)?;
        file.write_all(&bytes).await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;
        drop(file);

        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(path = %self.path.display(), count = tasks.len(), "tasks saved");
        Ok(())
    }
}

/// `tareas.json` → `tareas.json.tmp`, in the same directory.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("tasks"), OsString::from);
    name.push(".tmp");
    path.with_file_name(name)
}
