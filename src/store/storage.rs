// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Storage collaborators: where documents come from and where saves go.

use std::collections::VecDeque;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

/// Outcome of asking the user for a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Picked {
    Document(String),
    /// The user dismissed the picker. Not an error.
    Aborted,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("refusing to write outside the output directory: {name:?}")]
    InvalidFileName { name: String },
    #[error("storage worker failed: {0}")]
    Worker(String),
    #[error("file dialog host disconnected")]
    Disconnected,
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn pick_file_for_read(&self) -> Result<Picked, StorageError>;
    async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError>;
}

/// Filesystem storage: reads one preselected document, writes into an output directory.
#[derive(Debug, Clone)]
pub struct FsStorage {
    read_path: Option<PathBuf>,
    out_dir: PathBuf,
}

impl FsStorage {
    pub fn new(read_path: Option<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            read_path,
            out_dir: out_dir.into(),
        }
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn pick_file_for_read(&self) -> Result<Picked, StorageError> {
        let Some(path) = self.read_path.clone() else {
            return Ok(Picked::Aborted);
        };
        let text = tokio::task::spawn_blocking(move || {
            fs::read_to_string(&path).map_err(|source| StorageError::Io { path, source })
        })
        .await
        .map_err(|err| StorageError::Worker(err.to_string()))??;
        Ok(Picked::Document(text))
    }

    async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        if Path::new(name).file_name().and_then(|n| n.to_str()) != Some(name) {
            return Err(StorageError::InvalidFileName {
                name: name.to_owned(),
            });
        }
        let path = self.out_dir.join(name);
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|err| StorageError::Worker(err.to_string()))?
    }
}

fn rename_overwrite(from: &Path, to: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::AlreadyExists | io::ErrorKind::PermissionDenied
                ) =>
            {
                let _ = fs::remove_file(to);
                fs::rename(from, to)
            }
            Err(err) => Err(err),
        }
    }

    #[cfg(not(windows))]
    {
        fs::rename(from, to)
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> StorageError {
    let path = path.to_path_buf();
    move |source| StorageError::Io { path, source }
}

/// Writes to a sibling temp file and renames it over `path`.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(io_err(parent))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let tmp_path = parent.join(format!(".dfd.tmp.{file_name}.{nanos}"));

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .map_err(io_err(&tmp_path))?;
    file.write_all(contents).map_err(io_err(&tmp_path))?;
    file.sync_all().map_err(io_err(&tmp_path))?;
    drop(file);

    if let Err(source) = rename_overwrite(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(StorageError::Io {
            path: path.to_path_buf(),
            source,
        });
    }
    debug!(path = %path.display(), bytes = contents.len(), "document written");
    Ok(())
}

/// In-memory storage for hosts and tests. Picks are served from a queue (empty queue means the
/// user cancelled); writes are recorded.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    picks: Mutex<VecDeque<Picked>>,
    written: Mutex<Vec<(String, Vec<u8>)>>,
    pick_count: Mutex<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(text: impl Into<String>) -> Self {
        let storage = Self::new();
        storage.push_pick(Picked::Document(text.into()));
        storage
    }

    pub fn push_pick(&self, picked: Picked) {
        self.picks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(picked);
    }

    pub fn written(&self) -> Vec<(String, Vec<u8>)> {
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times the picker was opened.
    pub fn pick_count(&self) -> usize {
        *self.pick_count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn pick_file_for_read(&self) -> Result<Picked, StorageError> {
        *self.pick_count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(self
            .picks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(Picked::Aborted))
    }

    async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_owned(), bytes.to_vec()));
        Ok(())
    }
}

/// Signals a file-dialog host reports back to a [`DialogPicker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogEvent {
    FileChosen(String),
    /// Explicit dismissal; resolves the pick immediately.
    Cancelled,
    /// The window got focus back. Hosts that cannot report a dismissal send this instead, and the
    /// pick resolves to aborted unless a file arrives within the fallback delay.
    FocusRegained,
}

/// Host side of a [`DialogPicker`].
#[derive(Debug)]
pub struct DialogHost {
    events: mpsc::UnboundedSender<DialogEvent>,
    opened: mpsc::UnboundedReceiver<()>,
}

impl DialogHost {
    /// Waits until the picker opens a dialog. `false` once the picker is gone.
    pub async fn wait_opened(&mut self) -> bool {
        self.opened.recv().await.is_some()
    }

    pub fn send(&self, event: DialogEvent) -> Result<(), StorageError> {
        self.events
            .send(event)
            .map_err(|_| StorageError::Disconnected)
    }
}

/// How long a [`DialogPicker`] waits before treating an open dialog as dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogTimings {
    /// Grace period after [`DialogEvent::FocusRegained`] for a chosen file to arrive.
    pub fallback: Duration,
    /// Upper bound on the whole pick, for hosts that never report focus or cancellation.
    pub limit: Duration,
}

impl Default for DialogTimings {
    fn default() -> Self {
        Self {
            fallback: Duration::from_millis(300),
            limit: Duration::from_secs(120),
        }
    }
}

/// Storage whose reads go through an interactive file dialog driven by a [`DialogHost`].
pub struct DialogPicker {
    writer: Arc<dyn Storage>,
    timings: DialogTimings,
    events: tokio::sync::Mutex<mpsc::UnboundedReceiver<DialogEvent>>,
    opened: mpsc::UnboundedSender<()>,
}

impl DialogPicker {
    pub fn new(writer: Arc<dyn Storage>, timings: DialogTimings) -> (Self, DialogHost) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (opened_tx, opened_rx) = mpsc::unbounded_channel();
        let picker = Self {
            writer,
            timings,
            events: tokio::sync::Mutex::new(events_rx),
            opened: opened_tx,
        };
        let host = DialogHost {
            events: events_tx,
            opened: opened_rx,
        };
        (picker, host)
    }
}

#[async_trait]
impl Storage for DialogPicker {
    async fn pick_file_for_read(&self) -> Result<Picked, StorageError> {
        let mut events = self.events.lock().await;
        while events.try_recv().is_ok() {}
        self.opened
            .send(())
            .map_err(|_| StorageError::Disconnected)?;

        let limit = Instant::now() + self.timings.limit;
        let mut fallback: Option<Instant> = None;
        loop {
            let deadline = fallback.map_or(limit, |at| at.min(limit));
            tokio::select! {
                event = events.recv() => match event {
                    Some(DialogEvent::FileChosen(text)) => return Ok(Picked::Document(text)),
                    Some(DialogEvent::Cancelled) => return Ok(Picked::Aborted),
                    Some(DialogEvent::FocusRegained) => {
                        fallback.get_or_insert_with(|| Instant::now() + self.timings.fallback);
                    }
                    None => return Err(StorageError::Disconnected),
                },
                _ = sleep_until(deadline) => {
                    if deadline < limit {
                        warn!(
                            fallback_ms = self.timings.fallback.as_millis() as u64,
                            "no file chosen after focus returned; treating the dialog as dismissed"
                        );
                    } else {
                        warn!(
                            limit_ms = self.timings.limit.as_millis() as u64,
                            "dialog reported nothing before the pick limit; treating it as dismissed"
                        );
                    }
                    return Ok(Picked::Aborted);
                }
            }
        }
    }

    async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.writer.write_file(name, bytes).await
    }
}
