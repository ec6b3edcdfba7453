//! Durable task store
//!
//! The set of scheduled deliveries, mirrored to a single JSON file that is
//! rewritten whole on every mutation. The file is written to a sibling
//! `.tmp` path, synced and renamed over the original, so a crash mid-write
//! leaves the previous version intact.
//!
//! Mutations are computed on a copy and only swapped in once the write has
//! succeeded: after a `PersistenceFailure` memory still matches disk.
//!
//! Writes are blocking file I/O done while the async lock is held. On a
//! multi-threaded runtime they run under `block_in_place` so the worker's
//! other tasks move to another thread meanwhile.
//!
//! - **Version**: 1.0.0
//! - **Since**: 2.0.0

use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::Mutex;

use super::models::ScheduledDelivery;
use crate::core::ReminderError;

/// Store handle shared by every component that mutates it
pub type SharedTaskStore = Arc<Mutex<TaskStore>>;

#[derive(Debug)]
pub struct TaskStore {
    path: PathBuf,
    tasks: Vec<ScheduledDelivery>,
}

impl TaskStore {
    /// Load the store from `path`.
    ///
    /// Never fails: an absent, unreadable or unparseable file yields an empty
    /// store. An unparseable file is first copied aside to `<file>.corrupt`.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let tasks = read_tasks(&path);
        Self { path, tasks }
    }

    /// Discard the in-memory view and read the file again
    pub fn reload(&mut self) -> &[ScheduledDelivery] {
        self.tasks = read_tasks(&self.path);
        &self.tasks
    }

    pub fn into_shared(self) -> SharedTaskStore {
        Arc::new(Mutex::new(self))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored deliveries in insertion order
    pub fn tasks(&self) -> &[ScheduledDelivery] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, delivery: &ScheduledDelivery) -> bool {
        self.tasks.contains(delivery)
    }

    /// Insert one delivery and persist.
    ///
    /// Returns `false` without writing if an identical delivery is stored.
    pub fn append(&mut self, delivery: ScheduledDelivery) -> Result<bool, ReminderError> {
        if self.contains(&delivery) {
            return Ok(false);
        }
        let mut next = self.tasks.clone();
        next.push(delivery);
        self.commit(next)?;
        Ok(true)
    }

    /// Insert a batch with a single write: all of it lands or none of it does.
    ///
    /// Returns how many deliveries were new.
    pub fn append_all(&mut self, deliveries: &[ScheduledDelivery]) -> Result<usize, ReminderError> {
        let mut next = self.tasks.clone();
        for delivery in deliveries {
            if !next.contains(delivery) {
                next.push(delivery.clone());
            }
        }
        let added = next.len() - self.tasks.len();
        if added == 0 {
            return Ok(0);
        }
        self.commit(next)?;
        Ok(added)
    }

    /// Remove every stored delivery identical to `delivery` and persist.
    ///
    /// Returns the number removed; nothing is written when it is zero.
    pub fn remove(&mut self, delivery: &ScheduledDelivery) -> Result<usize, ReminderError> {
        let next: Vec<ScheduledDelivery> = self
            .tasks
            .iter()
            .filter(|t| *t != delivery)
            .cloned()
            .collect();
        let removed = self.tasks.len() - next.len();
        if removed == 0 {
            return Ok(0);
        }
        self.commit(next)?;
        Ok(removed)
    }

    /// Replace the whole content, e.g. with the filtered recovery baseline
    pub fn replace_all(&mut self, tasks: Vec<ScheduledDelivery>) -> Result<(), ReminderError> {
        self.commit(dedupe(tasks))
    }

    fn commit(&mut self, next: Vec<ScheduledDelivery>) -> Result<(), ReminderError> {
        match blocking(|| write_tasks(&self.path, &next)) {
            Ok(()) => {
                debug!("Persisted {} tasks to {}", next.len(), self.path.display());
                self.tasks = next;
                Ok(())
            }
            Err(e) => {
                error!(
                    "Failed to persist tasks to {}: {e} (keeping previous {} tasks)",
                    self.path.display(),
                    self.tasks.len()
                );
                Err(ReminderError::persistence(&self.path, e))
            }
        }
    }
}

fn read_tasks(path: &Path) -> Vec<ScheduledDelivery> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("📄 No task file at {} - starting empty", path.display());
            return vec![];
        }
        Err(e) => {
            warn!("Failed to read task file {}: {e} - starting empty", path.display());
            return vec![];
        }
    };

    if contents.trim().is_empty() {
        return vec![];
    }

    match serde_json::from_str::<Vec<ScheduledDelivery>>(&contents) {
        Ok(tasks) => {
            let tasks = dedupe(tasks);
            info!("📄 Loaded {} tasks from {}", tasks.len(), path.display());
            tasks
        }
        Err(e) => {
            warn!("Task file {} is not valid: {e} - starting empty", path.display());
            let backup = sibling_path(path, ".corrupt");
            match fs::copy(path, &backup) {
                Ok(_) => warn!("Kept unreadable task file as {}", backup.display()),
                Err(e) => warn!("Could not back up unreadable task file: {e}"),
            }
            vec![]
        }
    }
}

/// Run blocking `f`, handing the worker's other tasks off when the runtime allows it
fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread) => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

fn write_tasks(path: &Path, tasks: &[ScheduledDelivery]) -> io::Result<()> {
    let json = serde_json::to_string_pretty(tasks)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = sibling_path(path, ".tmp");
    let result = File::create(&tmp_path).and_then(|mut file| {
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    });

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// `tasks.json` -> `tasks.json<suffix>` in the same directory
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

fn dedupe(tasks: Vec<ScheduledDelivery>) -> Vec<ScheduledDelivery> {
    let mut seen = HashSet::new();
    tasks.into_iter().filter(|t| seen.insert(t.clone())).collect()
}
