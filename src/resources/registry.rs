// src/resources/registry.rs

use std::collections::HashMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace};

/// How a redirect target is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Input redirection: the file must already exist.
    Read,
    /// Output redirection: created if absent, written in append mode.
    Write,
}

/// Dedup key of a registry entry: the resolved path plus the access mode.
///
/// Readers and writers of the same path get distinct entries, since one
/// descriptor cannot serve both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub path: PathBuf,
    pub access: Access,
}

impl ResourceKey {
    pub fn new(path: impl Into<PathBuf>, access: Access) -> Self {
        Self {
            path: path.into(),
            access,
        }
    }

    pub fn read(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Access::Read)
    }

    pub fn write(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Access::Write)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.access {
            Access::Read => "r",
            Access::Write => "w",
        };
        write!(f, "{}({})", self.path.display(), mode)
    }
}

/// One reference to a shared registry entry.
///
/// Not `Clone`: every lease corresponds to exactly one reference count and
/// is consumed by [`FileRegistry::release`].
pub struct SharedFile {
    key: ResourceKey,
    id: u64,
    file: Arc<File>,
}

impl SharedFile {
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// Duplicate the descriptor for handing to a child process. The
    /// duplicate shares the open file description (and offset).
    pub fn try_clone_file(&self) -> io::Result<File> {
        self.file.try_clone()
    }

    /// Whether two leases refer to the same open descriptor.
    pub fn same_descriptor(&self, other: &SharedFile) -> bool {
        Arc::ptr_eq(&self.file, &other.file)
    }
}

impl fmt::Debug for SharedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedFile")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

struct Entry {
    id: u64,
    file: Arc<File>,
    ref_count: usize,
}

/// Reference-counted table of open redirect targets.
///
/// At most one descriptor is open per [`ResourceKey`] at any time. The map
/// and every count are guarded by a single registry-wide lock; writes to the
/// files themselves are not serialized here.
#[derive(Default)]
pub struct FileRegistry {
    entries: Mutex<HashMap<ResourceKey, Entry>>,
    next_id: AtomicU64,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a reference to `key`, opening the file on first use.
    pub fn acquire(&self, key: &ResourceKey) -> io::Result<SharedFile> {
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get_mut(key) {
            entry.ref_count += 1;
            trace!(resource = %key, ref_count = entry.ref_count, "reusing open resource");
            return Ok(SharedFile {
                key: key.clone(),
                id: entry.id,
                file: Arc::clone(&entry.file),
            });
        }

        let file = Arc::new(open(&key.path, key.access)?);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        entries.insert(
            key.clone(),
            Entry {
                id,
                file: Arc::clone(&file),
                ref_count: 1,
            },
        );
        debug!(resource = %key, "opened resource");

        Ok(SharedFile {
            key: key.clone(),
            id,
            file,
        })
    }

    /// Drop one reference; the descriptor is closed when the count reaches
    /// zero. Releasing a lease whose entry is already gone is a no-op.
    pub fn release(&self, lease: SharedFile) {
        let mut entries = self.entries.lock();

        let Some(entry) = entries.get_mut(&lease.key) else {
            trace!(resource = %lease.key, "release of unknown resource ignored");
            return;
        };
        if entry.id != lease.id {
            // Entry was closed and reopened since this lease was taken.
            trace!(resource = %lease.key, "release of stale lease ignored");
            return;
        }

        entry.ref_count = entry.ref_count.saturating_sub(1);
        if entry.ref_count == 0 {
            entries.remove(&lease.key);
            debug!(resource = %lease.key, "closed resource");
        } else {
            trace!(resource = %lease.key, ref_count = entry.ref_count, "released resource");
        }
        // `lease` (and with it the last Arc when the entry is gone) drops here.
    }

    /// Current reference count of `key`, or `None` when it is not open.
    pub fn ref_count(&self, key: &ResourceKey) -> Option<usize> {
        self.entries.lock().get(key).map(|e| e.ref_count)
    }

    pub fn is_open(&self, key: &ResourceKey) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Number of distinct open descriptors.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for FileRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock();
        let mut map = f.debug_map();
        for (key, entry) in entries.iter() {
            map.entry(&key.to_string(), &entry.ref_count);
        }
        map.finish()
    }
}

fn open(path: &Path, access: Access) -> io::Result<File> {
    match access {
        Access::Read => File::open(path),
        Access::Write => OpenOptions::new().create(true).append(true).open(path),
    }
}
