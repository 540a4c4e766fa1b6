use crate::error::Result;
use crate::lyrics::TranslatedLine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Default maximum number of tracks kept in the cache
pub const DEFAULT_MAX_CACHE_SIZE: usize = 1000;

const CACHE_FORMAT_VERSION: u32 = 1;

/// On-disk layout. Entries are stored oldest-inserted first so that the
/// eviction order survives a restart.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    entries: Vec<PersistedEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    track_id: String,
    cached_at: DateTime<Utc>,
    lines: Vec<TranslatedLine>,
}

#[derive(Debug, Clone)]
struct CachedTranslation {
    lines: Vec<TranslatedLine>,
    cached_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CachedTranslation>,
    /// Track ids in insertion order, oldest first
    order: VecDeque<String>,
}

impl CacheInner {
    fn evict_overflow(&mut self, max_size: usize) -> Vec<String> {
        let mut evicted = Vec::new();
        while self.entries.len() > max_size {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            evicted.push(oldest);
        }
        evicted
    }
}

/// Bounded, file-backed cache of translated lyrics keyed by track id.
///
/// Eviction is strict FIFO: when the cache grows past `max_size` the
/// oldest-inserted track is dropped, regardless of how recently it was read.
/// Every mutation is persisted before the lock is released, so a concurrent
/// `get` never observes a state that is not also on disk (or about to be).
pub struct TranslationCache {
    /// Backing file; `None` keeps the cache in memory only
    path: Option<PathBuf>,
    max_size: usize,
    inner: Mutex<CacheInner>,
}

impl TranslationCache {
    /// Create an empty cache backed by `path` without reading it.
    pub fn new(path: impl Into<PathBuf>, max_size: usize) -> Self {
        Self {
            path: Some(path.into()),
            max_size: max_size.max(1),
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Create a cache that is never written to disk
    #[must_use]
    pub fn in_memory(max_size: usize) -> Self {
        Self {
            path: None,
            max_size: max_size.max(1),
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Create a cache backed by `path` and load any persisted entries
    pub fn open(path: impl Into<PathBuf>, max_size: usize) -> Self {
        let cache = Self::new(path, max_size);
        cache.load();
        cache
    }

    /// Path of the backing file, if the cache is persisted
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Maximum number of tracks kept
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    /// Number of cached tracks
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Check if the cache holds no tracks
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if a track is cached
    #[must_use]
    pub fn contains(&self, track_id: &str) -> bool {
        self.lock().entries.contains_key(track_id)
    }

    /// Look up translated lines for a track. Does not affect eviction order.
    #[must_use]
    pub fn get(&self, track_id: &str) -> Option<Vec<TranslatedLine>> {
        self.lock()
            .entries
            .get(track_id)
            .map(|entry| entry.lines.clone())
    }

    /// Insert or overwrite the entry for a track, evict the oldest entry if the
    /// cache is over capacity, and persist the result.
    ///
    /// Overwriting keeps the track's original insertion position. Persistence
    /// failures are logged and leave the in-memory state updated.
    pub fn add(&self, track_id: &str, lines: Vec<TranslatedLine>) {
        let mut inner = self.lock();

        let entry = CachedTranslation {
            lines,
            cached_at: Utc::now(),
        };
        if inner.entries.insert(track_id.to_string(), entry).is_none() {
            inner.order.push_back(track_id.to_string());
        }

        for evicted in inner.evict_overflow(self.max_size) {
            debug!("Evicted cached translation for track {}", evicted);
        }

        if let Some(path) = &self.path {
            if let Err(e) = Self::persist(path, &inner) {
                warn!(
                    "Failed to persist translation cache to {}: {}",
                    path.display(),
                    e
                );
            }
        }
    }

    /// Load persisted entries, replacing the in-memory state.
    ///
    /// A missing or empty file yields an empty cache. A file that cannot be
    /// read or decoded is deleted and an empty cache is used.
    pub fn load(&self) {
        let mut inner = self.lock();
        *inner = CacheInner::default();

        let Some(path) = &self.path else {
            return;
        };

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No translation cache at {}", path.display());
                return;
            }
            Err(e) => {
                warn!(
                    "Failed to read translation cache at {}: {}",
                    path.display(),
                    e
                );
                discard_file(path);
                return;
            }
        };

        if bytes.is_empty() {
            return;
        }

        let file: CacheFile = match serde_json::from_slice(&bytes) {
            Ok(file) => file,
            Err(e) => {
                warn!(
                    "Translation cache at {} is corrupt, discarding: {}",
                    path.display(),
                    e
                );
                discard_file(path);
                return;
            }
        };

        if file.version != CACHE_FORMAT_VERSION {
            warn!(
                "Translation cache version {} is not supported, discarding",
                file.version
            );
            discard_file(path);
            return;
        }

        for entry in file.entries {
            let cached = CachedTranslation {
                lines: entry.lines,
                cached_at: entry.cached_at,
            };
            if inner.entries.insert(entry.track_id.clone(), cached).is_none() {
                inner.order.push_back(entry.track_id);
            }
        }
        inner.evict_overflow(self.max_size);

        info!(
            "Loaded {} cached translation(s) from {}",
            inner.entries.len(),
            path.display()
        );
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        // The map is never left half-updated, so a poisoned lock is still usable
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write the full map to disk. Called with the lock held.
    fn persist(path: &Path, inner: &CacheInner) -> Result<()> {
        let entries = inner
            .order
            .iter()
            .filter_map(|track_id| {
                inner.entries.get(track_id).map(|entry| PersistedEntry {
                    track_id: track_id.clone(),
                    cached_at: entry.cached_at,
                    lines: entry.lines.clone(),
                })
            })
            .collect();

        let file = CacheFile {
            version: CACHE_FORMAT_VERSION,
            entries,
        };
        let bytes = serde_json::to_vec(&file)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write to a sibling file and rename so a crash never leaves a torn file
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, bytes)?;
        fs::rename(&tmp_path, path)?;

        Ok(())
    }
}

fn discard_file(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(
                "Failed to remove translation cache at {}: {}",
                path.display(),
                e
            );
        }
    }
}
