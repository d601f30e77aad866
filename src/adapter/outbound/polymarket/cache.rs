//! On-disk market snapshot cache.
//!
//! One JSON file per tag set, served while younger than the TTL. Only the
//! catalog snapshot is ever cached; order books must always be fetched
//! fresh (a stale book would corrupt the execution math).

use std::collections::BTreeSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::market::Market;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    tags: BTreeSet<String>,
    markets: Vec<Market>,
}

/// Snapshot cache keyed by tag set.
#[derive(Clone)]
pub struct SnapshotCache {
    dir: PathBuf,
    ttl: Duration,
}

impl SnapshotCache {
    /// Creates a cache rooted at `dir` with the given freshness horizon.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    fn path_for(&self, tags: &BTreeSet<String>) -> PathBuf {
        // Tag sets are ordered, so equal sets hash identically.
        let mut hasher = DefaultHasher::new();
        tags.hash(&mut hasher);
        self.dir.join(format!("snapshot-{:016x}.json", hasher.finish()))
    }

    fn is_fresh(&self, path: &Path) -> bool {
        let Ok(meta) = std::fs::metadata(path) else {
            return false;
        };
        let Ok(modified) = meta.modified() else {
            return false;
        };
        SystemTime::now()
            .duration_since(modified)
            .map(|age| age < self.ttl)
            .unwrap_or(false)
    }

    /// Returns the cached snapshot for a tag set when fresh.
    #[must_use]
    pub fn load(&self, tags: &BTreeSet<String>) -> Option<Vec<Market>> {
        let path = self.path_for(tags);
        if !self.is_fresh(&path) {
            return None;
        }
        let raw = std::fs::read_to_string(&path).ok()?;
        let snapshot: Snapshot = serde_json::from_str(&raw).ok()?;
        if snapshot.tags != *tags {
            // Hash collision between different tag sets; treat as a miss.
            return None;
        }
        debug!(path = %path.display(), count = snapshot.markets.len(), "Serving snapshot from cache");
        Some(snapshot.markets)
    }

    /// Stores a snapshot for a tag set. Failures are logged, not fatal.
    pub fn store(&self, tags: &BTreeSet<String>, markets: &[Market]) {
        let path = self.path_for(tags);
        let snapshot = Snapshot {
            tags: tags.clone(),
            markets: markets.to_vec(),
        };
        let write = || -> std::io::Result<()> {
            std::fs::create_dir_all(&self.dir)?;
            let raw = serde_json::to_string(&snapshot)?;
            std::fs::write(&path, raw)
        };
        if let Err(err) = write() {
            warn!(path = %path.display(), error = %err, "Failed to store snapshot");
        }
    }
}
