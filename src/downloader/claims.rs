// Registry of output paths currently being written

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use super::errors::DownloadError;

type PathSet = Arc<Mutex<HashSet<PathBuf>>>;

/// Shared set of output paths owned by in-flight downloads.
///
/// Two videos whose titles sanitize to the same name would otherwise race on
/// one file; the second claimant fails with `OutputCollision` instead. Within
/// a run (see [`for_run`](Self::for_run)) a path written by an earlier member
/// also stays claimed, so members finishing one after another never
/// overwrite each other.
#[derive(Debug, Clone, Default)]
pub struct OutputClaims {
    in_flight: PathSet,
    /// Paths written during the current run; `None` outside a run
    produced: Option<PathSet>,
}

impl OutputClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same in-flight registry plus a fresh record of paths this run writes
    pub fn for_run(&self) -> Self {
        Self {
            in_flight: Arc::clone(&self.in_flight),
            produced: Some(PathSet::default()),
        }
    }

    /// Claim `path` until the returned guard is dropped
    pub fn claim(&self, path: &Path) -> Result<ClaimGuard, DownloadError> {
        // Lock order: in_flight, then produced
        let mut in_flight = self.in_flight.lock();
        let already_written = self
            .produced
            .as_ref()
            .is_some_and(|produced| produced.lock().contains(path));

        if already_written || !in_flight.insert(path.to_path_buf()) {
            return Err(DownloadError::OutputCollision(path.to_path_buf()));
        }

        Ok(ClaimGuard {
            in_flight: Arc::clone(&self.in_flight),
            produced: self.produced.clone(),
            path: path.to_path_buf(),
            written: false,
        })
    }
}

/// Releases its path on drop
#[derive(Debug)]
pub struct ClaimGuard {
    in_flight: PathSet,
    produced: Option<PathSet>,
    path: PathBuf,
    written: bool,
}

impl ClaimGuard {
    /// Release the path, keeping it reserved for the rest of the run
    pub fn commit(mut self) {
        self.written = true;
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock();
        if self.written {
            if let Some(produced) = &self.produced {
                produced.lock().insert(self.path.clone());
            }
        }
        in_flight.remove(&self.path);
    }
}
