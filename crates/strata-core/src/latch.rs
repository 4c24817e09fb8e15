//! Single-flight build latch.
//!
//! Expresses the build-once and project-change semantics as an atomic state
//! machine {Unbuilt, Building, Built(root), Failed(root, err)}: exactly one
//! caller runs the build for a root, every concurrent caller blocks until it
//! finishes and then observes the same outcome. A failure is sticky for that
//! root until [`BuildLatch::reset`]; cancellation is never cached.
//!
//! Lock order is latch → data lock, never the reverse: `begin` returns
//! before any data lock is taken, so a builder may acquire write locks while
//! other threads wait on the latch.

use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex};

use crate::types::IndexError;

#[derive(Debug, Clone)]
enum LatchState {
    Unbuilt,
    Building,
    Built(PathBuf),
    Failed(PathBuf, IndexError),
}

#[derive(Debug)]
pub struct BuildLatch {
    state: Mutex<LatchState>,
    cond: Condvar,
}

/// Outcome of [`BuildLatch::begin`].
#[derive(Debug, PartialEq, Eq)]
pub enum Admission {
    /// This caller must run the build (and then call `complete`). True when
    /// a different root was built before, so stale state must be wiped
    /// first.
    Build { root_changed: bool },
    /// The root is already built; use the cached artifact.
    AlreadyBuilt,
}

impl BuildLatch {
    pub fn new() -> Self {
        BuildLatch {
            state: Mutex::new(LatchState::Unbuilt),
            cond: Condvar::new(),
        }
    }

    /// Admit a caller for `root`. Blocks while another builder is running.
    /// Returns the sticky error when the last build of this root failed.
    pub fn begin(&self, root: &Path) -> Result<Admission, IndexError> {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        loop {
            match &*state {
                LatchState::Built(built_root) => {
                    if built_root == root {
                        return Ok(Admission::AlreadyBuilt);
                    }
                    *state = LatchState::Building;
                    return Ok(Admission::Build { root_changed: true });
                }
                LatchState::Failed(failed_root, err) => {
                    if failed_root == root {
                        return Err(err.clone());
                    }
                    *state = LatchState::Building;
                    return Ok(Admission::Build { root_changed: true });
                }
                LatchState::Unbuilt => {
                    *state = LatchState::Building;
                    return Ok(Admission::Build { root_changed: false });
                }
                LatchState::Building => {
                    state = match self.cond.wait(state) {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                }
            }
        }
    }

    /// Record the build outcome and wake all waiters. A cancelled build
    /// resets to unbuilt so the next caller retries. If the latch was reset
    /// while the build ran, the reset wins.
    pub fn complete(&self, root: &Path, result: &Result<(), IndexError>) {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if matches!(&*state, LatchState::Building) {
            *state = match result {
                Ok(()) => LatchState::Built(root.to_path_buf()),
                Err(IndexError::Cancelled) => LatchState::Unbuilt,
                Err(err) => LatchState::Failed(root.to_path_buf(), err.clone()),
            };
        }
        self.cond.notify_all();
    }

    /// Reset to unbuilt. The next `begin` admits a fresh build.
    pub fn reset(&self) {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *state = LatchState::Unbuilt;
        self.cond.notify_all();
    }

    /// Whether a successful build for `root` is current.
    pub fn is_built_for(&self, root: &Path) -> bool {
        let state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        matches!(&*state, LatchState::Built(r) if r == root)
    }
}

impl Default for BuildLatch {
    fn default() -> Self {
        Self::new()
    }
}
