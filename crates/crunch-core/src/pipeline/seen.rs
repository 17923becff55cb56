//! Run-scoped deduplication ledger.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Paths already handled during one batch run.
///
/// Keys are expected to be normalized (see [`normalize_path`](super::paths::normalize_path)).
/// A marked path is never processed again for the lifetime of the set.
/// Inputs of claimed work that has not finished yet are held as in flight
/// and block other claims the same way marked paths do.
#[derive(Debug, Default)]
pub struct SeenSet {
    state: Mutex<Ledger>,
}

#[derive(Debug, Default)]
struct Ledger {
    marked: HashSet<PathBuf>,
    in_flight: HashSet<PathBuf>,
}

impl Ledger {
    fn blocks(&self, path: &Path) -> bool {
        self.marked.contains(path) || self.in_flight.contains(path)
    }
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        // Every update is a single insert or move, so a poisoned ledger is still consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim a unit of work.
    ///
    /// Returns `false` if either `input` or `output` is already marked or in
    /// flight. Otherwise marks `output`, holds `input` as in flight and
    /// returns `true`, in one critical section.
    pub fn claim(&self, input: &Path, output: &Path) -> bool {
        let mut ledger = self.lock();
        if ledger.blocks(input) || ledger.blocks(output) {
            return false;
        }
        ledger.marked.insert(output.to_path_buf());
        ledger.in_flight.insert(input.to_path_buf());
        true
    }

    /// Mark a path as handled, releasing it from in flight.
    pub fn mark(&self, path: &Path) {
        let mut ledger = self.lock();
        ledger.in_flight.remove(path);
        ledger.marked.insert(path.to_path_buf());
    }

    /// Whether a path has been marked.
    pub fn contains(&self, path: &Path) -> bool {
        self.lock().marked.contains(path)
    }

    /// Whether a path is the input of claimed, unfinished work.
    pub fn is_in_flight(&self, path: &Path) -> bool {
        self.lock().in_flight.contains(path)
    }

    /// Number of marked paths.
    pub fn len(&self) -> usize {
        self.lock().marked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().marked.is_empty()
    }
}
