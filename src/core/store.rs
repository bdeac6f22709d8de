//! Store handle for a granary data workspace.

use std::path::PathBuf;

/// Handle to a granary state workspace.
///
/// A Store is the logical container for the farm database and event logs.
/// All subsystem state (catalog, ledger, crops, registry) is scoped to a
/// store rooted at `<project>/.granary/data/`. There is a single
/// authoritative store per project; operations receive it explicitly rather
/// than reaching for ambient globals.
#[derive(Debug, Clone)]
pub struct Store {
    /// Absolute path to the store root directory.
    pub root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}
