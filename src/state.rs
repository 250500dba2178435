//! Process-wide blocklist state shared by the refresher and the server.

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::snapshot::Snapshot;

/// Handle to the currently served [`Snapshot`].
///
/// Cloning the handle shares the same state. Readers get an `Arc` to the
/// snapshot that was current when they called [`get`](Self::get) and keep
/// serving from it even if a new one is installed meanwhile; the old
/// snapshot is freed when its last reader drops it.
#[derive(Clone)]
pub struct SharedBlocklist {
    current: Arc<ArcSwap<Snapshot>>,
}

impl SharedBlocklist {
    /// Create the shared state with its first snapshot.
    ///
    /// There is no empty state: the server cannot answer before a build.
    pub fn new(initial: Snapshot) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    /// The current snapshot.
    pub fn get(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Atomically replace the current snapshot.
    pub fn set(&self, snapshot: Snapshot) {
        self.current.store(Arc::new(snapshot));
    }
}
