//! Holder for the active route snapshot.

use std::sync::{Arc, PoisonError, RwLock};

use nav_core::RouteProgress;

/// The single shared slot for the active route and its progress.
///
/// Snapshots are swapped in whole; nothing inside a published snapshot is
/// ever modified.
#[derive(Debug)]
pub struct ActiveRoute {
    current: RwLock<Arc<RouteProgress>>,
}

impl ActiveRoute {
    pub fn new(progress: RouteProgress) -> Self {
        Self {
            current: RwLock::new(Arc::new(progress)),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<RouteProgress> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install a new route's progress unconditionally.
    pub fn replace(&self, progress: RouteProgress) -> Arc<RouteProgress> {
        let snapshot = Arc::new(progress);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = snapshot.clone();
        snapshot
    }

    /// Install `next` only if the active route is still the one `based_on`
    /// was computed from. Returns `None` when a reroute got there first.
    pub fn update_if_current(
        &self,
        based_on: &RouteProgress,
        next: RouteProgress,
    ) -> Option<Arc<RouteProgress>> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if !Arc::ptr_eq(current.route(), based_on.route()) {
            return None;
        }
        let snapshot = Arc::new(next);
        *current = snapshot.clone();
        Some(snapshot)
    }
}
