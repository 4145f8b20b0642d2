//! Currently selected earthquake.

use std::sync::Arc;

use tokio::sync::watch;

use crate::models::{EarthquakeEvent, FeedSnapshot};

/// Single-slot selection store.
///
/// Cloning yields another handle to the same slot, so the marker click
/// callback can write it while the detail display reads it.
#[derive(Debug, Clone)]
pub struct Selection {
    slot: Arc<watch::Sender<Option<Arc<EarthquakeEvent>>>>,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            slot: Arc::new(slot),
        }
    }

    /// Replace the selection unconditionally.
    pub fn select(&self, event: Arc<EarthquakeEvent>) {
        tracing::debug!(id = %event.id, "earthquake selected");
        self.slot.send_replace(Some(event));
    }

    /// Clear the selection.
    pub fn reset(&self) {
        self.slot.send_replace(None);
    }

    #[must_use]
    pub fn current(&self) -> Option<Arc<EarthquakeEvent>> {
        self.slot.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<EarthquakeEvent>>> {
        self.slot.subscribe()
    }

    /// Re-resolve the selection by id against a newer snapshot.
    ///
    /// The selected record is swapped for the snapshot's copy, or cleared if
    /// the event has left the feed window.
    pub fn revalidate(&self, snapshot: &FeedSnapshot) {
        self.slot.send_if_modified(|slot| {
            let Some(current) = slot.as_ref() else {
                return false;
            };
            match snapshot.find(&current.id) {
                Some(fresh) if Arc::ptr_eq(fresh, current) => false,
                Some(fresh) => {
                    *slot = Some(Arc::clone(fresh));
                    true
                }
                None => {
                    tracing::debug!(id = %current.id, "selected earthquake left the feed");
                    *slot = None;
                    true
                }
            }
        });
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::new()
    }
}
