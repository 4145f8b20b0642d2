//! Top-level dashboard composition.
//!
//! Wires the feed state, the magnitude filter, the selection and the map
//! synchronizer together the way the browser page presents them.

use std::sync::Arc;

use serde::Serialize;

use crate::derive::{FeedStats, compute_stats, format_timestamp};
use crate::errors::QuakelensError;
use crate::feed::{FeedPhase, FeedState};
use crate::filters::MagnitudeThreshold;
use crate::map::{LatLng, MarkerId, MarkerStyler, MarkerSynchronizer, TileLayer, ViewOptions};
use crate::models::{EarthquakeEvent, FeedSnapshot};
use crate::output::{EventDetail, popup_html};
use crate::scene::{SceneFrame, SceneView};
use crate::selection::Selection;

/// Map header summary line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapHeader {
    /// Feed generation time, formatted for display
    pub updated: String,
    pub showing: usize,
    pub total: usize,
}

/// Serializable view of the whole dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub phase: FeedPhase,
    pub loading: bool,
    pub error: Option<String>,
    pub min_magnitude: f64,
    pub header: Option<MapHeader>,
    pub stats: Option<FeedStats>,
    pub selected: Option<EventDetail>,
    /// `None` once the map has been disposed
    pub map: Option<SceneFrame>,
}

/// Dashboard state for a single viewer.
pub struct Dashboard {
    threshold: MagnitudeThreshold,
    selection: Selection,
    feed: FeedState,
    map: MarkerSynchronizer<SceneView>,
}

impl Dashboard {
    /// Build the dashboard and initialize its map.
    ///
    /// # Errors
    ///
    /// Returns an error if the map view fails to initialize.
    pub fn new(options: ViewOptions, tiles: &TileLayer) -> Result<Self, QuakelensError> {
        let selection = Selection::new();
        let on_select = selection.clone();
        let map = MarkerSynchronizer::new(SceneView::new(), options, tiles)?
            .with_on_select(move |event| on_select.select(Arc::clone(event)))
            .with_popup(popup_html);

        Ok(Self {
            threshold: MagnitudeThreshold::default(),
            selection,
            feed: FeedState::default(),
            map,
        })
    }

    /// Take in a feed transition. Markers are rebuilt only when the
    /// snapshot itself was replaced.
    pub fn apply_feed(&mut self, state: FeedState) {
        let replaced = match (&self.feed.snapshot, &state.snapshot) {
            (Some(old), Some(new)) => !Arc::ptr_eq(old, new),
            (None, None) => false,
            _ => true,
        };
        self.feed = state;

        if replaced {
            if let Some(snapshot) = &self.feed.snapshot {
                self.selection.revalidate(snapshot);
            }
            self.refresh_markers();
        }
    }

    pub fn set_threshold(&mut self, threshold: MagnitudeThreshold) {
        if threshold != self.threshold {
            self.threshold = threshold;
            self.refresh_markers();
        }
    }

    #[must_use]
    pub fn threshold(&self) -> MagnitudeThreshold {
        self.threshold
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<&FeedSnapshot> {
        self.feed.snapshot.as_deref()
    }

    /// Events passing the threshold; recomputed on every call.
    #[must_use]
    pub fn filtered_events(&self) -> Vec<Arc<EarthquakeEvent>> {
        self.snapshot()
            .map(|s| self.threshold.filter_events(&s.events))
            .unwrap_or_default()
    }

    /// Statistics over the unfiltered snapshot.
    #[must_use]
    pub fn stats(&self) -> Option<FeedStats> {
        compute_stats(self.snapshot())
    }

    #[must_use]
    pub fn header(&self) -> Option<MapHeader> {
        self.snapshot().map(|s| MapHeader {
            updated: format_timestamp(s.generated_at),
            showing: self.filtered_events().len(),
            total: s.len(),
        })
    }

    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Explicit deselect from the detail display.
    pub fn clear_selection(&self) {
        self.selection.reset();
    }

    /// Replace the marker derivation functions; rebuilds the markers.
    pub fn set_styler(&mut self, styler: MarkerStyler) {
        self.map.set_styler(styler);
    }

    /// Detail panel content for the current selection.
    #[must_use]
    pub fn detail(&self) -> Option<EventDetail> {
        self.selection.current().map(|e| EventDetail::from(e.as_ref()))
    }

    /// A marker was clicked on the rendering side.
    pub fn click(&mut self, id: MarkerId) -> Option<EventDetail> {
        self.map.click(id).map(|e| EventDetail::from(e.as_ref()))
    }

    /// The rendering side moved or zoomed the map.
    pub fn report_view(&mut self, center: LatLng, zoom: f64) -> Option<LatLng> {
        self.map.report_view(center, zoom)
    }

    pub fn container_ready(&mut self) {
        self.map.on_container_ready();
    }

    pub fn container_resized(&mut self) {
        self.map.on_container_resized();
    }

    /// Snapshot of everything the page shows; drains pending map commands.
    pub fn view(&mut self) -> DashboardView {
        DashboardView {
            phase: self.feed.phase,
            loading: self.feed.is_loading(),
            error: self.feed.error.clone(),
            min_magnitude: self.threshold.value(),
            header: self.header(),
            stats: self.stats(),
            selected: self.detail(),
            map: self.map.render(),
        }
    }

    /// Tear down the map.
    pub fn dispose(&mut self) {
        self.map.dispose();
    }

    fn refresh_markers(&mut self) {
        let events = self.filtered_events();
        self.map.sync_events(events);
    }
}
