//! Map marker synchronization.
//!
//! [`MarkerSynchronizer`] exclusively owns one [`MapView`] and keeps its
//! markers in step with the filtered earthquake list and the zoom level.
//! Callers only hand it declarative inputs (events, zoom, container
//! signals) and receive selections through a callback.
//!
//! Every input change tears down all markers and rebuilds them in one
//! synchronous pass. There is no keyed diffing; at the size of a 24 hour
//! feed (a few hundred events) a full rebuild is cheap.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::derive::{border_weight, color_for_magnitude, marker_radius, size_for_magnitude};
use crate::errors::QuakelensError;
use crate::models::EarthquakeEvent;

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Rectangle given by its south-west and north-east corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

/// The whole globe, without horizontal wrap.
pub const WORLD_BOUNDS: LatLngBounds = LatLngBounds {
    south_west: LatLng::new(-90.0, -180.0),
    north_east: LatLng::new(90.0, 180.0),
};

/// Initial view configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewOptions {
    pub center: LatLng,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub max_bounds: LatLngBounds,
    /// 1.0 makes the bounds a hard wall while dragging
    pub max_bounds_viscosity: f64,
    pub world_copy_jump: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            center: LatLng::new(20.0, 0.0),
            zoom: 2.0,
            min_zoom: 2.0,
            max_zoom: 18.0,
            max_bounds: WORLD_BOUNDS,
            max_bounds_viscosity: 1.0,
            world_copy_jump: false,
        }
    }
}

/// Base raster layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileLayer {
    pub url_template: String,
    pub attribution: String,
    pub max_zoom: f64,
    pub no_wrap: bool,
    pub bounds: LatLngBounds,
}

impl Default for TileLayer {
    fn default() -> Self {
        Self {
            url_template: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".into(),
            attribution: "© OpenStreetMap contributors".into(),
            max_zoom: 18.0,
            no_wrap: true,
            bounds: WORLD_BOUNDS,
        }
    }
}

/// Handle to a marker placed on a [`MapView`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(pub u64);

/// A circle marker bound to one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircleMarker {
    pub event_id: String,
    pub position: LatLng,
    pub radius: f64,
    pub fill_color: &'static str,
    /// Border color
    pub color: &'static str,
    pub weight: f64,
    pub opacity: f64,
    pub fill_opacity: f64,
}

/// Imperative map-instance API, in the shape of a slippy-map widget.
pub trait MapView {
    /// Apply the initial view configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the view cannot be set up.
    fn initialize(&mut self, options: &ViewOptions) -> Result<(), QuakelensError>;

    /// # Errors
    ///
    /// Returns an error if the layer cannot be attached.
    fn add_tile_layer(&mut self, layer: &TileLayer) -> Result<(), QuakelensError>;

    fn add_marker(&mut self, marker: CircleMarker) -> MarkerId;

    fn remove_marker(&mut self, id: MarkerId);

    fn zoom(&self) -> f64;

    fn center(&self) -> LatLng;

    /// Record a view change made on the rendering side (drag or zoom).
    fn set_view(&mut self, center: LatLng, zoom: f64);

    fn pan_to(&mut self, center: LatLng);

    fn open_popup(&mut self, at: LatLng, html: String);

    /// Recompute the view size from its container.
    fn invalidate_size(&mut self);

    /// Tear the view down. It must not be used afterwards.
    fn destroy(&mut self);
}

/// The derivation functions markers are styled with.
#[derive(Debug, Clone, Copy)]
pub struct MarkerStyler {
    pub color: fn(f64) -> &'static str,
    pub size: fn(f64) -> f64,
}

impl Default for MarkerStyler {
    fn default() -> Self {
        Self {
            color: color_for_magnitude,
            size: size_for_magnitude,
        }
    }
}

impl MarkerStyler {
    /// Style a marker for `event` at `position` and `zoom`.
    #[must_use]
    pub fn marker(&self, event: &EarthquakeEvent, position: LatLng, zoom: f64) -> CircleMarker {
        let magnitude = event.magnitude.unwrap_or(0.0);
        CircleMarker {
            event_id: event.id.clone(),
            position,
            radius: marker_radius((self.size)(magnitude), zoom),
            fill_color: (self.color)(magnitude),
            color: "#ffffff",
            weight: border_weight(zoom),
            opacity: 1.0,
            fill_opacity: 0.85,
        }
    }
}

/// Callback invoked with the event behind a clicked marker.
pub type SelectCallback = Box<dyn FnMut(&Arc<EarthquakeEvent>) + Send>;

/// Renders popup markup for a clicked event.
pub type PopupRenderer = fn(&EarthquakeEvent) -> String;

/// Sole owner of a map view and the markers on it.
pub struct MarkerSynchronizer<V: MapView> {
    /// `None` once disposed
    view: Option<V>,
    options: ViewOptions,
    events: Vec<Arc<EarthquakeEvent>>,
    markers: Vec<(MarkerId, Arc<EarthquakeEvent>)>,
    styler: MarkerStyler,
    on_select: Option<SelectCallback>,
    popup: Option<PopupRenderer>,
    container_ready: bool,
}

impl<V: MapView> MarkerSynchronizer<V> {
    /// Take ownership of `view`, configure it and attach the base layer.
    ///
    /// # Errors
    ///
    /// Returns an error (after logging it) if the view fails to initialize.
    pub fn new(mut view: V, options: ViewOptions, tiles: &TileLayer) -> Result<Self, QuakelensError> {
        let setup = view
            .initialize(&options)
            .and_then(|()| view.add_tile_layer(tiles));
        if let Err(e) = setup {
            error!("error initializing map: {e}");
            view.destroy();
            return Err(e);
        }

        Ok(Self {
            view: Some(view),
            options,
            events: Vec::new(),
            markers: Vec::new(),
            styler: MarkerStyler::default(),
            on_select: None,
            popup: None,
            container_ready: false,
        })
    }

    /// Invoke `callback` whenever a marker is clicked.
    #[must_use]
    pub fn with_on_select(mut self, callback: impl FnMut(&Arc<EarthquakeEvent>) + Send + 'static) -> Self {
        self.on_select = Some(Box::new(callback));
        self
    }

    /// Open a popup rendered by `renderer` whenever a marker is clicked.
    #[must_use]
    pub fn with_popup(mut self, renderer: PopupRenderer) -> Self {
        self.popup = Some(renderer);
        self
    }

    /// Replace the displayed events and rebuild.
    pub fn sync_events(&mut self, events: Vec<Arc<EarthquakeEvent>>) {
        self.events = events;
        self.rebuild();
    }

    /// Replace the derivation functions and rebuild.
    pub fn set_styler(&mut self, styler: MarkerStyler) {
        self.styler = styler;
        self.rebuild();
    }

    /// Feed a view change from the rendering side.
    ///
    /// Rebuilds when the zoom level changed, then applies the pan guard.
    /// Returns the corrected center if the view had to be pulled back.
    pub fn report_view(&mut self, center: LatLng, zoom: f64) -> Option<LatLng> {
        let view = self.view.as_mut()?;
        let zoom = zoom.clamp(self.options.min_zoom, self.options.max_zoom);
        let zoom_changed = (view.zoom() - zoom).abs() > f64::EPSILON;
        view.set_view(center, zoom);

        if zoom_changed {
            self.rebuild();
        }
        self.on_move_end()
    }

    /// Pull the center back inside [-180, 180] longitude after a move.
    pub fn on_move_end(&mut self) -> Option<LatLng> {
        let view = self.view.as_mut()?;
        let center = view.center();
        if (-180.0..=180.0).contains(&center.lng) {
            return None;
        }

        let corrected = LatLng::new(center.lat, center.lng.clamp(-180.0, 180.0));
        debug!(from = center.lng, to = corrected.lng, "panning back inside world bounds");
        view.pan_to(corrected);
        Some(corrected)
    }

    /// The container has its final layout; size the view once.
    pub fn on_container_ready(&mut self) {
        if let Some(view) = self.view.as_mut() {
            if !self.container_ready {
                self.container_ready = true;
                view.invalidate_size();
            }
        }
    }

    /// The container changed size.
    pub fn on_container_resized(&mut self) {
        if let Some(view) = self.view.as_mut() {
            self.container_ready = true;
            view.invalidate_size();
        }
    }

    /// Handle a marker click: select its event and open a popup.
    ///
    /// Returns `None` for ids that are not on the map (e.g. from before the
    /// last rebuild).
    pub fn click(&mut self, id: MarkerId) -> Option<Arc<EarthquakeEvent>> {
        let event = self
            .markers
            .iter()
            .find(|(marker, _)| *marker == id)
            .map(|(_, event)| Arc::clone(event))?;

        if let Some(on_select) = self.on_select.as_mut() {
            on_select(&event);
        }
        if let (Some(render), Some(view), Some(coords)) =
            (self.popup, self.view.as_mut(), event.valid_coordinates())
        {
            view.open_popup(LatLng::new(coords.latitude, coords.longitude), render(&event));
        }
        Some(event)
    }

    /// Crate-internal access for view-specific rendering.
    pub(crate) fn view_mut(&mut self) -> Option<&mut V> {
        self.view.as_mut()
    }

    /// Remove every marker, then destroy the view.
    pub fn dispose(&mut self) {
        self.clear_markers();
        if let Some(mut view) = self.view.take() {
            view.destroy();
            debug!("map view destroyed");
        }
    }

    fn clear_markers(&mut self) {
        let Some(view) = self.view.as_mut() else {
            self.markers.clear();
            return;
        };
        for (id, _) in self.markers.drain(..) {
            view.remove_marker(id);
        }
    }

    /// Destroy every marker and recreate one per placeable event.
    fn rebuild(&mut self) {
        self.clear_markers();
        let Some(view) = self.view.as_mut() else {
            return;
        };

        let zoom = view.zoom();
        let mut skipped = 0usize;
        for event in &self.events {
            let Some(coords) = event.valid_coordinates() else {
                skipped += 1;
                continue;
            };
            let position = LatLng::new(coords.latitude, coords.longitude);
            let id = view.add_marker(self.styler.marker(event, position, zoom));
            self.markers.push((id, Arc::clone(event)));
        }

        if skipped > 0 {
            warn!(skipped, "skipped events without valid coordinates");
        }
        debug!(markers = self.markers.len(), zoom, "markers rebuilt");
    }
}

impl<V: MapView> Drop for MarkerSynchronizer<V> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::models::Coordinates;
    use crate::models::tests::event;
    use crate::scene::{SceneView, ViewCommand};

    fn arc_events(list: &[(&str, f64, f64, f64)]) -> Vec<Arc<EarthquakeEvent>> {
        list.iter()
            .map(|(id, mag, lon, lat)| Arc::new(event(id, Some(*mag), *lon, *lat)))
            .collect()
    }

    fn synchronizer() -> MarkerSynchronizer<SceneView> {
        MarkerSynchronizer::new(SceneView::new(), ViewOptions::default(), &TileLayer::default())
            .expect("scene view initializes")
    }

    /// View that records marker traffic and can refuse to initialize.
    #[derive(Default)]
    struct RecordingView {
        fail_init: bool,
        live: Arc<Mutex<Vec<MarkerId>>>,
        destroyed: Arc<Mutex<bool>>,
        next: u64,
    }

    impl MapView for RecordingView {
        fn initialize(&mut self, _options: &ViewOptions) -> Result<(), QuakelensError> {
            if self.fail_init {
                return Err(QuakelensError::MapView("no container".into()));
            }
            Ok(())
        }
        fn add_tile_layer(&mut self, _layer: &TileLayer) -> Result<(), QuakelensError> {
            Ok(())
        }
        fn add_marker(&mut self, _marker: CircleMarker) -> MarkerId {
            self.next += 1;
            self.live.lock().unwrap().push(MarkerId(self.next));
            MarkerId(self.next)
        }
        fn remove_marker(&mut self, id: MarkerId) {
            self.live.lock().unwrap().retain(|m| *m != id);
        }
        fn zoom(&self) -> f64 {
            2.0
        }
        fn center(&self) -> LatLng {
            LatLng::new(20.0, 0.0)
        }
        fn set_view(&mut self, _center: LatLng, _zoom: f64) {}
        fn pan_to(&mut self, _center: LatLng) {}
        fn open_popup(&mut self, _at: LatLng, _html: String) {}
        fn invalidate_size(&mut self) {}
        fn destroy(&mut self) {
            *self.destroyed.lock().unwrap() = true;
        }
    }

    #[test]
    fn test_rebuild_replaces_all_markers() {
        let mut sync = synchronizer();
        sync.sync_events(arc_events(&[
            ("a", 3.0, 10.0, 10.0),
            ("b", 4.0, 20.0, 20.0),
            ("c", 5.0, 30.0, 30.0),
        ]));
        assert_eq!(sync.markers.len(), 3);
        assert_eq!(sync.render().unwrap().markers.len(), 3);

        sync.sync_events(arc_events(&[("d", 6.0, 40.0, 40.0), ("e", 7.0, 50.0, 50.0)]));
        assert_eq!(sync.markers.len(), 2);
        let frame = sync.render().unwrap();
        assert_eq!(frame.markers.len(), 2);
        let ids: Vec<&str> = frame.markers.iter().map(|m| m.marker.event_id.as_str()).collect();
        assert_eq!(ids, ["d", "e"]);
    }

    #[test]
    fn test_invalid_coordinates_are_skipped() {
        let mut sync = synchronizer();
        let mut missing = event("missing", Some(4.0), 0.0, 0.0);
        missing.coordinates = None;
        let mut nan = event("nan", Some(4.0), 0.0, 0.0);
        nan.coordinates = Some(Coordinates {
            longitude: f64::NAN,
            latitude: 1.0,
            depth_km: 1.0,
        });
        let mut events = arc_events(&[("ok", 4.0, 0.0, 0.0)]);
        events.push(Arc::new(missing));
        events.push(Arc::new(nan));

        sync.sync_events(events);
        assert_eq!(sync.markers.len(), 1);
    }

    #[test]
    fn test_marker_style_follows_magnitude_and_zoom() {
        let mut sync = synchronizer();
        sync.sync_events(arc_events(&[("a", 5.0, 0.0, 0.0)]));
        let marker = sync.render().unwrap().markers[0].marker.clone();
        assert!((marker.radius - 6.0).abs() < 1e-9);
        assert!((marker.weight - 2.0).abs() < 1e-9);
        assert_eq!(marker.fill_color, "#d97706");

        sync.report_view(LatLng::new(20.0, 0.0), 18.0);
        let marker = sync.render().unwrap().markers[0].marker.clone();
        assert!((marker.radius - 48.0).abs() < 1e-9);
        assert!((marker.weight - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_is_clamped_to_bounds() {
        let mut sync = synchronizer();
        sync.report_view(LatLng::new(0.0, 0.0), 40.0);
        assert!((sync.render().unwrap().zoom - 18.0).abs() < f64::EPSILON);
        sync.report_view(LatLng::new(0.0, 0.0), 0.0);
        assert!((sync.render().unwrap().zoom - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_styler_change_rebuilds() {
        fn red(_: f64) -> &'static str {
            "#ff0000"
        }
        let mut sync = synchronizer();
        sync.sync_events(arc_events(&[("a", 5.0, 0.0, 0.0)]));
        sync.set_styler(MarkerStyler {
            color: red,
            ..MarkerStyler::default()
        });
        let frame = sync.render().unwrap();
        assert_eq!(frame.markers.len(), 1);
        assert_eq!(frame.markers[0].marker.fill_color, "#ff0000");
    }

    #[test]
    fn test_click_selects_and_opens_popup() {
        let selected = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&selected);
        let mut sync = synchronizer()
            .with_on_select(move |e| sink.lock().unwrap().push(e.id.clone()))
            .with_popup(|e| format!("<b>{}</b>", e.id));
        sync.sync_events(arc_events(&[("a", 5.0, 12.0, 34.0)]));
        let id = sync.render().unwrap().markers[0].id;

        let clicked = sync.click(id).expect("marker exists");
        assert_eq!(clicked.id, "a");
        assert_eq!(*selected.lock().unwrap(), ["a"]);

        let frame = sync.render().unwrap();
        assert!(frame.commands.contains(&ViewCommand::OpenPopup {
            at: LatLng::new(34.0, 12.0),
            html: "<b>a</b>".into(),
        }));

        // Stale ids from before a rebuild resolve to nothing.
        sync.sync_events(arc_events(&[("b", 5.0, 0.0, 0.0)]));
        assert!(sync.click(id).is_none());
        assert_eq!(selected.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_pan_guard() {
        let mut sync = synchronizer();
        assert_eq!(sync.report_view(LatLng::new(10.0, 90.0), 2.0), None);
        assert_eq!(
            sync.report_view(LatLng::new(10.0, 200.0), 2.0),
            Some(LatLng::new(10.0, 180.0))
        );
        assert_eq!(
            sync.report_view(LatLng::new(-5.0, -190.0), 2.0),
            Some(LatLng::new(-5.0, -180.0))
        );
        let frame = sync.render().unwrap();
        assert!((frame.center.lng + 180.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_container_signals_invalidate_size() {
        let mut sync = synchronizer();
        sync.on_container_ready();
        sync.on_container_ready();
        let frame = sync.render().unwrap();
        assert_eq!(
            frame.commands.iter().filter(|c| **c == ViewCommand::InvalidateSize).count(),
            1
        );
        sync.on_container_resized();
        assert_eq!(sync.render().unwrap().commands, [ViewCommand::InvalidateSize]);
    }

    #[test]
    fn test_dispose_removes_markers_then_destroys() {
        let live = Arc::new(Mutex::new(Vec::new()));
        let destroyed = Arc::new(Mutex::new(false));
        let view = RecordingView {
            live: Arc::clone(&live),
            destroyed: Arc::clone(&destroyed),
            ..RecordingView::default()
        };
        let mut sync = MarkerSynchronizer::new(view, ViewOptions::default(), &TileLayer::default())
            .expect("init");
        sync.sync_events(arc_events(&[("a", 3.0, 1.0, 1.0), ("b", 3.0, 2.0, 2.0)]));
        assert_eq!(live.lock().unwrap().len(), 2);

        sync.sync_events(arc_events(&[("c", 3.0, 1.0, 1.0)]));
        assert_eq!(live.lock().unwrap().len(), 1);

        drop(sync);
        assert!(live.lock().unwrap().is_empty());
        assert!(*destroyed.lock().unwrap());
    }

    #[test]
    fn test_disposed_synchronizer_is_inert() {
        let mut sync = synchronizer();
        sync.sync_events(arc_events(&[("a", 3.0, 1.0, 1.0)]));
        sync.dispose();
        assert!(sync.view.is_none());
        assert_eq!(sync.markers.len(), 0);
        sync.sync_events(arc_events(&[("a", 3.0, 1.0, 1.0)]));
        assert_eq!(sync.markers.len(), 0);
        assert!(sync.render().is_none());
    }

    #[test]
    fn test_init_failure_is_reported() {
        let destroyed = Arc::new(Mutex::new(false));
        let view = RecordingView {
            fail_init: true,
            destroyed: Arc::clone(&destroyed),
            ..RecordingView::default()
        };
        let result = MarkerSynchronizer::new(view, ViewOptions::default(), &TileLayer::default());
        assert!(matches!(result, Err(QuakelensError::MapView(_))));
        assert!(*destroyed.lock().unwrap());
    }
}
