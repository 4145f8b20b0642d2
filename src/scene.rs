//! Retained in-process map view.
//!
//! [`SceneView`] implements [`MapView`] by keeping markers and view state
//! in memory. The browser dashboard polls frames of it and draws them with
//! its own mapping widget; one-shot actions (pan, resize, popup) are queued
//! as [`ViewCommand`]s and drained with each frame.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::errors::QuakelensError;
use crate::map::{CircleMarker, LatLng, MapView, MarkerId, MarkerSynchronizer, TileLayer, ViewOptions};

/// One-shot action for the rendering side.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewCommand {
    PanTo { center: LatLng },
    InvalidateSize,
    OpenPopup { at: LatLng, html: String },
}

/// A marker as shipped to the rendering side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedMarker {
    pub id: MarkerId,
    #[serde(flatten)]
    pub marker: CircleMarker,
}

/// Everything the rendering side needs to draw the current view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneFrame {
    pub center: LatLng,
    pub zoom: f64,
    pub markers: Vec<RenderedMarker>,
    pub commands: Vec<ViewCommand>,
}

/// Map view held entirely in memory.
#[derive(Debug, Default)]
pub struct SceneView {
    options: Option<ViewOptions>,
    tiles: Vec<TileLayer>,
    center: Option<LatLng>,
    zoom: f64,
    markers: BTreeMap<MarkerId, CircleMarker>,
    next_id: u64,
    commands: Vec<ViewCommand>,
    destroyed: bool,
}

impl SceneView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current frame; drains queued commands.
    pub fn frame(&mut self) -> SceneFrame {
        SceneFrame {
            center: self.center(),
            zoom: self.zoom,
            markers: self
                .markers
                .iter()
                .map(|(id, marker)| RenderedMarker {
                    id: *id,
                    marker: marker.clone(),
                })
                .collect(),
            commands: std::mem::take(&mut self.commands),
        }
    }
}

impl MapView for SceneView {
    fn initialize(&mut self, options: &ViewOptions) -> Result<(), QuakelensError> {
        if self.destroyed {
            return Err(QuakelensError::MapView("view already destroyed".into()));
        }
        if options.min_zoom > options.max_zoom {
            return Err(QuakelensError::MapView(format!(
                "min zoom {} exceeds max zoom {}",
                options.min_zoom, options.max_zoom
            )));
        }
        self.center = Some(options.center);
        self.zoom = options.zoom.clamp(options.min_zoom, options.max_zoom);
        self.options = Some(options.clone());
        Ok(())
    }

    fn add_tile_layer(&mut self, layer: &TileLayer) -> Result<(), QuakelensError> {
        if self.options.is_none() {
            return Err(QuakelensError::MapView("tile layer added before initialization".into()));
        }
        self.tiles.push(layer.clone());
        Ok(())
    }

    fn add_marker(&mut self, marker: CircleMarker) -> MarkerId {
        self.next_id += 1;
        let id = MarkerId(self.next_id);
        self.markers.insert(id, marker);
        id
    }

    fn remove_marker(&mut self, id: MarkerId) {
        self.markers.remove(&id);
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn center(&self) -> LatLng {
        self.center
            .or_else(|| self.options.as_ref().map(|o| o.center))
            .unwrap_or(LatLng::new(0.0, 0.0))
    }

    fn set_view(&mut self, center: LatLng, zoom: f64) {
        self.center = Some(center);
        self.zoom = match &self.options {
            Some(o) => zoom.clamp(o.min_zoom, o.max_zoom),
            None => zoom,
        };
    }

    fn pan_to(&mut self, center: LatLng) {
        self.center = Some(center);
        self.commands.push(ViewCommand::PanTo { center });
    }

    fn open_popup(&mut self, at: LatLng, html: String) {
        self.commands.push(ViewCommand::OpenPopup { at, html });
    }

    fn invalidate_size(&mut self) {
        self.commands.push(ViewCommand::InvalidateSize);
    }

    fn destroy(&mut self) {
        self.markers.clear();
        self.tiles.clear();
        self.commands.clear();
        self.destroyed = true;
    }
}

impl MarkerSynchronizer<SceneView> {
    /// Frame of the owned scene, or `None` once disposed.
    pub fn render(&mut self) -> Option<SceneFrame> {
        self.view_mut().map(SceneView::frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(id: &str) -> CircleMarker {
        CircleMarker {
            event_id: id.into(),
            position: LatLng::new(1.0, 2.0),
            radius: 5.0,
            fill_color: "#059669",
            color: "#ffffff",
            weight: 2.0,
            opacity: 1.0,
            fill_opacity: 0.85,
        }
    }

    #[test]
    fn test_initialize_applies_options() {
        let mut view = SceneView::new();
        view.initialize(&ViewOptions::default()).unwrap();
        view.add_tile_layer(&TileLayer::default()).unwrap();
        assert_eq!(view.center(), LatLng::new(20.0, 0.0));
        assert!((view.zoom() - 2.0).abs() < f64::EPSILON);
        assert_eq!(view.tiles[0].attribution, "© OpenStreetMap contributors");
    }

    #[test]
    fn test_tile_layer_requires_initialization() {
        let mut view = SceneView::new();
        assert!(view.add_tile_layer(&TileLayer::default()).is_err());
    }

    #[test]
    fn test_rejects_inverted_zoom_bounds() {
        let options = ViewOptions {
            min_zoom: 10.0,
            max_zoom: 2.0,
            ..ViewOptions::default()
        };
        assert!(SceneView::new().initialize(&options).is_err());
    }

    #[test]
    fn test_marker_ids_are_unique() {
        let mut view = SceneView::new();
        let a = view.add_marker(marker("a"));
        view.remove_marker(a);
        let b = view.add_marker(marker("b"));
        assert_ne!(a, b);
        assert_eq!(view.frame().markers.len(), 1);
    }

    #[test]
    fn test_frame_drains_commands() {
        let mut view = SceneView::new();
        view.initialize(&ViewOptions::default()).unwrap();
        view.invalidate_size();
        view.pan_to(LatLng::new(0.0, 180.0));
        let frame = view.frame();
        assert_eq!(frame.commands.len(), 2);
        assert_eq!(frame.center, LatLng::new(0.0, 180.0));
        assert!(view.frame().commands.is_empty());
    }

    #[test]
    fn test_frame_serializes_flat_markers() {
        let mut view = SceneView::new();
        view.initialize(&ViewOptions::default()).unwrap();
        view.add_marker(marker("a"));
        view.invalidate_size();
        let json = serde_json::to_value(view.frame()).unwrap();
        assert_eq!(json["markers"][0]["id"], 1);
        assert_eq!(json["markers"][0]["event_id"], "a");
        assert_eq!(json["commands"][0]["kind"], "invalidate_size");
    }

    #[test]
    fn test_destroyed_view_cannot_reinitialize() {
        let mut view = SceneView::new();
        view.initialize(&ViewOptions::default()).unwrap();
        view.add_marker(marker("a"));
        view.destroy();
        assert!(view.frame().markers.is_empty());
        assert!(view.initialize(&ViewOptions::default()).is_err());
    }
}
