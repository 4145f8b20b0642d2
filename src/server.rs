//! Web server for the quakelens dashboard.
//!
//! Provides the earthquake map dashboard using:
//! - Axum for HTTP server
//! - SSE (Server-Sent Events) to announce feed transitions
//! - Leaflet in the page as a thin render surface for the server-side scene

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{
        Html,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard, watch};
use tokio_stream::{Stream, StreamExt};
use tokio_stream::wrappers::WatchStream;

use crate::client::UsgsClient;
use crate::dashboard::{Dashboard, DashboardView};
use crate::derive::MagnitudeClass;
use crate::feed::{FeedPhase, FeedState, FeedStore};
use crate::filters::MagnitudeThreshold;
use crate::map::{LatLng, MarkerId, MarkerStyler, TileLayer, ViewOptions};
use crate::models::EarthquakeEvent;
use crate::selection::Selection;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub view: ViewOptions,
    pub tiles: TileLayer,
    pub styler: MarkerStyler,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            view: ViewOptions::default(),
            tiles: TileLayer::default(),
            styler: MarkerStyler::default(),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Feed lifecycle, shared with the initial fetch task
    feed: FeedStore<UsgsClient>,
    /// The single viewer's dashboard
    dashboard: Arc<Mutex<Dashboard>>,
    /// Handle to the dashboard's selection, readable without the lock
    selection: Selection,
    /// Server configuration
    config: Arc<ServerConfig>,
}

impl AppState {
    /// Lock the dashboard with the latest feed state applied.
    async fn dashboard(&self) -> MutexGuard<'_, Dashboard> {
        let mut dashboard = self.dashboard.lock().await;
        dashboard.apply_feed(self.feed.state());
        dashboard
    }
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/stream", get(sse_handler))
        .route("/api/config", get(config_handler))
        .route("/api/state", get(state_handler))
        .route("/api/refresh", post(refresh_handler))
        .route("/api/filter", post(filter_handler))
        .route("/api/view", post(view_handler))
        .route("/api/view/ready", post(ready_handler))
        .route("/api/view/resize", post(resize_handler))
        .route("/api/markers/{id}/click", post(click_handler))
        .route("/api/selection/clear", post(clear_selection_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Start the web server and the initial feed fetch.
///
/// # Errors
///
/// Returns an error if the map fails to initialize or the listener cannot
/// bind.
pub async fn run_server(config: ServerConfig, client: UsgsClient) -> anyhow::Result<()> {
    let mut dashboard = Dashboard::new(config.view.clone(), &config.tiles)?;
    dashboard.set_styler(config.styler);
    let selection = dashboard.selection().clone();
    let dashboard = Arc::new(Mutex::new(dashboard));

    let state = AppState {
        feed: FeedStore::mount(client),
        dashboard: Arc::clone(&dashboard),
        selection,
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("quakelens dashboard starting at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    dashboard.lock().await.dispose();
    tracing::info!("dashboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

type ApiResult = Result<Json<DashboardView>, (StatusCode, String)>;

/// Main page handler - serves the dashboard page.
async fn index_handler() -> Html<String> {
    Html(INDEX_HTML.replace("{{LEGEND}}", &legend_html()))
}

/// Legend rows for the seven magnitude buckets.
fn legend_html() -> String {
    MagnitudeClass::ALL
        .iter()
        .map(|class| {
            format!(
                r#"<li><span class="swatch" style="background:{color}"></span><span class="range">{range}</span><span>{label}</span></li>"#,
                color = class.color(),
                range = crate::output::escape_html(class.range()),
                label = class.label(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Serialize)]
struct ConfigResponse {
    view: ViewOptions,
    tiles: TileLayer,
    min_magnitude: f64,
    slider: SliderRange,
}

#[derive(Serialize)]
struct SliderRange {
    min: f64,
    max: f64,
    step: f64,
}

/// Map and control configuration for the page.
async fn config_handler(State(state): State<AppState>) -> Json<ConfigResponse> {
    let min_magnitude = state.dashboard.lock().await.threshold().value();
    Json(ConfigResponse {
        view: state.config.view.clone(),
        tiles: state.config.tiles.clone(),
        min_magnitude,
        slider: SliderRange {
            min: MagnitudeThreshold::MIN,
            max: MagnitudeThreshold::MAX,
            step: MagnitudeThreshold::STEP,
        },
    })
}

/// Full dashboard state.
async fn state_handler(State(state): State<AppState>) -> Json<DashboardView> {
    Json(state.dashboard().await.view())
}

/// Manual refresh: issue a refetch and return immediately.
async fn refresh_handler(State(state): State<AppState>) -> StatusCode {
    tracing::info!("refresh requested via UI");
    let feed = state.feed.clone();
    tokio::spawn(async move { feed.refetch().await });
    StatusCode::ACCEPTED
}

#[derive(Debug, Deserialize)]
struct FilterRequest {
    min_magnitude: f64,
}

/// Move the magnitude slider.
async fn filter_handler(
    State(state): State<AppState>,
    Json(request): Json<FilterRequest>,
) -> ApiResult {
    let threshold = MagnitudeThreshold::new(request.min_magnitude)
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    let mut dashboard = state.dashboard().await;
    dashboard.set_threshold(threshold);
    Ok(Json(dashboard.view()))
}

#[derive(Debug, Deserialize)]
struct ViewReport {
    lat: f64,
    lng: f64,
    zoom: f64,
}

/// Move-end / zoom-end report from the page.
async fn view_handler(State(state): State<AppState>, Json(report): Json<ViewReport>) -> ApiResult {
    if !(report.lat.is_finite() && report.lng.is_finite() && report.zoom.is_finite()) {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, "view report must be finite".into()));
    }
    let mut dashboard = state.dashboard().await;
    dashboard.report_view(LatLng::new(report.lat, report.lng), report.zoom);
    Ok(Json(dashboard.view()))
}

/// The map container has its final layout.
async fn ready_handler(State(state): State<AppState>) -> Json<DashboardView> {
    let mut dashboard = state.dashboard().await;
    dashboard.container_ready();
    Json(dashboard.view())
}

/// The map container changed size.
async fn resize_handler(State(state): State<AppState>) -> Json<DashboardView> {
    let mut dashboard = state.dashboard().await;
    dashboard.container_resized();
    Json(dashboard.view())
}

/// Marker click: select the event and open its popup.
async fn click_handler(State(state): State<AppState>, Path(id): Path<u64>) -> ApiResult {
    let mut dashboard = state.dashboard().await;
    if dashboard.click(MarkerId(id)).is_none() {
        return Err((StatusCode::NOT_FOUND, format!("no marker {id}")));
    }
    Ok(Json(dashboard.view()))
}

/// Close the detail display.
async fn clear_selection_handler(State(state): State<AppState>) -> Json<DashboardView> {
    let mut dashboard = state.dashboard().await;
    dashboard.clear_selection();
    Json(dashboard.view())
}

/// SSE stream announcing every feed transition and selection change.
async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = notifications(state.feed.subscribe(), state.selection.subscribe())
        .map(|(name, data)| Ok::<_, Infallible>(Event::default().event(name).data(data)));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Named notifications for the page: the feed phase on every transition
/// (starting with the current one), and the selected event id on every
/// selection change (empty when cleared).
fn notifications(
    feed: watch::Receiver<FeedState>,
    selection: watch::Receiver<Option<Arc<EarthquakeEvent>>>,
) -> impl Stream<Item = (&'static str, String)> {
    let feed = WatchStream::new(feed).map(|feed| {
        let phase = match feed.phase {
            FeedPhase::Idle => "idle",
            FeedPhase::Loading => "loading",
            FeedPhase::Ready => "ready",
            FeedPhase::Failed => "failed",
        };
        ("feed", phase.to_string())
    });
    let selection = WatchStream::from_changes(selection).map(|selected| {
        let id = selected.map(|e| e.id.clone()).unwrap_or_default();
        ("selection", id)
    });

    feed.merge(selection)
}

/// Health check endpoint.
async fn health_handler() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::feed::FETCH_ERROR_MESSAGE;
    use crate::models::FeedSnapshot;
    use crate::models::tests::{SAMPLE_FEED, event};

    fn app_state() -> AppState {
        let client = UsgsClient::with_url("http://127.0.0.1:9/feed.geojson").expect("client");
        let config = ServerConfig::default();
        let dashboard = Dashboard::new(config.view.clone(), &config.tiles).expect("dashboard");
        AppState {
            feed: FeedStore::new(client),
            selection: dashboard.selection().clone(),
            dashboard: Arc::new(Mutex::new(dashboard)),
            config: Arc::new(config),
        }
    }

    fn load_sample(state: &AppState) {
        let token = state.feed.begin();
        state
            .feed
            .complete(token, FeedSnapshot::from_json(SAMPLE_FEED));
    }

    #[tokio::test]
    async fn test_config_exposes_slider_and_view() {
        let state = app_state();
        let Json(config) = config_handler(State(state)).await;
        assert!((config.min_magnitude - 2.5).abs() < f64::EPSILON);
        assert!((config.slider.step - 0.5).abs() < f64::EPSILON);
        assert!(!config.view.world_copy_jump);
        assert!(config.tiles.no_wrap);
    }

    #[tokio::test]
    async fn test_notifications_follow_feed_and_selection() {
        let state = app_state();
        let mut stream = Box::pin(notifications(
            state.feed.subscribe(),
            state.selection.subscribe(),
        ));

        assert_eq!(stream.next().await, Some(("feed", "idle".to_string())));

        let token = state.feed.begin();
        assert_eq!(stream.next().await, Some(("feed", "loading".to_string())));
        state
            .feed
            .complete(token, FeedSnapshot::from_json(SAMPLE_FEED));
        assert_eq!(stream.next().await, Some(("feed", "ready".to_string())));

        state
            .selection
            .select(Arc::new(event("picked", Some(4.0), 1.0, 1.0)));
        assert_eq!(stream.next().await, Some(("selection", "picked".to_string())));
        state.selection.reset();
        assert_eq!(stream.next().await, Some(("selection", String::new())));
    }

    #[tokio::test]
    async fn test_refresh_issues_a_fetch() {
        let state = app_state();
        let mut changes = state.feed.subscribe();
        assert_eq!(changes.borrow().phase, FeedPhase::Idle);

        assert_eq!(refresh_handler(State(state.clone())).await, StatusCode::ACCEPTED);

        // Nothing listens on the loopback discard port, so the fetch fails.
        let failed = tokio::time::timeout(
            Duration::from_secs(15),
            changes.wait_for(|s| s.phase == FeedPhase::Failed),
        )
        .await
        .expect("refetch did not finish")
        .map(|s| s.clone())
        .expect("store dropped");
        assert_eq!(failed.request, 1);
        assert_eq!(failed.error.as_deref(), Some(FETCH_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(health_handler().await, "OK");
    }

    #[tokio::test]
    async fn test_index_has_legend() {
        let Html(page) = index_handler().await;
        assert!(page.contains("#dc2626"));
        assert!(page.contains("&lt;2"));
        assert!(!page.contains("{{LEGEND}}"));
    }

    #[tokio::test]
    async fn test_state_follows_feed() {
        let state = app_state();
        let Json(view) = state_handler(State(state.clone())).await;
        assert_eq!(view.phase, FeedPhase::Idle);

        load_sample(&state);
        let Json(view) = state_handler(State(state)).await;
        assert_eq!(view.phase, FeedPhase::Ready);
        assert_eq!(view.stats.expect("stats").total, 4);
        assert_eq!(view.map.expect("map").markers.len(), 2);
    }

    #[tokio::test]
    async fn test_filter_validation() {
        let state = app_state();
        load_sample(&state);

        let err = filter_handler(State(state.clone()), Json(FilterRequest { min_magnitude: 9.0 }))
            .await
            .expect_err("out of range");
        assert_eq!(err.0, StatusCode::UNPROCESSABLE_ENTITY);

        let Json(view) = filter_handler(State(state), Json(FilterRequest { min_magnitude: 7.0 }))
            .await
            .expect("valid");
        assert!((view.min_magnitude - 7.0).abs() < f64::EPSILON);
        assert_eq!(view.map.expect("map").markers.len(), 1);
    }

    #[tokio::test]
    async fn test_click_unknown_marker_is_not_found() {
        let state = app_state();
        let err = click_handler(State(state), Path(4242))
            .await
            .expect_err("no such marker");
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_click_selects() {
        let state = app_state();
        load_sample(&state);
        let Json(view) = state_handler(State(state.clone())).await;
        let id = view.map.expect("map").markers[0].id;

        let Json(view) = click_handler(State(state.clone()), Path(id.0)).await.expect("clicked");
        assert!(view.selected.is_some());
        assert!(state.selection.current().is_some());

        let Json(view) = clear_selection_handler(State(state.clone())).await;
        assert!(view.selected.is_none());
        assert!(state.selection.current().is_none());
    }

    #[tokio::test]
    async fn test_view_report_pans_back() {
        let state = app_state();
        let report = ViewReport {
            lat: 10.0,
            lng: 250.0,
            zoom: 3.0,
        };
        let Json(view) = view_handler(State(state), Json(report)).await.expect("view");
        let frame = view.map.expect("map");
        assert!((frame.center.lng - 180.0).abs() < f64::EPSILON);
        assert!(!frame.commands.is_empty());
    }
}

// ============================================================================
// HTML Template (embedded for single-binary deployment)
// ============================================================================

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Quakelens - Earthquake Visualizer</title>

    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>

    <style>
        :root {
            --font: -apple-system, BlinkMacSystemFont, 'Inter', sans-serif;
            --bg: #f1f5f9;
            --card: rgba(255, 255, 255, 0.92);
            --text: #0f172a;
            --muted: #64748b;
            --accent: #2563eb;
            --danger: #dc2626;
            --radius: 10px;
            --shadow: 0 4px 6px -1px rgba(0,0,0,0.1);
        }
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body { font-family: var(--font); background: var(--bg); color: var(--text); height: 100vh; }
        .layout { display: grid; grid-template-columns: 280px 1fr; gap: 1rem; padding: 1rem; height: 100vh; }
        @media (max-width: 900px) { .layout { grid-template-columns: 1fr; grid-template-rows: auto 1fr; } }
        .card { background: var(--card); border-radius: var(--radius); box-shadow: var(--shadow); padding: 0.75rem 1rem; }
        .sidebar { display: flex; flex-direction: column; gap: 1rem; }
        .main { display: flex; flex-direction: column; gap: 0.5rem; min-height: 0; }
        h1 { font-size: 1.1rem; color: var(--accent); }
        h2 { font-size: 0.9rem; margin-bottom: 0.5rem; }
        .stats { display: flex; justify-content: space-between; text-align: center; }
        .stats b { display: block; font-size: 1.5rem; }
        .stats span { font-size: 0.7rem; color: var(--muted); }
        .threshold { font-size: 1.4rem; font-weight: 700; text-align: center; color: var(--accent); }
        input[type=range] { width: 100%; }
        .legend { list-style: none; font-size: 0.75rem; }
        .legend li { display: flex; gap: 0.5rem; align-items: center; }
        .legend .swatch { width: 10px; height: 10px; border-radius: 50%; }
        .legend .range { width: 2.5rem; font-weight: 600; }
        .header-meta { font-size: 0.8rem; color: var(--muted); display: flex; gap: 1rem; flex-wrap: wrap; }
        .toolbar { display: flex; justify-content: flex-end; }
        button { background: var(--accent); color: white; border: 0; border-radius: 6px; padding: 0.35rem 0.9rem; cursor: pointer; }
        button:disabled { opacity: 0.6; cursor: progress; }
        #map { flex: 1; min-height: 200px; border-radius: var(--radius); background: #f8fafc; }
        #details { height: 140px; overflow-y: auto; font-size: 0.85rem; }
        #details .tsunami { color: var(--danger); font-weight: 600; }
        #error { display: none; background: #fef2f2; color: #991b1b; border: 1px solid #fecaca; }
        #error.visible { display: flex; justify-content: space-between; align-items: center; }
        .quake-popup h3 { font-size: 0.9rem; margin-bottom: 0.25rem; }
        .quake-popup .tsunami { color: var(--danger); font-weight: 600; }
    </style>
</head>
<body>
<div class="layout">
    <aside class="sidebar">
        <div class="card">
            <h2>Live Statistics</h2>
            <div class="stats">
                <div><b id="stat-total">-</b><span>Events</span></div>
                <div><b id="stat-max">-</b><span>Max Mag</span></div>
                <div><b id="stat-avg">-</b><span>Avg Mag</span></div>
            </div>
        </div>
        <div class="card">
            <h2>Filter</h2>
            <div class="threshold" id="threshold-value">2.5</div>
            <input type="range" id="threshold" min="0" max="8" step="0.5" value="2.5">
        </div>
        <div class="card">
            <h2>Magnitude Scale</h2>
            <ul class="legend">
{{LEGEND}}
            </ul>
        </div>
    </aside>
    <main class="main">
        <div class="card" id="error"><span id="error-text"></span><button id="retry">Retry</button></div>
        <div class="card">
            <h1>Quakelens - Earthquake Visualizer</h1>
            <div class="header-meta" id="header-meta">Loading earthquake data...</div>
        </div>
        <div class="toolbar"><button id="refresh">Refresh Data</button></div>
        <div id="map"></div>
        <div class="card" id="details">Select an earthquake from the map to see details.</div>
    </main>
</div>
<script>
(async function () {
    const post = (url, body) => fetch(url, {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: body === undefined ? undefined : JSON.stringify(body),
    });

    const config = await (await fetch('/api/config')).json();
    const v = config.view;
    const bounds = (b) => [[b.south_west.lat, b.south_west.lng], [b.north_east.lat, b.north_east.lng]];

    const map = L.map('map', {
        center: [v.center.lat, v.center.lng],
        zoom: v.zoom,
        minZoom: v.min_zoom,
        maxZoom: v.max_zoom,
        worldCopyJump: v.world_copy_jump,
        maxBounds: bounds(v.max_bounds),
        maxBoundsViscosity: v.max_bounds_viscosity,
    });
    L.tileLayer(config.tiles.url_template, {
        attribution: config.tiles.attribution,
        maxZoom: config.tiles.max_zoom,
        noWrap: config.tiles.no_wrap,
        bounds: bounds(config.tiles.bounds),
    }).addTo(map);

    const markers = L.layerGroup().addTo(map);
    const slider = document.getElementById('threshold');
    slider.min = config.slider.min;
    slider.max = config.slider.max;
    slider.step = config.slider.step;
    slider.value = config.min_magnitude;

    const text = (id, value) => { document.getElementById(id).textContent = value; };

    function renderDetails(selected) {
        const el = document.getElementById('details');
        el.replaceChildren();
        if (!selected) {
            el.textContent = 'Select an earthquake from the map to see details.';
            return;
        }
        const line = (content, cls) => {
            const p = document.createElement('p');
            p.textContent = content;
            if (cls) p.className = cls;
            el.appendChild(p);
        };
        const close = document.createElement('button');
        close.textContent = 'Close';
        close.style.float = 'right';
        close.addEventListener('click', async () => render(await (await post('/api/selection/clear')).json()));
        el.appendChild(close);
        const title = document.createElement('h2');
        title.textContent = selected.title;
        el.appendChild(title);
        line('Magnitude: ' + (selected.magnitude ?? 'unknown'));
        line('Location: ' + selected.place);
        line('Time: ' + selected.time);
        if (selected.tsunami_warning) line('Tsunami Warning!', 'tsunami');
        if (selected.alert_level) line('Alert Level: ' + selected.alert_level);
        if (selected.url) {
            const a = document.createElement('a');
            a.href = selected.url;
            a.target = '_blank';
            a.rel = 'noopener noreferrer';
            a.textContent = 'View USGS Details';
            el.appendChild(a);
        }
    }

    function render(view) {
        const error = document.getElementById('error');
        error.classList.toggle('visible', !!view.error);
        text('error-text', view.error || '');
        document.getElementById('refresh').disabled = view.loading;

        text('threshold-value', view.min_magnitude.toFixed(1));
        if (view.stats) {
            text('stat-total', view.stats.total);
            text('stat-max', view.stats.max_magnitude == null ? '-' : view.stats.max_magnitude.toFixed(1));
            text('stat-avg', view.stats.avg_magnitude ?? '-');
        }
        if (view.header) {
            text('header-meta', 'Updated: ' + view.header.updated +
                '  ·  Showing: ' + view.header.showing + ' of ' + view.header.total +
                '  ·  Source: USGS  ·  Period: Last 24h');
        } else {
            text('header-meta', view.loading ? 'Loading earthquake data...' : 'Real-time earthquake monitoring from USGS');
        }
        renderDetails(view.selected);

        if (!view.map) return;
        markers.clearLayers();
        for (const m of view.map.markers) {
            L.circleMarker([m.position.lat, m.position.lng], {
                radius: m.radius,
                fillColor: m.fill_color,
                color: m.color,
                weight: m.weight,
                opacity: m.opacity,
                fillOpacity: m.fill_opacity,
                className: 'earthquake-marker',
            }).on('click', async () => {
                const res = await post('/api/markers/' + m.id + '/click');
                if (res.ok) render(await res.json());
            }).addTo(markers);
        }
        for (const c of view.map.commands) {
            if (c.kind === 'pan_to') map.panTo([c.center.lat, c.center.lng]);
            else if (c.kind === 'invalidate_size') map.invalidateSize();
            else if (c.kind === 'open_popup') L.popup().setLatLng([c.at.lat, c.at.lng]).setContent(c.html).openOn(map);
        }
    }

    const refreshState = async () => render(await (await fetch('/api/state')).json());
    const reportView = async () => {
        const c = map.getCenter();
        const res = await post('/api/view', { lat: c.lat, lng: c.lng, zoom: map.getZoom() });
        if (res.ok) render(await res.json());
    };

    map.on('moveend', reportView);
    slider.addEventListener('input', async () => {
        const res = await post('/api/filter', { min_magnitude: Number(slider.value) });
        if (res.ok) render(await res.json());
    });
    document.getElementById('refresh').addEventListener('click', () => post('/api/refresh'));
    document.getElementById('retry').addEventListener('click', () => post('/api/refresh'));

    new ResizeObserver(async () => render(await (await post('/api/view/resize')).json()))
        .observe(document.getElementById('map'));
    map.whenReady(async () => render(await (await post('/api/view/ready')).json()));

    const events = new EventSource('/stream');
    events.addEventListener('feed', refreshState);
    events.addEventListener('selection', refreshState);
    await refreshState();
})();
</script>
</body>
</html>
"##;
