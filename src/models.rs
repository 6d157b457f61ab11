//! Data models for feed entries, geocoding results and map state.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Source`]: A statically configured feed endpoint
//! - [`FeedEntry`]: A relevant entry fetched from one source
//! - [`GeocodeResult`]: The selected geocoding match for one entry
//! - [`NewsMarker`]: A resolved entry placed on the map
//! - [`FilterCriteria`], [`TimeWindow`], [`RenderMode`]: User-facing view state
//! - [`MapSnapshot`]: Read-only, serializable view of the render surface
//!
//! Everything that crosses the render boundary derives `Serialize` so a
//! front-end can consume the JSON written by [`crate::outputs::json`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Synthetic country option matching every marker.
pub const ALL_COUNTRIES: &str = "all";

/// Country recorded when the geocoder returns no address country.
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// A feed endpoint from the source catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Source {
    /// Display name of the outlet.
    pub name: &'static str,
    /// URL of the RSS/Atom feed.
    pub endpoint: &'static str,
}

/// A relevance-filtered entry as fetched from a source.
///
/// Entries are ephemeral: they live for one refresh cycle and are turned
/// into [`ListEntry`] values (always) and [`NewsMarker`] values (when a
/// place could be resolved).
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    /// Name of the source the entry came from.
    pub source: String,
    pub title: String,
    pub link: String,
    /// Publish date exactly as the feed service returned it.
    pub published_at: String,
    /// Entry description, usually an HTML fragment.
    pub description: String,
}

impl FeedEntry {
    /// The text searched for keywords and place names.
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

/// A geographic coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// The geocoding match chosen for an entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodeResult {
    pub coordinates: Coordinates,
    /// Address country, or [`UNKNOWN_COUNTRY`].
    pub country: String,
    /// Relative prominence reported by the geocoder; `0.0` when absent.
    pub importance: f64,
}

/// Identifier of a marker within the current index generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MarkerId(pub usize);

/// A resolved news entry placed on the map.
///
/// Markers are created during a refresh cycle and discarded wholesale by
/// the next committed cycle. Only `visible` ever changes after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsMarker {
    pub id: MarkerId,
    pub source: String,
    pub title: String,
    pub link: String,
    pub coordinates: Coordinates,
    pub country: String,
    /// Parsed publish date. `None` when the feed date could not be parsed;
    /// such markers never pass a time filter.
    pub published_at: Option<DateTime<Utc>>,
    pub visible: bool,
}

impl NewsMarker {
    /// Popup body shown when the marker is clicked.
    pub fn popup(&self) -> String {
        format!("{}: {} ({})", self.source, self.title, self.link)
    }
}

/// A row of the news list. Every fetched entry gets one, mapped or not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListEntry {
    pub source: String,
    pub title: String,
    pub link: String,
    /// The marker this row focuses when clicked.
    pub marker: Option<MarkerId>,
}

/// Contents of the news list panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "entries", rename_all = "lowercase")]
pub enum ListView {
    Loading,
    Entries(Vec<ListEntry>),
    Failed(String),
}

impl Default for ListView {
    fn default() -> Self {
        ListView::Entries(Vec::new())
    }
}

/// Recency window for the time filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Day,
    #[default]
    Month,
    Year,
}

impl TimeWindow {
    /// Window length in milliseconds.
    pub const fn duration_ms(self) -> i64 {
        match self {
            TimeWindow::Day => 86_400_000,
            TimeWindow::Month => 2_592_000_000,
            TimeWindow::Year => 31_536_000_000,
        }
    }

    /// Parse a selector value; anything unrecognised means a month.
    pub fn from_str_lossy(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(TimeWindow::Day),
            "month" => Ok(TimeWindow::Month),
            "year" => Ok(TimeWindow::Year),
            other => Err(format!("unknown time window: {other}")),
        }
    }
}

/// Country and recency filter selected by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// [`ALL_COUNTRIES`] or an exact country name.
    pub country: String,
    pub time_window: TimeWindow,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            country: ALL_COUNTRIES.to_string(),
            time_window: TimeWindow::default(),
        }
    }
}

impl FilterCriteria {
    pub fn new(country: impl Into<String>, time_window: TimeWindow) -> Self {
        Self {
            country: country.into(),
            time_window,
        }
    }

    pub fn matches_all_countries(&self) -> bool {
        self.country == ALL_COUNTRIES
    }
}

/// Background style and marker presentation. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Standard,
    Dark,
    Satellite,
    Heatmap,
}

impl RenderMode {
    /// Tile layer drawn under the markers for this mode.
    pub fn tiles(self) -> TileLayer {
        match self {
            RenderMode::Dark => TileLayer::Dark,
            RenderMode::Satellite => TileLayer::Satellite,
            RenderMode::Standard | RenderMode::Heatmap => TileLayer::Standard,
        }
    }

    pub fn is_heatmap(self) -> bool {
        matches!(self, RenderMode::Heatmap)
    }
}

impl FromStr for RenderMode {
    type Err = String;

    /// Accepts the theme selector values `default|dark|satellite|heatmap`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "standard" => Ok(RenderMode::Standard),
            "dark" => Ok(RenderMode::Dark),
            "satellite" => Ok(RenderMode::Satellite),
            "heatmap" => Ok(RenderMode::Heatmap),
            other => Err(format!("unknown theme: {other}")),
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderMode::Standard => "default",
            RenderMode::Dark => "dark",
            RenderMode::Satellite => "satellite",
            RenderMode::Heatmap => "heatmap",
        };
        f.write_str(name)
    }
}

/// Background tile layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TileLayer {
    Standard,
    Dark,
    Satellite,
}

impl TileLayer {
    pub fn url_template(self) -> &'static str {
        match self {
            TileLayer::Standard => "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            TileLayer::Dark => "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png",
            TileLayer::Satellite => {
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
            }
        }
    }

    pub fn attribution(self) -> &'static str {
        match self {
            TileLayer::Standard => "© OpenStreetMap contributors",
            TileLayer::Dark => "© OpenStreetMap contributors & CartoDB",
            TileLayer::Satellite => "Tiles © Esri",
        }
    }
}

/// Density layer built from visible marker coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatLayer {
    pub points: Vec<Coordinates>,
    /// Blur radius in pixels.
    pub radius: u32,
}

/// Serialized tile layer description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileView {
    pub layer: TileLayer,
    pub url: &'static str,
    pub attribution: &'static str,
}

impl From<TileLayer> for TileView {
    fn from(layer: TileLayer) -> Self {
        Self {
            layer,
            url: layer.url_template(),
            attribution: layer.attribution(),
        }
    }
}

/// A discrete marker currently registered on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerView {
    pub id: MarkerId,
    pub coordinates: Coordinates,
    pub country: String,
    pub popup: String,
}

/// A drawn route as exposed to the front-end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteView {
    pub id: usize,
    pub points: Vec<Coordinates>,
    pub tags: Vec<String>,
    pub popup: String,
}

/// Where the map should move after a list entry was clicked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Focus {
    pub coordinates: Coordinates,
    pub zoom: u8,
    pub popup: String,
}

/// Everything a front-end needs to draw the current map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSnapshot {
    /// Generation of the refresh cycle that produced the markers.
    pub generation: u64,
    pub criteria: FilterCriteria,
    pub mode: RenderMode,
    pub tiles: TileView,
    pub markers: Vec<MarkerView>,
    pub heat: Option<HeatLayer>,
    pub countries: Vec<String>,
    pub list: ListView,
    pub routes: Vec<RouteView>,
    /// Last focus request, cleared when the markers are replaced.
    pub focus: Option<Focus>,
}
