//! The refresh cycle and the map state it maintains.
//!
//! A [`Pipeline`] owns every piece of mutable state (index, render surface,
//! filter engine, list view, routes) inside a single [`MapState`]. Refresh
//! cycles and user actions all run on one task; state is only mutated in
//! short synchronous sections, never across an await point.
//!
//! # Refresh cycle
//!
//! 1. **Begin**: take the next generation number, show "Loading..."
//! 2. **Collect**: fetch all sources, then for each entry in turn extract
//!    places and geocode them one by one
//! 3. **Commit**: unless a newer cycle has started meanwhile, hard-reset the
//!    index and overlays, add markers for resolved entries, list every
//!    entry, recompute country options and re-apply the current filter
//!
//! A panic escaping the collect step leaves the map as it was and replaces
//! the list with [`FAILURE_MESSAGE`].
//!
//! User actions ([`UserAction`]) may arrive while a cycle is collecting;
//! they change the criteria or mode right away and the commit renders with
//! whatever is current at that moment.

use crate::commands::UserAction;
use crate::extract::extract_locations;
use crate::feeds::{FeedClient, fetch_all};
use crate::filter::{FilterEngine, MapSurface};
use crate::geocode::{Geocoder, resolve_best};
use crate::index::NewsItemIndex;
use crate::models::{
    Coordinates, FeedEntry, FilterCriteria, Focus, GeocodeResult, ListEntry, ListView, MapSnapshot,
    MarkerView, RenderMode, Source, TileView,
};
use crate::routes::{RouteLayer, TagRequest};
use crate::sources::capped;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::AssertUnwindSafe;
use tracing::{error, info, instrument, warn};

/// List contents shown after a failed cycle.
pub const FAILURE_MESSAGE: &str = "Failed to load news.";

/// Zoom level used when a list entry focuses its marker.
pub const FOCUS_ZOOM: u8 = 6;

/// An entry after place resolution.
#[derive(Debug, Clone)]
pub struct ResolvedEntry {
    pub entry: FeedEntry,
    pub geo: Option<GeocodeResult>,
}

/// How a refresh cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Committed {
        generation: u64,
        entries: usize,
        mapped: usize,
    },
    /// A newer cycle started first; results were dropped.
    Superseded { generation: u64 },
    Failed { generation: u64 },
}

/// All mutable map state.
#[derive(Debug, Default)]
pub struct MapState {
    pub index: NewsItemIndex,
    pub surface: MapSurface,
    pub engine: FilterEngine,
    pub list: ListView,
    pub routes: RouteLayer,
    pub focus: Option<Focus>,
    /// Generation of the last committed cycle.
    pub generation: u64,
}

impl MapState {
    pub fn snapshot(&self) -> MapSnapshot {
        MapSnapshot {
            generation: self.generation,
            criteria: self.engine.criteria().clone(),
            mode: self.engine.mode(),
            tiles: TileView::from(self.surface.tiles()),
            markers: self
                .surface
                .markers()
                .filter_map(|id| self.index.get(id))
                .map(|m| MarkerView {
                    id: m.id,
                    coordinates: m.coordinates,
                    country: m.country.clone(),
                    popup: m.popup(),
                })
                .collect(),
            heat: self.surface.heat().cloned(),
            countries: self.index.country_options(),
            list: self.list.clone(),
            routes: self.routes.views(),
            focus: self.focus.clone(),
        }
    }
}

/// Fetch → extract → resolve → index, plus the user-facing map actions.
pub struct Pipeline<C, G> {
    feeds: C,
    geocoder: G,
    sources: Vec<Source>,
    state: RefCell<MapState>,
    /// Generation handed to the most recently started cycle.
    started: Cell<u64>,
    clock: fn() -> DateTime<Utc>,
}

impl<C: FeedClient, G: Geocoder> Pipeline<C, G> {
    pub fn new(feeds: C, geocoder: G, sources: Vec<Source>, engine: FilterEngine) -> Self {
        let mode = engine.mode();
        let mut state = MapState {
            engine,
            ..MapState::default()
        };
        let MapState {
            index,
            surface,
            engine,
            ..
        } = &mut state;
        engine.set_mode(mode, index, surface);
        Self {
            feeds,
            geocoder,
            sources,
            state: RefCell::new(state),
            started: Cell::new(0),
            clock: Utc::now,
        }
    }

    /// Replace the wall clock used for time filtering.
    #[cfg(test)]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Run one refresh cycle to completion.
    #[instrument(level = "info", skip_all)]
    pub async fn refresh(&self) -> CycleOutcome {
        let generation = self.begin();
        match AssertUnwindSafe(self.collect()).catch_unwind().await {
            Ok(resolved) => self.commit(generation, resolved),
            Err(panic) => self.fail(generation, panic),
        }
    }

    fn begin(&self) -> u64 {
        let generation = self.started.get() + 1;
        self.started.set(generation);
        self.state.borrow_mut().list = ListView::Loading;
        info!(generation, "Refresh cycle started");
        generation
    }

    async fn collect(&self) -> Vec<ResolvedEntry> {
        let per_source = fetch_all(&self.feeds, capped(&self.sources)).await;
        let mut resolved = Vec::new();
        // One entry at a time keeps a single request in flight to the geocoder
        for entry in per_source.into_iter().flatten() {
            let places = extract_locations(&entry.searchable_text());
            let geo = if places.is_empty() {
                None
            } else {
                resolve_best(&self.geocoder, &places).await
            };
            resolved.push(ResolvedEntry { entry, geo });
        }
        resolved
    }

    fn is_stale(&self, generation: u64) -> bool {
        generation < self.started.get()
    }

    fn commit(&self, generation: u64, resolved: Vec<ResolvedEntry>) -> CycleOutcome {
        if self.is_stale(generation) {
            warn!(generation, latest = self.started.get(), "Discarding results of superseded cycle");
            return CycleOutcome::Superseded { generation };
        }

        let now = (self.clock)();
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.index.clear();
        state.surface.clear_overlays();
        state.focus = None;

        let entries = resolved.len();
        let list: Vec<ListEntry> = resolved
            .into_iter()
            .map(|r| ListEntry {
                marker: r.geo.map(|geo| state.index.push(&r.entry, geo)),
                source: r.entry.source,
                title: r.entry.title,
                link: r.entry.link,
            })
            .collect();
        let mapped = state.index.len();
        if state.index.is_empty() && entries > 0 {
            warn!(generation, entries, "No entry could be placed on the map");
        }

        state.index.refresh_countries();
        state.engine.reconcile_country(&state.index);
        state.list = ListView::Entries(list);
        state.generation = generation;
        state.engine.apply(&mut state.index, &mut state.surface, now);

        info!(generation, entries, mapped, "Refresh cycle committed");
        CycleOutcome::Committed {
            generation,
            entries,
            mapped,
        }
    }

    fn fail(&self, generation: u64, panic: Box<dyn Any + Send>) -> CycleOutcome {
        let reason = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        if self.is_stale(generation) {
            warn!(generation, %reason, "Superseded cycle failed");
            return CycleOutcome::Superseded { generation };
        }
        error!(generation, %reason, "Refresh cycle failed; keeping previous map");
        self.state.borrow_mut().list = ListView::Failed(FAILURE_MESSAGE.to_string());
        CycleOutcome::Failed { generation }
    }

    /// Apply one user action to the map state.
    pub fn perform(&self, action: UserAction) {
        match action {
            UserAction::Filter(criteria) => {
                info!(country = %criteria.country, window = ?criteria.time_window, "Applying filters");
                self.apply_filters(criteria);
            }
            UserAction::Theme(mode) => {
                info!(%mode, "Switching theme");
                self.apply_theme(mode);
            }
            UserAction::Focus(row) => {
                let focus = self.focus(row);
                match &focus {
                    Some(f) => info!(
                        row,
                        lat = f.coordinates.lat,
                        lon = f.coordinates.lon,
                        zoom = f.zoom,
                        popup = %f.popup,
                        "Focusing marker"
                    ),
                    None => info!(row, "List entry has no marker"),
                }
                self.state.borrow_mut().focus = focus;
            }
            UserAction::Route { points, tags } => {
                let id = self.add_route(points, &tags);
                info!(id, "Route added");
            }
            UserAction::Click(id) => match self.click_route(id) {
                Some(label) => info!(id, %label, "Route clicked"),
                None => warn!(id, "No such route"),
            },
        }
    }

    /// Apply new filter criteria (the "apply" button).
    pub fn apply_filters(&self, criteria: FilterCriteria) {
        let now = (self.clock)();
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state
            .engine
            .set_criteria(criteria, &mut state.index, &mut state.surface, now);
    }

    /// Switch the theme selector.
    pub fn apply_theme(&self, mode: RenderMode) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.engine.set_mode(mode, &state.index, &mut state.surface);
    }

    /// Where to move the map when list row `row` is clicked.
    pub fn focus(&self, row: usize) -> Option<Focus> {
        let state = self.state.borrow();
        let ListView::Entries(entries) = &state.list else {
            return None;
        };
        let marker = state.index.get(entries.get(row)?.marker?)?;
        Some(Focus {
            coordinates: marker.coordinates,
            zoom: FOCUS_ZOOM,
            popup: marker.popup(),
        })
    }

    /// Record a drawn route; returns its id.
    pub fn add_route(&self, points: Vec<Coordinates>, request: &TagRequest) -> usize {
        self.state.borrow_mut().routes.add(points, request)
    }

    pub fn click_route(&self, id: usize) -> Option<String> {
        self.state.borrow().routes.click(id)
    }

    pub fn snapshot(&self) -> MapSnapshot {
        self.state.borrow().snapshot()
    }

    /// Generation of the last committed cycle; 0 before the first.
    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }
}
