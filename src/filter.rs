//! Filter application and render dispatch.
//!
//! [`FilterEngine`] owns the user's current [`FilterCriteria`] and
//! [`RenderMode`] and pushes the outcome of a filter pass onto a
//! [`MapSurface`], the model of what the map widget is showing.
//!
//! # Dispatch
//!
//! | Mode | Tiles | Discrete markers | Density layer |
//! |------|-------|------------------|---------------|
//! | standard / dark / satellite | per mode | visible markers only | none |
//! | heatmap | standard | none | one, from visible markers |
//!
//! Adding and removing discrete markers checks current membership first,
//! so repeated passes never register a marker twice.

use crate::index::NewsItemIndex;
use crate::models::{Coordinates, FilterCriteria, HeatLayer, MarkerId, RenderMode, TileLayer};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

/// Blur radius of the density layer, in pixels.
pub const HEAT_RADIUS: u32 = 25;

/// Layers currently registered on the map widget.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSurface {
    tiles: TileLayer,
    markers: BTreeSet<MarkerId>,
    heat: Option<HeatLayer>,
}

impl Default for MapSurface {
    fn default() -> Self {
        Self {
            tiles: TileLayer::Standard,
            markers: BTreeSet::new(),
            heat: None,
        }
    }
}

impl MapSurface {
    pub fn tiles(&self) -> TileLayer {
        self.tiles
    }

    pub fn has_marker(&self, id: MarkerId) -> bool {
        self.markers.contains(&id)
    }

    pub fn markers(&self) -> impl Iterator<Item = MarkerId> + '_ {
        self.markers.iter().copied()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn heat(&self) -> Option<&HeatLayer> {
        self.heat.as_ref()
    }

    fn add_marker(&mut self, id: MarkerId) {
        if !self.has_marker(id) {
            self.markers.insert(id);
        }
    }

    fn remove_marker(&mut self, id: MarkerId) {
        if self.has_marker(id) {
            self.markers.remove(&id);
        }
    }

    /// Remove every discrete marker and the density layer. Tiles stay.
    pub fn clear_overlays(&mut self) {
        self.markers.clear();
        self.heat = None;
    }

    fn show_heat(&mut self, points: Vec<Coordinates>) {
        self.heat = Some(HeatLayer {
            points,
            radius: HEAT_RADIUS,
        });
    }
}

/// Current filter selection and presentation mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterEngine {
    criteria: FilterCriteria,
    mode: RenderMode,
}

impl FilterEngine {
    pub fn new(criteria: FilterCriteria, mode: RenderMode) -> Self {
        Self { criteria, mode }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Replace the criteria, recompute visibility and redraw.
    pub fn set_criteria(
        &mut self,
        criteria: FilterCriteria,
        index: &mut NewsItemIndex,
        surface: &mut MapSurface,
        now: DateTime<Utc>,
    ) {
        self.criteria = criteria;
        self.apply(index, surface, now);
    }

    /// Fall back to every country when the selected one disappeared.
    pub fn reconcile_country(&mut self, index: &NewsItemIndex) {
        if !index.has_country(&self.criteria.country) {
            debug!(country = %self.criteria.country, "Selected country no longer present");
            self.criteria.country = crate::models::ALL_COUNTRIES.to_string();
        }
    }

    /// Recompute visibility for the current criteria and redraw.
    #[instrument(level = "debug", skip_all, fields(country = %self.criteria.country, window = ?self.criteria.time_window))]
    pub fn apply(&self, index: &mut NewsItemIndex, surface: &mut MapSurface, now: DateTime<Utc>) {
        index.apply_filter(&self.criteria, now);
        if self.mode.is_heatmap() {
            self.render_theme(index, surface);
        } else {
            show_filtered_markers(index, surface);
        }
        debug!(
            visible = index.visible().count(),
            total = index.len(),
            drawn = surface.marker_count(),
            "Applied filters"
        );
    }

    /// Switch presentation mode and redraw with the current visibility.
    pub fn set_mode(&mut self, mode: RenderMode, index: &NewsItemIndex, surface: &mut MapSurface) {
        self.mode = mode;
        self.render_theme(index, surface);
    }

    /// Rebuild tiles and overlays for the current mode.
    fn render_theme(&self, index: &NewsItemIndex, surface: &mut MapSurface) {
        surface.tiles = self.mode.tiles();
        surface.heat = None;
        if self.mode.is_heatmap() {
            surface.markers.clear();
            surface.show_heat(index.visible_coordinates());
        } else {
            show_filtered_markers(index, surface);
        }
    }
}

/// Sync discrete markers with each marker's `visible` flag.
fn show_filtered_markers(index: &NewsItemIndex, surface: &mut MapSurface) {
    for marker in index.markers() {
        if marker.visible {
            surface.add_marker(marker.id);
        } else {
            surface.remove_marker(marker.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::test_support::{entry_aged, geo, now};
    use crate::models::TimeWindow;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn populated() -> NewsItemIndex {
        let mut index = NewsItemIndex::default();
        index.push(&entry_aged("a", Duration::hours(1)), geo("Ghana"));
        index.push(&entry_aged("b", Duration::days(3)), geo("Chile"));
        index.push(&entry_aged("c", Duration::days(60)), geo("Ghana"));
        index.refresh_countries();
        index
    }

    fn ids(surface: &MapSurface) -> Vec<MarkerId> {
        surface.markers().collect()
    }

    #[test]
    fn test_discrete_markers_follow_visibility() {
        let mut index = populated();
        let mut surface = MapSurface::default();
        let mut engine = FilterEngine::default();

        engine.apply(&mut index, &mut surface, now());
        assert_eq!(ids(&surface), vec![MarkerId(0), MarkerId(1)]);

        engine.set_criteria(FilterCriteria::new("Ghana", TimeWindow::Year), &mut index, &mut surface, now());
        assert_eq!(ids(&surface), vec![MarkerId(0), MarkerId(2)]);
        assert!(surface.heat().is_none());
    }

    #[test]
    fn test_repeated_apply_yields_same_surface() {
        let mut index = populated();
        let mut surface = MapSurface::default();
        let engine = FilterEngine::new(FilterCriteria::new("all", TimeWindow::Day), RenderMode::Dark);

        engine.apply(&mut index, &mut surface, now());
        let first = surface.clone();
        engine.apply(&mut index, &mut surface, now());
        assert_eq!(surface, first);
        assert_eq!(surface.marker_count(), 1);
    }

    #[test]
    fn test_country_without_markers_empties_map_but_keeps_tiles() {
        let mut index = populated();
        let mut surface = MapSurface::default();
        let mut engine = FilterEngine::new(FilterCriteria::default(), RenderMode::Satellite);
        engine.set_mode(RenderMode::Satellite, &index, &mut surface);
        engine.apply(&mut index, &mut surface, now());
        assert!(surface.marker_count() > 0);

        engine.set_criteria(FilterCriteria::new("France", TimeWindow::Month), &mut index, &mut surface, now());
        assert_eq!(index.visible().count(), 0);
        assert_eq!(surface.marker_count(), 0);
        assert_eq!(surface.tiles(), TileLayer::Satellite);
    }

    #[test]
    fn test_heatmap_replaces_markers_with_density_layer() {
        let mut index = populated();
        let mut surface = MapSurface::default();
        let mut engine = FilterEngine::default();
        engine.apply(&mut index, &mut surface, now());
        assert_eq!(surface.marker_count(), 2);

        engine.set_mode(RenderMode::Heatmap, &index, &mut surface);
        assert_eq!(surface.marker_count(), 0);
        assert_eq!(surface.tiles(), TileLayer::Standard);
        let heat = surface.heat().unwrap();
        assert_eq!(heat.points.len(), 2);
        assert_eq!(heat.radius, HEAT_RADIUS);

        // Filtering while in heatmap mode rebuilds the single density layer
        engine.set_criteria(FilterCriteria::new("Chile", TimeWindow::Month), &mut index, &mut surface, now());
        assert_eq!(surface.marker_count(), 0);
        assert_eq!(surface.heat().unwrap().points.len(), 1);
    }

    #[test]
    fn test_leaving_heatmap_restores_visible_markers() {
        let mut index = populated();
        let mut surface = MapSurface::default();
        let mut engine = FilterEngine::new(FilterCriteria::new("Ghana", TimeWindow::Month), RenderMode::Heatmap);
        engine.apply(&mut index, &mut surface, now());
        assert!(surface.heat().is_some());

        engine.set_mode(RenderMode::Dark, &index, &mut surface);
        assert!(surface.heat().is_none());
        assert_eq!(surface.tiles(), TileLayer::Dark);
        assert_eq!(ids(&surface), vec![MarkerId(0)]);
    }

    #[test]
    fn test_reconcile_country_falls_back_to_all() {
        let index = populated();
        let mut engine = FilterEngine::new(FilterCriteria::new("Chile", TimeWindow::Day), RenderMode::Standard);
        engine.reconcile_country(&index);
        assert_eq!(engine.criteria().country, "Chile");

        let mut engine = FilterEngine::new(FilterCriteria::new("Peru", TimeWindow::Day), RenderMode::Standard);
        engine.reconcile_country(&index);
        assert_eq!(engine.criteria().country, "all");
        assert_eq!(engine.criteria().time_window, TimeWindow::Day);
    }

    #[test]
    fn test_clear_overlays_keeps_tiles() {
        let mut index = populated();
        let mut surface = MapSurface::default();
        let mut engine = FilterEngine::default();
        engine.set_mode(RenderMode::Dark, &index, &mut surface);
        engine.apply(&mut index, &mut surface, now());
        surface.clear_overlays();
        assert_eq!(surface.marker_count(), 0);
        assert_eq!(surface.tiles(), TileLayer::Dark);
    }
}
