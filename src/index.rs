//! In-memory index of resolved news markers.
//!
//! The index is rebuilt from scratch by every committed refresh cycle and
//! is otherwise only touched by visibility recomputation. Visibility is a
//! pure function of the filter criteria, the clock and the marker's own
//! country and date; see [`is_visible`].

use crate::models::{
    ALL_COUNTRIES, Coordinates, FeedEntry, FilterCriteria, GeocodeResult, MarkerId, NewsMarker,
};
use crate::utils::parse_pub_date;
use chrono::{DateTime, Utc};
use itertools::Itertools;

/// Whether a marker passes the filter at instant `now`.
///
/// A marker with an unparseable publish date never passes.
pub fn is_visible(marker: &NewsMarker, criteria: &FilterCriteria, now: DateTime<Utc>) -> bool {
    let country_ok = criteria.matches_all_countries() || marker.country == criteria.country;
    let recent = marker.published_at.is_some_and(|published| {
        (now - published).num_milliseconds() <= criteria.time_window.duration_ms()
    });
    country_ok && recent
}

/// The markers of the current refresh generation.
#[derive(Debug, Default)]
pub struct NewsItemIndex {
    markers: Vec<NewsMarker>,
    countries: Vec<String>,
}

impl NewsItemIndex {
    /// Discard every marker and recompute the country options.
    pub fn clear(&mut self) {
        self.markers.clear();
        self.countries.clear();
    }

    /// Append a marker for an entry that resolved to `geo`.
    ///
    /// New markers start visible; the next filter pass settles them.
    pub fn push(&mut self, entry: &FeedEntry, geo: GeocodeResult) -> MarkerId {
        let id = MarkerId(self.markers.len());
        self.markers.push(NewsMarker {
            id,
            source: entry.source.clone(),
            title: entry.title.clone(),
            link: entry.link.clone(),
            coordinates: geo.coordinates,
            country: geo.country,
            published_at: parse_pub_date(&entry.published_at),
            visible: true,
        });
        id
    }

    /// Recompute the distinct countries in first-occurrence order.
    ///
    /// Called after a full refresh only; filter changes leave the options
    /// alone.
    pub fn refresh_countries(&mut self) {
        self.countries = self
            .markers
            .iter()
            .map(|m| m.country.clone())
            .unique()
            .collect();
    }

    /// Selector options: `"all"` followed by every known country.
    pub fn country_options(&self) -> Vec<String> {
        std::iter::once(ALL_COUNTRIES.to_string())
            .chain(self.countries.iter().cloned())
            .collect()
    }

    pub fn has_country(&self, country: &str) -> bool {
        country == ALL_COUNTRIES || self.countries.iter().any(|c| c == country)
    }

    /// Recompute `visible` on every marker.
    pub fn apply_filter(&mut self, criteria: &FilterCriteria, now: DateTime<Utc>) {
        for marker in &mut self.markers {
            marker.visible = is_visible(marker, criteria, now);
        }
    }

    pub fn markers(&self) -> &[NewsMarker] {
        &self.markers
    }

    pub fn get(&self, id: MarkerId) -> Option<&NewsMarker> {
        self.markers.get(id.0)
    }

    pub fn visible(&self) -> impl Iterator<Item = &NewsMarker> {
        self.markers.iter().filter(|m| m.visible)
    }

    pub fn visible_coordinates(&self) -> Vec<Coordinates> {
        self.visible().map(|m| m.coordinates).collect()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{entry_aged, geo, now};
    use super::*;
    use crate::models::TimeWindow;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn marker(country: &str, age: Duration) -> NewsMarker {
        let mut index = NewsItemIndex::default();
        index.push(&entry_aged("x", age), geo(country));
        index.markers()[0].clone()
    }

    #[test]
    fn test_visibility_window_boundaries() {
        let day = FilterCriteria::new("all", TimeWindow::Day);
        assert!(is_visible(&marker("Ghana", Duration::milliseconds(0)), &day, now()));
        assert!(is_visible(&marker("Ghana", Duration::milliseconds(86_400_000)), &day, now()));
        assert!(!is_visible(&marker("Ghana", Duration::milliseconds(86_401_000)), &day, now()));

        let month = FilterCriteria::new("all", TimeWindow::Month);
        assert!(is_visible(&marker("Ghana", Duration::days(30)), &month, now()));
        assert!(!is_visible(&marker("Ghana", Duration::days(31)), &month, now()));

        let year = FilterCriteria::new("all", TimeWindow::Year);
        assert!(is_visible(&marker("Ghana", Duration::days(365)), &year, now()));
        assert!(!is_visible(&marker("Ghana", Duration::days(366)), &year, now()));
    }

    #[test]
    fn test_visibility_country_match() {
        let m = marker("Ghana", Duration::hours(1));
        assert!(is_visible(&m, &FilterCriteria::new("Ghana", TimeWindow::Day), now()));
        assert!(!is_visible(&m, &FilterCriteria::new("France", TimeWindow::Day), now()));
        assert!(is_visible(&m, &FilterCriteria::new("all", TimeWindow::Day), now()));
    }

    #[test]
    fn test_unparseable_date_never_visible() {
        let mut entry = entry_aged("x", Duration::zero());
        entry.published_at = "sometime".to_string();
        let mut index = NewsItemIndex::default();
        index.push(&entry, geo("Ghana"));
        index.apply_filter(&FilterCriteria::default(), now());
        assert_eq!(index.visible().count(), 0);
    }

    #[test]
    fn test_apply_filter_is_idempotent() {
        let mut index = NewsItemIndex::default();
        index.push(&entry_aged("a", Duration::days(2)), geo("Ghana"));
        index.push(&entry_aged("b", Duration::hours(2)), geo("Chile"));
        index.push(&entry_aged("c", Duration::hours(3)), geo("Ghana"));
        let criteria = FilterCriteria::new("Ghana", TimeWindow::Day);

        index.apply_filter(&criteria, now());
        let first: Vec<MarkerId> = index.visible().map(|m| m.id).collect();
        index.apply_filter(&criteria, now());
        let second: Vec<MarkerId> = index.visible().map(|m| m.id).collect();

        assert_eq!(first, vec![MarkerId(2)]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_country_options_first_occurrence_order() {
        let mut index = NewsItemIndex::default();
        for country in ["Ghana", "Chile", "Ghana", "Unknown", "Chile"] {
            index.push(&entry_aged(country, Duration::hours(1)), geo(country));
        }
        assert_eq!(index.country_options(), vec!["all"]);
        index.refresh_countries();
        assert_eq!(index.country_options(), vec!["all", "Ghana", "Chile", "Unknown"]);
        assert!(index.has_country("Chile"));
        assert!(!index.has_country("France"));
    }

    #[test]
    fn test_clear_discards_everything() {
        let mut index = NewsItemIndex::default();
        index.push(&entry_aged("a", Duration::hours(1)), geo("Ghana"));
        index.refresh_countries();
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.country_options(), vec!["all"]);
    }
}
