//! User-drawn routes annotated with free-text tags.
//!
//! The drawing itself happens in the map widget. This module receives the
//! finished polyline together with the user's answer to the tag prompt and
//! keeps both for display. Routes are independent of the news pipeline and
//! survive refresh cycles.

use crate::models::{Coordinates, RouteView};

/// The user's answer to "Enter tags for this route (comma separated)".
///
/// `None` means the prompt was dismissed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagRequest {
    pub input: Option<String>,
}

impl TagRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: Some(input.into()),
        }
    }

    pub fn dismissed() -> Self {
        Self { input: None }
    }
}

/// Split comma-separated tags, trimming each and dropping empties.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolve a tag prompt answer into tags.
pub fn annotate(request: &TagRequest) -> Vec<String> {
    request.input.as_deref().map(parse_tags).unwrap_or_default()
}

/// Popup text for a set of tags.
pub fn tags_label(tags: &[String]) -> String {
    if tags.is_empty() {
        "No tags".to_string()
    } else {
        format!("Tags: {}", tags.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub id: usize,
    pub points: Vec<Coordinates>,
    pub tags: Vec<String>,
}

/// The editable layer holding every drawn route.
#[derive(Debug, Default)]
pub struct RouteLayer {
    routes: Vec<Route>,
}

impl RouteLayer {
    /// Store a drawn polyline with the tags from `request`.
    pub fn add(&mut self, points: Vec<Coordinates>, request: &TagRequest) -> usize {
        let id = self.routes.len();
        self.routes.push(Route {
            id,
            points,
            tags: annotate(request),
        });
        id
    }

    /// What to show when the route is clicked; `None` for unknown ids.
    pub fn click(&self, id: usize) -> Option<String> {
        self.routes.get(id).map(|r| tags_label(&r.tags))
    }

    pub fn views(&self) -> Vec<RouteView> {
        self.routes
            .iter()
            .map(|r| RouteView {
                id: r.id,
                points: r.points.clone(),
                tags: r.tags.clone(),
                popup: tags_label(&r.tags),
            })
            .collect()
    }
}
