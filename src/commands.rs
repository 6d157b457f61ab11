//! Line-oriented user commands.
//!
//! The page hosting the map forwards user actions to the process, one
//! command per line (on stdin by default):
//!
//! | Command | Effect |
//! |---------|--------|
//! | `refresh` | start a refresh cycle now |
//! | `filter <day\|month\|year> [country]` | apply filters; no country means all |
//! | `theme <default\|dark\|satellite\|heatmap>` | switch the render mode |
//! | `focus <row>` | focus the marker of a list entry |
//! | `route <lat,lon;lat,lon;...> [tags]` | record a drawn route; no tags means the prompt was dismissed |
//! | `click <route id>` | show a route's tag label |
//!
//! Unknown window names mean a month, like the selector does.

use crate::error::CommandError;
use crate::models::{ALL_COUNTRIES, Coordinates, FilterCriteria, RenderMode, TimeWindow};
use crate::routes::TagRequest;
use futures::stream::{Stream, StreamExt};
use std::future::ready;
use std::str::FromStr;
use tracing::warn;

/// Something the user did.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Refresh,
    Action(UserAction),
}

/// A user action applied directly to the map state.
#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    Filter(FilterCriteria),
    Theme(RenderMode),
    Focus(usize),
    Route {
        points: Vec<Coordinates>,
        tags: TagRequest,
    },
    Click(usize),
}

fn split_word(text: &str) -> (&str, &str) {
    match text.trim().split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (text.trim(), ""),
    }
}

fn parse_index(arg: &str, command: &'static str) -> Result<usize, CommandError> {
    if arg.is_empty() {
        return Err(CommandError::Missing(command));
    }
    arg.parse().map_err(|_| CommandError::Invalid(arg.to_string()))
}

fn parse_coordinate(pair: &str) -> Result<Coordinates, CommandError> {
    let invalid = || CommandError::Invalid(pair.to_string());
    let (lat, lon) = pair.split_once(',').ok_or_else(invalid)?;
    Ok(Coordinates {
        lat: lat.trim().parse().map_err(|_| invalid())?,
        lon: lon.trim().parse().map_err(|_| invalid())?,
    })
}

fn parse_route(args: &str) -> Result<UserAction, CommandError> {
    let (path, tags) = split_word(args);
    if path.is_empty() {
        return Err(CommandError::Missing("route"));
    }
    let points = path
        .split(';')
        .filter(|p| !p.trim().is_empty())
        .map(parse_coordinate)
        .collect::<Result<Vec<_>, _>>()?;
    if points.len() < 2 {
        return Err(CommandError::Invalid(format!("route needs two points: {path}")));
    }
    let tags = if tags.is_empty() {
        TagRequest::dismissed()
    } else {
        TagRequest::new(tags)
    };
    Ok(UserAction::Route { points, tags })
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (verb, args) = split_word(line);
        let action = match verb.to_ascii_lowercase().as_str() {
            "" => return Err(CommandError::Empty),
            "refresh" => return Ok(Command::Refresh),
            "filter" => {
                let (window, country) = split_word(args);
                if window.is_empty() {
                    return Err(CommandError::Missing("filter"));
                }
                let country = if country.is_empty() { ALL_COUNTRIES } else { country };
                UserAction::Filter(FilterCriteria::new(country, TimeWindow::from_str_lossy(window)))
            }
            "theme" => UserAction::Theme(args.parse().map_err(CommandError::Invalid)?),
            "focus" => UserAction::Focus(parse_index(args, "focus")?),
            "click" => UserAction::Click(parse_index(args, "click")?),
            "route" => parse_route(args)?,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Command::Action(action))
    }
}

/// Parse a stream of input lines, skipping blank and malformed ones.
pub fn parse_lines<S: Stream<Item = String>>(lines: S) -> impl Stream<Item = Command> {
    lines.filter_map(|line| {
        ready(match line.parse::<Command>() {
            Ok(command) => Some(command),
            Err(CommandError::Empty) => None,
            Err(e) => {
                warn!(error = %e, line = %line, "Ignoring command");
                None
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use pretty_assertions::assert_eq;

    fn action(line: &str) -> UserAction {
        match line.parse::<Command>() {
            Ok(Command::Action(action)) => action,
            other => panic!("expected an action from {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_refresh_and_blank() {
        assert_eq!("refresh".parse::<Command>(), Ok(Command::Refresh));
        assert_eq!("  REFRESH \n".parse::<Command>(), Ok(Command::Refresh));
        assert_eq!("   ".parse::<Command>(), Err(CommandError::Empty));
    }

    #[test]
    fn test_filter_with_multiword_country() {
        assert_eq!(
            action("filter day South Africa"),
            UserAction::Filter(FilterCriteria::new("South Africa", TimeWindow::Day))
        );
        assert_eq!(
            action("filter year"),
            UserAction::Filter(FilterCriteria::new("all", TimeWindow::Year))
        );
        // Unknown windows fall back to a month
        assert_eq!(
            action("filter decade Chile"),
            UserAction::Filter(FilterCriteria::new("Chile", TimeWindow::Month))
        );
        assert_eq!("filter".parse::<Command>(), Err(CommandError::Missing("filter")));
    }

    #[test]
    fn test_theme() {
        assert_eq!(action("theme heatmap"), UserAction::Theme(RenderMode::Heatmap));
        assert_eq!(action("theme default"), UserAction::Theme(RenderMode::Standard));
        assert!(matches!("theme sepia".parse::<Command>(), Err(CommandError::Invalid(_))));
    }

    #[test]
    fn test_focus_and_click() {
        assert_eq!(action("focus 3"), UserAction::Focus(3));
        assert_eq!(action("click 0"), UserAction::Click(0));
        assert_eq!("focus".parse::<Command>(), Err(CommandError::Missing("focus")));
        assert!(matches!("click first".parse::<Command>(), Err(CommandError::Invalid(_))));
    }

    #[test]
    fn test_route_with_and_without_tags() {
        assert_eq!(
            action("route 51.9,4.5;53.5,10.0 feeder, north range"),
            UserAction::Route {
                points: vec![Coordinates { lat: 51.9, lon: 4.5 }, Coordinates { lat: 53.5, lon: 10.0 }],
                tags: TagRequest::new("feeder, north range"),
            }
        );
        assert_eq!(
            action("route 0,0;1,1;2,2"),
            UserAction::Route {
                points: vec![
                    Coordinates { lat: 0.0, lon: 0.0 },
                    Coordinates { lat: 1.0, lon: 1.0 },
                    Coordinates { lat: 2.0, lon: 2.0 },
                ],
                tags: TagRequest::dismissed(),
            }
        );
        assert!(matches!("route 1,1".parse::<Command>(), Err(CommandError::Invalid(_))));
        assert!(matches!("route 1,x;2,2".parse::<Command>(), Err(CommandError::Invalid(_))));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!("zoom 4".parse::<Command>(), Err(CommandError::Unknown("zoom".to_string())));
    }

    #[tokio::test]
    async fn test_parse_lines_skips_bad_input() {
        let lines = stream::iter(["refresh", "", "bogus", "theme dark"].map(String::from));
        let commands: Vec<Command> = parse_lines(lines).collect().await;
        assert_eq!(
            commands,
            vec![Command::Refresh, Command::Action(UserAction::Theme(RenderMode::Dark))]
        );
    }
}
