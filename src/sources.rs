//! Static catalog of logistics news feeds.
//!
//! The list is fixed at compile time. [`sources`] caps what callers see at
//! [`MAX_SOURCES`] no matter how long the list grows, so adding a feed can
//! never raise the number of concurrent requests made per refresh.

use crate::models::Source;

/// Upper bound on feeds fetched per refresh cycle.
pub const MAX_SOURCES: usize = 15;

pub const RSS_SOURCES: &[Source] = &[
    Source { name: "The Loadstar", endpoint: "https://theloadstar.com/feed/" },
    Source { name: "Port Technology", endpoint: "https://www.porttechnology.org/news/feed/" },
    Source { name: "Supply Chain Digital", endpoint: "https://www.supplychaindigital.com/rss" },
    Source { name: "Maritime Executive", endpoint: "https://www.maritime-executive.com/rss" },
    Source { name: "FreightWaves", endpoint: "https://www.freightwaves.com/feed" },
    Source { name: "Container News", endpoint: "https://container-news.com/feed/" },
    Source { name: "Seatrade Maritime", endpoint: "https://www.seatrade-maritime.com/rss.xml" },
    Source { name: "Hellenic Shipping News", endpoint: "https://www.hellenicshippingnews.com/feed/" },
    Source { name: "gCaptain", endpoint: "https://gcaptain.com/feed/" },
    Source { name: "Splash 247", endpoint: "https://splash247.com/feed/" },
    Source { name: "Journal of Commerce", endpoint: "https://www.joc.com/rssfeed" },
    Source { name: "Inbound Logistics", endpoint: "https://www.inboundlogistics.com/rss" },
    Source { name: "DC Velocity", endpoint: "https://www.dcvelocity.com/rss" },
    Source { name: "Logistics Management", endpoint: "https://www.logisticsmgmt.com/rss" },
    Source { name: "Transport Topics", endpoint: "https://www.ttnews.com/rssfeed/ttnews.xml" },
];

/// The feeds to fetch this cycle.
pub fn sources() -> &'static [Source] {
    capped(RSS_SOURCES)
}

/// Truncate any catalog to [`MAX_SOURCES`] entries.
pub fn capped(catalog: &[Source]) -> &[Source] {
    &catalog[..catalog.len().min(MAX_SOURCES)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_within_cap() {
        assert_eq!(sources().len(), 15);
        assert!(sources().len() <= MAX_SOURCES);
    }

    #[test]
    fn test_capped_truncates_long_catalog() {
        let long: Vec<Source> = RSS_SOURCES.iter().chain(RSS_SOURCES.iter()).copied().collect();
        let read = capped(&long);
        assert_eq!(read.len(), MAX_SOURCES);
        assert_eq!(read[0].name, "The Loadstar");
    }

    #[test]
    fn test_capped_keeps_short_catalog() {
        assert_eq!(capped(&RSS_SOURCES[..3]).len(), 3);
    }
}
