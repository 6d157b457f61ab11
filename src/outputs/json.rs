//! JSON output of the map state for the front-end.
//!
//! After every refresh cycle (and at shutdown) the current [`MapSnapshot`]
//! is serialized for the page that draws the map.
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── map.json              # latest snapshot, replaced atomically
//! └── 2025-05-06/
//!     └── generation-3.json # history, one file per committed cycle
//! ```
//!
//! `map.json` is written to a temporary file first and renamed into place
//! so a polling reader never sees a half-written document.

use crate::models::{ListView, MapSnapshot};
use chrono::Utc;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// File name of the latest snapshot.
pub const LATEST_FILE: &str = "map.json";

/// Write a [`MapSnapshot`] as the latest map plus a dated history entry.
///
/// # Arguments
///
/// * `snapshot` - The map state to serialize
/// * `output_dir` - Base directory for JSON output
///
/// # Returns
///
/// The path of the latest snapshot, or an error if directory creation or
/// file writing fails.
///
/// # History
///
/// Only snapshots whose list holds entries get a history file; loading and
/// failure states are transient and overwrite `map.json` alone.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir, generation = snapshot.generation))]
pub async fn write_snapshot(
    snapshot: &MapSnapshot,
    output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(snapshot)?;
    let base = Path::new(output_dir);

    if let Err(e) = fs::create_dir_all(base).await {
        error!(error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let latest = base.join(LATEST_FILE);
    let staging = base.join(format!(".{LATEST_FILE}.tmp"));
    fs::write(&staging, &json).await?;
    fs::rename(&staging, &latest).await?;
    info!(path = %latest.display(), markers = snapshot.markers.len(), "Wrote map snapshot");

    if matches!(snapshot.list, ListView::Entries(_)) && snapshot.generation > 0 {
        let dated_dir = base.join(Utc::now().date_naive().to_string());
        fs::create_dir_all(&dated_dir).await?;
        let history = dated_dir.join(format!("generation-{}.json", snapshot.generation));
        fs::write(&history, &json).await?;
        info!(path = %history.display(), "Wrote snapshot history");
    }

    Ok(latest)
}
