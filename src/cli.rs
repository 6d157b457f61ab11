//! Command-line interface definitions for Freight Atlas.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Endpoints can also be provided via environment variables; anything left
//! unset falls back to the YAML config file, then to built-in defaults.

use clap::Parser;

/// Command-line arguments for the Freight Atlas application.
///
/// # Examples
///
/// ```sh
/// # Refresh every six hours, writing snapshots to ./site/data
/// freight_atlas -o ./site/data
///
/// # One cycle, dark theme, only the last day of news from Belgium
/// freight_atlas -o ./out --once --theme dark --window day --country Belgium
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output directory for JSON map snapshots
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Initial country filter ("all" or a country name)
    #[arg(long, default_value = "all")]
    pub country: String,

    /// Initial time window: day, month or year (anything else means month)
    #[arg(long, default_value = "month")]
    pub window: String,

    /// Initial theme: default, dark, satellite or heatmap
    #[arg(long, default_value = "default")]
    pub theme: String,

    /// Run a single refresh cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Feed-to-JSON conversion endpoint
    #[arg(long, env = "FEED_ENDPOINT")]
    pub feed_endpoint: Option<String>,

    /// Place search endpoint
    #[arg(long, env = "GEOCODE_ENDPOINT")]
    pub geocode_endpoint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["freight_atlas"]);
        assert_eq!(cli.output_dir, None);
        assert_eq!(cli.country, "all");
        assert_eq!(cli.window, "month");
        assert_eq!(cli.theme, "default");
        assert!(!cli.once);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "freight_atlas",
            "-o",
            "/tmp/atlas",
            "-c",
            "/etc/atlas.yaml",
            "--once",
            "--theme",
            "heatmap",
        ]);

        assert_eq!(cli.output_dir.as_deref(), Some("/tmp/atlas"));
        assert_eq!(cli.config.as_deref(), Some("/etc/atlas.yaml"));
        assert!(cli.once);
        assert_eq!(cli.theme, "heatmap");
    }
}
