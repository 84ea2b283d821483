//! Analytics report - computes a dashboard from a JSON snapshot
//!
//! Reads an `AnalyticsSnapshot` (events, quota settings, challenges,
//! opportunities) and writes the viewer's dashboard as JSON to stdout.
//! Logs go to stderr.
//!
//! # Usage
//! ```sh
//! cargo run --bin analytics-report -- snapshot.json --role manager --year 2025 --as-of 2025-06-30
//! ```
//!
//! # Environment Variables
//! - `ANALYTICS_CONFIG_FILE` - TOML engine configuration (overridden by `--config`)
//! - `ANALYTICS_*` - single-value overrides, see `EngineConfig::from_env`
//! - `RUST_LOG` - log filter (default: info)

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use clap::Parser;
use commission_analytics::application::analytics_service::{AnalyticsService, AnalyticsSnapshot};
use commission_analytics::config::{CONFIG_FILE_VAR, EngineConfig};
use commission_analytics::domain::access::{Role, Viewer};
use commission_analytics::domain::primitives::start_of_day;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Compute a performance dashboard from a JSON snapshot", long_about = None)]
struct Cli {
    /// Snapshot JSON file, `-` for stdin
    snapshot: PathBuf,

    /// Calendar year to report (default: year of --as-of)
    #[arg(short, long)]
    year: Option<i32>,

    /// Evaluation time, RFC 3339 or YYYY-MM-DD (default: now)
    #[arg(long)]
    as_of: Option<String>,

    /// Viewing user id
    #[arg(short, long, default_value_t = Uuid::nil())]
    user: Uuid,

    /// Viewer role: admin, manager or sales
    #[arg(short, long, default_value = "admin")]
    role: Role,

    /// Engine configuration TOML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn parse_as_of(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("Invalid --as-of '{}', expected RFC 3339 or YYYY-MM-DD", raw))?;
    Ok(start_of_day(date))
}

fn read_snapshot(path: &PathBuf) -> Result<AnalyticsSnapshot> {
    let content = if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read snapshot from stdin")?;
        buf
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?
    };
    serde_json::from_str(&content).context("Failed to parse snapshot JSON")
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let path = path.to_string_lossy().to_string();
            EngineConfig::from_lookup(|key| {
                if key == CONFIG_FILE_VAR {
                    Some(path.clone())
                } else {
                    std::env::var(key).ok()
                }
            })?
        }
        None => EngineConfig::from_env()?,
    };
    info!(
        "Configuration loaded: terminal policy {:?}, streak anchor {:?}, stuck after {} days",
        config.commission.terminal_policy, config.streak.anchor, config.forecast.stuck_threshold_days
    );

    let as_of = match &cli.as_of {
        Some(raw) => parse_as_of(raw)?,
        None => Utc::now(),
    };
    let year = cli.year.unwrap_or_else(|| as_of.year());

    let snapshot = read_snapshot(&cli.snapshot)?;
    info!(
        "Snapshot: {} events, {} settings, {} challenges, {} opportunities",
        snapshot.events.len(),
        snapshot.settings.len(),
        snapshot.challenges.len(),
        snapshot.opportunities.len()
    );

    let service = AnalyticsService::new(&config);
    let dashboard = service.dashboard(&snapshot, Viewer::new(cli.user, cli.role), year, as_of)?;

    let output = if cli.pretty {
        serde_json::to_string_pretty(&dashboard)?
    } else {
        serde_json::to_string(&dashboard)?
    };
    println!("{}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_as_of_formats() {
        assert_eq!(
            parse_as_of("2025-06-30").unwrap(),
            Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_as_of("2025-06-30T14:00:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap()
        );
        assert!(parse_as_of("30.06.2025").is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["analytics-report", "snapshot.json"]);
        assert_eq!(cli.role, Role::Admin);
        assert_eq!(cli.user, Uuid::nil());
        assert!(cli.year.is_none());
        assert!(!cli.pretty);
    }
}
