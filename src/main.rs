//! colfeed - Entry Point

use clap::Parser;
use colfeed::config::{self, CliOverrides};
use colfeed::model::error::AppError;
use colfeed::model::ColumnId;
use colfeed::pipeline::FeedEngine;
use colfeed::source::{load_snapshot, load_updates};
use colfeed::view::{frame_to_json, run_tui, ColorConfig, FeedStyles, TuiOptions};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// colfeed - virtualized feed columns in the terminal
#[derive(Parser, Debug)]
#[command(name = "colfeed")]
#[command(version)]
#[command(about = "Browse notification and activity columns from a JSON snapshot")]
pub struct Args {
    /// Path to the JSON snapshot seeding the store
    pub snapshot: PathBuf,

    /// JSONL stream of item updates, applied one per tick
    #[arg(short, long)]
    pub updates: Option<PathBuf>,

    /// Print the list frames as JSON instead of starting the TUI
    #[arg(long)]
    pub dump: bool,

    /// Only dump this column
    #[arg(long, requires = "dump")]
    pub column: Option<String>,

    /// Collapse runs of similar items
    #[arg(long)]
    pub merge_similar: bool,

    /// Columns at or beyond this position are overridden
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub columns_limit: Option<u64>,

    /// Column width in cells, borders included
    #[arg(long, value_parser = clap::value_parser!(u16).range(12..))]
    pub column_width: Option<u16>,

    /// Disable colors
    #[arg(long)]
    pub no_color: bool,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Overrides for flags the user actually set.
    fn cli_overrides(&self) -> CliOverrides {
        CliOverrides {
            columns_limit: self
                .columns_limit
                .and_then(|limit| usize::try_from(limit).ok()),
            merge_similar: self.merge_similar.then_some(true),
            column_width: self.column_width,
        }
    }
}

fn main() -> Result<(), AppError> {
    let args = Args::parse();

    // Defaults → Config File → Env Vars → CLI Args
    let config = config::resolve(args.config.clone(), args.cli_overrides())?;

    colfeed::logging::init(&config.log_file_path)?;

    info!(
        config = ?config,
        "Configuration loaded and resolved"
    );

    let mut store = load_snapshot(&args.snapshot)?;

    let updates = match &args.updates {
        Some(path) => {
            let (updates, errors) = load_updates(path)?;
            if !errors.is_empty() {
                warn!(skipped = errors.len(), "Skipped malformed update lines");
            }
            updates
        }
        None => Vec::new(),
    };

    if args.dump {
        for update in updates {
            store.apply(update);
        }
        let mut engine = FeedEngine::new(store, config.engine_settings());
        let frames = match &args.column {
            Some(id) => vec![engine.list_frame(&ColumnId::new(id.as_str()))],
            None => engine.frames(),
        };
        for frame in &frames {
            println!("{}", serde_json::to_string(&frame_to_json(frame))?);
        }
        return Ok(());
    }

    let engine = FeedEngine::new(store, config.engine_settings());
    let options = TuiOptions {
        tick: Duration::from_millis(config.tick_interval_ms),
        column_width: config.column_width,
        styles: FeedStyles::with_color_config(ColorConfig::from_env_and_args(args.no_color)),
    };

    run_tui(engine, updates, options)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_help_does_not_error() {
        let result = Args::try_parse_from(["colfeed", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_does_not_error() {
        let result = Args::try_parse_from(["colfeed", "--version"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_snapshot_is_required() {
        let result = Args::try_parse_from(["colfeed"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["colfeed", "feed.json"]);
        assert_eq!(args.snapshot, PathBuf::from("feed.json"));
        assert_eq!(args.updates, None);
        assert!(!args.dump);
        assert_eq!(args.column, None);
        assert!(!args.merge_similar);
        assert_eq!(args.columns_limit, None);
        assert_eq!(args.column_width, None);
        assert!(!args.no_color);
        assert_eq!(args.config, None);
        assert_eq!(args.cli_overrides(), CliOverrides::default());
    }

    #[test]
    fn test_updates_short_flag() {
        let args = Args::parse_from(["colfeed", "feed.json", "-u", "live.jsonl"]);
        assert_eq!(args.updates, Some(PathBuf::from("live.jsonl")));
    }

    #[test]
    fn test_column_requires_dump() {
        let result = Args::try_parse_from(["colfeed", "feed.json", "--column", "inbox"]);
        assert!(result.is_err());

        let args = Args::parse_from(["colfeed", "feed.json", "--dump", "--column", "inbox"]);
        assert_eq!(args.column.as_deref(), Some("inbox"));
    }

    #[test]
    fn test_columns_limit_rejects_zero() {
        let result = Args::try_parse_from(["colfeed", "feed.json", "--columns-limit", "0"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_column_width_rejects_narrow_columns() {
        let result = Args::try_parse_from(["colfeed", "feed.json", "--column-width", "8"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_flags_become_overrides() {
        let args = Args::parse_from([
            "colfeed",
            "feed.json",
            "--merge-similar",
            "--columns-limit",
            "3",
            "--column-width",
            "50",
        ]);

        assert_eq!(
            args.cli_overrides(),
            CliOverrides {
                columns_limit: Some(3),
                merge_similar: Some(true),
                column_width: Some(50),
            }
        );
    }
}
