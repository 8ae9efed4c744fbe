use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

mod config;
mod error;
mod events;
mod paths;
mod reconcile;
mod snapshot;
mod state;
mod ui;
mod writer;

use events::{EventSink, TracingSink};
use paths::analysis::analyze_paths;
use paths::probe::FileProbe;
use paths::resolver::{MappingRule, PathResolver};
use reconcile::engine::{limit_from_arg, ReconciliationEngine};
use reconcile::validity::ValidityWindow;
use snapshot::codec::SnapshotCodec;
use state::data::SortKey;
use state::library::Library;
use state::reader::read_records;
use state::store::JoinSpec;
use writer::apply::CatalogWriter;
use writer::copy::CopyPlan;

#[derive(Parser)]
#[command(name = "media-mtime-repair")]
#[command(
    about = "Reconcile media catalog dates with the real modification times of the files",
    long_about = None
)]
struct Cli {
    /// Path to the media server library database
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Path mapping file, one OLD,NEW prefix rule per line
    #[arg(long, global = true, default_value = config::DEFAULT_MAPPINGS_FILE)]
    mappings: PathBuf,

    /// Prefix rule OLD,NEW (repeatable); replaces the mapping file
    #[arg(long = "map", global = true, value_name = "OLD,NEW", value_parser = parse_map_arg)]
    maps: Vec<MappingRule>,

    /// Media server SQLite binary used to copy the catalog (repeatable, tried first)
    #[arg(long = "backup-tool", global = true, value_name = "PATH")]
    backup_tools: Vec<PathBuf>,

    /// Keep timestamps outside [1970, next year] instead of skipping them
    #[arg(long, global = true, default_value_t = false)]
    keep_invalid_dates: bool,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check how many catalog paths resolve, directly or through the mappings
    Analyze {
        /// Number of paths to check (0 or less for all)
        #[arg(long, default_value_t = 30, allow_negative_numbers = true)]
        limit: i64,

        /// Print the analysis as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List recently updated media with their file times, optionally repairing a copy
    Recent {
        /// Number of entries to show (0 or less for all)
        #[arg(long, default_value_t = 30, allow_negative_numbers = true)]
        limit: i64,

        /// Sort entries by this field, newest first
        #[arg(long, value_enum, default_value_t = SortArg::FileMtime)]
        sort_by: SortArg,

        /// Write a copy of the catalog with corrected dates
        #[arg(long, default_value_t = false)]
        write: bool,

        /// Where to write the corrected copy
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Export every media item with its resolved file time to a CSV snapshot
    Export {
        /// Snapshot file to write
        path: PathBuf,

        /// Number of items to export (0 or less for all)
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        limit: i64,
    },

    /// Apply a CSV snapshot to a copy of the catalog
    Import {
        /// Snapshot file to read
        path: PathBuf,

        /// Where to write the corrected copy
        #[arg(long)]
        output: PathBuf,
    },

    /// Summarize a CSV snapshot
    AnalyzeSnapshot {
        /// Snapshot file to read
        path: PathBuf,

        /// Print the summary as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "snake_case")]
enum SortArg {
    FileMtime,
    AddedAt,
    CreatedAt,
    UpdatedAt,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::FileMtime => SortKey::FileMtime,
            SortArg::AddedAt => SortKey::AddedAt,
            SortArg::CreatedAt => SortKey::CreatedAt,
            SortArg::UpdatedAt => SortKey::UpdatedAt,
        }
    }
}

fn parse_map_arg(value: &str) -> std::result::Result<MappingRule, String> {
    MappingRule::parse_line(value).ok_or_else(|| format!("expected OLD,NEW but got '{value}'"))
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Everything a subcommand needs, derived from the global options
struct RunContext {
    db: PathBuf,
    validate: bool,
    sink: Rc<dyn EventSink>,
}

impl RunContext {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            db: cli.db.clone().unwrap_or_else(config::default_db_path),
            validate: !cli.keep_invalid_dates,
            sink: Rc::new(TracingSink),
        }
    }

    fn open_library(&self) -> Result<Library> {
        Library::open(&self.db)
            .with_context(|| format!("failed to open catalog {}", self.db.display()))
    }

    fn resolver(&self, cli: &Cli) -> Result<PathResolver> {
        let resolver = if cli.maps.is_empty() {
            PathResolver::from_config_file(&cli.mappings)?
        } else {
            PathResolver::new(cli.maps.clone(), Path::new("--map"))?
        };
        for rule in resolver.rules() {
            tracing::debug!(old = %rule.old_prefix, new = %rule.new_prefix, "path mapping");
        }
        Ok(resolver)
    }

    fn engine(&self, cli: &Cli) -> Result<ReconciliationEngine> {
        let probe = FileProbe::new(self.resolver(cli)?, self.sink.clone());
        Ok(ReconciliationEngine::new(probe, self.sink.clone()))
    }

    fn catalog_writer(&self, cli: &Cli) -> CatalogWriter {
        let env_tool = std::env::var(config::BACKUP_TOOL_ENV).ok();
        let candidates = config::backup_tool_candidates(&cli.backup_tools, env_tool.as_deref());
        CatalogWriter::new(CopyPlan::standard(candidates, self.sink.clone()), self.sink.clone())
    }
}

/// Ok(false) is a run that completed but had nothing to show for it
fn run(cli: &Cli) -> Result<bool> {
    let ctx = RunContext::from_cli(cli);

    match &cli.cmd {
        Commands::Analyze { limit, json } => {
            let library = ctx.open_library()?;
            let probe = FileProbe::new(ctx.resolver(cli)?, ctx.sink.clone());
            let analysis = analyze_paths(&library, &probe, limit_from_arg(*limit))?;

            if *json {
                ui::report::print_json(&analysis)?;
            } else {
                ui::report::print_path_analysis(&analysis);
            }
            Ok(true)
        }

        Commands::Recent {
            limit,
            sort_by,
            write,
            output,
        } => {
            let library = ctx.open_library()?;
            let engine = ctx.engine(cli)?;
            let rows = read_records(&library, &JoinSpec::Recent, ctx.sink.as_ref())?;
            drop(library);

            let result = engine.reconcile(rows.records, limit_from_arg(*limit), (*sort_by).into());
            tracing::debug!(
                found = result.stats.found_original,
                remapped = result.stats.found_remapped,
                missing = result.stats.missing,
                "reconciled recent media"
            );

            ui::report::print_entries(&result.entries, &ValidityWindow::current());

            if result.updates.is_empty() {
                println!("No valid file updates to apply.");
                return Ok(false);
            }
            println!(
                "\nFound {} files with valid modification times.",
                result.updates.len()
            );

            if !*write {
                return Ok(true);
            }

            let output = output.clone().unwrap_or_else(config::default_output_path);
            println!(
                "\nPreparing to update {} files with real modification times...",
                result.updates.len()
            );
            let outcome = ctx
                .catalog_writer(cli)
                .apply(&result.updates, &ctx.db, &output, ctx.validate)
                .with_context(|| format!("failed to write corrected catalog {}", output.display()))?;

            ui::report::print_apply_outcome(&outcome, &output);
            Ok(outcome.is_success())
        }

        Commands::Export { path, limit } => {
            let library = ctx.open_library()?;
            let engine = ctx.engine(cli)?;
            let spec = JoinSpec::FullExport {
                limit: limit_from_arg(*limit),
            };
            let rows = read_records(&library, &spec, ctx.sink.as_ref())?;
            tracing::info!(
                records = rows.records.len(),
                catalog = %library.path().display(),
                "exporting media data"
            );
            drop(library);

            let result = engine.reconcile_in_order(rows.records);
            let written = SnapshotCodec::new(ctx.sink.clone())
                .export_to_path(path, &rows.columns, &result.entries)
                .with_context(|| format!("failed to write snapshot {}", path.display()))?;

            println!("\nExported {} media items to: {}", written, path.display());
            println!(
                "Files found: {} ({} via path mapping), missing: {}",
                result.stats.found_original + result.stats.found_remapped,
                result.stats.found_remapped,
                result.stats.missing
            );
            Ok(true)
        }

        Commands::Import { path, output } => {
            let validity = ctx.validate.then(ValidityWindow::current);
            let outcome = SnapshotCodec::new(ctx.sink.clone())
                .import_from_path(path, validity)
                .with_context(|| format!("failed to read snapshot {}", path.display()))?;
            ui::report::print_import_outcome(&outcome);

            if !outcome.is_success() {
                tracing::error!(snapshot = %path.display(), "no valid updates found in snapshot");
                return Ok(false);
            }

            let outcome = ctx
                .catalog_writer(cli)
                .apply(&outcome.updates, &ctx.db, output, ctx.validate)
                .with_context(|| format!("failed to write corrected catalog {}", output.display()))?;

            ui::report::print_apply_outcome(&outcome, output);
            Ok(outcome.is_success())
        }

        Commands::AnalyzeSnapshot { path, json } => {
            let summary = snapshot::analysis::summarize_path(path)
                .with_context(|| format!("failed to read snapshot {}", path.display()))?;

            if *json {
                ui::report::print_json(&summary)?;
            } else {
                ui::report::print_snapshot_summary(path, &summary);
            }
            Ok(true)
        }
    }
}
