//! Report Lens: chart data from report datasets

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use report_lens::config::{self, load_config, Config};
use report_lens::dashboard::{self, select_panels};
use report_lens::panels;
use report_lens::query::{extract_options, query, Aggregation, FilterSpec, QueryRequest};
use report_lens::reporter::{ConsoleReporter, JsonReporter};
use report_lens::store::{source_for, source::is_remote, CancellationToken, ReportStore, Snapshot};
use report_lens::watcher::DataWatcher;
use report_lens::Field;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

/// Report Lens: filter and aggregate report data into chart series
#[derive(Parser, Debug)]
#[command(name = "report-lens")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Data source: URL or local JSON file (default: apiBaseUrl + dataPath from config)
    #[arg(long, short, global = true)]
    source: Option<String>,

    /// Path to config file (default: search .reportlensrc.json in current dir and parents)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Fetch timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    timeout: Option<u64>,

    /// Quiet mode (minimal output)
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Watch the local data file and recompute on change
    #[arg(long, global = true)]
    watch: bool,

    /// Exit 1 when the filters leave no reports
    #[arg(long, global = true)]
    fail_on_empty: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the preset chart panels
    Panels {
        /// Output format as JSON
        #[arg(long, short)]
        json: bool,
    },

    /// Compute one chart: a preset panel or ad-hoc aggregations
    Query {
        /// Preset panel id (see `panels`)
        #[arg(long, short, conflicts_with = "aggregate", required_unless_present = "aggregate")]
        panel: Option<String>,

        /// Aggregation, e.g. count:country, avg:sector:intensity, max:country:intensity (repeatable)
        #[arg(long, short, value_name = "SPEC")]
        aggregate: Vec<String>,

        /// Filter selection field=value (repeatable; an empty value clears a config default)
        #[arg(long, short, value_name = "FIELD=VALUE")]
        filter: Vec<String>,

        /// Drop rows missing this field (repeatable)
        #[arg(long, value_name = "FIELD")]
        require: Vec<String>,

        /// Output format as JSON
        #[arg(long, short)]
        json: bool,
    },

    /// List the selectable values of each filter field
    Options {
        /// Field to list (repeatable; default: every filter field)
        #[arg(long, short)]
        field: Vec<String>,

        /// Output format as JSON
        #[arg(long, short)]
        json: bool,
    },

    /// Compute every enabled panel
    Dashboard {
        /// Filter selection field=value (repeatable)
        #[arg(long, short, value_name = "FIELD=VALUE")]
        filter: Vec<String>,

        /// Output format as JSON
        #[arg(long, short)]
        json: bool,
    },

    /// Create .reportlensrc.json with sensible defaults
    Init {
        /// Directory in which to create config (default: current)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// API base URL to write into the config
        #[arg(long)]
        url: Option<String>,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = Args::parse();

    match &args.command {
        Commands::Init { dir, url } => return run_init(dir.as_deref(), url.as_deref()),
        Commands::Panels { json } => {
            let catalog = panels::catalog();
            if *json {
                println!("{}", JsonReporter::new().pretty().report_catalog(&catalog));
            } else {
                ConsoleReporter::new().report_catalog(&catalog);
            }
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let config = load_config(&cwd, args.config.as_deref())?
        .merge_with_cli(args.source.as_deref(), args.timeout);

    let location = config.data_location();
    let store = Arc::new(ReportStore::from_boxed(source_for(&location, config.timeout())));

    if args.watch {
        return run_watch(&args, &config, &store, &location);
    }

    let snapshot = load_snapshot(&store, &args)?;
    execute(&args, &config, &snapshot)
}

/// Fetch through the shared store, logging where the rows came from
fn load_snapshot(store: &ReportStore, args: &Args) -> Result<Arc<Snapshot>> {
    let snapshot = store
        .load(&CancellationToken::new())
        .with_context(|| format!("Failed to load reports from {}", store.origin()))?;
    if !args.quiet {
        eprintln!(
            "{}: Loaded {} reports from {}",
            "Info".blue(),
            snapshot.len(),
            snapshot.origin
        );
    }
    Ok(snapshot)
}

fn execute(args: &Args, config: &Config, snapshot: &Snapshot) -> Result<ExitCode> {
    let empty = match &args.command {
        Commands::Query {
            panel,
            aggregate,
            filter,
            require,
            json,
        } => run_query(args, config, snapshot, panel.as_deref(), aggregate, filter, require, *json)?,
        Commands::Options { field, json } => {
            let fields = if field.is_empty() {
                Field::FILTER_FIELDS.to_vec()
            } else {
                field
                    .iter()
                    .map(|f| f.parse::<Field>())
                    .collect::<Result<Vec<_>, _>>()?
            };
            let options = extract_options(snapshot.reports(), &fields);
            if *json {
                println!("{}", JsonReporter::new().pretty().report_options(&options));
            } else {
                ConsoleReporter::new().report_options(&options);
            }
            snapshot.is_empty()
        }
        Commands::Dashboard { filter, json } => {
            let selections = selections(config, filter)?;
            let enabled = select_panels(&config.panels)?;
            let board = dashboard::compute(snapshot, &enabled, &selections);
            if *json {
                println!("{}", JsonReporter::new().pretty().report_dashboard(&board));
            } else if args.quiet {
                let reporter = ConsoleReporter::new();
                for panel in &board.panels {
                    reporter.report_quiet(&panel.title, &panel.result);
                }
            } else {
                let mut reporter = ConsoleReporter::new();
                if args.verbose {
                    reporter = reporter.verbose();
                }
                reporter.report_dashboard(&board);
            }
            board.stats.empty_panels == board.stats.panels
        }
        Commands::Panels { .. } | Commands::Init { .. } => false,
    };

    if empty && args.fail_on_empty {
        if !args.quiet {
            eprintln!("\n{}: No reports match the filters", "Failed".red().bold());
        }
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

/// Config default selections overlaid with CLI `--filter` values
fn selections(config: &Config, cli_filters: &[String]) -> Result<FilterSpec> {
    let mut spec = config
        .selections()
        .context("Invalid filters in config")?;
    for assignment in cli_filters {
        let (field, value) = FilterSpec::parse_assignment(assignment)?;
        spec.set(field, value)?;
    }
    Ok(spec)
}

/// Returns whether the filters left no rows
#[allow(clippy::too_many_arguments)]
fn run_query(
    args: &Args,
    config: &Config,
    snapshot: &Snapshot,
    panel_id: Option<&str>,
    aggregate: &[String],
    filter: &[String],
    require: &[String],
    json: bool,
) -> Result<bool> {
    let selections = selections(config, filter)?;

    let (title, kind, mut request) = match panel_id {
        Some(id) => {
            let panel = panels::find(id)?;
            if !args.quiet {
                for (field, _) in selections.iter() {
                    if !panel.filter_fields.contains(&field) {
                        eprintln!(
                            "{}: Panel '{}' ignores the {} filter",
                            "Warning".yellow(),
                            panel.id,
                            field
                        );
                    }
                }
            }
            let request = panel.request(&selections);
            (panel.title.to_string(), Some(panel.chart), request)
        }
        None => {
            let mut request = QueryRequest::new().with_filters(selections);
            for spec in aggregate {
                request = request.aggregate(spec.parse::<Aggregation>()?);
            }
            let title = request
                .series
                .iter()
                .map(|s| s.label.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            (title, None, request)
        }
    };

    for name in require {
        request = request.require(name.parse::<Field>()?);
    }

    let result = query(snapshot.reports(), &request);

    if json {
        println!("{}", JsonReporter::new().pretty().report(&title, kind, &result));
    } else if args.quiet {
        ConsoleReporter::new().report_quiet(&title, &result);
    } else {
        let mut reporter = ConsoleReporter::new();
        if args.verbose {
            reporter = reporter.verbose();
        }
        reporter.report(&title, &result);
    }

    if result.is_empty() && !args.quiet && !json {
        eprintln!("{}: No reports match the current filters", "Warning".yellow());
    }
    Ok(result.is_empty())
}

fn run_init(dir: Option<&Path>, url: Option<&str>) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let dir = dir.unwrap_or(&cwd);

    match config::write_starter(dir, url)? {
        Some(path) => {
            println!(
                "{}: Created {} (source: {})",
                "Done".green().bold(),
                path.display(),
                url.unwrap_or(config::DEFAULT_API_BASE_URL)
            );
        }
        None => {
            eprintln!(
                "{}: {} already exists; use --dir to write elsewhere or remove it first",
                "Warning".yellow(),
                dir.join(config::CONFIG_FILENAME).display()
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_watch(args: &Args, config: &Config, store: &ReportStore, location: &str) -> Result<ExitCode> {
    if is_remote(location) {
        anyhow::bail!("--watch needs a local data file; {} is a URL", location);
    }

    let path = PathBuf::from(location);
    let watcher = DataWatcher::watch(&[path.as_path()]).context("Failed to create file watcher")?;
    eprintln!(
        "{}: Watching {} for changes... (Ctrl+C to stop)",
        "Info".blue(),
        path.display()
    );

    let token = CancellationToken::new();
    let mut previous: Option<Arc<Snapshot>> = None;
    loop {
        match store.refresh(&token) {
            Ok(snapshot) => {
                let changed = previous
                    .as_ref()
                    .map_or(true, |p| snapshot.changed_since(p));
                if changed {
                    if !args.quiet {
                        eprintln!("{}: Loaded {} reports", "Info".blue(), snapshot.len());
                    }
                    if let Err(e) = execute(args, config, &snapshot) {
                        eprintln!("{}: {:#}", "Error".red(), e);
                    }
                } else if !args.quiet {
                    eprintln!("{}: Data unchanged", "Info".blue());
                }
                previous = Some(snapshot);
            }
            // A half-written file parses as malformed; wait for the next write
            Err(e) => eprintln!("{}: {}: {}", "Error".red(), path.display(), e),
        }

        while watcher
            .next_changes(Duration::from_secs(3600))
            .context("Stopped watching")?
            .is_none()
        {}
    }
}
