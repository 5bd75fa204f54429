use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use endgame_core::database::{Database, RunRecord};
use endgame_core::generator::{GeneratedItem, GenerationResult, GenerationSummary, RaidGearGenerator, ScaleJob};
use endgame_core::import::{import_items_csv, import_spells_csv};
use endgame_core::{GeneratorConfig, ItemStore, LevelBand};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "endgame",
    version = "0.1.0",
    about = "CLI tool for scaling items and spells into endgame tiers",
    long_about = None
)]
struct Cli {
    /// Path to SQLite database file
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Path to log file
    #[arg(long, global = true, default_value = "/tmp/endgame-tools.log")]
    log_file: PathBuf,

    /// Verbosity level (repeat for more verbose output)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import item records from a CSV export
    ImportItems {
        /// CSV file with a header row
        #[arg(long)]
        csv: PathBuf,
        /// Quiet mode (0=show messages/warnings, 1=suppress messages, 2=suppress both)
        #[arg(long, default_value_t = 0)]
        quiet: u8,
    },

    /// Import spell records from a CSV export
    ImportSpells {
        /// CSV file with a header row
        #[arg(long)]
        csv: PathBuf,
        /// Quiet mode
        #[arg(long, default_value_t = 0)]
        quiet: u8,
    },

    /// Scale items to a difficulty tier using reference items
    Scale {
        /// Item entries to scale (comma separated)
        #[arg(long, value_delimiter = ',', required = true)]
        entries: Vec<i32>,
        /// Difficulty tier (3=Mythic, 4=Legendary, 5=Ascendant)
        #[arg(long, default_value_t = 3)]
        difficulty: i32,
        /// Lowest reference item level (0 for no bound)
        #[arg(long, default_value_t = 0)]
        min_reference_level: i32,
        /// Highest reference item level (0 for no bound)
        #[arg(long, default_value_t = 0)]
        max_reference_level: i32,
        /// Seed for reference selection and name prefixes
        #[arg(long)]
        seed: Option<u64>,
        /// Quiet mode
        #[arg(long, default_value_t = 0)]
        quiet: u8,
    },

    /// Generate raid gear with role validation and repairs
    RaidGear {
        /// TOML generator configuration (raid defaults when omitted)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Item entries to generate, overriding the configured list
        #[arg(long, value_delimiter = ',')]
        entries: Vec<i32>,
        /// Validate without repairing or storing anything
        #[arg(long, default_value_t = false)]
        validate_only: bool,
        /// Write generated items to this JSON file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Quiet mode
        #[arg(long, default_value_t = 0)]
        quiet: u8,
    },

    /// Classify and validate stored items
    Validate {
        /// Item entries to validate (comma separated)
        #[arg(long, value_delimiter = ',', required = true)]
        entries: Vec<i32>,
    },

    /// Show recent generation runs
    History {
        /// Number of runs to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn setup_logging(verbose: u8, log_file: &Path) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let filter_level = match verbose {
        0 => tracing::Level::ERROR,
        1 => tracing::Level::WARN,
        2 => tracing::Level::INFO,
        3 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let filter = EnvFilter::from_default_env().add_directive(filter_level.into());

    let file_appender = tracing_appender::rolling::never(
        log_file.parent().unwrap_or(Path::new(".")),
        log_file.file_name().unwrap_or(std::ffi::OsStr::new("endgame.log")),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::Layer::new().with_writer(std::io::stderr).with_ansi(true))
        .with(fmt::Layer::new().with_writer(non_blocking).with_ansi(false));

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(guard)
}

fn progress_bar(len: usize, quiet: u8) -> Result<ProgressBar> {
    if quiet > 0 {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(len as u64);
    bar.set_style(ProgressStyle::with_template(
        "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {msg}",
    )?);
    Ok(bar)
}

fn record_run(db: &Database, kind: &str, started_at: chrono::DateTime<Utc>, summary: &GenerationSummary) -> Result<()> {
    db.record_run(&RunRecord {
        kind: kind.to_string(),
        started_at,
        finished_at: Utc::now(),
        total_processed: summary.total_processed,
        generated: summary.generated,
        skipped: summary.skipped,
        failed: summary.failed,
    })?;
    Ok(())
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = setup_logging(cli.verbose, &cli.log_file)?;

    info!("Starting endgame CLI");

    let db_path = cli.database.unwrap_or_else(|| PathBuf::from("./endgame.sqlite"));

    match cli.command {
        Commands::ImportItems { csv, quiet } => {
            if !csv.exists() {
                anyhow::bail!("CSV file not found: {:?}", csv);
            }
            let db = Database::new(&db_path)?;
            let summary = import_items_csv(&db, &csv, quiet)?;
            info!(
                "Imported {} of {} item rows ({} skipped)",
                summary.imported, summary.total_rows, summary.skipped
            );
        }
        Commands::ImportSpells { csv, quiet } => {
            if !csv.exists() {
                anyhow::bail!("CSV file not found: {:?}", csv);
            }
            let db = Database::new(&db_path)?;
            let summary = import_spells_csv(&db, &csv, quiet)?;
            info!(
                "Imported {} of {} spell rows ({} skipped)",
                summary.imported, summary.total_rows, summary.skipped
            );
        }
        Commands::Scale {
            entries,
            difficulty,
            min_reference_level,
            max_reference_level,
            seed,
            quiet,
        } => {
            if !(3..=5).contains(&difficulty) {
                anyhow::bail!("Difficulty must be 3, 4 or 5, got {}", difficulty);
            }
            let db = Database::new(&db_path)?;
            let started_at = Utc::now();
            let mut rng = make_rng(seed);

            let job = ScaleJob::new(&db, difficulty)?
                .with_band(LevelBand::new(min_reference_level, max_reference_level))
                .with_quiet(quiet);

            let bar = progress_bar(entries.len(), quiet)?;
            let summary = job.run(&entries, &mut rng, true, |result| {
                bar.set_message(format!("item {}", result.entry()));
                bar.inc(1);
            });
            bar.finish_and_clear();

            record_run(&db, "scale", started_at, &summary)?;
            info!(
                "Scaled {} of {} items ({} skipped, {} failed)",
                summary.generated, summary.total_processed, summary.skipped, summary.failed
            );
        }
        Commands::RaidGear {
            config,
            entries,
            validate_only,
            output,
            quiet,
        } => {
            let mut config = match config {
                Some(path) => {
                    if !path.exists() {
                        anyhow::bail!("Generator config not found: {:?}", path);
                    }
                    GeneratorConfig::from_file(&path)
                        .map_err(|e| anyhow::anyhow!("Failed to load generator config: {}", e))?
                }
                None => GeneratorConfig::default(),
            };
            if !entries.is_empty() {
                config.raid.entries = entries;
            }
            if config.raid.entries.is_empty() {
                anyhow::bail!("No item entries to generate");
            }

            let db = Database::new(&db_path)?;
            let started_at = Utc::now();
            let mut rng = StdRng::seed_from_u64(config.target.seed);
            let bar = progress_bar(config.raid.entries.len(), quiet)?;
            let generator = RaidGearGenerator::new(&db, config).with_quiet(quiet);

            let mut generated: Vec<GeneratedItem> = Vec::new();
            let summary = generator.run(validate_only, &mut rng, |result| {
                match result {
                    GenerationResult::Generated(item) => {
                        if quiet == 0 && !item.warnings.is_empty() {
                            info!("{}: {}", item.item.name, item.warnings.join(", "));
                        }
                        generated.push((**item).clone());
                    }
                    GenerationResult::Rejected { entry, report } => {
                        if quiet < 2 {
                            for error in &report.errors {
                                warn!("Item {}: {}", entry, error);
                            }
                        }
                    }
                    GenerationResult::Skipped { .. } => {}
                }
                bar.inc(1);
            });
            bar.finish_and_clear();

            if let Some(output) = output {
                let json = serde_json::to_string_pretty(&generated)?;
                std::fs::write(&output, json)?;
                info!("Wrote {} items to {:?}", generated.len(), output);
            }

            if !validate_only {
                record_run(&db, "raid-gear", started_at, &summary)?;
            }
            info!(
                "Generated {} of {} items ({} skipped, {} failed validation)",
                summary.generated, summary.total_processed, summary.skipped, summary.failed
            );
        }
        Commands::Validate { entries } => {
            let db = Database::new(&db_path)?;

            let results: Vec<_> = entries
                .par_iter()
                .map(|&entry| {
                    db.fetch_item(entry).map(|item| {
                        let report = item.validate(item.classify());
                        (entry, item.name, report)
                    })
                })
                .collect();

            let mut failing = 0;
            for result in results {
                match result {
                    Ok((entry, name, report)) => {
                        info!(
                            "{} ({}): role {}, score {}, {} errors, {} warnings",
                            name,
                            entry,
                            report.role,
                            report.score,
                            report.errors.len(),
                            report.warnings.len()
                        );
                        for error in &report.errors {
                            warn!("  error: {}", error);
                        }
                        for warning in &report.warnings {
                            info!("  warning: {}", warning);
                        }
                        if !report.is_valid() {
                            failing += 1;
                        }
                    }
                    Err(e) => warn!("Failed to load item: {}", e),
                }
            }
            info!("{} of {} items failed validation", failing, entries.len());
        }
        Commands::History { limit } => {
            let db = Database::new(&db_path)?;
            let runs = db.recent_runs(limit)?;
            if runs.is_empty() {
                println!("No runs recorded");
            }
            for run in runs {
                println!(
                    "{}  {:<10} {:>4} processed, {:>4} generated, {:>4} skipped, {:>4} failed ({}s)",
                    run.started_at.format("%Y-%m-%d %H:%M:%S"),
                    run.kind,
                    run.total_processed,
                    run.generated,
                    run.skipped,
                    run.failed,
                    (run.finished_at - run.started_at).num_seconds()
                );
            }
        }
    }

    Ok(())
}
