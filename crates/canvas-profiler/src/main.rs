//! CLI entry point for the dataset profiler and job worker.

use anyhow::{Context, Result, anyhow};
use canvas_profiler::storage::{InMemoryStores, LocalObjectStore};
use canvas_profiler::{
    CancellationToken, DataProfiler, DatasetProfile, DatasetVersion, FileType, Job, JobProcessor,
    JobStatus, ProfilerConfig,
};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Dataset profiler and polling job worker",
    long_about = "Computes statistical profiles of tabular files (CSV, TSV, JSON, Parquet, Excel).\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  MAX_SAMPLE_SIZE, HEAD_SAMPLE_SIZE, MAX_FILE_SIZE_MB, SAMPLE_SEED,\n  \
                  SUPABASE_DATASETS_BUCKET, POLL_INTERVAL_SECS, JOBS_PER_SWEEP\n\n\
                  EXAMPLES:\n  \
                  # Profile one file and print a summary\n  \
                  canvas-profiler profile -i data.csv\n\n  \
                  # Emit the full profile as JSON\n  \
                  canvas-profiler profile -i data.parquet --json | jq .warnings\n\n  \
                  # Run the worker over a directory of uploads\n  \
                  canvas-profiler worker --input-dir uploads/ --output-dir profiles/"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Suppress progress output (only show warnings and errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Row count above which statistics use a seeded random sample
    #[arg(long, global = true)]
    max_sample_size: Option<usize>,

    /// Rows read from the head of files larger than --max-file-size-mb
    #[arg(long, global = true)]
    head_sample_size: Option<usize>,

    /// File size threshold in megabytes that triggers head sampling
    #[arg(long, global = true)]
    max_file_size_mb: Option<u64>,

    /// Seed for the statistics sample
    #[arg(long, global = true)]
    seed: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Profile a single file
    Profile {
        /// Path to the file to profile
        #[arg(short, long)]
        input: PathBuf,

        /// Declared file type (extension or MIME type); inferred from the path if omitted
        #[arg(long)]
        file_type: Option<String>,

        /// Print the full profile as JSON instead of a summary
        ///
        /// Disables all logging so stdout only carries the JSON document.
        #[arg(long)]
        json: bool,

        /// Write the full profile as JSON to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Queue one job per file in a directory and run the polling worker
    ///
    /// The directory is served as an object store bucket named after it.
    /// Each completed profile is written to <output-dir>/<version_id>.json.
    Worker {
        /// Directory of dataset files to profile
        #[arg(long)]
        input_dir: PathBuf,

        /// Directory for the resulting profiles
        #[arg(long, default_value = "./profiles")]
        output_dir: PathBuf,
    },
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Environment configuration with command-line overrides applied.
fn build_config(common: &CommonArgs) -> Result<ProfilerConfig> {
    let mut config = ProfilerConfig::from_env()?;

    if let Some(rows) = common.max_sample_size {
        config.max_sample_size = rows;
    }
    if let Some(rows) = common.head_sample_size {
        config.head_sample_size = rows;
    }
    if let Some(megabytes) = common.max_file_size_mb {
        config.max_file_size_mb = megabytes;
    }
    if let Some(seed) = common.seed {
        config.sample_seed = seed;
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let json_output = matches!(cli.command, Command::Profile { json: true, .. });
    init_logging(&cli.common.log_level, cli.common.quiet, json_output);

    // Load environment variables from .env file
    dotenv().ok();

    let config = build_config(&cli.common)?;

    match cli.command {
        Command::Profile {
            input,
            file_type,
            json,
            output,
        } => run_profile(config, &input, file_type.as_deref(), json, output.as_deref()),
        Command::Worker {
            input_dir,
            output_dir,
        } => run_worker(config, &input_dir, &output_dir, cli.common.quiet).await,
    }
}

/// Profile one file synchronously.
fn run_profile(
    config: ProfilerConfig,
    input: &Path,
    declared_type: Option<&str>,
    json: bool,
    output: Option<&Path>,
) -> Result<()> {
    if !input.exists() {
        return Err(anyhow!("Input file not found: {}", input.display()));
    }

    let file_type = FileType::resolve(declared_type, &input.to_string_lossy())?;
    info!("Profiling {} as {}", input.display(), file_type);

    let bytes = std::fs::read(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let profile = DataProfiler::new(config).profile_bytes(bytes, file_type)?;

    if let Some(path) = output {
        write_json(path, &profile)?;
        info!("Profile written to: {}", path.display());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    print_human_readable_summary(&input.to_string_lossy(), &profile);
    Ok(())
}

/// Seed in-memory stores with one version and one queued job per file, then
/// run the poller until every job is terminal or Ctrl-C is pressed.
async fn run_worker(
    mut config: ProfilerConfig,
    input_dir: &Path,
    output_dir: &Path,
    quiet: bool,
) -> Result<()> {
    let input_dir = std::fs::canonicalize(input_dir)
        .with_context(|| format!("Input directory not found: {}", input_dir.display()))?;
    if !input_dir.is_dir() {
        return Err(anyhow!("Input directory not found: {}", input_dir.display()));
    }
    let (root, bucket) = match (input_dir.parent(), input_dir.file_name()) {
        (Some(parent), Some(name)) => (parent.to_path_buf(), name.to_string_lossy().to_string()),
        _ => return Err(anyhow!("Input directory must not be the filesystem root")),
    };
    config.datasets_bucket = bucket;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let stores = InMemoryStores::new();
    let queued = seed_jobs(&stores, &input_dir)?;
    if queued == 0 {
        warn!("No files found in {}", input_dir.display());
        return Ok(());
    }
    info!("Queued {} profiling jobs from {}", queued, input_dir.display());

    let token = CancellationToken::new();
    let mut builder = JobProcessor::builder()
        .stores(stores.context().with_objects(Arc::new(LocalObjectStore::new(root))))
        .config(config)
        .cancellation_token(token.clone());

    if !quiet {
        builder = builder.on_progress(|update| {
            info!(
                "[{:>3}%] {} {}: {}",
                update.progress,
                update.job_id,
                update.stage.display_name(),
                update.message
            );
        });
    }

    let processor = builder.build()?;
    let poller = tokio::spawn(async move { processor.run_poller().await });

    let jobs = stores.jobs.clone();
    tokio::select! {
        _ = async {
            while !jobs.all_terminal() {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        } => info!("All jobs finished"),
        _ = tokio::signal::ctrl_c() => warn!("Interrupted, stopping worker"),
    }

    token.cancel();
    poller.await??;

    for record in stores.profiles.all() {
        let path = output_dir.join(format!("{}.json", record.version_id));
        write_json(&path, &record)?;
        info!("Profile written to: {}", path.display());
    }

    let failed: Vec<Job> = (0..queued)
        .filter_map(|i| stores.jobs.snapshot(&job_id(i)))
        .filter(|job| job.status == JobStatus::Failed)
        .collect();
    for job in &failed {
        error!(
            "Job {} failed: {}",
            job.id,
            job.error_message.as_deref().unwrap_or("unknown error")
        );
    }

    println!(
        "Profiled {} of {} files into {}",
        stores.profiles.len(),
        queued,
        output_dir.display()
    );
    Ok(())
}

fn job_id(index: usize) -> String {
    format!("job-{index:04}")
}

/// Register every regular file in `dir` as an uploaded version with a queued job.
fn seed_jobs(stores: &InMemoryStores, dir: &Path) -> Result<usize> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    for (index, path) in files.iter().enumerate() {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let version_id = version_id_for(&file_name);

        stores.versions.insert(DatasetVersion::uploaded(
            &version_id,
            "local",
            file_name,
            None,
        ));
        stores
            .jobs
            .insert(Job::queued_profile(job_id(index), version_id));
    }

    Ok(files.len())
}

/// `sales.2024.csv` -> `sales_2024_csv`
fn version_id_for(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

/// Print a human-readable summary of a profile.
///
/// Uses `println!` intentionally: this is the command's output, not a log.
fn print_human_readable_summary(input: &str, profile: &DatasetProfile) {
    println!();
    println!("{}", "=".repeat(80));
    println!("DATASET PROFILE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input: {} ({} rows x {} columns, ~{:.2} MB)",
        input, profile.stats.row_count, profile.stats.column_count, profile.stats.memory_est_mb
    );
    println!(
        "Profiled in {}ms on {} rows",
        profile.meta.processing_time_ms, profile.meta.sample_size
    );
    if let Some(note) = &profile.meta.sampling_note {
        println!("Note: {note}");
    }
    println!();

    println!("COLUMNS");
    println!("{}", "-".repeat(40));
    println!(
        "{:<24} {:<12} {:<12} {:<10} {:<10}",
        "Column", "Dtype", "Type", "Missing %", "Unique"
    );
    println!("{}", "-".repeat(72));
    for col in &profile.columns {
        println!(
            "{:<24} {:<12} {:<12} {:<10.1} {:<10}",
            truncate_str(&col.name, 23),
            truncate_str(&col.dtype, 11),
            col.inferred_type,
            col.missing_percentage,
            col.unique_count
        );
    }
    println!();

    println!("WARNINGS");
    println!("{}", "-".repeat(40));
    if profile.warnings.is_empty() {
        println!("  No data quality warnings");
    } else {
        for warning in &profile.warnings {
            println!("  - [{}] {}", warning.severity, warning.message);
        }
    }
    println!();

    println!("Charts: {}", profile.charts.len());
    println!("{}", "=".repeat(80));
}
