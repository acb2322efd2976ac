// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use msgtrans::app_config::{self, Config};
use msgtrans::database::{DatabaseConnection, Repository};
use msgtrans::job::{
    DirectoryStore, FileCodec, JobFile, JobOrchestrator, JobRequest, JobStatus, LogSink, MsgArrCodec,
    PlainLinesCodec,
};
use msgtrans::providers::{Backend, Provider};
use msgtrans::translation::{LanguagePair, TranslationEngine, TwoLevelCache};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// Input file format
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FileFormat {
    /// PHP `$msg_arr[...]` language tables (*.php)
    Php,
    /// One string per line (*.txt)
    Lines,
}

impl FileFormat {
    fn codec(self) -> Arc<dyn FileCodec> {
        match self {
            FileFormat::Php => Arc::new(MsgArrCodec),
            FileFormat::Lines => Arc::new(PlainLinesCodec),
        }
    }

    fn extension(self) -> &'static str {
        match self {
            FileFormat::Php => "php",
            FileFormat::Lines => "txt",
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate every message file below a directory
    Translate(TranslateArgs),

    /// Inspect or clear the translation cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Show the provider chain and which providers are usable
    Providers {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Generate shell completions for msgtrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Show persistent cache statistics
    Stats,
    /// Delete every cached translation
    Clear,
}

#[derive(Parser, Debug)]
struct CommonArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Directory containing the files to translate
    #[arg(value_name = "INPUT_DIR")]
    input_dir: PathBuf,

    /// Directory receiving `<job_id>/output/...` (defaults to jobs_dir from the config)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Source language code (e.g., 'en')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'pt-br')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Input file format
    #[arg(short, long, value_enum, default_value = "php")]
    format: FileFormat,

    #[command(flatten)]
    common: CommonArgs,
}

/// msgtrans - translate application message catalogs
#[derive(Parser, Debug)]
#[command(name = "msgtrans")]
#[command(version)]
#[command(about = "Machine translation of application message files")]
#[command(long_about = "msgtrans translates message files through a chain of translation providers
with caching, automatic fallback and placeholder protection.

EXAMPLES:
    msgtrans translate lang/en                  # Translate using default config
    msgtrans translate -s en -t de lang/en      # Translate from English to German
    msgtrans translate -f lines texts/          # Translate plain text files
    msgtrans cache stats                        # Show cache statistics
    msgtrans providers                          # Show the provider chain
    msgtrans completions bash > msgtrans.bash   # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file doesn't exist,
    a default one is created. DEEPL_API_KEY and MYMEMORY_EMAIL fill in missing
    provider credentials.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and emoji for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "❌ "),
            Level::Warn => ("1;33", "🚧 "),
            Level::Info => ("1;32", " "),
            Level::Debug => ("1;36", "🔍 "),
            Level::Trace => ("1;35", "📋 "),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, emoji) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                emoji,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts everything; the effective level is set once the config is loaded
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "msgtrans", &mut std::io::stdout());
            Ok(())
        }
        Commands::Translate(args) => run_translate(args).await,
        Commands::Cache { action, common } => run_cache(action, &common).await,
        Commands::Providers { common } => run_providers(&common),
    }
}

/// Load the configuration, apply environment and CLI overrides and set the log level
fn load_config(common: &CommonArgs, source: Option<&str>, target: Option<&str>) -> Result<Config> {
    if let Some(level) = &common.log_level {
        log::set_max_level(level_filter(&level.clone().into()));
    }

    let mut config = Config::load_or_create(&common.config_path)?;
    config.apply_env_overrides();

    if let Some(source) = source {
        config.source_language = source.to_string();
    }
    if let Some(target) = target {
        config.target_language = target.to_string();
    }
    if let Some(level) = &common.log_level {
        config.log_level = level.clone().into();
    }
    log::set_max_level(level_filter(&config.log_level));

    Ok(config)
}

async fn open_cache(config: &Config) -> Result<Arc<TwoLevelCache>> {
    let db = DatabaseConnection::open(config.cache.database_path.as_deref())?;
    info!("Translation cache: {}", db.path().display());
    let cache = TwoLevelCache::new(Repository::new(db), config.cache.memory_capacity);

    if config.cache.warm_up_limit > 0 {
        match cache.warm_up(config.cache.warm_up_limit).await {
            Ok(loaded) if loaded > 0 => info!("Preloaded {} cached translations", loaded),
            Ok(_) => {}
            Err(e) => warn!("Cache warm-up failed: {}", e),
        }
    }
    Ok(Arc::new(cache))
}

/// Collect input files below `dir` with the given extension, as (relative path, absolute path)
fn collect_files(dir: &Path, extension: &str) -> Vec<(String, PathBuf)> {
    let mut files: Vec<(String, PathBuf)> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        })
        .filter_map(|e| {
            let relative = e.path().strip_prefix(dir).ok()?.to_string_lossy().replace('\\', "/");
            Some((relative, e.path().to_path_buf()))
        })
        .collect();
    files.sort();
    files
}

async fn run_translate(args: TranslateArgs) -> Result<()> {
    let config = load_config(
        &args.common,
        args.source_language.as_deref(),
        args.target_language.as_deref(),
    )?;
    config.validate().context("Configuration validation failed")?;

    if !args.input_dir.is_dir() {
        return Err(anyhow!("Input directory does not exist: {:?}", args.input_dir));
    }

    let mut files = Vec::new();
    for (relative, path) in collect_files(&args.input_dir, args.format.extension()) {
        let contents = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        files.push(JobFile::new(relative, contents));
    }
    if files.is_empty() {
        return Err(anyhow!(
            "No .{} files found in {:?}",
            args.format.extension(),
            args.input_dir
        ));
    }

    let pair = LanguagePair::new(config.source_language.clone(), config.target_language.clone());
    let cache = open_cache(&config).await?;
    let engine = Arc::new(TranslationEngine::from_config(&config, cache));

    let output_root = args
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.jobs.jobs_dir));
    let store = Arc::new(DirectoryStore::new(&output_root));

    let orchestrator = JobOrchestrator::new(engine.clone(), args.format.codec(), store.clone(), &config.jobs, pair)
        .with_sink(Arc::new(LogSink));

    let job_id = orchestrator.submit(JobRequest::new(files));
    let mut snapshots = orchestrator
        .subscribe(&job_id)
        .ok_or_else(|| anyhow!("Job {} disappeared", job_id))?;

    let progress_bar = ProgressBar::new(100);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(style.progress_chars("█▓▒░"));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut cancel_sent = false;

    loop {
        {
            let job = snapshots.borrow_and_update();
            progress_bar.set_position(job.progress as u64);
            progress_bar.set_message(format!(
                "{}/{} files {}",
                job.files_done,
                job.total_files,
                job.current_file.as_deref().unwrap_or("")
            ));
            if job.is_terminal() {
                break;
            }
        }

        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = &mut ctrl_c, if !cancel_sent => {
                warn!("Interrupted, cancelling job {}", job_id);
                orchestrator.cancel(&job_id);
                cancel_sent = true;
            }
        }
    }
    progress_bar.finish_and_clear();

    let job = orchestrator
        .wait(&job_id)
        .await
        .ok_or_else(|| anyhow!("Job {} disappeared", job_id))?;

    info!(
        "Job {} {}: {}/{} files, {}/{} strings",
        job.id, job.status, job.files_done, job.total_files, job.translated_strings, job.total_strings
    );
    if let Some(validation) = &job.validation {
        info!(
            "Validation: {} ok, {} untranslated, {} missing placeholders, {} files without output",
            validation.success, validation.untranslated, validation.missing_placeholders, validation.missing_files
        );
        for issue in &validation.issues {
            warn!("{:?} in {}#{}: {}", issue.kind, issue.file, issue.index, issue.source);
        }
    }
    for message in job.errors.iter().take(20) {
        warn!("{}", message);
    }
    if job.errors.len() > 20 {
        warn!("... and {} more errors", job.errors.len() - 20);
    }

    let stats = engine.stats();
    info!(
        "Cache: {} lookups, {:.1}% hit rate",
        stats.cache.lookups, stats.cache.hit_rate
    );

    match job.status {
        JobStatus::Completed | JobStatus::Cancelled => {
            let output = store.output_dir(&job.id)?;
            info!("Output written to {}", output.display());
            Ok(())
        }
        status => {
            error!("Job {} ended {}", job.id, status);
            Err(anyhow!("Job {} {}", job.id, status))
        }
    }
}

async fn run_cache(action: CacheAction, common: &CommonArgs) -> Result<()> {
    let config = load_config(common, None, None)?;
    let db = DatabaseConnection::open(config.cache.database_path.as_deref())?;
    let cache = TwoLevelCache::new(Repository::new(db), config.cache.memory_capacity);

    match action {
        CacheAction::Stats => {
            let stats = cache.database_stats().await?;
            println!("{}", stats);
        }
        CacheAction::Clear => {
            let removed = cache.clear().await?;
            println!("Removed {} cached translations", removed);
        }
    }
    Ok(())
}

fn run_providers(common: &CommonArgs) -> Result<()> {
    let config = load_config(common, None, None)?;

    for (priority, provider) in config.providers.iter().enumerate() {
        let backend = Backend::from_config(provider);
        let state = if !provider.enabled {
            "disabled"
        } else if backend.is_configured() {
            "ready"
        } else {
            "not configured"
        };
        println!(
            "{:>2}. {:<24} {:<15} {}",
            priority + 1,
            provider.kind.display_name(),
            state,
            provider.endpoint
        );
    }
    Ok(())
}
