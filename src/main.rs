#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use storydoc::app_config::{self, Config};
use storydoc::cache::{CacheStore, DatabaseConnection, SqliteCacheStore};
use storydoc::file_utils::FileManager;
use storydoc::{Controller, ExportKind, ExportRequest};

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

#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Args, Debug, Clone)]
struct ExportArgs {
    /// Chapter or character names
    #[arg(value_name = "NAMES")]
    names: Vec<String>,

    /// File with one name per line; blank lines and lines starting with '#' are ignored
    #[arg(short = 'f', long)]
    names_file: Option<PathBuf>,

    /// Output directory, or the output file with --combined
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Write every name into one document
    #[arg(long)]
    combined: bool,

    /// Ignore cached text and fetch everything again
    #[arg(long)]
    no_cache: bool,

    /// Read scripts from a local directory instead of the wiki
    #[arg(long, value_name = "DIR")]
    source: Option<PathBuf>,

    /// Debug logging, a progress bar and skipped-line reports
    #[arg(short, long)]
    verbose: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Show the number of cached records and the database size
    Stats,
    /// Remove every cached record
    Clear,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Export chapter stories
    Story {
        #[command(flatten)]
        export: ExportArgs,

        /// Append records of characters who speak in the chapters
        #[arg(long)]
        with_records: bool,
    },

    /// Export character records
    Memory {
        #[command(flatten)]
        export: ExportArgs,
    },

    /// Inspect or clear the fetch cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Generate shell completions for storydoc
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// storydoc - game story scripts to Word documents
#[derive(Parser, Debug)]
#[command(name = "storydoc")]
#[command(version)]
#[command(about = "Export game story scripts as formatted Word documents")]
#[command(long_about = "storydoc fetches story scripts, strips engine directives and writes readable DOCX documents.

EXAMPLES:
    storydoc story 1-7                          # One document for chapter 1-7
    storydoc story -f chapters.txt --combined   # All chapters in one document
    storydoc story 1-7 --with-records           # Append related character records
    storydoc memory 凯尔希 阿米娅 -o out/       # One document per character
    storydoc memory 凯尔希 --combined -o k.docx # Combined output to a file
    storydoc story 1-7 --source ./scripts       # Read scripts from a local directory
    storydoc cache stats                        # Show fetch cache usage
    storydoc completions bash > storydoc.bash   # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

EXIT STATUS:
    0  at least one document was written
    1  configuration or other fatal error
    3  every requested name failed
    4  the combined document could not be written")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
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
            let color = Self::color_for_level(record.level());
            let _ = writeln!(std::io::stderr(), "{}{} {:<5} {}\x1B[0m", color, now, record.level(), record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() {
    // The logger accepts everything; the max level filters
    if let Err(e) = CustomLogger::init(LevelFilter::Trace) {
        eprintln!("Failed to initialize logger: {}", e);
    }
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    let code = match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    };
    log::logger().flush();
    std::process::exit(code);
}

async fn run(command: Commands) -> Result<i32> {
    match command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "storydoc", &mut std::io::stdout());
            Ok(0)
        }
        Commands::Story { export, with_records } => run_export(ExportKind::Story, export, with_records).await,
        Commands::Memory { export } => run_export(ExportKind::Memory, export, false).await,
        Commands::Cache { action, common } => run_cache(action, &common).await,
    }
}

async fn run_export(kind: ExportKind, args: ExportArgs, attach_records: bool) -> Result<i32> {
    let verbose_level = args.verbose.then_some(CliLogLevel::Debug);
    let mut config = load_config(&args.common, verbose_level)?;

    if let Some(source) = &args.source {
        config.fetch.source_dir = Some(source.clone());
    }

    let names = FileManager::load_names(&args.names, args.names_file.as_deref())?;

    let controller = Controller::with_config(config)?.with_force_refresh(args.no_cache);
    let request = ExportRequest {
        kind,
        names,
        output: args.out,
        combined: args.combined,
        attach_records,
        verbose: args.verbose,
    };

    let summary = controller.run(&request).await?;
    for (name, reason) in &summary.failed {
        warn!("Failed: {} ({})", name, reason);
    }
    Ok(summary.exit_code())
}

async fn run_cache(action: CacheCommand, common: &CommonArgs) -> Result<i32> {
    let config = load_config(common, None)?;
    let db = match &config.cache.path {
        Some(path) => DatabaseConnection::new(path)?,
        None => DatabaseConnection::new_default()?,
    };
    let path = db.path().to_path_buf();
    let store = SqliteCacheStore::new(db);

    match action {
        CacheCommand::Stats => {
            let stats = store.stats().await.context("Failed to read cache statistics")?;
            info!("Cache at {}", path.display());
            info!("{}", stats);
        }
        CacheCommand::Clear => {
            let removed = store.invalidate_all().await.context("Failed to clear the cache")?;
            info!("Removed {} cached record(s) from {}", removed, path.display());
        }
    }
    Ok(0)
}

/// Load or create the configuration, apply CLI overrides, validate it and set the log level
fn load_config(common: &CommonArgs, level_override: Option<CliLogLevel>) -> Result<Config> {
    let cli_level = common.log_level.clone().or(level_override);
    if let Some(level) = &cli_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config_path = &common.config_path;
    let mut config = if Path::new(config_path).exists() {
        let file = File::open(config_path).context(format!("Failed to open config file: {}", config_path))?;

        let reader = BufReader::new(file);
        serde_json::from_reader(reader).context(format!("Failed to parse config file: {}", config_path))?
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);

        let config = Config::default();
        let config_json =
            serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;

        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        config
    };

    if let Some(level) = &cli_level {
        config.log_level = level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;

    if cli_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    Ok(config)
}
