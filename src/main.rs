/*!
 * tdoc-harvest CLI - Command Line Interface
 *
 * Without a subcommand, runs a harvest. `summarize` analyses a folder of
 * harvested documents instead.
 *
 * Version: 0.3.0
 */

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tdoc_harvest::{
    cli_style::{print_error, print_info, print_success, print_warning, section_header, summary_table},
    commands,
    config::{CategoryPreset, HarvestConfig, LogLevel},
    error::{ErrorCategory, HarvestError, Result, EXIT_SUCCESS},
    logging, DialoguerConsole, FtpConnector, Pipeline, XlsxManifestReader,
};

#[derive(Parser)]
#[command(name = "tdoc-harvest")]
#[command(version, about = "Download a meeting's document archives, sort them by manifest category and unpack them", long_about = None)]
struct Cli {
    /// Archive host
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Control connection port
    #[arg(long)]
    port: Option<u16>,

    /// Local directory for downloads and category folders
    #[arg(short = 'o', long = "output-dir", value_name = "PATH")]
    output_dir: Option<PathBuf>,

    /// Remote directory to harvest; skips interactive navigation
    #[arg(short = 'r', long = "remote-dir", value_name = "PATH")]
    remote_dir: Option<String>,

    /// Where interactive navigation starts
    #[arg(long = "start-path", value_name = "PATH")]
    start_path: Option<String>,

    /// Header label of the identifier column
    #[arg(long = "id-column", value_name = "LABEL")]
    id_column: Option<String>,

    /// Header label of the category column (overrides --preset)
    #[arg(long = "category-column", value_name = "LABEL")]
    category_column: Option<String>,

    /// Named category column choice
    #[arg(long, value_enum)]
    preset: Option<PresetArg>,

    /// Regex selecting the manifest among the listed files
    #[arg(long = "manifest-pattern", value_name = "REGEX")]
    manifest_pattern: Option<String>,

    /// Attempts per connect and per file download
    #[arg(long, value_name = "N")]
    attempts: Option<u32>,

    /// Seconds to wait between attempts
    #[arg(long = "retry-delay", value_name = "SECS")]
    retry_delay: Option<u64>,

    /// Control socket timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Maximum category folder name length
    #[arg(long = "max-name-len", value_name = "N")]
    max_name_len: Option<usize>,

    /// Configuration file (defaults to the user config directory)
    #[arg(short = 'c', long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long = "log-level", value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Write JSON logs to this file instead of stderr
    #[arg(long = "log", value_name = "FILE", global = true)]
    log: Option<PathBuf>,

    /// Verbose logging (same as --log-level debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Hide the download progress bar
    #[arg(long = "no-progress")]
    no_progress: bool,

    /// Write the run summary as JSON to this file
    #[arg(long = "summary-json", value_name = "FILE")]
    summary_json: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration file
    Init {
        /// Write the stock configuration without asking
        #[arg(long)]
        defaults: bool,
    },

    /// Summarize a folder of documents into an HTML analysis report
    Summarize {
        /// Folder holding the documents, e.g. one category folder
        #[arg(value_name = "FOLDER")]
        folder: PathBuf,

        /// Completion service API key (defaults to the configured environment variable)
        #[arg(long = "api-key", value_name = "KEY")]
        api_key: Option<String>,

        /// Model name
        #[arg(long, value_name = "NAME")]
        model: Option<String>,

        /// Report file name inside the folder
        #[arg(long, value_name = "NAME")]
        report: Option<String>,

        /// Skip the JSON backup of the results
        #[arg(long = "no-backup")]
        no_backup: bool,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
enum PresetArg {
    Type,
    Agenda,
}

impl From<PresetArg> for CategoryPreset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Type => CategoryPreset::Type,
            PresetArg::Agenda => CategoryPreset::Agenda,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(category = %e.category(), fatal = e.is_fatal(), "{}", e);
            print_error(&format!("{} ({})", e, e.category()), hint_for(&e));
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let mut cli = Cli::parse();

    if let Some(command) = cli.command.take() {
        return handle_subcommand(command, &cli);
    }

    let config = load_config(&cli)?;

    let connector = FtpConnector::new(config.port, config.io_timeout());
    let pipeline = Pipeline::new(
        config.clone(),
        Box::new(connector),
        Box::new(XlsxManifestReader),
    );

    section_header("tdoc-harvest");
    print_info(&format!("Connecting to {}", config.host));

    let summary = pipeline.run(&mut DialoguerConsole)?;

    println!();
    println!("{}", summary_table(&summary));

    if let Some(ref path) = config.summary_path {
        match summary.write_json(path) {
            Ok(()) => print_info(&format!("Summary written to {}", path.display())),
            Err(e) => print_warning(&format!("Could not write summary: {}", e)),
        }
    }

    let code = summary.exit_code();
    if code == EXIT_SUCCESS {
        print_success("Harvest complete");
    } else {
        print_warning(&format!(
            "Harvest finished with failures: {}",
            summary.failed_files.join(", ")
        ));
    }
    Ok(code)
}

/// Load, override, validate, then start logging
fn load_config(cli: &Cli) -> Result<HarvestConfig> {
    let mut config = HarvestConfig::load(cli.config.as_deref())?;
    apply_overrides(cli, &mut config);
    config.validate()?;

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }
    Ok(config)
}

/// Fold command-line flags over the loaded configuration
fn apply_overrides(cli: &Cli, config: &mut HarvestConfig) {
    if let Some(ref host) = cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(ref dir) = cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(ref dir) = cli.remote_dir {
        config.remote_dir = Some(dir.clone());
    }
    if let Some(ref path) = cli.start_path {
        config.start_path = path.clone();
    }
    if let Some(ref label) = cli.id_column {
        config.id_column = label.clone();
    }
    if let Some(preset) = cli.preset {
        config.category_column = CategoryPreset::from(preset).column().to_string();
    }
    if let Some(ref label) = cli.category_column {
        config.category_column = label.clone();
    }
    if let Some(ref pattern) = cli.manifest_pattern {
        config.manifest_pattern = pattern.clone();
    }
    if let Some(attempts) = cli.attempts {
        config.connect_attempts = attempts;
        config.transfer_attempts = attempts;
    }
    if let Some(delay) = cli.retry_delay {
        config.retry_delay_secs = delay;
    }
    if let Some(timeout) = cli.timeout {
        config.io_timeout_secs = timeout;
    }
    if let Some(len) = cli.max_name_len {
        config.max_folder_name_len = len;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log.clone();
    }
    if cli.verbose {
        config.verbose = true;
    }
    if cli.no_progress {
        config.show_progress = false;
    }
    if cli.summary_json.is_some() {
        config.summary_path = cli.summary_json.clone();
    }
}

fn handle_subcommand(command: Commands, cli: &Cli) -> Result<i32> {
    match command {
        Commands::Init { defaults } => {
            commands::run_init(cli.config.as_deref(), defaults)?;
            Ok(EXIT_SUCCESS)
        }
        Commands::Summarize {
            folder,
            api_key,
            model,
            report,
            no_backup,
        } => {
            let mut config = load_config(cli)?;
            if let Some(model) = model {
                config.summarize.model = model;
            }
            if let Some(report) = report {
                config.summarize.report_name = report;
            }
            if no_backup {
                config.summarize.save_backup = false;
            }
            commands::run_summarize(&config.summarize, &folder, api_key)
        }
        Commands::Completions { shell } => {
            use clap::CommandFactory;
            use clap_complete::generate;
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "tdoc-harvest", &mut std::io::stdout());
            Ok(EXIT_SUCCESS)
        }
    }
}

fn hint_for(err: &HarvestError) -> Option<&'static str> {
    if let HarvestError::Completion { status: Some(401 | 403), .. } = err {
        return Some("Check the API key passed with --api-key or set in the environment");
    }
    match err.category() {
        ErrorCategory::Configuration => Some("Check the configuration file and command-line flags"),
        ErrorCategory::Network | ErrorCategory::Retry => {
            Some("Check network access to the host, or raise --attempts / --retry-delay")
        }
        ErrorCategory::Manifest => {
            Some("Check --id-column, --category-column and --manifest-pattern against the manifest")
        }
        ErrorCategory::Filesystem => Some("Check that the files and folders involved are readable and writable"),
        ErrorCategory::Input => None,
    }
}
