// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, warn};
use std::io::Write;
use std::path::PathBuf;

use loctext::app_config::{self, Config};
use loctext::app_controller::{Controller, TranslateJob};

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

/// Options shared by every subcommand that loads the configuration
#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// Configuration file path (defaults to the user config directory)
    #[arg(short, long, env = "LOCTEXT_CONFIG")]
    config_path: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a range of a JSON string table
    Translate(TranslateArgs),

    /// List the configured providers
    Providers {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// List the models offered by a provider
    Models {
        /// Provider name as registered
        provider: String,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Generate shell completions for loctext
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// JSON string table to translate
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Write the result here instead of overwriting the input
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// First string index to translate
    #[arg(long, default_value_t = 0)]
    start: usize,

    /// Last string index to translate, inclusive
    #[arg(long)]
    end: Option<usize>,

    /// Route through an AI provider instead of the legacy translators
    #[arg(short = 'u', long)]
    use_provider: bool,

    /// Provider name to use (implies --use-provider)
    #[arg(short, long)]
    provider: Option<String>,

    /// Model name to use (implies --use-provider)
    #[arg(short, long)]
    model: Option<String>,

    /// Source language code (e.g., 'en', 'ja')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'de', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Translation profile id
    #[arg(long)]
    profile: Option<String>,

    /// Additional terminology pack (CSV or TSV), may be repeated
    #[arg(long = "terminology", value_name = "PATH")]
    terminology_paths: Vec<PathBuf>,

    /// Do not back up the output file before overwriting it
    #[arg(long)]
    no_backup: bool,

    #[command(flatten)]
    config: ConfigArgs,
}

/// loctext - game text localization with AI providers
#[derive(Parser, Debug)]
#[command(name = "loctext")]
#[command(version)]
#[command(about = "AI-assisted string table translation for games")]
#[command(long_about = "loctext translates game string tables through AI providers or plain machine translators.

EXAMPLES:
    loctext translate strings.json                        # Translate with the legacy translators
    loctext translate -u -p ollama -m llama3 strings.json # Use a specific provider and model
    loctext translate -s en -t de -o strings.de.json strings.json
    loctext translate --start 10 --end 19 strings.json    # Translate strings 10 to 19 only
    loctext translate -u --terminology names.csv strings.json
    loctext models ollama                                 # List the models of a provider
    loctext completions bash > loctext.bash               # Generate bash completions

CONFIGURATION:
    Configuration is stored in the user config directory by default. You can
    specify a different file with --config-path. If the config file doesn't
    exist, a default one will be created automatically.

SUPPORTED PROVIDERS:
    ollama    - Local Ollama server
    openai    - OpenAI API (requires API key)
    anthropic - Anthropic Claude API (requires API key)
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
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
        // Records are filtered by the global max level, which changes after the config is loaded
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
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
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                color,
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "loctext", &mut std::io::stdout());
            Ok(())
        }
        Commands::Translate(args) => run_translate(args).await,
        Commands::Providers { config } => {
            let controller = Controller::with_config(load_config(&config)?)?;
            for descriptor in controller.providers() {
                match descriptor.endpoint {
                    Some(endpoint) => println!("{}\t{}\t{}", descriptor.name, descriptor.kind, endpoint),
                    None => println!("{}\t{}", descriptor.name, descriptor.kind),
                }
            }
            Ok(())
        }
        Commands::Models { provider, config } => {
            let controller = Controller::with_config(load_config(&config)?)?;
            for model in controller.models(&provider).await? {
                match model.display_name {
                    Some(name) => println!("{}\t{}", model.id, name),
                    None => println!("{}", model.id),
                }
            }
            Ok(())
        }
    }
}

/// Load or create the configuration and apply the log level
fn load_config(options: &ConfigArgs) -> Result<Config> {
    if let Some(log_level) = &options.log_level {
        let level: app_config::LogLevel = log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config_path = options.config_path.clone().unwrap_or_else(Config::default_path);
    if !config_path.exists() {
        warn!("Config file not found at {:?}, creating default config.", config_path);
    }
    let mut config = Config::load_or_create(&config_path)?;

    match &options.log_level {
        Some(log_level) => config.log_level = log_level.clone().into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }
    Ok(config)
}

async fn run_translate(args: TranslateArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;

    // Override config with CLI options if provided
    if let Some(source_language) = &args.source_language {
        config.source_language = source_language.clone();
    }
    if let Some(target_language) = &args.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(profile) = &args.profile {
        config.settings.profile_id = Some(profile.clone());
    }

    config.validate().context("Configuration validation failed")?;

    let controller = Controller::with_config(config)?;
    let job = TranslateJob {
        input: args.input_path,
        output: args.output,
        start_index: args.start,
        end_index: args.end,
        use_provider: args.use_provider || args.provider.is_some() || args.model.is_some(),
        provider: args.provider,
        model: args.model,
        terminology_paths: args.terminology_paths,
        skip_backup: args.no_backup,
    };

    let progress = controller.run_translate(job).await?;
    if progress.pending_count > 0 {
        warn!("{} strings were not translated", progress.pending_count);
    }
    Ok(())
}
