//! Supplier Guard CLI - Command-line interface for supplier record validation
//!
//! Architecture: Application Layer - CLI coordinates user interactions with domain services
//! - Translates user commands to validator and batch operations
//! - Handles external concerns like configuration discovery, exit codes and terminal output
//! - Library errors gain context here and nowhere else

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process;
use supplier_guard::{
    check_cnpj, check_email, mask_cnpj, BatchOptions, GuardConfig, OutputFormat, ReportFormatter,
    ReportOptions, SupplierValidator,
};
use tracing_subscriber::EnvFilter;

/// Configuration files looked up in the working directory, in order
const DEFAULT_CONFIGS: &[&str] =
    &["supplier_guard.yaml", "supplier_guard.yml", ".supplier_guard.yaml"];

/// Supplier Guard - hardened CNPJ and email validation
#[derive(Parser)]
#[command(name = "supplier-guard")]
#[command(version)]
#[command(about = "Hardened CNPJ and email validation for supplier records")]
#[command(long_about = "Supplier Guard validates Brazilian CNPJ identifiers and email addresses, rejecting Unicode look-alikes and invisible characters, and checks whole batches of supplier records before import.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate supplier record files
    Check {
        /// Files or directories holding records (defaults to the current directory)
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormatArg,

        /// Maximum number of violations to report
        #[arg(long)]
        max_violations: Option<usize>,

        /// Include globs for record files, replacing the configured ones
        #[arg(long, action = clap::ArgAction::Append)]
        include: Vec<String>,

        /// Disable parallel processing
        #[arg(long)]
        no_parallel: bool,

        /// Fail on the first unreadable file
        #[arg(long)]
        fail_fast: bool,

        /// Maximum number of records to validate
        #[arg(long)]
        max_records: Option<usize>,

        /// Mask rejected values in human output
        #[arg(long)]
        hide_values: bool,
    },

    /// Validate a single CNPJ
    Cnpj {
        /// Candidate identifier, masked or unmasked
        value: String,
    },

    /// Validate a single email address
    Email {
        /// Candidate address
        value: String,
    },

    /// Apply the progressive CNPJ display mask
    Mask {
        /// Text to mask; non-digits are dropped
        text: String,
    },

    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config_file: Option<PathBuf>,
    },

    /// List field rules and their constraints
    Rules {
        /// Show only this field
        #[arg(long)]
        field: Option<String>,
    },
}

#[derive(Copy, Clone, ValueEnum, PartialEq)]
enum OutputFormatArg {
    Human,
    Json,
    Junit,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Junit => OutputFormat::Junit,
        }
    }
}

/// Arguments of the check command
struct CheckArgs {
    paths: Vec<PathBuf>,
    format: OutputFormatArg,
    max_violations: Option<usize>,
    include: Vec<String>,
    no_parallel: bool,
    fail_fast: bool,
    max_records: Option<usize>,
    hide_values: bool,
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);
    if cli.no_color {
        colored::control::set_override(false);
    }

    match run_command(cli) {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(2);
        }
    }
}

fn run_command(cli: Cli) -> Result<i32> {
    let use_colors = !cli.no_color;

    match cli.command {
        Commands::Check {
            paths,
            format,
            max_violations,
            include,
            no_parallel,
            fail_fast,
            max_records,
            hide_values,
        } => {
            let args = CheckArgs {
                paths,
                format,
                max_violations,
                include,
                no_parallel,
                fail_fast,
                max_records,
                hide_values,
            };
            run_check(cli.config.as_deref(), args, use_colors)
        }
        Commands::Cnpj { value } => Ok(run_cnpj(&value)),
        Commands::Email { value } => Ok(run_email(&value)),
        Commands::Mask { text } => {
            println!("{}", mask_cnpj(&text));
            Ok(0)
        }
        Commands::ValidateConfig { config_file } => {
            Ok(run_validate_config(config_file.or(cli.config).as_deref()))
        }
        Commands::Rules { field } => run_list_rules(cli.config.as_deref(), field.as_deref()),
    }
}

/// Load the explicit configuration, a discovered one, or the defaults
fn load_config(config_path: Option<&Path>) -> Result<GuardConfig> {
    let path = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config(Path::new(".")),
    };

    match path {
        Some(path) => {
            tracing::debug!("Using configuration {}", path.display());
            GuardConfig::load_from_file(&path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))
        }
        None => Ok(GuardConfig::default()),
    }
}

/// First default configuration file present in a directory
fn discover_config(dir: &Path) -> Option<PathBuf> {
    DEFAULT_CONFIGS.iter().map(|name| dir.join(name)).find(|path| path.is_file())
}

fn run_check(config_path: Option<&Path>, args: CheckArgs, use_colors: bool) -> Result<i32> {
    let config = load_config(config_path)?;

    let formatter = ReportFormatter::new(ReportOptions {
        use_colors,
        max_violations: args.max_violations,
        show_values: !args.hide_values,
    });
    let validator = SupplierValidator::new_with_config(config)
        .context("Invalid configuration")?
        .with_report_formatter(formatter);

    let paths = if args.paths.is_empty() { vec![PathBuf::from(".")] } else { args.paths };

    let options = BatchOptions {
        parallel: !args.no_parallel,
        fail_fast: args.fail_fast,
        max_records: args.max_records,
        include_patterns: if args.include.is_empty() { None } else { Some(args.include) },
    };

    let report = validator.validate_paths(&paths, &options).context("Batch validation failed")?;

    validator
        .write_report(&report, args.format.into(), std::io::stdout().lock())
        .context("Failed to write report")?;

    Ok(if report.has_violations() { 1 } else { 0 })
}

fn run_cnpj(value: &str) -> i32 {
    match check_cnpj(value) {
        Ok(cnpj) => {
            let kind = if cnpj.is_headquarters() { "headquarters" } else { "branch" };
            println!(
                "{} {} (root {}, order {}, {})",
                "✅".green(),
                cnpj,
                cnpj.root(),
                cnpj.branch(),
                kind
            );
            0
        }
        Err(rejection) => {
            println!("{} invalid CNPJ: {}", "❌".red(), rejection);
            1
        }
    }
}

fn run_email(value: &str) -> i32 {
    match check_email(value) {
        Ok(address) => {
            println!(
                "{} {} (local part '{}', domain '{}')",
                "✅".green(),
                address,
                address.local_part(),
                address.domain()
            );
            0
        }
        Err(rejection) => {
            println!("{} invalid email: {}", "❌".red(), rejection);
            1
        }
    }
}

fn run_validate_config(config_path: Option<&Path>) -> i32 {
    let config_path = config_path
        .map(Path::to_path_buf)
        .or_else(|| discover_config(Path::new(".")))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIGS[0]));

    println!("Validating configuration: {}", config_path.display());

    match GuardConfig::load_from_file(&config_path) {
        Ok(config) => {
            println!("✅ Configuration is valid");

            let total_constraints: usize = config.fields.iter().map(|f| f.constraints.len()).sum();
            println!("📊 Configuration summary:");
            println!(
                "  Fields: {} total, {} enabled",
                config.fields.len(),
                config.enabled_fields().count()
            );
            println!("  Constraints: {total_constraints}");
            println!("  Include patterns: {}", config.sources.include.join(", "));
            println!("  Fingerprint: {}", config.fingerprint());
            0
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed: {e}");
            1
        }
    }
}

fn run_list_rules(config_path: Option<&Path>, field_filter: Option<&str>) -> Result<i32> {
    let config = load_config(config_path)?;

    if let Some(name) = field_filter {
        if config.field(name).is_none() {
            eprintln!("❌ Field '{name}' not found");
            return Ok(1);
        }
    }

    println!("📋 Field Rules\n");

    for field in &config.fields {
        if field_filter.is_some_and(|name| name != field.name) {
            continue;
        }

        let status = if field.enabled { "✅" } else { "❌" };
        println!("{status}📂 {}", field.name);

        for constraint in &field.constraints {
            println!("  🔍 {}.{} - {}", field.name, constraint.kind(), constraint.message());
        }
        println!();
    }

    Ok(0)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
