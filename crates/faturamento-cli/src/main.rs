#![forbid(unsafe_code)]

mod cmd;
mod context;
mod identity;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use context::CliContext;
use output::{CliError, OutputMode, render_error};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "fat: billing case review and productivity",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Sign in as this e-mail (default: $FAT_USER_EMAIL).
    #[arg(long, global = true)]
    email: Option<String>,

    /// Display name recorded in the audit trail (default: $FAT_USER_NAME).
    #[arg(long, global = true)]
    name: Option<String>,

    /// Config file (default: $FAT_CONFIG, then the user config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Read",
        about = "List records",
        long_about = "List records with optional search, filters and page.",
        after_help = "EXAMPLES:\n    # First page of everything\n    fat list\n\n    # Records in review assigned to Deise\n    fat list --status \"em análise\" --responsavel Deise\n\n    # Emit machine-readable output\n    fat list --json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one record",
        long_about = "Show full details and the status history of a record.",
        after_help = "EXAMPLES:\n    # Show a record\n    fat show 25000.000123/2024-11"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Change a record's status",
        long_about = "Move a record to another workflow status. Records 'assinado e tramitado' are final.",
        after_help = "EXAMPLES:\n    # Start the review\n    fat status 25000.000123/2024-11 \"em análise\"\n\n    # Slugs work too\n    fat status 25000.000123/2024-11 assinado-e-tramitado"
    )]
    Status(cmd::status::StatusArgs),

    #[command(
        next_help_heading = "Admin",
        about = "Assign a record to a collaborator",
        long_about = "Assign or clear the collaborator of a record. Administrators only.",
        after_help = "EXAMPLES:\n    # Assign\n    fat assign 25000.000123/2024-11 Deise\n\n    # Clear\n    fat assign 25000.000123/2024-11 \"\""
    )]
    Assign(cmd::assign::AssignArgs),

    #[command(
        next_help_heading = "Admin",
        about = "Per-collaborator productivity report",
        long_about = "Count records and sum cover values per collaborator inside a date window. Administrators only.",
        after_help = "EXAMPLES:\n    # Month to date, finalized records\n    fat productivity\n\n    # January, records still in progress\n    fat productivity --from 2024-01-01 --to 2024-01-31 --pending"
    )]
    Productivity(cmd::productivity::ProductivityArgs),

    #[command(
        next_help_heading = "Read",
        about = "List known collaborators",
        long_about = "List the configured roster plus every collaborator seen in the store."
    )]
    Collaborators,

    #[command(
        next_help_heading = "Maintenance",
        about = "Import records into the local store",
        long_about = "Load a JSON export (array or {\"data\": [...]}) into the local SQLite store.",
        after_help = "EXAMPLES:\n    # From a file\n    fat import processos.json\n\n    # From stdin\n    curl -s $API/processos | fat import -"
    )]
    Import(cmd::import::ImportArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show the signed-in identity",
        long_about = "Resolve the identity from flags and environment and show its role."
    )]
    Whoami,

    #[command(
        next_help_heading = "Maintenance",
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    fat completions bash"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

/// Default directives when `FAT_LOG` is unset. Covers the library
/// (`faturamento_core`) and this binary (`fat`).
const fn default_log_directives(verbose: bool) -> &'static str {
    if verbose {
        "fat=debug,faturamento_core=debug,info"
    } else {
        "fat=info,faturamento_core=info,warn"
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("FAT_LOG").unwrap_or_else(|_| {
        EnvFilter::new(default_log_directives(
            verbose || env::var("DEBUG").is_ok(),
        ))
    });

    let format = env::var("FAT_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn fail(mode: OutputMode, err: &anyhow::Error) -> ExitCode {
    let cli_error = CliError::from_anyhow(err);
    if render_error(mode, &cli_error).is_err() {
        eprintln!("error: {err:#}");
    }
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    if let Commands::Completions(ref args) = cli.command {
        let mut command = Cli::command();
        return match cmd::completions::run_completions(args.shell, &mut command) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => fail(OutputMode::Text, &err),
        };
    }

    let ctx = match CliContext::load(
        cli.config.as_deref(),
        cli.json,
        cli.email.clone(),
        cli.name.clone(),
    ) {
        Ok(ctx) => ctx,
        Err(err) => return fail(OutputMode::resolve(cli.json, None), &err),
    };

    let result = match &cli.command {
        Commands::List(args) => cmd::list::run_list(args, &ctx),
        Commands::Show(args) => cmd::show::run_show(args, &ctx),
        Commands::Status(args) => cmd::status::run_status(args, &ctx),
        Commands::Assign(args) => cmd::assign::run_assign(args, &ctx),
        Commands::Productivity(args) => cmd::productivity::run_productivity(args, &ctx),
        Commands::Collaborators => cmd::collaborators::run_collaborators(&ctx),
        Commands::Import(args) => cmd::import::run_import(args, &ctx),
        Commands::Whoami => cmd::whoami::run_whoami(&ctx),
        Commands::Completions(_) => Ok(()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => fail(ctx.output, &err),
    }
}
