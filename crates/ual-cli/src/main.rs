#![forbid(unsafe_code)]

mod actor;
mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use ual_core::LedgerError;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "ual: hash-chained ledger of business actions",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format: pretty, text, or json.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Acting user for mutating commands (skips env resolution).
    #[arg(long, global = true)]
    actor: Option<String>,

    /// Ledger database path (defaults to `UAL_DB`, then `.ual/ledger.sqlite3`).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }

    fn actor_flag(&self) -> Option<&str> {
        self.actor.as_deref()
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a ledger in the current directory",
        after_help = "EXAMPLES:\n    ual init"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Recording",
        about = "Append an action record",
        long_about = "Append an action record to the hash chain. The record's id, hash, \
                      timestamp and chain position are assigned by the ledger.",
        after_help = "EXAMPLES:\n    ual create -a approve -t PO-1023 --target-type purchase_order \\\n        -d finance --pre-state pending --post-state approved --meta amount=1200"
    )]
    Create(cmd::create::CreateArgs),

    #[command(
        next_help_heading = "Recording",
        about = "Void a record, keeping it in the chain",
        after_help = "EXAMPLES:\n    ual void act-3f2a9c0d1e4b5a6f --reason \"entered twice\""
    )]
    Void(cmd::void::VoidArgs),

    #[command(
        next_help_heading = "Recording",
        about = "Add a dependency edge between two records",
        after_help = "EXAMPLES:\n    ual link act-aaaa… act-bbbb… --kind blocks"
    )]
    Link(cmd::link::LinkArgs),

    #[command(
        next_help_heading = "Reading",
        about = "Show one record and its dependencies"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Reading",
        about = "List records, newest first",
        after_help = "EXAMPLES:\n    ual list -d finance -a approve --since 2024-01-01\n\n    # Next page\n    ual list -d finance --after 1700000000000000:42"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Reading",
        about = "Chronological history of one target item"
    )]
    Timeline(cmd::timeline::TimelineArgs),

    #[command(
        next_help_heading = "Processes",
        about = "Register and inspect process blueprints"
    )]
    Blueprint(cmd::blueprint::BlueprintArgs),

    #[command(
        next_help_heading = "Processes",
        about = "Progress of a target item through a blueprint"
    )]
    Status(cmd::status::StatusArgs),

    #[command(
        next_help_heading = "Integrity",
        about = "Verify every hash and link in the chain",
        long_about = "Recompute every record's hash and check its link to the previous \
                      record. Exits non-zero when any break is found."
    )]
    Verify,

    #[command(next_help_heading = "Integrity", about = "Ledger overview counts")]
    Stats(cmd::stats::StatsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("UAL_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "ual=debug,info"
        } else {
            "ual=info,warn"
        })
    });

    let format = env::var("UAL_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

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

fn run(cli: &Cli, output: OutputMode) -> anyhow::Result<()> {
    let project_root = env::current_dir()?;
    let ctx = cmd::LedgerContext::resolve(&project_root, cli.db.as_deref())?;
    debug!(db = %ctx.db_path.display(), "resolved ledger");

    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, &ctx, output),
        Commands::Create(args) => cmd::create::run_create(args, cli.actor_flag(), &ctx, output),
        Commands::Void(args) => cmd::void::run_void(args, cli.actor_flag(), &ctx, output),
        Commands::Link(args) => cmd::link::run_link(args, cli.actor_flag(), &ctx, output),
        Commands::Show(args) => cmd::show::run_show(args, &ctx, output),
        Commands::List(args) => cmd::list::run_list(args, &ctx, output),
        Commands::Timeline(args) => cmd::timeline::run_timeline(args, &ctx, output),
        Commands::Blueprint(args) => {
            cmd::blueprint::run_blueprint(args, cli.actor_flag(), &ctx, output)
        }
        Commands::Status(args) => cmd::status::run_status(args, &ctx, output),
        Commands::Verify => cmd::verify::run_verify(&ctx, output),
        Commands::Stats(args) => cmd::stats::run_stats(args, &ctx, output),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let output = cli.output_mode();

    let result = run(&cli, output);
    if let Err(err) = &result {
        if let Some(ledger_err) = err.downcast_ref::<LedgerError>() {
            render_error(output, &CliError::from(ledger_err))?;
            std::process::exit(1);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn json_flag_sets_output_mode() {
        let cli = Cli::parse_from(["ual", "--json", "stats"]);
        assert!(cli.json);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn format_flag_after_subcommand() {
        let cli = Cli::parse_from(["ual", "list", "--format", "text"]);
        assert_eq!(cli.format, Some(OutputMode::Text));
        assert_eq!(cli.output_mode(), OutputMode::Text);
    }

    #[test]
    fn actor_flag_parsed() {
        let cli = Cli::parse_from(["ual", "--actor", "alice", "void", "act-x", "-r", "dup"]);
        assert_eq!(cli.actor_flag(), Some("alice"));
        assert!(matches!(cli.command, Commands::Void(_)));
    }

    #[test]
    fn actor_flag_none_by_default() {
        let cli = Cli::parse_from(["ual", "verify"]);
        assert!(cli.actor_flag().is_none());
        assert!(matches!(cli.command, Commands::Verify));
    }

    #[test]
    fn db_flag_is_global() {
        let cli = Cli::parse_from(["ual", "timeline", "PO-1", "--db", "/tmp/x.db"]);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
    }

    #[test]
    fn blueprint_subcommands_parse() {
        let cli = Cli::parse_from(["ual", "blueprint", "add", "flow.json"]);
        assert!(matches!(
            cli.command,
            Commands::Blueprint(cmd::blueprint::BlueprintArgs {
                command: cmd::blueprint::BlueprintCommand::Add { .. }
            })
        ));
        let cli = Cli::parse_from(["ual", "blueprint", "list"]);
        assert!(matches!(cli.command, Commands::Blueprint(_)));
    }

    #[test]
    fn all_subcommands_listed() {
        let names: Vec<String> = Cli::command()
            .get_subcommands()
            .map(|c| c.get_name().to_string())
            .collect();
        for expected in [
            "init", "create", "void", "link", "show", "list", "timeline", "blueprint", "status",
            "verify", "stats",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }
}
