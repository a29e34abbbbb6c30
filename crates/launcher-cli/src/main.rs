//! crew-launcher - install desktop applications as locally served web apps.
//!
//! `add` turns a desktop entry into a profile, walks the browser through
//! installing it and then (re)starts the dispatch daemon that launches the
//! app whenever its start URL is opened.

mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use colored::Colorize;
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "crew-launcher")]
#[command(about = "Turn desktop entries into locally served web apps")]
#[command(version, disable_help_subcommand = true)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a profile for a desktop file or package, install it and start the daemon
    Add {
        /// Absolute path to a .desktop file, or a package name
        reference: String,

        /// Keep the identifier of an existing profile for the same desktop file
        #[arg(long)]
        update: bool,
    },

    /// (Re)start the dispatch daemon
    #[command(alias = "start-server")]
    Start {
        /// Serve in the foreground instead of detaching
        #[arg(long)]
        foreground: bool,
    },

    /// Stop the dispatch daemon
    #[command(alias = "stop-server")]
    Stop,

    /// Show whether the dispatch daemon is running
    #[command(alias = "stat")]
    Status,

    /// List installed profiles
    List,

    /// Remove the profile of a desktop file or package
    Remove {
        reference: String,
    },

    /// Print the profile identifiers of desktop files or packages
    Uuid {
        #[arg(required = true)]
        references: Vec<String>,
    },

    /// Show this help
    #[command(alias = "h")]
    Help,
}

impl Command {
    /// Whether this command detaches into the background.
    fn detaches(&self) -> bool {
        matches!(self, Command::Add { .. } | Command::Start { foreground: false })
    }
}

fn init_logging(debug: bool, ansi: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Daemon output ends up in a log file.
    let detaches = cli.command.as_ref().is_some_and(Command::detaches);
    let ansi = std::io::stderr().is_terminal() && !detaches;
    init_logging(cli.debug, ansi);

    let result = match cli.command {
        None | Some(Command::Help) => Cli::command().print_help().map_err(anyhow::Error::from),
        Some(Command::Add { reference, update }) => commands::add(&reference, update),
        Some(Command::Start { foreground }) => commands::start(foreground),
        Some(Command::Stop) => commands::stop(),
        Some(Command::Status) => commands::status(),
        Some(Command::List) => commands::list(),
        Some(Command::Remove { reference }) => commands::remove(&reference),
        Some(Command::Uuid { references }) => commands::uuid(&references),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", format!("crew-launcher: {:#}", e).red());
            ExitCode::FAILURE
        }
    }
}
