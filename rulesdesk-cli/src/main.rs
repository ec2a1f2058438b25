//! Rulesdesk CLI - manage business rules from your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{auth, get_context, rules};

/// Rulesdesk - business rules management in your terminal
#[derive(Parser)]
#[command(name = "rd", version, about, long_about = None)]
struct Cli {
    /// Log HTTP traffic to stderr (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the session token
    Login {
        /// Account email (prompted if omitted)
        #[arg(long)]
        email: Option<String>,
        /// Password (prompted if omitted)
        #[arg(long, env = "RULESDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// End the session and forget the token
    Logout,

    /// Show the logged-in user
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage rules
    Rules {
        #[command(subcommand)]
        command: rules::RulesCommands,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "rulesdesk_core=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli).await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("Error: {}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut ctx = get_context()?;

    let result = match cli.command {
        Commands::Login { email, password } => auth::login(&mut ctx, email, password).await,
        Commands::Logout => auth::logout(&mut ctx).await,
        Commands::Whoami { json } => auth::whoami(&ctx, json).await,
        Commands::Rules { command } => rules::run(&ctx, command).await,
    };

    output::notifications(&ctx.notifications);

    // A 401 clears the token; forget it on disk too
    if ctx.token.get() != ctx.config.token {
        ctx.persist_session()?;
    }

    result
}
