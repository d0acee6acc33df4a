//! bc4 CLI binary entry point.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use bc4::cli::{self, AccountCommands, AuthCommands, Cli, CliContext, Commands};

const LOG_ENV: &str = "BC4_LOG";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let result = async {
        let ctx = CliContext::load()?;
        match cli.command {
            Commands::Auth(auth_args) => match auth_args.command {
                AuthCommands::Login => cli::auth::handle_login(&ctx, cancel).await,
                AuthCommands::Logout(args) => cli::auth::handle_logout(&ctx, &args),
                AuthCommands::Status => cli::auth::handle_status(&ctx),
                AuthCommands::Refresh(args) => cli::auth::handle_refresh(&ctx, &args).await,
            },
            Commands::Account(account_args) => match account_args.command {
                AccountCommands::List(args) => cli::account::handle_list(&ctx, &args),
                AccountCommands::Set(args) => cli::account::handle_set(&ctx, &args),
                AccountCommands::Current(args) => cli::account::handle_current(&ctx, &args),
            },
        }
    }
    .await;

    if let Err(e) = result {
        eprintln!("Error: {}", cli::errors::format_error_help(&e));
        std::process::exit(1);
    }
}
