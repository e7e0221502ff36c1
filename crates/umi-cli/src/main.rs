//! umi CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use umi_core::{TracingConfig, init_tracing};

use umi_cli::cli::{Cli, Command, ConfigAction, CredentialsAction};
use umi_cli::commands;
use umi_cli::config::AppConfig;
use umi_cli::error::ClientResult;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing = match (&cli.command, cli.debug) {
        (_, true) => TracingConfig::cli_debug(),
        (Command::Serve { .. }, false) => TracingConfig::server(),
        _ => TracingConfig::cli(),
    };
    if let Err(e) = init_tracing(tracing) {
        eprintln!("warning: logging disabled: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { bind } => commands::serve::run(&config, bind).await,
        Command::Availability { days, email, user } => {
            commands::availability::run(&config, days, email.as_deref(), user.as_deref()).await
        }
        Command::Credentials { action } => match action {
            CredentialsAction::Add {
                file,
                email,
                user,
                calendar_id,
                primary,
            } => {
                let stored =
                    commands::credentials::add(&config, &file, &email, &user, &calendar_id, primary)
                        .await?;
                println!(
                    "Stored {} for {}{}.",
                    stored.email,
                    stored.user,
                    if stored.is_primary { " (primary)" } else { "" }
                );
                println!("Send SIGHUP to a running `umi serve` to pick it up.");
                Ok(())
            }
            CredentialsAction::List => {
                let calendars = commands::credentials::list(&config).await?;
                commands::credentials::print_list(&calendars);
                Ok(())
            }
            CredentialsAction::Check { probe } => {
                let reports = commands::credentials::check(&config, probe).await?;
                commands::credentials::print_check(&reports)
            }
            CredentialsAction::SetPrimary { email, user } => {
                let calendar =
                    commands::credentials::set_primary(&config, &email, user.as_deref()).await?;
                println!("Calendar {} set as primary for {}.", calendar.email, calendar.user);
                Ok(())
            }
            CredentialsAction::Keygen => {
                println!("{}", commands::credentials::keygen());
                Ok(())
            }
        },
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config, &config_path),
        },
    }
}
