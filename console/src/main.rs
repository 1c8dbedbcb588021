//! `backoffice`: the institute's back-office operations from a terminal.

mod cli;
mod commands;
mod roster_view;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use cli::{Cli, Command};
use client::{ApiClient, ClientConfig, FileTokenStore};
use common::{config::AppConfig, logger::init_logging};
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(api_base) = &cli.api_base {
        AppConfig::set_api_base(api_base);
    }
    if let Some(session_file) = &cli.session_file {
        AppConfig::set_session_file(session_file);
    }
    let cfg = AppConfig::global();
    let _log_guard = init_logging(&cfg.log_file, &cfg.log_level, cfg.log_to_stdout);

    info!(
        project = %cfg.project_name,
        env = %cfg.env,
        api_base = %cfg.api_base,
        "starting"
    );

    let config = ClientConfig::new(&cfg.api_base)
        .with_timeout(Duration::from_secs(cfg.request_timeout_secs));
    let client = ApiClient::new(config, FileTokenStore::new(&cfg.session_file))
        .with_context(|| format!("cannot open session file {}", cfg.session_file))?;

    match &cli.command {
        Command::Login { username, password } => {
            client
                .login(username, password)
                .await
                .map_err(commands::report)?;
            println!("Signed in as {username}.");
            return Ok(());
        }
        Command::Logout => {
            client.logout().map_err(commands::report)?;
            println!("Signed out.");
            return Ok(());
        }
        Command::Status => {
            if client.is_authenticated() {
                println!("Signed in ({}).", cfg.api_base);
            } else {
                println!("Not signed in.");
            }
            return Ok(());
        }
        _ => {}
    }

    client
        .require_session()
        .map_err(|err| anyhow!("{err}; run `backoffice login` first"))?;

    match cli.command {
        Command::Dashboard => commands::dashboard(&client).await,
        Command::Students(cmd) => commands::students(&client, cmd).await,
        Command::Courses(cmd) => commands::courses(&client, cmd).await,
        Command::Subjects(cmd) => commands::subjects(&client, cmd).await,
        Command::Instructors(cmd) => commands::instructors(&client, cmd).await,
        Command::Classes(cmd) => commands::classes(&client, cmd).await,
        Command::Roster(args) => roster_view::run(&client, args, cfg.student_page_size).await,
        Command::Login { .. } | Command::Logout | Command::Status => Ok(()),
    }
}
