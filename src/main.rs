use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Error;
use args::{Args, SubCommands};
use clap::{CommandFactory, Parser};
use tracing::debug;

use clients::completion::{ClientOptions, CompletionClient};
use clients::openai::HttpTransport;
use repos::config::get_config;
use repos::prompts::PromptRepository;
use repos::roles::RoleRepository;
use repos::settings::SettingsRepository;
use repos::store::AnyStore;
use repos::usage::UsageRepository;
use services::EnhanceService;

mod args;
mod clients;
mod commands;
mod error;
mod models;
mod parser;
mod repos;
mod services;
mod utils;

async fn run(args: Args) -> Result<(), Error> {
    let config = get_config();
    let storage_path = config.storage_path();
    debug!("Using storage at {}", storage_path.display());

    let store = Arc::new(AnyStore::new_file(storage_path));
    let settings = SettingsRepository::new(store.clone());
    let prompts = PromptRepository::new(store.clone());
    let roles = RoleRepository::new(store.clone());
    let usage = UsageRepository::new(store);

    let transport = HttpTransport::new(config.completions_url()?, config.request_timeout());
    debug!("Completions endpoint {}", transport.url());
    let client = CompletionClient::new(
        Arc::new(transport),
        settings.clone(),
        usage.clone(),
        ClientOptions::from(config),
    );

    match args.subcmd {
        Some(SubCommands::Enhance(cmd)) => {
            let service = EnhanceService::new(&client, &roles, &settings);
            commands::enhance::run(&service, &prompts, &cmd).await
        }
        Some(SubCommands::Key(cmd)) => commands::key::run(&client, &settings, &cmd.action).await,
        Some(SubCommands::Config(cmd)) => commands::config::run(&settings, &roles, &cmd),
        Some(SubCommands::Prompts(cmd)) => commands::prompts::run(&prompts, &roles, &cmd.action),
        Some(SubCommands::Roles(cmd)) => commands::roles::run(&roles, &cmd.action),
        Some(SubCommands::Usage(cmd)) => commands::usage::run(&usage, &cmd),
        None => {
            Args::command().print_help()?;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "enhancer=info".to_string()),
        )
        .init();
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", commands::describe(&e));
            ExitCode::FAILURE
        }
    }
}
