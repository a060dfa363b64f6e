use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::sync::Arc;

use core_notes::api::HttpTaskService;
use core_notes::cli::{Cli, Commands};
use core_notes::commands::{self, ListArgs, UpdateArgs};
use core_notes::config::Config;
use core_notes::{logging, ui};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env(cli.api_url.as_deref());
    if let Err(e) = logging::init(&config.log_file) {
        eprintln!("warning: {e:#}");
    }
    log::info!("using task API at {}", config.base_url);

    let service = HttpTaskService::from_config(&config).context("Failed to set up the HTTP client")?;
    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        None | Some(Commands::Tui) => {
            // Default behavior: launch TUI
            let _guard = rt.enter();
            ui::run_tui(Arc::new(service))?;
        }
        Some(Commands::List {
            status,
            favorite,
            not_favorite,
            search,
            color,
        }) => {
            let favorite = match (favorite, not_favorite) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let args = ListArgs {
                status,
                favorite,
                search,
                color,
            };
            rt.block_on(commands::list(&service, args))?;
        }
        Some(Commands::Get { id }) => {
            rt.block_on(commands::get(&service, &id))?;
        }
        Some(Commands::Add {
            title,
            description,
            color,
        }) => {
            rt.block_on(commands::add(&service, &title, description.as_deref(), color.as_deref()))?;
        }
        Some(Commands::Update {
            id,
            title,
            description,
            status,
            color,
            favorite,
        }) => {
            let args = UpdateArgs {
                title,
                description,
                status,
                color,
                favorite,
            };
            rt.block_on(commands::update(&service, &id, args))?;
        }
        Some(Commands::Done { id }) => {
            rt.block_on(commands::toggle_done(&service, &id))?;
        }
        Some(Commands::Favorite { id }) => {
            rt.block_on(commands::toggle_favorite(&service, &id))?;
        }
        Some(Commands::Delete { id }) => {
            rt.block_on(commands::delete(&service, &id))?;
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "notes", &mut std::io::stdout());
        }
    }

    Ok(())
}
