//! Groups Search Connector
//!
//! Menu-driven tool that manages a search external connection and pushes directory groups into it

// groupsconnector/src/main.rs
mod config;
mod console;
mod errors;
mod graph;
mod store;
mod sync;
mod utils;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use config::AppConfig;
use console::{Console, Services, Session};
use graph::GraphClient;
use std::io::{stdin, stdout};
use std::path::PathBuf;
use std::process::ExitCode;
use store::{FileWatermarkStore, GroupStore};

#[tokio::main]
async fn main() -> ExitCode {
    match run_app().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ An unexpected error occurred: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    // Expects config.json in the working directory.
    let config_path = PathBuf::from("config.json");
    let config = AppConfig::load_from_json(&config_path).context(format!(
        "Failed to load application configuration from {}",
        config_path.display()
    ))?;

    utils::init_tracing(&config.log_level);
    tracing::info!(
        graph = %config.graph.base_url,
        database = %config.database_path.display(),
        "starting groups connector"
    );

    let index = GraphClient::new(&config.graph).context("Failed to build Graph client")?;
    let store = GroupStore::open(&config.database_path)
        .await
        .with_context(|| format!("Failed to open group store at {}", config.database_path.display()))?;
    let watermarks = FileWatermarkStore::new(config.watermark_path.clone());
    tracing::debug!(path = %watermarks.path().display(), "last upload time file");

    let services = Services {
        index: &index,
        directory: &index,
        store: &store,
        watermarks: &watermarks,
        schema_poll: config.schema_poll,
    };

    let mut console = Console::new(stdin().lock(), stdout());
    let mut session = Session::default();
    console::run_menu_loop(&mut console, &mut session, &services).await
}
