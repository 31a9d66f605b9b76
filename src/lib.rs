pub mod agent;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod history;
pub mod llm;
pub mod models;
pub mod selection;
pub mod server;
pub mod storage;

use agent::AIAgent;
use cli::Args;
use log::{ info, error };
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Catalog Source: {}", args.catalog_source);
    info!("Storage Type: {}", args.storage_type);
    match args.storage_type.to_lowercase().as_str() {
        "file" => info!("Storage Path: {}", args.storage_path),
        "redis" => info!("Storage Host: {}", args.storage_host),
        _ => {}
    }
    info!("Selection Storage Key: {}", args.selection_key);
    info!("Advisor Type: {}", args.advisor_type);
    info!("Advisor URL: {}", args.advisor_url);
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("built-in"));
    info!("Chat Includes Selection: {}", args.chat_include_selection);
    info!("Server Address: {}", args.server_addr);
    if let Some(port) = args.http_port {
        info!("HTTP API Port: {}", port);
    }
    info!("-------------------------");

    let agent = Arc::new(AIAgent::new(&args)?);
    agent.init().await.map_err(|e| {
        error!("Failed to load product catalog: {}", e);
        e
    })?;

    let server = Server::new(agent, &args);
    server.run().await?;

    Ok(())
}
