pub mod api;
pub mod websocket;

use crate::agent::AIAgent;
use crate::cli::Args;
use std::error::Error;
use std::sync::Arc;

pub struct Server {
    addr: String,
    agent: Arc<AIAgent>,
    api_key: Option<String>,
    http_port: Option<u16>,
}

impl Server {
    pub fn new(agent: Arc<AIAgent>, args: &Args) -> Self {
        Self {
            addr: args.server_addr.clone(),
            agent,
            api_key: args.server_api_key.clone(),
            http_port: args.http_port,
        }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if let Some(http_port) = self.http_port {
            api::start_http_server(http_port, Arc::clone(&self.agent)).await?;
        }

        websocket::start_ws_server(&self.addr, Arc::clone(&self.agent), self.api_key.clone()).await
    }
}
