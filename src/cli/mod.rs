use clap::Parser;

use crate::llm::chat::DEFAULT_WORKER_URL;
use crate::selection::DEFAULT_STORAGE_KEY;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Catalog Args ---
    /// Location of the product catalog: an http(s) URL or a local JSON file path.
    #[arg(long, env = "CATALOG_SOURCE", default_value = "products.json")]
    pub catalog_source: String,

    // --- Selection Storage Args ---
    /// Durable storage backend for the selection (file, redis, memory)
    #[arg(long, env = "STORAGE_TYPE", default_value = "file")]
    pub storage_type: String,

    /// Path of the JSON document used by the file storage backend.
    #[arg(long, env = "STORAGE_PATH", default_value = ".advisor/storage.json")]
    pub storage_path: String,

    /// Redis endpoint used by the redis storage backend (e.g., redis://127.0.0.1:6379)
    #[arg(long, env = "STORAGE_HOST", default_value = "redis://127.0.0.1:6379")]
    pub storage_host: String,

    /// Prefix for Redis storage keys.
    #[arg(long, env = "STORAGE_REDIS_PREFIX", default_value = "advisor:")]
    pub storage_redis_prefix: String,

    /// Key under which the selected product ids are persisted.
    #[arg(long, env = "SELECTION_STORAGE_KEY", default_value = DEFAULT_STORAGE_KEY)]
    pub selection_key: String,

    // --- Advisor Args ---
    /// Type of advisor endpoint (worker, openai)
    #[arg(long, env = "ADVISOR_TYPE", default_value = "worker")]
    pub advisor_type: String,

    /// Advisor endpoint URL. For openai this is the API base URL.
    #[arg(long, env = "ADVISOR_URL", default_value = DEFAULT_WORKER_URL)]
    pub advisor_url: String,

    /// API key for the advisor endpoint (required for openai)
    #[arg(long, env = "ADVISOR_API_KEY", default_value = "")]
    pub advisor_api_key: String,

    /// Model name sent to openai endpoints (e.g., gpt-4o)
    #[arg(long, env = "ADVISOR_MODEL")]
    pub advisor_model: Option<String>,

    /// Timeout in seconds for a single advisor request.
    #[arg(long, env = "ADVISOR_TIMEOUT_SECS", default_value = "60")]
    pub advisor_timeout_secs: u64,

    /// Optional JSON file overriding the advisor instruction texts.
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    /// Prefix chat messages with a digest of the selected products.
    #[arg(long, env = "CHAT_INCLUDE_SELECTION", default_value = "false")]
    pub chat_include_selection: bool,

    // --- Server Args ---
    /// Host address and port for the WebSocket server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// Port for the HTTP JSON API. The API is disabled when unset.
    #[arg(long, env = "HTTP_PORT")]
    pub http_port: Option<u16>,

    /// Optional API Key required for clients to connect to the WebSocket server. If set, clients must sign the handshake with it.
    #[arg(long, env = "SERVER_API_KEY")]
    pub server_api_key: Option<String>,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}
