use crate::catalog::{ create_catalog_source, CatalogCache, CatalogError };
use crate::cli::Args;
use crate::config::prompt::{ self, PromptConfig, PromptError };
use crate::history::{ format_history_for_display, ConversationLog };
use crate::llm::{ AdvisorConfig, AdvisorType };
use crate::llm::chat::{ new_client as new_advisor_client, AdvisorClient };
use crate::llm::messages::{ build_chat_request, build_routine_request };
use crate::models::chat::ChatMessage;
use crate::models::product::{ Product, ProductId };
use crate::selection::SelectionStore;
use crate::storage::{ create_storage, KeyValueStorage };

use log::{ info, warn };
use std::error::Error;
use std::path::PathBuf;
use std::sync::{ Arc, RwLock };
use thiserror::Error as ThisError;
use tokio::sync::{ watch, Mutex };

pub const EMPTY_SELECTION_MESSAGE: &str =
    "Please select at least one product to generate a routine.";

#[derive(Debug, ThisError)]
pub enum AgentError {
    #[error("{}", EMPTY_SELECTION_MESSAGE)]
    EmptySelection,
    #[error("Failed to serialize selected products: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default)]
pub struct AgentSettings {
    pub chat_include_selection: bool,
    pub prompts_path: Option<PathBuf>,
}

/// Owns the whole session state: catalog, selection and conversation.
///
/// Selection commands and advisor exchanges lock independently, so toggling
/// products is never held up by a slow advisor. Advisor exchanges themselves
/// go through a single slot, which keeps the conversation in issue order.
pub struct AIAgent {
    catalog: Arc<CatalogCache>,
    selection: Mutex<SelectionStore>,
    conversation: Mutex<ConversationLog>,
    exchange_slot: Mutex<()>,
    advisor: Arc<dyn AdvisorClient>,
    prompt_config: RwLock<Arc<PromptConfig>>,
    settings: AgentSettings,
    selection_events: watch::Receiver<u64>,
}

impl AIAgent {
    pub fn from_parts(
        catalog: Arc<CatalogCache>,
        storage: Arc<dyn KeyValueStorage>,
        storage_key: &str,
        advisor: Arc<dyn AdvisorClient>,
        prompt_config: PromptConfig,
        settings: AgentSettings
    ) -> Self {
        let selection = SelectionStore::new(Arc::clone(&catalog), storage, storage_key);
        let selection_events = selection.subscribe();
        Self {
            catalog,
            selection: Mutex::new(selection),
            conversation: Mutex::new(ConversationLog::new()),
            exchange_slot: Mutex::new(()),
            advisor,
            prompt_config: RwLock::new(Arc::new(prompt_config)),
            settings,
            selection_events,
        }
    }

    pub fn new(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let catalog = Arc::new(CatalogCache::new(create_catalog_source(&args.catalog_source)));
        let storage = create_storage(args)?;

        let advisor_type: AdvisorType = args.advisor_type.parse()?;
        let advisor_config = AdvisorConfig {
            advisor_type,
            endpoint: args.advisor_url.clone(),
            api_key: Some(args.advisor_api_key.clone()).filter(|k| !k.is_empty()),
            model: args.advisor_model.clone(),
            timeout_secs: args.advisor_timeout_secs,
        };
        let advisor = new_advisor_client(&advisor_config)?;
        info!(
            "Advisor client configured: Type={}, Endpoint={}, Model={:?}",
            advisor_type,
            advisor.endpoint(),
            advisor_config.model.as_deref().unwrap_or("endpoint default")
        );

        let prompt_config = match &args.prompts_path {
            Some(path) => {
                info!("Loading prompts from: {}", path);
                prompt::load_prompts(path)?
            }
            None => PromptConfig::default(),
        };

        Ok(
            Self::from_parts(
                catalog,
                storage,
                &args.selection_key,
                advisor,
                prompt_config,
                AgentSettings {
                    chat_include_selection: args.chat_include_selection,
                    prompts_path: args.prompts_path.as_ref().map(PathBuf::from),
                }
            )
        )
    }

    /// Loads the catalog and restores the persisted selection on top of it.
    pub async fn init(&self) -> Result<(), CatalogError> {
        self.catalog.load().await?;
        self.selection.lock().await.restore().await;
        Ok(())
    }

    pub async fn products(&self, category: Option<&str>) -> Result<Vec<Product>, CatalogError> {
        match category {
            Some(category) => self.catalog.by_category(category).await,
            None => Ok(self.catalog.load().await?.as_ref().clone()),
        }
    }

    pub async fn categories(&self) -> Result<Vec<String>, CatalogError> {
        self.catalog.categories().await
    }

    pub async fn selected_products(&self) -> Vec<Product> {
        self.selection.lock().await.items().to_vec()
    }

    pub fn subscribe_selection(&self) -> watch::Receiver<u64> {
        self.selection_events.clone()
    }

    pub async fn toggle_product(&self, id: ProductId) -> bool {
        self.selection.lock().await.toggle(id).await
    }

    pub async fn remove_product(&self, id: ProductId) -> bool {
        self.selection.lock().await.remove(id).await
    }

    pub async fn clear_selection(&self) {
        self.selection.lock().await.clear().await;
    }

    pub async fn conversation(&self) -> Vec<ChatMessage> {
        self.conversation.lock().await.messages().to_vec()
    }

    pub async fn transcript(&self) -> String {
        format_history_for_display(&*self.conversation.lock().await)
    }

    /// Sends a chat turn to the advisor and records it. Blank input is
    /// ignored and yields `None`.
    pub async fn submit_chat_message(&self, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let _slot = self.exchange_slot.lock().await;
        let selection = self.selected_products().await;
        let history = self.conversation().await;
        let messages = build_chat_request(
            &self.prompts(),
            &selection,
            &history,
            text,
            self.settings.chat_include_selection
        );

        let reply = self.advisor.send(&messages).await;

        let mut conversation = self.conversation.lock().await;
        conversation.push_user(text);
        conversation.push_assistant(reply.as_str());
        Some(reply)
    }

    /// Asks the advisor for an AM/PM routine built from the current
    /// selection. The request and the reply join the conversation so later
    /// chat turns can refer to the routine.
    pub async fn generate_routine(&self) -> Result<String, AgentError> {
        // The selection may change while an earlier exchange holds the slot.
        let _slot = self.exchange_slot.lock().await;
        let selection = self.selected_products().await;
        if selection.is_empty() {
            return Err(AgentError::EmptySelection);
        }

        let prompts = self.prompts();
        let messages = build_routine_request(&prompts, &selection, &prompts.routine_request)?;
        if let Some(user_message) = messages.last() {
            self.conversation.lock().await.append(user_message.clone());
        }

        let reply = self.advisor.send(&messages).await;
        self.conversation.lock().await.push_assistant(reply.as_str());
        Ok(reply)
    }

    pub fn prompts(&self) -> Arc<PromptConfig> {
        match self.prompt_config.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Re-reads the prompts file when it changed since the last load.
    /// Returns whether a new configuration was installed.
    pub fn reload_prompts_if_changed(&self) -> Result<bool, PromptError> {
        let Some(path) = &self.settings.prompts_path else {
            warn!("Prompt reload requested but no prompts file is configured");
            return Ok(false);
        };

        let current = self.prompts();
        match prompt::reload_prompts_if_changed(path, &current)? {
            Some(new_config) => {
                let mut guard = match self.prompt_config.write() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                *guard = Arc::new(new_config);
                info!("Prompts successfully reloaded");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
