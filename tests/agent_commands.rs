use async_trait::async_trait;
use product_advisor::agent::{ AIAgent, AgentError, AgentSettings, EMPTY_SELECTION_MESSAGE };
use product_advisor::catalog::{ CatalogCache, CatalogError, FileCatalogSource };
use product_advisor::config::prompt::{ PromptConfig, CHAT_SYSTEM_PROMPT, ROUTINE_REQUEST_PROMPT };
use product_advisor::llm::chat::{ AdvisorClient, AdvisorError, APOLOGY };
use product_advisor::models::chat::{ ChatMessage, Role };
use product_advisor::storage::{ FileStorage, KeyValueStorage };
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const KEY: &str = "loreal_selected_product_ids";

const CATALOG: &str = r#"{
  "products": [
    { "id": 1, "name": "Revitalift Serum", "brand": "L'Oréal Paris", "category": "skincare", "description": "Hyaluronic acid serum.", "image": "1.jpg" },
    { "id": 2, "name": "Micellar Water", "brand": "Garnier", "category": "cleanser", "description": "Gentle cleanser.", "image": "2.jpg" },
    { "id": 3, "name": "Lash Paradise", "brand": "L'Oréal Paris", "category": "makeup", "description": "Volumizing mascara.", "image": "3.jpg" }
  ]
}"#;

/// Records every request and answers with a numbered reply.
#[derive(Default)]
struct ScriptedAdvisor {
    requests: Mutex<Vec<Vec<ChatMessage>>>,
    delay_first: bool,
    fail: bool,
}

#[async_trait]
impl AdvisorClient for ScriptedAdvisor {
    async fn request(&self, messages: &[ChatMessage]) -> Result<String, AdvisorError> {
        let n = {
            let mut requests = self.requests.lock().await;
            requests.push(messages.to_vec());
            requests.len()
        };
        if self.delay_first && n == 1 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        if self.fail {
            return Err(AdvisorError::Config("offline".into()));
        }
        Ok(format!("reply {}", n))
    }

    fn endpoint(&self) -> &str {
        "scripted"
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    catalog_path: std::path::PathBuf,
    storage_path: std::path::PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let catalog_path = dir.path().join("products.json");
        std::fs::write(&catalog_path, CATALOG).unwrap();
        let storage_path = dir.path().join("storage.json");
        Self { catalog_path, storage_path, _dir: dir }
    }

    fn agent(&self, advisor: Arc<ScriptedAdvisor>, settings: AgentSettings) -> AIAgent {
        agent_for(&self.catalog_path, &self.storage_path, advisor, settings)
    }
}

fn agent_for(
    catalog_path: &Path,
    storage_path: &Path,
    advisor: Arc<ScriptedAdvisor>,
    settings: AgentSettings
) -> AIAgent {
    AIAgent::from_parts(
        Arc::new(CatalogCache::new(Arc::new(FileCatalogSource::new(catalog_path)))),
        Arc::new(FileStorage::new(storage_path)),
        KEY,
        advisor,
        PromptConfig::default(),
        settings
    )
}

fn ids(products: &[product_advisor::models::product::Product]) -> Vec<i64> {
    products.iter().map(|p| p.id).collect()
}

#[tokio::test]
async fn selection_survives_restart_and_drops_stale_ids() {
    let fixture = Fixture::new();
    let first = fixture.agent(Arc::default(), AgentSettings::default());
    first.init().await.unwrap();
    assert!(first.toggle_product(3).await);
    assert!(first.toggle_product(1).await);

    // Product 99 was selected in a previous catalog version.
    FileStorage::new(&fixture.storage_path).set(KEY, "[3,99,1]").await.unwrap();

    let second = fixture.agent(Arc::default(), AgentSettings::default());
    second.init().await.unwrap();
    assert_eq!(ids(&second.selected_products().await), vec![3, 1]);
}

#[tokio::test]
async fn init_fails_when_catalog_is_missing() {
    let fixture = Fixture::new();
    let agent = agent_for(
        &fixture.catalog_path.with_file_name("missing.json"),
        &fixture.storage_path,
        Arc::default(),
        AgentSettings::default()
    );
    assert!(matches!(agent.init().await, Err(CatalogError::Io(_))));
}

#[tokio::test]
async fn category_filter_and_clear() {
    let fixture = Fixture::new();
    let agent = fixture.agent(Arc::default(), AgentSettings::default());
    agent.init().await.unwrap();

    assert_eq!(ids(&agent.products(Some("makeup")).await.unwrap()), vec![3]);
    assert_eq!(agent.products(None).await.unwrap().len(), 3);
    assert_eq!(agent.categories().await.unwrap(), vec!["cleanser", "makeup", "skincare"]);

    for id in 1..=3 {
        agent.toggle_product(id).await;
    }
    agent.clear_selection().await;
    assert!(agent.selected_products().await.is_empty());
    let stored = FileStorage::new(&fixture.storage_path).get(KEY).await.unwrap();
    assert_eq!(stored.as_deref(), Some("[]"));
}

#[tokio::test]
async fn chat_records_raw_text_and_reply() {
    let fixture = Fixture::new();
    let advisor = Arc::new(ScriptedAdvisor::default());
    let agent = fixture.agent(advisor.clone(), AgentSettings::default());
    agent.init().await.unwrap();
    agent.toggle_product(1).await;

    assert_eq!(agent.submit_chat_message("   ").await, None);
    assert_eq!(agent.submit_chat_message("  Is it good for dry skin? ").await.as_deref(), Some("reply 1"));
    agent.submit_chat_message("And at night?").await;

    let log = agent.conversation().await;
    assert_eq!(
        log,
        vec![
            ChatMessage::user("Is it good for dry skin?"),
            ChatMessage::assistant("reply 1"),
            ChatMessage::user("And at night?"),
            ChatMessage::assistant("reply 2")
        ]
    );

    let requests = advisor.requests.lock().await;
    assert_eq!(requests.len(), 2);
    let second = &requests[1];
    assert_eq!(second[0], ChatMessage::system(CHAT_SYSTEM_PROMPT));
    assert_eq!(&second[1..3], &log[0..2]);
    // The selection digest is off by default.
    assert_eq!(second[3].content, "\nUser request: And at night?");
}

#[tokio::test]
async fn chat_can_include_selection_digest() {
    let fixture = Fixture::new();
    let advisor = Arc::new(ScriptedAdvisor::default());
    let settings = AgentSettings { chat_include_selection: true, prompts_path: None };
    let agent = fixture.agent(advisor.clone(), settings);
    agent.init().await.unwrap();
    agent.toggle_product(2).await;

    agent.submit_chat_message("Tips?").await;

    let requests = advisor.requests.lock().await;
    let user = requests[0].last().unwrap();
    assert_eq!(
        user.content,
        "Selected products:\n• Garnier — Micellar Water: Gentle cleanser.\n\nUser request: Tips?"
    );
}

#[tokio::test]
async fn routine_requires_a_selection() {
    let fixture = Fixture::new();
    let advisor = Arc::new(ScriptedAdvisor::default());
    let agent = fixture.agent(advisor.clone(), AgentSettings::default());
    agent.init().await.unwrap();

    let err = agent.generate_routine().await.unwrap_err();
    assert!(matches!(err, AgentError::EmptySelection));
    assert_eq!(err.to_string(), EMPTY_SELECTION_MESSAGE);
    assert!(advisor.requests.lock().await.is_empty());
    assert!(agent.conversation().await.is_empty());
}

#[tokio::test]
async fn routine_is_stateless_but_joins_the_conversation() {
    let fixture = Fixture::new();
    let advisor = Arc::new(ScriptedAdvisor::default());
    let agent = fixture.agent(advisor.clone(), AgentSettings::default());
    agent.init().await.unwrap();
    agent.submit_chat_message("Hi").await;
    agent.toggle_product(2).await;
    agent.toggle_product(1).await;

    assert_eq!(agent.generate_routine().await.unwrap(), "reply 2");

    let requests = advisor.requests.lock().await;
    let routine = &requests[1];
    assert_eq!(routine.len(), 2);
    assert_eq!(routine[0].role, Role::System);
    assert!(routine[1].content.starts_with("SelectedProductsJson:\n[\n  {\n    \"id\": 2,"));
    assert!(routine[1].content.ends_with(&format!("\n\nRequest: {}", ROUTINE_REQUEST_PROMPT)));
    drop(requests);

    agent.submit_chat_message("Shorter please").await;
    let log = agent.conversation().await;
    assert_eq!(log.len(), 6);
    assert_eq!(log[2].role, Role::User);
    assert!(log[2].content.starts_with("SelectedProductsJson:"));
    assert_eq!(log[3], ChatMessage::assistant("reply 2"));

    let requests = advisor.requests.lock().await;
    assert_eq!(requests[2].len(), 6);
}

#[tokio::test]
async fn routine_waiting_behind_a_chat_sees_the_cleared_selection() {
    let fixture = Fixture::new();
    let advisor = Arc::new(ScriptedAdvisor { delay_first: true, ..ScriptedAdvisor::default() });
    let agent = Arc::new(fixture.agent(advisor.clone(), AgentSettings::default()));
    agent.init().await.unwrap();
    agent.toggle_product(2).await;

    let chat = {
        let agent = Arc::clone(&agent);
        tokio::spawn(async move { agent.submit_chat_message("slow").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let routine = {
        let agent = Arc::clone(&agent);
        tokio::spawn(async move { agent.generate_routine().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    agent.clear_selection().await;

    assert_eq!(chat.await.unwrap().as_deref(), Some("reply 1"));
    assert!(matches!(routine.await.unwrap(), Err(AgentError::EmptySelection)));
    assert_eq!(advisor.requests.lock().await.len(), 1);
    assert_eq!(agent.conversation().await.len(), 2);
}

#[tokio::test]
async fn advisor_failure_becomes_apology_in_the_log() {
    let fixture = Fixture::new();
    let advisor = Arc::new(ScriptedAdvisor { fail: true, ..ScriptedAdvisor::default() });
    let agent = fixture.agent(advisor, AgentSettings::default());
    agent.init().await.unwrap();

    assert_eq!(agent.submit_chat_message("Hello").await.as_deref(), Some(APOLOGY));
    assert_eq!(agent.conversation().await[1], ChatMessage::assistant(APOLOGY));
}

#[tokio::test]
async fn overlapping_chats_are_logged_in_issue_order() {
    let fixture = Fixture::new();
    let advisor = Arc::new(ScriptedAdvisor { delay_first: true, ..ScriptedAdvisor::default() });
    let agent = Arc::new(fixture.agent(advisor.clone(), AgentSettings::default()));
    agent.init().await.unwrap();

    let slow = {
        let agent = Arc::clone(&agent);
        tokio::spawn(async move { agent.submit_chat_message("first").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let fast = {
        let agent = Arc::clone(&agent);
        tokio::spawn(async move { agent.submit_chat_message("second").await })
    };

    assert_eq!(slow.await.unwrap().as_deref(), Some("reply 1"));
    assert_eq!(fast.await.unwrap().as_deref(), Some("reply 2"));

    let log = agent.conversation().await;
    let contents: Vec<&str> = log.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "reply 1", "second", "reply 2"]);

    // The second request saw the completed first exchange.
    assert_eq!(advisor.requests.lock().await[1].len(), 4);
}

#[tokio::test]
async fn selection_commands_do_not_wait_for_the_advisor() {
    let fixture = Fixture::new();
    let advisor = Arc::new(ScriptedAdvisor { delay_first: true, ..ScriptedAdvisor::default() });
    let agent = Arc::new(fixture.agent(advisor, AgentSettings::default()));
    agent.init().await.unwrap();

    let chat = {
        let agent = Arc::clone(&agent);
        tokio::spawn(async move { agent.submit_chat_message("slow one").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let mut events = agent.subscribe_selection();
    events.borrow_and_update();
    assert!(agent.toggle_product(2).await);
    assert!(events.has_changed().unwrap());
    assert!(!chat.is_finished());

    chat.await.unwrap();
}
