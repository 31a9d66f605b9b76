use crate::agent::{ AIAgent, AgentError };
use crate::models::chat::ChatMessage;
use crate::models::product::{ Product, ProductId };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    routing::{ get, post },
    Router,
    extract::{ State, Query, Path },
    response::{ IntoResponse, Response },
    http::StatusCode,
    Json,
};
use serde::{ Deserialize, Serialize };
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, error };

#[derive(Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub content: String,
}

#[derive(Deserialize)]
pub struct ConversationQuery {
    pub format: Option<String>,
}

#[derive(Serialize)]
struct SelectionResponse {
    selected: bool,
    products: Vec<Product>,
}

#[derive(Serialize)]
struct ReplyResponse {
    content: String,
    timestamp: i64,
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Serialize)]
struct ReloadResponse {
    success: bool,
    message: String,
}

#[derive(Clone)]
struct AppState {
    agent: Arc<AIAgent>,
}

pub fn router(agent: Arc<AIAgent>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/categories", get(categories_handler))
        .route("/api/products", get(products_handler))
        .route("/api/selection", get(selection_handler).delete(clear_handler))
        .route("/api/selection/{id}", post(toggle_handler).delete(remove_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/routine", post(routine_handler))
        .route("/api/conversation", get(conversation_handler))
        .route("/api/reload-prompts", get(reload_prompts_handler))
        .layer(cors)
        .with_state(AppState { agent })
}

pub async fn start_http_server(
    http_port: u16,
    agent: Arc<AIAgent>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = format!("0.0.0.0:{}", http_port).parse::<SocketAddr>()?;
    info!("Starting HTTP API server on: http://{}", addr);

    let app = router(agent);
    tokio::spawn(async move {
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                    error!("HTTP server error: {}", e);
                }
            }
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e);
            }
        }
    });

    Ok(())
}

fn error_response(code: StatusCode, message: String) -> Response {
    (code, Json(ErrorResponse { message })).into_response()
}

async fn categories_handler(State(state): State<AppState>) -> Response {
    match state.agent.categories().await {
        Ok(categories) => Json(categories).into_response(),
        Err(e) => {
            error!("Catalog load failed: {}", e);
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

async fn products_handler(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>
) -> Response {
    match state.agent.products(query.category.as_deref()).await {
        Ok(products) => Json(products).into_response(),
        Err(e) => {
            error!("Catalog load failed: {}", e);
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

async fn selection_handler(State(state): State<AppState>) -> Json<Vec<Product>> {
    Json(state.agent.selected_products().await)
}

async fn toggle_handler(
    State(state): State<AppState>,
    Path(id): Path<ProductId>
) -> Json<SelectionResponse> {
    let selected = state.agent.toggle_product(id).await;
    Json(SelectionResponse {
        selected,
        products: state.agent.selected_products().await,
    })
}

async fn remove_handler(
    State(state): State<AppState>,
    Path(id): Path<ProductId>
) -> Json<SelectionResponse> {
    state.agent.remove_product(id).await;
    Json(SelectionResponse {
        selected: false,
        products: state.agent.selected_products().await,
    })
}

async fn clear_handler(State(state): State<AppState>) -> StatusCode {
    state.agent.clear_selection().await;
    StatusCode::NO_CONTENT
}

async fn chat_handler(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    match state.agent.submit_chat_message(&req.content).await {
        Some(content) =>
            Json(ReplyResponse {
                content,
                timestamp: chrono::Utc::now().timestamp(),
            }).into_response(),
        None => error_response(StatusCode::BAD_REQUEST, "Message is empty".to_string()),
    }
}

async fn routine_handler(State(state): State<AppState>) -> Response {
    match state.agent.generate_routine().await {
        Ok(content) =>
            Json(ReplyResponse {
                content,
                timestamp: chrono::Utc::now().timestamp(),
            }).into_response(),
        Err(e @ AgentError::EmptySelection) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
        Err(e) => {
            error!("Routine generation failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn conversation_handler(
    State(state): State<AppState>,
    Query(query): Query<ConversationQuery>
) -> Response {
    if query.format.as_deref() == Some("text") {
        return state.agent.transcript().await.into_response();
    }
    let messages: Vec<ChatMessage> = state.agent.conversation().await;
    Json(messages).into_response()
}

async fn reload_prompts_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (code, body) = match state.agent.reload_prompts_if_changed() {
        Ok(true) => (StatusCode::OK, ReloadResponse { success: true, message: "Prompts reloaded".into() }),
        Ok(false) => (StatusCode::OK, ReloadResponse { success: true, message: "Prompts unchanged".into() }),
        Err(e) => (StatusCode::BAD_REQUEST, ReloadResponse { success: false, message: format!("Reload error: {}", e) }),
    };
    (code, Json(body))
}
