use crate::agent::AIAgent;
use crate::models::websocket::{ ClientMessage, ServerMessage };

use std::collections::HashMap;
use std::error::Error;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use tokio::net::{ TcpListener, TcpStream };
use tokio::sync::mpsc;

use tokio_tungstenite::{ accept_hdr_async, WebSocketStream };
use tokio_tungstenite::tungstenite::handshake::server::{ Request, Response, ErrorResponse };
use tokio_tungstenite::tungstenite::protocol::Message;

use lazy_static::lazy_static;
use governor::{ RateLimiter, Quota, state::{ InMemoryState, NotKeyed }, clock::DefaultClock };

use hmac::{ Hmac, Mac };
use sha2::Sha256;
use chrono::Utc;
use url::form_urlencoded;

use log::{ info, warn, error, debug };
use futures::{ SinkExt, StreamExt };
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const MAX_MESSAGE_SIZE: usize = 64 * 1024;
const MAX_SIGNATURE_AGE_SECS: u64 = 300;

lazy_static! {
    static ref CONNECTION_LIMITER: RateLimiter<NotKeyed, InMemoryState, DefaultClock> =
        RateLimiter::direct(Quota::per_second(NonZeroU32::MIN.saturating_add(9)));
}

pub async fn start_ws_server(
    addr: &str,
    agent: Arc<AIAgent>,
    api_key: Option<String>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    info!("WS server listening on: {}", addr);
    serve_ws(listener, agent, api_key).await
}

/// Accepts websocket sessions on an already bound listener.
pub async fn serve_ws(
    listener: TcpListener,
    agent: Arc<AIAgent>,
    api_key: Option<String>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    loop {
        let (stream, peer) = listener.accept().await?;

        if CONNECTION_LIMITER.check().is_err() {
            warn!("Global connection rate limit exceeded for {}. Dropping connection.", peer);
            continue;
        }

        info!("Incoming connection from: {}", peer);
        let agent_clone = Arc::clone(&agent);
        let required_api_key = api_key.clone();

        tokio::spawn(async move {
            if let Err(e) = process_connection(peer, stream, agent_clone, required_api_key).await {
                error!("Failed to process connection for {}: {}", peer, e);
            }
        });
    }
}

/// Hex HMAC-SHA256 of the timestamp string, keyed with the server API key.
pub fn sign_timestamp(secret: &str, ts: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(ts.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Checks the `ts`/`sig` query parameters of a handshake URI query.
/// Returns the rejection reason on failure.
pub fn verify_handshake_query(secret: &str, query: &str, now: i64) -> Result<(), &'static str> {
    let params: HashMap<String, String> = form_urlencoded
        ::parse(query.as_bytes())
        .into_owned()
        .collect();

    let (Some(ts), Some(sig)) = (params.get("ts"), params.get("sig")) else {
        return Err("missing ts/sig");
    };

    let ts_i: i64 = ts.parse().map_err(|_| "bad timestamp")?;
    if now.abs_diff(ts_i) > MAX_SIGNATURE_AGE_SECS {
        return Err("timestamp out of range");
    }

    let sig_bytes = hex::decode(sig).map_err(|_| "bad signature")?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| "bad signature")?;
    mac.update(ts.as_bytes());
    mac.verify_slice(&sig_bytes).map_err(|_| "bad signature")
}

fn reject(reason: &str) -> ErrorResponse {
    let mut res = ErrorResponse::new(Some(reason.to_string()));
    *res.status_mut() = tokio_tungstenite::tungstenite::http::StatusCode::UNAUTHORIZED;
    res
}

async fn process_connection(
    peer: SocketAddr,
    stream: TcpStream,
    agent: Arc<AIAgent>,
    required_api_key: Option<String>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let auth_callback = |req: &Request, response: Response| -> Result<Response, ErrorResponse> {
        let secret = match &required_api_key {
            Some(k) if !k.is_empty() => k,
            _ => {
                return Ok(response);
            }
        };

        let query = req.uri().query().unwrap_or("");
        match verify_handshake_query(secret, query, Utc::now().timestamp()) {
            Ok(()) => Ok(response),
            Err(reason) => {
                warn!("Rejected handshake from {}: {}", peer, reason);
                Err(reject(reason))
            }
        }
    };

    match accept_hdr_async(stream, auth_callback).await {
        Ok(ws) => {
            handle_connection(peer, ws, agent).await;
            Ok(())
        }
        Err(e) => {
            error!("Handshake failed for {}: {}", peer, e);
            Err(Box::new(e) as _)
        }
    }
}

fn encode(msg: &ServerMessage) -> Message {
    match serde_json::to_string(msg) {
        Ok(json) => Message::Text(json),
        Err(e) => Message::Text(format!(r#"{{"type":"error","message":"{}"}}"#, e)),
    }
}

/// Runs one client event against the agent and returns the messages to send
/// back, in order.
pub async fn dispatch(agent: &AIAgent, message: ClientMessage) -> Vec<ServerMessage> {
    match message {
        ClientMessage::Filter { category } => {
            match agent.products(category.as_deref()).await {
                Ok(products) => vec![ServerMessage::Products { products }],
                Err(e) => {
                    error!("Catalog load failed: {}", e);
                    vec![ServerMessage::Error { message: format!("Failed to load products: {}", e) }]
                }
            }
        }
        // Selection changes reach the client through the selection watch.
        ClientMessage::Toggle { id } => {
            agent.toggle_product(id).await;
            Vec::new()
        }
        ClientMessage::Remove { id } => {
            agent.remove_product(id).await;
            Vec::new()
        }
        ClientMessage::Clear => {
            agent.clear_selection().await;
            Vec::new()
        }
        ClientMessage::Chat { content } => {
            match agent.submit_chat_message(&content).await {
                Some(reply) =>
                    vec![ServerMessage::Response { content: reply, timestamp: Utc::now().timestamp() }],
                None => Vec::new(),
            }
        }
        ClientMessage::GenerateRoutine => {
            match agent.generate_routine().await {
                Ok(reply) =>
                    vec![ServerMessage::Response { content: reply, timestamp: Utc::now().timestamp() }],
                Err(e) => vec![ServerMessage::Notice { message: e.to_string() }],
            }
        }
        ClientMessage::History => {
            vec![ServerMessage::History { messages: agent.conversation().await }]
        }
    }
}

fn is_advisor_call(message: &ClientMessage) -> bool {
    matches!(message, ClientMessage::Chat { .. } | ClientMessage::GenerateRoutine)
}

/// Drives one websocket session. Advisor calls run on their own task and
/// report back through a channel, so the session keeps reading selection
/// commands and pushing selection updates while a reply is pending.
pub async fn handle_connection(
    peer: SocketAddr,
    websocket: WebSocketStream<TcpStream>,
    agent: Arc<AIAgent>
) {
    let connection_id = Uuid::new_v4();
    info!("New WebSocket connection: {} (ID {})", peer, connection_id);

    let (mut tx, mut rx) = websocket.split();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let mut selection_events = agent.subscribe_selection();
    selection_events.borrow_and_update();

    let initial = ServerMessage::Selection { products: agent.selected_products().await };
    if tx.send(encode(&initial)).await.is_err() {
        error!("Failed to send initial selection to {}", peer);
        return;
    }

    loop {
        tokio::select! {
            changed = selection_events.changed() => {
                if changed.is_err() {
                    break;
                }
                let msg = ServerMessage::Selection { products: agent.selected_products().await };
                if tx.send(encode(&msg)).await.is_err() {
                    error!("Failed to push selection update to {}", peer);
                    break;
                }
            }
            Some(reply) = reply_rx.recv() => {
                if let Err(e) = tx.send(encode(&reply)).await {
                    error!("Error sending advisor reply to {}: {}", peer, e);
                    break;
                }
            }
            incoming = rx.next() => {
                let Some(incoming) = incoming else {
                    break;
                };
                let message = match incoming {
                    Ok(message) => message,
                    Err(e) => {
                        info!("WebSocket receive error for {}: {}", peer, e);
                        break;
                    }
                };

                if message.len() > MAX_MESSAGE_SIZE {
                    warn!(
                        "Message from {} exceeds size limit ({} > {})",
                        peer,
                        message.len(),
                        MAX_MESSAGE_SIZE
                    );
                    let error_msg = ServerMessage::Error { message: "Message too large".to_string() };
                    let _ = tx.send(encode(&error_msg)).await;
                    break;
                }

                match message {
                    Message::Text(text) => {
                        let client_message = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(m) => m,
                            Err(e) => {
                                error!("Failed to parse message from {}: {}", peer, e);
                                let error_msg = ServerMessage::Error {
                                    message: format!("Failed to parse message: {}", e),
                                };
                                if tx.send(encode(&error_msg)).await.is_err() {
                                    break;
                                }
                                continue;
                            }
                        };
                        debug!("Event from {}: {:?}", peer, client_message);

                        if is_advisor_call(&client_message) {
                            if tx.send(encode(&ServerMessage::Processing)).await.is_err() {
                                break;
                            }
                            let agent = Arc::clone(&agent);
                            let reply_tx = reply_tx.clone();
                            tokio::spawn(async move {
                                for reply in dispatch(&agent, client_message).await {
                                    if reply_tx.send(reply).is_err() {
                                        break;
                                    }
                                }
                            });
                            continue;
                        }

                        let mut failed = false;
                        for reply in dispatch(&agent, client_message).await {
                            if let Err(e) = tx.send(encode(&reply)).await {
                                error!("Error sending reply to {}: {}", peer, e);
                                failed = true;
                                break;
                            }
                        }
                        if failed {
                            break;
                        }
                    }
                    Message::Close(_) => {
                        info!("Received close frame from {}", peer);
                        break;
                    }
                    Message::Ping(ping_data) => {
                        if tx.send(Message::Pong(ping_data)).await.is_err() {
                            break;
                        }
                    }
                    Message::Binary(_) => {
                        warn!("Ignoring binary message from {}", peer);
                    }
                    Message::Pong(_) | Message::Frame(_) => {}
                }
            }
        }
    }
    info!("WebSocket connection closed for {} (ID {})", peer, connection_id);
}
