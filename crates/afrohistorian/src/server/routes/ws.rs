//! WebSocket chat endpoints
//!
//! Each socket gets a writer task draining its event channel and a reader task
//! feeding text frames to the handler. Events always go through the connection
//! registry, so they reach whichever socket is currently registered for the user.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::generation::CancellationToken;
use crate::server::connections::Connection;
use crate::server::state::AppState;
use crate::types::{ChatMessage, ServerEvent};

const EMPTY_QUERY: &str = "Query cannot be empty";

/// Which relay a socket speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Chat,
    Stream,
}

/// GET /ws/chat/:user_id - typing indicator, then one full response per query
pub async fn chat(
    ws: WebSocketUpgrade,
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, user_id, state, Mode::Chat))
}

/// GET /ws/chat-stream/:user_id - answers relayed as they are generated
pub async fn chat_stream(
    ws: WebSocketUpgrade,
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, user_id, state, Mode::Stream))
}

async fn serve_socket(socket: WebSocket, user_id: String, state: AppState, mode: Mode) {
    let (mut sink, mut frames) = socket.split();
    let (connection, events) = Connection::channel();
    let connection_id = connection.id();
    state.connections().connect(connection, &user_id);

    let writer = tokio::spawn(async move {
        let mut events = UnboundedReceiverStream::new(events);
        while let Some(event) = events.next().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("Failed to serialize {} event: {}", event.kind(), e);
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let cancel = CancellationToken::new();
    let (queries_tx, mut queries) = mpsc::unbounded_channel::<String>();
    let reader = {
        let cancel = cancel.clone();
        let user_id = user_id.clone();
        tokio::spawn(async move {
            while let Some(frame) = frames.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if queries_tx.send(text).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!("WebSocket error for user {}: {}", user_id, e);
                        break;
                    }
                }
            }
            cancel.cancel();
        })
    };

    while let Some(frame) = queries.recv().await {
        match mode {
            Mode::Chat => handle_chat(&state, &user_id, &frame).await,
            Mode::Stream => handle_chat_stream(&state, &user_id, &frame, &cancel).await,
        }
        if cancel.is_cancelled() {
            break;
        }
    }

    state.connections().disconnect(connection_id, &user_id);
    reader.abort();
    writer.abort();
}

/// Parse a frame, reporting malformed JSON and empty queries to the user
fn parse_query(state: &AppState, user_id: &str, frame: &str) -> Option<(String, String)> {
    let message: ChatMessage = match serde_json::from_str(frame) {
        Ok(message) => message,
        Err(e) => {
            state.connections().send_personal_message(
                ServerEvent::error(format!("Invalid message format: {}", e), None),
                user_id,
            );
            return None;
        }
    };

    if message.is_blank() {
        state
            .connections()
            .send_personal_message(ServerEvent::error(EMPTY_QUERY, None), user_id);
        return None;
    }

    let conversation_id = message.conversation_id_or_new();
    Some((message.query, conversation_id))
}

/// typing -> response
pub(crate) async fn handle_chat(state: &AppState, user_id: &str, frame: &str) {
    let Some((query, conversation_id)) = parse_query(state, user_id, frame) else {
        return;
    };
    let connections = state.connections();

    connections.send_personal_message(
        ServerEvent::typing(state.engine().assistant_name(), &conversation_id),
        user_id,
    );

    let answer = state.engine().answer(&query).await;
    connections.send_personal_message(
        ServerEvent::Response {
            message: answer.message,
            response: answer.response,
            conversation_id,
            timestamp: Utc::now(),
            sources: Vec::new(),
        },
        user_id,
    );
}

/// stream_start -> stream_chunk* -> stream_end | error
pub(crate) async fn handle_chat_stream(
    state: &AppState,
    user_id: &str,
    frame: &str,
    cancel: &CancellationToken,
) {
    let Some((query, conversation_id)) = parse_query(state, user_id, frame) else {
        return;
    };
    let connections = state.connections();
    let delay = Duration::from_millis(state.config().streaming.chunk_delay_ms);

    connections.send_personal_message(
        ServerEvent::StreamStart {
            conversation_id: conversation_id.clone(),
        },
        user_id,
    );

    let mut chunks = state.engine().answer_stream(&query, cancel.clone());
    while let Some(item) = chunks.next().await {
        match item {
            Ok(text) => {
                connections
                    .send_personal_message(ServerEvent::stream_chunk(text, &conversation_id), user_id);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            Err(e) => {
                tracing::error!("Streaming answer failed: {}", e);
                connections.send_personal_message(
                    ServerEvent::error(format!("Error: {}", e), Some(&conversation_id)),
                    user_id,
                );
                return;
            }
        }
    }

    if cancel.is_cancelled() {
        tracing::info!("Client {} went away, stream for {} aborted", user_id, conversation_id);
        return;
    }

    connections.send_personal_message(ServerEvent::stream_end(&conversation_id), user_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RagConfig;
    use crate::generation::AnswerEngine;
    use crate::providers::{Providers, VectorStoreProvider};
    use crate::testing::{FakeEmbedder, FakeLlm, FakeStore, LlmScript};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn state_with(store: Arc<dyn VectorStoreProvider>, llm: Arc<FakeLlm>) -> AppState {
        let mut config = RagConfig::default();
        config.streaming.chunk_delay_ms = 0;
        let engine = AnswerEngine::new(
            Providers {
                embedder: Arc::new(FakeEmbedder::constant()),
                vector_store: store,
                llm,
            },
            &config,
        );
        AppState::with_engine(config, engine)
    }

    fn passages() -> Arc<FakeStore> {
        Arc::new(FakeStore::with_passages(&[("Kush ruled Egypt.", 0.8)]))
    }

    fn register(state: &AppState, user_id: &str) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (connection, rx) = Connection::channel();
        state.connections().connect(connection, user_id);
        rx
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn kinds(events: &[ServerEvent]) -> Vec<&'static str> {
        events.iter().map(ServerEvent::kind).collect()
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected_without_upstream_calls() {
        let llm = Arc::new(FakeLlm::chunks(&["unused"]));
        let store = passages();
        let state = state_with(store.clone(), llm.clone());
        let mut rx = register(&state, "u1");

        handle_chat(&state, "u1", r#"{"query": "   "}"#).await;

        let events = drain(&mut rx);
        assert_eq!(events, vec![ServerEvent::error(EMPTY_QUERY, None)]);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_chat_sends_typing_then_response() {
        let state = state_with(passages(), Arc::new(FakeLlm::chunks(&["Kush ", "was in Nubia."])));
        let mut rx = register(&state, "u1");

        handle_chat(&state, "u1", r#"{"query": "Where was Kush?", "conversation_id": "c-7"}"#).await;

        let events = drain(&mut rx);
        assert_eq!(kinds(&events), vec!["typing", "response"]);
        assert_eq!(events[0], ServerEvent::typing("Afrohistorian", "c-7"));
        match &events[1] {
            ServerEvent::Response {
                message,
                response,
                conversation_id,
                sources,
                ..
            } => {
                assert_eq!(message, "Success");
                assert_eq!(response.as_deref(), Some("Kush was in Nubia."));
                assert_eq!(conversation_id, "c-7");
                assert!(sources.is_empty());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_chat_failure_is_reported_in_response() {
        let state = state_with(Arc::new(FakeStore::unreachable()), Arc::new(FakeLlm::chunks(&["x"])));
        let mut rx = register(&state, "u1");

        handle_chat(&state, "u1", r#"{"query": "Who was Sundiata?"}"#).await;

        let events = drain(&mut rx);
        match &events[1] {
            ServerEvent::Response { response, message, .. } => {
                assert!(response.is_none());
                assert!(message.contains("connection refused"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_frame_reports_error() {
        let state = state_with(passages(), Arc::new(FakeLlm::chunks(&["x"])));
        let mut rx = register(&state, "u1");

        handle_chat(&state, "u1", "not json").await;

        let events = drain(&mut rx);
        assert_eq!(kinds(&events), vec!["error"]);
    }

    #[tokio::test]
    async fn test_stream_relays_chunks_in_order() {
        let state = state_with(passages(), Arc::new(FakeLlm::chunks(&["A", "B", "C"])));
        let mut rx = register(&state, "u1");

        handle_chat_stream(
            &state,
            "u1",
            r#"{"query": "Tell me about Kush", "conversation_id": "c-1"}"#,
            &CancellationToken::new(),
        )
        .await;

        let events = drain(&mut rx);
        assert_eq!(
            kinds(&events),
            vec!["stream_start", "stream_chunk", "stream_chunk", "stream_chunk", "stream_end"]
        );
        assert_eq!(events[1], ServerEvent::stream_chunk("A", "c-1"));
        assert_eq!(events[2], ServerEvent::stream_chunk("B", "c-1"));
        assert_eq!(events[3], ServerEvent::stream_chunk("C", "c-1"));
    }

    #[tokio::test]
    async fn test_stream_fault_ends_with_error() {
        let llm = Arc::new(FakeLlm::new(LlmScript::FailAfter(vec!["Aks".to_string()])));
        let state = state_with(passages(), llm);
        let mut rx = register(&state, "u1");

        handle_chat_stream(&state, "u1", r#"{"query": "Aksum?"}"#, &CancellationToken::new()).await;

        let events = drain(&mut rx);
        assert_eq!(kinds(&events), vec!["stream_start", "stream_chunk", "error"]);
    }

    #[tokio::test]
    async fn test_stream_empty_query_is_rejected() {
        let llm = Arc::new(FakeLlm::chunks(&["unused"]));
        let state = state_with(passages(), llm.clone());
        let mut rx = register(&state, "u1");

        handle_chat_stream(&state, "u1", r#"{"query": ""}"#, &CancellationToken::new()).await;

        assert_eq!(kinds(&drain(&mut rx)), vec!["error"]);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelled_stream_sends_no_end() {
        let llm = Arc::new(FakeLlm::new(LlmScript::HangAfter(vec!["Meroe".to_string()])));
        let state = state_with(passages(), llm.clone());
        let mut rx = register(&state, "u1");
        let cancel = CancellationToken::new();

        let relay = {
            let state = state.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                handle_chat_stream(&state, "u1", r#"{"query": "Meroe?"}"#, &cancel).await
            })
        };

        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind(), "stream_start");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.kind(), "stream_chunk");

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), relay)
            .await
            .unwrap()
            .unwrap();

        assert!(drain(&mut rx).is_empty());
        assert_eq!(llm.dropped.load(Ordering::SeqCst), 1);
    }

    mod socket {
        use super::*;
        use crate::server::build_router;
        use crate::server::connections::ConnectionsSnapshot;
        use tokio_tungstenite::{connect_async, tungstenite::Message as ClientMessage};

        async fn serve(state: AppState) -> std::net::SocketAddr {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let router = build_router(state);
            tokio::spawn(async move {
                axum::serve(listener, router).await.unwrap();
            });
            addr
        }

        async fn admin_view(addr: std::net::SocketAddr) -> serde_json::Value {
            reqwest::get(format!("http://{}/admin/connections", addr))
                .await
                .unwrap()
                .json()
                .await
                .unwrap()
        }

        async fn wait_for_snapshot(state: &AppState, expected: ConnectionsSnapshot) {
            tokio::time::timeout(Duration::from_secs(2), async {
                while state.connections().snapshot() != expected {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            })
            .await
            .unwrap();
        }

        async fn next_event(
            ws: &mut (impl futures::Stream<Item = tokio_tungstenite::tungstenite::Result<ClientMessage>>
                      + Unpin),
        ) -> serde_json::Value {
            loop {
                let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
                    .await
                    .unwrap()
                    .unwrap()
                    .unwrap();
                if let ClientMessage::Text(text) = frame {
                    return serde_json::from_str(&text).unwrap();
                }
            }
        }

        #[tokio::test]
        async fn test_socket_registers_streams_and_deregisters_on_close() {
            let state = state_with(passages(), Arc::new(FakeLlm::chunks(&["Great ", "Zimbabwe"])));
            let addr = serve(state.clone()).await;

            let (mut ws, _) = connect_async(format!("ws://{}/ws/chat-stream/amina", addr))
                .await
                .unwrap();
            wait_for_snapshot(
                &state,
                ConnectionsSnapshot {
                    active_connections: 1,
                    user_connections: vec!["amina".to_string()],
                },
            )
            .await;
            let view = admin_view(addr).await;
            assert_eq!(view["active_connections"], 1);
            assert_eq!(view["user_connections"], serde_json::json!(["amina"]));

            ws.send(ClientMessage::Text(
                r#"{"query": "Who built Great Zimbabwe?", "conversation_id": "c-9"}"#.to_string(),
            ))
            .await
            .unwrap();

            let mut kinds = Vec::new();
            loop {
                let event = next_event(&mut ws).await;
                let kind = event["type"].as_str().unwrap().to_string();
                assert_eq!(event["conversation_id"], "c-9");
                let done = kind == "stream_end";
                kinds.push(kind);
                if done {
                    break;
                }
            }
            assert_eq!(kinds, vec!["stream_start", "stream_chunk", "stream_chunk", "stream_end"]);

            ws.close(None).await.unwrap();
            wait_for_snapshot(
                &state,
                ConnectionsSnapshot {
                    active_connections: 0,
                    user_connections: Vec::new(),
                },
            )
            .await;
            let view = admin_view(addr).await;
            assert_eq!(view["active_connections"], 0);
            assert_eq!(view["user_connections"], serde_json::json!([]));
        }

        #[tokio::test]
        async fn test_closing_socket_cancels_inflight_stream() {
            let llm = Arc::new(FakeLlm::new(LlmScript::HangAfter(vec!["Songhai".to_string()])));
            let state = state_with(passages(), llm.clone());
            let addr = serve(state.clone()).await;

            let (mut ws, _) = connect_async(format!("ws://{}/ws/chat-stream/kofi", addr))
                .await
                .unwrap();
            ws.send(ClientMessage::Text(r#"{"query": "Songhai?"}"#.to_string()))
                .await
                .unwrap();

            assert_eq!(next_event(&mut ws).await["type"], "stream_start");
            assert_eq!(next_event(&mut ws).await["type"], "stream_chunk");

            ws.close(None).await.unwrap();
            wait_for_snapshot(
                &state,
                ConnectionsSnapshot {
                    active_connections: 0,
                    user_connections: Vec::new(),
                },
            )
            .await;
            assert_eq!(llm.dropped.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn test_chat_socket_answers_with_typing_then_response() {
            let state = state_with(passages(), Arc::new(FakeLlm::chunks(&["Nubia."])));
            let addr = serve(state.clone()).await;

            let (mut ws, _) = connect_async(format!("ws://{}/ws/chat/yaa", addr))
                .await
                .unwrap();
            ws.send(ClientMessage::Text(r#"{"query": "Where was Kush?"}"#.to_string()))
                .await
                .unwrap();

            assert_eq!(next_event(&mut ws).await["type"], "typing");
            let response = next_event(&mut ws).await;
            assert_eq!(response["type"], "response");
            assert_eq!(response["response"], "Nubia.");

            ws.close(None).await.unwrap();
        }
    }
}
