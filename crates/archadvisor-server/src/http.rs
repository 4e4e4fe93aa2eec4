//! Ingress HTTP and WebSocket handlers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};

use archadvisor_core::Listener;
use archadvisor_types::{new_session_id, EventPayload, EventRecord, SessionState, SessionStatus};

use crate::templates;
use crate::wire::{
    status_response, CreateSessionRequest, CreateSessionResponse, SessionOutputMetadata,
    SessionOutputResponse, REQUIREMENTS_MAX_CHARS, REQUIREMENTS_MIN_CHARS,
};
use crate::AppState;

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, error: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(json!({"error": error, "message": message.into()})),
    )
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/sessions", post(create_session).get(list_sessions))
        .route("/sessions/{id}", get(session_status))
        .route("/sessions/{id}/output", get(session_output))
        .route("/sessions/{id}/cancel", post(cancel_session))
        .route("/templates", get(list_templates))
        .route("/health", get(health));

    Router::new()
        .route("/", get(root))
        .nest("/api/v1", api)
        .route("/ws/sessions/{id}", get(session_ws))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server_listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                futures::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": "ArchAdvisor",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Multi-agent architecture design system",
        "health": "/api/v1/health",
    }))
}

/// Client fingerprint for rate limiting and session listing. The service
/// sits behind an edge proxy that sets the forwarding headers.
fn client_fingerprint(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn create_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    let requirement_chars = input.requirements.chars().count();
    if !(REQUIREMENTS_MIN_CHARS..=REQUIREMENTS_MAX_CHARS).contains(&requirement_chars) {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "validation_error",
            format!(
                "requirements must be between {REQUIREMENTS_MIN_CHARS} and {REQUIREMENTS_MAX_CHARS} characters"
            ),
        ));
    }

    let fingerprint = client_fingerprint(&headers);
    if !state.limiter.allow(&fingerprint) {
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "rate_limit_exceeded",
                "message": format!(
                    "Maximum {} sessions per window. Try again later.",
                    state.limiter.max_requests()
                ),
                "remaining": state.limiter.remaining(&fingerprint),
                "retry_after_seconds": state.limiter.reset_time(&fingerprint),
            })),
        ));
    }

    let session_id = new_session_id();
    let mut session = SessionState::new(&session_id, input.requirements, input.preferences);
    session.client_fingerprint = Some(fingerprint.clone());

    state.store.create(&session).await.map_err(internal_error)?;
    let cancel = state.cancellations.register(&session_id).await;

    let workflow = state.workflow.clone();
    let cancellations = state.cancellations.clone();
    let spawn_id = session_id.clone();
    tokio::spawn(async move {
        workflow.run(session, cancel).await;
        cancellations.remove(&spawn_id).await;
    });

    tracing::info!(
        session_id = %session_id,
        requirements_length = requirement_chars,
        fingerprint = %fingerprint,
        "session_accepted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateSessionResponse {
            session_id: session_id.clone(),
            status: "designing",
            created_at: Utc::now(),
            websocket_url: format!("/ws/sessions/{session_id}"),
            estimated_duration_seconds: 120,
            estimated_cost_usd: 0.18,
        }),
    ))
}

async fn session_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let session = load_session(&state, &id).await?;
    Ok(Json(
        serde_json::to_value(status_response(&id, &session)).map_err(internal_error)?,
    ))
}

async fn session_output(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionOutputResponse>, ApiError> {
    let session = load_session(&state, &id).await?;
    if session.status != SessionStatus::Complete {
        return Err(api_error(
            StatusCode::CONFLICT,
            "session_not_complete",
            format!(
                "Session is not complete. Current status: {}",
                session.status.as_str()
            ),
        ));
    }

    let mut models_used: Vec<String> = session.messages.iter().map(|m| m.model.clone()).collect();
    models_used.sort();
    models_used.dedup();

    let duration = session
        .completed_at
        .map(|done| (done - session.started_at).num_milliseconds() as f64 / 1000.0)
        .unwrap_or(0.0);

    Ok(Json(SessionOutputResponse {
        session_id: id,
        format: "markdown",
        document: session
            .rendered_markdown
            .unwrap_or_else(|| "# No document generated".to_string()),
        diagrams: session.diagrams,
        metadata: SessionOutputMetadata {
            total_duration_seconds: (duration * 100.0).round() / 100.0,
            total_cost_usd: (session.total_cost_usd * 10_000.0).round() / 10_000.0,
            debate_rounds: session.debate_round,
            models_used,
        },
    }))
}

async fn cancel_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let session = load_session(&state, &id).await?;
    if session.status.is_terminal() {
        return Err(api_error(
            StatusCode::CONFLICT,
            "session_terminal",
            format!("Session is already {}", session.status.as_str()),
        ));
    }

    state
        .store
        .update(&id, |session| {
            session.status = SessionStatus::Cancelled;
            session.completed_at = Some(Utc::now());
        })
        .await
        .map_err(internal_error)?;

    state
        .bus
        .publish(
            &id,
            EventRecord::new(EventPayload::SessionCancelled {
                message: "Session was cancelled by user".to_string(),
            }),
        )
        .await;
    state.cancellations.cancel(&id).await;

    tracing::info!(session_id = %id, "session_cancelled");
    Ok(Json(json!({"session_id": id, "status": "cancelled"})))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<usize>,
}

async fn list_sessions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let fingerprint = client_fingerprint(&headers);

    // Over-fetch the recency list; entries for other callers are filtered out.
    let ids = state
        .store
        .list_recent(limit * 5)
        .await
        .map_err(internal_error)?;

    let mut sessions = Vec::new();
    for id in ids {
        let Some(session) = state.store.get(&id).await.map_err(internal_error)? else {
            continue;
        };
        if session.client_fingerprint.as_deref() != Some(fingerprint.as_str()) {
            continue;
        }
        sessions.push(serde_json::to_value(status_response(&id, &session)).map_err(internal_error)?);
        if sessions.len() >= limit {
            break;
        }
    }

    Ok(Json(Value::Array(sessions)))
}

async fn list_templates() -> Json<Vec<crate::wire::TemplateResponse>> {
    Json(templates::all())
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let started = std::time::Instant::now();
    let backing_store = match state.store.ping().await {
        Ok(()) => json!({
            "status": "healthy",
            "latency_ms": (started.elapsed().as_secs_f64() * 100_000.0).round() / 100.0,
        }),
        Err(err) => json!({"status": "unhealthy", "message": err.to_string()}),
    };

    let healthy = backing_store["status"] == "healthy";
    Json(json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": (state.started_at.elapsed().as_secs_f64() * 100.0).round() / 100.0,
        "dependencies": {"backing_store": backing_store},
    }))
}

async fn load_session(state: &AppState, id: &str) -> Result<SessionState, ApiError> {
    state
        .store
        .get(id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| {
            api_error(
                StatusCode::NOT_FOUND,
                "session_not_found",
                format!("Session {id} not found"),
            )
        })
}

fn internal_error(err: impl std::fmt::Display) -> ApiError {
    tracing::error!(error = %err, "unhandled_error");
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_server_error",
        "An unexpected error occurred. Please try again.",
    )
}

// --- WebSocket ---

async fn session_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| session_ws_stream(socket, state, id))
}

/// Stream events for one session. On connect the replay buffer goes out as a
/// single `event_history` frame, then live events follow. Client commands
/// (`cancel`, `force_proceed`, `ping`) are acknowledged inline.
async fn session_ws_stream(mut socket: WebSocket, state: AppState, session_id: String) {
    tracing::info!(session_id = %session_id, "ws_connected");

    // Forward bus events through a channel owned by this connection. A send
    // failure means the connection is gone and unsubscribes the listener.
    let (tx, mut rx) = mpsc::unbounded_channel::<EventRecord>();
    let listener: Listener = Arc::new(move |event| {
        let tx = tx.clone();
        Box::pin(async move {
            tx.send(event)
                .map_err(|_| anyhow::anyhow!("websocket connection closed"))
        })
    });
    let (listener_id, history) = state.bus.subscribe_with_history(&session_id, listener).await;

    if !history.is_empty() {
        let frame = json!({
            "type": "event_history",
            "events": history,
            "count": history.len(),
            "timestamp": Utc::now(),
        });
        if socket.send(WsMessage::Text(frame.to_string().into())).await.is_err() {
            state.bus.unsubscribe(&session_id, listener_id).await;
            return;
        }
    }

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                let Ok(text) = serde_json::to_string(&event) else { continue };
                if socket.send(WsMessage::Text(text.into())).await.is_err() {
                    break;
                }
            }
            message = socket.recv() => {
                match message {
                    Some(Ok(WsMessage::Text(text))) => {
                        if handle_client_command(&mut socket, &session_id, &text).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    state.bus.unsubscribe(&session_id, listener_id).await;
    tracing::info!(session_id = %session_id, "ws_disconnected");
}

async fn handle_client_command(
    socket: &mut WebSocket,
    session_id: &str,
    text: &str,
) -> anyhow::Result<()> {
    let reply = match serde_json::from_str::<Value>(text) {
        Ok(command) => match command.get("type").and_then(Value::as_str) {
            Some("cancel") => {
                tracing::info!(session_id, "ws_cancel_requested");
                Some(json!({"type": "info", "message": "Cancellation requested"}))
            }
            Some("force_proceed") => {
                tracing::info!(session_id, "ws_force_proceed");
                Some(json!({"type": "info", "message": "Force proceed requested"}))
            }
            Some("ping") => Some(json!({"type": "pong"})),
            _ => None,
        },
        Err(_) => Some(json!({"type": "error", "message": "Invalid JSON"})),
    };

    if let Some(reply) = reply {
        socket.send(WsMessage::Text(reply.to_string().into())).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use archadvisor_types::Preferences;

    async fn test_state() -> AppState {
        AppState::for_tests()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::empty())
            .expect("request")
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        serde_json::from_slice(&body).expect("json")
    }

    fn long_requirements() -> String {
        "Design an order tracking service for a regional logistics startup fleet.".to_string()
    }

    #[tokio::test]
    async fn root_reports_service_info() {
        let app = app_router(test_state().await);
        let response = app.oneshot(get("/")).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert_eq!(payload["name"], "ArchAdvisor");
    }

    #[tokio::test]
    async fn templates_endpoint_serves_four() {
        let app = app_router(test_state().await);
        let response = app.oneshot(get("/api/v1/templates")).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert_eq!(payload.as_array().map(Vec::len), Some(4));
    }

    #[tokio::test]
    async fn short_requirements_are_rejected_with_422() {
        let app = app_router(test_state().await);
        let response = app
            .oneshot(post_json("/api/v1/sessions", json!({"requirements": "too short"})))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let payload = body_json(response).await;
        assert_eq!(payload["error"], "validation_error");
    }

    #[tokio::test]
    async fn create_session_returns_202_with_ws_path() {
        let app = app_router(test_state().await);
        let response = app
            .oneshot(post_json(
                "/api/v1/sessions",
                json!({"requirements": long_requirements()}),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let payload = body_json(response).await;
        let session_id = payload["session_id"].as_str().expect("session id");
        assert!(session_id.starts_with("arch_"));
        assert_eq!(
            payload["websocket_url"],
            format!("/ws/sessions/{session_id}")
        );
    }

    #[tokio::test]
    async fn created_session_is_queryable() {
        let state = test_state().await;
        let app = app_router(state.clone());
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v1/sessions",
                json!({"requirements": long_requirements()}),
            ))
            .await
            .expect("response");
        let session_id = body_json(response).await["session_id"]
            .as_str()
            .expect("session id")
            .to_string();

        let response = app
            .oneshot(get(&format!("/api/v1/sessions/{session_id}")))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert_eq!(payload["session_id"], session_id.as_str());
        assert_eq!(payload["progress"]["total_steps"], 5);
    }

    #[tokio::test]
    async fn unknown_session_is_404() {
        let app = app_router(test_state().await);
        let response = app
            .oneshot(get("/api/v1/sessions/arch_missing"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn output_before_completion_is_409() {
        let state = test_state().await;
        let session = SessionState::new("arch_pending", long_requirements(), Preferences::default());
        state.store.create(&session).await.expect("create");

        let app = app_router(state);
        let response = app
            .oneshot(get("/api/v1/sessions/arch_pending/output"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn completed_session_serves_the_document() {
        let state = test_state().await;
        let mut session =
            SessionState::new("arch_done", long_requirements(), Preferences::default());
        session.status = SessionStatus::Complete;
        session.rendered_markdown = Some("# Final Document".to_string());
        session.completed_at = Some(Utc::now());
        state.store.create(&session).await.expect("create");

        let app = app_router(state);
        let response = app
            .oneshot(get("/api/v1/sessions/arch_done/output"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert_eq!(payload["format"], "markdown");
        assert_eq!(payload["document"], "# Final Document");
    }

    #[tokio::test]
    async fn cancel_moves_session_to_cancelled_and_conflicts_after() {
        let state = test_state().await;
        let session =
            SessionState::new("arch_run", long_requirements(), Preferences::default());
        state.store.create(&session).await.expect("create");

        let app = app_router(state.clone());
        let response = app
            .clone()
            .oneshot(post_json("/api/v1/sessions/arch_run/cancel", json!({})))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let stored = state.store.get("arch_run").await.expect("get").expect("state");
        assert_eq!(stored.status, SessionStatus::Cancelled);
        assert!(stored.completed_at.is_some());

        let history = state.bus.history("arch_run").await;
        assert!(history
            .iter()
            .any(|e| e.event_type() == "session_cancelled"));

        let response = app
            .oneshot(post_json("/api/v1/sessions/arch_run/cancel", json!({})))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn rate_limit_returns_429_with_retry_hints() {
        let state = AppState::for_tests_with_limit(1);
        let app = app_router(state);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v1/sessions",
                json!({"requirements": long_requirements()}),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let response = app
            .oneshot(post_json(
                "/api/v1/sessions",
                json!({"requirements": long_requirements()}),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let payload = body_json(response).await;
        assert_eq!(payload["remaining"], 0);
        assert!(payload["retry_after_seconds"].is_number());
    }

    #[tokio::test]
    async fn rate_limit_keys_on_fingerprint() {
        let state = AppState::for_tests_with_limit(1);
        let app = app_router(state);

        let first = post_json(
            "/api/v1/sessions",
            json!({"requirements": long_requirements()}),
        );
        assert_eq!(
            app.clone().oneshot(first).await.expect("response").status(),
            StatusCode::ACCEPTED
        );

        let other_client = Request::builder()
            .method("POST")
            .uri("/api/v1/sessions")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "198.51.100.9")
            .body(Body::from(
                json!({"requirements": long_requirements()}).to_string(),
            ))
            .expect("request");
        assert_eq!(
            app.oneshot(other_client).await.expect("response").status(),
            StatusCode::ACCEPTED
        );
    }

    #[tokio::test]
    async fn session_listing_filters_by_fingerprint() {
        let state = test_state().await;
        let mut mine = SessionState::new("arch_mine", long_requirements(), Preferences::default());
        mine.client_fingerprint = Some("203.0.113.7".to_string());
        state.store.create(&mine).await.expect("create");
        let mut theirs =
            SessionState::new("arch_theirs", long_requirements(), Preferences::default());
        theirs.client_fingerprint = Some("198.51.100.9".to_string());
        state.store.create(&theirs).await.expect("create");

        let app = app_router(state);
        let response = app.oneshot(get("/api/v1/sessions")).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        let ids: Vec<&str> = payload
            .as_array()
            .expect("array")
            .iter()
            .filter_map(|s| s["session_id"].as_str())
            .collect();
        assert_eq!(ids, vec!["arch_mine"]);
    }

    #[tokio::test]
    async fn health_reports_backing_store() {
        let app = app_router(test_state().await);
        let response = app.oneshot(get("/api/v1/health")).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert_eq!(payload["status"], "healthy");
        assert_eq!(payload["dependencies"]["backing_store"]["status"], "healthy");
    }

    #[test]
    fn fingerprint_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(client_fingerprint(&headers), "203.0.113.7");

        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "198.51.100.9".parse().unwrap());
        assert_eq!(client_fingerprint(&headers), "198.51.100.9");

        assert_eq!(client_fingerprint(&HeaderMap::new()), "unknown");
    }
}
