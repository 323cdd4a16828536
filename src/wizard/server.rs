// SPDX-License-Identifier: MIT

//! HTTP surface: wizard invocation, live progress streams, audit log

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use super::engine::WizardEngine;
use super::progress::{AgentEvent, ProgressKind};
use super::state::{Phase, WizardRequest, WorkflowState};
use crate::error::WeaverError;

/// Final and suspended session states, kept for lookup and resumption
type SessionTable = Arc<RwLock<HashMap<Uuid, WorkflowState>>>;

#[derive(Clone)]
struct AppState {
    engine: Arc<WizardEngine>,
    sessions: SessionTable,
}

pub async fn serve(port: u16, engine: Arc<WizardEngine>) -> Result<(), WeaverError> {
    let state = AppState {
        engine,
        sessions: Arc::new(RwLock::new(HashMap::new())),
    };

    let app = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/wizard", post(run_wizard))
        .route("/api/wizard/stream", post(stream_wizard))
        .route("/api/sessions/{id}", get(get_session))
        .route("/api/sessions/{id}/events", get(get_session_events))
        .route("/api/sessions/{id}/stream", get(stream_session))
        .route("/api/sessions/{id}/resume", post(resume_session))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Run a wizard session to termination and return the final state
async fn run_wizard(
    State(app): State<AppState>,
    Json(request): Json<WizardRequest>,
) -> Json<Value> {
    match app.engine.run(request).await {
        Ok(state) => {
            app.sessions
                .write()
                .await
                .insert(state.session_id, state.clone());
            Json(json!(state))
        }
        Err(e) => Json(json!({ "error": e.to_string() })),
    }
}

/// Run a wizard session while streaming its progress events
async fn stream_wizard(
    State(app): State<AppState>,
    Json(request): Json<WizardRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel(100);

    tokio::spawn(async move {
        let prepared = match app.engine.prepare(request) {
            Ok(prepared) => prepared,
            Err(e) => {
                log::warn!("Rejected wizard request: {}", e);
                let _ = tx
                    .send(AgentEvent::new(
                        ProgressKind::WorkflowFailed,
                        Uuid::nil(),
                        Phase::Failed,
                        e.to_string(),
                    ))
                    .await;
                return;
            }
        };

        let session_id = prepared.session_id;
        let mut events = app.engine.broadcaster().subscribe(session_id).await;

        let engine = app.engine.clone();
        let sessions = app.sessions.clone();
        let runner = tokio::spawn(async move {
            let final_state = engine.execute(prepared).await;
            sessions
                .write()
                .await
                .insert(session_id, final_state);
        });

        while let Some(event) = events.next().await {
            if tx.send(event).await.is_err() {
                // Listener disconnected; the session keeps running
                break;
            }
        }

        if let Err(e) = runner.await {
            log::error!("Session {} task panicked: {}", session_id, e);
        }
    });

    sse_response(rx)
}

async fn get_session(State(app): State<AppState>, Path(id): Path<Uuid>) -> Json<Value> {
    match app.sessions.read().await.get(&id) {
        Some(state) => Json(json!(state)),
        None => Json(json!({ "error": "Session not found" })),
    }
}

async fn get_session_events(State(app): State<AppState>, Path(id): Path<Uuid>) -> Json<Value> {
    let events = app.engine.event_store().for_session(id).await;
    Json(json!(events))
}

/// Attach to a running session's progress feed
async fn stream_session(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel(100);

    tokio::spawn(async move {
        let mut events = app.engine.broadcaster().subscribe(id).await;
        while let Some(event) = events.next().await {
            if tx.send(event).await.is_err() {
                break;
            }
        }
    });

    sse_response(rx)
}

#[derive(Deserialize)]
struct ResumeRequest {
    clarification: String,
}

/// Answer a suspended session's pending question and continue it
async fn resume_session(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResumeRequest>,
) -> Json<Value> {
    let suspended = {
        let mut sessions = app.sessions.write().await;
        match sessions.get(&id).map(|s| s.phase) {
            None => return Json(json!({ "error": "Session not found" })),
            Some(Phase::HumanReview) => sessions.remove(&id),
            Some(_) => {
                return Json(json!({ "error": "Session is not suspended for human review" }))
            }
        }
    };
    let Some(suspended) = suspended else {
        return Json(json!({ "error": "Session not found" }));
    };

    match app.engine.resume(suspended, payload.clarification).await {
        Ok(state) => {
            app.sessions.write().await.insert(id, state.clone());
            Json(json!(state))
        }
        Err(e) => Json(json!({ "error": e.to_string() })),
    }
}

fn sse_response(
    rx: mpsc::Receiver<AgentEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream =
        ReceiverStream::new(rx).map(|event| Ok(Event::default().json_data(event).unwrap()));

    Sse::new(stream).keep_alive(KeepAlive::new().interval(std::time::Duration::from_secs(1)))
}
