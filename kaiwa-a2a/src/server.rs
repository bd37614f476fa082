//! The A2A task server.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use kaiwa::agent::{Agent, RunConfig, Runner};
use kaiwa::provider::CompletionProvider;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::card::AgentCard;
use crate::error::A2aError;

/// Lifecycle of a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Accepted, agent run still in flight.
    Pending,
    /// Finished with a result.
    Completed,
    /// The agent run failed; `result` carries the error message.
    Failed,
}

impl TaskStatus {
    /// Whether this status is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A task submitted by another agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Server-assigned identifier.
    pub task_id: Uuid,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// The agent's answer once completed, or the error message once failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// When the task was accepted.
    pub created_at: DateTime<Utc>,
    /// When the task reached a terminal status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Incoming task submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    /// The message for the agent.
    pub message: String,
    /// Who is asking, for logging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    /// Free-form metadata; carried but not interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

struct Inner {
    card: AgentCard,
    agent: Agent,
    provider: Arc<dyn CompletionProvider>,
    tasks: RwLock<HashMap<Uuid, Task>>,
}

/// Shared server state behind the routes.
#[derive(Clone)]
struct AppState {
    inner: Arc<Inner>,
}

/// Serves one agent over the A2A task API.
///
/// `POST /tasks` accepts a message, runs it through the agent loop in a
/// background task, and returns immediately with a `pending` task;
/// `GET /tasks/{id}` polls it. The agent card is served at
/// `/.well-known/agent.json` for discovery.
pub struct A2aServer {
    state: AppState,
}

impl A2aServer {
    /// Create a server for one agent.
    #[must_use]
    pub fn new(card: AgentCard, agent: Agent, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            state: AppState {
                inner: Arc::new(Inner {
                    card,
                    agent,
                    provider,
                    tasks: RwLock::new(HashMap::new()),
                }),
            },
        }
    }

    /// The axum router for this server.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/.well-known/agent.json", get(agent_card))
            .route("/tasks", post(create_task))
            .route("/tasks/:task_id", get(get_task))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind and serve until the process is stopped.
    ///
    /// # Errors
    ///
    /// Returns [`A2aError::Io`] when binding or serving fails.
    pub async fn serve(self, addr: SocketAddr) -> Result<(), A2aError> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(%addr, agent = %self.state.inner.card.name, "serving A2A task API");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

impl std::fmt::Debug for A2aServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("A2aServer")
            .field("card", &self.state.inner.card.name)
            .finish_non_exhaustive()
    }
}

/// GET /.well-known/agent.json
async fn agent_card(State(state): State<AppState>) -> Json<AgentCard> {
    Json(state.inner.card.clone())
}

/// POST /tasks
async fn create_task(
    State(state): State<AppState>,
    Json(request): Json<TaskRequest>,
) -> (StatusCode, Json<Task>) {
    let task = Task {
        task_id: Uuid::new_v4(),
        status: TaskStatus::Pending,
        result: None,
        created_at: Utc::now(),
        completed_at: None,
    };
    info!(
        task_id = %task.task_id,
        sender = request.sender.as_deref().unwrap_or("unknown"),
        "accepted task"
    );

    state
        .inner
        .tasks
        .write()
        .await
        .insert(task.task_id, task.clone());

    tokio::spawn(process_task(state, task.task_id, request.message));

    (StatusCode::CREATED, Json(task))
}

/// GET /tasks/{task_id}
async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Task>, StatusCode> {
    state
        .inner
        .tasks
        .read()
        .await
        .get(&task_id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Drive the agent run and record the terminal status.
///
/// Runner errors become a `failed` task carrying the error message, never
/// a silently empty result.
async fn process_task(state: AppState, task_id: Uuid, message: String) {
    let inner = &state.inner;
    let outcome = Runner::run(
        inner.provider.as_ref(),
        &inner.agent,
        &message,
        RunConfig::default(),
    )
    .await;

    let (status, result) = match outcome {
        Ok(run) => (TaskStatus::Completed, run.output),
        Err(error) => {
            warn!(%task_id, %error, "task failed");
            (TaskStatus::Failed, format!("Error: {error}"))
        }
    };

    if let Some(task) = inner.tasks.write().await.get_mut(&task_id) {
        task.status = status;
        task.result = Some(result);
        task.completed_at = Some(Utc::now());
    }
}
