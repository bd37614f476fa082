//! Polling client for remote A2A agents.

use std::time::Duration;

use tracing::debug;
use uuid::Uuid;

use crate::card::AgentCard;
use crate::error::A2aError;
use crate::server::{Task, TaskRequest};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_MAX_POLLS: usize = 30;

/// Client for delegating work to a remote A2A agent.
///
/// ```rust,ignore
/// let client = A2aClient::new("http://localhost:8000");
/// let card = client.discover().await?;
/// let task = client.ask("What is KYC?").await?;
/// ```
#[derive(Debug, Clone)]
pub struct A2aClient {
    http: reqwest::Client,
    base_url: String,
    sender: Option<String>,
    poll_interval: Duration,
    max_polls: usize,
}

impl A2aClient {
    /// Create a client for the agent at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            sender: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    /// Identify this client in submitted tasks.
    #[must_use]
    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Set the polling interval used by [`ask`](Self::ask).
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the poll attempt budget used by [`ask`](Self::ask).
    #[must_use]
    pub const fn max_polls(mut self, max_polls: usize) -> Self {
        self.max_polls = max_polls;
        self
    }

    /// Fetch the remote agent's card.
    ///
    /// # Errors
    ///
    /// Returns [`A2aError::Http`] on network failures and
    /// [`A2aError::Status`] on a non-success response.
    pub async fn discover(&self) -> Result<AgentCard, A2aError> {
        let response = self
            .http
            .get(format!("{}/.well-known/agent.json", self.base_url))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Submit a message; returns the accepted (usually still pending) task.
    ///
    /// # Errors
    ///
    /// Returns [`A2aError::Http`] on network failures and
    /// [`A2aError::Status`] on a non-success response.
    pub async fn submit(&self, message: impl Into<String>) -> Result<Task, A2aError> {
        let request = TaskRequest {
            message: message.into(),
            sender: self.sender.clone(),
            metadata: None,
        };
        let response = self
            .http
            .post(format!("{}/tasks", self.base_url))
            .json(&request)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Fetch a task's current state.
    ///
    /// # Errors
    ///
    /// Returns [`A2aError::Http`] on network failures and
    /// [`A2aError::Status`] on a non-success response.
    pub async fn task(&self, task_id: Uuid) -> Result<Task, A2aError> {
        let response = self
            .http
            .get(format!("{}/tasks/{task_id}", self.base_url))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Submit a message and poll until the task reaches a terminal status.
    ///
    /// A `failed` task is returned like a completed one; its `result`
    /// carries the remote error message.
    ///
    /// # Errors
    ///
    /// Propagates submit/poll failures, and returns
    /// [`A2aError::PollTimeout`] when the poll budget runs out first.
    pub async fn ask(&self, message: impl Into<String>) -> Result<Task, A2aError> {
        let task = self.submit(message).await?;
        let task_id = task.task_id;

        for attempt in 1..=self.max_polls {
            let task = self.task(task_id).await?;
            if task.status.is_terminal() {
                return Ok(task);
            }
            debug!(%task_id, attempt, "task still pending");
            tokio::time::sleep(self.poll_interval).await;
        }

        Err(A2aError::PollTimeout {
            task_id,
            attempts: self.max_polls,
        })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, A2aError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(A2aError::Status {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        })
    }
}
