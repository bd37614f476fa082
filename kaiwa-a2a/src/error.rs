//! Errors for the A2A client and server.

/// Errors from A2A operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum A2aError {
    /// A network-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote agent answered with a non-success status.
    #[error("remote agent returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        body: String,
    },

    /// A task did not reach a terminal status within the poll budget.
    #[error("task {task_id} did not complete within {attempts} polls")]
    PollTimeout {
        /// The task that timed out.
        task_id: uuid::Uuid,
        /// How many polls were made.
        attempts: usize,
    },

    /// Failed to bind or serve the task server.
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}
