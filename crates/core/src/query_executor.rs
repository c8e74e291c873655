use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;

use crate::connection::{ConnectionBackend, ConnectionError, ConnectionHolder};
use crate::result_set::ResultSet;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct QueryBackendError {
    message: String,
}

impl QueryBackendError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query text is empty")]
    EmptyQuery,
    #[error("not connected to a database")]
    NotConnected,
    #[error("{0}")]
    Backend(#[source] QueryBackendError),
}

/// Submits SQL over an open connection and reads the whole result back.
#[async_trait]
pub trait QueryBackend: ConnectionBackend {
    async fn submit(
        &self,
        connection: &mut Self::Connection,
        sql: &str,
    ) -> Result<ResultSet, QueryBackendError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub result: ResultSet,
    pub elapsed: Duration,
}

/// Runs `query_text` verbatim. Blank input is rejected before the
/// connection is looked at.
pub async fn execute<B: QueryBackend>(
    holder: &mut ConnectionHolder<B>,
    query_text: &str,
) -> Result<QueryOutcome, QueryError> {
    if query_text.trim().is_empty() {
        return Err(QueryError::EmptyQuery);
    }

    let (backend, connection) = holder.handle_mut().map_err(|error| match error {
        ConnectionError::NotConnected => QueryError::NotConnected,
        other => QueryError::Backend(QueryBackendError::new(other.to_string())),
    })?;

    tracing::debug!(sql = query_text, "submitting query");
    let started_at = Instant::now();
    let result = backend
        .submit(connection, query_text)
        .await
        .map_err(|error| {
            tracing::warn!(%error, "query failed");
            QueryError::Backend(error)
        })?;
    let elapsed = started_at.elapsed();

    tracing::info!(
        columns = result.column_count(),
        rows = result.row_count(),
        elapsed_ms = elapsed.as_millis(),
        "query completed"
    );
    Ok(QueryOutcome { result, elapsed })
}
