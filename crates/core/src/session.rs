use std::fmt;
use std::time::Duration;

use crate::config::ConnectionProfile;
use crate::connection::{ConnectionError, ConnectionHolder, ConnectionStatus};
use crate::grid::GridModel;
use crate::query_executor::{self, QueryBackend, QueryError, QueryOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryExecutionSummary {
    pub rows_fetched: usize,
    pub columns: usize,
    pub elapsed: Duration,
}

/// Application state driven by the UI: the held connection and the grid
/// built from the last successful query.
pub struct Session<B: QueryBackend> {
    connection: ConnectionHolder<B>,
    grid: GridModel,
}

impl<B: QueryBackend> fmt::Debug for Session<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("connection", &self.connection)
            .field("grid", &self.grid)
            .finish()
    }
}

impl<B: QueryBackend> Session<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            connection: ConnectionHolder::new(backend),
            grid: GridModel::new(),
        }
    }

    pub async fn connect(&mut self, profile: ConnectionProfile) -> Result<Duration, ConnectionError> {
        self.connection.connect(profile).await
    }

    /// On success the grid is rebuilt from the new result; on failure it is
    /// left exactly as it was.
    pub async fn execute(&mut self, query_text: &str) -> Result<QueryExecutionSummary, QueryError> {
        let QueryOutcome { result, elapsed } =
            query_executor::execute(&mut self.connection, query_text).await?;

        let summary = QueryExecutionSummary {
            rows_fetched: result.row_count(),
            columns: result.column_count(),
            elapsed,
        };
        self.grid.load(result);
        Ok(summary)
    }

    pub fn set_filter(&mut self, text: &str) {
        self.grid.set_filter(text);
        tracing::trace!(
            shown = self.grid.visible_count(),
            total = self.grid.total_rows(),
            "filter applied"
        );
    }

    #[must_use]
    pub fn grid(&self) -> &GridModel {
        &self.grid
    }

    #[must_use]
    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        self.connection.backend()
    }

    pub async fn disconnect(&mut self) -> Result<(), ConnectionError> {
        self.connection.disconnect().await
    }
}
