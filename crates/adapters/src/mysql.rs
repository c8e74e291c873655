use async_trait::async_trait;
use futures_util::TryStreamExt;
use mysql_async::prelude::Queryable;
use mysql_async::{Column, Conn, OptsBuilder, Row, Value};
use sqlgrid_core::config::ConnectionProfile;
use sqlgrid_core::connection::{BackendError, ConnectionBackend};
use sqlgrid_core::query_executor::{QueryBackend, QueryBackendError};
use sqlgrid_core::result_set::{QueryRow, ResultSet};

/// One plain `mysql_async` connection, no pool.
#[derive(Debug, Clone, Default)]
pub struct MysqlBackend;

#[async_trait]
impl ConnectionBackend for MysqlBackend {
    type Connection = Conn;

    async fn connect(&self, profile: &ConnectionProfile) -> Result<Self::Connection, BackendError> {
        let connection = Conn::new(opts_from_profile(profile))
            .await
            .map_err(to_connection_error)?;
        tracing::debug!(
            connection_id = connection.id(),
            server_version = ?connection.server_version(),
            "mysql session opened"
        );
        Ok(connection)
    }

    async fn ping(&self, connection: &mut Self::Connection) -> Result<(), BackendError> {
        connection.ping().await.map_err(to_connection_error)
    }

    async fn disconnect(&self, connection: Self::Connection) -> Result<(), BackendError> {
        connection.disconnect().await.map_err(to_connection_error)
    }
}

#[async_trait]
impl QueryBackend for MysqlBackend {
    async fn submit(
        &self,
        connection: &mut Self::Connection,
        sql: &str,
    ) -> Result<ResultSet, QueryBackendError> {
        tracing::debug!(%sql, "submitting query");
        let mut result = connection.query_iter(sql).await.map_err(to_query_error)?;
        let columns = result
            .columns()
            .map(|columns| column_names(&columns))
            .unwrap_or_default();

        let rows = match result.stream::<Row>().await.map_err(to_query_error)? {
            Some(stream) => stream
                .map_ok(row_to_query_row)
                .try_collect::<Vec<_>>()
                .await
                .map_err(to_query_error)?,
            None => Vec::new(),
        };

        tracing::debug!(columns = columns.len(), rows = rows.len(), "result set read");

        // Trailing result sets of multi-statement input are discarded.
        if !result.is_empty() {
            tracing::debug!("discarding remaining result sets");
        }
        result.drop_result().await.map_err(to_query_error)?;
        Ok(ResultSet::new(columns, rows))
    }
}

fn opts_from_profile(profile: &ConnectionProfile) -> OptsBuilder {
    let mut builder = OptsBuilder::default()
        .ip_or_hostname(profile.host.clone())
        .tcp_port(profile.port)
        .user(Some(profile.user.clone()))
        .prefer_socket(false);

    if let Some(password) = profile.password.as_ref().filter(|pw| !pw.is_empty()) {
        builder = builder.pass(Some(password.clone()));
    }

    if let Some(database) = profile.database.as_ref().filter(|db| !db.is_empty()) {
        builder = builder.db_name(Some(database.clone()));
    }

    builder
}

fn column_names(columns: &[Column]) -> Vec<String> {
    columns
        .iter()
        .map(|column| column.name_str().into_owned())
        .collect()
}

fn row_to_query_row(row: Row) -> QueryRow {
    let values = row
        .unwrap()
        .into_iter()
        .map(mysql_value_to_string)
        .collect::<Vec<_>>();
    QueryRow::new(values)
}

fn mysql_value_to_string(value: Value) -> String {
    match value {
        Value::NULL => "NULL".to_string(),
        Value::Bytes(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Value::Int(value) => value.to_string(),
        Value::UInt(value) => value.to_string(),
        Value::Float(value) => value.to_string(),
        Value::Double(value) => value.to_string(),
        Value::Date(year, month, day, hour, minute, second, micros) => format!(
            "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}.{micros:06}"
        ),
        Value::Time(is_negative, days, hours, minutes, seconds, micros) => {
            let sign = if is_negative { "-" } else { "" };
            format!("{sign}{days:03} {hours:02}:{minutes:02}:{seconds:02}.{micros:06}")
        }
    }
}

fn to_connection_error(error: mysql_async::Error) -> BackendError {
    BackendError::new(error.to_string())
}

fn to_query_error(error: mysql_async::Error) -> QueryBackendError {
    QueryBackendError::new(error.to_string())
}
