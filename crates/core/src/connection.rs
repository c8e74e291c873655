use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ConnectionProfile;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait ConnectionBackend {
    type Connection: Send;

    async fn connect(&self, profile: &ConnectionProfile) -> Result<Self::Connection, BackendError>;
    async fn ping(&self, connection: &mut Self::Connection) -> Result<(), BackendError>;
    async fn disconnect(&self, connection: Self::Connection) -> Result<(), BackendError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub target: Option<String>,
    pub is_connected: bool,
    pub last_latency: Option<Duration>,
}

impl ConnectionStatus {
    #[must_use]
    pub fn disconnected() -> Self {
        Self {
            target: None,
            is_connected: false,
            last_latency: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("already connected to {target}")]
    AlreadyConnected { target: String },
    #[error("not connected to a database")]
    NotConnected,
    #[error("{0}")]
    Backend(#[source] BackendError),
}

struct ActiveConnection<C> {
    profile: ConnectionProfile,
    handle: C,
}

/// Owns the backend and the single connection opened at startup.
///
/// A failed [`connect`](Self::connect) leaves the holder without a handle;
/// nothing reconnects on its own.
pub struct ConnectionHolder<B: ConnectionBackend> {
    backend: B,
    active: Option<ActiveConnection<B::Connection>>,
    last_latency: Option<Duration>,
}

impl<B: ConnectionBackend> fmt::Debug for ConnectionHolder<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHolder")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl<B: ConnectionBackend> ConnectionHolder<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            active: None,
            last_latency: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            target: self.active_profile().map(ConnectionProfile::display_url),
            is_connected: self.is_connected(),
            last_latency: self.last_latency,
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }

    #[must_use]
    pub fn active_profile(&self) -> Option<&ConnectionProfile> {
        self.active.as_ref().map(|active| &active.profile)
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend together with the live handle, if there is one.
    pub fn handle_mut(&mut self) -> Result<(&B, &mut B::Connection), ConnectionError> {
        let active = self
            .active
            .as_mut()
            .ok_or(ConnectionError::NotConnected)?;
        Ok((&self.backend, &mut active.handle))
    }

    pub async fn connect(&mut self, profile: ConnectionProfile) -> Result<Duration, ConnectionError> {
        if let Some(active) = &self.active {
            return Err(ConnectionError::AlreadyConnected {
                target: active.profile.display_url(),
            });
        }

        let url = profile.display_url();
        tracing::info!(%url, "connecting");

        let started_at = Instant::now();
        let mut handle = self
            .backend
            .connect(&profile)
            .await
            .map_err(|error| {
                tracing::warn!(%url, %error, "connection failed");
                ConnectionError::Backend(error)
            })?;
        if let Err(error) = self.backend.ping(&mut handle).await {
            tracing::warn!(%url, %error, "connection opened but ping failed");
            if let Err(close_error) = self.backend.disconnect(handle).await {
                tracing::debug!(
                    %url,
                    error = %close_error,
                    "closing unhealthy connection failed"
                );
            }
            return Err(ConnectionError::Backend(error));
        }

        let latency = started_at.elapsed();
        tracing::info!(%url, latency_ms = latency.as_millis(), "connected");
        self.last_latency = Some(latency);
        self.active = Some(ActiveConnection { profile, handle });

        Ok(latency)
    }

    pub async fn disconnect(&mut self) -> Result<(), ConnectionError> {
        let Some(active) = self.active.take() else {
            return Ok(());
        };

        self.last_latency = None;
        self.backend
            .disconnect(active.handle)
            .await
            .map_err(ConnectionError::Backend)?;
        tracing::info!(url = %active.profile.display_url(), "disconnected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::{
        BackendError, ConnectionBackend, ConnectionError, ConnectionHolder, ConnectionStatus,
    };
    use crate::config::ConnectionProfile;

    #[derive(Debug, Default)]
    struct FakeBackend {
        connect_calls: AtomicUsize,
        disconnect_calls: AtomicUsize,
        fail_connect: AtomicUsize,
        fail_ping: AtomicUsize,
        fail_disconnect: AtomicUsize,
    }

    #[derive(Debug)]
    struct FakeConnection;

    #[async_trait::async_trait]
    impl ConnectionBackend for FakeBackend {
        type Connection = FakeConnection;

        async fn connect(
            &self,
            _profile: &ConnectionProfile,
        ) -> Result<Self::Connection, BackendError> {
            self.connect_calls.fetch_add(1, Ordering::Relaxed);
            if self.fail_connect.load(Ordering::Relaxed) > 0 {
                self.fail_connect.fetch_sub(1, Ordering::Relaxed);
                return Err(BackendError::new("Access denied for user 'root'"));
            }

            Ok(FakeConnection)
        }

        async fn ping(&self, _connection: &mut Self::Connection) -> Result<(), BackendError> {
            if self.fail_ping.load(Ordering::Relaxed) > 0 {
                self.fail_ping.fetch_sub(1, Ordering::Relaxed);
                return Err(BackendError::new("ping failed"));
            }
            Ok(())
        }

        async fn disconnect(&self, _connection: Self::Connection) -> Result<(), BackendError> {
            self.disconnect_calls.fetch_add(1, Ordering::Relaxed);
            if self.fail_disconnect.load(Ordering::Relaxed) > 0 {
                self.fail_disconnect.fetch_sub(1, Ordering::Relaxed);
                return Err(BackendError::new("connection reset"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn connect_records_status_and_target() {
        let mut holder = ConnectionHolder::new(FakeBackend::default());

        holder
            .connect(ConnectionProfile::default())
            .await
            .expect("connect should succeed");

        let status = holder.status();
        assert!(status.is_connected);
        assert_eq!(
            status.target.as_deref(),
            Some("mysql://root@localhost:3306/dbms_grp_activity")
        );
        assert!(status.last_latency.is_some());
        assert!(holder.handle_mut().is_ok());
    }

    #[tokio::test]
    async fn failed_connect_leaves_handle_unset() {
        let backend = FakeBackend {
            fail_connect: AtomicUsize::new(1),
            ..FakeBackend::default()
        };
        let mut holder = ConnectionHolder::new(backend);

        let err = holder
            .connect(ConnectionProfile::default())
            .await
            .expect_err("connect should fail");
        assert!(matches!(err, ConnectionError::Backend(_)));
        assert_eq!(err.to_string(), "Access denied for user 'root'");
        assert!(holder.active_profile().is_none());
        assert_eq!(holder.status(), ConnectionStatus::disconnected());
        assert!(matches!(
            holder.handle_mut(),
            Err(ConnectionError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn failed_ping_closes_the_fresh_connection() {
        let backend = FakeBackend {
            fail_ping: AtomicUsize::new(1),
            ..FakeBackend::default()
        };
        let mut holder = ConnectionHolder::new(backend);

        holder
            .connect(ConnectionProfile::default())
            .await
            .expect_err("ping failure should fail connect");
        assert!(!holder.is_connected());
        assert_eq!(holder.backend().disconnect_calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn failed_close_after_failed_ping_reports_the_ping_error() {
        let backend = FakeBackend {
            fail_ping: AtomicUsize::new(1),
            fail_disconnect: AtomicUsize::new(1),
            ..FakeBackend::default()
        };
        let mut holder = ConnectionHolder::new(backend);

        let err = holder
            .connect(ConnectionProfile::default())
            .await
            .expect_err("ping failure should fail connect");
        assert_eq!(err.to_string(), "ping failed");
        assert!(!holder.is_connected());
        assert_eq!(holder.backend().disconnect_calls.load(Ordering::Relaxed), 1);

        holder
            .connect(ConnectionProfile::default())
            .await
            .expect("a later connect should succeed");
        assert_eq!(
            format!("{holder:?}"),
            format!("ConnectionHolder {{ status: {:?}, .. }}", holder.status())
        );
    }

    #[tokio::test]
    async fn second_connect_is_rejected() {
        let mut holder = ConnectionHolder::new(FakeBackend::default());
        holder
            .connect(ConnectionProfile::default())
            .await
            .expect("first connect should succeed");

        let err = holder
            .connect(ConnectionProfile::default())
            .await
            .expect_err("second connect should fail");
        assert!(matches!(err, ConnectionError::AlreadyConnected { .. }));
        assert_eq!(holder.backend().connect_calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn disconnect_is_idempotent_and_clears_status() {
        let mut holder = ConnectionHolder::new(FakeBackend::default());
        holder
            .connect(ConnectionProfile::default())
            .await
            .expect("connect should succeed");
        holder.disconnect().await.expect("disconnect should succeed");
        holder
            .disconnect()
            .await
            .expect("disconnect should stay idempotent");

        assert_eq!(holder.status(), ConnectionStatus::disconnected());
        assert_eq!(holder.backend().disconnect_calls.load(Ordering::Relaxed), 1);
    }
}
