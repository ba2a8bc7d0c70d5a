//! Connection ownership and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Own an accepted socket until it is handed off, closing it otherwise
//! - Count handed-off connections for graceful shutdown

use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::net::record::ConnectionRecord;
use crate::net::IntakeError;
use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// An accepted socket owned by the acceptor.
///
/// Dropping it shuts the socket down. The only way to keep the socket open is
/// [`PendingConnection::hand_off`].
#[derive(Debug)]
pub struct PendingConnection {
    id: ConnectionId,
    peer: SocketAddr,
    stream: Option<TcpStream>,
}

impl PendingConnection {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            id: ConnectionId::new(),
            peer,
            stream: Some(stream),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// The owned socket; `NotConnected` once it has been handed off.
    pub fn stream_mut(&mut self) -> io::Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))
    }

    /// Switch the socket to non-blocking for its downstream consumer.
    pub fn set_nonblocking(&mut self) -> Result<(), IntakeError> {
        self.stream_mut()
            .and_then(|stream| stream.set_nonblocking(true))
            .map_err(IntakeError::Handoff)
    }

    /// Transfer the socket into a record; the connection is no longer closed
    /// by this guard.
    pub fn hand_off(mut self, payload: String) -> Result<ConnectionRecord, IntakeError> {
        let stream = self
            .stream
            .take()
            .ok_or_else(|| IntakeError::Handoff(io::ErrorKind::NotConnected.into()))?;
        Ok(ConnectionRecord::new(self.id, self.peer, stream, payload))
    }
}

impl Drop for PendingConnection {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            // NotConnected when the peer already went away
            let _ = stream.shutdown(Shutdown::Both);
            tracing::debug!(connection_id = %self.id, peer = %self.peer, "Connection closed");
        }
    }
}

/// Tracks handed-off connections for graceful shutdown.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    /// Current count of tracked connections.
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new active connection. Returns a guard that decrements on drop.
    pub fn track(&self, id: ConnectionId) -> ConnectionGuard {
        let active = self.active_count.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::record_active_sessions(active);
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id,
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Wait until all tracked connections are closed or `timeout` passes.
    ///
    /// Returns whether the tracker drained.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let drained = async {
            while self.active_count() > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        tokio::time::timeout(timeout, drained).await.is_ok()
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let active = self.active_count.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::record_active_sessions(active);
        tracing::trace!(connection_id = %self.id, "Session released");
    }
}
