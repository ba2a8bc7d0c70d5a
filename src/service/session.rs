//! Stand-in downstream consumer for handed-off connections.

use tokio::io::AsyncReadExt;
use tokio::sync::broadcast;

use crate::net::{ConnectionGuard, ConnectionRecord};

/// Hold a handed-off connection until the peer closes or shutdown fires.
///
/// The record's socket is already non-blocking, which is what
/// `tokio::net::TcpStream::from_std` requires.
pub async fn hold(record: ConnectionRecord, guard: ConnectionGuard, mut shutdown: broadcast::Receiver<()>) {
    let ConnectionRecord { id, peer, stream, .. } = record;
    let mut stream = match tokio::net::TcpStream::from_std(stream) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(connection_id = %id, %peer, error = %e, "Failed to register session socket");
            return;
        }
    };

    let mut buf = vec![0u8; 4096];
    let mut total = 0usize;
    loop {
        tokio::select! {
            read = stream.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => {
                    total += n;
                    tracing::trace!(connection_id = %id, bytes = n, "Session data");
                }
                Err(e) => {
                    tracing::debug!(connection_id = %id, error = %e, "Session read failed");
                    break;
                }
            },
            _ = shutdown.recv() => break,
        }
    }

    tracing::debug!(connection_id = %id, %peer, bytes = total, "Session ended");
    drop(guard);
}
