//! Outer accept loop around the acceptor.
//!
//! # Responsibilities
//! - Bind every configured listener
//! - Run one blocking accept thread per listener
//! - Forward accepted connections to the async consumer over a bounded channel
//! - Back off on repeated accept errors
//!
//! # Design Decisions
//! - Accept threads are plain OS threads: the acceptor blocks on sockets and
//!   must not occupy runtime workers
//! - Threads notice shutdown between accepts; a thread blocked in `accept`
//!   exits after its next connection or with the process

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::{IntakeConfig, ServiceConfig};
use crate::lifecycle::Shutdown;
use crate::net::{Accepted, Acceptor, ConnectionTracker, IntakeError};
use crate::resilience::backoff::calculate_backoff;
use crate::service::session;

/// A connection accepted on a named listener.
#[derive(Debug)]
pub struct Intake {
    pub listener: String,
    pub accepted: Accepted,
}

/// Starts accept threads and hands back their output.
#[derive(Debug)]
pub struct IntakeService;

impl IntakeService {
    /// Bind all listeners and start accepting.
    ///
    /// Nothing is spawned until every listener has bound, so a bind failure
    /// leaves no thread behind.
    pub fn start(config: &IntakeConfig, shutdown: Shutdown) -> io::Result<IntakeHandle> {
        let bound = config
            .listeners
            .iter()
            .map(|listener_config| {
                let listener = TcpListener::bind(&listener_config.bind_address)?;
                let local_addr = listener.local_addr()?;
                Ok((listener_config.name.clone(), listener, local_addr))
            })
            .collect::<io::Result<Vec<_>>>()?;

        let (tx, rx) = mpsc::channel(config.service.channel_capacity.max(1));
        let received = Arc::new(AtomicU64::new(0));
        let mut local_addrs = Vec::with_capacity(bound.len());

        for (name, listener, local_addr) in bound {
            tracing::info!(
                listener = %name,
                address = %local_addr,
                backlog = config.receive.listen_backlog,
                "Listening for connections"
            );

            let worker = AcceptLoop {
                acceptor: Acceptor::new(&name, &config.receive),
                listener,
                tx: tx.clone(),
                shutdown: shutdown.clone(),
                received: Arc::clone(&received),
                backoff: config.service.clone(),
            };
            thread::Builder::new()
                .name(format!("intake-{name}"))
                .spawn(move || worker.run())?;

            local_addrs.push((name, local_addr));
        }

        Ok(IntakeHandle {
            rx,
            local_addrs,
            received,
            shutdown,
        })
    }

    /// Accept until shutdown, holding every handed-off connection as a session.
    pub async fn run(config: &IntakeConfig, shutdown: Shutdown) -> io::Result<()> {
        let handle = Self::start(config, shutdown)?;
        let grace = Duration::from_secs(config.service.shutdown_grace_secs);
        handle.serve(grace).await;
        Ok(())
    }
}

/// What [`IntakeHandle::serve`] did before it returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServeSummary {
    /// Records handed to a session.
    pub sessions: u64,
    /// Whether every session ended within the grace period.
    pub drained: bool,
}

/// Receiving end of a running service.
#[derive(Debug)]
pub struct IntakeHandle {
    rx: mpsc::Receiver<Intake>,
    local_addrs: Vec<(String, SocketAddr)>,
    received: Arc<AtomicU64>,
    shutdown: Shutdown,
}

impl IntakeHandle {
    /// Bound address of each listener, in configuration order.
    pub fn local_addrs(&self) -> &[(String, SocketAddr)] {
        &self.local_addrs
    }

    /// Next accepted connection; `None` once every accept thread has exited.
    pub async fn next(&mut self) -> Option<Intake> {
        self.rx.recv().await
    }

    /// Successful accept cycles so far, probes included.
    pub fn connections_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Ask accept threads to stop after their current accept.
    pub fn stop(&self) {
        self.shutdown.trigger();
    }

    /// Hold every record as a session until shutdown, then wait up to
    /// `grace` for the sessions to end.
    pub async fn serve(mut self, grace: Duration) -> ServeSummary {
        let mut stop = self.shutdown.subscribe();
        let tracker = ConnectionTracker::new();
        let mut sessions = 0u64;

        // the flag is set before the broadcast, so checking after subscribing
        // cannot miss a trigger
        while !self.shutdown.is_triggered() {
            tokio::select! {
                intake = self.next() => {
                    let Some(intake) = intake else { break };
                    if let Accepted::Record(record) = intake.accepted {
                        let guard = tracker.track(record.id);
                        tokio::spawn(session::hold(record, guard, self.shutdown.subscribe()));
                        sessions += 1;
                    }
                }
                _ = stop.recv() => break,
            }
        }

        self.stop();
        let drained = tracker.wait_for_drain(grace).await;
        if !drained {
            tracing::warn!(
                remaining = tracker.active_count(),
                "Sessions still open after shutdown grace period"
            );
        }
        tracing::info!(
            connections_received = self.connections_received(),
            sessions,
            "Intake stopped"
        );
        ServeSummary { sessions, drained }
    }
}

struct AcceptLoop {
    acceptor: Acceptor,
    listener: TcpListener,
    tx: mpsc::Sender<Intake>,
    shutdown: Shutdown,
    received: Arc<AtomicU64>,
    backoff: ServiceConfig,
}

impl AcceptLoop {
    fn run(self) {
        let mut accept_failures = 0u32;

        while !self.shutdown.is_triggered() {
            match self.acceptor.accept_one(&self.listener) {
                Ok(accepted) => {
                    accept_failures = 0;
                    self.received.fetch_add(1, Ordering::Relaxed);
                    if self.shutdown.is_triggered() {
                        break;
                    }
                    let intake = Intake {
                        listener: self.acceptor.name().to_string(),
                        accepted,
                    };
                    if self.tx.blocking_send(intake).is_err() {
                        tracing::debug!(listener = %self.acceptor.name(), "Consumer gone, stopping");
                        break;
                    }
                }
                Err(IntakeError::Accept(_)) => {
                    accept_failures = accept_failures.saturating_add(1);
                    thread::sleep(calculate_backoff(
                        accept_failures,
                        self.backoff.accept_backoff_base_ms,
                        self.backoff.accept_backoff_max_ms,
                    ));
                }
                // already logged; the connection is closed
                Err(_) => accept_failures = 0,
            }
        }

        tracing::info!(listener = %self.acceptor.name(), "Accept loop stopped");
    }
}
