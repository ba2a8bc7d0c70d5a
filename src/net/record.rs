//! Connection record assembly.

use std::net::{SocketAddr, TcpStream};

use crate::framing::Document;
use crate::net::connection::{ConnectionId, PendingConnection};
use crate::net::IntakeError;

/// Element extracted from the framed document.
pub const EVENT_ELEMENT: &str = "event";

/// A framed connection handed to the downstream consumer.
#[derive(Debug)]
pub struct ConnectionRecord {
    /// Identifier shared with the acceptor's log lines.
    pub id: ConnectionId,
    /// Peer IP address as text.
    pub peer_ip: String,
    /// Full peer socket address.
    pub peer: SocketAddr,
    /// The client socket, non-blocking.
    pub stream: TcpStream,
    /// The first `event` element, serialized. Never empty.
    pub payload: String,
}

impl ConnectionRecord {
    pub(crate) fn new(id: ConnectionId, peer: SocketAddr, stream: TcpStream, payload: String) -> Self {
        Self {
            id,
            peer_ip: peer.ip().to_string(),
            peer,
            stream,
            payload,
        }
    }
}

/// Serialize the first `event` child of the document root.
pub fn event_payload(document: &Document) -> Result<String, IntakeError> {
    let event = document
        .first_child(EVENT_ELEMENT)
        .ok_or(IntakeError::MissingEventElement)?;
    event.to_xml().map_err(IntakeError::Serialize)
}

/// Turn a framed connection into a record.
///
/// The socket goes non-blocking first. Any failure drops `pending`, which
/// closes the socket.
pub fn build(mut pending: PendingConnection, document: &Document) -> Result<ConnectionRecord, IntakeError> {
    pending.set_nonblocking()?;
    let payload = event_payload(document)?;
    if payload.is_empty() {
        return Err(IntakeError::EmptyPayload);
    }
    pending.hand_off(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_of_first_event() {
        let document =
            Document::parse(r#"<multiEvent><event uid="1"><detail/></event><event uid="2"/></multiEvent>"#)
                .unwrap();
        assert_eq!(event_payload(&document).unwrap(), r#"<event uid="1"><detail/></event>"#);
    }

    #[test]
    fn missing_event_element() {
        let document = Document::parse("<multiEvent><ping/></multiEvent>").unwrap();
        assert!(matches!(
            event_payload(&document),
            Err(IntakeError::MissingEventElement)
        ));
    }

    #[test]
    fn record_carries_peer_ip() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let _client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, peer) = listener.accept().unwrap();
        let document = Document::parse("<multiEvent><event>X</event></multiEvent>").unwrap();

        let record = build(PendingConnection::new(server, peer), &document).unwrap();
        assert_eq!(record.peer_ip, "127.0.0.1");
        assert_eq!(record.peer, peer);
        assert_eq!(record.payload, "<event>X</event>");
    }
}
