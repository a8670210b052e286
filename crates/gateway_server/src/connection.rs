//! Per-connection plumbing: the connection handle, the writer task, and
//! the framed read pipeline.
//!
//! Each accepted socket gets a dedicated reader loop (this module's
//! [`serve_connection`]) and a spawned writer task that drains an mpsc
//! queue. All writes for a connection funnel through that queue, so a
//! connection never observes its own writes reordered, and a stalled peer
//! only ever backs up its own queue.

use crate::error::GatewayError;
use crate::gateway::GatewayContext;
use crate::handlers::ConnectionContext;
use gateway_protocol::{frame_len, PacketEnvelope, PacketType, ProtocolError};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Unique identifier for a connection, assigned at accept time. This is
/// the key of the registry's reverse map; it is unrelated to session ids.
pub type ConnectionId = Uuid;

/// Cheaply clonable handle to a live connection's write path.
///
/// Held by the session registry and the relay; dropping handles never
/// closes the connection; [`ConnectionHandle::close`] does.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    inner: Arc<HandleInner>,
}

#[derive(Debug)]
struct HandleInner {
    id: ConnectionId,
    remote_addr: SocketAddr,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    closed: watch::Sender<bool>,
}

impl ConnectionHandle {
    pub(crate) fn new(
        remote_addr: SocketAddr,
        outbound: mpsc::UnboundedSender<Vec<u8>>,
        closed: watch::Sender<bool>,
    ) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id: Uuid::new_v4(),
                remote_addr,
                outbound,
                closed,
            }),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.inner.remote_addr
    }

    /// Whether the connection can still accept writes.
    pub fn is_active(&self) -> bool {
        !*self.inner.closed.borrow() && !self.inner.outbound.is_closed()
    }

    /// Queue a pre-framed message for asynchronous write.
    ///
    /// Frames are flushed in submission order by the connection's writer
    /// task. Failure means the connection is already gone.
    pub fn send_frame(&self, frame: Vec<u8>) -> Result<(), GatewayError> {
        if !self.is_active() {
            return Err(GatewayError::ConnectionClosed);
        }
        self.inner
            .outbound
            .send(frame)
            .map_err(|_| GatewayError::ConnectionClosed)
    }

    /// Signal the connection to tear down. Frames already queued are
    /// flushed; nothing queued afterwards is.
    pub fn close(&self) {
        self.inner.closed.send_replace(true);
    }

    fn closed_receiver(&self) -> watch::Receiver<bool> {
        self.inner.closed.subscribe()
    }
}

/// Writer task: drains the outbound queue into the socket's write half.
///
/// On a close signal the already-queued frames are flushed first: a login
/// failure response must reach the peer before its socket shuts down.
async fn run_writer(
    mut write_half: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    mut closed: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            queued = outbound.recv() => match queued {
                Some(frame) => {
                    if let Err(e) = write_half.write_all(&frame).await {
                        debug!(error = %e, "connection write failed");
                        break;
                    }
                }
                None => break,
            },
            changed = closed.changed() => {
                if changed.is_err() || *closed.borrow() {
                    while let Ok(frame) = outbound.try_recv() {
                        if write_half.write_all(&frame).await.is_err() {
                            break;
                        }
                    }
                    break;
                }
            }
        }
    }
    let _ = write_half.shutdown().await;
}

/// Read one length-prefixed frame body.
///
/// `Ok(None)` is a clean close at a frame boundary. A stream that ends
/// inside a frame, or a declared length above the ceiling, is fatal.
async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_frame_bytes: u32,
) -> Result<Option<Vec<u8>>, GatewayError> {
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(GatewayError::Network(format!("read failed: {e}"))),
    }

    let len = frame_len(header, max_frame_bytes)?;
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            GatewayError::Protocol(ProtocolError::TruncatedFrame(format!(
                "stream ended inside a {len} byte frame"
            )))
        } else {
            GatewayError::Network(format!("read failed: {e}"))
        }
    })?;
    Ok(Some(body))
}

/// Drive one accepted connection from raw socket to teardown.
///
/// Lifecycle: CONNECTED → AUTHENTICATED (first valid login) → ACTIVE
/// (heartbeats refresh liveness) → CLOSED. Whatever path leads to CLOSED
/// (peer disconnect, fatal framing error, idle timeout, forced close,
/// shutdown), the registry entry is released exactly once, here.
pub(crate) async fn serve_connection(
    stream: TcpStream,
    remote_addr: SocketAddr,
    gateway: Arc<GatewayContext>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let (read_half, write_half) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (closed_tx, closed_rx) = watch::channel(false);
    let handle = ConnectionHandle::new(remote_addr, outbound_tx, closed_tx);

    tokio::spawn(run_writer(write_half, outbound_rx, closed_rx));

    let ctx = ConnectionContext::new(handle.clone(), gateway.clone());
    let mut reader = BufReader::new(read_half);
    let mut force_closed = handle.closed_receiver();
    let idle_timeout = gateway.config.idle_timeout;
    let max_frame_bytes = gateway.config.max_frame_bytes;

    debug!(connection_id = %handle.id(), %remote_addr, "connection established");

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                debug!(connection_id = %handle.id(), "closing connection for shutdown");
                break;
            }
            _ = force_closed.changed() => {
                debug!(connection_id = %handle.id(), "connection force-closed");
                break;
            }
            read = timeout(idle_timeout, read_frame(&mut reader, max_frame_bytes)) => {
                match read {
                    Err(_) => {
                        warn!(connection_id = %handle.id(), %remote_addr,
                              timeout_secs = idle_timeout.as_secs(), "idle connection closed");
                        break;
                    }
                    Ok(Ok(None)) => {
                        debug!(connection_id = %handle.id(), "peer closed connection");
                        break;
                    }
                    Ok(Ok(Some(body))) => {
                        process_frame(&body, &ctx, &gateway).await;
                    }
                    Ok(Err(e)) => {
                        warn!(connection_id = %handle.id(), %remote_addr, error = %e,
                              "fatal transport error, closing connection");
                        break;
                    }
                }
            }
        }
    }

    handle.close();
    if let Some(session) = gateway.registry.remove_by_connection(handle.id()) {
        info!(
            session_id = %session.session_id(),
            server_name = %session.server_name(),
            "game server disconnected"
        );
    } else {
        debug!(connection_id = %handle.id(), %remote_addr, "unauthenticated connection closed");
    }
}

/// Decode and dispatch one frame body.
///
/// Decode failures and handler errors are contained here: they drop the
/// single message and leave the connection running.
async fn process_frame(body: &[u8], ctx: &ConnectionContext, gateway: &GatewayContext) {
    let envelope = match PacketEnvelope::decode(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(connection_id = %ctx.connection.id(), error = %e, "dropping undecodable message");
            return;
        }
    };

    if !ctx.is_authenticated() && envelope.packet_type != PacketType::ServerLogin {
        warn!(
            connection_id = %ctx.connection.id(),
            packet_type = %envelope.packet_type,
            "packet before authentication ignored"
        );
        return;
    }

    if let Err(e) = gateway.handlers.dispatch(ctx, envelope).await {
        error!(connection_id = %ctx.connection.id(), error = %e, "packet handler failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_protocol::{encode_frame, DEFAULT_MAX_FRAME_BYTES};
    use std::io::Cursor;

    fn test_handle() -> (ConnectionHandle, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (closed_tx, _closed_rx) = watch::channel(false);
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        (ConnectionHandle::new(addr, outbound_tx, closed_tx), outbound_rx)
    }

    #[tokio::test]
    async fn frames_arrive_in_submission_order() {
        let (handle, mut outbound) = test_handle();
        handle.send_frame(b"first".to_vec()).unwrap();
        handle.send_frame(b"second".to_vec()).unwrap();

        assert_eq!(outbound.recv().await.unwrap(), b"first");
        assert_eq!(outbound.recv().await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn closed_handle_rejects_writes() {
        let (handle, _outbound) = test_handle();
        assert!(handle.is_active());
        handle.close();
        assert!(!handle.is_active());
        assert!(matches!(
            handle.send_frame(b"late".to_vec()),
            Err(GatewayError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn read_frame_round_trip() {
        let frame = encode_frame(b"{\"type\":0}", DEFAULT_MAX_FRAME_BYTES).unwrap();
        let mut cursor = Cursor::new(frame);
        let body = read_frame(&mut cursor, DEFAULT_MAX_FRAME_BYTES)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(body, b"{\"type\":0}");
    }

    #[tokio::test]
    async fn read_frame_clean_eof_is_none() {
        let mut cursor = Cursor::new(Vec::new());
        let result = read_frame(&mut cursor, DEFAULT_MAX_FRAME_BYTES).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn read_frame_truncated_body_is_fatal() {
        let mut frame = encode_frame(b"abcdef", DEFAULT_MAX_FRAME_BYTES).unwrap();
        frame.truncate(7); // header plus half the body
        let mut cursor = Cursor::new(frame);
        let err = read_frame(&mut cursor, DEFAULT_MAX_FRAME_BYTES)
            .await
            .unwrap_err();
        match err {
            GatewayError::Protocol(e) => assert!(e.is_fatal()),
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn read_frame_oversize_declaration_is_fatal() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1024u32.to_be_bytes());
        let mut cursor = Cursor::new(bytes);
        let err = read_frame(&mut cursor, 16).await.unwrap_err();
        match err {
            GatewayError::Protocol(e) => assert!(e.is_fatal()),
            other => panic!("expected protocol error, got {other:?}"),
        }
    }
}
