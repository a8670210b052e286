//! Core connection gateway implementation.
//!
//! The [`Gateway`] owns the accept loops and wires every accepted
//! connection into the framing pipeline and handler table. It is
//! infrastructure only: which packets exist and what they mean lives in
//! the handler implementations.

use crate::auth::TokenValidator;
use crate::bus::MessageBus;
use crate::config::GatewayConfig;
use crate::connection::serve_connection;
use crate::error::GatewayError;
use crate::handlers::{default_handlers, HandlerRegistry, PacketHandler};
use crate::registry::SessionRegistry;
use futures::stream::{FuturesUnordered, StreamExt};
use gateway_protocol::PacketType;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::TcpListener as StdTcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Shared state every connection worker operates against.
pub(crate) struct GatewayContext {
    pub(crate) config: GatewayConfig,
    pub(crate) registry: Arc<SessionRegistry>,
    pub(crate) handlers: HandlerRegistry,
    pub(crate) validator: Arc<dyn TokenValidator>,
    pub(crate) bus: Arc<dyn MessageBus>,
}

/// The connection gateway: accept loops, framing pipeline, dispatch.
///
/// The session registry is injected so the command relay can share it;
/// the gateway is the registry's only writer (connection open and close),
/// all through the atomic registry operations.
pub struct Gateway {
    context: Arc<GatewayContext>,
    shutdown_sender: broadcast::Sender<()>,
    active_connections: Arc<AtomicUsize>,
}

impl Gateway {
    /// Create a gateway with the standard handler wiring.
    pub fn new(
        config: GatewayConfig,
        registry: Arc<SessionRegistry>,
        validator: Arc<dyn TokenValidator>,
        bus: Arc<dyn MessageBus>,
    ) -> Self {
        let (shutdown_sender, _) = broadcast::channel(1);
        Self {
            context: Arc::new(GatewayContext {
                config,
                registry,
                handlers: default_handlers(),
                validator,
                bus,
            }),
            shutdown_sender,
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.context.registry.clone()
    }

    /// Register an additional packet handler. Extension point: new packet
    /// types plug in without touching the dispatch path.
    pub fn register_handler(&self, packet_type: PacketType, handler: Arc<dyn PacketHandler>) {
        self.context.handlers.register(packet_type, handler);
    }

    /// A receiver that fires when [`Gateway::shutdown`] is called. The
    /// relay and other sibling tasks stop on the same signal.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_sender.subscribe()
    }

    /// Number of currently accepted (not necessarily authenticated)
    /// connections.
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Start accepting connections and run until shutdown.
    ///
    /// With `use_reuse_port` enabled, one listener and accept loop is
    /// created per CPU core so the kernel load-balances accepts across
    /// them; otherwise a single acceptor serves the socket.
    pub async fn start(&self) -> Result<(), GatewayError> {
        let num_acceptors = if self.context.config.use_reuse_port {
            num_cpus::get()
        } else {
            1
        };

        info!(
            bind_address = %self.context.config.bind_address,
            acceptors = num_acceptors,
            "starting connection gateway"
        );

        let mut listeners = Vec::with_capacity(num_acceptors);
        for i in 0..num_acceptors {
            let listener = self.create_listener()?;
            let local_addr = listener
                .local_addr()
                .map_err(|e| GatewayError::Network(e.to_string()))?;
            info!(acceptor = i, %local_addr, "listener bound");
            listeners.push(listener);
        }

        let mut accept_loops = listeners
            .into_iter()
            .map(|listener| self.serve_listener(listener))
            .collect::<FuturesUnordered<_>>();

        while let Some(result) = accept_loops.next().await {
            result?;
        }

        info!("connection gateway stopped");
        Ok(())
    }

    /// Run one accept loop over an already-bound listener until shutdown.
    ///
    /// Exposed separately so callers (and tests) can bind an ephemeral
    /// port themselves and learn the address before serving.
    pub async fn serve_listener(&self, listener: TcpListener) -> Result<(), GatewayError> {
        let mut shutdown = self.shutdown_sender.subscribe();

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("shutdown signal received, stopping accept loop");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, remote_addr)) => {
                            let active = self.active_connections.load(Ordering::Relaxed);
                            if active >= self.context.config.max_connections {
                                warn!(%remote_addr, active = active, "connection limit reached, rejecting");
                                drop(stream);
                                continue;
                            }
                            let _ = stream.set_nodelay(true);

                            self.active_connections.fetch_add(1, Ordering::Relaxed);
                            let context = self.context.clone();
                            let shutdown_rx = self.shutdown_sender.subscribe();
                            let active_connections = self.active_connections.clone();
                            tokio::spawn(async move {
                                serve_connection(stream, remote_addr, context, shutdown_rx).await;
                                active_connections.fetch_sub(1, Ordering::Relaxed);
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Signal every accept loop and connection to stop.
    pub fn shutdown(&self) {
        info!("shutting down gateway");
        let _ = self.shutdown_sender.send(());
    }

    /// Bind a listener per the configuration, with SO_REUSEADDR always and
    /// SO_REUSEPORT when configured (and supported).
    fn create_listener(&self) -> Result<TcpListener, GatewayError> {
        let addr = self.context.config.bind_address;
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| GatewayError::Network(format!("socket creation failed: {e}")))?;
        socket.set_reuse_address(true).ok();

        if self.context.config.use_reuse_port {
            #[cfg(unix)]
            if let Err(e) = socket.set_reuse_port(true) {
                warn!(error = %e, "failed to set SO_REUSEPORT");
            }
            #[cfg(not(unix))]
            warn!("SO_REUSEPORT is not supported on this platform");
        }

        socket
            .bind(&addr.into())
            .map_err(|e| GatewayError::Network(format!("bind to {addr} failed: {e}")))?;
        socket
            .listen(65535)
            .map_err(|e| GatewayError::Network(format!("listen on {addr} failed: {e}")))?;

        let std_listener: StdTcpListener = socket.into();
        std_listener
            .set_nonblocking(true)
            .map_err(|e| GatewayError::Network(format!("set_nonblocking failed: {e}")))?;
        TcpListener::from_std(std_listener)
            .map_err(|e| GatewayError::Network(format!("listener registration failed: {e}")))
    }
}
