//! SourceManager: owns the OPC sources and drives their connection lifecycle.
//!
//! Each source is bound to one TCP port and is in exactly one of three states:
//!
//! ```text
//!            register(port)
//!                 │
//!                 ▼
//!          ┌────────────┐   accept    ┌─────────────┐
//!          │ Listening  │ ──────────▶ │  Connected  │ ── read ──▶ FrameDecoder ──▶ PixelHandler
//!          └────────────┘             └─────────────┘
//!                 ▲                          │ EOF / read error / reset()
//!                 │        re-listen         │
//!                 └────── (bind ok) ◀────────┤
//!                                            ▼ (bind failed)
//!                                      ┌────────────┐
//!                                      │  Detached  │ ── next poll retries the bind
//!                                      └────────────┘
//! ```
//!
//! Only one client is served per source at a time: the listening socket is
//! closed when a connection is accepted and reopened when it ends.
//!
//! [`SourceManager::poll`] waits on a single source; [`SourceManager::poll_next`]
//! waits on all of them at once and serves whichever is ready first.  Timeouts
//! never touch decoder state, so a frame may span any number of timed-out
//! polls.

use std::fmt;
use std::future;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use opc_core::{Command, FrameDecoder};
use thiserror::Error;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::time;
use tracing::{debug, error, info, trace, warn};

use crate::application::PixelHandler;
use crate::domain::NetworkConfig;

/// Error type for source management operations.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source table is full ({capacity} sources)")]
    CapacityExhausted { capacity: usize },
    #[error("bind failed on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("accept failed on port {port}: {source}")]
    Accept {
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("unknown source id {0}")]
    UnknownSource(SourceId),
    #[error("pixel handler failed: {0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Opaque handle returned by [`SourceManager::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(usize);

impl SourceId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for SourceId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Settings shared by every source in the manager.
#[derive(Debug, Clone)]
pub struct SourceManagerConfig {
    pub bind_address: IpAddr,
    /// Maximum number of sources that can be registered.
    pub capacity: usize,
    /// Listen backlog for each listening socket.
    pub backlog: u32,
}

impl From<&NetworkConfig> for SourceManagerConfig {
    fn from(network: &NetworkConfig) -> Self {
        Self {
            bind_address: network.bind_address,
            capacity: network.max_sources,
            backlog: network.listen_backlog,
        }
    }
}

impl Default for SourceManagerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            capacity: 4,
            backlog: 1,
        }
    }
}

/// What a single [`SourceManager::poll`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A client connected; the listening socket is closed.
    Accepted(SocketAddr),
    /// One read was decoded.  `frame_completed` is set when it finished a
    /// frame (set-pixels frames have been handed to the handler).
    Received { bytes: usize, frame_completed: bool },
    /// The client went away.  Partial frame data was discarded and the source
    /// is listening again, or detached if the re-listen failed.
    Closed,
    /// A detached source was bound again.
    Rebound,
    /// Nothing happened within the timeout.
    TimedOut,
}

/// Observable connection state of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    Listening,
    Connected(SocketAddr),
    /// Neither listening nor connected; the next poll retries the bind.
    Detached,
}

enum Connection {
    Listening(TcpListener),
    Connected { stream: TcpStream, peer: SocketAddr },
    Detached,
}

struct Source {
    port: u16,
    conn: Connection,
    decoder: FrameDecoder,
}

impl Source {
    fn status(&self) -> SourceStatus {
        match &self.conn {
            Connection::Listening(_) => SourceStatus::Listening,
            Connection::Connected { peer, .. } => SourceStatus::Connected(*peer),
            Connection::Detached => SourceStatus::Detached,
        }
    }

    /// Drops any connection, discards partial frame data and binds the port
    /// again.  On failure the source is left detached.
    fn relisten(&mut self, bind_address: IpAddr, backlog: u32) -> Result<(), SourceError> {
        self.conn = Connection::Detached;
        self.decoder.reset();
        let addr = SocketAddr::new(bind_address, self.port);
        let listener = listen(addr, backlog).map_err(|source| SourceError::BindFailed { addr, source })?;
        self.conn = Connection::Listening(listener);
        Ok(())
    }
}

/// The source table.
pub struct SourceManager {
    config: SourceManagerConfig,
    sources: Vec<Source>,
    /// Index [`SourceManager::poll_next`] checks first.
    next: usize,
}

impl SourceManager {
    pub fn new(config: SourceManagerConfig) -> Self {
        let sources = Vec::with_capacity(config.capacity);
        Self {
            config,
            sources,
            next: 0,
        }
    }

    /// Opens a listening socket on `port` and adds a source for it.
    ///
    /// Port 0 binds an ephemeral port; the resolved port is kept for every
    /// later re-listen (see [`port`](Self::port)).  Must be called from
    /// within a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`SourceError::CapacityExhausted`] or [`SourceError::BindFailed`].  The
    /// source table is unchanged on error.  Nothing is logged; reporting the
    /// failure is up to the caller.
    pub fn register(&mut self, port: u16) -> Result<SourceId, SourceError> {
        if self.sources.len() >= self.config.capacity {
            return Err(SourceError::CapacityExhausted {
                capacity: self.config.capacity,
            });
        }

        let addr = SocketAddr::new(self.config.bind_address, port);
        let listener =
            listen(addr, self.config.backlog).map_err(|source| SourceError::BindFailed { addr, source })?;
        let local = listener.local_addr().unwrap_or(addr);

        let id = SourceId(self.sources.len());
        self.sources.push(Source {
            port: local.port(),
            conn: Connection::Listening(listener),
            decoder: FrameDecoder::new(),
        });
        info!("source {id} listening on {local}");
        Ok(id)
    }

    /// Waits up to `timeout` for activity on source `id` and handles it.
    ///
    /// A listening source accepts one connection.  A connected source does
    /// one read into its decoder; if that completes a set-pixels frame,
    /// `handler` is called before this returns.  End of stream or a read
    /// error closes the connection and re-listens.
    ///
    /// # Errors
    ///
    /// - [`SourceError::UnknownSource`] if `id` was not returned by `register`.
    /// - [`SourceError::Handler`] if the handler failed.  The frame is consumed
    ///   and the connection stays open.
    /// - [`SourceError::BindFailed`] if a detached source still cannot bind.
    /// - [`SourceError::Accept`] if accepting a pending connection failed.
    pub async fn poll<H>(
        &mut self,
        id: SourceId,
        handler: &mut H,
        timeout: Duration,
    ) -> Result<PollOutcome, SourceError>
    where
        H: PixelHandler + ?Sized,
    {
        let bind_address = self.config.bind_address;
        let backlog = self.config.backlog;
        let source = self.source_mut(id)?;

        let ready = future::poll_fn(|cx| {
            poll_source(id, &mut *source, &mut *handler, cx, bind_address, backlog)
        });
        match time::timeout(timeout, ready).await {
            Ok(result) => result,
            Err(_) => Ok(PollOutcome::TimedOut),
        }
    }

    /// Waits up to `timeout` for activity on any source and handles the first
    /// one that is ready, exactly as [`poll`](Self::poll) would.
    ///
    /// All sources are watched at once, so an idle source never delays a
    /// busy one.  When several are ready they are served round-robin, starting
    /// after the source served last.  Returns `Ok(None)` if nothing happened
    /// on any source within `timeout`.
    ///
    /// # Errors
    ///
    /// As for [`poll`](Self::poll), except that `UnknownSource` cannot occur.
    pub async fn poll_next<H>(
        &mut self,
        handler: &mut H,
        timeout: Duration,
    ) -> Result<Option<(SourceId, PollOutcome)>, SourceError>
    where
        H: PixelHandler + ?Sized,
    {
        let bind_address = self.config.bind_address;
        let backlog = self.config.backlog;
        let sources = &mut self.sources;
        let next = &mut self.next;

        let ready = future::poll_fn(|cx| {
            let len = sources.len();
            for offset in 0..len {
                let index = (*next + offset) % len;
                let id = SourceId(index);
                let polled =
                    poll_source(id, &mut sources[index], &mut *handler, cx, bind_address, backlog);
                if let Poll::Ready(result) = polled {
                    *next = (index + 1) % len;
                    return Poll::Ready(result.map(|outcome| (id, outcome)));
                }
            }
            Poll::Pending
        });
        match time::timeout(timeout, ready).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Closes any active connection on `id` and listens again.
    ///
    /// A source that is already listening keeps its socket; its decoder is
    /// cleared.
    ///
    /// # Errors
    ///
    /// [`SourceError::UnknownSource`], or [`SourceError::BindFailed`] if the
    /// port could not be bound (the source is then detached).
    pub fn reset(&mut self, id: SourceId) -> Result<(), SourceError> {
        let bind_address = self.config.bind_address;
        let backlog = self.config.backlog;
        let source = self.source_mut(id)?;
        match &source.conn {
            Connection::Listening(_) => {
                source.decoder.reset();
                Ok(())
            }
            Connection::Connected { peer, .. } => {
                warn!("source {id}: forcing reset of connection from {peer}");
                source.relisten(bind_address, backlog).map_err(|e| {
                    error!("source {id}: {e}");
                    e
                })
            }
            Connection::Detached => source.relisten(bind_address, backlog),
        }
    }

    pub fn status(&self, id: SourceId) -> Result<SourceStatus, SourceError> {
        self.source(id).map(Source::status)
    }

    /// The port source `id` listens on (resolved if it was registered as 0).
    pub fn port(&self, id: SourceId) -> Result<u16, SourceError> {
        self.source(id).map(|s| s.port)
    }

    /// Ids of all registered sources, in registration order.
    pub fn ids(&self) -> impl Iterator<Item = SourceId> {
        (0..self.sources.len()).map(SourceId)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    fn source(&self, id: SourceId) -> Result<&Source, SourceError> {
        self.sources.get(id.0).ok_or_else(|| {
            warn!("unknown source id {id}");
            SourceError::UnknownSource(id)
        })
    }

    fn source_mut(&mut self, id: SourceId) -> Result<&mut Source, SourceError> {
        self.sources.get_mut(id.0).ok_or_else(|| {
            warn!("unknown source id {id}");
            SourceError::UnknownSource(id)
        })
    }
}

/// Advances one source by at most one accept or read.
///
/// Returns `Pending` only after registering `cx` for the source's next
/// readiness event, and never consumes data it does not fully handle, so the
/// caller may drop the surrounding future at any point.
fn poll_source<H>(
    id: SourceId,
    source: &mut Source,
    handler: &mut H,
    cx: &mut Context<'_>,
    bind_address: IpAddr,
    backlog: u32,
) -> Poll<Result<PollOutcome, SourceError>>
where
    H: PixelHandler + ?Sized,
{
    match &mut source.conn {
        Connection::Detached => Poll::Ready(source.relisten(bind_address, backlog).map(|()| {
            info!("source {id} listening again on port {}", source.port);
            PollOutcome::Rebound
        })),

        Connection::Listening(listener) => {
            let (stream, peer) = match listener.poll_accept(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Err(e)) => {
                    return Poll::Ready(Err(SourceError::Accept {
                        port: source.port,
                        source: e,
                    }))
                }
                Poll::Ready(Ok(accepted)) => accepted,
            };
            // Replacing the listener closes it.
            source.conn = Connection::Connected { stream, peer };
            source.decoder.reset();
            info!("source {id} accepted connection from {peer}");
            Poll::Ready(Ok(PollOutcome::Accepted(peer)))
        }

        Connection::Connected { stream, peer } => {
            let peer = *peer;
            let mut buf = ReadBuf::new(source.decoder.read_buf());
            let read = match Pin::new(stream).poll_read(cx, &mut buf) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(result) => result.map(|()| buf.filled().len()),
            };
            let n = match read {
                Ok(0) => {
                    info!("source {id}: {peer} closed the connection");
                    return Poll::Ready(Ok(close(id, source, bind_address, backlog)));
                }
                Err(e) => {
                    info!("source {id}: read from {peer} failed: {e}");
                    return Poll::Ready(Ok(close(id, source, bind_address, backlog)));
                }
                Ok(n) => n,
            };
            trace!(source = id.index(), bytes = n, "read");

            let frame_completed = match source.decoder.commit(n) {
                None => false,
                Some(frame) if frame.command == Command::SetPixels => {
                    if let Err(e) = handler.handle_pixels(frame.address, frame.pixels()) {
                        return Poll::Ready(Err(SourceError::Handler(Box::new(e))));
                    }
                    true
                }
                Some(frame) => {
                    debug!(
                        command = u8::from(frame.command),
                        len = frame.payload.len(),
                        "source {id}: ignoring frame"
                    );
                    true
                }
            };
            Poll::Ready(Ok(PollOutcome::Received {
                bytes: n,
                frame_completed,
            }))
        }
    }
}

fn close(id: SourceId, source: &mut Source, bind_address: IpAddr, backlog: u32) -> PollOutcome {
    match source.relisten(bind_address, backlog) {
        Ok(()) => info!("source {id} listening again on port {}", source.port),
        Err(e) => error!("source {id} could not re-listen: {e}"),
    }
    PollOutcome::Closed
}

/// Binds a listening socket with address reuse enabled.
fn listen(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(backlog.max(1))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
