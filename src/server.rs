//! Connection acceptor and frame receive loop.
//!
//! [`VideoServer`] owns the listening socket and a background accept task.
//! Exactly one producer streams at a time: the accept loop processes each
//! connection inline, so a second producer queues in the TCP backlog until
//! the first one goes away. Decoded frames land in the hand-off slot, the
//! frame watch channel, and the statistics tracker; control commands flow
//! back over the same socket through a per-connection writer task.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::codec;
use crate::config::ServerConfig;
use crate::control::ControlChannel;
use crate::error::{Result, StreamError};
use crate::frame::FramePacket;
use crate::slot::FrameSlot;
use crate::stats::{FpsWindow, StatsReport, StreamStats};
use crate::stream::{FrameRate, frame_stream};

/// Connection lifecycle as observed by a consumer UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Service not running.
    Stopped,
    /// Listener bound, waiting for a producer.
    Listening,
    /// A producer is streaming from this address.
    Connected(SocketAddr),
}

/// TCP receiver service for a single camera-frame producer.
///
/// The service is inert until [`start`](Self::start) binds the listener and
/// spawns the accept task. All consumer-facing calls are non-blocking:
/// [`try_pop_frame`](Self::try_pop_frame) returns immediately whether or not
/// a frame is waiting, and [`send_control_command`](Self::send_control_command)
/// silently drops commands when no producer is connected.
pub struct VideoServer {
    config: ServerConfig,
    slot: Arc<FrameSlot>,
    stats: StreamStats,
    control: ControlChannel,
    frame_tx: watch::Sender<Option<FramePacket>>,
    state_tx: watch::Sender<ConnectionState>,
    shutdown: CancellationToken,
    running: Mutex<Option<ServerTask>>,
}

/// Handle to the spawned accept task.
struct ServerTask {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    local_addr: SocketAddr,
}

impl VideoServer {
    /// Create a stopped service with the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        let (frame_tx, _) = watch::channel(None);
        let (state_tx, _) = watch::channel(ConnectionState::Stopped);
        Self {
            config,
            slot: Arc::new(FrameSlot::new()),
            stats: StreamStats::new(),
            control: ControlChannel::new(),
            frame_tx,
            state_tx,
            shutdown: CancellationToken::new(),
            running: Mutex::new(None),
        }
    }

    /// Bind the listener and spawn the accept loop.
    ///
    /// Idempotent: calling `start` on a running service is a no-op. A failure
    /// to bind is surfaced to the caller; nothing is spawned in that case.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Bind`] when the configured address cannot be
    /// bound (port in use, insufficient privileges, bad interface).
    pub async fn start(&self) -> Result<()> {
        let mut running = self.running.lock().await;
        if let Some(server) = running.as_ref() {
            if !server.task.is_finished() {
                debug!("start() called while already running");
                return Ok(());
            }
        }

        let bind_addr = self.config.bind_addr();
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|e| StreamError::bind_failed(bind_addr, e))?;
        let local_addr = listener.local_addr().map_err(|e| StreamError::io("local_addr", e))?;
        info!(%local_addr, "video server listening");

        let cancel = self.shutdown.child_token();
        let ctx = ReceiverContext {
            config: self.config.clone(),
            slot: Arc::clone(&self.slot),
            stats: self.stats.clone(),
            control: self.control.clone(),
            frame_tx: self.frame_tx.clone(),
            state_tx: self.state_tx.clone(),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(accept_loop(listener, ctx));

        *running = Some(ServerTask { cancel, task, local_addr });
        Ok(())
    }

    /// Stop the service and wait for the accept task to finish.
    ///
    /// Idempotent and safe to call at any time. An in-progress blocking read
    /// is unblocked via cancellation, so this returns within a bounded time;
    /// afterwards [`start`](Self::start) may be called again.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        let Some(server) = running.take() else {
            return;
        };
        server.cancel.cancel();
        if let Err(e) = server.task.await {
            debug!("accept task join failed: {e}");
        }
        info!("video server stopped");
    }

    /// Take the newest received frame, if one is waiting.
    ///
    /// Never blocks and never fails: an empty slot is a normal result. Taking
    /// a frame records its hand-off latency in the statistics.
    pub fn try_pop_frame(&self) -> Option<FramePacket> {
        let packet = self.slot.try_pop()?;
        self.stats.record_latency(packet.age());
        Some(packet)
    }

    /// Queue a control command (e.g. `ZOOM:2.50`) for the connected producer.
    ///
    /// A newline terminator is appended on the wire. Silent no-op when no
    /// producer is connected; write failures are logged and never surface
    /// here.
    pub fn send_control_command(&self, command: &str) {
        self.control.send(command);
    }

    /// Live stream health counters.
    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Display-ready snapshot of the stream health.
    pub fn stats_report(&self) -> StatsReport {
        self.stats.report()
    }

    /// Subscribe to frames as an async stream at the given rate.
    ///
    /// Subscribers see latest-frame semantics: a slow consumer skips frames
    /// rather than lagging. The stream ends when the server is dropped.
    pub fn frames(&self, rate: FrameRate) -> futures::stream::BoxStream<'static, FramePacket> {
        frame_stream(self.frame_tx.subscribe(), rate)
    }

    /// Watch the connection lifecycle (stopped / listening / connected).
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Current connection state.
    pub fn current_state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Address the listener is actually bound to, when running.
    ///
    /// Differs from the configured address when port 0 requested an
    /// OS-assigned port.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|server| server.local_addr)
    }

    /// The configuration this service was built with.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl Drop for VideoServer {
    fn drop(&mut self) {
        debug!("dropping video server");
        // Cancel tasks on drop for clean shutdown
        self.shutdown.cancel();
    }
}

/// Shared handles the accept loop and receive loop operate on.
struct ReceiverContext {
    config: ServerConfig,
    slot: Arc<FrameSlot>,
    stats: StreamStats,
    control: ControlChannel,
    frame_tx: watch::Sender<Option<FramePacket>>,
    state_tx: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
}

/// Accept producers one at a time until cancelled or the listener fails.
async fn accept_loop(listener: TcpListener, ctx: ReceiverContext) {
    let _ = ctx.state_tx.send(ConnectionState::Listening);

    let mut sequence = 0u64;
    let mut error_count = 0u32;
    const MAX_ACCEPT_ERRORS: u32 = 10;

    loop {
        let accepted = tokio::select! {
            _ = ctx.cancel.cancelled() => {
                info!("accept loop cancelled");
                break;
            }
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer)) => {
                error_count = 0;
                info!(%peer, "producer connected");

                handle_producer(stream, peer, &mut sequence, &ctx).await;

                let _ = ctx.state_tx.send(ConnectionState::Listening);
            }
            Err(e) => {
                // Accept errors are usually transient (e.g. fd exhaustion);
                // back off and give up only after a sustained run of them.
                error_count += 1;
                let err = StreamError::accept_failed(e);
                error!("accept failed ({error_count}/{MAX_ACCEPT_ERRORS}): {err}");

                if error_count >= MAX_ACCEPT_ERRORS {
                    error!("too many accept errors, shutting down listener");
                    break;
                }

                let backoff = Duration::from_millis(50 * (1 << error_count.min(5)));
                tokio::time::sleep(backoff).await;
            }
        }
    }

    let _ = ctx.state_tx.send(ConnectionState::Stopped);
}

/// Run one producer connection to completion.
///
/// Reads frames until the producer disconnects, goes silent past the read
/// timeout, sends a malformed header, or the service is cancelled. The write
/// half is parked in a writer task that drains queued control commands.
async fn handle_producer(
    stream: TcpStream,
    peer: SocketAddr,
    sequence: &mut u64,
    ctx: &ReceiverContext,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(%peer, "set_nodelay failed: {e}");
    }

    let (mut reader, writer) = stream.into_split();
    let commands = ctx.control.attach();
    let writer_task = tokio::spawn(control_writer(commands, writer));

    // Published only after the control channel is attached, so a consumer
    // reacting to the state change can issue commands immediately.
    let _ = ctx.state_tx.send(ConnectionState::Connected(peer));

    let mut window = FpsWindow::new(Instant::now());
    let mut frames_received = 0u64;

    loop {
        let result = tokio::select! {
            _ = ctx.cancel.cancelled() => {
                debug!(%peer, "receive loop cancelled");
                break;
            }
            result = read_frame(&mut reader, &ctx.config) => result,
        };

        match result {
            Ok(data) => {
                let now = Instant::now();
                *sequence += 1;
                frames_received += 1;

                let packet = FramePacket::new(data, now, *sequence);
                trace!(sequence = packet.sequence, len = packet.len(), "frame received");

                ctx.slot.push(packet.clone());
                let _ = ctx.frame_tx.send(Some(packet));
                ctx.stats.record_frame(now);

                if let Some(fps) = window.record(now) {
                    trace!(fps, "fps window rolled");
                    ctx.stats.set_fps(fps);
                }
            }
            Err(e @ StreamError::FrameLength { .. }) => {
                // No resynchronization marker in the protocol: the stream
                // offset can no longer be trusted, drop the producer.
                warn!(%peer, "{e}, closing connection");
                break;
            }
            Err(e) => {
                debug!(%peer, "receive loop ended: {e}");
                break;
            }
        }
    }

    ctx.control.detach();
    writer_task.abort();
    let _ = ctx.frame_tx.send(None);
    info!(%peer, frames = frames_received, "producer disconnected");
}

/// Read one length-prefixed frame payload.
async fn read_frame(reader: &mut OwnedReadHalf, config: &ServerConfig) -> Result<Vec<u8>> {
    let mut header = [0u8; codec::HEADER_LEN];
    read_exact_timed(reader, &mut header, config.read_timeout, "header read").await?;

    let declared = codec::decode_header(header);
    let length = codec::validate_length(declared, config.max_frame_len)?;

    let mut payload = vec![0u8; length as usize];
    read_exact_timed(reader, &mut payload, config.read_timeout, "payload read").await?;
    Ok(payload)
}

/// Fill `buf` completely or fail.
///
/// `read_exact` retries partial reads internally and reports EOF mid-buffer
/// as an error; the timeout bounds the whole fill so a silent producer is
/// detected.
async fn read_exact_timed(
    reader: &mut OwnedReadHalf,
    buf: &mut [u8],
    timeout: Duration,
    context: &'static str,
) -> Result<()> {
    match tokio::time::timeout(timeout, reader.read_exact(buf)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(StreamError::io(context, e)),
        Err(_) => Err(StreamError::Timeout { duration: timeout }),
    }
}

/// Drain queued control commands onto the producer socket.
///
/// Each command goes out as one `write_all` of `<command>\n`. Failures are
/// logged and swallowed; the read side of the connection is the sole
/// authority on connection death.
async fn control_writer(mut commands: mpsc::UnboundedReceiver<String>, mut writer: OwnedWriteHalf) {
    while let Some(command) = commands.recv().await {
        let mut line = command.into_bytes();
        line.push(b'\n');
        if let Err(e) = writer.write_all(&line).await {
            warn!("control command write failed: {e}");
        }
    }
    debug!("control writer ended");
}
