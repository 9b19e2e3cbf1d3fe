//! Streaming video client
//!
//! [`VideoStreamClient`] owns one worker thread per connection. The worker
//! connects, reads socket bytes into a [`FrameParser`](super::parser::FrameParser),
//! calibrates frame timestamps into the local clock and enqueues decoded
//! frames on two independent queues (images, probe status). Consumers poll
//! [`VideoStreamClient::last_image_message`] /
//! [`VideoStreamClient::last_probe_status`] — a non-blocking pop — and may
//! subscribe to [`StreamEvent`] notifications to know when to poll.
//! Notifications are always sent after the queue mutex is released.
//!
//! Socket errors surface as a connection-state transition and terminate
//! the read loop. The client never reconnects on its own; that decision
//! belongs to the caller.

use std::io::Read;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::protocol::types::{ImageMessage, UsStatusMessage};
use crate::stream::calibration::TimestampSync;
use crate::stream::parser::{FrameParser, IncomingFrame};
use crate::stream::queue::{FrameQueue, QueueStats};

/// Connection lifecycle, reported via [`StreamEvent::ConnectionChanged`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

/// Edge-triggered notifications delivered to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    /// A new image frame was enqueued
    ImageAvailable,
    /// A new probe-status frame was enqueued
    ProbeStatusAvailable,
    ConnectionChanged(ConnectionState),
}

/// Client configuration with streaming-appropriate defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server address, e.g. `"127.0.0.1:18944"`
    pub addr: String,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Socket read timeout; bounds how long a stop request can go unnoticed
    pub read_timeout: Duration,
    /// Verify body CRCs (on by default)
    pub verify_crc: bool,
    /// Per-queue frame capacity (oldest dropped beyond this)
    pub queue_capacity: usize,
    /// How long `stop` waits for the worker before detaching it
    pub shutdown_timeout: Duration,
}

impl ClientConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        ClientConfig {
            addr: addr.into(),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_millis(500),
            verify_crc: true,
            queue_capacity: 32,
            shutdown_timeout: Duration::from_secs(2),
        }
    }
}

/// A decoded image frame with its calibrated receive-side timestamp
#[derive(Debug, Clone)]
pub struct ImageFrame {
    pub message: ImageMessage,
    /// Device name as sent (color tag still embedded)
    pub device_name: String,
    /// Timestamp in local-clock seconds
    pub timestamp: f64,
}

/// A decoded probe-status frame with its calibrated timestamp
#[derive(Debug, Clone)]
pub struct ProbeStatusFrame {
    pub message: UsStatusMessage,
    pub device_name: String,
    pub timestamp: f64,
}

struct Shared {
    images: FrameQueue<ImageFrame>,
    statuses: FrameQueue<ProbeStatusFrame>,
    state: Mutex<ConnectionState>,
    subscribers: Mutex<Vec<mpsc::Sender<StreamEvent>>>,
    stop: AtomicBool,
    stream: Mutex<Option<TcpStream>>,
}

impl Shared {
    fn notify(&self, event: StreamEvent) {
        let mut subs = self.subscribers.lock().unwrap();
        subs.retain(|tx| tx.send(event).is_ok());
    }

    fn set_state(&self, state: ConnectionState) {
        {
            let mut current = self.state.lock().unwrap();
            if *current == state {
                return;
            }
            *current = state;
        }
        // notify after the state lock is released
        self.notify(StreamEvent::ConnectionChanged(state));
    }
}

/// Streaming client handle; dropping it requests shutdown
pub struct VideoStreamClient {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    done_rx: mpsc::Receiver<()>,
    shutdown_timeout: Duration,
}

impl VideoStreamClient {
    /// Spawn the worker thread and start connecting
    ///
    /// Returns immediately; connection progress is reported through
    /// [`StreamEvent::ConnectionChanged`] and [`VideoStreamClient::state`].
    /// The only direct failure is the worker thread not spawning.
    pub fn start(config: ClientConfig) -> crate::error::Result<Self> {
        let shared = Arc::new(Shared {
            images: FrameQueue::new(config.queue_capacity),
            statuses: FrameQueue::new(config.queue_capacity),
            state: Mutex::new(ConnectionState::Connecting),
            subscribers: Mutex::new(Vec::new()),
            stop: AtomicBool::new(false),
            stream: Mutex::new(None),
        });

        let (done_tx, done_rx) = mpsc::channel();
        let shutdown_timeout = config.shutdown_timeout;
        let worker_shared = shared.clone();
        let worker = std::thread::Builder::new()
            .name("slicelink-stream".to_string())
            .spawn(move || {
                worker_loop(&worker_shared, &config);
                let _ = done_tx.send(());
            })?;

        Ok(VideoStreamClient {
            shared,
            worker: Some(worker),
            done_rx,
            shutdown_timeout,
        })
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock().unwrap()
    }

    /// Subscribe to stream events; each subscriber gets its own channel
    pub fn subscribe(&self) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel();
        self.shared.subscribers.lock().unwrap().push(tx);
        rx
    }

    /// Pop the oldest pending image frame, if any (non-blocking)
    pub fn last_image_message(&self) -> Option<ImageFrame> {
        self.shared.images.pop()
    }

    /// Pop the oldest pending probe-status frame, if any (non-blocking)
    pub fn last_probe_status(&self) -> Option<ProbeStatusFrame> {
        self.shared.statuses.pop()
    }

    pub fn image_queue_stats(&self) -> QueueStats {
        self.shared.images.stats()
    }

    pub fn status_queue_stats(&self) -> QueueStats {
        self.shared.statuses.stats()
    }

    /// Request shutdown and wait (bounded) for the worker to exit
    ///
    /// If the worker does not stop within the configured timeout it is
    /// detached and logged as an abnormal termination.
    pub fn stop(&mut self) {
        if self.worker.is_none() {
            return;
        }
        self.shared.stop.store(true, Ordering::SeqCst);
        if let Some(stream) = self.shared.stream.lock().unwrap().as_ref() {
            let _ = stream.shutdown(Shutdown::Both);
        }

        match self.done_rx.recv_timeout(self.shutdown_timeout) {
            Ok(()) => {
                if let Some(worker) = self.worker.take() {
                    let _ = worker.join();
                }
                debug!("Stream worker stopped");
            }
            Err(_) => {
                warn!("Stream worker did not stop within timeout, detaching");
                self.worker = None;
            }
        }
    }
}

impl Drop for VideoStreamClient {
    fn drop(&mut self) {
        self.stop();
    }
}

fn local_now_seconds() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn worker_loop(shared: &Shared, config: &ClientConfig) {
    shared.set_state(ConnectionState::Connecting);
    info!(addr = %config.addr, "Connecting to video source");

    let stream = match open_stream(config) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(addr = %config.addr, error = %e, "Connection failed");
            shared.set_state(ConnectionState::Disconnected);
            return;
        }
    };
    if let Ok(clone) = stream.try_clone() {
        *shared.stream.lock().unwrap() = Some(clone);
    }
    shared.set_state(ConnectionState::Connected);
    info!(addr = %config.addr, "Connected");

    read_loop(shared, config, stream);

    *shared.stream.lock().unwrap() = None;
    shared.set_state(ConnectionState::Disconnected);
}

fn open_stream(config: &ClientConfig) -> std::io::Result<TcpStream> {
    let addr = config
        .addr
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no address"))?;
    let stream = TcpStream::connect_timeout(&addr, config.connect_timeout)?;
    stream.set_read_timeout(Some(config.read_timeout))?;
    Ok(stream)
}

fn read_loop(shared: &Shared, config: &ClientConfig, mut stream: TcpStream) {
    let mut parser = FrameParser::new();
    parser.set_verify_crc(config.verify_crc);
    let mut calibration = TimestampSync::new();
    let mut buf = [0u8; 8192];

    loop {
        if shared.stop.load(Ordering::SeqCst) {
            info!("Stop requested, leaving read loop");
            return;
        }

        match stream.read(&mut buf) {
            Ok(0) => {
                info!("Video source closed the connection");
                return;
            }
            Ok(n) => {
                parser.feed(&buf[..n]);
                loop {
                    match parser.next_frame() {
                        Ok(Some(frame)) => dispatch(shared, &mut calibration, frame),
                        Ok(None) => break,
                        Err(e) => {
                            warn!(error = %e, "Fatal framing error, disconnecting");
                            return;
                        }
                    }
                }
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => {
                warn!(error = %e, "Socket read error, disconnecting");
                return;
            }
        }
    }
}

fn dispatch(shared: &Shared, calibration: &mut TimestampSync, frame: IncomingFrame) {
    let local = local_now_seconds();
    match frame {
        IncomingFrame::Image(meta, message) => {
            let timestamp = calibration.correct(meta.timestamp, local);
            shared.images.push(ImageFrame {
                message,
                device_name: meta.device_name,
                timestamp,
            });
            // queue mutex released inside push; safe to notify now
            shared.notify(StreamEvent::ImageAvailable);
        }
        IncomingFrame::ProbeStatus(meta, message) => {
            let timestamp = calibration.correct(meta.timestamp, local);
            shared.statuses.push(ProbeStatusFrame {
                message,
                device_name: meta.device_name,
                timestamp,
            });
            shared.notify(StreamEvent::ProbeStatusAvailable);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::new("127.0.0.1:18944");
        assert!(config.verify_crc);
        assert_eq!(config.queue_capacity, 32);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_connect_refused_reports_disconnected() {
        // port 1 is essentially never listening
        let mut config = ClientConfig::new("127.0.0.1:1");
        config.connect_timeout = Duration::from_millis(200);

        let mut client = VideoStreamClient::start(config).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while client.state() != ConnectionState::Disconnected {
            assert!(
                std::time::Instant::now() < deadline,
                "worker never reported disconnect"
            );
            std::thread::sleep(Duration::from_millis(10));
        }
        client.stop();
    }
}
