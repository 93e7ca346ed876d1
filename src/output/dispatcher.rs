//! Hands events to a transport on a background thread so a slow or
//! reconnecting link never stalls frame processing.
//!
//! Gesture events use an unbounded queue and are never dropped. Trail updates
//! use a bounded queue; when it is full the newest update is discarded and
//! counted.

use super::format::format_message;
use super::transport::{SocketClient, SocketSettings, Transport};
use super::{ConsoleSink, EventSink};
use crate::config::{MessageFormat, OutputConfig};
use crate::error::{GestureError, Result};
use crate::events::EngineEvent;
use crossbeam::channel::{self, select, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Snapshot of the dispatcher counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub gestures_queued: u64,
    pub trails_queued: u64,
    pub trails_dropped: u64,
    pub delivered: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    gestures_queued: AtomicU64,
    trails_queued: AtomicU64,
    trails_dropped: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            gestures_queued: self.gestures_queued.load(Ordering::Relaxed),
            trails_queued: self.trails_queued.load(Ordering::Relaxed),
            trails_dropped: self.trails_dropped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

struct Queues {
    gestures: Sender<String>,
    trails: Sender<String>,
}

pub struct OutputDispatcher {
    console: Option<ConsoleSink>,
    format: MessageFormat,
    queues: Mutex<Option<Queues>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl OutputDispatcher {
    /// Console sink and, when enabled, the socket transport from the configuration
    pub fn from_config(config: &OutputConfig) -> Result<Self> {
        let console = config.console_output.then(|| ConsoleSink::new(config.console_format));
        if !config.socket_output {
            return Ok(Self::console_only(console));
        }

        let client = SocketClient::new(SocketSettings::from_config(config), true);
        Self::with_transport(console, config.socket_format, config.queue_capacity, Box::new(client))
    }

    pub fn console_only(console: Option<ConsoleSink>) -> Self {
        Self {
            console,
            format: MessageFormat::Json,
            queues: Mutex::new(None),
            worker: Mutex::new(None),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with_transport(
        console: Option<ConsoleSink>,
        format: MessageFormat,
        trail_capacity: usize,
        transport: Box<dyn Transport>,
    ) -> Result<Self> {
        let (gesture_tx, gesture_rx) = channel::unbounded();
        let (trail_tx, trail_rx) = channel::bounded(trail_capacity.max(1));
        let counters = Arc::new(Counters::default());

        let worker_counters = Arc::clone(&counters);
        let worker = thread::Builder::new()
            .name("gesture-output".to_string())
            .spawn(move || run_worker(gesture_rx, trail_rx, transport, worker_counters))
            .map_err(|e| GestureError::system(format!("Failed to start output worker: {}", e)))?;

        Ok(Self {
            console,
            format,
            queues: Mutex::new(Some(Queues {
                gestures: gesture_tx,
                trails: trail_tx,
            })),
            worker: Mutex::new(Some(worker)),
            counters,
        })
    }

    pub fn stats(&self) -> DispatchStats {
        self.counters.snapshot()
    }

    pub fn has_transport(&self) -> bool {
        self.queues.lock().is_some()
    }

    /// Close the queues and wait for the worker to deliver what is left
    pub fn shutdown(&self) {
        let queues = self.queues.lock().take();
        if queues.is_none() {
            return;
        }
        drop(queues);

        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                error!("Output worker panicked");
            }
        }
        let stats = self.stats();
        info!(
            "Output dispatcher stopped: {} delivered, {} failed, {} trail updates dropped",
            stats.delivered, stats.failed, stats.trails_dropped
        );
    }
}

impl EventSink for OutputDispatcher {
    fn emit(&self, event: &EngineEvent) {
        if let Some(console) = &self.console {
            console.emit(event);
        }

        let queues = self.queues.lock();
        let Some(queues) = queues.as_ref() else {
            return;
        };

        let message = match format_message(event, self.format) {
            Ok(message) => message,
            Err(err) => {
                warn!("Failed to serialize {} event: {}", event.event_type(), err);
                return;
            }
        };

        if event.is_trail() {
            match queues.trails.try_send(message) {
                Ok(()) => {
                    self.counters.trails_queued.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Full(_)) => {
                    self.counters.trails_dropped.fetch_add(1, Ordering::Relaxed);
                    debug!("Trail queue full, dropping update for {}", event.hand_id());
                }
                Err(TrySendError::Disconnected(_)) => {
                    warn!("Output worker is gone, trail update not sent");
                }
            }
        } else if queues.gestures.send(message).is_ok() {
            self.counters.gestures_queued.fetch_add(1, Ordering::Relaxed);
        } else {
            warn!("Output worker is gone, gesture event not sent");
        }
    }
}

impl Drop for OutputDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn deliver(transport: &dyn Transport, counters: &Counters, message: &str) {
    match transport.send(message) {
        Some(_) => {
            counters.delivered.fetch_add(1, Ordering::Relaxed);
        }
        None => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn run_worker(
    gestures: Receiver<String>,
    trails: Receiver<String>,
    transport: Box<dyn Transport>,
    counters: Arc<Counters>,
) {
    if !transport.connect() {
        warn!("Output transport not connected; will retry on the next event");
    }

    loop {
        // Gesture events jump ahead of queued trail updates
        if let Ok(message) = gestures.try_recv() {
            deliver(transport.as_ref(), &counters, &message);
            continue;
        }

        let message = select! {
            recv(gestures) -> message => message,
            recv(trails) -> message => message,
        };
        match message {
            Ok(message) => deliver(transport.as_ref(), &counters, &message),
            Err(_) => break,
        }
    }

    for message in gestures.try_iter().chain(trails.try_iter()) {
        deliver(transport.as_ref(), &counters, &message);
    }
    transport.disconnect();
    debug!("Output worker finished");
}
