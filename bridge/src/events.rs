//! Platform notification sources.
//!
//! A source delivers [`PlatformEvent::ClipboardUpdated`] to a single sink. The
//! bridge subscribes once at construction and unsubscribes on disposal.

use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, trace};

use crate::clipboard::ClipboardBackend;
use crate::error::{BridgeError, Result};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformEvent {
    ClipboardUpdated,
}

pub type EventSink = Arc<dyn Fn(PlatformEvent) + Send + Sync>;

pub trait EventSource: Send {
    fn subscribe(&mut self, sink: EventSink) -> Result<()>;
    fn unsubscribe(&mut self);
}

type SharedSink = Arc<Mutex<Option<EventSink>>>;

fn current_sink(slot: &SharedSink) -> Option<EventSink> {
    match slot.lock() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

fn store_sink(slot: &SharedSink, sink: Option<EventSink>) {
    match slot.lock() {
        Ok(mut guard) => *guard = sink,
        Err(poisoned) => *poisoned.into_inner() = sink,
    }
}

/// Source driven by the host, one [`EventEmitter::emit`] per update.
#[derive(Default)]
pub struct SyntheticEventSource {
    sink: SharedSink,
}

impl SyntheticEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emitter(&self) -> EventEmitter {
        EventEmitter { sink: Arc::clone(&self.sink) }
    }
}

impl EventSource for SyntheticEventSource {
    fn subscribe(&mut self, sink: EventSink) -> Result<()> {
        store_sink(&self.sink, Some(sink));
        Ok(())
    }

    fn unsubscribe(&mut self) {
        store_sink(&self.sink, None);
    }
}

impl fmt::Debug for SyntheticEventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntheticEventSource")
            .field("subscribed", &current_sink(&self.sink).is_some())
            .finish()
    }
}

#[derive(Clone)]
pub struct EventEmitter {
    sink: SharedSink,
}

impl EventEmitter {
    /// Deliver one update. Returns `false` when nobody is subscribed.
    pub fn emit(&self) -> bool {
        match current_sink(&self.sink) {
            Some(sink) => {
                sink(PlatformEvent::ClipboardUpdated);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter").finish_non_exhaustive()
    }
}

/// Watches [`ClipboardBackend::change_token`] from a background thread.
///
/// Used where the platform has no update broadcast.
pub struct PollingSource {
    backend: Arc<dyn ClipboardBackend>,
    interval: Duration,
    worker: Option<(Sender<()>, JoinHandle<()>)>,
}

impl PollingSource {
    pub fn new(backend: Arc<dyn ClipboardBackend>, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(BridgeError::InvalidArgument("poll interval must be positive".to_string()));
        }
        Ok(Self { backend, interval, worker: None })
    }
}

impl EventSource for PollingSource {
    fn subscribe(&mut self, sink: EventSink) -> Result<()> {
        self.unsubscribe();

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let backend = Arc::clone(&self.backend);
        let interval = self.interval;
        let handle = thread::Builder::new()
            .name("clipboard-poll".to_string())
            .spawn(move || {
                let mut last = backend.change_token();
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    let token = backend.change_token();
                    if token.is_some() && token != last {
                        trace!(?token, "clipboard change token moved");
                        last = token;
                        sink(PlatformEvent::ClipboardUpdated);
                    }
                }
                debug!("clipboard polling stopped");
            })
            .map_err(|e| BridgeError::Registration(e.to_string()))?;

        self.worker = Some((stop_tx, handle));
        debug!(interval_ms = interval.as_millis() as u64, "clipboard polling started");
        Ok(())
    }

    fn unsubscribe(&mut self) {
        if let Some((stop, handle)) = self.worker.take() {
            let _ = stop.send(());
            // Disposal can run on the polling thread itself; never join ourselves.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for PollingSource {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for PollingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingSource")
            .field("interval", &self.interval)
            .field("running", &self.worker.is_some())
            .finish()
    }
}
