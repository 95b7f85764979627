//! The clipboard bridge: typed reads and writes plus change notifications.

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use crate::attribution::{ForegroundProcess, NoSource, SourceResolver};
use crate::clipboard::ClipboardBackend;
use crate::config::BridgeConfig;
use crate::data::{ClipboardChangedEvent, ClipboardData, ClipboardDataType};
use crate::debounce::{Debouncer, DEFAULT_DEBOUNCE};
use crate::dispatch;
use crate::error::{BackendError, BridgeError, Result};
use crate::events::{EventSink, EventSource, PlatformEvent, PollingSource, DEFAULT_POLL_INTERVAL};
use crate::executor::{Executor, ThreadExecutor};
use crate::retry::{with_retry, RetryPolicy};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Operations a clipboard binding offers to its host.
///
/// Reads and writes block until the clipboard worker finishes. When the
/// clipboard stays busy through every retry attempt, reads return their default
/// (`None`, `Unknown`, `true`) and writes give up silently.
#[async_trait]
pub trait ClipboardManager: Send + Sync {
    fn get_clipboard_data(&self) -> Result<Option<ClipboardData>>;

    /// `None` clears the clipboard.
    fn set_clipboard_data(&self, data: Option<&ClipboardData>) -> Result<()>;

    fn get_clipboard_data_type(&self) -> Result<ClipboardDataType>;

    fn clear_clipboard(&self) -> Result<()>;

    fn is_clipboard_empty(&self) -> Result<bool>;

    async fn get_clipboard_data_async(&self) -> Result<Option<ClipboardData>>;

    async fn set_clipboard_data_async(&self, data: Option<ClipboardData>) -> Result<()>;

    async fn get_clipboard_data_type_async(&self) -> Result<ClipboardDataType>;

    async fn clear_clipboard_async(&self) -> Result<()>;

    async fn is_clipboard_empty_async(&self) -> Result<bool>;

    fn start_monitoring(&self) -> Result<()>;

    fn stop_monitoring(&self) -> Result<()>;

    fn is_monitoring(&self) -> bool;

    /// Receive one [`ClipboardChangedEvent`] per processed external update.
    fn subscribe(&self) -> Result<broadcast::Receiver<ClipboardChangedEvent>>;

    /// Stop listening for updates and refuse further calls. Idempotent.
    fn dispose(&self);
}

struct Inner {
    backend: Arc<dyn ClipboardBackend>,
    executor: Box<dyn Executor>,
    resolver: Box<dyn SourceResolver>,
    policy: RetryPolicy,
    debouncer: Debouncer,
    events: broadcast::Sender<ClipboardChangedEvent>,
    monitoring: AtomicBool,
    disposed: AtomicBool,
    event_source: Mutex<Option<Box<dyn EventSource>>>,
}

impl Inner {
    fn ensure_live(&self) -> Result<()> {
        if self.disposed.load(Ordering::SeqCst) {
            Err(BridgeError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Run `op` on the executor under the retry policy.
    fn on_clipboard<T, F>(&self, default: T, mut op: F) -> Result<T>
    where
        T: Send,
        F: FnMut(&dyn ClipboardBackend) -> std::result::Result<T, BackendError> + Send,
    {
        self.ensure_live()?;

        let backend: &dyn ClipboardBackend = &*self.backend;
        let policy = &self.policy;
        let mut outcome = None;
        let slot = &mut outcome;
        self.executor.execute(Box::new(move || {
            *slot = Some(with_retry(policy, || op(backend)));
        }))?;

        match outcome {
            Some(Ok(Some(value))) => Ok(value),
            Some(Ok(None)) => Ok(default),
            Some(Err(err)) => Err(BridgeError::Unexpected(err)),
            None => Err(BridgeError::WorkerPanicked),
        }
    }

    fn read(&self) -> Result<Option<ClipboardData>> {
        let snapshot = self.on_clipboard(None, |backend| dispatch::read_snapshot(backend))?;
        Ok(snapshot.map(|s| ClipboardData::assemble(s.payload, s.data_type, s.formats, None)))
    }

    /// Read while looking up the foreground application on a second thread.
    fn read_with_source(&self) -> Result<Option<ClipboardData>> {
        let resolver: &dyn SourceResolver = &*self.resolver;
        let (snapshot, source) = thread::scope(|scope| {
            let attribution = thread::Builder::new()
                .name("clipboard-source".to_string())
                .spawn_scoped(scope, move || resolver.resolve());
            let snapshot = self.on_clipboard(None, |backend| dispatch::read_snapshot(backend));
            let source = match attribution {
                Ok(handle) => handle.join().unwrap_or_default(),
                Err(err) => {
                    debug!("could not start source lookup: {}", err);
                    None
                }
            };
            (snapshot, source)
        });

        Ok(snapshot?.map(|s| ClipboardData::assemble(s.payload, s.data_type, s.formats, source)))
    }

    fn handle_event(&self, event: PlatformEvent) {
        match event {
            PlatformEvent::ClipboardUpdated => self.handle_update(),
        }
    }

    fn handle_update(&self) {
        if self.disposed.load(Ordering::SeqCst) || !self.monitoring.load(Ordering::SeqCst) {
            trace!("clipboard update ignored while not monitoring");
            return;
        }
        if !self.debouncer.admit() {
            trace!("duplicate clipboard update suppressed");
            return;
        }

        match self.read_with_source() {
            Ok(Some(data)) => {
                debug!(data_type = %data.data_type(), source = ?data.source().map(|s| s.app_name()), "clipboard changed");
                // No receivers is not an error.
                let _ = self.events.send(ClipboardChangedEvent::new(data));
            }
            Ok(None) => debug!("clipboard update carried no readable data"),
            Err(err) => warn!("failed to read clipboard after update: {}", err),
        }
    }

    fn shutdown(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.monitoring.store(false, Ordering::SeqCst);
        let source = match self.event_source.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(mut source) = source {
            source.unsubscribe();
        }
        info!("clipboard bridge disposed");
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Clipboard binding over a [`ClipboardBackend`].
///
/// Cheap to clone; all clones share one event subscription. The bridge is
/// disposed explicitly through [`ClipboardManager::dispose`] or when the last
/// clone is dropped.
#[derive(Clone)]
pub struct ClipboardBridge {
    inner: Arc<Inner>,
}

impl ClipboardBridge {
    pub fn builder(backend: Arc<dyn ClipboardBackend>) -> ClipboardBridgeBuilder {
        ClipboardBridgeBuilder::new(backend)
    }

    /// Bridge with default settings, polling `backend` for changes.
    pub fn new(backend: Arc<dyn ClipboardBackend>) -> Result<Self> {
        Self::builder(backend).build()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.inner.policy
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClipboardManager for ClipboardBridge {
    fn get_clipboard_data(&self) -> Result<Option<ClipboardData>> {
        self.inner.read()
    }

    fn set_clipboard_data(&self, data: Option<&ClipboardData>) -> Result<()> {
        let Some(data) = data else {
            return self.clear_clipboard();
        };
        self.inner.ensure_live()?;
        let target = dispatch::write_target(data)?;
        debug!("Setting clipboard data of type: {}", data.data_type());
        self.inner.on_clipboard((), |backend| dispatch::write_to(backend, &target))
    }

    fn get_clipboard_data_type(&self) -> Result<ClipboardDataType> {
        self.inner.on_clipboard(ClipboardDataType::Unknown, |backend| dispatch::detect_type(backend))
    }

    fn clear_clipboard(&self) -> Result<()> {
        debug!("Clearing clipboard");
        self.inner.on_clipboard((), |backend| backend.clear())
    }

    fn is_clipboard_empty(&self) -> Result<bool> {
        self.inner.on_clipboard(true, |backend| dispatch::is_empty(backend))
    }

    async fn get_clipboard_data_async(&self) -> Result<Option<ClipboardData>> {
        let bridge = self.clone();
        tokio::task::spawn_blocking(move || bridge.get_clipboard_data()).await?
    }

    async fn set_clipboard_data_async(&self, data: Option<ClipboardData>) -> Result<()> {
        let bridge = self.clone();
        tokio::task::spawn_blocking(move || bridge.set_clipboard_data(data.as_ref())).await?
    }

    async fn get_clipboard_data_type_async(&self) -> Result<ClipboardDataType> {
        let bridge = self.clone();
        tokio::task::spawn_blocking(move || bridge.get_clipboard_data_type()).await?
    }

    async fn clear_clipboard_async(&self) -> Result<()> {
        let bridge = self.clone();
        tokio::task::spawn_blocking(move || bridge.clear_clipboard()).await?
    }

    async fn is_clipboard_empty_async(&self) -> Result<bool> {
        let bridge = self.clone();
        tokio::task::spawn_blocking(move || bridge.is_clipboard_empty()).await?
    }

    fn start_monitoring(&self) -> Result<()> {
        self.inner.ensure_live()?;
        if !self.inner.monitoring.swap(true, Ordering::SeqCst) {
            info!("clipboard monitoring started");
        }
        Ok(())
    }

    fn stop_monitoring(&self) -> Result<()> {
        self.inner.ensure_live()?;
        if self.inner.monitoring.swap(false, Ordering::SeqCst) {
            info!("clipboard monitoring stopped");
        }
        Ok(())
    }

    fn is_monitoring(&self) -> bool {
        self.inner.monitoring.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> Result<broadcast::Receiver<ClipboardChangedEvent>> {
        self.inner.ensure_live()?;
        Ok(self.inner.events.subscribe())
    }

    fn dispose(&self) {
        self.inner.shutdown();
    }
}

impl fmt::Debug for ClipboardBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipboardBridge")
            .field("policy", &self.inner.policy)
            .field("debounce", &self.inner.debouncer.window())
            .field("monitoring", &self.is_monitoring())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

pub struct ClipboardBridgeBuilder {
    backend: Arc<dyn ClipboardBackend>,
    executor: Box<dyn Executor>,
    resolver: Box<dyn SourceResolver>,
    policy: RetryPolicy,
    debounce: Duration,
    poll_interval: Duration,
    channel_capacity: usize,
    event_source: Option<Box<dyn EventSource>>,
}

impl ClipboardBridgeBuilder {
    fn new(backend: Arc<dyn ClipboardBackend>) -> Self {
        Self {
            backend,
            executor: Box::new(ThreadExecutor::default()),
            resolver: Box::new(ForegroundProcess),
            policy: RetryPolicy::default(),
            debounce: DEFAULT_DEBOUNCE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            event_source: None,
        }
    }

    pub fn executor(mut self, executor: impl Executor + 'static) -> Self {
        self.executor = Box::new(executor);
        self
    }

    pub fn resolver(mut self, resolver: impl SourceResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Where update notifications come from. Without one, the backend's
    /// change token is polled.
    pub fn event_source(mut self, source: impl EventSource + 'static) -> Self {
        self.event_source = Some(Box::new(source));
        self
    }

    pub fn config(mut self, config: &BridgeConfig) -> Self {
        self.policy = config.retry_policy();
        self.debounce = config.debounce();
        self.poll_interval = config.poll_interval();
        self.channel_capacity = config.monitor.channel_capacity;
        if !config.monitor.attribute_source {
            self.resolver = Box::new(NoSource);
        }
        self
    }

    /// Subscribe to the event source and start monitoring.
    pub fn build(self) -> Result<ClipboardBridge> {
        if self.channel_capacity == 0 {
            return Err(BridgeError::InvalidArgument("channel capacity must be positive".to_string()));
        }
        if self.policy.max_attempts == 0 {
            return Err(BridgeError::InvalidArgument("retry policy needs at least one attempt".to_string()));
        }

        let mut source = match self.event_source {
            Some(source) => source,
            None => Box::new(PollingSource::new(Arc::clone(&self.backend), self.poll_interval)?),
        };

        let (events, _) = broadcast::channel(self.channel_capacity);
        let inner = Arc::new(Inner {
            backend: self.backend,
            executor: self.executor,
            resolver: self.resolver,
            policy: self.policy,
            debouncer: Debouncer::new(self.debounce),
            events,
            monitoring: AtomicBool::new(true),
            disposed: AtomicBool::new(false),
            event_source: Mutex::new(None),
        });

        source.subscribe(event_sink(Arc::downgrade(&inner)))?;
        match inner.event_source.lock() {
            Ok(mut guard) => *guard = Some(source),
            Err(poisoned) => *poisoned.into_inner() = Some(source),
        }

        debug!(
            max_attempts = inner.policy.max_attempts,
            debounce_ms = inner.debouncer.window().as_millis() as u64,
            "clipboard bridge ready"
        );
        Ok(ClipboardBridge { inner })
    }
}

fn event_sink(inner: Weak<Inner>) -> EventSink {
    Arc::new(move |event| {
        if let Some(inner) = inner.upgrade() {
            inner.handle_event(event);
        }
    })
}

impl fmt::Debug for ClipboardBridgeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipboardBridgeBuilder")
            .field("policy", &self.policy)
            .field("debounce", &self.debounce)
            .field("poll_interval", &self.poll_interval)
            .field("channel_capacity", &self.channel_capacity)
            .field("event_source", &self.event_source.is_some())
            .finish_non_exhaustive()
    }
}
