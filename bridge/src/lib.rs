//! Managed access to the desktop clipboard.
//!
//! [`ClipboardBridge`] reads and writes text, file lists, bitmaps and raw
//! formats through a platform [`ClipboardBackend`], retrying while another
//! process holds the clipboard, and broadcasts a [`ClipboardChangedEvent`] for
//! every external update an [`EventSource`] reports.
//!
//! ```no_run
//! use std::sync::Arc;
//! use clipboard_bridge::{ClipboardBridge, ClipboardData, ClipboardManager, SystemClipboard};
//!
//! # fn main() -> clipboard_bridge::Result<()> {
//! let bridge = ClipboardBridge::new(Arc::new(SystemClipboard::new()))?;
//! bridge.set_clipboard_data(Some(&ClipboardData::text("hello")))?;
//! if let Some(data) = bridge.get_clipboard_data()? {
//!     println!("{}", data);
//! }
//! # Ok(())
//! # }
//! ```

pub mod attribution;
pub mod bitmap;
pub mod clipboard;
pub mod config;
pub mod data;
pub mod debounce;
mod dispatch;
pub mod error;
pub mod events;
pub mod executor;
pub mod manager;
pub mod retry;
pub mod source;

pub use attribution::{ForegroundProcess, NoSource, SourceResolver};
pub use bitmap::{Bitmap, ImageEncoding};
pub use clipboard::{ClipboardBackend, MemoryClipboard, NativeKind};
#[cfg(any(target_os = "linux", target_os = "windows"))]
pub use clipboard::SystemClipboard;
#[cfg(target_os = "windows")]
pub use clipboard::WindowHook;
pub use config::{BridgeConfig, MonitorConfig, RetryConfig};
pub use data::{ClipboardChangedEvent, ClipboardData, ClipboardDataType, Payload, BITMAP, FILE_DROP, UNICODE_TEXT};
pub use debounce::Debouncer;
pub use error::{BackendError, BridgeError, Result};
pub use events::{EventEmitter, EventSink, EventSource, PlatformEvent, PollingSource, SyntheticEventSource};
pub use executor::{Executor, InlineExecutor, Job, ThreadExecutor};
pub use manager::{ClipboardBridge, ClipboardBridgeBuilder, ClipboardManager};
pub use retry::{with_retry, RetryPolicy};
pub use source::ClipboardSource;
