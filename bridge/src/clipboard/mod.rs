use crate::bitmap::Bitmap;
use crate::error::BackendError;

/// Native payload kinds the bridge knows how to detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    Text,
    FileList,
    Image,
}

/// Primitive clipboard operations a platform must provide.
///
/// Every call is self-contained: implementations open and release the native
/// clipboard themselves and report a contended clipboard as
/// [`BackendError::Busy`] so the caller can retry.
pub trait ClipboardBackend: Send + Sync {
    fn contains(&self, kind: NativeKind) -> Result<bool, BackendError>;

    /// Names of every format currently offered.
    ///
    /// Native order where the platform keeps one; otherwise a stable order.
    fn formats(&self) -> Result<Vec<String>, BackendError>;

    fn read_text(&self) -> Result<String, BackendError>;
    fn read_file_list(&self) -> Result<Vec<String>, BackendError>;
    fn read_image(&self) -> Result<Bitmap, BackendError>;

    /// Raw bytes stored under `format`, `None` when the format holds nothing.
    fn read_raw(&self, format: &str) -> Result<Option<Vec<u8>>, BackendError>;

    fn write_text(&self, text: &str) -> Result<(), BackendError>;
    fn write_file_list(&self, paths: &[String]) -> Result<(), BackendError>;
    fn write_image(&self, image: &Bitmap) -> Result<(), BackendError>;
    fn write_raw(&self, format: &str, bytes: &[u8]) -> Result<(), BackendError>;

    fn clear(&self) -> Result<(), BackendError>;

    /// Make written data outlive the writing process.
    fn flush(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Opaque value that changes whenever the clipboard content changes.
    fn change_token(&self) -> Option<u64> {
        None
    }
}

mod memory;
pub use memory::MemoryClipboard;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "windows")]
pub(crate) mod windows;

#[cfg(target_os = "linux")]
pub use linux::LinuxClipboard as SystemClipboard;
#[cfg(target_os = "windows")]
pub use windows::WindowsClipboard as SystemClipboard;
#[cfg(target_os = "windows")]
pub use windows::WindowHook;
