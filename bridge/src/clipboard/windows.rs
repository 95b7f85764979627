use std::num::NonZeroU32;
use std::ptr;
use std::sync::OnceLock;

use clipboard_win::{formats, raw, Clipboard};
use tracing::{debug, warn};
use windows_sys::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows_sys::Win32::System::DataExchange::{AddClipboardFormatListener, RemoveClipboardFormatListener};
use windows_sys::Win32::System::Threading::GetCurrentThreadId;
use windows_sys::Win32::UI::Shell::{DefSubclassProc, RemoveWindowSubclass, SetWindowSubclass};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    GetForegroundWindow, GetWindowThreadProcessId, PostMessageW, RegisterWindowMessageW, WM_CLIPBOARDUPDATE,
};

use super::{ClipboardBackend, NativeKind};
use crate::bitmap::{Bitmap, ImageEncoding};
use crate::data::{BITMAP, FILE_DROP, UNICODE_TEXT};
use crate::error::{BackendError, BridgeError, Result as BridgeResult};
use crate::events::{EventSink, EventSource, PlatformEvent};

/// Standard clipboard formats, named the way .NET data formats name them.
const STANDARD_FORMATS: [(u32, &str); 12] = [
    (formats::CF_TEXT, "Text"),
    (formats::CF_BITMAP, BITMAP),
    (3, "MetaFilePict"),
    (4, "SymbolicLink"),
    (5, "DataInterchangeFormat"),
    (formats::CF_OEMTEXT, "OEMText"),
    (formats::CF_DIB, "DeviceIndependentBitmap"),
    (9, "Palette"),
    (formats::CF_UNICODETEXT, UNICODE_TEXT),
    (14, "EnhancedMetafile"),
    (formats::CF_HDROP, FILE_DROP),
    (16, "Locale"),
];

/// Formats whose clipboard data is a GDI handle rather than global memory.
const HANDLE_FORMATS: [u32; 4] = [formats::CF_BITMAP, 3, 9, 14];

fn format_name(id: u32) -> String {
    STANDARD_FORMATS
        .iter()
        .find(|(standard, _)| *standard == id)
        .map(|(_, name)| (*name).to_string())
        .or_else(|| raw::format_name_big(id))
        .unwrap_or_else(|| format!("Format{}", id))
}

fn format_id(name: &str) -> Result<u32, BackendError> {
    if let Some((id, _)) = STANDARD_FORMATS.iter().find(|(_, standard)| *standard == name) {
        return Ok(*id);
    }
    if let Some(id) = name.strip_prefix("Format").and_then(|n| n.parse::<u32>().ok()) {
        return Ok(id);
    }
    raw::register_format(name)
        .map(NonZeroU32::get)
        .ok_or_else(|| BackendError::Platform(format!("cannot register clipboard format {}", name)))
}

fn platform(context: &str, err: impl std::fmt::Display) -> BackendError {
    BackendError::Platform(format!("{}: {}", context, err))
}

/// Win32 clipboard.
///
/// Each primitive opens the clipboard on the calling thread and closes it on
/// return. Failing to open is reported as [`BackendError::Busy`].
#[derive(Debug, Default)]
pub struct WindowsClipboard;

impl WindowsClipboard {
    pub fn new() -> Self {
        Self
    }

    fn open(&self) -> Result<Clipboard, BackendError> {
        Clipboard::new().map_err(|e| {
            debug!("OpenClipboard failed: {}", e);
            BackendError::Busy
        })
    }
}

impl ClipboardBackend for WindowsClipboard {
    fn contains(&self, kind: NativeKind) -> Result<bool, BackendError> {
        let _clip = self.open()?;
        Ok(match kind {
            NativeKind::Text => raw::is_format_avail(formats::CF_UNICODETEXT),
            NativeKind::FileList => raw::is_format_avail(formats::CF_HDROP),
            NativeKind::Image => {
                raw::is_format_avail(formats::CF_BITMAP) || raw::is_format_avail(formats::CF_DIB)
            }
        })
    }

    fn formats(&self) -> Result<Vec<String>, BackendError> {
        let _clip = self.open()?;
        Ok(raw::EnumFormats::new().map(format_name).collect())
    }

    fn read_text(&self) -> Result<String, BackendError> {
        let _clip = self.open()?;
        let mut out = Vec::new();
        raw::get_string(&mut out).map_err(|e| platform("read text", e))?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    fn read_file_list(&self) -> Result<Vec<String>, BackendError> {
        let _clip = self.open()?;
        let mut paths = Vec::new();
        raw::get_file_list(&mut paths).map_err(|e| platform("read file list", e))?;
        Ok(paths)
    }

    fn read_image(&self) -> Result<Bitmap, BackendError> {
        let _clip = self.open()?;
        let mut bmp = Vec::new();
        raw::get_bitmap(&mut bmp).map_err(|e| platform("read bitmap", e))?;
        Bitmap::decode(&bmp, ImageEncoding::Bmp)
    }

    fn read_raw(&self, format: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let id = format_id(format)?;
        let _clip = self.open()?;
        if !raw::is_format_avail(id) {
            return Ok(None);
        }
        let mut out = Vec::new();
        if id == formats::CF_BITMAP {
            raw::get_bitmap(&mut out).map_err(|e| platform("read bitmap", e))?;
            return Ok(Some(out));
        }
        // Handle-based formats (metafiles, palettes) expose no global memory.
        if raw::size(id).is_none() {
            return Ok(None);
        }
        raw::get_vec(id, &mut out).map_err(|e| platform(format, e))?;
        Ok(Some(out))
    }

    fn write_text(&self, text: &str) -> Result<(), BackendError> {
        let _clip = self.open()?;
        raw::empty().map_err(|e| platform("empty", e))?;
        raw::set_string(text).map_err(|e| platform("write text", e))?;
        debug!("Set text content on Windows: {} chars", text.len());
        Ok(())
    }

    fn write_file_list(&self, paths: &[String]) -> Result<(), BackendError> {
        let _clip = self.open()?;
        raw::empty().map_err(|e| platform("empty", e))?;
        raw::set_file_list(paths).map_err(|e| platform("write file list", e))
    }

    fn write_image(&self, image: &Bitmap) -> Result<(), BackendError> {
        let bmp = image.encode(ImageEncoding::Bmp)?;
        let _clip = self.open()?;
        raw::empty().map_err(|e| platform("empty", e))?;
        raw::set_bitmap(&bmp).map_err(|e| platform("write bitmap", e))
    }

    fn write_raw(&self, format: &str, bytes: &[u8]) -> Result<(), BackendError> {
        let id = format_id(format)?;
        if HANDLE_FORMATS.contains(&id) {
            return Err(BackendError::Platform(format!("{} cannot be written from raw bytes", format)));
        }
        let _clip = self.open()?;
        raw::empty().map_err(|e| platform("empty", e))?;
        raw::set_without_clear(id, bytes).map_err(|e| platform(format, e))
    }

    fn clear(&self) -> Result<(), BackendError> {
        let _clip = self.open()?;
        raw::empty().map_err(|e| platform("empty", e))
    }

    fn change_token(&self) -> Option<u64> {
        raw::seq_num().map(|seq| u64::from(seq.get()))
    }
}

/// Process id owning the current foreground window.
pub(crate) fn foreground_pid() -> Option<u32> {
    let hwnd = unsafe { GetForegroundWindow() };
    if hwnd == 0 {
        return None;
    }
    let mut pid = 0u32;
    unsafe { GetWindowThreadProcessId(hwnd, &mut pid) };
    (pid != 0).then_some(pid)
}

const SUBCLASS_ID: usize = 0x0C1B;

/// Asks the window's own thread to detach the hook whose slot is in `wparam`.
fn detach_message() -> u32 {
    static MESSAGE: OnceLock<u32> = OnceLock::new();
    *MESSAGE.get_or_init(|| {
        let name: Vec<u16> = "ClipboardBridge.Detach\0".encode_utf16().collect();
        unsafe { RegisterWindowMessageW(name.as_ptr()) }
    })
}

/// Leave the listener chain and drop the subclass, then free `slot`.
///
/// Must run on the thread that owns `hwnd`; the slot leaks if the subclass
/// cannot be removed, since the window procedure may still read it.
unsafe fn detach(hwnd: HWND, slot: *mut EventSink) {
    RemoveClipboardFormatListener(hwnd);
    if RemoveWindowSubclass(hwnd, Some(clipboard_subclass_proc), SUBCLASS_ID) == 0 {
        warn!(hwnd, "could not remove clipboard subclass; leaking its event sink");
        return;
    }
    drop(Box::from_raw(slot));
    debug!(hwnd, "removed clipboard format listener");
}

unsafe extern "system" fn clipboard_subclass_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
    _id: usize,
    ref_data: usize,
) -> LRESULT {
    // Requests for a slot this subclass no longer carries are ignored.
    if msg != 0 && msg == detach_message() && ref_data != 0 && wparam == ref_data {
        detach(hwnd, ref_data as *mut EventSink);
        return 0;
    }
    if msg == WM_CLIPBOARDUPDATE && ref_data != 0 {
        // Clone first: the handler may unsubscribe and free the slot.
        let sink = (*(ref_data as *const EventSink)).clone();
        sink(PlatformEvent::ClipboardUpdated);
    }
    DefSubclassProc(hwnd, msg, wparam, lparam)
}

/// Clipboard-update notifications delivered through a host window.
///
/// The window is subclassed and registered as a clipboard format listener.
/// Subscribe from the thread that owns the window. Unsubscribing elsewhere
/// posts the teardown to that thread, so it completes once the host pumps
/// messages again.
#[derive(Debug)]
pub struct WindowHook {
    hwnd: HWND,
    sink: Option<*mut EventSink>,
}

// The raw sink pointer is only dereferenced by the window procedure.
unsafe impl Send for WindowHook {}

impl WindowHook {
    pub fn new(hwnd: HWND) -> BridgeResult<Self> {
        if hwnd == 0 {
            return Err(BridgeError::InvalidArgument("window handle cannot be null".to_string()));
        }
        Ok(Self { hwnd, sink: None })
    }

    pub fn hwnd(&self) -> HWND {
        self.hwnd
    }
}

impl EventSource for WindowHook {
    fn subscribe(&mut self, sink: EventSink) -> BridgeResult<()> {
        self.unsubscribe();
        let slot = Box::into_raw(Box::new(sink));
        unsafe {
            if SetWindowSubclass(self.hwnd, Some(clipboard_subclass_proc), SUBCLASS_ID, slot as usize) == 0 {
                drop(Box::from_raw(slot));
                return Err(BridgeError::Registration("could not subclass the host window".to_string()));
            }
            if AddClipboardFormatListener(self.hwnd) == 0 {
                RemoveWindowSubclass(self.hwnd, Some(clipboard_subclass_proc), SUBCLASS_ID);
                drop(Box::from_raw(slot));
                return Err(BridgeError::Registration(
                    "could not join the clipboard format listener chain".to_string(),
                ));
            }
        }
        self.sink = Some(slot);
        debug!(hwnd = self.hwnd, "registered clipboard format listener");
        Ok(())
    }

    fn unsubscribe(&mut self) {
        let Some(slot) = self.sink.take() else {
            return;
        };
        let owner = unsafe { GetWindowThreadProcessId(self.hwnd, ptr::null_mut()) };
        if owner != 0 && owner == unsafe { GetCurrentThreadId() } {
            unsafe { detach(self.hwnd, slot) };
            return;
        }
        let message = detach_message();
        if message == 0 || unsafe { PostMessageW(self.hwnd, message, slot as usize, 0) } == 0 {
            warn!(hwnd = self.hwnd, "window thread unreachable; leaking clipboard event sink");
            return;
        }
        debug!(hwnd = self.hwnd, "posted clipboard listener teardown to the window thread");
    }
}

impl Drop for WindowHook {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
