use std::sync::{Mutex, MutexGuard};

use super::{ClipboardBackend, NativeKind};
use crate::bitmap::Bitmap;
use crate::data::{BITMAP, FILE_DROP, UNICODE_TEXT};
use crate::error::BackendError;

#[derive(Debug, Clone)]
enum Entry {
    Text(String),
    Files(Vec<String>),
    Image(Bitmap),
    Raw(Vec<u8>),
}

#[derive(Debug, Default)]
struct State {
    entries: Vec<(String, Entry)>,
    generation: u64,
    busy_for: u32,
    fatal: Option<String>,
    attempts: u64,
    writes: u64,
    flushes: u64,
}

/// Process-local clipboard.
///
/// Behaves like a native clipboard that holds one logical payload under one or
/// more named formats. Contention and platform failures can be injected.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    state: Mutex<State>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report the clipboard as busy for the next `attempts` operations.
    pub fn fail_next(&self, attempts: u32) {
        self.lock().busy_for = attempts;
    }

    /// Fail the next operation with a non-transient platform error.
    pub fn fail_fatally(&self, message: impl Into<String>) {
        self.lock().fatal = Some(message.into());
    }

    /// Place raw data under an arbitrary format, replacing the content.
    pub fn put_raw(&self, format: impl Into<String>, bytes: Vec<u8>) {
        let mut state = self.lock();
        state.entries = vec![(format.into(), Entry::Raw(bytes))];
        state.generation += 1;
    }

    /// Add a format alongside the current content.
    pub fn add_raw(&self, format: impl Into<String>, bytes: Vec<u8>) {
        let mut state = self.lock();
        state.entries.push((format.into(), Entry::Raw(bytes)));
        state.generation += 1;
    }

    /// Every operation started, including the ones that failed.
    pub fn attempts(&self) -> u64 {
        self.lock().attempts
    }

    pub fn writes(&self) -> u64 {
        self.lock().writes
    }

    pub fn flushes(&self) -> u64 {
        self.lock().flushes
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn open(&self) -> Result<MutexGuard<'_, State>, BackendError> {
        let mut state = self.lock();
        state.attempts += 1;
        if let Some(message) = state.fatal.take() {
            return Err(BackendError::Platform(message));
        }
        if state.busy_for > 0 {
            state.busy_for -= 1;
            return Err(BackendError::Busy);
        }
        Ok(state)
    }

    fn replace(&self, format: &str, entry: Entry) -> Result<(), BackendError> {
        let mut state = self.open()?;
        state.entries = vec![(format.to_string(), entry)];
        state.generation += 1;
        state.writes += 1;
        Ok(())
    }
}

fn find<'a>(state: &'a State, format: &str) -> Option<&'a Entry> {
    state.entries.iter().find(|(name, _)| name == format).map(|(_, entry)| entry)
}

fn missing(format: &str) -> BackendError {
    BackendError::Platform(format!("format {} is not on the clipboard", format))
}

impl ClipboardBackend for MemoryClipboard {
    fn contains(&self, kind: NativeKind) -> Result<bool, BackendError> {
        let state = self.open()?;
        let format = match kind {
            NativeKind::Text => UNICODE_TEXT,
            NativeKind::FileList => FILE_DROP,
            NativeKind::Image => BITMAP,
        };
        Ok(find(&state, format).is_some())
    }

    fn formats(&self) -> Result<Vec<String>, BackendError> {
        let state = self.open()?;
        Ok(state.entries.iter().map(|(name, _)| name.clone()).collect())
    }

    fn read_text(&self) -> Result<String, BackendError> {
        let state = self.open()?;
        match find(&state, UNICODE_TEXT) {
            Some(Entry::Text(text)) => Ok(text.clone()),
            _ => Err(missing(UNICODE_TEXT)),
        }
    }

    fn read_file_list(&self) -> Result<Vec<String>, BackendError> {
        let state = self.open()?;
        match find(&state, FILE_DROP) {
            Some(Entry::Files(paths)) => Ok(paths.clone()),
            _ => Err(missing(FILE_DROP)),
        }
    }

    fn read_image(&self) -> Result<Bitmap, BackendError> {
        let state = self.open()?;
        match find(&state, BITMAP) {
            Some(Entry::Image(bitmap)) => Ok(bitmap.clone()),
            _ => Err(missing(BITMAP)),
        }
    }

    fn read_raw(&self, format: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let state = self.open()?;
        let bytes = match find(&state, format) {
            None => None,
            Some(Entry::Raw(bytes)) => Some(bytes.clone()),
            Some(Entry::Text(text)) => Some(text.as_bytes().to_vec()),
            Some(Entry::Files(paths)) => Some(paths.join("\n").into_bytes()),
            Some(Entry::Image(bitmap)) => Some(bitmap.pixels().to_vec()),
        };
        Ok(bytes)
    }

    fn write_text(&self, text: &str) -> Result<(), BackendError> {
        self.replace(UNICODE_TEXT, Entry::Text(text.to_string()))
    }

    fn write_file_list(&self, paths: &[String]) -> Result<(), BackendError> {
        self.replace(FILE_DROP, Entry::Files(paths.to_vec()))
    }

    fn write_image(&self, image: &Bitmap) -> Result<(), BackendError> {
        self.replace(BITMAP, Entry::Image(image.clone()))
    }

    fn write_raw(&self, format: &str, bytes: &[u8]) -> Result<(), BackendError> {
        let entry = match format {
            UNICODE_TEXT => Entry::Text(String::from_utf8_lossy(bytes).into_owned()),
            _ => Entry::Raw(bytes.to_vec()),
        };
        self.replace(format, entry)
    }

    fn clear(&self) -> Result<(), BackendError> {
        let mut state = self.open()?;
        if !state.entries.is_empty() {
            state.entries.clear();
            state.generation += 1;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), BackendError> {
        self.open()?.flushes += 1;
        Ok(())
    }

    fn change_token(&self) -> Option<u64> {
        Some(self.lock().generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_write_replaces_content() {
        let clipboard = MemoryClipboard::new();
        clipboard.put_raw("Custom", vec![1, 2]);
        clipboard.write_text("hello").unwrap();
        assert_eq!(clipboard.formats().unwrap(), vec![UNICODE_TEXT.to_string()]);
        assert!(clipboard.contains(NativeKind::Text).unwrap());
        assert!(!clipboard.contains(NativeKind::Image).unwrap());
        assert_eq!(clipboard.read_text().unwrap(), "hello");
        assert_eq!(clipboard.read_raw("Custom").unwrap(), None);
    }

    #[test]
    fn injected_contention_is_transient() {
        let clipboard = MemoryClipboard::new();
        clipboard.fail_next(2);
        assert!(matches!(clipboard.formats(), Err(BackendError::Busy)));
        assert!(matches!(clipboard.formats(), Err(BackendError::Busy)));
        assert!(clipboard.formats().unwrap().is_empty());
        assert_eq!(clipboard.attempts(), 3);
    }

    #[test]
    fn injected_fault_fires_once() {
        let clipboard = MemoryClipboard::new();
        clipboard.fail_fatally("device lost");
        assert!(matches!(clipboard.clear(), Err(BackendError::Platform(_))));
        assert!(clipboard.clear().is_ok());
    }

    #[test]
    fn token_moves_on_every_change() {
        let clipboard = MemoryClipboard::new();
        let initial = clipboard.change_token();
        clipboard.write_text("a").unwrap();
        let after_write = clipboard.change_token();
        assert_ne!(initial, after_write);
        clipboard.clear().unwrap();
        assert_ne!(after_write, clipboard.change_token());
        let cleared = clipboard.change_token();
        clipboard.clear().unwrap();
        assert_eq!(cleared, clipboard.change_token());
    }

    #[test]
    fn extra_formats_keep_their_order() {
        let clipboard = MemoryClipboard::new();
        clipboard.put_raw("Rich Text Format", b"{\\rtf1}".to_vec());
        clipboard.add_raw("HTML Format", b"<b>x</b>".to_vec());
        assert_eq!(
            clipboard.formats().unwrap(),
            vec!["Rich Text Format".to_string(), "HTML Format".to_string()]
        );
        assert_eq!(clipboard.read_raw("HTML Format").unwrap(), Some(b"<b>x</b>".to_vec()));
    }
}
