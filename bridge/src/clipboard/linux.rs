use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::io::Read;
use std::path::Path;

use tracing::debug;
use url::Url;
use wl_clipboard_rs::{
    copy::{self, copy_multi, MimeSource, MimeType as CopyMimeType, Options, Source},
    paste::{self, get_contents, get_mime_types, ClipboardType, MimeType, Seat},
};

use super::{ClipboardBackend, NativeKind};
use crate::bitmap::{Bitmap, ImageEncoding};
use crate::error::BackendError;

const URI_LIST: &str = "text/uri-list";
const PNG: &str = "image/png";
const TEXT_TARGETS: [&str; 4] = ["UTF8_STRING", "STRING", "TEXT", "text/plain"];

/// Wayland clipboard, reached through the data-control protocol.
///
/// MIME types stand in for clipboard formats. Written data is served by a
/// background copy process, so it survives this process exiting.
#[derive(Debug, Default)]
pub struct LinuxClipboard;

impl LinuxClipboard {
    pub fn new() -> Self {
        Self
    }

    fn offered(&self) -> Result<HashSet<String>, BackendError> {
        match get_mime_types(ClipboardType::Regular, Seat::Unspecified) {
            Ok(types) => Ok(types),
            Err(paste::Error::ClipboardEmpty) | Err(paste::Error::NoSeats) => Ok(HashSet::new()),
            Err(e) => Err(BackendError::Platform(e.to_string())),
        }
    }

    fn fetch(&self, mime_type: MimeType) -> Result<Option<Vec<u8>>, BackendError> {
        match get_contents(ClipboardType::Regular, Seat::Unspecified, mime_type) {
            Ok((mut pipe, _)) => {
                let mut contents = Vec::new();
                pipe.read_to_end(&mut contents)?;
                Ok(Some(contents))
            }
            Err(paste::Error::ClipboardEmpty)
            | Err(paste::Error::NoMimeType)
            | Err(paste::Error::NoSeats) => Ok(None),
            Err(e) => {
                debug!("Failed to read clipboard via wl-clipboard-rs: {}", e);
                Err(BackendError::Platform(e.to_string()))
            }
        }
    }

    fn offer(&self, bytes: Vec<u8>, mime_type: CopyMimeType) -> Result<(), BackendError> {
        let source = MimeSource { source: Source::Bytes(bytes.into_boxed_slice()), mime_type };
        copy_multi(Options::new(), vec![source]).map_err(|e| BackendError::Platform(e.to_string()))
    }
}

// Offers carry no order, so sort for a stable first format.
fn sorted(offered: HashSet<String>) -> Vec<String> {
    let mut formats: Vec<String> = offered.into_iter().collect();
    formats.sort();
    formats
}

fn is_text(mime_type: &str) -> bool {
    mime_type.starts_with("text/plain") || TEXT_TARGETS.contains(&mime_type)
}

fn parse_uri_list(list: &str) -> Vec<String> {
    list.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            Url::parse(line)
                .ok()
                .and_then(|url| url.to_file_path().ok())
                .map(|path| path.to_string_lossy().into_owned())
                .unwrap_or_else(|| line.to_string())
        })
        .collect()
}

fn to_uri_list(paths: &[String]) -> String {
    paths
        .iter()
        .map(|path| {
            Url::from_file_path(Path::new(path))
                .map(String::from)
                .unwrap_or_else(|_| path.clone())
        })
        .map(|uri| uri + "\r\n")
        .collect()
}

impl ClipboardBackend for LinuxClipboard {
    fn contains(&self, kind: NativeKind) -> Result<bool, BackendError> {
        let offered = self.offered()?;
        Ok(match kind {
            NativeKind::Text => offered.iter().any(|mime| is_text(mime)),
            NativeKind::FileList => offered.contains(URI_LIST),
            NativeKind::Image => offered.contains(PNG),
        })
    }

    fn formats(&self) -> Result<Vec<String>, BackendError> {
        Ok(sorted(self.offered()?))
    }

    fn read_text(&self) -> Result<String, BackendError> {
        let bytes = self.fetch(MimeType::Text)?.unwrap_or_default();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn read_file_list(&self) -> Result<Vec<String>, BackendError> {
        let bytes = self.fetch(MimeType::Specific(URI_LIST))?.unwrap_or_default();
        Ok(parse_uri_list(&String::from_utf8_lossy(&bytes)))
    }

    fn read_image(&self) -> Result<Bitmap, BackendError> {
        let bytes = self
            .fetch(MimeType::Specific(PNG))?
            .ok_or_else(|| BackendError::Platform("no image/png offer on the clipboard".to_string()))?;
        Bitmap::decode(&bytes, ImageEncoding::Png)
    }

    fn read_raw(&self, format: &str) -> Result<Option<Vec<u8>>, BackendError> {
        Ok(self.fetch(MimeType::Specific(format))?.filter(|bytes| !bytes.is_empty()))
    }

    fn write_text(&self, text: &str) -> Result<(), BackendError> {
        self.offer(text.as_bytes().to_vec(), CopyMimeType::Text)?;
        debug!("Successfully set text content: {} chars", text.len());
        Ok(())
    }

    fn write_file_list(&self, paths: &[String]) -> Result<(), BackendError> {
        self.offer(to_uri_list(paths).into_bytes(), CopyMimeType::Specific(URI_LIST.to_string()))
    }

    fn write_image(&self, image: &Bitmap) -> Result<(), BackendError> {
        let png = image.encode(ImageEncoding::Png)?;
        self.offer(png, CopyMimeType::Specific(PNG.to_string()))
    }

    fn write_raw(&self, format: &str, bytes: &[u8]) -> Result<(), BackendError> {
        self.offer(bytes.to_vec(), CopyMimeType::Specific(format.to_string()))
    }

    fn clear(&self) -> Result<(), BackendError> {
        copy::clear(copy::ClipboardType::Regular, copy::Seat::All)
            .map_err(|e| BackendError::Platform(e.to_string()))
    }

    fn change_token(&self) -> Option<u64> {
        let mut hasher = DefaultHasher::new();
        let formats = self.formats().ok()?;
        formats.hash(&mut hasher);
        if formats.iter().any(|mime| is_text(mime)) {
            if let Ok(text) = self.read_text() {
                text.hash(&mut hasher);
            }
        }
        Some(hasher.finish())
    }
}
