//! Translation between [`ClipboardData`] and backend primitives.
//!
//! Every function here is one clipboard attempt; callers wrap them in
//! [`crate::retry::with_retry`].

use tracing::trace;

use crate::bitmap::Bitmap;
use crate::clipboard::{ClipboardBackend, NativeKind};
use crate::data::{ClipboardData, ClipboardDataType, Payload, BITMAP, FILE_DROP, UNICODE_TEXT};
use crate::error::{BackendError, BridgeError};

/// First matching kind wins, in this order.
pub(crate) fn detect_type(backend: &dyn ClipboardBackend) -> Result<ClipboardDataType, BackendError> {
    let kind = if backend.contains(NativeKind::Text)? {
        ClipboardDataType::Text
    } else if backend.contains(NativeKind::FileList)? {
        ClipboardDataType::PathList
    } else if backend.contains(NativeKind::Image)? {
        ClipboardDataType::Image
    } else {
        ClipboardDataType::Unknown
    };
    Ok(kind)
}

/// Clipboard content before attribution.
#[derive(Debug)]
pub(crate) struct Snapshot {
    pub data_type: ClipboardDataType,
    pub payload: Payload,
    pub formats: Vec<String>,
}

impl Snapshot {
    fn tagged(data_type: ClipboardDataType, payload: Payload, tag: &str) -> Self {
        Self { data_type, payload, formats: vec![tag.to_string()] }
    }
}

pub(crate) fn read_snapshot(backend: &dyn ClipboardBackend) -> Result<Option<Snapshot>, BackendError> {
    let snapshot = match detect_type(backend)? {
        ClipboardDataType::Text => Snapshot::tagged(
            ClipboardDataType::Text,
            Payload::Text(backend.read_text()?),
            UNICODE_TEXT,
        ),
        ClipboardDataType::PathList => Snapshot::tagged(
            ClipboardDataType::PathList,
            Payload::PathList(backend.read_file_list()?),
            FILE_DROP,
        ),
        ClipboardDataType::Image => Snapshot::tagged(
            ClipboardDataType::Image,
            Payload::Image(backend.read_image()?),
            BITMAP,
        ),
        ClipboardDataType::Unknown => {
            let formats = backend.formats()?;
            let Some(first) = formats.first() else {
                trace!("clipboard offers no formats");
                return Ok(None);
            };
            let Some(bytes) = backend.read_raw(first)? else {
                trace!(format = %first, "first clipboard format holds no data");
                return Ok(None);
            };
            Snapshot { data_type: ClipboardDataType::Unknown, payload: Payload::Bytes(bytes), formats }
        }
    };
    Ok(Some(snapshot))
}

/// Where a payload lands on the clipboard.
#[derive(Debug)]
pub(crate) enum WriteTarget<'a> {
    Text(&'a str),
    Files(&'a [String]),
    Image(&'a Bitmap),
    Raw { format: &'a str, payload: &'a Payload },
}

/// Pick the writer for `data`.
///
/// Untyped payloads keyed by a canonical tag go through the typed writer for
/// that tag, since those formats need native encoding. A payload that does not
/// fit its canonical tag is rejected.
pub(crate) fn write_target(data: &ClipboardData) -> Result<WriteTarget<'_>, BridgeError> {
    let target = match (data.data_type(), data.payload()) {
        (ClipboardDataType::Text, Payload::Text(text)) => WriteTarget::Text(text),
        (ClipboardDataType::PathList, Payload::PathList(paths)) => WriteTarget::Files(paths),
        (ClipboardDataType::Image, Payload::Image(bitmap)) => WriteTarget::Image(bitmap),
        (_, payload) => {
            let format = data.first_format().unwrap_or_else(|| payload.type_name());
            match (format, payload) {
                (UNICODE_TEXT, Payload::Text(text)) => WriteTarget::Text(text),
                (FILE_DROP, Payload::PathList(paths)) => WriteTarget::Files(paths),
                (BITMAP, Payload::Image(bitmap)) => WriteTarget::Image(bitmap),
                (UNICODE_TEXT | FILE_DROP | BITMAP, payload) => {
                    return Err(BridgeError::InvalidArgument(format!(
                        "{} payload cannot be stored as {}",
                        payload.type_name(),
                        format
                    )));
                }
                (format, payload) => WriteTarget::Raw { format, payload },
            }
        }
    };
    Ok(target)
}

pub(crate) fn write_to(backend: &dyn ClipboardBackend, target: &WriteTarget<'_>) -> Result<(), BackendError> {
    match target {
        WriteTarget::Text(text) => backend.write_text(text)?,
        WriteTarget::Files(paths) => backend.write_file_list(paths)?,
        WriteTarget::Image(bitmap) => backend.write_image(bitmap)?,
        WriteTarget::Raw { format, payload } => {
            trace!(format, "writing raw clipboard payload");
            backend.write_raw(format, &payload.to_bytes()?)?;
        }
    }
    backend.flush()
}

pub(crate) fn is_empty(backend: &dyn ClipboardBackend) -> Result<bool, BackendError> {
    let formats = backend.formats()?;
    match formats.first() {
        None => Ok(true),
        Some(first) => Ok(backend.read_raw(first)?.is_none()),
    }
}
