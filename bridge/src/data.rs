//! Clipboard payloads and the values exchanged with hosts.

use serde::Serialize;
use std::fmt;

use crate::bitmap::{Bitmap, ImageEncoding};
use crate::error::{BackendError, BridgeError, Result};
use crate::source::ClipboardSource;

/// Canonical format tag for Unicode text.
pub const UNICODE_TEXT: &str = "UnicodeText";
/// Canonical format tag for a list of file paths.
pub const FILE_DROP: &str = "FileDrop";
/// Canonical format tag for a bitmap image.
pub const BITMAP: &str = "Bitmap";

/// Semantic classification of a clipboard payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipboardDataType {
    #[default]
    Unknown,
    Text,
    PathList,
    Image,
}

impl fmt::Display for ClipboardDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClipboardDataType::Unknown => "unknown",
            ClipboardDataType::Text => "text",
            ClipboardDataType::PathList => "path list",
            ClipboardDataType::Image => "image",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    Text(String),
    PathList(Vec<String>),
    Image(Bitmap),
    Bytes(Vec<u8>),
}

impl Payload {
    /// Name of the payload's own representation. Keys an untagged raw write.
    pub fn type_name(&self) -> &'static str {
        match self {
            Payload::Text(_) => "String",
            Payload::PathList(_) => "PathList",
            Payload::Image(_) => "Bitmap",
            Payload::Bytes(_) => "Bytes",
        }
    }

    fn natural_type(&self) -> ClipboardDataType {
        match self {
            Payload::Text(_) => ClipboardDataType::Text,
            Payload::PathList(_) => ClipboardDataType::PathList,
            Payload::Image(_) => ClipboardDataType::Image,
            Payload::Bytes(_) => ClipboardDataType::Unknown,
        }
    }

    /// Flatten the payload for a raw, format-keyed write.
    pub(crate) fn to_bytes(&self) -> std::result::Result<Vec<u8>, BackendError> {
        match self {
            Payload::Text(text) => Ok(text.as_bytes().to_vec()),
            Payload::PathList(paths) => Ok(paths.join("\n").into_bytes()),
            Payload::Image(bitmap) => bitmap.encode(ImageEncoding::Png),
            Payload::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

/// Immutable snapshot of one clipboard payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipboardData {
    payload: Payload,
    data_type: ClipboardDataType,
    formats: Vec<String>,
    source: Option<ClipboardSource>,
}

impl ClipboardData {
    /// Fails when a typed `data_type` disagrees with the payload variant.
    /// `Unknown` accepts any payload.
    pub fn new(payload: Payload, data_type: ClipboardDataType) -> Result<Self> {
        if data_type != ClipboardDataType::Unknown && payload.natural_type() != data_type {
            return Err(BridgeError::InvalidArgument(format!(
                "{} payload cannot be tagged as {}",
                payload.type_name(),
                data_type
            )));
        }
        Ok(Self::assemble(payload, data_type, Vec::new(), None))
    }

    pub(crate) fn assemble(
        payload: Payload,
        data_type: ClipboardDataType,
        formats: Vec<String>,
        source: Option<ClipboardSource>,
    ) -> Self {
        Self { payload, data_type, formats, source }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::assemble(Payload::Text(text.into()), ClipboardDataType::Text, Vec::new(), None)
    }

    pub fn path_list<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths = paths.into_iter().map(Into::into).collect();
        Self::assemble(Payload::PathList(paths), ClipboardDataType::PathList, Vec::new(), None)
    }

    pub fn image(bitmap: Bitmap) -> Self {
        Self::assemble(Payload::Image(bitmap), ClipboardDataType::Image, Vec::new(), None)
    }

    pub fn unknown(payload: Payload) -> Self {
        Self::assemble(payload, ClipboardDataType::Unknown, Vec::new(), None)
    }

    pub fn with_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.formats = formats.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_source(mut self, source: ClipboardSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn data_type(&self) -> ClipboardDataType {
        self.data_type
    }

    pub fn source(&self) -> Option<&ClipboardSource> {
        self.source.as_ref()
    }

    /// Native format tags recorded with the payload, as an owned copy.
    pub fn formats(&self) -> Vec<String> {
        self.formats.clone()
    }

    pub(crate) fn first_format(&self) -> Option<&str> {
        self.formats.first().map(String::as_str)
    }

    pub fn as_text(&self) -> Option<&str> {
        match (&self.payload, self.data_type) {
            (Payload::Text(text), ClipboardDataType::Text) => Some(text),
            _ => None,
        }
    }

    pub fn as_path_list(&self) -> Option<&[String]> {
        match (&self.payload, self.data_type) {
            (Payload::PathList(paths), ClipboardDataType::PathList) => Some(paths),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&Bitmap> {
        match (&self.payload, self.data_type) {
            (Payload::Image(bitmap), ClipboardDataType::Image) => Some(bitmap),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match (&self.payload, self.data_type) {
            (Payload::Bytes(bytes), ClipboardDataType::Unknown) => Some(bytes),
            _ => None,
        }
    }
}

impl fmt::Display for ClipboardData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::Text(text) => f.write_str(text),
            Payload::PathList(paths) => f.write_str(&paths.join("\n")),
            Payload::Image(bitmap) => write!(f, "{}x{} bitmap", bitmap.width(), bitmap.height()),
            Payload::Bytes(bytes) => write!(f, "{} bytes", bytes.len()),
        }
    }
}

/// Raised once per processed external clipboard update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipboardChangedEvent {
    data: ClipboardData,
}

impl ClipboardChangedEvent {
    pub fn new(data: ClipboardData) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &ClipboardData {
        &self.data
    }

    pub fn into_data(self) -> ClipboardData {
        self.data
    }
}
