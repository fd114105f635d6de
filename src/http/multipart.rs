//! Multipart form data support.
//!
//! Provides RFC 2046 multipart/form-data encoding for streamed uploads.
//!
//! Encoding is two-pass: [`Form::prepare`] asks every field for its exact
//! serialized length (file sizes come from metadata, files are not read), so
//! `Content-Length` can be sent ahead of the body; [`Form::write_to`] then
//! streams each section in insertion order, copying file contents straight
//! from disk to the sink.
//!
//! # Example
//! ```ignore
//! use rawnet::http::multipart::Form;
//!
//! let mut form = Form::new()
//!     .text("username", "user123")
//!     .file("avatar", "/tmp/me.png")?;
//!
//! let length = form.prepare();
//! form.write_to(&mut socket)?;
//! ```

use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use bytes::Bytes;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Length of the random boundary token.
pub const BOUNDARY_LEN: usize = 22;

/// Stands in for on-disk file contents in [`Form::preview`].
pub const FILE_PLACEHOLDER: &str = "[-----FILE_BINARY_DATA-----]";

const OCTET_STREAM: &str = "application/octet-stream";

/// One multipart section.
///
/// `prepare` must run before `serialize`, and `serialize` must emit exactly
/// the number of bytes `prepare` declared.
pub trait PreparableField: fmt::Debug + Send {
    fn name(&self) -> &str;

    /// Build and cache the section framing for `boundary`; returns the
    /// declared byte length of the whole section.
    fn prepare(&mut self, boundary: &str) -> u64;

    /// Write the section to `sink`, returning the number of bytes written.
    fn serialize(&self, sink: &mut dyn Write) -> Result<u64, NetError>;

    /// Human-readable rendering of the section.
    fn preview(&self) -> Result<String, NetError>;
}

/// A `name=value` text field.
#[derive(Debug, Clone)]
pub struct PlainField {
    name: String,
    value: String,
    prepared: Option<String>,
}

impl PlainField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            prepared: None,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    fn prepared(&self) -> Result<&str, NetError> {
        self.prepared.as_deref().ok_or_else(|| NetError::FieldNotPrepared {
            name: self.name.clone(),
        })
    }
}

impl PreparableField for PlainField {
    fn name(&self) -> &str {
        &self.name
    }

    fn prepare(&mut self, boundary: &str) -> u64 {
        let section = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            escape_quotes(&self.name),
            self.value
        );
        let len = section.len() as u64;
        self.prepared = Some(section);
        len
    }

    fn serialize(&self, sink: &mut dyn Write) -> Result<u64, NetError> {
        let section = self.prepared()?;
        sink.write_all(section.as_bytes())
            .stream_context("sending multipart field")?;
        Ok(section.len() as u64)
    }

    fn preview(&self) -> Result<String, NetError> {
        self.prepared().map(str::to_string)
    }
}

/// A file streamed from disk.
#[derive(Debug, Clone)]
pub struct DiskFileField {
    name: String,
    path: Option<PathBuf>,
    filename: String,
    mime: String,
    header: Option<String>,
    /// File size measured by `prepare`; exactly this many bytes are sent.
    prepared_size: Option<u64>,
}

impl DiskFileField {
    /// Reference a file on disk. Fails with [`NetError::UploadFileNotFound`]
    /// when `path` is not an existing regular file.
    pub fn new(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, NetError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(NetError::UploadFileNotFound {
                path: path.display().to_string(),
            });
        }
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self {
            name: name.into(),
            path: Some(path.to_path_buf()),
            filename,
            mime,
            header: None,
            prepared_size: None,
        })
    }

    /// A file input submitted with no file selected: empty filename, no content.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            filename: String::new(),
            mime: OCTET_STREAM.to_string(),
            header: None,
            prepared_size: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = mime.into();
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn file_size(&self) -> u64 {
        self.path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map_or(0, |m| m.len())
    }

    fn header(&self) -> Result<&str, NetError> {
        self.header.as_deref().ok_or_else(|| NetError::FieldNotPrepared {
            name: self.name.clone(),
        })
    }

    fn unreadable(&self, path: &Path, message: impl ToString) -> NetError {
        NetError::UploadFileUnreadable {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }
}

impl PreparableField for DiskFileField {
    fn name(&self) -> &str {
        &self.name
    }

    fn prepare(&mut self, boundary: &str) -> u64 {
        let header = file_header(boundary, &self.name, &self.filename, &self.mime);
        let size = self.file_size();
        let len = header.len() as u64 + 2 + size;
        self.header = Some(header);
        self.prepared_size = Some(size);
        len
    }

    fn serialize(&self, sink: &mut dyn Write) -> Result<u64, NetError> {
        let header = self.header()?;
        sink.write_all(header.as_bytes())
            .stream_context("sending multipart header")?;
        let mut written = header.len() as u64;

        if let Some(path) = &self.path {
            let expected = self.prepared_size.unwrap_or_default();
            let file = File::open(path).map_err(|e| self.unreadable(path, e))?;
            let copied = io::copy(&mut file.take(expected), &mut *sink)
                .stream_context("streaming upload file")?;
            if copied != expected {
                return Err(self.unreadable(
                    path,
                    format!("expected {expected} bytes, read {copied}"),
                ));
            }
            written += copied;
        }

        sink.write_all(b"\r\n")
            .stream_context("sending multipart trailer")?;
        Ok(written + 2)
    }

    fn preview(&self) -> Result<String, NetError> {
        let header = self.header()?;
        let body = if self.path.is_some() {
            FILE_PLACEHOLDER
        } else {
            ""
        };
        Ok(format!("{header}{body}\r\n"))
    }
}

/// In-memory bytes sent as a file.
#[derive(Debug, Clone)]
pub struct RawBytesField {
    name: String,
    filename: String,
    mime: String,
    data: Bytes,
    header: Option<String>,
}

impl RawBytesField {
    /// MIME type defaults from the filename extension.
    pub fn new(
        name: impl Into<String>,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let filename = filename.into();
        let mime = mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            name: name.into(),
            filename,
            mime,
            data: data.into(),
            header: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = mime.into();
        self
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    fn header(&self) -> Result<&str, NetError> {
        self.header.as_deref().ok_or_else(|| NetError::FieldNotPrepared {
            name: self.name.clone(),
        })
    }
}

impl PreparableField for RawBytesField {
    fn name(&self) -> &str {
        &self.name
    }

    fn prepare(&mut self, boundary: &str) -> u64 {
        let header = file_header(boundary, &self.name, &self.filename, &self.mime);
        let len = (header.len() + self.data.len() + 2) as u64;
        self.header = Some(header);
        len
    }

    fn serialize(&self, sink: &mut dyn Write) -> Result<u64, NetError> {
        let header = self.header()?;
        let mut section = Vec::with_capacity(header.len() + self.data.len() + 2);
        section.extend_from_slice(header.as_bytes());
        section.extend_from_slice(&self.data);
        section.extend_from_slice(b"\r\n");
        sink.write_all(&section)
            .stream_context("sending multipart field")?;
        Ok(section.len() as u64)
    }

    fn preview(&self) -> Result<String, NetError> {
        let header = self.header()?;
        Ok(format!("{header}{}\r\n", String::from_utf8_lossy(&self.data)))
    }
}

fn file_header(boundary: &str, name: &str, filename: &str, mime: &str) -> String {
    format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {mime}\r\n\r\n",
        escape_quotes(name),
        escape_quotes(filename)
    )
}

/// A multipart form.
#[derive(Debug)]
pub struct Form {
    boundary: String,
    fields: Vec<Box<dyn PreparableField>>,
    prepared_len: Option<u64>,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Create a new empty form with a fresh random boundary.
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    /// Create a form with a caller-chosen boundary.
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            fields: Vec::new(),
            prepared_len: None,
        }
    }

    /// Get the boundary string.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Add a text field.
    pub fn text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.field(PlainField::new(name, value))
    }

    /// Add a file from disk.
    pub fn file(self, name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, NetError> {
        Ok(self.field(DiskFileField::new(name, path)?))
    }

    /// Add in-memory bytes as a file.
    pub fn bytes(
        self,
        name: impl Into<String>,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        self.field(RawBytesField::new(name, filename, data))
    }

    /// Add any field.
    pub fn field<F: PreparableField + 'static>(mut self, field: F) -> Self {
        self.push(Box::new(field));
        self
    }

    pub fn push(&mut self, field: Box<dyn PreparableField>) {
        self.fields.push(field);
        self.prepared_len = None;
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name())
    }

    /// Get the Content-Type header value.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    fn closing_marker(&self) -> String {
        format!("--{}--", self.boundary)
    }

    /// First pass: prepare every field and return the exact body length,
    /// closing marker included.
    pub fn prepare(&mut self) -> u64 {
        let boundary = self.boundary.clone();
        let fields_len: u64 = self
            .fields
            .iter_mut()
            .map(|field| field.prepare(&boundary))
            .sum();
        let total = fields_len + self.closing_marker().len() as u64;
        tracing::debug!(fields = self.fields.len(), length = total, "multipart body prepared");
        self.prepared_len = Some(total);
        total
    }

    /// Body length declared by the last [`prepare`](Self::prepare).
    pub fn content_length(&self) -> Option<u64> {
        self.prepared_len
    }

    /// Second pass: stream every field, then the closing marker.
    pub fn write_to(&self, sink: &mut dyn Write) -> Result<u64, NetError> {
        if self.prepared_len.is_none() {
            if let Some(field) = self.fields.first() {
                return Err(NetError::FieldNotPrepared {
                    name: field.name().to_string(),
                });
            }
        }

        let mut written = 0;
        for field in &self.fields {
            written += field.serialize(sink)?;
        }
        let closing = self.closing_marker();
        sink.write_all(closing.as_bytes())
            .stream_context("sending multipart closing boundary")?;
        Ok(written + closing.len() as u64)
    }

    /// The body as text, with on-disk file contents replaced by
    /// [`FILE_PLACEHOLDER`].
    pub fn preview(&mut self) -> Result<String, NetError> {
        if self.prepared_len.is_none() {
            self.prepare();
        }
        let mut out = String::new();
        for field in &self.fields {
            out.push_str(&field.preview()?);
        }
        out.push_str(&self.closing_marker());
        Ok(out)
    }
}

/// Escape quotes and backslashes in a string.
fn escape_quotes(s: &str) -> Cow<'_, str> {
    if s.contains('"') || s.contains('\\') || s.contains('\r') || s.contains('\n') {
        Cow::Owned(
            s.replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('\r', "\\r")
                .replace('\n', "\\n"),
        )
    } else {
        Cow::Borrowed(s)
    }
}

/// Generate a random alphanumeric boundary.
pub fn generate_boundary() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BOUNDARY_LEN)
        .map(char::from)
        .collect()
}
