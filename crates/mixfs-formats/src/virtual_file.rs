//! Named, read-only views over file contents
//!
//! A [`VirtualFile`] is what every lookup in the storage layer hands back.
//! It is either a zero-copy slice of a parent stream (an archive's backing
//! buffer) or an owned buffer (a file read from a real directory, or import
//! pipeline output). Either way the bytes live in a shared [`Bytes`] handle,
//! so cloning a view never copies file contents.

use bytes::Bytes;
use std::io::Cursor;
use thiserror::Error;

/// Errors raised while constructing views
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// Requested range does not fit inside the parent stream
    #[error("View range {offset}+{length} exceeds parent stream of {parent_len} bytes")]
    OutOfBounds {
        /// Offset into the parent stream
        offset: usize,
        /// Length of the requested range
        length: usize,
        /// Length of the parent stream
        parent_len: usize,
    },
}

/// Text encodings understood by [`VirtualFile::read_as_text`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    /// UTF-8; invalid sequences become U+FFFD
    #[default]
    Utf8,
    /// ISO-8859-1; every byte maps to the code point of the same value
    Latin1,
}

/// Location of a zero-copy view inside its parent stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRange {
    /// Offset into the parent stream
    pub offset: usize,
    /// Length of the range
    pub length: usize,
}

/// Bytes tagged with a content type, for UI and export consumers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// MIME type, e.g. `application/octet-stream`
    pub mime_type: String,
    /// Blob contents (shared with the originating view)
    pub data: Bytes,
}

impl Blob {
    /// Blob size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// A named view over file contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFile {
    name: String,
    data: Bytes,
    source: Option<SourceRange>,
}

impl VirtualFile {
    /// Create a zero-copy view over `parent[offset..offset + length]`
    pub fn from_slice(
        name: impl Into<String>,
        parent: &Bytes,
        offset: usize,
        length: usize,
    ) -> Result<Self, ViewError> {
        let end = offset
            .checked_add(length)
            .filter(|&end| end <= parent.len())
            .ok_or(ViewError::OutOfBounds {
                offset,
                length,
                parent_len: parent.len(),
            })?;

        Ok(Self {
            name: name.into(),
            data: parent.slice(offset..end),
            source: Some(SourceRange { offset, length }),
        })
    }

    /// Create a view that owns its bytes
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            source: None,
        }
    }

    /// Create a view over UTF-8 text
    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        Self::from_bytes(name, Bytes::copy_from_slice(text.as_bytes()))
    }

    /// Same contents under a different name
    #[must_use]
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: self.data.clone(),
            source: self.source,
        }
    }

    /// File name as requested or resolved
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// True for zero-length files
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The shared byte view (never a deep copy)
    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// Borrow the contents
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// True when the view slices a parent stream instead of owning a buffer
    pub fn is_zero_copy(&self) -> bool {
        self.source.is_some()
    }

    /// Range inside the parent stream for zero-copy views
    pub fn source_range(&self) -> Option<SourceRange> {
        self.source
    }

    /// Decode the contents as text
    pub fn read_as_text(&self, encoding: TextEncoding) -> String {
        match encoding {
            TextEncoding::Utf8 => String::from_utf8_lossy(&self.data).into_owned(),
            TextEncoding::Latin1 => self.data.iter().map(|&b| char::from(b)).collect(),
        }
    }

    /// Wrap the contents in a typed blob
    pub fn to_blob(&self, mime_type: impl Into<String>) -> Blob {
        Blob {
            mime_type: mime_type.into(),
            data: self.data.clone(),
        }
    }

    /// Seekable reader for streaming parsers
    pub fn reader(&self) -> Cursor<Bytes> {
        Cursor::new(self.data.clone())
    }

    /// Split the contents into shared chunks of at most `chunk_size` bytes
    pub fn chunks(&self, chunk_size: usize) -> impl Iterator<Item = Bytes> + '_ {
        let chunk_size = chunk_size.max(1);
        (0..self.data.len())
            .step_by(chunk_size)
            .map(move |start| {
                let end = (start + chunk_size).min(self.data.len());
                self.data.slice(start..end)
            })
    }
}
