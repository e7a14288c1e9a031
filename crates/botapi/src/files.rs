//! File references accepted wherever the platform takes an `InputFile`.
//!
//! A file is either already known to the platform (a file id or a URL it
//! fetches itself) or uploaded by us. Only uploads force a multipart body;
//! see [`crate::request::encode`].

use serde::{Deserialize, Serialize, Serializer};

use crate::FileId;

/// Prefix that points a structured field at a multipart part by name.
pub const ATTACH_PREFIX: &str = "attach://";

/// A file to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputFile {
    /// A file already stored on the platform.
    FileId(FileId),
    /// An HTTP URL the platform downloads on our behalf.
    Url(String),
    /// Local bytes uploaded with the request.
    Upload(Upload),
}

impl InputFile {
    /// Creates an upload from in-memory bytes.
    ///
    /// The multipart key is derived from `file_name`; override it with
    /// [`Upload::with_key`] when two uploads in one request share a name.
    pub fn upload(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        InputFile::Upload(Upload::new(file_name, bytes))
    }

    /// Creates a reference to a remote URL.
    pub fn url(url: impl Into<String>) -> Self {
        InputFile::Url(url.into())
    }

    /// Returns the upload payload, if this file carries bytes.
    pub fn as_upload(&self) -> Option<&Upload> {
        match self {
            InputFile::Upload(upload) => Some(upload),
            InputFile::FileId(_) | InputFile::Url(_) => None,
        }
    }
}

impl From<FileId> for InputFile {
    fn from(value: FileId) -> Self {
        InputFile::FileId(value)
    }
}

impl Serialize for InputFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            InputFile::FileId(id) => serializer.serialize_str(id.as_str()),
            InputFile::Url(url) => serializer.serialize_str(url),
            InputFile::Upload(upload) => serializer.serialize_str(&upload.attach_ref()),
        }
    }
}

/// Bytes to upload as one multipart file part.
#[derive(Clone, PartialEq, Eq)]
pub struct Upload {
    key: String,
    file_name: String,
    bytes: Vec<u8>,
}

impl Upload {
    /// Creates an upload, deriving its multipart key from `file_name`.
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let file_name = file_name.into();
        let key = part_key(&file_name);
        Self {
            key,
            file_name,
            bytes: bytes.into(),
        }
    }

    /// Replaces the multipart key.
    pub fn with_key(mut self, key: impl AsRef<str>) -> Self {
        self.key = part_key(key.as_ref());
        self
    }

    /// Multipart part name this upload is sent under when it is referenced
    /// from a structured field.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// File name reported to the platform.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The raw content.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// `attach://<key>` reference used in place of the bytes inside JSON.
    pub fn attach_ref(&self) -> String {
        format!("{ATTACH_PREFIX}{}", self.key)
    }
}

impl std::fmt::Debug for Upload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upload")
            .field("key", &self.key)
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Multipart keys must be plain ASCII identifiers.
fn part_key(raw: &str) -> String {
    let key: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if key.is_empty() {
        "file".to_owned()
    } else {
        key
    }
}

/// A file stored on the platform, as returned by `getFile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    /// Identifier usable to download or resend the file.
    pub file_id: FileId,
    /// Identifier stable across bots; cannot be used to download.
    pub file_unique_id: String,
    /// Size in bytes, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Path to pass to the file download URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}
