//! Request encoding: typed method values to JSON or multipart bodies.
//!
//! ## Presence rule
//!
//! Optional fields are written only when they hold a non-zero value. Request
//! structs express this with `skip_serializing_if` using [`is_false`],
//! [`is_none_or_empty`], `Option::is_none` or `Vec::is_empty`, so a minimal
//! request serializes to exactly its required fields.
//!
//! ## Body selection
//!
//! - No uploads: the whole request is one JSON document.
//! - Any [`Upload`]: a multipart body. Each top-level field becomes its own
//!   text part (strings verbatim, everything else JSON-stringified). An upload
//!   in a top-level field is sent as a file part under that field's name; an
//!   upload referenced from inside a structured field (`attach://<key>`) is
//!   sent as a file part named `<key>`. Keys are made unique per body: a key
//!   already taken by a field or an earlier upload gets a `_1`, `_2`, ...
//!   suffix and its reference is rewritten to match.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::files::ATTACH_PREFIX;
use crate::{BotError, Destination, Upload};

/// `skip_serializing_if` predicate for boolean flags.
pub fn is_false(value: &bool) -> bool {
    !*value
}

/// `skip_serializing_if` predicate for optional text: absent and empty are
/// both omitted.
pub fn is_none_or_empty(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

// ---------------------------------------------------------------------------
// Method contract
// ---------------------------------------------------------------------------

/// A remote operation: its wire name, request fields and response type.
///
/// Implemented by every per-operation request struct. The struct's
/// `Serialize` impl produces the request fields.
pub trait Method: Serialize + Send + Sync {
    /// Decoded type of the envelope's `result`.
    type Response: DeserializeOwned + Send + 'static;

    /// Operation name as it appears in the URL path (e.g. `"sendMessage"`).
    const NAME: &'static str;

    /// The capacity pool this call is charged against.
    fn destination(&self) -> Destination;

    /// Number of remote-visible actions this call performs.
    ///
    /// `1` for ordinary calls; the item count for batch operations.
    fn weight(&self) -> u32 {
        1
    }

    /// Files whose bytes travel with this request.
    fn uploads(&self) -> Vec<&Upload> {
        Vec::new()
    }
}

// ---------------------------------------------------------------------------
// Encoded bodies
// ---------------------------------------------------------------------------

/// Content of one multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartContent {
    /// A form field.
    Text(String),
    /// A file.
    File {
        /// File name reported to the server.
        file_name: String,
        /// Raw content.
        bytes: Vec<u8>,
    },
}

/// One named part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Form field name.
    pub name: String,
    /// Part content.
    pub content: PartContent,
}

impl Part {
    fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: PartContent::Text(text.into()),
        }
    }

    fn file(name: impl Into<String>, upload: &Upload) -> Self {
        Self {
            name: name.into(),
            content: PartContent::File {
                file_name: upload.file_name().to_owned(),
                bytes: upload.bytes().to_vec(),
            },
        }
    }
}

/// Request body ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// `application/json`.
    Json(Vec<u8>),
    /// `multipart/form-data`.
    Multipart(Vec<Part>),
}

impl RequestBody {
    /// MIME type the transport should announce (multipart boundaries are
    /// appended by the HTTP client).
    pub fn content_type(&self) -> &'static str {
        match self {
            RequestBody::Json(_) => "application/json",
            RequestBody::Multipart(_) => "multipart/form-data",
        }
    }
}

/// An operation name plus its encoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRequest {
    /// Operation name (URL path suffix).
    pub method: &'static str,
    /// Encoded body.
    pub body: RequestBody,
}

/// Encodes `method` into a JSON or multipart body.
pub fn encode<M: Method>(method: &M) -> Result<EncodedRequest, BotError> {
    let uploads = method.uploads();
    let body = if uploads.is_empty() {
        encode_json(method)?
    } else {
        encode_multipart(method, &uploads)?
    };
    Ok(EncodedRequest {
        method: M::NAME,
        body,
    })
}

fn encode_json<M: Method>(method: &M) -> Result<RequestBody, BotError> {
    let mut bytes = serde_json::to_vec(method).map_err(|e| BotError::Encode(e.to_string()))?;
    // Field-less methods are unit structs and serialize to `null`.
    if bytes == b"null" {
        bytes = b"{}".to_vec();
    }
    Ok(RequestBody::Json(bytes))
}

fn encode_multipart<M: Method>(method: &M, uploads: &[&Upload]) -> Result<RequestBody, BotError> {
    let value = serde_json::to_value(method).map_err(|e| BotError::Encode(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(BotError::Encode(format!(
            "{} must serialize to an object to carry uploads",
            M::NAME
        )));
    };

    let mut attachments = Attachments::new(uploads, fields.keys());
    let mut parts = Vec::with_capacity(fields.len() + uploads.len());

    for (name, value) in fields {
        match value {
            Value::Null => {}
            Value::String(text) => match attachments.claim(&text) {
                Some(upload) => parts.push(Part::file(name, upload)),
                None => parts.push(Part::text(name, text)),
            },
            mut other => {
                attachments.rewrite(&mut other);
                parts.push(Part::text(name, other.to_string()));
            }
        }
    }

    parts.extend(attachments.finish());
    Ok(RequestBody::Multipart(parts))
}

/// Pairs `attach://` references with uploads and hands out part names.
///
/// Uploads are claimed in the order [`Method::uploads`] lists them, which
/// matches the order their references appear in the serialized request.
struct Attachments<'a> {
    unclaimed: Vec<Option<&'a Upload>>,
    names: HashSet<String>,
    files: Vec<Part>,
}

impl<'a> Attachments<'a> {
    fn new<'f>(uploads: &[&'a Upload], fields: impl Iterator<Item = &'f String>) -> Self {
        Self {
            unclaimed: uploads.iter().copied().map(Some).collect(),
            names: fields.cloned().collect(),
            files: Vec::new(),
        }
    }

    /// Takes the first unclaimed upload `text` refers to.
    fn claim(&mut self, text: &str) -> Option<&'a Upload> {
        let key = text.strip_prefix(ATTACH_PREFIX)?;
        self.unclaimed
            .iter_mut()
            .find(|slot| matches!(slot, Some(upload) if upload.key() == key))?
            .take()
    }

    /// Points every reference inside `value` at its own file part.
    fn rewrite(&mut self, value: &mut Value) {
        match value {
            Value::String(text) => {
                if let Some(upload) = self.claim(text) {
                    let name = self.reserve(upload.key());
                    *text = format!("{ATTACH_PREFIX}{name}");
                    self.files.push(Part::file(name, upload));
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.rewrite(item);
                }
            }
            Value::Object(map) => {
                for item in map.values_mut() {
                    self.rewrite(item);
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }

    /// Returns `key`, or the first free `key_<n>` when it is already taken.
    fn reserve(&mut self, key: &str) -> String {
        if self.names.insert(key.to_owned()) {
            return key.to_owned();
        }
        let name = (1..)
            .map(|n| format!("{key}_{n}"))
            .find(|candidate| !self.names.contains(candidate))
            .unwrap_or_else(|| key.to_owned());
        debug!(key, part = %name, "renamed duplicate upload key");
        self.names.insert(name.clone());
        name
    }

    /// File parts for the references seen, then for any upload nothing
    /// referenced.
    fn finish(mut self) -> Vec<Part> {
        let leftover: Vec<&Upload> = self.unclaimed.iter().flatten().copied().collect();
        for upload in leftover {
            let name = self.reserve(upload.key());
            self.files.push(Part::file(name, upload));
        }
        self.files
    }
}
