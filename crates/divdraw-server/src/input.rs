// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request input resolution.
//
// Every endpoint reads its images from either multipart file parts or a JSON
// body carrying base64 strings / data URLs.  `RequestPayload` captures
// whichever of the two a request carried, and an `InputSlot` lists the places
// a logical input may come from, in priority order.
//
// Resolution rules for one slot:
//
//   - Sources are tried in order; the first non-empty hit wins.
//   - An empty hit (zero-byte upload, empty string) does not stop the search.
//   - If only empty hits were found, the empty bytes are returned so the
//     decoder reports the failure.
//   - No hit at all resolves to `None`.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::debug;

use divdraw_core::error::{DivDrawError, Result};
use divdraw_imaging::codec;

use crate::handlers::ApiError;

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

/// One place an input may be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    /// A multipart part with this field name.
    File(&'static str),
    /// A string member of the top-level JSON object (base64 or data URL).
    Json(&'static str),
}

/// A logical input and its ordered extraction attempts.
#[derive(Debug, Clone, Copy)]
pub struct InputSlot {
    pub name: &'static str,
    pub sources: &'static [InputSource],
}

/// Photo to convert on `/convert`.
pub const CONVERT_IMAGE: InputSlot = InputSlot {
    name: "image",
    sources: &[InputSource::File("image")],
};

/// Reference sketch on `/evaluate`.
pub const EVALUATE_ORIGINAL: InputSlot = InputSlot {
    name: "original",
    sources: &[
        InputSource::File("original_sketch"),
        InputSource::Json("original"),
    ],
};

/// User drawing on `/evaluate`.
pub const EVALUATE_USER: InputSlot = InputSlot {
    name: "user",
    sources: &[InputSource::File("user_sketch"), InputSource::Json("user")],
};

/// Merged drawing on `/enhance`.
pub const ENHANCE_MERGED: InputSlot = InputSlot {
    name: "merged",
    sources: &[InputSource::Json("merged")],
};

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Decoded request body: multipart parts keyed by field name, or a JSON value.
#[derive(Debug, Default)]
pub struct RequestPayload {
    files: HashMap<String, Vec<u8>>,
    json: Option<Value>,
}

impl RequestPayload {
    /// Payload carrying only multipart parts.
    pub fn from_parts(files: HashMap<String, Vec<u8>>) -> Self {
        Self { files, json: None }
    }

    /// Payload carrying only a JSON body.
    pub fn from_json(json: Value) -> Self {
        Self {
            files: HashMap::new(),
            json: Some(json),
        }
    }

    /// Parse a non-multipart body.  An empty body yields an empty payload.
    pub fn from_json_bytes(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let json = serde_json::from_slice(body)
            .map_err(|err| DivDrawError::MalformedInput(format!("invalid JSON body: {err}")))?;
        Ok(Self::from_json(json))
    }

    /// Resolve `slot`, consuming the matching multipart parts.
    pub fn take(&mut self, slot: &InputSlot) -> Result<Option<Vec<u8>>> {
        let mut empty_hit = None;
        for source in slot.sources {
            let found = match *source {
                InputSource::File(field) => self.files.remove(field),
                InputSource::Json(key) => self.json_member(key)?,
            };
            match found {
                Some(bytes) if !bytes.is_empty() => {
                    debug!(slot = slot.name, ?source, len = bytes.len(), "Input resolved");
                    return Ok(Some(bytes));
                }
                Some(bytes) => {
                    empty_hit.get_or_insert(bytes);
                }
                None => {}
            }
        }
        Ok(empty_hit)
    }

    fn json_member(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.json.as_ref().and_then(|json| json.get(key)) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(Some(Vec::new())),
            Some(Value::String(text)) => codec::strip_data_url(text).map(Some),
            Some(_) => Err(DivDrawError::MalformedInput(format!(
                "'{key}' must be a base64 string or data URL"
            ))),
        }
    }
}

/// Whether a `Content-Type` value names `multipart/form-data`, in any case.
fn is_multipart_form(content_type: &str) -> bool {
    const MULTIPART_FORM: &str = "multipart/form-data";
    content_type
        .get(..MULTIPART_FORM.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(MULTIPART_FORM))
}

#[async_trait]
impl<S> FromRequest<S> for RequestPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(is_multipart_form);

        if !is_multipart {
            let body = Bytes::from_request(req, state)
                .await
                .map_err(|rejection| ApiError::new(rejection.status(), rejection.body_text()))?;
            return Ok(Self::from_json_bytes(&body)?);
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::new(rejection.status(), rejection.body_text()))?;

        let mut files = HashMap::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| ApiError::new(err.status(), err.body_text()))?
        {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            let data = field
                .bytes()
                .await
                .map_err(|err| ApiError::new(err.status(), err.body_text()))?;
            // Repeated fields keep their first occurrence.
            files.entry(name).or_insert_with(|| data.to_vec());
        }
        debug!(parts = files.len(), "Multipart body read");
        Ok(Self::from_parts(files))
    }
}
