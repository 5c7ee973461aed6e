// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Generative sketch polishing.
//
// The merged drawing is decoded (to learn its canvas size), re-encoded as PNG
// and handed to a `GenerativeBackend`.  The image the backend returns is
// resized back onto the original canvas.  The shipped backend talks to the
// Gemini `generateContent` REST endpoint; `UnconfiguredBackend` stands in when
// no API key is available.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use divdraw_core::config::EnhanceConfig;
use divdraw_core::error::{DivDrawError, Result};
use divdraw_imaging::codec::{self, PNG_MIME};

use crate::handlers::run_blocking;

/// Longest slice of an upstream error body echoed into our error message.
const ERROR_BODY_PREVIEW: usize = 200;

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// Raw answer from a generative backend.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    /// Encoded image bytes, any format the `image` crate can read.
    pub image: Vec<u8>,
    /// Concatenated text parts, possibly empty.
    pub description: String,
}

/// A remote model that turns a sketch into a polished rendering.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Send PNG bytes to the model and return its image and caption.
    async fn generate(&self, png: &[u8]) -> Result<GeneratedImage>;
}

/// Backend used when no API key is configured.  Every call fails.
pub struct UnconfiguredBackend;

#[async_trait]
impl GenerativeBackend for UnconfiguredBackend {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn generate(&self, _png: &[u8]) -> Result<GeneratedImage> {
        warn!("Enhancement requested but no generative backend is configured");
        Err(DivDrawError::RemoteService(
            "generative backend not configured".into(),
        ))
    }
}

/// Pick the backend for `config`: Gemini when an API key is set, otherwise
/// [`UnconfiguredBackend`].
pub fn backend_from_config(config: &EnhanceConfig) -> Result<Arc<dyn GenerativeBackend>> {
    let backend: Arc<dyn GenerativeBackend> = match config.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Arc::new(GeminiBackend::new(config)?),
        _ => {
            info!("No generative API key configured; /enhance will report an error");
            Arc::new(UnconfiguredBackend)
        }
    };
    Ok(backend)
}

// ---------------------------------------------------------------------------
// Polishing flow
// ---------------------------------------------------------------------------

/// Polished drawing ready to be returned to the caller.
#[derive(Debug, Clone)]
pub struct Enhancement {
    pub description: String,
    /// PNG bytes at the merged drawing's dimensions.
    pub image_png: Vec<u8>,
}

/// Run `merged` through `backend` and fit the result to the original canvas.
#[instrument(skip_all, fields(backend = backend.name(), merged_len = merged.len()))]
pub async fn polish_sketch(backend: &dyn GenerativeBackend, merged: Vec<u8>) -> Result<Enhancement> {
    let (png, width, height) = run_blocking(move || {
        let image = codec::decode(&merged)?;
        let (width, height) = image.dimensions();
        Ok((codec::encode_png(&DynamicImage::ImageRgb8(image))?, width, height))
    })
    .await?;
    debug!(width, height, png_len = png.len(), "Merged drawing prepared");

    let GeneratedImage { image, description } = backend.generate(&png).await?;
    let image_png = run_blocking(move || {
        codec::resize_exact_png(&image, width, height).map_err(|err| match err {
            DivDrawError::Decode(msg) => {
                DivDrawError::RemoteService(format!("generated image is unreadable: {msg}"))
            }
            other => other,
        })
    })
    .await?;

    Ok(Enhancement {
        description,
        image_png,
    })
}

// ---------------------------------------------------------------------------
// Gemini REST backend
// ---------------------------------------------------------------------------

/// Client for the Generative Language API `generateContent` method.
pub struct GeminiBackend {
    client: reqwest::Client,
    url: String,
    api_key: String,
    prompt: String,
}

impl GeminiBackend {
    /// Build a client from configuration.  Fails if no API key is set.
    pub fn new(config: &EnhanceConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| DivDrawError::Config("enhance.api_key is not set".into()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| DivDrawError::Config(format!("HTTP client: {err}")))?;
        Ok(Self {
            client,
            url: generate_content_url(&config.endpoint, &config.model),
            api_key,
            prompt: config.prompt.clone(),
        })
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, png: &[u8]) -> Result<GeneratedImage> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text {
                        text: self.prompt.clone(),
                    },
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: Some(PNG_MIME.to_string()),
                            data: STANDARD.encode(png),
                        },
                    },
                ],
            }],
        };

        debug!(url = %self.url, png_len = png.len(), "Calling generateContent");
        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| DivDrawError::RemoteService(format!("request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.text().await {
                Ok(body) => body.chars().take(ERROR_BODY_PREVIEW).collect(),
                Err(err) => format!("<error body unreadable: {err}>"),
            };
            return Err(DivDrawError::RemoteService(upstream_status_message(
                status, &detail,
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|err| DivDrawError::RemoteService(format!("unreadable response: {err}")))?;
        let generated = parse_generate_response(body)?;
        info!(
            image_len = generated.image.len(),
            description_len = generated.description.len(),
            "Generative backend answered"
        );
        Ok(generated)
    }
}

fn upstream_status_message(status: reqwest::StatusCode, detail: &str) -> String {
    format!("HTTP {status}: {detail}")
}

/// `{endpoint}/models/{model}:generateContent`, tolerant of a trailing slash.
pub fn generate_content_url(endpoint: &str, model: &str) -> String {
    format!(
        "{}/models/{model}:generateContent",
        endpoint.trim_end_matches('/')
    )
}

/// Extract the first inline image and all text from a response.
pub fn parse_generate_response(response: GenerateResponse) -> Result<GeneratedImage> {
    let mut image = None;
    let mut description = String::new();

    let parts = response
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts);
    for part in parts {
        if let Some(text) = part.text {
            description.push_str(&text);
        }
        if let (None, Some(inline)) = (&image, part.inline_data) {
            let bytes = STANDARD.decode(inline.data.as_bytes()).map_err(|err| {
                DivDrawError::RemoteService(format!("inline image is not base64: {err}"))
            })?;
            image = Some(bytes);
        }
    }

    let image = image.ok_or_else(|| {
        DivDrawError::RemoteService("response contained no image part".into())
    })?;
    Ok(GeneratedImage {
        image,
        description: description.trim().to_string(),
    })
}

// -- Wire types ---------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub data: String,
}

/// Subset of the `generateContent` response this backend reads.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub inline_data: Option<InlineData>,
}
