// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Remote enhancement gateway.
//
// Heavy enhancements (upscaling, face restoration) can be delegated to remote
// providers. The gateway builds one request, offers it to each provider in
// the configured order, and returns the first image that comes back. A
// provider failure is logged and the next one tried; only when the whole
// chain is exhausted does the caller see `RemoteUnavailable`. Encoding the
// request and decoding each reply run on the blocking pool.
//
// Transports live outside this crate. `StubProvider` stands in for builds
// that have none.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use retouch_core::error::{Result, RetouchError};
use retouch_core::{Raster, RasterFormat};
use retouch_raster::codec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument, warn};

use crate::session::blocking;

/// Boxed `Send` future returned by providers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Enhancements only a remote model can do well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum RemoteOperation {
    /// Enlarge by an integer factor.
    Upscale { factor: u32 },
    FaceRestore,
}

impl RemoteOperation {
    pub fn tool_id(&self) -> &'static str {
        match self {
            Self::Upscale { .. } => "upscale",
            Self::FaceRestore => "face_restore",
        }
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::Upscale { .. } => "AI Upscale",
            Self::FaceRestore => "Face Restore",
        }
    }

    /// Operation parameters as sent to providers.
    pub fn params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        if let Self::Upscale { factor } = self {
            params.insert("factor".into(), json!(factor));
        }
        params
    }
}

/// What a provider receives: the operation and a PNG of the current image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhanceRequest {
    pub operation: RemoteOperation,
    pub params: Map<String, Value>,
    /// PNG-encoded source image.
    pub payload: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl EnhanceRequest {
    /// Encode `raster` as PNG and wrap it for `operation`.
    pub fn new(raster: &Raster, operation: RemoteOperation) -> Result<Self> {
        Ok(Self {
            operation,
            params: operation.params(),
            payload: codec::encode(raster, RasterFormat::Png, 100)?,
            width: raster.width(),
            height: raster.height(),
        })
    }
}

/// Provider reply. `image` carries encoded bytes in any supported format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnhanceResponse {
    pub success: bool,
    #[serde(default)]
    pub image: Option<Vec<u8>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl EnhanceResponse {
    pub fn ok(image: Vec<u8>) -> Self {
        Self {
            success: true,
            image: Some(image),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            image: None,
            error: Some(error.into()),
        }
    }
}

/// A remote enhancement backend.
pub trait EnhancementProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Submit `request`. Timeouts and cancellation are the provider's concern.
    fn enhance<'a>(&'a self, request: &'a EnhanceRequest) -> BoxFuture<'a, Result<EnhanceResponse>>;
}

/// Provider for builds without a transport; every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubProvider;

impl EnhancementProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    fn enhance<'a>(&'a self, request: &'a EnhanceRequest) -> BoxFuture<'a, Result<EnhanceResponse>> {
        Box::pin(async move {
            warn!(
                operation = request.operation.tool_id(),
                "EnhancementProvider::enhance called on stub provider"
            );
            Err(RetouchError::Remote("no enhancement transport in this build".into()))
        })
    }
}

/// Ordered fallback chain of providers.
#[derive(Default)]
pub struct EnhancementGateway {
    providers: Vec<Box<dyn EnhancementProvider>>,
}

impl EnhancementGateway {
    /// Gateway with no providers; every call reports `RemoteUnavailable`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider to the end of the chain.
    pub fn with_provider(mut self, provider: impl EnhancementProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn push(&mut self, provider: Box<dyn EnhancementProvider>) {
        self.providers.push(provider);
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Offer `operation` on `raster` to each provider in turn and decode the
    /// first image returned.
    #[instrument(skip(self, raster), fields(providers = self.providers.len()))]
    pub async fn enhance(&self, raster: Arc<Raster>, operation: RemoteOperation) -> Result<Raster> {
        if self.providers.is_empty() {
            return Err(RetouchError::RemoteUnavailable {
                attempts: 0,
                last_error: "no enhancement providers configured".into(),
            });
        }

        let request = blocking(move || EnhanceRequest::new(&raster, operation)).await?;
        let mut last_error = String::new();

        for provider in &self.providers {
            let reply = provider
                .enhance(&request)
                .await
                .map_err(|err| err.to_string())
                .and_then(accepted_image);
            let outcome = match reply {
                Ok(bytes) => blocking(move || codec::decode_guessed(&bytes))
                    .await
                    .map_err(|err| err.to_string()),
                Err(err) => Err(err),
            };
            match outcome {
                Ok(image) => {
                    info!(
                        provider = provider.name(),
                        width = image.width(),
                        height = image.height(),
                        "Remote enhancement succeeded"
                    );
                    return Ok(image);
                }
                Err(err) => {
                    warn!(provider = provider.name(), error = %err, "Provider failed, trying next");
                    last_error = err;
                }
            }
        }

        Err(RetouchError::RemoteUnavailable {
            attempts: self.providers.len(),
            last_error,
        })
    }
}

/// Encoded image bytes of a successful reply, or a message describing why
/// there are none.
fn accepted_image(response: EnhanceResponse) -> std::result::Result<Vec<u8>, String> {
    if !response.success {
        return Err(response
            .error
            .unwrap_or_else(|| "provider reported failure".into()));
    }
    let bytes = response
        .image
        .ok_or_else(|| "provider reported success without an image".to_string())?;
    debug!(bytes = bytes.len(), "Provider returned an image");
    Ok(bytes)
}
