//! HTTP image preloader used for card highlights.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::{Client, header::CONTENT_TYPE};
use tracing::debug;

use crate::overlay::{ImageError, ImageInfo, ImageLoader};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Loads images over HTTP and reads their pixel size from the header.
#[derive(Clone)]
pub struct HttpImageLoader {
    client: Client,
}

impl HttpImageLoader {
    /// Build a loader with a bounded request timeout.
    pub fn new() -> reqwest::Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client })
    }

    async fn fetch(client: Client, url: String) -> Result<ImageInfo, ImageError> {
        let request_error = |err: reqwest::Error| ImageError::Request {
            url: url.clone(),
            message: err.to_string(),
        };

        let response = client.get(&url).send().await.map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::Status {
                url: url.clone(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if let Some(kind) = &content_type {
            if !kind.starts_with("image/") {
                return Err(ImageError::NotAnImage {
                    url: url.clone(),
                    content_type: kind.clone(),
                });
            }
        }

        let body = response.bytes().await.map_err(request_error)?;
        let (width, height) = match sniff_dimensions(&body) {
            Some((width, height)) => (Some(width), Some(height)),
            None => (None, None),
        };
        debug!(%url, bytes = body.len(), ?width, ?height, "image loaded");

        Ok(ImageInfo {
            content_type,
            bytes: body.len(),
            width,
            height,
        })
    }
}

impl ImageLoader for HttpImageLoader {
    fn load(&self, url: &str) -> BoxFuture<'static, Result<ImageInfo, ImageError>> {
        Box::pin(Self::fetch(self.client.clone(), url.to_string()))
    }
}

/// Pixel size from a PNG or GIF header.
pub fn sniff_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.starts_with(PNG_SIGNATURE) {
        if bytes.get(12..16)? != b"IHDR" {
            return None;
        }
        let width = u32::from_be_bytes(bytes.get(16..20)?.try_into().ok()?);
        let height = u32::from_be_bytes(bytes.get(20..24)?.try_into().ok()?);
        return Some((width, height));
    }

    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        let width = u16::from_le_bytes(bytes.get(6..8)?.try_into().ok()?);
        let height = u16::from_le_bytes(bytes.get(8..10)?.try_into().ok()?);
        return Some((u32::from(width), u32::from(height)));
    }

    None
}
