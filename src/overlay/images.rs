use futures::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Facts about a successfully loaded image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ImageInfo {
    /// `Content-Type` reported by the server.
    pub content_type: Option<String>,
    /// Body size in bytes.
    pub bytes: usize,
    /// Pixel width, when the header could be read.
    pub width: Option<u32>,
    /// Pixel height, when the header could be read.
    pub height: Option<u32>,
}

/// Reasons an image preload did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    /// The request could not be sent or its body could not be read.
    #[error("request for `{url}` failed: {message}")]
    Request {
        /// Image address.
        url: String,
        /// Transport error text.
        message: String,
    },
    /// The server answered with a non-success status.
    #[error("`{url}` answered with status {status}")]
    Status {
        /// Image address.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// The body is not an image.
    #[error("`{url}` is not an image (content type `{content_type}`)")]
    NotAnImage {
        /// Image address.
        url: String,
        /// Reported content type.
        content_type: String,
    },
}

/// Asynchronous image preloader.
pub trait ImageLoader: Send + Sync {
    /// Fetch `url` and describe the image.
    fn load(&self, url: &str) -> BoxFuture<'static, Result<ImageInfo, ImageError>>;
}
