/// Control surface writes into the row store.
pub(crate) mod control_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Snapshot and change subscription feeding the overlay.
pub mod feed;
/// Health check service.
pub(crate) mod health_service;
/// HTTP image preloading for card highlights.
pub mod image_loader;
/// Overlay status and manual resync.
pub(crate) mod overlay_service;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Row store connection supervisor.
pub mod storage_supervisor;
