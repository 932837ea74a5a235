//! Storage access: row models, the row store seam and its backends.

pub(crate) mod models;
pub mod row_store;
pub mod storage;
