mod config;
mod error;
mod realtime;
mod store;

pub use config::SupabaseConfig;
pub use error::SupabaseError;
pub use store::SupabaseRowStore;
