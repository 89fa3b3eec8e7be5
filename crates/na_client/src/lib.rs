pub mod client;
pub mod error_log;
mod wire;

pub use client::ApiClient;
pub use error_log::ErrorLog;

pub mod prelude {
    pub use super::{ApiClient, ErrorLog};
    pub use na_core::{ApiConfig, ApiError, Error, Result};
}
