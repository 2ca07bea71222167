pub mod backend;
pub mod error;
mod json;
mod models;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::json::{read_json, write_json};
pub use crate::models::FileInfo;
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
