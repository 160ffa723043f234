//! HTTP surface for the file service

mod handler;
mod types;

pub use handler::{configure_routes, FilesApiDoc};
pub use types::FilesAppState;
