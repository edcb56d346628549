//! EasyAPI server: the HTTP/WS surface over the execution fabric.

pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod modules;
pub mod routes;

pub use config::{ServerConfig, CONFIG_ENV};
pub use context::{BootError, ServerContext};
pub use error::ApiError;
pub use extract::{Caller, ID_HEADER, KEY_HEADER};
