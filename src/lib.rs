pub mod cache;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod forge;
pub mod formatter;
pub mod mapper;
pub mod repo;
pub mod tracker;
pub mod version;

pub use cli::Args;
pub use error::{FindBzsError, Result};
