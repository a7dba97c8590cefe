mod api;
pub mod args;
pub mod commands;
mod config;
mod error;
pub mod model;
pub mod pipeline;
pub mod server;
mod utils;

#[cfg(test)]
mod test;

pub use api::{Mode, TEST_MODE_ENV};
pub use config::Config;
pub use error::{Error, ErrorType, Result};
pub use pipeline::Pipeline;
