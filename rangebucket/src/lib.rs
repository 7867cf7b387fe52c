pub mod error;

pub mod aggregations;
pub mod config;

pub use config::Config;
pub use error::{Error, Result};
