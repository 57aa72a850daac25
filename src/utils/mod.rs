pub mod config;
pub mod logger;
pub mod tarbridge_toml;

pub use config::*;
pub use logger::{set_verbose, setup_logging};
