//! Command-line front end.

pub mod arg_parser;
pub mod cli;

pub use arg_parser::{Cli, Commands, CommonArgs};
pub use cli::{build_opts, handle_run};
