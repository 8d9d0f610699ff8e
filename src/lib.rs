pub mod cli;
pub mod gist;
pub mod load_config;

pub use cli::{run, Cli, Commands};
