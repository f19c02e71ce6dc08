pub mod cli_args;
pub mod data_directory;
pub mod session_config;

pub use session_config::SessionConfig;
