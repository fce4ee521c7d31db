//! Public API exports for the CLI module

pub use crate::app::cli::args::{Args, Command};
pub use crate::app::cli::config::{default_config_path, store_path, ConfigError, Settings};
pub use crate::app::cli::display::{
    describe_state, device_line, extraction_report, validation_line,
};
