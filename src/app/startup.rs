//! Application startup: arguments, configuration, logging, dispatch

use crate::app::cli::api::Args;
use crate::app::commands;
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::init_logging;
use crate::core::version;
use clap::{CommandFactory, Parser};
use std::io::IsTerminal;

/// Parse the process arguments and run; returns the exit code
pub async fn startup() -> i32 {
    run(Args::parse()).await
}

/// Run with already parsed arguments
pub async fn run(mut args: Args) -> i32 {
    // Stage 1: configuration file fills what the command line left unset
    let config_path = match Args::parse_config_file(&mut args).await {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 2;
        }
    };

    let use_color = args
        .color_override()
        .unwrap_or_else(|| std::io::stdout().is_terminal());
    colored::control::set_override(use_color);

    // Stage 2: logging (stderr, optionally a file)
    let log_file = args
        .effective_log_file()
        .map(|path| path.to_string_lossy().into_owned());
    if let Err(e) = init_logging(
        Some(args.log_level.as_deref().unwrap_or("warn")),
        args.log_format.as_deref(),
        log_file.as_deref(),
        use_color,
    ) {
        eprintln!("Warning: logging disabled: {}", e);
    }
    log::debug!("totemscan {} starting", version::banner());
    if let Some(path) = &config_path {
        log::debug!("Loaded configuration from {}", path.display());
    }

    // Stage 3: resolve settings and dispatch
    let settings = match args.settings() {
        Ok(settings) => settings,
        Err(e) => {
            log_error_with_context(&e, "Configuration");
            return 2;
        }
    };
    log::debug!("Settings: {:?}", settings);

    let Some(command) = args.command.clone() else {
        let _ = Args::command().print_help();
        return 2;
    };

    match commands::run(command, &settings, use_color).await {
        Ok(code) => code,
        Err(e) => {
            log_error_with_context(&e, "Command failed");
            1
        }
    }
}
