//! Command-line arguments
//!
//! Global options may also come from the TOML configuration file (see
//! `config`); anything given on the command line wins.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "totemscan")]
#[command(about = "RUT validation and identity/ticket scanning for benefit distribution stations")]
#[command(version, long_version = crate::core::version::banner())]
#[command(after_help = " * can be specified multiple times or as a comma-separated list")]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Force coloured output
    #[arg(long = "color", conflicts_with = "no_color", global = true)]
    pub color: bool,

    /// Disable coloured output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", global = true,
          value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(short = 'f', long = "log-file", value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", global = true,
          value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// Validation backend base URL
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Bearer token for the validation backend
    #[arg(long = "api-token", value_name = "TOKEN", global = true)]
    pub api_token: Option<String>,

    /// Ignore repeated reads of the same value within this window
    #[arg(long = "dedup-window-ms", value_name = "MILLIS", global = true)]
    pub dedup_window_ms: Option<u64>,

    /// What is scanned: identity cards or guard tickets
    #[arg(short = 'm', long = "mode", value_name = "MODE", global = true,
          value_parser = ["identity", "ticket"])]
    pub mode: Option<String>,

    /// Barcode symbologies to decode*
    #[arg(long = "formats", value_name = "FORMATS", value_delimiter = ',', global = true)]
    pub formats: Vec<String>,

    /// Decode frames on a background worker
    #[arg(long = "offload-decoding", global = true)]
    pub offload_decoding: bool,

    /// Identity pattern families, highest priority first*
    #[arg(long = "extraction-order", value_name = "FAMILIES", value_delimiter = ',', global = true)]
    pub extraction_order: Vec<String>,

    /// Preference store file (remembered camera)
    #[arg(long = "store-file", value_name = "FILE", global = true)]
    pub store_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Check a RUT and show its expected check digit
    Validate {
        /// RUT in any common notation (12.345.678-5, 123456785, ...)
        rut: String,
    },

    /// Print a RUT in dotted, hyphenated form
    Format { rut: String },

    /// Extract the identity number, ticket and printed fields from a raw scan payload
    Extract {
        /// File holding the payload (stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Run the scan flow over a keyboard-wedge scanner on stdin
    Scan {
        /// Device id to use instead of the remembered one
        #[arg(long = "device", value_name = "ID")]
        device: Option<String>,

        /// Exit after the first success or error
        #[arg(long = "once")]
        once: bool,

        /// How long a result stays on screen before scanning resumes
        #[arg(long = "hold-ms", value_name = "MILLIS", default_value_t = 2000)]
        hold_ms: u64,
    },

    /// List scanner devices and the remembered choice
    Devices {
        /// Forget the remembered device
        #[arg(long = "forget")]
        forget: bool,
    },
}

impl Args {
    /// Parse from an explicit argument list (first item is the program name)
    pub fn parse_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(args)
    }

    /// `Some(true)` for --color, `Some(false)` for --no-color, `None` for auto
    pub fn color_override(&self) -> Option<bool> {
        match (self.color, self.no_color) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    /// Log file with the magic values "none" and "-" treated as unset
    pub fn effective_log_file(&self) -> Option<&std::path::Path> {
        self.log_file.as_deref().filter(|path| {
            let text = path.to_string_lossy();
            !(text.eq_ignore_ascii_case("none") || text == "-")
        })
    }
}
