//! Tests for the CLI module
//!
//! Argument parsing, configuration file merging and output formatting.
