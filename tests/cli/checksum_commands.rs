//! `validate` and `format` command tests

use super::{stderr, stdout, Cli};

#[test]
fn test_validate_accepts_any_notation() {
    let cli = Cli::new();
    for rut in ["12.345.678-5", "123456785", "8765432-k"] {
        let output = cli.run(&["validate", rut]);
        assert_eq!(output.status.code(), Some(0), "{}", rut);
        assert!(stdout(&output).contains("valid"), "{}", rut);
    }
}

#[test]
fn test_validate_reports_expected_digit() {
    let cli = Cli::new();
    let output = cli.run(&["validate", "12.345.678-9"]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stdout(&output).trim(),
        "12.345.678-9 invalid (expected check digit 5)"
    );
}

#[test]
fn test_validate_rejects_non_rut() {
    let cli = Cli::new();
    let output = cli.run(&["validate", "hello"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("is not a RUT"));
}

#[test]
fn test_format() {
    let cli = Cli::new();

    let output = cli.run(&["format", "123456785"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output).trim(), "12.345.678-5");

    // Formatting does not check the digit
    let output = cli.run(&["format", "12345678-9"]);
    assert_eq!(stdout(&output).trim(), "12.345.678-9");

    let output = cli.run(&["format", "abc"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("is not a RUT"));
}

#[test]
fn test_missing_command_prints_help() {
    let cli = Cli::new();
    let output = cli.run(&[]);

    assert_eq!(output.status.code(), Some(2));
    assert!(stdout(&output).contains("Usage"));
}
