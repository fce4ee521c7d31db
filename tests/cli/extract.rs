//! `extract` command tests

use super::{stdout, Cli};
use serde_json::Value;
use std::io::Write;
use std::process::Stdio;

#[test]
fn test_extract_from_file() {
    let cli = Cli::new();
    let mut payload = tempfile::NamedTempFile::new().unwrap();
    write!(
        payload,
        "RUN: 12.345.678-5 NOMBRES: JUAN APELLIDOS: PEREZ SOTO FECHA DE NACIMIENTO: 31/12/1985"
    )
    .unwrap();

    let output = cli.run(&["extract", payload.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(0));

    let report: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["identity"], "12345678-5");
    assert_eq!(report["formatted"], "12.345.678-5");
    assert_eq!(report["family"], "explicit_separator");
    assert_eq!(report["ticket"], Value::Null);
    assert_eq!(report["fields"]["given_names"], "JUAN");
    assert_eq!(report["fields"]["birth_date"], "1985-12-31");
}

#[test]
fn test_extract_from_stdin_with_custom_order() {
    let cli = Cli::new();
    let mut child = cli
        .command()
        .args(["--extraction-order", "labeled,explicit_separator", "extract"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"SERIE 7654321-6 RUN 12.345.678-5")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    let report: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["identity"], "12345678-5");
    assert_eq!(report["family"], "labeled");
}

#[test]
fn test_extract_nothing_found() {
    let cli = Cli::new();
    let mut payload = tempfile::NamedTempFile::new().unwrap();
    write!(payload, "FOLIO 12345678-9").unwrap();

    let output = cli.run(&["extract", payload.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));

    let report: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["identity"], Value::Null);
}

#[test]
fn test_extract_missing_file() {
    let cli = Cli::new();
    let output = cli.run(&["extract", "/nonexistent/payload.txt"]);
    assert_eq!(output.status.code(), Some(1));
}
