//! `devices` command tests

use super::{canned_backend, stdout, Cli};
use std::io::Write;
use std::process::Stdio;

#[test]
fn test_lists_wedge_device() {
    let cli = Cli::new();
    let store = cli.store_file();
    let output = cli.run(&["--store-file", &store, "devices"]);

    assert_eq!(output.status.code(), Some(0));
    let listing = stdout(&output);
    assert!(listing.contains("keyboard-wedge"));
    assert!(!listing.contains('*'));
}

#[test]
fn test_scan_remembers_device_until_forgotten() {
    let cli = Cli::new();
    let store = cli.store_file();
    let api = canned_backend("200 OK", r#"{"id": "w-1"}"#);

    let mut child = cli
        .command()
        .args(["--api-url", &api, "--store-file", &store, "scan", "--once"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    let mut stdin = child.stdin.take().unwrap();
    writeln!(stdin, "12.345.678-5").unwrap();
    // Input stays open until the process has seen the result
    let output = child.wait_with_output().unwrap();
    drop(stdin);
    assert_eq!(output.status.code(), Some(0));

    let listing = stdout(&cli.run(&["--store-file", &store, "devices"]));
    assert!(listing.starts_with("* keyboard-wedge"), "{}", listing);

    let forgotten = stdout(&cli.run(&["--store-file", &store, "devices", "--forget"]));
    assert!(forgotten.contains("Forgot the remembered device"));
    assert!(!forgotten.contains("* keyboard-wedge"));
}
