//! Configuration file handling through the binary

use super::{stderr, stdout, Cli};
use std::fs;

#[test]
fn test_default_config_file_is_loaded() {
    let cli = Cli::new();
    let dir = cli.home.path().join(".config").join("Totemscan");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("totemscan.toml"),
        "extraction-order = [\"labeled\"]\n",
    )
    .unwrap();

    let output = cli.run(&["extract", "/dev/null"]);
    assert_eq!(output.status.code(), Some(1));

    let payload = cli.home.path().join("payload.txt");
    fs::write(&payload, "SERIE 7654321-6 RUN 12.345.678-5").unwrap();
    let output = cli.run(&["extract", payload.to_str().unwrap()]);
    assert!(stdout(&output).contains("\"identity\": \"12345678-5\""));
}

#[test]
fn test_missing_config_file() {
    let cli = Cli::new();
    let output = cli.run(&["--config-file", "/nonexistent/totemscan.toml", "validate", "1-9"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("does not exist"));
}

#[test]
fn test_invalid_config_value() {
    let cli = Cli::new();
    let config = cli.home.path().join("bad.toml");
    fs::write(&config, "dedup-window-ms = 0\n").unwrap();

    let output = cli.run(&["--config-file", config.to_str().unwrap(), "validate", "1-9"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("dedup-window-ms"));
}

#[test]
fn test_unparseable_config() {
    let cli = Cli::new();
    let config = cli.home.path().join("broken.toml");
    fs::write(&config, "mode = \n").unwrap();

    let output = cli.run(&["--config-file", config.to_str().unwrap(), "validate", "1-9"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("cannot parse"));
}
