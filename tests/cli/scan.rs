//! `scan` command tests
//!
//! Scanner input is written to the child's stdin, which stays open while
//! the result is awaited: closing it ends the camera stream.

use super::{canned_backend, refused_url, stderr, Cli};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Stdio};
use std::sync::mpsc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(10);

struct Session {
    child: Child,
    stdin: ChildStdin,
    lines: mpsc::Receiver<String>,
}

impl Session {
    fn start(cli: &Cli, args: &[&str]) -> Self {
        let mut child = cli
            .command()
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let stdin = child.stdin.take().unwrap();
        let stdout = child.stdout.take().unwrap();

        let (tx, lines) = mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        Self { child, stdin, lines }
    }

    fn scan(&mut self, payload: &str) {
        writeln!(self.stdin, "{}", payload).unwrap();
        self.stdin.flush().unwrap();
    }

    /// First printed line starting with `prefix`
    fn expect_line(&self, prefix: &str) -> String {
        loop {
            match self.lines.recv_timeout(WAIT) {
                Ok(line) if line.starts_with(prefix) => return line,
                Ok(_) => continue,
                Err(e) => panic!("no line starting with '{}': {}", prefix, e),
            }
        }
    }

    fn exit_code(mut self) -> Option<i32> {
        drop(self.stdin);
        self.child.wait().unwrap().code()
    }
}

#[test]
fn test_scan_once_success() {
    let cli = Cli::new();
    let api = canned_backend("200 OK", r#"{"id": "w-1", "nombre": "Juan Perez"}"#);
    let store = cli.store_file();

    let mut session = Session::start(
        &cli,
        &["--api-url", &api, "--store-file", &store, "scan", "--once"],
    );
    session.expect_line("scanning");
    session.scan("RUN: 12.345.678-5 NOMBRES: JUAN");

    assert_eq!(session.expect_line("success"), "success 12345678-5 Juan Perez");
    assert_eq!(session.exit_code(), Some(0));
}

#[test]
fn test_scan_once_unreachable_backend() {
    let cli = Cli::new();
    let api = refused_url();

    let mut session = Session::start(&cli, &["--api-url", &api, "scan", "--once"]);
    session.expect_line("scanning");
    session.scan("123456785");

    assert!(session.expect_line("error").starts_with("error network_error"));
    assert_eq!(session.exit_code(), Some(1));
}

#[test]
fn test_scan_rejection_is_classified() {
    let cli = Cli::new();
    let api = canned_backend(
        "409 Conflict",
        r#"{"code": "already_used", "message": "Ya retiro su caja"}"#,
    );

    let mut session = Session::start(&cli, &["--api-url", &api, "scan", "--once"]);
    session.expect_line("scanning");
    session.scan("12.345.678-5");

    assert_eq!(
        session.expect_line("error"),
        "error already_used: Ya retiro su caja"
    );
    assert_eq!(session.exit_code(), Some(1));
}

#[test]
fn test_scan_ignores_invalid_reads_until_closed() {
    let cli = Cli::new();
    let api = refused_url();

    let mut session = Session::start(&cli, &["--api-url", &api, "scan"]);
    session.expect_line("scanning");
    session.scan("12345678-9");
    session.scan("not a card");

    // Closing the input ends the session as a scanner error
    drop(session.stdin);
    let line = session.lines.recv_timeout(WAIT).unwrap();
    assert!(line.starts_with("error scanner"), "{}", line);
    assert_eq!(session.child.wait().unwrap().code(), Some(1));
}

#[test]
fn test_scan_requires_api_url() {
    let cli = Cli::new();
    let output = cli.run(&["scan"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("--api-url"));
}
