use chrono::Utc;
use std::env;
use std::fs;
use std::path::Path;
use std::process::Command;

// Generates OUT_DIR/version.rs, included by src/core/version.rs
fn main() {
    let out_dir = env::var_os("OUT_DIR").expect("cargo sets OUT_DIR");
    let dest_path = Path::new(&out_dir).join("version.rs");

    let package_version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "unknown".to_string());
    let build_time = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let git_hash = short_git_hash().unwrap_or_else(|| "unknown".to_string());

    let generated = format!(
        "pub const PACKAGE_VERSION: &str = {:?};\npub const BUILD_TIME: &str = {:?};\npub const GIT_HASH: &str = {:?};\n",
        package_version, build_time, git_hash
    );

    // Leave the file alone when only the timestamp would differ
    let unchanged = fs::read_to_string(&dest_path)
        .map(|existing| same_except_time(&existing, &generated))
        .unwrap_or(false);
    if !unchanged {
        fs::write(&dest_path, generated).expect("version.rs is writable");
    }

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-changed=.git/HEAD");
}

fn short_git_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|hash| hash.trim().to_string())
}

fn same_except_time(existing: &str, generated: &str) -> bool {
    let strip = |text: &str| {
        text.lines()
            .filter(|line| !line.contains("BUILD_TIME"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    strip(existing) == strip(generated)
}
