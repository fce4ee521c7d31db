//! Build metadata generated by the build script.
//! Single source of truth for the version banner printed by the CLI and logs.

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// Package version as recorded in Cargo.toml
pub fn package_version() -> &'static str {
    PACKAGE_VERSION
}

/// Build time string from the build script (UTC)
pub fn build_time() -> &'static str {
    BUILD_TIME
}

/// Short git hash captured by the build script
pub fn git_hash() -> &'static str {
    GIT_HASH
}

/// One-line banner: `0.1.0 (abc1234, built 2026-01-01 00:00:00 UTC)`
pub fn banner() -> String {
    format!("{} ({}, built {})", package_version(), git_hash(), build_time())
}
