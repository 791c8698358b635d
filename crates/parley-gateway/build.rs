use std::path::Path;
use std::process::Command;

/// Sets PARLEY_GIT_SHA for the /health endpoint. A value already in the
/// environment wins, so builds from a source tarball can still stamp one.
fn main() {
    println!("cargo:rerun-if-env-changed=PARLEY_GIT_SHA");

    let sha = std::env::var("PARLEY_GIT_SHA")
        .ok()
        .filter(|s| !s.is_empty())
        .or_else(git_short_sha)
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=PARLEY_GIT_SHA={sha}");

    // Only watch git metadata when the workspace is a checkout.
    let head = Path::new("../../.git/HEAD");
    if head.exists() {
        println!("cargo:rerun-if-changed={}", head.display());
        println!("cargo:rerun-if-changed=../../.git/refs/");
    } else {
        println!("cargo:rerun-if-changed=build.rs");
    }
}

fn git_short_sha() -> Option<String> {
    let out = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    out.status
        .success()
        .then(|| String::from_utf8_lossy(&out.stdout).trim().to_string())
}
