use std::env;
use std::process::Command;

fn stamp(key: &str, value: &str) {
    println!("cargo:rustc-env={}={}", key, value);
}

fn command_stdout(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    Some(text.trim().to_string())
}

/// CI ref when set, else `git describe`, else the crate version.
fn repo_version() -> String {
    if let Ok(val) = env::var("CI_BUILD_REF") {
        if !val.is_empty() {
            return val;
        }
    }
    command_stdout(
        "git",
        &["describe", "--always", "--dirty", "--long", "--tags"],
    )
    .or_else(|| env::var("CARGO_PKG_VERSION").ok())
    .unwrap_or_else(|| "unknown".to_string())
}

fn enabled_features() -> String {
    let mut features: Vec<String> = env::vars()
        .filter_map(|(key, _)| {
            key.strip_prefix("CARGO_FEATURE_")
                .map(|f| f.to_lowercase().replace('_', "-"))
        })
        .collect();
    features.sort();

    if features.is_empty() {
        "none".to_string()
    } else {
        features.join(",")
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");

    stamp("REPO_VERSION", &repo_version());
    stamp(
        "BUILD_PROFILE",
        &env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string()),
    );
    stamp("BUILD_FEATURES", &enabled_features());
    stamp("BUILD_TIMESTAMP", &chrono::Utc::now().to_rfc3339());
    stamp(
        "RUST_VERSION",
        &command_stdout("rustc", &["--version"]).unwrap_or_else(|| "unknown".to_string()),
    );
}
