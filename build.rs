use std::env;
use std::process::Command;
use time::OffsetDateTime;

fn main() {
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rerun-if-changed=.git/HEAD");

    // Reproducible builds pin the year through SOURCE_DATE_EPOCH
    let build_year = env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|raw| raw.parse::<i64>().ok())
        .and_then(|epoch| OffsetDateTime::from_unix_timestamp(epoch).ok())
        .map(|dt| dt.year())
        .unwrap_or_else(|| OffsetDateTime::now_utc().year());
    println!("cargo:rustc-env=APP_BUILD_YEAR={build_year}");

    let package_version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());
    let release = env::var("PROFILE").is_ok_and(|profile| profile == "release");

    let display_version = if release {
        package_version
    } else {
        match short_commit() {
            Some(commit) => format!("{package_version}-dev+{commit}"),
            None => format!("{package_version}-dev"),
        }
    };
    println!("cargo:rustc-env=APP_VERSION_DISPLAY={display_version}");
}

fn short_commit() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let commit = String::from_utf8(output.stdout).ok()?;
    let commit = commit.trim();
    (!commit.is_empty()).then(|| commit.to_string())
}
