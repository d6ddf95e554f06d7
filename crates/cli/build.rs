use std::process::Command;

fn main() {
    // APP_VERSION env > latest git tag > Cargo.toml version
    let version = std::env::var("APP_VERSION")
        .ok()
        .or_else(git_tag)
        .map(|v| v.trim_start_matches('v').to_string())
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=APP_VERSION={}", version);
    println!("cargo:rerun-if-env-changed=APP_VERSION");
    println!("cargo:rerun-if-changed=.git/HEAD");
}

fn git_tag() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--abbrev=0"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let tag = String::from_utf8(output.stdout).ok()?;
    Some(tag.trim().to_string()).filter(|t| !t.is_empty())
}
