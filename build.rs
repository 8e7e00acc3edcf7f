use std::process::Command;

fn main() {
    println!("cargo:rerun-if-env-changed=SVCKIT_VERSION");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    if let Some(mut commit) = run("git", &["rev-parse", "HEAD"]) {
        let dirty = run("git", &["status", "--porcelain"]).is_some_and(|s| !s.is_empty());
        if dirty {
            commit.push_str("-dirty");
        }
        println!("cargo:rustc-env=SVCKIT_GIT_COMMIT={commit}");
    }

    if let Some(date) = run("git", &["log", "-1", "--format=%cI"]) {
        println!("cargo:rustc-env=SVCKIT_GIT_DATE={date}");
    }

    let rustc = std::env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    if let Some(version) = run(&rustc, &["--version"]) {
        println!("cargo:rustc-env=SVCKIT_RUSTC_VERSION={version}");
    }
}

/// Trimmed stdout of a successful command, or `None`.
fn run(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}
