use std::{env, process::Command};

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let revision = match stdout_of("git", &["rev-parse", "--short", "HEAD"]) {
        Some(hash) => match stdout_of("git", &["status", "--porcelain"]) {
            Some(changes) if !changes.is_empty() => format!("{hash}-dirty"),
            _ => hash,
        },
        None => "unknown".into(),
    };
    let rustc = stdout_of("rustc", &["--version"]).unwrap_or_else(|| "unknown".into());
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".into());

    println!("cargo:rustc-env=POKER_LEDGER_REVISION={revision}");
    println!("cargo:rustc-env=POKER_LEDGER_RUSTC={rustc}");
    println!("cargo:rustc-env=POKER_LEDGER_PROFILE={profile}");
}

/// Trimmed stdout of a successful run; `None` when the tool is missing or fails.
fn stdout_of(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    Some(text.trim().to_string())
}
