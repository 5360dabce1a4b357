use std::path::Path;
use std::process::Command;

/// `git describe` of the workspace, or `unknown` outside a checkout.
/// Packagers can pin the value with `STUDYBLOCK_BUILD_SHA`.
fn describe(workspace: &Path) -> Option<String> {
    let out = Command::new("git")
        .arg("-C")
        .arg(workspace)
        .args(["describe", "--always", "--dirty", "--abbrev=10"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let rev = String::from_utf8(out.stdout).ok()?;
    let rev = rev.trim();
    (!rev.is_empty()).then(|| rev.to_string())
}

fn main() {
    println!("cargo:rerun-if-env-changed=STUDYBLOCK_BUILD_SHA");
    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=../.git/index");

    let rev = std::env::var("STUDYBLOCK_BUILD_SHA")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| {
            let manifest = std::env::var_os("CARGO_MANIFEST_DIR")?;
            let workspace = Path::new(&manifest).parent()?.to_path_buf();
            describe(&workspace)
        })
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=STUDYBLOCK_BUILD_SHA={rev}");
}
