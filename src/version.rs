//! Build identification shown by `calcd` and `calc`.
//!
//! The commit comes from vergen at build time. Builds outside a git checkout
//! report the package version alone.

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

const GIT_SHA: Option<&str> = option_env!("VERGEN_GIT_SHA");
const GIT_DIRTY: Option<&str> = option_env!("VERGEN_GIT_DIRTY");

/// Version with the commit it was built from.
///
/// - `0.1.0 (abc1234)`
/// - `0.1.0 (abc1234, modified)` when the working tree had local changes
/// - `0.1.0` when no commit is known
pub fn version_string() -> String {
    describe(PKG_VERSION, GIT_SHA, GIT_DIRTY == Some("true"))
}

fn describe(version: &str, sha: Option<&str>, modified: bool) -> String {
    // vergen substitutes a placeholder when git is unavailable.
    let sha = sha.filter(|sha| !sha.is_empty() && sha.bytes().all(|b| b.is_ascii_hexdigit()));
    match sha {
        Some(sha) => {
            let short = &sha[..sha.len().min(7)];
            let suffix = if modified { ", modified" } else { "" };
            format!("{version} ({short}{suffix})")
        }
        None => version.to_string(),
    }
}
