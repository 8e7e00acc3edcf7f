//! Build metadata embedded at compile time.
//!
//! `build.rs` records the git revision, commit date and compiler version;
//! anything it could not determine reads as `"unknown"`.

use std::fmt;

use serde::Serialize;

const UNKNOWN: &str = "unknown";

/// Version control and toolchain details of the running binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    /// Release version: `SVCKIT_VERSION` at build time, else the package version.
    pub version: String,
    /// Git revision, suffixed `-dirty` when built from a modified tree.
    pub commit: String,
    /// Commit timestamp of `commit`.
    pub date: String,
    pub rustc: String,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: option_env!("SVCKIT_VERSION")
                .unwrap_or(env!("CARGO_PKG_VERSION"))
                .to_string(),
            commit: non_empty(option_env!("SVCKIT_GIT_COMMIT")),
            date: non_empty(option_env!("SVCKIT_GIT_DATE")),
            rustc: non_empty(option_env!("SVCKIT_RUSTC_VERSION")),
        }
    }
}

fn non_empty(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => UNKNOWN.to_string(),
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {}) {}", self.version, self.commit, self.date, self.rustc)
    }
}
