//! Build identity: package version, git metadata from vergen, and the
//! strings derived from them.

/// Package version from Cargo.toml. Reported by the health probe.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

const UNKNOWN: &str = "unknown";

/// Git commit SHA at build time, or "unknown" when built outside a checkout.
pub const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => UNKNOWN,
};

/// Git branch at build time, or "unknown".
pub const GIT_BRANCH: &str = match option_env!("VERGEN_GIT_BRANCH") {
    Some(branch) => branch,
    None => UNKNOWN,
};

/// RFC 3339 build timestamp.
pub const BUILD_TIMESTAMP: &str = match option_env!("VERGEN_BUILD_TIMESTAMP") {
    Some(ts) => ts,
    None => UNKNOWN,
};

fn git_dirty() -> bool {
    option_env!("VERGEN_GIT_DIRTY") == Some("true")
}

/// Full build identity for logs, e.g. `0.1.0+main.abc1234` or
/// `0.1.0+main.abc1234.dirty`. Without git metadata: plain `0.1.0`.
pub fn version_string() -> String {
    if GIT_SHA == UNKNOWN {
        return PKG_VERSION.to_string();
    }
    let dirty_suffix = if git_dirty() { ".dirty" } else { "" };
    format!(
        "{PKG_VERSION}+{GIT_BRANCH}.{}{dirty_suffix}",
        &GIT_SHA[..7.min(GIT_SHA.len())]
    )
}

/// Default `User-Agent` for outbound fetches.
pub fn user_agent() -> String {
    format!("huginn/{PKG_VERSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_pkg_version() {
        assert!(version_string().starts_with(PKG_VERSION));
    }

    #[test]
    fn version_string_has_short_sha_when_known() {
        let version = version_string();
        if GIT_SHA != UNKNOWN {
            assert!(version.contains(&GIT_SHA[..7.min(GIT_SHA.len())]));
        } else {
            assert_eq!(version, PKG_VERSION);
        }
    }

    #[test]
    fn user_agent_names_the_package() {
        assert_eq!(user_agent(), format!("huginn/{PKG_VERSION}"));
    }
}
