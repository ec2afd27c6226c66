//! Tracing setup for the command line tool. The library itself only emits
//! events; installing a subscriber is left to the embedding application.

use std::env;

use tracing_subscriber::EnvFilter;

/// Crate targets that constitute "our" logs.
pub fn our_crates() -> &'static [&'static str] {
    &["pagespace"]
}

/// Filter directive that sets the same `level` for all of our crates.
pub fn level_spec_for(level: &str) -> String {
    let lvl = level.to_ascii_lowercase();
    our_crates()
        .iter()
        .map(|target| format!("{}={}", target, lvl))
        .collect::<Vec<_>>()
        .join(",")
}

/// Final filter spec with precedence:
/// - `debug` flag
/// - `log_level` (crate-scoped)
/// - `RUST_LOG` env
/// - crate-scoped `warn`
pub fn compute_spec(debug: bool, log_level: Option<&str>) -> String {
    if debug {
        return level_spec_for("debug");
    }
    if let Some(lvl) = log_level {
        return level_spec_for(lvl);
    }
    env::var("RUST_LOG").unwrap_or_else(|_| level_spec_for("warn"))
}

/// Installs a stderr subscriber. Stdout stays reserved for command output.
pub fn init(spec: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(spec))
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_spec_is_crate_scoped() {
        assert_eq!(level_spec_for("DEBUG"), "pagespace=debug");
    }

    #[test]
    fn test_flags_take_precedence() {
        assert_eq!(compute_spec(true, Some("info")), "pagespace=debug");
        assert_eq!(compute_spec(false, Some("trace")), "pagespace=trace");
    }
}
