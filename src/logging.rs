// ABOUTME: Maps the numeric --loglevel flag onto a tracing EnvFilter.
// ABOUTME: RUST_LOG, when set, takes precedence over the flag.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_LEVEL: u8 = 3;

/// Directive for this crate at `level`: 0 errors, 1-2 warnings, 3 info,
/// 4 debug, 5 and above trace. Dependencies stay at warn.
pub fn directive_for_level(level: u8) -> String {
    let own = match level {
        0 => "error",
        1 | 2 => "warn",
        3 => "info",
        4 => "debug",
        _ => "trace",
    };
    format!("warn,cluster_up={own},cluster={own}")
}

pub fn filter_for_level(level: u8) -> EnvFilter {
    EnvFilter::new(directive_for_level(level))
}

/// Install the global subscriber; logs go to stderr so stdout stays parseable.
pub fn init(level: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_for_level(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_map_to_directives() {
        assert_eq!(directive_for_level(0), "warn,cluster_up=error,cluster=error");
        assert_eq!(directive_for_level(2), "warn,cluster_up=warn,cluster=warn");
        assert_eq!(directive_for_level(3), "warn,cluster_up=info,cluster=info");
        assert_eq!(directive_for_level(4), "warn,cluster_up=debug,cluster=debug");
        assert_eq!(directive_for_level(9), "warn,cluster_up=trace,cluster=trace");
    }
}
