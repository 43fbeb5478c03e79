#![forbid(unsafe_code)]

//! Opt-in tracing output for tests.
//!
//! ```sh
//! EVENTFUL_TEST_LOG=trace cargo test -p eventful --features tracing
//! ```

use std::env;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directive.
pub const ENV_TEST_LOG: &str = "EVENTFUL_TEST_LOG";

/// Install a test-writer subscriber when `EVENTFUL_TEST_LOG` is set.
///
/// Returns `true` if this call installed the global subscriber. Safe to call
/// from every test; later calls are no-ops.
pub fn init_test_tracing() -> bool {
    init_test_tracing_with(|key| env::var(key).ok())
}

/// Same as [`init_test_tracing`] with a custom environment lookup.
pub fn init_test_tracing_with<F>(get: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let Some(directive) = get(ENV_TEST_LOG) else {
        return false;
    };
    let filter = EnvFilter::try_new(directive.trim()).unwrap_or_else(|_| EnvFilter::new("trace"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_does_nothing() {
        assert!(!init_test_tracing_with(|_| None));
    }

    #[test]
    fn second_install_is_a_no_op() {
        init_test_tracing_with(|_| Some("debug".into()));
        assert!(!init_test_tracing_with(|_| Some("debug".into())));
    }
}
