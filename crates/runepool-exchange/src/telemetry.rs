//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, fmt};

/// Install the global fmt subscriber. `RUST_LOG` overrides the default
/// `info` filter. A second call is a no-op.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = if json {
        fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .try_init()
    } else {
        fmt().with_env_filter(filter).try_init()
    };
    if installed.is_ok() {
        tracing::debug!(json, "Tracing initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init_tracing(false);
        init_tracing(true);
    }
}
