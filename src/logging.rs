use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Directive applied on top of `RUST_LOG`.
pub(crate) fn default_directive(verbose: bool) -> &'static str {
    if verbose { "atlas=debug" } else { "atlas=warn" }
}

/// Installs the global subscriber. Output goes to stderr so it never mixes
/// with command output or the terminal UI's alternate screen.
pub fn init_tracing(verbose: bool) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt};

        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = default_directive(verbose).parse() {
            filter = filter.add_directive(directive);
        }

        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}
