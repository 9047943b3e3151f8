//! Tracing setup for the binary. The library only emits events.

/// Installs a compact stderr subscriber filtered by `RUST_LOG` (default `warn`).
///
/// Stdout is left alone so command output stays machine-readable.
pub fn setup_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    // A subscriber may already be installed when embedded in another program.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .compact()
        .try_init();
}
