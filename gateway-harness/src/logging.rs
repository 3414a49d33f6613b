use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "gateway_harness=info";

/// Installs a fmt subscriber writing through the test harness' capture.
/// `RUST_LOG` overrides the default filter. Safe to call from every test;
/// only the first call in a process installs anything.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
