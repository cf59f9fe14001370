use tracing_subscriber::EnvFilter;

/// Routes the crate's tracing events to the test output.
///
/// Silent unless `RUST_LOG` is set, e.g. `RUST_LOG=lf_ring=trace cargo test -- --nocapture`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
