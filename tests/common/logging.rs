use tracing_subscriber::EnvFilter;
use tracing_subscriber::FmtSubscriber;

/// Install a global subscriber for integration tests.
///
/// `#[traced_test]` only captures events from the test crate itself, which
/// hides everything `wallet_vault` logs. Call this at the start of a test
/// instead. A second call is a no-op because only one global default can be
/// set per process.
pub fn tracing_logger() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("self=trace,wallet_vault=debug"));
    let subscriber = FmtSubscriber::builder()
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_env_filter(env_filter)
        .with_thread_ids(true)
        .with_test_writer()
        .finish();

    let _result = tracing::subscriber::set_global_default(subscriber);
}
