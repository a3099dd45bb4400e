// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use tracing_subscriber::{EnvFilter, fmt};

/// Installs a subscriber that prints diagnostics through the test harness.
///
/// Set `RUST_LOG` to see them. Safe to call from every test.
pub(crate) fn init_tracing() {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Collects an iterator in a deterministic order, for comparing contents of hashed collections.
pub(crate) fn sorted<T: Ord>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut items: Vec<_> = items.into_iter().collect();
    items.sort();
    items
}
