//! Log setup for the `radar` binary and a store observer that traces events.
//!
//! Logs go to stderr so command output on stdout stays machine-readable.
//! The level comes from `RUST_LOG`; without it only warnings are shown.

use newsradar_core::observer::{StoreEvent, StoreObserver};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber. Safe to call more than once.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("newsradar_core=debug,newsradar_client=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Traces every store event.
#[derive(Debug, Default)]
pub struct LogObserver;

impl StoreObserver for LogObserver {
    fn on_event(&self, event: &StoreEvent) {
        match event {
            StoreEvent::AuthChanged(status) => info!(?status, "auth changed"),
            StoreEvent::SelectionChanged(selection) => debug!(
                group = ?selection.group_id,
                topic = ?selection.topic_id,
                item = ?selection.item_id,
                "selection changed"
            ),
            other => debug!(event = ?other, "store changed"),
        }
    }
}
