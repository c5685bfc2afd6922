//! Tracing registration

use color_eyre::Report;
use tracing_error::ErrorLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};
use tracing_tree::HierarchicalLayer;

/// Sets the tracing subscriber stack up
///
/// Hierarchical pretty printing, span traces for error reports and an
/// env filter (defaulting to `info` when `RUST_LOG` is unset).
pub fn setup() -> Result<(), Report> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    Registry::default()
        .with(filter)
        .with(
            HierarchicalLayer::new(2)
                .with_targets(true)
                .with_bracketed_fields(true),
        )
        .with(ErrorLayer::default())
        .init();

    Ok(())
}
