//! Index and expiry commands: init, purge, watch.

use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use tokio_util::sync::CancellationToken;

use chatlog_core::chat::indexes::IndexMaintainer;
use chatlog_infra::sqlite::ttl::TtlMonitor;
use chatlog_types::config::MemoryConfig;

use crate::state::AppState;

/// Run index reconciliation with the configured TTL.
pub async fn init(state: &AppState, json: bool) -> Result<()> {
    let config = MemoryConfig {
        create_indexes: true,
        ..state.config.clone()
    };
    let report = IndexMaintainer::new(state.collection.clone(), config)
        .run()
        .await
        .context("index initialization failed")?;

    if json {
        let result = serde_json::json!({
            "ensured": report.ensured,
            "dropped": report.dropped,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!();
        for name in &report.dropped {
            println!("  {} Dropped '{}'", style("-").yellow(), style(name).cyan());
        }
        for name in &report.ensured {
            println!("  {} Ensured '{}'", style("ok").green(), style(name).cyan());
        }
        println!();
    }

    Ok(())
}

/// Run a single TTL sweep.
pub async fn purge(state: &AppState, json: bool) -> Result<()> {
    let purged = TtlMonitor::new(state.collection.clone()).sweep().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "purged": purged }))?);
    } else {
        println!();
        println!("  {} Removed {purged} expired record(s)", style("ok").green());
        println!();
    }

    Ok(())
}

/// Sweep on an interval until Ctrl-C.
pub async fn watch(state: &AppState, interval_secs: u64) -> Result<()> {
    let cancel = CancellationToken::new();
    let handle = TtlMonitor::new(state.collection.clone())
        .with_interval(Duration::from_secs(interval_secs.max(1)))
        .spawn(cancel.clone());

    tracing::info!(interval_secs, "TTL monitor running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    cancel.cancel();
    handle.await?;
    Ok(())
}
