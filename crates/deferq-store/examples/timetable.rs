//! Schedules a timetable: clears a result list, then appends a timestamp to
//! it every 200 ms for two seconds, and prints what the store ends up with.
//!
//! Run with: `cargo run -p deferq-store --example timetable`

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;

use deferq_core::config::DeferqConfig;
use deferq_engine::SchedulerEngine;
use deferq_store::MemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deferq_engine=debug,deferq_store=debug,info".into()),
        )
        .init();

    let config = DeferqConfig::load(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        DeferqConfig::default()
    });

    let store = Arc::new(MemoryStore::new());
    let engine = SchedulerEngine::new(config.engine, Arc::clone(&store) as _, None);
    let handle = engine.handle();

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let loop_task = tokio::spawn(engine.run(shutdown_rx));

    handle.add(
        "timetable",
        Duration::zero(),
        &[b"DEL".to_vec(), b"timetable:result".to_vec()],
    )?;
    for i in 0..10i64 {
        let stamp = (Utc::now() + Duration::milliseconds(i * 200)).to_rfc3339();
        handle.add(
            "timetable",
            Duration::milliseconds(i * 200),
            &[
                b"LPUSH".to_vec(),
                b"timetable:result".to_vec(),
                stamp.into_bytes(),
            ],
        )?;
    }
    info!(pending = handle.len(), "timetable registered");

    while !handle.is_empty() {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }

    let result = store.lrange(b"timetable:result", 0, -1)?;
    println!("timetable:result ({} items, newest first):", result.len());
    for item in result {
        println!("  {}", String::from_utf8_lossy(&item));
    }

    shutdown_tx.send(true)?;
    loop_task.await?;
    Ok(())
}
