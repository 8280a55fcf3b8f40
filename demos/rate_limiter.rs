//! Four fake API calls through a limiter of capacity 3.
//!
//! A, B and C start right away; D waits in the queue until C (the shortest)
//! finishes at ~200ms, then runs for 300ms. Everything is done after ~1s.
//!
//! Run with `RUST_LOG=debug cargo run --example rate_limiter` to also see the
//! `TaskQueued` event.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use taskgate::{Limiter, LimiterConfig, LogWriter};

async fn fake_api_call((id, delay_ms): (&'static str, u64)) -> anyhow::Result<String> {
    println!("Starting {id}");
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    println!("Finished {id}");
    Ok(format!("Result of {id}"))
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let limiter = Limiter::builder(LimiterConfig::with_limit(3))
        .with_subscriber(Arc::new(LogWriter::new()))
        .build()?;

    let calls = [("A", 1000), ("B", 500), ("C", 200), ("D", 300)];
    let handles: Vec<_> = calls
        .into_iter()
        .map(|call| limiter.submit_named(call.0, move || fake_api_call(call)))
        .collect();

    for result in join_all(handles).await {
        println!("{}", result?);
    }
    println!("All done");

    limiter.shutdown().await;
    Ok(())
}
