//! loop-demo
//!
//! Drives an `if`, a `switch` and a tokio-scheduled `while` flow.
//! Tick behaviour can be changed with `SLUICE_TICK=interval:50`.

use sluice::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sluice_runtime=debug"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn classify(n: u32) -> anyhow::Result<&'static str> {
    let mut parity = if_flow::<u32, &'static str, u32>(maybe(|n: &u32| n % 2));
    parity.then(|_| "odd")?.otherwise(|_| "even")?;

    let mut size = switch_flow::<u32, &'static str, u32>(maybe(|n: &u32| n / 10));
    size.case(0)?.then(|_| "small")?.default(|_| "large")?;

    let parity = parity.run(n).take_value().unwrap_or_default();
    let size = size.run(n).take_value().unwrap_or_default();
    tracing::info!(n, parity, size, "classified");
    Ok(parity)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = SchedulerConfig::from_env()?;
    tracing::info!(?config, "scheduler config");
    let scheduler = Arc::new(TokioScheduler::from_config(&config)?);

    let remaining = Arc::new(AtomicU32::new(5));
    let left = Arc::clone(&remaining);
    let ticker = Arc::clone(&remaining);

    let countdown = while_flow::<(), bool>(
        maybe(move |_: &()| left.load(Ordering::SeqCst) > 0),
        scheduler.clone(),
    )
    .with_label("countdown")
    .with_policy(config.halt_policy);

    countdown
        .do_step(move |_| {
            let n = ticker.fetch_sub(1, Ordering::SeqCst);
            classify(n).is_ok()
        })
        .run(())?;

    while countdown.is_looping() {
        tokio::time::sleep(Duration::from_millis(5)).await;
        // A latched loop keeps looping after it stops ticking.
        if countdown.cycles() >= 10 || countdown.value() == Some(false) {
            countdown.break_with(|| tracing::warn!("countdown forced to stop"))?;
        }
    }

    println!("{}", countdown.shape().to_json());
    Ok(())
}
