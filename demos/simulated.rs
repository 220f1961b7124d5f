//! # Simulated altimeter walkthrough
//!
//! Walks one session through the whole state machine against the in-process
//! provider and prints every manager event with the built-in [`LogWriter`].
//!
//! ```text
//! create ─► start_updates ─► samples ─► stop_updates ─► restart ─► sensor fault ─► destroy
//! ```
//!
//! Along the way it trips both diagnostics (double create, start before create).
//!
//! Run with:
//! ```bash
//! cargo run --example simulated --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use altivisor::{
    Config, DeliveryQueue, LogWriter, RelativeAltitudeSample, SensorError, SensorStreamManager,
    SimulatedAltimeter, Subscribe,
};

#[tokio::main]
async fn main() {
    let sim = Arc::new(SimulatedAltimeter::new());
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    let mgr: SensorStreamManager<&'static str, _> = SensorStreamManager::builder(sim.clone())
        .with_config(Config {
            stream_capacity: 16,
            ..Config::default()
        })
        .with_subscribers(subs)
        .build();

    println!(
        "available={} authorization={}",
        mgr.is_available(),
        mgr.authorization_status().as_label()
    );

    // diagnostics: nothing created yet, then a double create
    let mut nothing = mgr.start_updates(&"trail", &DeliveryQueue::inline());
    assert!(nothing.next().await.is_none());
    mgr.create(&"trail");
    mgr.create(&"trail");

    let queue = DeliveryQueue::spawn_on(&tokio::runtime::Handle::current());
    let mut updates = mgr.start_updates(&"trail", &queue);
    let Some(handle) = sim.last_opened() else {
        return;
    };

    for step in 0..5u32 {
        let t = Duration::from_secs(u64::from(step));
        let rise = f64::from(step);
        handle.emit(RelativeAltitudeSample::new(t, 1.5 * rise, 101.3 - 0.02 * rise));
    }
    for _ in 0..5 {
        if let Some(Ok(s)) = updates.next().await {
            println!(
                "t={:>2}s altitude={:>5.2}m pressure={:.2}kPa",
                s.timestamp.as_secs(),
                s.relative_altitude,
                s.pressure
            );
        }
    }

    mgr.stop_updates(&"trail");
    assert!(updates.next().await.is_none());

    // restart, then let the sensor fail
    let mut updates = mgr.start_updates(&"trail", &queue);
    handle.fail(SensorError::Fault {
        error: "pressure port blocked".into(),
    });
    if let Some(Err(e)) = updates.next().await {
        println!("stream ended with {}", e.as_label());
    }

    mgr.destroy(&"trail");
    println!(
        "hardware begin={} end={}",
        handle.begin_count(),
        handle.end_count()
    );

    // give the subscriber workers a moment to print before exit
    tokio::time::sleep(Duration::from_millis(50)).await;
}
