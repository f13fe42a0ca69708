use bus_approach_tracker::{ApproachTracker, PollResult};
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let tracker = ApproachTracker::new()?;
    println!(
        "Polling {} once (fetcher: {})...",
        tracker.page_url(),
        tracker.fetcher_name()
    );
    println!("-------------------------------------------");

    let start = Instant::now();
    let result = tracker.refresh_now().await;
    let latency = start.elapsed();

    match &result {
        PollResult::Success(snapshot) => {
            println!("   {}", snapshot);
            println!("   Latency (network + extraction): {:?}", latency);
        }
        PollResult::Failure(reason) => {
            eprintln!("   Poll failed after {:?}: {}", latency, reason);
        }
    }

    // Reading the store never waits on the network
    let iterations = 10_000u32;
    let start_reads = Instant::now();
    for _ in 0..iterations {
        let _ = tracker.current_snapshot().await;
    }
    println!(
        "   Average store read: {:?}",
        start_reads.elapsed() / iterations
    );

    let health = tracker.health_check().await;
    println!("   Health: {:?} ({})", health.status, health.message.unwrap_or_default());

    tracker.shutdown().await;
    Ok(())
}
