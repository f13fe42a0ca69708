use bus_approach_tracker::{ApproachEvent, ApproachTracker};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("Bus Vision Approach Watcher");
    println!("===========================");

    let tracker = ApproachTracker::new()?;
    let mut events = tracker.subscribe();
    tracker.start();

    println!("Watching {}", tracker.page_url());

    // Four scheduled polls, then a manual refresh
    let mut seen = 0;
    while seen < 5 {
        let event = tokio::select! {
            event = events.recv() => event?,
            _ = tokio::signal::ctrl_c() => break,
        };
        seen += 1;

        println!("\n{:-<50}", "");
        match &event {
            ApproachEvent::SnapshotUpdated { snapshot, .. } => {
                println!("最終更新: {}", snapshot.update_time);
                println!("{} → {}", snapshot.stop_from, snapshot.stop_to);
                if snapshot.has_data {
                    println!("{} {}", snapshot.approach, snapshot.delay);
                    println!("{} {}", snapshot.route, snapshot.destination);
                    println!("{}", snapshot.pass_time);
                    println!("{} {}", snapshot.current_location, snapshot.relative_position);
                } else if let Some(message) = &snapshot.error_message {
                    println!("{}", message);
                }
            }
            ApproachEvent::PollFailed { error_message, .. } => {
                println!("接続エラー: {}", error_message);
            }
        }

        if seen == 4 {
            tokio::time::sleep(Duration::from_secs(1)).await;
            tracker.trigger_manual_refresh();
        }
    }

    tracker.shutdown().await;
    Ok(())
}
