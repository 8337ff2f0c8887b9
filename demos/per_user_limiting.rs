//! Several users querying one service from different threads.
//!
//! Run with: `cargo run --example per_user_limiting`

use epistat::{EpidemicServiceBuilder, FetchError, Reply};
use serde_json::json;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn fetch() -> Result<Vec<u8>, FetchError> {
    let inner = json!({
        "lastUpdateTime": "2022-03-01 09:00:00",
        "areaTree": [{
            "name": "China",
            "children": [
                { "name": "Hubei", "total": { "confirm": 68135, "dead": 4512, "heal": 63616 } },
                { "name": "Guangdong", "total": { "confirm": 7000, "dead": 8, "heal": 6900 } }
            ]
        }]
    });
    Ok(json!({ "data": inner.to_string() }).to_string().into_bytes())
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // 2 reports per user every 500 ms, forget users idle for 2 s
    let service = Arc::new(
        EpidemicServiceBuilder::new()
            .permits(2)
            .window_ms(500)
            .idle_expiry_ms(2_000)
            .cleanup_interval_ms(500)
            .build::<_, i64>(fetch),
    );

    let (cleanup_handle, stop_tx) = match service.start_cleanup_thread() {
        Ok(pair) => pair,
        Err(err) => {
            eprintln!("could not start cleanup thread: {}", err);
            return;
        }
    };

    let users = [10001i64, 10002, 10003];
    let handles: Vec<_> = users
        .iter()
        .map(|&user| {
            let service = service.clone();
            thread::spawn(move || {
                for i in 1..=4 {
                    let city = if i % 2 == 0 { "Hubei" } else { "Guangdong" };
                    match service.handle(user, city) {
                        Reply::Report(report) => println!(
                            "User {} - Request {} ✅ {} ({} active)",
                            user, i, report.name, report.currently_confirmed
                        ),
                        other => println!("User {} - Request {} ⛔ {}", user, i, other),
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        let _ = handle.join();
    }

    println!("\n{}", service.limiter().stats().summary());

    thread::sleep(Duration::from_millis(3_000));
    println!("\nAfter idle period:\n{}", service.limiter().stats().summary());

    let _ = stop_tx.send(());
    let _ = cleanup_handle.join();
}
