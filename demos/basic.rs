//! Basic usage example for the epistat crate.
//!
//! Run with: `cargo run --example basic`

use epistat::{find_area_path, parse_payload, ParseError, QueryPipeline, Report};
use serde_json::json;

fn sample_feed() -> Vec<u8> {
    let inner = json!({
        "lastUpdateTime": "2022-03-01 09:00:00",
        "areaTree": [{
            "name": "China",
            "today": { "confirm": 120, "storeConfirm": 30, "input": 90 },
            "total": { "confirm": 112000, "dead": 4636, "heal": 103000 },
            "extData": { "noSymptom": 800, "incrNoSymptom": 60 },
            "children": [
                {
                    "name": "Hubei",
                    "today": { "confirm": 2 },
                    "total": { "confirm": 68135, "dead": 4512, "heal": 63616 },
                    "extData": { "noSymptom": 3 },
                    "children": [
                        { "name": "Wuhan", "total": { "confirm": 50008, "dead": 3869, "heal": 46137 } }
                    ]
                },
                { "name": "Beijing", "total": { "confirm": 1700, "dead": 9, "heal": 1650 } }
            ]
        }]
    });
    json!({ "code": 10000, "msg": "success", "data": inner.to_string() })
        .to_string()
        .into_bytes()
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Basic Lookup Example ===\n");

    // Example 1: Lookup and report
    lookup_example();

    println!("{}", "\n".to_owned() + "=".repeat(50).as_str() + "\n");

    // Example 2: Where an area sits in the tree
    path_example();

    println!("{}", "\n".to_owned() + "=".repeat(50).as_str() + "\n");

    // Example 3: Bad input
    error_example();
}

fn lookup_example() {
    println!("1. Lookup:");

    let pipeline = QueryPipeline::new();
    let body = sample_feed();

    for city in ["Hubei", "Wuhan", "Shanghai"] {
        match pipeline.query(&body, city) {
            Ok(result) => match &result.area {
                Some(area) => println!("\n{}\n", Report::new(area, &result.last_update_time)),
                None => println!("   {} - ❌ not in the feed", city),
            },
            Err(err) => println!("   {} - ERROR: {}", city, err),
        }
    }
}

fn path_example() {
    println!("2. Area Paths:");

    let payload = match parse_payload(&sample_feed()) {
        Ok(payload) => payload,
        Err(err) => {
            println!("   ERROR: {}", err);
            return;
        }
    };

    for city in ["China", "Beijing", "Wuhan"] {
        if let Some(path) = find_area_path(payload.tree.root(), city) {
            let names: Vec<&str> = path.iter().map(|area| area.name.as_str()).collect();
            println!("   {}", names.join(" / "));
        }
    }
}

fn error_example() {
    println!("3. Malformed Payloads:");

    let pipeline = QueryPipeline::new();
    let cases: [(&str, &[u8]); 3] = [
        ("gateway error page", b"<html>502 Bad Gateway</html>"),
        ("truncated data", br#"{"data": "{\"areaTree\": [{"}"#),
        ("empty tree", br#"{"data": "{\"areaTree\": []}"}"#),
    ];

    for (label, body) in cases {
        match pipeline.query(body, "Hubei") {
            Err(ParseError::EmptyAreaTree) => println!("   {}: feed had no areas", label),
            Err(err) => println!("   {}: {}", label, err),
            Ok(_) => println!("   {}: unexpectedly parsed", label),
        }
    }
}
