//! Delayed transitions: a flaky fetch that retries after a timer and
//! reports failures against the step that caused them.
//!
//! Run with: cargo run --example delayed_retry

use procession::{Procession, Props};
use serde_json::json;
use std::time::Duration;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let engine = Procession::new(None, |engine, label, props| {
        println!("-> {label}");
        match label {
            "BOOT" => {
                engine.advance("Fetch");
            }
            "start@Fetch" => {
                let attempt = props.get("attempt").and_then(|v| v.as_i64()).unwrap_or(0);
                if attempt < 2 {
                    let mut patch = Props::new();
                    patch.insert("attempt".to_string(), json!(attempt + 1));
                    engine.error_with("Fetch", patch, None);
                } else {
                    engine.confirm();
                }
            }
            "error@Fetch" => {
                // Back off for half a second, then run the fetch again.
                engine.advance("Backoff");
            }
            "start@Backoff" => {
                engine.advance_with("Fetch", Props::new(), Some(Duration::from_millis(500)));
            }
            "confirm@Fetch" => {
                engine.advance("Done");
            }
            "start@Done" => {
                engine.terminate();
            }
            _ => {}
        }
    });

    while !engine.has_exited() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    println!("attempts: {}", engine.props().get("attempt").cloned().unwrap_or(json!(0)));
    println!("trail:    {}", engine.history().labels().join(" -> "));
}
