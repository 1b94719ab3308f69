//! A request/confirm workflow driven entirely from inside the callback.
//!
//! Run with: cargo run --example request_workflow

use procession::{Procession, Props};
use serde_json::json;

fn main() {
    let mut seed = Props::new();
    seed.insert("user".to_string(), json!("potesuke"));

    let engine = Procession::new(Some(seed), |engine, label, props| {
        println!("-> {label}  props={}", serde_json::Value::Object(props.clone()));
        match label {
            "BOOT" => {
                engine.advance("Request");
            }
            "start@Request" => {
                // Pretend the request was reviewed and accepted.
                let mut patch = Props::new();
                patch.insert("accepted".to_string(), json!(true));
                engine.confirm_with(patch, None);
            }
            "confirm@Request" => {
                engine.advance("Done");
            }
            "start@Done" => {
                engine.terminate();
            }
            "end@Request" | "end@Done" | "EXIT" => {}
            _ => engine.warn_unhandled(),
        }
    });

    println!("exited: {}", engine.has_exited());
    println!("trail:  {}", engine.history().labels().join(" -> "));
}
