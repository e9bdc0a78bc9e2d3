use std::sync::Arc;
use std::thread;

use rulecheck::Engine;
use serde_json::json;

fn main() {
    let compiled = Arc::new(
        Engine::new()
            .compile(&json!({
                "operator": "AND",
                "children": [
                    {"selector": "$.user.age", "command": "compare", "arguments": {"op": ">=", "value": 18}},
                    {"selector": "$.user.status", "command": "equals", "arguments": "active"}
                ]
            }))
            .expect("failed to compile rules"),
    );

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let rules = Arc::clone(&compiled);
            thread::spawn(move || {
                let age = 16 + i;
                let doc = json!({"user": {"age": age, "status": "active"}});
                let tree = rules.evaluate(&doc);
                (age, tree.valid())
            })
        })
        .collect();

    for h in handles {
        let (age, valid) = h.join().expect("thread panicked");
        println!("age {age}: {}", if valid { "allowed" } else { "denied" });
    }
}
