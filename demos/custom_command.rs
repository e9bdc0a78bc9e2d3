use rulecheck::{Engine, PresencePolicy};
use serde_json::json;

fn main() {
    // Custom commands receive the selected value and the rule's arguments.
    let engine = Engine::builder()
        .command("divisible_by", |value, args| {
            match (value.as_i64(), args.get("n").and_then(|n| n.as_i64())) {
                (Some(v), Some(n)) if n != 0 => v % n == 0,
                _ => false,
            }
        })
        .presence_policy(PresencePolicy::FailFast)
        .build();

    let rules = json!({
        "operator": "AND",
        "children": [
            {"selector": "$.quantity", "command": "required"},
            {"selector": "$.quantity", "command": "divisible_by", "arguments": {"n": 6}},
            {"selector": "$.sku", "command": "pattern", "arguments": "^[A-Z]{3}-\\d+$"}
        ]
    });

    for doc in [
        json!({"quantity": 12, "sku": "ABC-1"}),
        json!({"quantity": 7, "sku": "ABC-1"}),
        json!({"sku": "abc"}),
    ] {
        let report = engine
            .validate(Some(&rules), &doc, true)
            .expect("failed to validate");
        println!("{doc} -> {report}");
        for detail in report.details().unwrap_or_default() {
            if detail.suppressed {
                println!("  suppressed: {}", detail.id);
            }
        }
    }
}
