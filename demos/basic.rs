use rulecheck::Engine;
use serde_json::json;

fn main() {
    // Define rules
    let rules = json!({
        "operator": "AND",
        "children": [
            {"selector": "$.user.age", "command": "compare", "arguments": {"op": ">=", "value": 18}},
            {"selector": "$.user.status", "command": "equals", "arguments": "active"}
        ]
    });

    let engine = Engine::new();
    let compiled = engine.compile(&rules).expect("failed to compile rules");
    println!("{compiled}");

    // Validate a document
    let doc = json!({"user": {"age": 25, "status": "active"}});
    let report = engine
        .validate(Some(&rules), &doc, false)
        .expect("failed to validate");
    println!("Result: {report}");
    println!("{}", serde_json::to_string(&report).expect("report serializes"));
}
