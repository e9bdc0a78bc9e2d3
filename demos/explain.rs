use rulecheck::Engine;
use serde_json::json;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let rules = json!({
        "operator": "AND",
        "children": [
            {"selector": "$.name", "command": "required", "description": "NAME-1", "comment": "A name is provided"},
            {"selector": "$.age", "command": "range", "arguments": {"min": 0, "max": 120},
             "description": "AGE-1", "comment": "Age is between 0 and 120"},
            {"selector": "$.email", "command": "pattern", "arguments": {"regex": "^[^@]+@[^@]+$"},
             "description": "EMAIL-1", "comment": "Email looks like an address"}
        ]
    });

    let doc = json!({"age": 200, "email": "someone@example.org"});
    let report = Engine::new()
        .validate(Some(&rules), &doc, true)
        .expect("failed to validate");

    println!("valid: {}, errors: {}", report.valid(), report.errors());
    for detail in report.details().unwrap_or_default() {
        let mark = if detail.passed { "PASS" } else { "FAIL" };
        println!("  [{mark}] {} - {}", detail.id, detail.title);
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&report).expect("report serializes")
    );
}
