use std::path::Path;

use rulecheck::service::{MemoryProfileStore, RulesService, ServiceConfig};
use serde_json::json;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServiceConfig::load(Some(Path::new("rulecheck.toml"))).expect("invalid configuration");
    let service = RulesService::new(MemoryProfileStore::new(), config).expect("failed to start service");
    println!("{}", service.index());

    let reply = service
        .upsert_profile(
            "person",
            &json!({
                "operator": "AND",
                "children": [
                    {"selector": "$.name", "command": "required", "description": "NAME-1"},
                    {"selector": "$.age", "command": "range", "arguments": {"min": 0, "max": 120}, "description": "AGE-1"}
                ]
            }),
        )
        .expect("failed to store profile");
    println!("{reply}");

    for doc in [json!({"name": "A", "age": 30}), json!({"age": 200})] {
        match service.validate_profile("person", &doc, true) {
            Ok(report) => println!(
                "{doc} -> {}",
                serde_json::to_string(&report).expect("report serializes")
            ),
            Err(e) => println!("{doc} -> {}", json!(e.to_body())),
        }
    }

    // Unknown profiles have no rules unless `strict_profiles` is set.
    match service.validate_profile("nobody", &json!({}), false) {
        Ok(report) => println!("unknown profile -> {report}"),
        Err(e) => println!("unknown profile -> {e}"),
    }

    if let Err(e) = service.get_profile("bad id") {
        let (status, _) = e.status_and_code();
        println!("{status} {}", serde_json::to_string(&e.to_body()).expect("body serializes"));
    }
}
