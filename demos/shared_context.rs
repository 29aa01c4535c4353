use ruleconf::{MemoryTree, RuleOverlay, SharedContext};

fn main() {
    let tree = MemoryTree::from_pairs([
        ("Logging:Level:_rules:0:when", "env == \"prod\" && !incident"),
        ("Logging:Level:_rules:0:value", "warn"),
        ("Logging:Level:_rules:1:when", "incident"),
        ("Logging:Level:_rules:1:value", "trace"),
        ("Logging:Level:_rules:2:value", "debug"),
        ("Logging:Format", "json"),
    ]);

    let shared = SharedContext::default();
    let overlay = RuleOverlay::builder(tree).context(shared.clone()).build();

    match overlay.section("Logging:Level") {
        Ok(level) => println!("before any context: {:?}", level.value()),
        Err(e) => println!("before any context: {e}"),
    }

    let states = [("prod", false), ("prod", true), ("staging", false)];
    for (env, incident) in states {
        shared.replace(
            ruleconf::Context::new()
                .set("env", env)
                .set("incident", incident),
        );
        let flat = match overlay.flatten() {
            Ok(flat) => flat,
            Err(e) => {
                eprintln!("failed to resolve logging config: {e}");
                continue;
            }
        };
        println!("{env} incident={incident}: {flat:?}");
    }
}
