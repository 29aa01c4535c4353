use std::sync::Arc;

use ruleconf::{ConfigTreeExt, Context, MemoryTree};

fn main() {
    let tree = Arc::new(MemoryTree::from_pairs([
        ("App:Name", "demo"),
        ("App:Banner:_rules:0:when", "user.tier == \"gold\" && !user.trial"),
        ("App:Banner:_rules:0:value", "Welcome back, valued customer"),
        ("App:Banner:_rules:1:when", "user.visits > 10"),
        ("App:Banner:_rules:1:value", "Thanks for coming back"),
        ("App:Banner:_rules:2:value", "Hello"),
    ]));

    for (tier, visits) in [("gold", 3_i64), ("free", 42), ("free", 1)] {
        let ctx = Context::new()
            .set("user.tier", tier)
            .set("user.trial", false)
            .set("user.visits", visits);
        let overlay = Arc::clone(&tree).with_rules(ctx);

        match overlay.section("App:Banner") {
            Ok(section) => println!(
                "{tier}/{visits}: {}",
                section.value().unwrap_or("<unset>")
            ),
            Err(e) => eprintln!("failed to resolve banner: {e}"),
        }
    }
}
