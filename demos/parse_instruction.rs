//! Instruction parsing example
//!
//! Run with: cargo run --example parse_instruction

use storefront_actions::prelude::*;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("storefront_actions=debug")
        .init();

    let instruction = "1. Go to the homepage\n\
                       2. Search for 'running shoes'\n\
                       3. Add product to cart\n\
                       4. Go to the cart\n\
                       5. Verify the page contains 'running shoes'\n\
                       6. Take a screenshot";

    let parser = RuleParser::new();
    let actions = parser.parse(instruction).await;

    println!("Parsed {} actions:\n", actions.len());
    for (idx, action) in actions.iter().enumerate() {
        println!("  {}. {}", idx + 1, action.label());
    }
}
