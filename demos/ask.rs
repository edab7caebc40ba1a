//! Answer a question end-to-end against mock providers.
//!
//! Run with: `cargo run --example ask`

use rag_agent::backend::{MockBackend, ProviderKind};
use rag_agent::{Agent, AgentConfig, CompletionGateway, MemoryStore, ProviderPool};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut store = MemoryStore::new();
    store.add_documents([
        (
            "solar-benefits",
            "The benefits of solar energy include lower electricity bills, reduced \
             greenhouse gas emissions, and independence from grid outages.",
        ),
        (
            "wind-overview",
            "Wind turbines convert the kinetic energy of moving air into electricity, \
             with offshore farms reaching capacity factors above 40 percent.",
        ),
        (
            "storage-basics",
            "Battery storage smooths the intermittency of renewables by shifting solar \
             generation into the evening peak.",
        ),
    ]);

    // Scripted responses in call order: plan verdict, answer, reflection.
    let mock = MockBackend::new(
        ProviderKind::Groq,
        vec![
            Ok("YES".into()),
            Ok("Solar energy lowers electricity bills, cuts greenhouse gas emissions, \
                and keeps the lights on when the grid goes down."
                .into()),
            Ok("RELEVANT".into()),
        ],
    );

    let config = AgentConfig::new(vec![(ProviderKind::Groq, "demo-key".into())]);
    let pool = Arc::new(ProviderPool::new(
        config.providers.clone(),
        config.failure_threshold,
        config.cooldown,
    )?);
    let gateway =
        Arc::new(CompletionGateway::new(pool, &config).with_backend(Arc::new(mock)));
    let agent = Agent::from_parts(config, Arc::new(store), gateway);

    let result = agent.answer("What are the benefits of solar energy?").await;

    println!("answer:    {}", result.answer_text);
    println!("relevance: {:?}", result.relevance);
    println!("provider:  {}", result.provider_used.as_deref().unwrap_or("-"));
    println!("passages:  {}", result.retrieved_count);
    for (stage, elapsed) in &result.stage_timings {
        println!("  {:<8} {:?}", stage.to_string(), elapsed);
    }

    Ok(())
}
