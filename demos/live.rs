//! Answer a question against real providers.
//!
//! Requires GROQ_API_KEY and/or GEMINI_API_KEY (plus optional _2/_3
//! variants) in the environment.
//!
//! Run with: `cargo run --example live -- "What are the benefits of solar energy?"`

use rag_agent::{Agent, AgentConfig, MemoryStore};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let question = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "What are the benefits of solar energy?".to_string());

    let mut store = MemoryStore::new();
    store.add_documents([
        (
            "solar-benefits",
            "The benefits of solar energy include lower electricity bills, reduced \
             greenhouse gas emissions, and energy independence for households.",
        ),
        (
            "climate-context",
            "Electricity and heat production account for roughly a quarter of global \
             greenhouse gas emissions, making clean generation a key climate lever.",
        ),
        (
            "wind-overview",
            "Wind power complements solar: output peaks at night and in winter, when \
             photovoltaic generation is lowest.",
        ),
    ]);

    let config = AgentConfig::from_env()?;
    let agent = Agent::new(config, Arc::new(store))?;

    let result = agent.answer(&question).await;

    if let Some(failure) = &result.error {
        eprintln!("degraded: {:?} — {}", failure.kind, failure.message);
    }
    println!("{}", result.answer_text);
    println!(
        "\n[provider: {} | relevance: {:?} | passages: {}]",
        result.provider_used.as_deref().unwrap_or("-"),
        result.relevance,
        result.retrieved_count
    );

    Ok(())
}
