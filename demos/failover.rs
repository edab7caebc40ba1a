//! Watch the gateway fail over across keys and providers.
//!
//! Two Groq keys are scripted to fail; the Gemini key serves the answer.
//! Run with: `cargo run --example failover`

use rag_agent::backend::{MockBackend, ProviderError, ProviderErrorKind, ProviderKind};
use rag_agent::events::{Event, FnEventHandler};
use rag_agent::{Agent, AgentConfig, CompletionGateway, MemoryStore, ProviderPool};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let groq = MockBackend::new(
        ProviderKind::Groq,
        vec![Err(ProviderError::new(
            ProviderErrorKind::RateLimited,
            "simulated rate limit",
        ))],
    );
    let gemini = MockBackend::new(
        ProviderKind::Gemini,
        vec![
            Ok("NO".into()),
            Ok("Hello! I answer questions about clean energy.".into()),
            Ok("RELEVANT".into()),
        ],
    );

    let config = AgentConfig::new(vec![
        (ProviderKind::Groq, "groq-key-one".into()),
        (ProviderKind::Groq, "groq-key-two".into()),
        (ProviderKind::Gemini, "gemini-key-one".into()),
    ]);
    let pool = Arc::new(ProviderPool::new(
        config.providers.clone(),
        config.failure_threshold,
        config.cooldown,
    )?);

    let gateway = CompletionGateway::new(pool, &config)
        .with_backend(Arc::new(groq))
        .with_backend(Arc::new(gemini))
        .with_event_handler(Arc::new(FnEventHandler(|event: Event| match event {
            Event::ProviderAttempt { provider, .. } => println!("  trying {}", provider),
            Event::ProviderFailed { provider, reason, .. } => {
                println!("  {} failed ({}), advancing", provider, reason)
            }
            Event::ProviderSelected { provider, .. } => println!("  {} served the call", provider),
            _ => {}
        })));

    let agent = Agent::from_parts(config, Arc::new(MemoryStore::new()), Arc::new(gateway));

    println!("asking a factual question:");
    let result = agent
        .answer("Is rooftop solar worth it in cloudy climates?")
        .await;
    println!("\nanswer: {}\n", result.answer_text);

    println!("pool health after the turn:");
    for entry in agent.pool_status() {
        println!(
            "  {:<9} {:<10} {:?} ({} consecutive failures)",
            entry.label, entry.credential_id, entry.health, entry.consecutive_failures
        );
    }

    Ok(())
}
