use std::time::Duration;

use technews::llm::analyzer::{build_prompt, extract_insights};
use technews::llm::gemini::GeminiProvider;
use technews::llm::{LlmProvider, LlmRequest};
use technews::models::mock_articles;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();
    dotenv::dotenv().ok();

    let api_key = std::env::var("GEMINI_API_KEY").expect("Set GEMINI_API_KEY environment variable");
    let base_url = std::env::var("GEMINI_API_URL")
        .unwrap_or_else(|_| common::DEFAULT_GEMINI_API_URL.to_string());
    let model = std::env::var("GEMINI_MODEL")
        .unwrap_or_else(|_| common::DEFAULT_GEMINI_MODEL.to_string());

    println!("\n{}", "=".repeat(60));
    println!("Testing Gemini provider");
    println!("Base URL: {}", base_url);
    println!("Model: {}", model);
    println!("{}", "=".repeat(60));

    let provider = GeminiProvider::new(&base_url, &api_key, &model)
        .with_timeout(Duration::from_secs(60));

    // Test 1: short completion
    println!("\n[Test 1] Short completion...");
    let mut request = LlmRequest::new("In one sentence, what is Rust's ownership model?");
    request.max_tokens = Some(200);
    match provider.generate(request).await {
        Ok(response) => {
            println!("✓ Success!");
            println!("  Text: {}", response.content.trim());
            println!(
                "  Usage: {} tokens (prompt: {}, completion: {})",
                response.usage.total_tokens,
                response.usage.prompt_tokens,
                response.usage.completion_tokens
            );
        }
        Err(e) => eprintln!("✗ Failed: {:#}", e),
    }

    // Test 2: digest prompt over the built-in sample articles
    println!("\n[Test 2] Weekly digest over sample articles...");
    let mut request = LlmRequest::new(build_prompt(&mock_articles()));
    request.max_tokens = Some(2048);
    match provider.generate(request).await {
        Ok(response) => {
            let (topics, stories) = extract_insights(&response.content);
            println!("✓ Success! {} chars", response.content.chars().count());
            println!("  Key topics: {:?}", topics);
            println!("  Trending stories: {:?}", stories);
        }
        Err(e) => eprintln!("✗ Failed: {:#}", e),
    }

    println!("\n{}", "=".repeat(60));
    println!("Tests completed");
    println!("{}", "=".repeat(60));
}
