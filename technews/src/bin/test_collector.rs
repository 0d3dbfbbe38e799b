use technews::collector::{ArticleSource, NewsCollector};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();
    dotenv::dotenv().ok();

    let api_key = std::env::var("NEWS_API_KEY").expect("Set NEWS_API_KEY environment variable");
    let base_url = std::env::var("NEWS_API_URL")
        .unwrap_or_else(|_| common::DEFAULT_NEWS_API_URL.to_string());

    let categories: Vec<String> = common::DEFAULT_CATEGORIES
        .iter()
        .map(|c| c.to_string())
        .collect();

    let collector = NewsCollector::new(&base_url, &api_key, common::DEFAULT_MAX_NEWS_ARTICLES)
        .expect("failed to build collector");

    println!("\n{}", "=".repeat(60));
    println!("Testing NewsAPI collector");
    println!("Base URL: {}", base_url);
    println!("Categories: {}", categories.join(", "));
    println!("Page size: {}", collector.page_size());
    println!("{}", "=".repeat(60));

    match collector.fetch(&categories).await {
        Ok(articles) => {
            println!("✓ Success! {} articles", articles.len());
            for (i, article) in articles.iter().take(5).enumerate() {
                println!("  {}. [{}] {}", i + 1, article.category, article.title);
                println!("     Source: {}", article.source);
                println!("     URL: {}", article.url);
                match article.published_at {
                    Some(ts) => println!("     Published: {}", ts.format("%Y-%m-%d %H:%M")),
                    None => println!("     Published: unknown"),
                }
            }
        }
        Err(e) => {
            eprintln!("✗ Failed: {}", e);
        }
    }
}
