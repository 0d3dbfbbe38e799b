use chrono::{DateTime, Duration, Local, Utc};
use serde::{Deserialize, Serialize};

/// A normalized news item, either returned by the news search API or taken
/// from the mock fixture set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub source: String,
    /// `None` when the upstream timestamp could not be parsed
    pub published_at: Option<DateTime<Utc>>,
    pub category: String,
}

/// Weekly digest produced once per run by the analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsSummary {
    pub week_range: String,
    pub total_articles: usize,
    /// First text part of the model response, verbatim
    pub summary: String,
    /// 0-5 entries
    pub key_topics: Vec<String>,
    /// 0-3 entries
    pub trending_stories: Vec<String>,
    pub generated_at: DateTime<Local>,
}

/// Fixed articles used when every category fetch fails.
pub fn mock_articles() -> Vec<Article> {
    let now = Utc::now();
    vec![
        Article {
            title: "AI Breakthrough: New Language Model Surpasses Human Performance".to_string(),
            description: Some(
                "Researchers announce a groundbreaking AI model that demonstrates superior performance across multiple benchmarks."
                    .to_string(),
            ),
            url: "https://example.com/ai-breakthrough".to_string(),
            source: "TechCrunch".to_string(),
            published_at: Some(now - Duration::days(1)),
            category: "technology".to_string(),
        },
        Article {
            title: "Quantum Computing Reaches New Milestone".to_string(),
            description: Some(
                "Scientists achieve quantum supremacy with a 1000-qubit processor.".to_string(),
            ),
            url: "https://example.com/quantum".to_string(),
            source: "MIT Technology Review".to_string(),
            published_at: Some(now - Duration::days(2)),
            category: "science".to_string(),
        },
        Article {
            title: "Major Tech Companies Announce Climate Initiatives".to_string(),
            description: Some(
                "Leading technology firms commit to carbon neutrality by 2030.".to_string(),
            ),
            url: "https://example.com/climate".to_string(),
            source: "Bloomberg".to_string(),
            published_at: Some(now - Duration::days(3)),
            category: "business".to_string(),
        },
    ]
}
