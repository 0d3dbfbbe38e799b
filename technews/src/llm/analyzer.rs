// Weekly digest analyzer
use chrono::{Duration, Local, NaiveDate};
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};

use super::{LlmProvider, LlmRequest};
use crate::error::{AgentError, Result};
use crate::models::{Article, NewsSummary};

const TEMPERATURE: f32 = 0.7;
const TOP_P: f32 = 0.9;
const TOP_K: u32 = 40;
const MAX_OUTPUT_TOKENS: usize = 2048;

const MAX_KEY_TOPICS: usize = 5;
const MAX_TRENDING_STORIES: usize = 3;

const FALLBACK_TOPICS: [&str; 3] = ["Artificial Intelligence", "Cloud Computing", "Cybersecurity"];
const FALLBACK_STORIES: [&str; 3] = [
    "Major tech industry developments",
    "Innovation breakthroughs",
    "Market trends",
];

/// Turns a batch of articles into a `NewsSummary` through one completion call.
pub struct Analyzer {
    provider: Arc<dyn LlmProvider>,
}

impl Analyzer {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Summarize `articles`, giving up with `AgentError::Generation` once
    /// `deadline` passes.
    pub async fn summarize(&self, articles: &[Article], deadline: Instant) -> Result<NewsSummary> {
        if articles.is_empty() {
            return Err(AgentError::EmptyInput);
        }

        let request = LlmRequest {
            prompt: build_prompt(articles),
            max_tokens: Some(MAX_OUTPUT_TOKENS),
            temperature: Some(TEMPERATURE),
            top_p: Some(TOP_P),
            top_k: Some(TOP_K),
            timeout: Some(deadline.saturating_duration_since(Instant::now())),
        };

        let response = tokio::time::timeout_at(deadline, self.provider.generate(request))
            .await
            .map_err(|_| AgentError::Generation(anyhow::anyhow!("deadline exceeded")))?
            .map_err(AgentError::Generation)?;

        if response.content.trim().is_empty() {
            return Err(AgentError::Generation(anyhow::anyhow!(
                "no response generated"
            )));
        }

        info!(
            model = %response.model,
            total_tokens = response.usage.total_tokens,
            "Gemini analysis successful"
        );

        let (key_topics, trending_stories) = extract_insights(&response.content);
        let now = Local::now();

        Ok(NewsSummary {
            week_range: week_range(now.date_naive()),
            total_articles: articles.len(),
            summary: response.content,
            key_topics,
            trending_stories,
            generated_at: now,
        })
    }
}

/// Prompt listing every article followed by the newsletter instructions.
pub fn build_prompt(articles: &[Article]) -> String {
    let mut prompt = String::new();
    prompt.push_str("You are a professional tech news analyst. Analyze the following technology news articles from the past week and create a comprehensive weekly summary.\n\n");
    prompt.push_str("Articles:\n\n");

    for (i, article) in articles.iter().enumerate() {
        let _ = writeln!(prompt, "{}. Title: {}", i + 1, article.title);
        let _ = writeln!(prompt, "   Source: {}", article.source);
        let _ = writeln!(prompt, "   Category: {}", article.category);
        if let Some(desc) = article.description.as_deref().filter(|d| !d.is_empty()) {
            let _ = writeln!(prompt, "   Description: {}", desc);
        }
        prompt.push('\n');
    }

    prompt.push_str("\nPlease provide:\n");
    prompt.push_str("1. A concise executive summary (2-3 paragraphs) of the week's most important tech developments\n");
    prompt.push_str("2. Key topics and themes (list 3-5 main topics)\n");
    prompt.push_str("3. Top 3 trending stories with brief explanations\n");
    prompt.push_str("4. Notable insights or patterns across the news\n\n");
    prompt.push_str("Format your response in a clear, professional manner suitable for a weekly newsletter.\n");
    prompt.push_str("Use markdown formatting with headers (##) for sections.\n");
    prompt
}

/// "Jan 02 - Jan 09, 2026" for the seven days ending on `today`.
pub fn week_range(today: NaiveDate) -> String {
    let start = today - Duration::days(7);
    format!("{} - {}", start.format("%b %d"), today.format("%b %d, %Y"))
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    None,
    Topics,
    Stories,
}

/// Best-effort scan of the model's free text for key topics and trending
/// stories. Empty results are replaced by fixed generic lists.
pub fn extract_insights(text: &str) -> (Vec<String>, Vec<String>) {
    let mut key_topics = Vec::new();
    let mut trending_stories = Vec::new();
    let mut section = Section::None;

    for raw in text.lines() {
        let line = raw.trim();
        let lower = line.to_lowercase();

        if lower.contains("key topics") || lower.contains("main topics") {
            section = Section::Topics;
            continue;
        }
        if lower.contains("trending") || lower.contains("top") {
            section = Section::Stories;
            continue;
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match section {
            Section::Topics if is_bullet(line) => {
                let topic = strip_bullet(line).trim();
                if !topic.is_empty() && key_topics.len() < MAX_KEY_TOPICS {
                    key_topics.push(topic.to_string());
                }
            }
            Section::Stories if is_bullet(line) || starts_with_digit(line) => {
                let mut story = strip_bullet(line);
                if starts_with_digit(story) {
                    if let Some((_, rest)) = story.split_once('.') {
                        story = rest;
                    }
                }
                let story = story.trim();
                if !story.is_empty() && trending_stories.len() < MAX_TRENDING_STORIES {
                    trending_stories.push(story.to_string());
                }
            }
            _ => {}
        }
    }

    if key_topics.is_empty() {
        warn!("no key topics found in analysis, using generic topics");
        key_topics = FALLBACK_TOPICS.iter().map(|s| s.to_string()).collect();
    }
    if trending_stories.is_empty() {
        warn!("no trending stories found in analysis, using generic stories");
        trending_stories = FALLBACK_STORIES.iter().map(|s| s.to_string()).collect();
    }

    (key_topics, trending_stories)
}

fn is_bullet(line: &str) -> bool {
    line.starts_with('-') || line.starts_with('*') || line.starts_with('•')
}

fn starts_with_digit(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_digit())
}

// One marker of each kind, in this order.
fn strip_bullet(line: &str) -> &str {
    let line = line.strip_prefix('-').unwrap_or(line);
    let line = line.strip_prefix('*').unwrap_or(line);
    line.strip_prefix('•').unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmResponse, ModelInfo, UsageMetadata};
    use crate::models::mock_articles;
    use std::sync::Mutex;

    /// Provider returning a canned reply (or error) and recording prompts.
    struct StubProvider {
        reply: std::result::Result<String, String>,
        delay: Option<std::time::Duration>,
        prompts: Mutex<Vec<LlmRequest>>,
    }

    impl StubProvider {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                delay: None,
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing(msg: &str) -> Self {
            Self {
                reply: Err(msg.to_string()),
                delay: None,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for StubProvider {
        async fn generate(&self, request: LlmRequest) -> anyhow::Result<LlmResponse> {
            self.prompts.lock().unwrap().push(request);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.reply {
                Ok(text) => Ok(LlmResponse {
                    content: text.clone(),
                    usage: UsageMetadata::default(),
                    model: "stub".to_string(),
                }),
                Err(msg) => Err(anyhow::anyhow!(msg.clone())),
            }
        }

        async fn list_models(&self) -> anyhow::Result<Vec<ModelInfo>> {
            Ok(Vec::new())
        }
    }

    const DIGEST: &str = "## Executive Summary\n\
        AI labs shipped new models while quantum hardware made steady progress.\n\
        \n\
        ## Key Topics\n\
        - Generative AI models\n\
        * Quantum hardware\n\
        \n\
        ## Trending Stories\n\
        1. AI model beats benchmarks\n\
        2. 1000-qubit processor unveiled\n\
        3. Climate pledges from big tech\n\
        \n\
        ## Notable Insights\n\
        AI is everywhere.\n";

    fn deadline() -> Instant {
        Instant::now() + std::time::Duration::from_secs(5)
    }

    #[tokio::test]
    async fn summarize_extracts_sections_from_digest() {
        let provider = Arc::new(StubProvider::replying(DIGEST));
        let analyzer = Analyzer::new(provider.clone());
        let articles = mock_articles();

        let summary = analyzer.summarize(&articles, deadline()).await.expect("summary");

        assert_eq!(summary.total_articles, 3);
        assert_eq!(summary.summary, DIGEST);
        assert_eq!(summary.key_topics, vec!["Generative AI models", "Quantum hardware"]);
        assert_eq!(
            summary.trending_stories,
            vec![
                "AI model beats benchmarks",
                "1000-qubit processor unveiled",
                "Climate pledges from big tech"
            ]
        );

        let requests = provider.prompts.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.top_p, Some(0.9));
        assert_eq!(request.top_k, Some(40));
        assert_eq!(request.max_tokens, Some(2048));
        for article in &articles {
            assert!(request.prompt.contains(&article.title));
        }
    }

    #[tokio::test]
    async fn total_articles_matches_input_length() {
        let analyzer = Analyzer::new(Arc::new(StubProvider::replying("plain text")));
        let mut articles = mock_articles();
        articles.extend(mock_articles());
        articles.push(mock_articles().remove(0));

        let summary = analyzer.summarize(&articles, deadline()).await.expect("summary");
        assert_eq!(summary.total_articles, 7);
    }

    #[tokio::test]
    async fn empty_input_is_rejected_without_calling_the_provider() {
        let provider = Arc::new(StubProvider::replying(DIGEST));
        let analyzer = Analyzer::new(provider.clone());

        let err = analyzer.summarize(&[], deadline()).await.unwrap_err();
        assert!(matches!(err, AgentError::EmptyInput));
        assert!(provider.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_errors_become_generation_errors() {
        let analyzer = Analyzer::new(Arc::new(StubProvider::failing("quota exhausted")));

        let err = analyzer.summarize(&mock_articles(), deadline()).await.unwrap_err();
        assert!(matches!(err, AgentError::Generation(_)));
        assert!(err.to_string().contains("quota exhausted"));
    }

    #[tokio::test]
    async fn blank_completion_is_a_generation_error() {
        let analyzer = Analyzer::new(Arc::new(StubProvider::replying("   \n")));

        let err = analyzer.summarize(&mock_articles(), deadline()).await.unwrap_err();
        assert!(matches!(err, AgentError::Generation(_)));
    }

    #[tokio::test]
    async fn slow_provider_hits_the_deadline() {
        let provider = StubProvider {
            reply: Ok(DIGEST.to_string()),
            delay: Some(std::time::Duration::from_secs(5)),
            prompts: Mutex::new(Vec::new()),
        };
        let analyzer = Analyzer::new(Arc::new(provider));
        let deadline = Instant::now() + std::time::Duration::from_millis(50);

        let err = analyzer.summarize(&mock_articles(), deadline).await.unwrap_err();
        assert!(err.to_string().contains("deadline exceeded"));
    }

    #[test]
    fn prompt_skips_missing_descriptions() {
        let mut articles = mock_articles();
        articles[1].description = None;

        let prompt = build_prompt(&articles);
        assert!(prompt.contains("1. Title: AI Breakthrough"));
        assert!(prompt.contains("   Source: MIT Technology Review"));
        assert!(prompt.contains("   Category: business"));
        assert_eq!(prompt.matches("Description:").count(), 2);
        assert!(prompt.contains("Top 3 trending stories"));
    }

    #[test]
    fn marker_without_bullets_falls_back_to_generic_lists() {
        let text = "## Key Topics\nArtificial intelligence dominated.\nCloud spend grew.\n";
        let (topics, stories) = extract_insights(text);
        assert_eq!(topics, FALLBACK_TOPICS.to_vec());
        assert_eq!(stories, FALLBACK_STORIES.to_vec());
    }

    #[test]
    fn extraction_is_deterministic() {
        assert_eq!(extract_insights(DIGEST), extract_insights(DIGEST));
    }

    #[test]
    fn extraction_caps_topics_and_stories() {
        let text = "Main topics\n- a\n- b\n- c\n- d\n- e\n- f\nTrending now\n1. one\n2. two\n• three\n- four\n";
        let (topics, stories) = extract_insights(text);
        assert_eq!(topics, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(stories, vec!["one", "two", "three"]);
    }

    #[test]
    fn keyword_lines_switch_modes_exclusively() {
        // "top" in a bullet switches to story mode; later topic bullets are stories.
        let text = "Key topics\n- Chips\n- Laptop sales\n- Browsers\n";
        let (topics, stories) = extract_insights(text);
        assert_eq!(topics, vec!["Chips"]);
        assert_eq!(stories, vec!["Browsers"]);
    }

    #[test]
    fn week_range_covers_seven_days() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(week_range(today), "Mar 02 - Mar 09, 2026");

        let new_year = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap();
        assert_eq!(week_range(new_year), "Dec 27 - Jan 03, 2026");
    }
}
