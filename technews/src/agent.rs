use common::Config;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::collector::{ArticleSource, NewsCollector};
use crate::error::{AgentError, Result};
use crate::llm::analyzer::Analyzer;
use crate::llm::gemini::GeminiProvider;
use crate::models::mock_articles;
use crate::notifier::{Notifier, TelegramNotifier};

/// Time budget of the analysis stage.
pub const ANALYSIS_TIMEOUT: Duration = Duration::from_secs(120);

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub articles: usize,
    pub used_mock_data: bool,
}

/// Runs collect -> analyze -> notify, strictly in sequence.
pub struct NewsAgent {
    categories: Vec<String>,
    collector: Arc<dyn ArticleSource>,
    analyzer: Analyzer,
    notifier: Arc<dyn Notifier>,
}

impl NewsAgent {
    pub fn new(
        categories: Vec<String>,
        collector: Arc<dyn ArticleSource>,
        analyzer: Analyzer,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            categories,
            collector,
            analyzer,
            notifier,
        }
    }

    /// Build the production adapters. Fails if the Telegram token is rejected.
    pub async fn from_config(cfg: &Config) -> Result<Self> {
        let collector = NewsCollector::new(&cfg.news_api_url, &cfg.news_api_key, cfg.max_news_articles)
            .map_err(|source| AgentError::Connection {
                service: "NewsAPI",
                source,
            })?;

        let provider = GeminiProvider::from_config(cfg).with_timeout(ANALYSIS_TIMEOUT);
        info!("Gemini provider initialized: {}", provider.model());

        let notifier =
            TelegramNotifier::connect(&cfg.telegram_api_url, &cfg.telegram_bot_token, cfg.telegram_chat_id)
                .await?;

        Ok(Self::new(
            cfg.news_categories.clone(),
            Arc::new(collector),
            Analyzer::new(Arc::new(provider)),
            Arc::new(notifier),
        ))
    }

    /// Execute one complete run.
    pub async fn run(&self) -> Result<RunReport> {
        let started = Instant::now();
        info!("Starting weekly news collection and analysis...");

        info!("Step 1/3: Collecting news articles...");
        let (articles, used_mock_data) = match self.collector.fetch(&self.categories).await {
            Ok(articles) => (articles, false),
            Err(e) => {
                warn!("Error collecting news: {}", e);
                warn!("Using mock data instead");
                (mock_articles(), true)
            }
        };
        info!("Collected {} articles", articles.len());

        info!("Step 2/3: Analyzing articles with Gemini...");
        let deadline = Instant::now() + ANALYSIS_TIMEOUT;
        let summary = match self.analyzer.summarize(&articles, deadline).await {
            Ok(summary) => summary,
            Err(e) => {
                let message = format!("AI analysis failed: {}", e);
                error!("{}", message);
                if let Err(notify_err) = self.notifier.send_error(&message).await {
                    error!("Failed to send error notification: {}", notify_err);
                }
                return Err(e);
            }
        };
        info!(
            "Analysis complete: {} key topics, {} trending stories",
            summary.key_topics.len(),
            summary.trending_stories.len()
        );

        info!("Step 3/3: Sending summary via Telegram...");
        if let Err(e) = self.notifier.send_summary(&summary).await {
            error!("Failed to send Telegram notification: {}", e);
            return Err(e);
        }

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Weekly news summary sent successfully"
        );
        Ok(RunReport {
            articles: articles.len(),
            used_mock_data,
        })
    }

    /// Send a test message through the notifier.
    pub async fn test_connection(&self) -> Result<()> {
        info!("Testing Telegram connection...");
        self.notifier.test_connection().await?;
        info!("All connections successful");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmProvider, LlmRequest, LlmResponse, ModelInfo, UsageMetadata};
    use crate::models::{Article, NewsSummary};
    use std::sync::Mutex;

    struct StaticSource(Option<Vec<Article>>);

    #[async_trait::async_trait]
    impl ArticleSource for StaticSource {
        async fn fetch(&self, _categories: &[String]) -> Result<Vec<Article>> {
            self.0
                .clone()
                .ok_or_else(|| AgentError::Collection("every category failed".to_string()))
        }
    }

    struct RecordingProvider {
        fail: bool,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl LlmProvider for RecordingProvider {
        async fn generate(&self, request: LlmRequest) -> anyhow::Result<LlmResponse> {
            self.prompts.lock().unwrap().push(request.prompt);
            if self.fail {
                anyhow::bail!("Gemini API error 500: backend unavailable");
            }
            Ok(LlmResponse {
                content: "## Key Topics\n- Chips\n\n## Trending Stories\n1. Chip shortage ends\n"
                    .to_string(),
                usage: UsageMetadata::default(),
                model: "stub".to_string(),
            })
        }

        async fn list_models(&self) -> anyhow::Result<Vec<ModelInfo>> {
            Ok(vec![ModelInfo {
                name: "models/stub".to_string(),
                supported_methods: vec!["generateContent".to_string()],
            }])
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        fail_summary: bool,
        fail_error: bool,
        summaries: Mutex<Vec<NewsSummary>>,
        errors: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_summary(&self, summary: &NewsSummary) -> Result<()> {
            if self.fail_summary {
                return Err(AgentError::Delivery {
                    chunk: 2,
                    total: 3,
                    source: anyhow::anyhow!("Telegram API error 400"),
                });
            }
            self.summaries.lock().unwrap().push(summary.clone());
            Ok(())
        }

        async fn send_error(&self, message: &str) -> Result<()> {
            self.errors.lock().unwrap().push(message.to_string());
            if self.fail_error {
                return Err(AgentError::Delivery {
                    chunk: 1,
                    total: 1,
                    source: anyhow::anyhow!("Telegram unreachable"),
                });
            }
            Ok(())
        }

        async fn test_connection(&self) -> Result<()> {
            Ok(())
        }
    }

    fn agent(
        source: StaticSource,
        provider: Arc<RecordingProvider>,
        notifier: Arc<RecordingNotifier>,
    ) -> NewsAgent {
        NewsAgent::new(
            vec!["technology".to_string(), "science".to_string()],
            Arc::new(source),
            Analyzer::new(provider),
            notifier,
        )
    }

    fn provider(fail: bool) -> Arc<RecordingProvider> {
        Arc::new(RecordingProvider {
            fail,
            prompts: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn successful_run_sends_one_summary() {
        let live = vec![mock_articles().remove(0)];
        let notifier = Arc::new(RecordingNotifier::default());
        let agent = agent(StaticSource(Some(live)), provider(false), notifier.clone());

        let report = agent.run().await.expect("run");

        assert_eq!(
            report,
            RunReport {
                articles: 1,
                used_mock_data: false
            }
        );
        let summaries = notifier.summaries.lock().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].total_articles, 1);
        assert_eq!(summaries[0].key_topics, vec!["Chips"]);
        assert_eq!(summaries[0].trending_stories, vec!["Chip shortage ends"]);
        assert!(notifier.errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_collection_substitutes_mock_articles() {
        let llm = provider(false);
        let notifier = Arc::new(RecordingNotifier::default());
        let agent = agent(StaticSource(None), llm.clone(), notifier.clone());

        let report = agent.run().await.expect("run");

        assert!(report.used_mock_data);
        assert_eq!(report.articles, 3);

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        for article in mock_articles() {
            assert!(prompts[0].contains(&article.title));
        }
        assert_eq!(notifier.summaries.lock().unwrap()[0].total_articles, 3);
    }

    #[tokio::test]
    async fn analysis_failure_sends_one_alert_and_no_summary() {
        let notifier = Arc::new(RecordingNotifier::default());
        let agent = agent(StaticSource(None), provider(true), notifier.clone());

        let err = agent.run().await.unwrap_err();

        assert!(matches!(err, AgentError::Generation(_)));
        let errors = notifier.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("AI analysis failed:"));
        assert!(errors[0].contains("backend unavailable"));
        assert!(notifier.summaries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_alert_does_not_mask_analysis_error() {
        let notifier = Arc::new(RecordingNotifier {
            fail_error: true,
            ..Default::default()
        });
        let agent = agent(StaticSource(None), provider(true), notifier.clone());

        let err = agent.run().await.unwrap_err();

        assert!(matches!(err, AgentError::Generation(_)));
        assert_eq!(notifier.errors.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delivery_failure_is_returned_without_alert() {
        let notifier = Arc::new(RecordingNotifier {
            fail_summary: true,
            ..Default::default()
        });
        let agent = agent(StaticSource(None), provider(false), notifier.clone());

        let err = agent.run().await.unwrap_err();

        assert!(matches!(err, AgentError::Delivery { chunk: 2, total: 3, .. }));
        assert!(notifier.errors.lock().unwrap().is_empty());
    }
}
